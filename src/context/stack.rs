//! Ordered, key-unique processor stack

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

use super::error::ContextError;
use crate::query::Query;
use crate::record::SchemaError;

/// A query rewrite applied just before execution
pub type Processor = Arc<dyn Fn(Query) -> Result<Query, SchemaError> + Send + Sync>;

/// A keyed processor, ready to be entered into a `QueryContext`
#[derive(Clone)]
pub struct QueryProcessor {
    key: String,
    apply: Processor,
}

impl QueryProcessor {
    pub fn new<F>(key: impl Into<String>, apply: F) -> Self
    where
        F: Fn(Query) -> Result<Query, SchemaError> + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            apply: Arc::new(apply),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Run this processor alone
    pub fn apply(&self, query: Query) -> Result<Query, SchemaError> {
        (self.apply)(query)
    }
}

impl fmt::Debug for QueryProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryProcessor").field("key", &self.key).finish()
    }
}

/// Active query processors, in the order they were entered
///
/// Entering a processor returns a `ContextScope`; the processor stays
/// active until that scope is dropped, including on early return or
/// panic. Keys are unique across everything currently active.
#[derive(Default)]
pub struct QueryContext {
    processors: Mutex<IndexMap<String, Processor>>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate `apply` under `key` until the returned scope drops
    pub fn enter<F>(&self, key: impl Into<String>, apply: F) -> Result<ContextScope<'_>, ContextError>
    where
        F: Fn(Query) -> Result<Query, SchemaError> + Send + Sync + 'static,
    {
        self.enter_processor(QueryProcessor::new(key, apply))
    }

    pub fn enter_processor(&self, processor: QueryProcessor) -> Result<ContextScope<'_>, ContextError> {
        let mut processors = self.processors.lock();
        if processors.contains_key(&processor.key) {
            return Err(ContextError::DuplicateKey(processor.key));
        }
        debug!(key = %processor.key, depth = processors.len() + 1, "entered query context");
        processors.insert(processor.key.clone(), processor.apply);
        Ok(ContextScope {
            context: self,
            key: processor.key,
        })
    }

    /// Apply every active processor, first entered first
    pub fn process(&self, query: Query) -> Result<Query, SchemaError> {
        // Snapshot so processors may themselves enter scopes
        let active: Vec<(String, Processor)> = self
            .processors
            .lock()
            .iter()
            .map(|(key, processor)| (key.clone(), Arc::clone(processor)))
            .collect();

        active.into_iter().try_fold(query, |query, (key, processor)| {
            debug!(key = %key, query_type = query.query_type(), "applying query processor");
            processor(query)
        })
    }

    pub fn keys(&self) -> Vec<String> {
        self.processors.lock().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.lock().is_empty()
    }

    fn exit(&self, key: &str) {
        if self.processors.lock().shift_remove(key).is_some() {
            debug!(key, "exited query context");
        }
    }
}

impl fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext").field("keys", &self.keys()).finish()
    }
}

/// Keeps one processor active; removes it on drop
#[must_use = "the processor is removed as soon as the scope is dropped"]
pub struct ContextScope<'c> {
    context: &'c QueryContext,
    key: String,
}

impl ContextScope<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for ContextScope<'_> {
    fn drop(&mut self) {
        self.context.exit(&self.key);
    }
}

impl fmt::Debug for ContextScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextScope").field("key", &self.key).finish()
    }
}
