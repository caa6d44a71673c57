//! Shared run context: a thread-safe key/value store plus run log
//!
//! One `Context` is shared by reference across an entire run, including
//! across sibling handler invocations in a parallel fan-out. Each read
//! or write is individually atomic; there is no multi-key transaction,
//! so two branches merging overlapping keys race last-writer-wins.
//! Handlers that need determinism namespace their writes under
//! `"{node_id}."` by convention.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;

#[derive(Debug, Default)]
struct Inner {
    data: HashMap<String, Value>,
    log: Vec<String>,
}

/// Thread-safe key/value store carrying state through a pipeline run
#[derive(Debug, Default)]
pub struct Context {
    inner: Mutex<Inner>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context pre-populated with the given values
    pub fn with_values(initial: HashMap<String, Value>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                data: initial,
                log: Vec::new(),
            }),
        }
    }

    /// Set a single key to the given value
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner.lock().data.insert(key.into(), value.into());
    }

    /// Retrieve a value by key
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().data.get(key).cloned()
    }

    /// Retrieve a value rendered as a string, empty if absent.
    ///
    /// JSON strings render without quotes; other values use their JSON
    /// representation.
    pub fn get_string(&self, key: &str) -> String {
        match self.inner.lock().data.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().data.contains_key(key)
    }

    /// A shallow copy of the current data map, for read-only handler input
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.inner.lock().data.clone()
    }

    /// Merge a map of updates into the context
    pub fn apply_updates(&self, updates: HashMap<String, Value>) {
        self.inner.lock().data.extend(updates);
    }

    /// Append an entry to the run log
    pub fn append_log(&self, entry: impl Into<String>) {
        self.inner.lock().log.push(entry.into());
    }

    /// A copy of all log entries
    pub fn logs(&self) -> Vec<String> {
        self.inner.lock().log.clone()
    }
}

impl Clone for Context {
    /// Deep copy for branch isolation: mutations on the clone never
    /// affect the original.
    fn clone(&self) -> Self {
        let inner = self.inner.lock();
        Self {
            inner: Mutex::new(Inner {
                data: inner.data.clone(),
                log: inner.log.clone(),
            }),
        }
    }
}
