//! Per-request shared state.
//!
//! A `RequestContext` is created by the executor for exactly one request and
//! dropped when that request's pipeline returns. Steps communicate through it
//! by key; values are stored as `serde_json::Value` so any serializable type
//! can be written by one step and read back, typed, by a later one.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Misuse of the context by a step.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("context key `{0}` has not been set")]
    Missing(String),
    #[error("context key `{key}` holds an incompatible value: {source}")]
    Type {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String-keyed bag shared by the initializer and every step of one request.
#[derive(Debug, Default)]
pub struct RequestContext {
    values: HashMap<String, Value>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a serializable value under `key`, replacing any previous value.
    pub fn insert<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), ContextError> {
        let value = serde_json::to_value(value).map_err(|source| ContextError::Type {
            key: key.to_string(),
            source,
        })?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Store a raw JSON value.
    pub fn insert_value(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    /// Read `key` back as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, ContextError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ContextError::Missing(key.to_string()))?;
        T::deserialize(value).map_err(|source| ContextError::Type {
            key: key.to_string(),
            source,
        })
    }

    /// Like [`get`](Self::get) but an absent key is `None` rather than an error.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ContextError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(|source| ContextError::Type {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn value_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.values.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct PageData {
        title: String,
        count: u32,
    }

    #[test]
    fn test_typed_round_trip() {
        let mut ctx = RequestContext::new();
        assert!(ctx.is_empty());
        ctx.insert(
            "pageData",
            PageData {
                title: "About".into(),
                count: 3,
            },
        )
        .unwrap();
        let back: PageData = ctx.get("pageData").unwrap();
        assert_eq!(back.title, "About");
        assert_eq!(back.count, 3);
    }

    #[test]
    fn test_missing_and_type_errors() {
        let mut ctx = RequestContext::new();
        assert!(matches!(
            ctx.get::<String>("nope"),
            Err(ContextError::Missing(key)) if key == "nope"
        ));
        assert_eq!(ctx.get_opt::<String>("nope").unwrap(), None);

        ctx.insert("count", 5).unwrap();
        assert!(matches!(
            ctx.get::<String>("count"),
            Err(ContextError::Type { .. })
        ));
    }

    #[test]
    fn test_later_writes_replace_earlier() {
        let mut ctx = RequestContext::new();
        ctx.insert("k", "first").unwrap();
        ctx.insert("k", "second").unwrap();
        assert_eq!(ctx.get::<String>("k").unwrap(), "second");
        assert_eq!(ctx.len(), 1);
    }
}
