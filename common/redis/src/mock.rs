use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{Client, CustomRedisError};

/// In-memory stand-in for `RedisClient`.
///
/// Unlike a canned-response mock, values written with `set` are visible to later `get`s,
/// so read-after-write flows can be exercised end to end. Failures can be injected per key
/// with `get_ret` / `set_ret`; an injected result wins over stored data.
/// Clones share state, so a test can keep a handle while the code under test owns another.
#[derive(Clone, Default)]
pub struct MockRedisClient {
    store: Arc<Mutex<HashMap<String, String>>>,
    get_ret: HashMap<String, Result<String, CustomRedisError>>,
    set_ret: HashMap<String, Result<(), CustomRedisError>>,
    calls: Arc<Mutex<Vec<MockRedisCall>>>,
}

impl MockRedisClient {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means another test thread panicked; the data is still usable.
    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        match mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Seed a stored value, as if it had been written earlier
    pub fn with_value(self, key: &str, value: impl Into<String>) -> Self {
        Self::lock(&self.store).insert(key.to_owned(), value.into());
        self
    }

    pub fn get_ret(&mut self, key: &str, ret: Result<String, CustomRedisError>) -> Self {
        self.get_ret.insert(key.to_owned(), ret);
        self.clone()
    }

    pub fn set_ret(&mut self, key: &str, ret: Result<(), CustomRedisError>) -> Self {
        self.set_ret.insert(key.to_owned(), ret);
        self.clone()
    }

    pub fn get_calls(&self) -> Vec<MockRedisCall> {
        Self::lock(&self.calls).clone()
    }

    pub fn calls_for(&self, op: &str) -> Vec<MockRedisCall> {
        self.get_calls()
            .into_iter()
            .filter(|call| call.op == op)
            .collect()
    }

    /// Current stored value for a key, ignoring injected results
    pub fn stored(&self, key: &str) -> Option<String> {
        Self::lock(&self.store).get(key).cloned()
    }

    fn record(&self, op: &str, key: &str, value: MockRedisValue) {
        Self::lock(&self.calls).push(MockRedisCall {
            op: op.to_string(),
            key: key.to_string(),
            value,
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MockRedisValue {
    None,
    String(String),
}

#[derive(Debug, Clone)]
pub struct MockRedisCall {
    pub op: String,
    pub key: String,
    pub value: MockRedisValue,
}

#[async_trait]
impl Client for MockRedisClient {
    async fn get(&self, key: String) -> Result<String, CustomRedisError> {
        self.record("get", &key, MockRedisValue::None);

        if let Some(ret) = self.get_ret.get(&key) {
            return ret.clone();
        }

        // Same as RedisClient: an empty value reads as a miss
        Self::lock(&self.store)
            .get(&key)
            .filter(|value| !value.is_empty())
            .cloned()
            .ok_or(CustomRedisError::NotFound)
    }

    async fn set(&self, key: String, value: String) -> Result<(), CustomRedisError> {
        self.record("set", &key, MockRedisValue::String(value.clone()));

        if let Some(ret) = self.set_ret.get(&key) {
            return ret.clone();
        }

        Self::lock(&self.store).insert(key, value);
        Ok(())
    }
}
