//! Persistence port. Collections are stored as whole JSON snapshots under
//! string keys; every write replaces the full collection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub mod keys {
    pub const GLOBAL_RULES: &str = "approval_rules.global";
    pub const PROJECT_RULES: &str = "approval_rules.project";

    pub fn approval_requests(project_id: &str) -> String {
        format!("approval_requests.{project_id}")
    }

    pub fn workflow_rules(project_id: &str) -> String {
        format!("workflow_rules.{project_id}")
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("could not decode snapshot `{key}`: {message}")]
    Decode { key: String, message: String },
    #[error("could not encode snapshot `{key}`: {message}")]
    Encode { key: String, message: String },
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

#[async_trait]
impl<T> SnapshotStore for Arc<T>
where
    T: SnapshotStore + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }
}

/// Loads a collection, treating a missing key as empty.
pub async fn load_collection<T, S>(store: &S, key: &str) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned,
    S: SnapshotStore + ?Sized,
{
    match store.get(key).await? {
        Some(value) => serde_json::from_value(value)
            .map_err(|error| StoreError::Decode { key: key.to_string(), message: error.to_string() }),
        None => Ok(Vec::new()),
    }
}

pub async fn save_collection<T, S>(store: &S, key: &str, items: &[T]) -> Result<(), StoreError>
where
    T: Serialize + Sync,
    S: SnapshotStore + ?Sized,
{
    let value = serde_json::to_value(items)
        .map_err(|error| StoreError::Encode { key: key.to_string(), message: error.to_string() })?;
    store.set(key, value).await
}

#[derive(Clone, Default)]
pub struct InMemorySnapshotStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl InMemorySnapshotStore {
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = match self.entries.lock() {
            Ok(entries) => entries.keys().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().keys().cloned().collect(),
        };
        keys.sort();
        keys
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        match self.entries.lock() {
            Ok(entries) => Ok(entries.get(key).cloned()),
            Err(poisoned) => Ok(poisoned.into_inner().get(key).cloned()),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        match self.entries.lock() {
            Ok(mut entries) => entries.insert(key.to_string(), value),
            Err(poisoned) => poisoned.into_inner().insert(key.to_string(), value),
        };
        Ok(())
    }
}
