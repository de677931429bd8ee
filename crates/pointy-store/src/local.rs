//! # Local Gateway
//!
//! The fallback backend: an in-process path → JSON document tree with
//! broadcast change events and optional whole-file persistence.
//!
//! ## Shape
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  BTreeMap<String, Value>        one entry per document path      │
//! │         │                                                        │
//! │         ├── every write/delete → broadcast Change                │
//! │         └── file backend: tree rewritten as pretty JSON          │
//! │                                                                  │
//! │  subscribe("sales")          → { "<id>": Sale, ... } snapshot    │
//! │  subscribe("settings/...")   → single value snapshot             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Whole-file rewrites are fine at this scale: the tree is one café's
//! books, tens of kilobytes.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::StoreResult;
use crate::gateway::{Change, Gateway, Subscription};

/// Broadcast ring size. A lagging subscriber skips, never blocks writers.
const EVENT_CAPACITY: usize = 256;

/// The in-process backend. Cheap to clone; clones share the same tree.
#[derive(Clone)]
pub struct LocalGateway {
    docs: Arc<Mutex<BTreeMap<String, Value>>>,
    events: broadcast::Sender<Change>,
    file: Option<PathBuf>,
}

impl LocalGateway {
    /// A purely in-memory gateway (tests, ephemeral sessions).
    pub fn in_memory() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        LocalGateway {
            docs: Arc::new(Mutex::new(BTreeMap::new())),
            events,
            file: None,
        }
    }

    /// A file-backed gateway. Loads the existing tree if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let docs = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), docs = docs.len(), "Local gateway opened");

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(LocalGateway {
            docs: Arc::new(Mutex::new(docs)),
            events,
            file: Some(path),
        })
    }

    /// Reads one path without subscribing: a document's value, or the
    /// id-keyed object for a collection path.
    pub fn snapshot(&self, path: &str) -> Option<Value> {
        let docs = self.docs.lock().unwrap_or_else(PoisonError::into_inner);
        snapshot_of(&docs, path)
    }

    fn persist(&self, docs: &BTreeMap<String, Value>) -> StoreResult<()> {
        if let Some(path) = &self.file {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(docs)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    fn notify(&self, change: Change) {
        // No subscribers is fine.
        let _ = self.events.send(change);
    }
}

fn snapshot_of(docs: &BTreeMap<String, Value>, path: &str) -> Option<Value> {
    if path.contains('/') {
        return docs.get(path).cloned();
    }
    let prefix = format!("{path}/");
    let map: serde_json::Map<String, Value> = docs
        .range(prefix.clone()..)
        .take_while(|(key, _)| key.starts_with(&prefix))
        .map(|(key, value)| (key[prefix.len()..].to_string(), value.clone()))
        .collect();
    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

impl Gateway for LocalGateway {
    async fn subscribe(&self, path: &str) -> StoreResult<Subscription> {
        let receiver = self.events.subscribe();
        let initial = self.snapshot(path);
        Ok(Subscription::new(path, initial, receiver))
    }

    async fn write(&self, path: &str, value: Value) -> StoreResult<()> {
        {
            let mut docs = self.docs.lock().unwrap_or_else(PoisonError::into_inner);
            docs.insert(path.to_string(), value.clone());
            self.persist(&docs)?;
        }
        self.notify(Change {
            path: path.to_string(),
            value: Some(value),
        });
        Ok(())
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        {
            let mut docs = self.docs.lock().unwrap_or_else(PoisonError::into_inner);
            docs.remove(path);
            self.persist(&docs)?;
        }
        self.notify(Change {
            path: path.to_string(),
            value: None,
        });
        Ok(())
    }

    async fn write_batch(&self, ops: Vec<(String, Option<Value>)>) -> StoreResult<()> {
        {
            let mut docs = self.docs.lock().unwrap_or_else(PoisonError::into_inner);
            for (path, value) in &ops {
                match value {
                    Some(v) => {
                        docs.insert(path.clone(), v.clone());
                    }
                    None => {
                        docs.remove(path);
                    }
                }
            }
            self.persist(&docs)?;
        }
        for (path, value) in ops {
            self.notify(Change { path, value });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
