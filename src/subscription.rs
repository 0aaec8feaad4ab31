//! Subscription Registry — durable topic → delivery-URL mapping
//!
//! Generalizes the teacher's `StateStore` (topic → subscription filter)
//! to a topic → ordered delivery-URL list, with the same
//! load-once/flush-on-every-mutation discipline.

use crate::error::{BridgeError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Trait for persisting the subscription table.
///
/// A direct generalization of the teacher's `StateStore` trait to the
/// topic → urls shape this bridge needs.
pub trait SubscriptionStore: Send + Sync {
    fn save(&self, table: &HashMap<String, Vec<String>>) -> Result<()>;
    fn load(&self) -> Result<HashMap<String, Vec<String>>>;
}

/// JSON file-based subscription store.
///
/// Atomic writes via temp file + rename (spec §6 "atomic write required").
pub struct FileSubscriptionStore {
    path: PathBuf,
}

impl FileSubscriptionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SubscriptionStore for FileSubscriptionStore {
    fn save(&self, table: &HashMap<String, Vec<String>>) -> Result<()> {
        let json = serde_json::to_string_pretty(table)?;
        let tmp_path = self.path.with_extension("tmp");

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                BridgeError::Persistence(format!(
                    "failed to create subscription directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        std::fs::write(&tmp_path, json).map_err(|e| {
            BridgeError::Persistence(format!(
                "failed to write subscription file {}: {e}",
                tmp_path.display()
            ))
        })?;

        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            BridgeError::Persistence(format!(
                "failed to rename subscription file {} -> {}: {e}",
                tmp_path.display(),
                self.path.display()
            ))
        })?;

        tracing::debug!(path = %self.path.display(), "Subscription table saved");
        Ok(())
    }

    fn load(&self) -> Result<HashMap<String, Vec<String>>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let json = std::fs::read_to_string(&self.path).map_err(|e| {
            BridgeError::Persistence(format!(
                "failed to read subscription file {}: {e}",
                self.path.display()
            ))
        })?;

        let table: HashMap<String, Vec<String>> = serde_json::from_str(&json).map_err(|e| {
            BridgeError::Persistence(format!(
                "failed to parse subscription file {}: {e}",
                self.path.display()
            ))
        })?;

        tracing::debug!(
            path = %self.path.display(),
            topics = table.len(),
            "Subscription table loaded"
        );
        Ok(table)
    }
}

/// In-memory subscription store, for tests.
#[derive(Default)]
pub struct MemorySubscriptionStore {
    state: std::sync::RwLock<HashMap<String, Vec<String>>>,
}

impl SubscriptionStore for MemorySubscriptionStore {
    fn save(&self, table: &HashMap<String, Vec<String>>) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| BridgeError::Persistence(format!("lock poisoned: {e}")))?;
        *state = table.clone();
        Ok(())
    }

    fn load(&self) -> Result<HashMap<String, Vec<String>>> {
        let state = self
            .state
            .read()
            .map_err(|e| BridgeError::Persistence(format!("lock poisoned: {e}")))?;
        Ok(state.clone())
    }
}

/// Outcome of a registry mutation: whether a bus (un)subscribe must follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicTransition {
    /// The mutation changed nothing observable on the bus side.
    Unchanged,
    /// The topic went from absent to present — caller must `subscribe`.
    NowSubscribed,
    /// The topic went from present to absent — caller must `unsubscribe`.
    NowUnsubscribed,
}

/// Durable mapping from bus topic to an ordered sequence of delivery URLs.
///
/// A single reader-writer lock guards the in-memory table and the file
/// write; the flush happens under the write lock so the in-memory state
/// and the on-disk state are never observably out of sync (spec §3
/// Invariant / §4.2, §5).
pub struct SubscriptionRegistry {
    table: RwLock<HashMap<String, Vec<String>>>,
    store: Box<dyn SubscriptionStore>,
}

impl SubscriptionRegistry {
    /// Load the persisted table (empty if the file is absent).
    pub fn load(store: Box<dyn SubscriptionStore>) -> Result<Self> {
        let table = store.load()?;
        Ok(Self {
            table: RwLock::new(table),
            store,
        })
    }

    /// Snapshot of every topic currently present — used at startup to
    /// re-subscribe on the bus before the HTTP listener accepts traffic
    /// (spec §4.2 "Startup sequence", Invariant P1/P4).
    pub async fn topics(&self) -> Vec<String> {
        self.table.read().await.keys().cloned().collect()
    }

    /// Returns `true` if `(topic, url)` was newly inserted (spec §4.2).
    /// Idempotent: re-adding an existing pair is a no-op that still
    /// returns `(false, Unchanged)`.
    pub async fn add(&self, topic: &str, url: &str) -> Result<(bool, TopicTransition)> {
        let mut table = self.table.write().await;
        let urls = table.entry(topic.to_string()).or_default();
        let was_new_topic = urls.is_empty();

        if urls.iter().any(|u| u == url) {
            return Ok((false, TopicTransition::Unchanged));
        }

        urls.push(url.to_string());
        self.store.save(&table)?;

        let transition = if was_new_topic {
            TopicTransition::NowSubscribed
        } else {
            TopicTransition::Unchanged
        };
        Ok((true, transition))
    }

    /// Returns `true` if a matching `(topic, url)` existed and was removed.
    /// A no-op on a registry not containing the pair (spec P3).
    pub async fn remove(&self, topic: &str, url: &str) -> Result<(bool, TopicTransition)> {
        let mut table = self.table.write().await;

        let Some(urls) = table.get_mut(topic) else {
            return Ok((false, TopicTransition::Unchanged));
        };

        let before = urls.len();
        urls.retain(|u| u != url);
        let removed = urls.len() != before;

        if !removed {
            return Ok((false, TopicTransition::Unchanged));
        }

        let mut transition = TopicTransition::Unchanged;
        if urls.is_empty() {
            table.remove(topic);
            transition = TopicTransition::NowUnsubscribed;
        }

        self.store.save(&table)?;
        Ok((true, transition))
    }

    /// A copy of the URL list safe to iterate without holding the lock
    /// (spec §4.2 `URLsFor`, §5 "Readers ... take a read lock only long
    /// enough to copy the URL list").
    pub async fn urls_for(&self, topic: &str) -> Vec<String> {
        let table = self.table.read().await;
        table.get(topic).cloned().unwrap_or_default()
    }
}
