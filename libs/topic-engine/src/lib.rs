pub mod error;

use std::borrow::Borrow;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;

pub use error::TopicError;

// ═══════════════════════════════════════════════════════════════
//  TopicName
// ═══════════════════════════════════════════════════════════════

/// Case-sensitive, non-empty topic identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicName(String);

impl TopicName {
    pub fn new(name: impl Into<String>) -> Result<Self, TopicError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TopicError::EmptyName);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TopicName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TopicName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Log
// ═══════════════════════════════════════════════════════════════

/// Append-only message log with one shared read cursor.
///
/// The cursor is per topic, not per consumer: every message is handed out
/// once, to whichever puller asks first.
#[derive(Debug, Default)]
struct Log {
    messages: Vec<Bytes>,
    read_offset: usize,
}

impl Log {
    fn append(&mut self, payload: Bytes) -> u64 {
        self.messages.push(payload);
        (self.messages.len() - 1) as u64
    }

    fn next(&mut self) -> Option<Bytes> {
        let message = self.messages.get(self.read_offset)?.clone();
        self.read_offset += 1;
        Some(message)
    }

    fn stats(&self) -> LogStats {
        LogStats {
            write_offset: self.messages.len() as u64,
            read_offset: self.read_offset as u64,
        }
    }
}

/// Cursor positions of one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogStats {
    /// Number of messages appended so far.
    pub write_offset: u64,
    /// Index of the next message to deliver; never exceeds `write_offset`.
    pub read_offset: u64,
}

// ═══════════════════════════════════════════════════════════════
//  TopicStore
// ═══════════════════════════════════════════════════════════════

/// In-memory topic store.
///
/// Each topic has its own lock, so unrelated topics never contend. The map
/// lock is only held long enough to look a topic up, or to create it: creation
/// happens under the write lock via `entry()`, whether triggered by a write or
/// by a read.
#[derive(Debug, Default)]
pub struct TopicStore {
    topics: RwLock<HashMap<TopicName, Arc<Mutex<Log>>>>,
}

impl TopicStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `payload` to `topic`, creating the topic if needed.
    /// Returns the offset assigned to the message.
    pub fn write(&self, topic: &str, payload: Bytes) -> Result<u64, TopicError> {
        let log = self.get_or_create(topic)?;
        let offset = lock_log(&log).append(payload);
        tracing::trace!(topic, offset, "appended");
        Ok(offset)
    }

    /// Take the next unread message of `topic`, creating the topic if needed.
    ///
    /// Returns `Ok(None)` when nothing is left to read. Never waits.
    pub fn read(&self, topic: &str) -> Result<Option<Bytes>, TopicError> {
        let log = self.get_or_create(topic)?;
        let message = lock_log(&log).next();
        Ok(message)
    }

    /// Cursor positions for `topic`, or `None` if it was never touched.
    pub fn stats(&self, topic: &str) -> Option<LogStats> {
        let log = self.read_map().get(topic).cloned()?;
        let stats = lock_log(&log).stats();
        Some(stats)
    }

    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .read_map()
            .keys()
            .map(|name| name.as_str().to_string())
            .collect();
        names.sort();
        names
    }

    fn get_or_create(&self, topic: &str) -> Result<Arc<Mutex<Log>>, TopicError> {
        if let Some(log) = self.read_map().get(topic) {
            return Ok(log.clone());
        }

        let name = TopicName::new(topic)?;
        let mut map = self.write_map();
        let log = map
            .entry(name)
            .or_insert_with(|| {
                tracing::debug!(topic, "created topic");
                Arc::new(Mutex::new(Log::default()))
            })
            .clone();
        Ok(log)
    }

    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<TopicName, Arc<Mutex<Log>>>> {
        match self.topics.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("topic store read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, HashMap<TopicName, Arc<Mutex<Log>>>> {
        match self.topics.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("topic store write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

fn lock_log(log: &Mutex<Log>) -> MutexGuard<'_, Log> {
    match log.lock() {
        Ok(g) => g,
        Err(poisoned) => {
            tracing::warn!("topic log lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}
