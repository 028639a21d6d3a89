//! Bounded per-channel message history.
//!
//! One ring per joined channel, capped at the configured capacity with
//! the oldest entries evicted first. Logs exist to replay channel
//! context, so only channel-directed PRIVMSG/ACTION traffic is recorded;
//! messages for channels the session never joined are silently ignored.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

/// One recorded channel message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub command: String,
    pub sender: String,
    pub params: Vec<String>,
    pub trailing: String,
    pub at: DateTime<Utc>,
}

/// Ring of the most recent entries for one channel.
#[derive(Debug)]
pub struct ChannelLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl ChannelLog {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    fn push(&mut self, entry: LogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All channel logs for one session.
#[derive(Debug, Default)]
pub struct ChannelHistory {
    channels: HashMap<String, ChannelLog>,
}

impl ChannelHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start keeping history for a channel. Re-joining keeps whatever
    /// was already recorded.
    pub fn join(&mut self, channel: &str, capacity: usize) {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| ChannelLog::new(capacity));
    }

    /// Record one message, if the channel is known.
    pub fn record(
        &mut self,
        channel: &str,
        command: &str,
        sender: &str,
        params: &[String],
        trailing: &str,
    ) {
        if let Some(log) = self.channels.get_mut(channel) {
            log.push(LogEntry {
                command: command.to_string(),
                sender: sender.to_string(),
                params: params.to_vec(),
                trailing: trailing.to_string(),
                at: Utc::now(),
            });
        }
    }

    pub fn get(&self, channel: &str) -> Option<&ChannelLog> {
        self.channels.get(channel)
    }

    pub fn is_joined(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }
}
