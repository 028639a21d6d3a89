//! Outgoing message queue.
//!
//! Strict FIFO. The session drains exactly one message per scheduled
//! drain tick, which is the flood-control mechanism: queued messages go
//! out no faster than the configured spacing. Latency-sensitive replies
//! (PONG, QUIT) bypass the queue entirely via the session's immediate
//! send path.

use std::collections::VecDeque;

/// FIFO of outgoing command lines, not yet CRLF-terminated.
#[derive(Debug, Default)]
pub struct OutputQueue {
    queue: VecDeque<String>,
}

impl OutputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. Never blocks, never fails.
    pub fn enqueue(&mut self, line: impl Into<String>) {
        self.queue.push_back(line.into());
    }

    /// Take the next message for the wire. One call per drain tick.
    pub fn pop_next(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    /// Drop everything, e.g. when the connection it was meant for died.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = OutputQueue::new();
        queue.enqueue("NICK one");
        queue.enqueue("USER one 0 * :One");
        queue.enqueue("JOIN #chan");

        assert_eq!(queue.pop_next().as_deref(), Some("NICK one"));
        assert_eq!(queue.pop_next().as_deref(), Some("USER one 0 * :One"));
        assert_eq!(queue.pop_next().as_deref(), Some("JOIN #chan"));
        assert_eq!(queue.pop_next(), None);
    }

    #[test]
    fn test_one_message_per_pop() {
        let mut queue = OutputQueue::new();
        for i in 0..5 {
            queue.enqueue(format!("PRIVMSG #chan :line {i}"));
        }

        assert_eq!(queue.len(), 5);
        let _ = queue.pop_next();
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn test_clear() {
        let mut queue = OutputQueue::new();
        queue.enqueue("JOIN #chan");
        queue.clear();
        assert!(queue.is_empty());
    }
}
