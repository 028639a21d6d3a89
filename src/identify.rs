//! WHOIS-based identity verification.
//!
//! Hosts ask whether a nick is registered with services; the answer
//! arrives later as WHOIS numerics. Requests queue in FIFO order and at
//! most one WHOIS round-trip is outstanding at a time, which bounds
//! server-side WHOIS load while still allowing concurrent verification
//! requests from the host.
//!
//! An account-registered numeric (`307`/`330`) resolves every pending
//! record for that nick as registered; the end-of-WHOIS numeric (`318`)
//! resolves the remainder as unregistered and launches the next queued
//! WHOIS.

use std::collections::VecDeque;

use tokio::sync::oneshot;
use tracing::debug;

/// Outcome of an identity verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifyVerdict {
    /// The nick is registered with services.
    Registered,
    /// The WHOIS completed without a registration indicator.
    Unregistered,
}

#[derive(Debug)]
struct PendingIdentify {
    nick: String,
    tx: oneshot::Sender<IdentifyVerdict>,
}

/// FIFO correlation queue for pending verifications.
#[derive(Debug, Default)]
pub struct IdentifyQueue {
    pending: VecDeque<PendingIdentify>,
    in_flight: bool,
}

impl IdentifyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a verification. Returns the nick to WHOIS now when no
    /// request is currently in flight.
    pub fn push(
        &mut self,
        nick: impl Into<String>,
        tx: oneshot::Sender<IdentifyVerdict>,
    ) -> Option<String> {
        let nick = nick.into();
        self.pending.push_back(PendingIdentify {
            nick: nick.clone(),
            tx,
        });
        if self.in_flight {
            None
        } else {
            self.in_flight = true;
            Some(nick)
        }
    }

    /// Queue a verification without arming a WHOIS; used while no
    /// connection exists. [`Self::restart`] re-arms on the next welcome.
    pub fn defer(&mut self, nick: impl Into<String>, tx: oneshot::Sender<IdentifyVerdict>) {
        self.pending.push_back(PendingIdentify {
            nick: nick.into(),
            tx,
        });
    }

    /// Resolve every pending record for `nick` as registered, preserving
    /// order for same-nick duplicates. The in-flight WHOIS stays armed:
    /// its end-of-WHOIS numeric is what advances the queue.
    pub fn accept(&mut self, nick: &str) {
        self.resolve(nick, IdentifyVerdict::Registered);
    }

    /// Resolve every pending record for `nick` as unregistered, then
    /// return the next nick to WHOIS, if any remain queued.
    pub fn reject(&mut self, nick: &str) -> Option<String> {
        self.resolve(nick, IdentifyVerdict::Unregistered);
        self.advance()
    }

    /// Re-arm the single-flight WHOIS after a (re)connect. Any WHOIS
    /// that was in flight when the previous connection died will never
    /// be answered, so the head of the queue is asked again.
    pub fn restart(&mut self) -> Option<String> {
        match self.pending.front() {
            Some(head) => {
                self.in_flight = true;
                Some(head.nick.clone())
            }
            None => {
                self.in_flight = false;
                None
            }
        }
    }

    /// Whether a WHOIS round-trip is currently outstanding.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn resolve(&mut self, nick: &str, verdict: IdentifyVerdict) {
        let mut remaining = VecDeque::with_capacity(self.pending.len());
        for entry in self.pending.drain(..) {
            if entry.nick == nick {
                if entry.tx.send(verdict).is_err() {
                    debug!(%nick, "identify requester went away before the verdict");
                }
            } else {
                remaining.push_back(entry);
            }
        }
        self.pending = remaining;
    }

    fn advance(&mut self) -> Option<String> {
        match self.pending.front() {
            Some(next) => {
                self.in_flight = true;
                Some(next.nick.clone())
            }
            None => {
                self.in_flight = false;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> (
        oneshot::Sender<IdentifyVerdict>,
        oneshot::Receiver<IdentifyVerdict>,
    ) {
        oneshot::channel()
    }

    #[test]
    fn test_first_push_arms_whois() {
        let mut queue = IdentifyQueue::new();
        let (tx, _rx) = request();
        assert_eq!(queue.push("alice", tx).as_deref(), Some("alice"));
        assert!(queue.in_flight());

        let (tx, _rx) = request();
        assert_eq!(queue.push("bob", tx), None);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_accept_resolves_matching_only() {
        let mut queue = IdentifyQueue::new();
        let (tx_a, mut rx_a) = request();
        let (tx_b, mut rx_b) = request();
        let _ = queue.push("alice", tx_a);
        let _ = queue.push("bob", tx_b);

        queue.accept("alice");
        assert_eq!(rx_a.try_recv().unwrap(), IdentifyVerdict::Registered);
        assert!(rx_b.try_recv().is_err());
        assert_eq!(queue.len(), 1);
        // accept alone does not advance the queue
        assert!(queue.in_flight());
    }

    #[test]
    fn test_reject_advances_to_next() {
        let mut queue = IdentifyQueue::new();
        let (tx_a, mut rx_a) = request();
        let (tx_b, _rx_b) = request();
        let _ = queue.push("alice", tx_a);
        let _ = queue.push("bob", tx_b);

        assert_eq!(queue.reject("alice").as_deref(), Some("bob"));
        assert_eq!(rx_a.try_recv().unwrap(), IdentifyVerdict::Unregistered);
        assert!(queue.in_flight());
    }

    #[test]
    fn test_end_of_whois_after_accept_still_advances() {
        // 307/330 removed alice's record; the later 318 matches nothing
        // but must still launch bob's WHOIS.
        let mut queue = IdentifyQueue::new();
        let (tx_a, _rx_a) = request();
        let (tx_b, _rx_b) = request();
        let _ = queue.push("alice", tx_a);
        let _ = queue.push("bob", tx_b);

        queue.accept("alice");
        assert_eq!(queue.reject("alice").as_deref(), Some("bob"));
    }

    #[test]
    fn test_reject_releases_lock_when_drained() {
        let mut queue = IdentifyQueue::new();
        let (tx, _rx) = request();
        let _ = queue.push("alice", tx);

        assert_eq!(queue.reject("alice"), None);
        assert!(!queue.in_flight());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_same_nick_duplicates_resolve_in_order() {
        let mut queue = IdentifyQueue::new();
        let (tx_1, mut rx_1) = request();
        let (tx_2, mut rx_2) = request();
        let _ = queue.push("alice", tx_1);
        let _ = queue.push("alice", tx_2);

        queue.accept("alice");
        assert_eq!(rx_1.try_recv().unwrap(), IdentifyVerdict::Registered);
        assert_eq!(rx_2.try_recv().unwrap(), IdentifyVerdict::Registered);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_restart_rearms_head() {
        let mut queue = IdentifyQueue::new();
        let (tx, _rx) = request();
        let _ = queue.push("alice", tx);

        // connection died; a new welcome re-asks for the head
        assert_eq!(queue.restart().as_deref(), Some("alice"));
        assert!(queue.in_flight());

        let mut empty = IdentifyQueue::new();
        assert_eq!(empty.restart(), None);
        assert!(!empty.in_flight());
    }

    #[test]
    fn test_dropped_requester_does_not_wedge_queue() {
        let mut queue = IdentifyQueue::new();
        let (tx_a, rx_a) = request();
        let (tx_b, _rx_b) = request();
        let _ = queue.push("alice", tx_a);
        let _ = queue.push("bob", tx_b);
        drop(rx_a);

        assert_eq!(queue.reject("alice").as_deref(), Some("bob"));
    }
}
