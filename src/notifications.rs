//! Change notification delivery
//!
//! Writes report the identifiers they changed either straight to a
//! [`ChangeNotifier`] or, inside an atomic sequence, into that sequence's
//! [`ChangeSet`], which is flushed once after commit.

use crate::contract::ResourceUri;
use std::collections::HashSet;
use tokio::sync::broadcast;
use tracing::trace;

/// Receives changed resource identifiers
pub trait ChangeNotifier: Send + Sync {
    fn notify_change(&self, uri: &ResourceUri);
}

/// Fan-out notifier backed by a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ResourceUri>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ResourceUri> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn notify_change(&self, uri: &ResourceUri) {
        trace!("Notifying change: {}", uri);
        // No subscribers is not an error
        let _ = self.sender.send(uri.clone());
    }
}

/// Notifier that drops everything, for tooling that has no observers
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn notify_change(&self, _uri: &ResourceUri) {}
}

/// Distinct changed identifiers in first-change order
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    seen: HashSet<ResourceUri>,
    ordered: Vec<ResourceUri>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change; returns false if the identifier was already pending.
    pub fn insert(&mut self, uri: ResourceUri) -> bool {
        if self.seen.contains(&uri) {
            return false;
        }
        self.seen.insert(uri.clone());
        self.ordered.push(uri);
        true
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceUri> {
        self.ordered.iter()
    }

    /// Deliver every pending identifier once and empty the set.
    pub fn flush(&mut self, notifier: &dyn ChangeNotifier) {
        for uri in self.ordered.drain(..) {
            notifier.notify_change(&uri);
        }
        self.seen.clear();
    }

    pub fn clear(&mut self) {
        self.ordered.clear();
        self.seen.clear();
    }
}

/// Route one change: defer into the enclosing sequence's set, or deliver now
/// when there is no sequence.
pub fn record_change(
    changes: Option<&mut ChangeSet>,
    notifier: &dyn ChangeNotifier,
    uri: ResourceUri,
) {
    match changes {
        Some(set) => {
            set.insert(uri);
        }
        None => notifier.notify_change(&uri),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_set_collapses_duplicates_in_order() {
        let mut set = ChangeSet::new();
        assert!(set.insert(ResourceUri::channel(2)));
        assert!(set.insert(ResourceUri::channel(1)));
        assert!(!set.insert(ResourceUri::channel(2)));
        let uris: Vec<_> = set.iter().cloned().collect();
        assert_eq!(uris, vec![ResourceUri::channel(2), ResourceUri::channel(1)]);
    }

    #[tokio::test]
    async fn test_flush_delivers_each_once() {
        let notifier = BroadcastNotifier::default();
        let mut rx = notifier.subscribe();

        let mut set = ChangeSet::new();
        set.insert(ResourceUri::programs());
        set.insert(ResourceUri::programs());
        set.insert(ResourceUri::channels());
        set.flush(&notifier);

        assert_eq!(rx.recv().await.unwrap(), ResourceUri::programs());
        assert_eq!(rx.recv().await.unwrap(), ResourceUri::channels());
        assert!(rx.try_recv().is_err());
        assert!(set.is_empty());
    }

    #[test]
    fn test_record_change_without_sequence_notifies_immediately() {
        let notifier = BroadcastNotifier::default();
        let mut rx = notifier.subscribe();
        record_change(None, &notifier, ResourceUri::channel(9));
        assert_eq!(rx.try_recv().unwrap(), ResourceUri::channel(9));

        let mut set = ChangeSet::new();
        record_change(Some(&mut set), &notifier, ResourceUri::channel(10));
        assert!(rx.try_recv().is_err());
        assert_eq!(set.len(), 1);
    }
}
