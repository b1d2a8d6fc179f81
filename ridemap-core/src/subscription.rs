//! Subscription surface through which UI consumers observe the shared bootstrap state.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tracing::debug;

use crate::coordinator::MapBootstrap;
use crate::model::{MapStatus, MapView, Snapshot};

/// Callback invoked with every published snapshot.
pub type Listener = Arc<dyn Fn(&Snapshot) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, Listener>,
}

impl Listeners {
    fn insert(&mut self, listener: Listener) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, listener);
        id
    }

    fn remove(&mut self, id: u64) -> bool {
        self.entries.remove(&id).is_some()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn all(&self) -> Vec<Listener> {
        self.entries.values().cloned().collect()
    }
}

/// Keeps a listener attached; dropping it detaches the listener.
///
/// Detaching never affects the bootstrap state or a load in flight.
#[must_use = "dropping a Subscription detaches its listener"]
pub struct Subscription {
    id: u64,
    bootstrap: Weak<MapBootstrap>,
}

impl Subscription {
    /// Detach the listener now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bootstrap) = self.bootstrap.upgrade() {
            let removed = bootstrap.listeners.lock().remove(self.id);
            debug!(id = self.id, removed, "map state listener detached");
        }
    }
}

impl MapBootstrap {
    /// Attach a listener notified after every state change.
    pub fn subscribe<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.attach(Arc::new(listener))
    }

    /// Attach a UI consumer: the listener receives the current snapshot right away and every
    /// change after it, and the first mount starts the bootstrap in the background.
    ///
    /// A change racing the mount may be delivered twice but is never missed.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime while bootstrap has not started yet.
    pub fn mount<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let (subscription, current) = {
            // Holding the delivery lock orders this first delivery against concurrent publishes.
            let _delivery = self.delivery.lock();
            let subscription = self.attach(Arc::clone(&listener));
            let current = self.get_state();
            listener(&current);
            (subscription, current)
        };

        if current.status == MapStatus::NotConfigured {
            let bootstrap = Arc::clone(self);
            tokio::spawn(async move {
                bootstrap.ensure_loaded().await;
            });
        }
        subscription
    }

    /// Consistent snapshot of the current state.
    #[must_use]
    pub fn get_state(&self) -> Snapshot {
        self.snapshot()
    }

    /// Current state in the shape UI components render from.
    #[must_use]
    pub fn view(&self) -> MapView {
        self.snapshot().view()
    }

    /// Receiver yielding every published snapshot, for async consumers.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Deliver the current state to the watch channel and every listener.
    pub(crate) fn publish(&self) {
        let _delivery = self.delivery.lock();
        let snapshot = self.get_state();
        self.snapshots.send_replace(snapshot.clone());
        // Only the reentrant delivery lock is held, so listeners may subscribe, mount or read state.
        let listeners = self.listeners.lock().all();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    fn attach(self: &Arc<Self>, listener: Listener) -> Subscription {
        let id = self.listeners.lock().insert(listener);
        Subscription {
            id,
            bootstrap: Arc::downgrade(self),
        }
    }
}
