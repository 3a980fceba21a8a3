//! Auto-clear scheduler implementation

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::ItemId;
use crate::state::TodoStore;

use super::config::AutoClearConfig;

/// One armed timer
struct PendingTimer {
    /// Bumped on every arm, so a stale fire can tell it lost a race
    generation: u64,
    handle: JoinHandle<()>,
}

/// Internal state protected by mutex
#[derive(Default)]
struct SchedulerInner {
    /// Armed timers by item ID; the key set is the pending-deletion set
    timers: HashMap<ItemId, PendingTimer>,

    next_generation: u64,
}

struct Shared {
    inner: Mutex<SchedulerInner>,
    pending_tx: watch::Sender<BTreeSet<ItemId>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SchedulerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Broadcast the pending set; called with the lock held
    fn publish(&self, inner: &SchedulerInner) {
        self.pending_tx.send_replace(inner.timers.keys().copied().collect());
    }
}

/// Removes completed items after a delay unless they are un-completed or
/// deleted first, and tracks which IDs are in that window.
///
/// Timers are Tokio tasks, so `schedule` must be called from within a Tokio
/// runtime.
pub struct AutoClearScheduler {
    config: AutoClearConfig,
    store: Arc<TodoStore>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for AutoClearScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoClearScheduler")
            .field("config", &self.config)
            .field("pending", &self.pending_ids())
            .finish()
    }
}

impl AutoClearScheduler {
    /// Create a new scheduler for the given store
    pub fn new(store: Arc<TodoStore>, config: AutoClearConfig) -> Self {
        debug!(?config, "AutoClearScheduler::new: called");
        let (pending_tx, _) = watch::channel(BTreeSet::new());
        Self {
            config,
            store,
            shared: Arc::new(Shared {
                inner: Mutex::new(SchedulerInner::default()),
                pending_tx,
            }),
        }
    }

    pub fn config(&self) -> &AutoClearConfig {
        &self.config
    }

    /// Arm the auto-clear timer for an item, replacing any existing one
    pub fn schedule(&self, id: ItemId) {
        debug!(id, "AutoClearScheduler::schedule: called");
        if !self.config.enabled {
            debug!(id, "AutoClearScheduler::schedule: auto-clear disabled");
            return;
        }

        let mut inner = self.shared.lock();
        if let Some(old) = inner.timers.remove(&id) {
            debug!(id, "AutoClearScheduler::schedule: re-arming, aborting old timer");
            old.handle.abort();
        }

        inner.next_generation += 1;
        let generation = inner.next_generation;
        let handle = tokio::spawn(fire_after(
            self.config.delay(),
            id,
            generation,
            self.store.clone(),
            Arc::downgrade(&self.shared),
        ));
        inner.timers.insert(id, PendingTimer { generation, handle });
        self.shared.publish(&inner);
        debug!(id, generation, delay_ms = self.config.delay_ms, "Auto-clear armed");
    }

    /// Disarm the timer for an item; returns false if none was pending
    pub fn cancel(&self, id: ItemId) -> bool {
        debug!(id, "AutoClearScheduler::cancel: called");
        let mut inner = self.shared.lock();
        match inner.timers.remove(&id) {
            Some(timer) => {
                timer.handle.abort();
                self.shared.publish(&inner);
                debug!(id, "AutoClearScheduler::cancel: timer aborted");
                true
            }
            None => {
                debug!(id, "AutoClearScheduler::cancel: nothing pending");
                false
            }
        }
    }

    /// Disarm every timer, returning how many were pending
    pub fn cancel_all(&self) -> usize {
        debug!("AutoClearScheduler::cancel_all: called");
        let mut inner = self.shared.lock();
        let count = inner.timers.len();
        for (_, timer) in inner.timers.drain() {
            timer.handle.abort();
        }
        if count > 0 {
            self.shared.publish(&inner);
        }
        count
    }

    /// Whether an item is in its auto-clear window
    pub fn is_pending(&self, id: ItemId) -> bool {
        self.shared.lock().timers.contains_key(&id)
    }

    /// Pending IDs in ascending order
    pub fn pending_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<_> = self.shared.lock().timers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn pending_count(&self) -> usize {
        self.shared.lock().timers.len()
    }

    /// Receiver that observes every change to the pending set
    pub fn watch_pending(&self) -> watch::Receiver<BTreeSet<ItemId>> {
        self.shared.pending_tx.subscribe()
    }

    /// Wait until no timer is pending
    pub async fn wait_idle(&self) {
        debug!("AutoClearScheduler::wait_idle: called");
        let mut rx = self.watch_pending();
        let _ = rx.wait_for(|pending| pending.is_empty()).await;
    }
}

impl Drop for AutoClearScheduler {
    fn drop(&mut self) {
        let aborted = self.cancel_all();
        if aborted > 0 {
            debug!(aborted, "AutoClearScheduler::drop: aborted pending timers");
        }
    }
}

/// Timer body: sleep, claim the pending entry, then delete if still completed
async fn fire_after(delay: Duration, id: ItemId, generation: u64, store: Arc<TodoStore>, shared: Weak<Shared>) {
    tokio::time::sleep(delay).await;

    let Some(shared) = shared.upgrade() else {
        return;
    };

    {
        let mut inner = shared.lock();
        match inner.timers.get(&id) {
            Some(timer) if timer.generation == generation => {
                inner.timers.remove(&id);
                shared.publish(&inner);
            }
            _ => {
                debug!(id, generation, "fire_after: superseded by cancel or re-arm");
                return;
            }
        }
    }

    // The store may have changed since the timer was armed
    if store.delete_item_if(id, |item| item.completed) {
        info!(id, "Auto-cleared completed item");
    } else {
        debug!(id, "fire_after: item gone or no longer completed, skipping");
    }
}
