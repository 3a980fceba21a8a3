//! TodoStore - sole owner of the item list
//!
//! Every mutation either leaves state untouched and returns false, or swaps
//! in a new item list, persists the full snapshot, and notifies subscribers,
//! in that order.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use kvstore::{KeyValueStore, KeyValueStoreExt};
use tracing::{debug, info, warn};

use crate::domain::{INITIAL_NEXT_ID, Item, ItemId, Snapshot};

use super::subscribers::{SubscriberSet, Subscription};

/// Storage key of the item list
pub const ITEMS_KEY: &str = "items";

/// Storage key of the next-id counter
pub const NEXT_ID_KEY: &str = "next_id";

/// Storage key of the lifetime completed counter
pub const COMPLETED_TOTAL_KEY: &str = "completed_total";

/// In-memory state; `items` is replaced wholesale, never edited in place
#[derive(Debug, Clone)]
struct StoreState {
    items: Arc<Vec<Item>>,
    next_id: ItemId,
    completed_total: u64,
}

impl StoreState {
    fn with_items(&self, items: Vec<Item>) -> Self {
        Self {
            items: Arc::new(items),
            next_id: self.next_id,
            completed_total: self.completed_total,
        }
    }

    fn position(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}

impl From<Snapshot> for StoreState {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            items: Arc::new(snapshot.items),
            next_id: snapshot.next_id,
            completed_total: snapshot.completed_total,
        }
    }
}

/// Reactive store for the task list
pub struct TodoStore {
    state: RwLock<StoreState>,
    storage: Option<Arc<dyn KeyValueStore>>,
    subscribers: SubscriberSet,
}

impl std::fmt::Debug for TodoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoStore")
            .field("state", &*self.read_state())
            .field("persistent", &self.storage.is_some())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl TodoStore {
    /// Load a store from the given storage, defaulting anything missing or invalid
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        debug!("TodoStore::load: called");
        let snapshot = read_snapshot(storage.as_ref());
        info!(
            items = snapshot.items.len(),
            next_id = snapshot.next_id,
            completed_total = snapshot.completed_total,
            "Loaded task list"
        );
        Self::from_parts(snapshot, Some(storage))
    }

    /// Create a store that never persists
    pub fn in_memory() -> Self {
        debug!("TodoStore::in_memory: called");
        Self::from_parts(Snapshot::default(), None)
    }

    fn from_parts(snapshot: Snapshot, storage: Option<Arc<dyn KeyValueStore>>) -> Self {
        Self {
            state: RwLock::new(snapshot.into()),
            storage,
            subscribers: SubscriberSet::default(),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    // === Reads ===

    /// Current item list; cheap to clone and never torn by later mutations
    pub fn items(&self) -> Arc<Vec<Item>> {
        self.read_state().items.clone()
    }

    /// Get an item by ID
    pub fn get(&self, id: ItemId) -> Option<Item> {
        self.read_state().items.iter().find(|item| item.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_state().items.is_empty()
    }

    /// ID the next added item will receive
    pub fn next_id(&self) -> ItemId {
        self.read_state().next_id
    }

    /// Lifetime count of distinct items ever completed
    pub fn completed_total(&self) -> u64 {
        self.read_state().completed_total
    }

    /// Number of items not yet completed
    pub fn active_count(&self) -> usize {
        self.read_state().items.iter().filter(|item| !item.completed).count()
    }

    /// Completed statistic shown to users
    ///
    /// This is the lifetime counter, not the number of completed items still
    /// in the list, so auto-cleared items keep counting.
    pub fn completed_count(&self) -> u64 {
        self.completed_total()
    }

    /// Whether mutations are written to a storage collaborator
    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    /// Full state as one comparable value
    pub fn snapshot(&self) -> Snapshot {
        let state = self.read_state();
        Snapshot {
            items: state.items.as_ref().clone(),
            next_id: state.next_id,
            completed_total: state.completed_total,
        }
    }

    // === Mutations ===

    /// Add an item, returning its ID
    ///
    /// Returns None if the trimmed text is empty or the ID space is used up.
    pub fn push_item(&self, text: &str) -> Option<ItemId> {
        debug!(%text, "TodoStore::push_item: called");
        let text = text.trim();
        if text.is_empty() {
            debug!("TodoStore::push_item: empty text, ignoring");
            return None;
        }

        let mut added = None;
        self.commit("add_item", |state| {
            let id = state.next_id;
            let Some(next_id) = id.checked_add(1) else {
                warn!(id, "TodoStore::push_item: item ids exhausted, not adding");
                return None;
            };
            let mut items = state.items.as_ref().clone();
            items.push(Item::new(id, text));
            added = Some(id);
            Some(StoreState {
                items: Arc::new(items),
                next_id,
                completed_total: state.completed_total,
            })
        });
        added
    }

    /// Add an item
    pub fn add_item(&self, text: &str) -> bool {
        self.push_item(text).is_some()
    }

    /// Flip an item's completed flag
    ///
    /// The first completion of an item bumps the lifetime counter; later
    /// re-completions of the same item do not.
    pub fn toggle_complete(&self, id: ItemId) -> bool {
        debug!(id, "TodoStore::toggle_complete: called");
        self.commit("toggle_complete", |state| {
            let pos = state.position(id)?;
            let mut next = state.with_items(state.items.as_ref().clone());
            let items = Arc::make_mut(&mut next.items);
            let item = &mut items[pos];
            item.completed = !item.completed;
            if item.completed && !item.was_counted {
                item.was_counted = true;
                next.completed_total = next.completed_total.saturating_add(1);
            }
            Some(next)
        })
    }

    /// Remove an item; the lifetime counter is left alone
    pub fn delete_item(&self, id: ItemId) -> bool {
        debug!(id, "TodoStore::delete_item: called");
        self.delete_item_if(id, |_| true)
    }

    /// Remove an item only if `keep_deleting` approves its current state
    ///
    /// The check and the removal happen under the same lock, so a concurrent
    /// mutation cannot slip in between them.
    pub fn delete_item_if<P>(&self, id: ItemId, keep_deleting: P) -> bool
    where
        P: FnOnce(&Item) -> bool,
    {
        self.commit("delete_item", |state| {
            let pos = state.position(id)?;
            if !keep_deleting(&state.items[pos]) {
                return None;
            }
            let mut items = state.items.as_ref().clone();
            items.remove(pos);
            Some(state.with_items(items))
        })
    }

    /// Replace an item's text
    ///
    /// Empty text, a missing item, or text identical to the current text
    /// are all no-ops.
    pub fn update_text(&self, id: ItemId, new_text: &str) -> bool {
        debug!(id, %new_text, "TodoStore::update_text: called");
        let new_text = new_text.trim();
        if new_text.is_empty() {
            debug!(id, "TodoStore::update_text: empty text, ignoring");
            return false;
        }
        self.commit("update_text", |state| {
            let pos = state.position(id)?;
            if state.items[pos].text == new_text {
                return None;
            }
            let mut items = state.items.as_ref().clone();
            items[pos].text = new_text.to_string();
            Some(state.with_items(items))
        })
    }

    /// Remove every completed item
    pub fn clear_completed(&self) -> bool {
        debug!("TodoStore::clear_completed: called");
        self.commit("clear_completed", |state| {
            if !state.items.iter().any(|item| item.completed) {
                return None;
            }
            let items = state.items.iter().filter(|item| !item.completed).cloned().collect();
            Some(state.with_items(items))
        })
    }

    /// Reset to a fresh list: no items, next ID 1, lifetime counter 0
    ///
    /// Only a store that has never been used reports no change.
    pub fn clear_all(&self) -> bool {
        debug!("TodoStore::clear_all: called");
        self.commit("clear_all", |state| {
            if state.items.is_empty() && state.next_id == INITIAL_NEXT_ID && state.completed_total == 0 {
                return None;
            }
            Some(Snapshot::default().into())
        })
    }

    // === Observers ===

    /// Register a callback invoked after every committed mutation
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let subscription = self.subscribers.add(Arc::new(callback));
        debug!(subscriber_id = subscription.id(), "TodoStore::subscribe: registered");
        subscription
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    // === Commit ===

    /// Apply a mutation: swap state and persist under the lock, then notify
    ///
    /// `mutate` returns None when nothing would change.
    fn commit<F>(&self, op: &'static str, mutate: F) -> bool
    where
        F: FnOnce(&StoreState) -> Option<StoreState>,
    {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let Some(next) = mutate(&*state) else {
                debug!(op, "TodoStore::commit: no change");
                return false;
            };
            *state = next;
            self.persist(&*state);
        }

        debug!(op, subscribers = self.subscribers.len(), "TodoStore::commit: notifying subscribers");
        self.subscribers.notify();
        true
    }

    /// Write the full snapshot; failures are logged and swallowed
    fn persist(&self, state: &StoreState) {
        let Some(storage) = &self.storage else {
            return;
        };
        if let Err(e) = storage.save_json(ITEMS_KEY, state.items.as_ref()) {
            warn!(error = %e, key = ITEMS_KEY, "Failed to persist items");
        }
        if let Err(e) = storage.save_json(NEXT_ID_KEY, &state.next_id) {
            warn!(error = %e, key = NEXT_ID_KEY, "Failed to persist next id");
        }
        if let Err(e) = storage.save_json(COMPLETED_TOTAL_KEY, &state.completed_total) {
            warn!(error = %e, key = COMPLETED_TOTAL_KEY, "Failed to persist completed total");
        }
    }
}

/// Read a snapshot, substituting defaults for anything missing or invalid
fn read_snapshot(storage: &dyn KeyValueStore) -> Snapshot {
    let items: Vec<Item> = storage.load_or(ITEMS_KEY, Vec::new());
    let items = match Snapshot::check_items(&items) {
        Ok(()) => items,
        Err(reason) => {
            warn!(%reason, "Stored items are invalid, starting with an empty list");
            Vec::new()
        }
    };

    Snapshot {
        items,
        next_id: storage.load_or(NEXT_ID_KEY, INITIAL_NEXT_ID),
        completed_total: storage.load_or(COMPLETED_TOTAL_KEY, 0),
    }
    .repaired()
}
