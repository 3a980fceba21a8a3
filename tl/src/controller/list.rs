//! ListController - ties the store, the scheduler and confirmation together

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::ItemId;
use crate::scheduler::{AutoClearConfig, AutoClearScheduler};
use crate::state::TodoStore;

use super::confirm::Confirm;

/// Counts shown in the footer / `stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Items not yet completed
    pub active: usize,
    /// Lifetime completed counter
    pub completed: u64,
    /// Items currently in the list
    pub total: usize,
}

/// Handles user actions against one task list
pub struct ListController {
    store: Arc<TodoStore>,
    scheduler: AutoClearScheduler,
    confirm: Box<dyn Confirm>,
    confirm_bulk: bool,
}

impl std::fmt::Debug for ListController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListController")
            .field("store", &self.store)
            .field("scheduler", &self.scheduler)
            .field("confirm_bulk", &self.confirm_bulk)
            .finish()
    }
}

impl ListController {
    /// Create a controller; must be called within a Tokio runtime if
    /// auto-clear is enabled
    pub fn new(store: Arc<TodoStore>, auto_clear: AutoClearConfig, confirm: Box<dyn Confirm>) -> Self {
        debug!(?auto_clear, "ListController::new: called");
        Self {
            scheduler: AutoClearScheduler::new(store.clone(), auto_clear),
            store,
            confirm,
            confirm_bulk: true,
        }
    }

    /// Whether bulk clears ask for confirmation first
    pub fn with_confirm_bulk(mut self, confirm_bulk: bool) -> Self {
        self.confirm_bulk = confirm_bulk;
        self
    }

    pub fn store(&self) -> &Arc<TodoStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &AutoClearScheduler {
        &self.scheduler
    }

    /// Add an item, returning its ID if anything was added
    pub fn add(&self, text: &str) -> Option<ItemId> {
        debug!(%text, "ListController::add: called");
        self.store.push_item(text)
    }

    /// Toggle completion, arming or disarming auto-clear to match
    pub fn toggle(&self, id: ItemId) -> bool {
        debug!(id, "ListController::toggle: called");
        if !self.store.toggle_complete(id) {
            return false;
        }
        match self.store.get(id) {
            Some(item) if item.completed => self.scheduler.schedule(id),
            _ => {
                self.scheduler.cancel(id);
            }
        }
        true
    }

    /// Replace an item's text
    pub fn edit(&self, id: ItemId, text: &str) -> bool {
        debug!(id, %text, "ListController::edit: called");
        self.store.update_text(id, text)
    }

    /// Delete an item, disarming its timer first
    pub fn delete(&self, id: ItemId) -> bool {
        debug!(id, "ListController::delete: called");
        self.scheduler.cancel(id);
        self.store.delete_item(id)
    }

    /// Remove all completed items after confirmation
    pub fn clear_completed(&self) -> bool {
        debug!("ListController::clear_completed: called");
        let completed = self.store.items().iter().filter(|item| item.completed).count();
        if completed == 0 {
            debug!("ListController::clear_completed: nothing completed");
            return false;
        }
        let plural = if completed == 1 { "" } else { "s" };
        if !self.confirmed(&format!("Clear {} completed item{}?", completed, plural)) {
            return false;
        }

        let cancelled = self.scheduler.cancel_all();
        let changed = self.store.clear_completed();
        info!(completed, cancelled, "Cleared completed items");
        changed
    }

    /// Delete everything and reset counters after confirmation
    pub fn clear_all(&self) -> bool {
        debug!("ListController::clear_all: called");
        if self.store.snapshot().is_pristine() {
            debug!("ListController::clear_all: store never used");
            return false;
        }
        let count = self.store.len();
        if !self.confirmed(&format!("Delete all {} items and reset counters?", count)) {
            return false;
        }

        let cancelled = self.scheduler.cancel_all();
        let changed = self.store.clear_all();
        info!(count, cancelled, "Cleared all items");
        changed
    }

    /// Whether an item is in its auto-clear window
    pub fn is_pending(&self, id: ItemId) -> bool {
        self.scheduler.is_pending(id)
    }

    pub fn stats(&self) -> Stats {
        Stats {
            active: self.store.active_count(),
            completed: self.store.completed_count(),
            total: self.store.len(),
        }
    }

    fn confirmed(&self, message: &str) -> bool {
        if !self.confirm_bulk {
            return true;
        }
        match self.confirm.confirm(message) {
            Ok(answer) => {
                debug!(%message, answer, "ListController::confirmed: answered");
                answer
            }
            Err(e) => {
                warn!(error = %e, "Confirmation failed, treating as no");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::AutoConfirm;
    use std::time::Duration;

    const DELAY: Duration = Duration::from_millis(300);

    fn controller(answer: bool) -> ListController {
        ListController::new(
            Arc::new(TodoStore::in_memory()),
            AutoClearConfig::with_delay(DELAY),
            Box::new(AutoConfirm(answer)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_arms_and_disarms() {
        let ctl = controller(true);
        let id = ctl.add("task").unwrap();

        assert!(ctl.toggle(id));
        assert!(ctl.is_pending(id));

        assert!(ctl.toggle(id));
        assert!(!ctl.is_pending(id));

        tokio::time::sleep(DELAY * 2).await;
        assert!(ctl.store().get(id).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_missing_does_not_arm() {
        let ctl = controller(true);
        assert!(!ctl.toggle(7));
        assert_eq!(ctl.scheduler().pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_cancels_timer() {
        let ctl = controller(true);
        let id = ctl.add("task").unwrap();
        ctl.toggle(id);

        assert!(ctl.delete(id));
        assert!(!ctl.is_pending(id));
        assert!(!ctl.delete(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_completed_confirms_and_cancels() {
        let ctl = controller(true);
        let a = ctl.add("a").unwrap();
        let b = ctl.add("b").unwrap();
        ctl.toggle(a);

        assert!(ctl.clear_completed());
        assert_eq!(ctl.scheduler().pending_count(), 0);
        assert!(ctl.store().get(a).is_none());
        assert!(ctl.store().get(b).is_some());
        assert!(!ctl.clear_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_declined_clear_all_changes_nothing() {
        let ctl = controller(false);
        let id = ctl.add("keep").unwrap();
        ctl.toggle(id);

        assert!(!ctl.clear_all());
        assert!(ctl.is_pending(id));
        assert_eq!(ctl.store().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_error_is_no() {
        let ctl = ListController::new(
            Arc::new(TodoStore::in_memory()),
            AutoClearConfig::with_delay(DELAY),
            Box::new(|_: &str| -> eyre::Result<bool> { Err(eyre::eyre!("no terminal")) }),
        );
        ctl.add("a");
        assert!(!ctl.clear_all());
        assert_eq!(ctl.store().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_bulk_disabled_skips_prompt() {
        let ctl = controller(false).with_confirm_bulk(false);
        ctl.add("a");
        assert!(ctl.clear_all());
        assert!(ctl.store().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_all_pristine_skips_prompt() {
        let ctl = ListController::new(
            Arc::new(TodoStore::in_memory()),
            AutoClearConfig::with_delay(DELAY),
            Box::new(|_: &str| -> eyre::Result<bool> { panic!("should not prompt") }),
        );
        assert!(!ctl.clear_all());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats() {
        let ctl = controller(true);
        let a = ctl.add("a").unwrap();
        ctl.add("b");
        ctl.toggle(a);

        assert_eq!(
            ctl.stats(),
            Stats {
                active: 1,
                completed: 1,
                total: 2
            }
        );

        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(
            ctl.stats(),
            Stats {
                active: 1,
                completed: 1,
                total: 1
            }
        );
    }
}
