//! Reactive state for the task list
//!
//! TodoStore owns the items, the ID counter and the lifetime completed
//! counter, persists through a key/value collaborator, and notifies
//! subscribers after every committed change.

mod store;
mod subscribers;

pub use store::{COMPLETED_TOTAL_KEY, ITEMS_KEY, NEXT_ID_KEY, TodoStore};
pub use subscribers::{Callback, SubscriberId, Subscription};
