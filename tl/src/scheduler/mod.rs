//! Auto-clear scheduler
//!
//! Arms a delayed removal when an item is completed, cancels it when the
//! item is un-completed or deleted, and exposes the pending-deletion set.

mod config;
mod core;

pub use config::{AutoClearConfig, DEFAULT_DELAY_MS};
pub use self::core::AutoClearScheduler;
