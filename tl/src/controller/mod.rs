//! Controller layer
//!
//! Turns user actions into store mutations and keeps the auto-clear
//! scheduler in step with completion changes.

mod confirm;
mod list;

pub use confirm::{AutoConfirm, Confirm, TerminalConfirm};
pub use list::{ListController, Stats};
