//! tasklist - a single-user task list with auto-clearing completed items
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   mutations   ┌────────────┐   save/load   ┌─────────┐
//! │ListController│──────────────>│ TodoStore  │──────────────>│ kvstore │
//! └──────┬───────┘               └─────┬──────┘               └─────────┘
//!        │ schedule/cancel             │ notify
//!        v                             v
//! ┌──────────────────┐  delete_if ┌─────────────┐
//! │AutoClearScheduler│───────────>│ subscribers │ (shell redraw, tests)
//! └──────────────────┘            └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`domain`] - Item and persisted snapshot types
//! - [`state`] - The reactive store and its subscriber registry
//! - [`scheduler`] - Delayed removal of completed items
//! - [`controller`] - User actions, confirmation, stats
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface
//! - [`repl`] - Interactive shell

pub mod cli;
pub mod config;
pub mod controller;
pub mod domain;
pub mod repl;
pub mod scheduler;
pub mod state;
pub mod view;

// Re-export commonly used types
pub use config::{Config, StorageConfig};
pub use controller::{AutoConfirm, Confirm, ListController, Stats, TerminalConfirm};
pub use domain::{Item, ItemId, Snapshot};
pub use scheduler::{AutoClearConfig, AutoClearScheduler};
pub use state::{Subscription, TodoStore};
