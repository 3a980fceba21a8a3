//! Domain types for tasklist
//!
//! Core domain types: Item and the persisted Snapshot.

mod item;

pub use item::{INITIAL_NEXT_ID, Item, ItemId, Snapshot};
