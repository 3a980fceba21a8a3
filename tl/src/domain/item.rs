//! Item domain type
//!
//! A single task record plus the snapshot that gets persisted.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Unique identifier for an item, assigned monotonically starting at 1
pub type ItemId = u64;

/// Value of `next_id` for a store that has never been used
pub const INITIAL_NEXT_ID: ItemId = 1;

/// A single task in the list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item ID
    pub id: ItemId,

    /// Task text, trimmed and never empty
    pub text: String,

    /// Whether the task is done
    pub completed: bool,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Set the first time the item is completed, so that re-completing it
    /// does not bump the lifetime counter again
    #[serde(default)]
    pub was_counted: bool,
}

impl Item {
    /// Create a new, incomplete item
    pub fn new(id: ItemId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
            created_at: Utc::now().timestamp_millis(),
            was_counted: false,
        }
    }

    /// Creation time as a UTC datetime
    pub fn created(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }

    /// Whether this record could have been produced by the store
    ///
    /// `ItemId::MAX` is never handed out: no `next_id` could follow it.
    pub fn is_valid(&self) -> bool {
        self.id > 0 && self.id < ItemId::MAX && !self.text.trim().is_empty()
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = if self.completed { "x" } else { " " };
        write!(f, "[{}] #{} {}", mark, self.id, self.text)
    }
}

/// Everything the store persists, in one comparable value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Items in insertion order
    pub items: Vec<Item>,

    /// Next ID to hand out
    pub next_id: ItemId,

    /// Lifetime count of distinct items ever completed
    pub completed_total: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_id: INITIAL_NEXT_ID,
            completed_total: 0,
        }
    }
}

impl Snapshot {
    /// True when nothing has ever been added or counted
    pub fn is_pristine(&self) -> bool {
        self.items.is_empty() && self.next_id == INITIAL_NEXT_ID && self.completed_total == 0
    }

    /// Largest ID present in the item list
    pub fn max_id(&self) -> Option<ItemId> {
        self.items.iter().map(|i| i.id).max()
    }

    /// Check that a loaded item list is one the store could have produced
    pub fn check_items(items: &[Item]) -> Result<(), String> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in items {
            if !item.is_valid() {
                return Err(format!("invalid item #{}", item.id));
            }
            if !seen.insert(item.id) {
                return Err(format!("duplicate item id #{}", item.id));
            }
        }
        Ok(())
    }

    /// Restore the counter invariants after loading from storage
    ///
    /// `next_id` must exceed every ID in the list, and `completed_total` can
    /// never be below the number of counted items still marked completed.
    pub fn repaired(mut self) -> Self {
        let min_next_id = self
            .max_id()
            .map_or(INITIAL_NEXT_ID, |id| id.saturating_add(1));
        if self.next_id < min_next_id {
            debug!(stored = self.next_id, repaired = min_next_id, "Snapshot::repaired: next_id too low");
            self.next_id = min_next_id;
        }

        let counted = self.items.iter().filter(|i| i.completed && i.was_counted).count() as u64;
        if self.completed_total < counted {
            debug!(
                stored = self.completed_total,
                repaired = counted,
                "Snapshot::repaired: completed_total too low"
            );
            self.completed_total = counted;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_defaults() {
        let item = Item::new(3, "Write docs");
        assert_eq!(item.id, 3);
        assert!(!item.completed);
        assert!(!item.was_counted);
        assert!(item.created().is_some());
        assert_eq!(item.to_string(), "[ ] #3 Write docs");
    }

    #[test]
    fn test_new_item_is_stamped_now() {
        let before = Utc::now().timestamp_millis();
        let item = Item::new(1, "stamp");
        let after = Utc::now().timestamp_millis();
        assert!((before..=after).contains(&item.created_at));
    }

    #[test]
    fn test_was_counted_defaults_when_missing() {
        let json = r#"{"id": 1, "text": "legacy", "completed": true, "created_at": 0}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert!(!item.was_counted);
    }

    #[test]
    fn test_check_items_rejects_duplicates_and_blanks() {
        let ok = vec![Item::new(1, "a"), Item::new(2, "b")];
        assert!(Snapshot::check_items(&ok).is_ok());

        let dup = vec![Item::new(1, "a"), Item::new(1, "b")];
        assert!(Snapshot::check_items(&dup).is_err());

        let blank = vec![Item::new(1, "   ")];
        assert!(Snapshot::check_items(&blank).is_err());

        let zero = vec![Item::new(0, "a")];
        assert!(Snapshot::check_items(&zero).is_err());
    }

    #[test]
    fn test_repaired_bumps_counters() {
        let mut done = Item::new(7, "done");
        done.completed = true;
        done.was_counted = true;
        let snapshot = Snapshot {
            items: vec![Item::new(2, "a"), done],
            next_id: 3,
            completed_total: 0,
        }
        .repaired();

        assert_eq!(snapshot.next_id, 8);
        assert_eq!(snapshot.completed_total, 1);
    }

    #[test]
    fn test_pristine() {
        assert!(Snapshot::default().is_pristine());
        let used = Snapshot {
            next_id: 4,
            ..Default::default()
        };
        assert!(!used.is_pristine());

        // A counter left behind by a half-persisted reset still counts as use
        let counted = Snapshot {
            completed_total: 3,
            ..Default::default()
        };
        assert!(!counted.is_pristine());
    }

    #[test]
    fn test_check_items_rejects_max_id() {
        let max = vec![Item::new(ItemId::MAX, "last")];
        assert!(Snapshot::check_items(&max).is_err());

        let almost = vec![Item::new(ItemId::MAX - 1, "fits")];
        assert!(Snapshot::check_items(&almost).is_ok());
        let snapshot = Snapshot {
            items: almost,
            next_id: 1,
            completed_total: 0,
        }
        .repaired();
        assert_eq!(snapshot.next_id, ItemId::MAX);
    }
}
