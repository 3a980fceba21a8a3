//! Terminal and JSON rendering shared by the CLI and the shell

use colored::Colorize;
use serde::Serialize;

use crate::controller::Stats;
use crate::domain::{Item, ItemId};

/// Item as emitted by `list --format json`
#[derive(Debug, Serialize)]
pub struct ItemView<'a> {
    #[serde(flatten)]
    pub item: &'a Item,

    /// Item is inside its auto-clear window
    pub pending_deletion: bool,
}

/// Pair every item with its pending flag
pub fn item_views<'a>(items: &'a [Item], pending: &[ItemId]) -> Vec<ItemView<'a>> {
    items
        .iter()
        .map(|item| ItemView {
            item,
            pending_deletion: pending.contains(&item.id),
        })
        .collect()
}

/// One display line for an item
pub fn item_line(item: &Item, pending: bool) -> String {
    let id = format!("#{:<3}", item.id).dimmed();
    let line = if item.completed {
        format!("{} {} {}", "[x]".green(), id, item.text.dimmed().strikethrough())
    } else {
        format!("{} {} {}", "[ ]".normal(), id, item.text)
    };
    if pending {
        format!("{} {}", line, "(clearing)".yellow())
    } else {
        line
    }
}

pub fn stats_line(stats: &Stats) -> String {
    format!(
        "{} active, {} completed, {} total",
        stats.active.to_string().bright_cyan(),
        stats.completed.to_string().green(),
        stats.total
    )
}

/// Print the list followed by the stats footer
pub fn print_list(items: &[Item], pending: &[ItemId], stats: &Stats) {
    if items.is_empty() {
        println!("{}", "Nothing to do.".dimmed());
    }
    for item in items {
        println!("{}", item_line(item, pending.contains(&item.id)));
    }
    println!("{}", stats_line(stats));
}
