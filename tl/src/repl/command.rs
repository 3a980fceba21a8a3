//! Shell command parsing

use thiserror::Error;

use crate::domain::ItemId;

/// A parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Add(String),
    List,
    Toggle(ItemId),
    Edit(ItemId, String),
    Remove(ItemId),
    ClearCompleted,
    ClearAll,
    Stats,
    Help,
    Quit,
}

/// Why a shell line could not be parsed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("{command} needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("not an item id: {0}")]
    InvalidId(String),
}

impl ReplCommand {
    /// Parse one non-empty input line
    pub fn parse(input: &str) -> Result<Self, CommandError> {
        let input = input.trim();
        let (word, rest) = match input.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (input, ""),
        };

        match word.to_lowercase().as_str() {
            "add" | "a" => Ok(Self::Add(require_text("add", rest)?)),
            "list" | "ls" => Ok(Self::List),
            "toggle" | "done" | "t" => Ok(Self::Toggle(parse_id("toggle", rest)?)),
            "edit" | "e" => {
                let (id, text) = match rest.split_once(char::is_whitespace) {
                    Some((id, text)) => (id, text),
                    None => (rest, ""),
                };
                let id = parse_id("edit", id)?;
                Ok(Self::Edit(id, require_text("edit", text)?))
            }
            "rm" | "delete" | "del" => Ok(Self::Remove(parse_id("rm", rest)?)),
            "clear-completed" | "cc" => Ok(Self::ClearCompleted),
            "clear-all" => Ok(Self::ClearAll),
            "stats" => Ok(Self::Stats),
            "help" | "h" | "?" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            _ => Err(CommandError::Unknown(word.to_string())),
        }
    }
}

fn require_text(command: &'static str, text: &str) -> Result<String, CommandError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CommandError::MissingArgument {
            command,
            argument: "some text",
        });
    }
    Ok(text.to_string())
}

fn parse_id(command: &'static str, raw: &str) -> Result<ItemId, CommandError> {
    let raw = raw.trim().trim_start_matches('#');
    if raw.is_empty() {
        return Err(CommandError::MissingArgument {
            command,
            argument: "an item id",
        });
    }
    raw.parse().map_err(|_| CommandError::InvalidId(raw.to_string()))
}
