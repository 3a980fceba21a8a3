//! tl - task list command-line entry point

use std::fs;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use kvstore::{FileBackend, KeyValueStore, Storage};
use tasklist::cli::{Cli, Command, OutputFormat, get_log_path, join_text};
use tasklist::config::Config;
use tasklist::controller::{AutoConfirm, Confirm, ListController, TerminalConfirm};
use tasklist::domain::ItemId;
use tasklist::repl;
use tasklist::state::TodoStore;
use tasklist::view;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    // Append: one-shot commands would otherwise wipe each other's logs
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    debug!(?config, "main: loaded config");

    let store = open_store(&config)?;

    // Dispatch command
    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Add { text }) => {
            debug!(?text, "main: matched Add command");
            cmd_add(&controller(&config, store, false), &join_text(&text))
        }
        Some(Command::List { format }) => {
            debug!(?format, "main: matched List command");
            cmd_list(&controller(&config, store, false), format)
        }
        Some(Command::Toggle { id, wait }) => {
            debug!(id, wait, "main: matched Toggle command");
            cmd_toggle(&controller(&config, store, false), id, wait).await
        }
        Some(Command::Edit { id, text }) => {
            debug!(id, ?text, "main: matched Edit command");
            cmd_edit(&controller(&config, store, false), id, &join_text(&text))
        }
        Some(Command::Rm { id }) => {
            debug!(id, "main: matched Rm command");
            cmd_rm(&controller(&config, store, false), id)
        }
        Some(Command::ClearCompleted { yes }) => {
            debug!(yes, "main: matched ClearCompleted command");
            cmd_clear_completed(&controller(&config, store, yes))
        }
        Some(Command::ClearAll { yes }) => {
            debug!(yes, "main: matched ClearAll command");
            cmd_clear_all(&controller(&config, store, yes))
        }
        Some(Command::Stats { format }) => {
            debug!(?format, "main: matched Stats command");
            cmd_stats(&controller(&config, store, false), format)
        }
        None => {
            debug!("main: no command specified, launching shell");
            repl::run_interactive(controller(&config, store, false)).await
        }
    }
}

/// Open the file-backed store named by the config
fn open_store(config: &Config) -> Result<Arc<TodoStore>> {
    let dir = config.storage.expanded_dir();
    debug!(?dir, namespace = %config.storage.namespace, "open_store: called");
    let backend = FileBackend::open(&dir).context(format!("Failed to open storage in {}", dir.display()))?;
    let storage: Arc<dyn KeyValueStore> = Arc::new(Storage::new(config.storage.namespace.clone(), backend));
    Ok(Arc::new(TodoStore::load(storage)))
}

fn controller(config: &Config, store: Arc<TodoStore>, yes: bool) -> ListController {
    let confirm: Box<dyn Confirm> = if yes {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(TerminalConfirm)
    };
    ListController::new(store, config.auto_clear.clone(), confirm).with_confirm_bulk(config.confirm_bulk)
}

fn cmd_add(ctl: &ListController, text: &str) -> Result<()> {
    debug!(%text, "cmd_add: called");
    match ctl.add(text) {
        Some(id) => println!("Added #{}", id),
        None => println!("{}", "Nothing to add: text is empty.".dimmed()),
    }
    Ok(())
}

fn cmd_list(ctl: &ListController, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_list: called");
    let items = ctl.store().items();
    let pending = ctl.scheduler().pending_ids();
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&view::item_views(&items, &pending))?);
        }
        OutputFormat::Text => view::print_list(&items, &pending, &ctl.stats()),
    }
    Ok(())
}

async fn cmd_toggle(ctl: &ListController, id: ItemId, wait: bool) -> Result<()> {
    debug!(id, wait, "cmd_toggle: called");
    if !ctl.toggle(id) {
        println!("No item #{}", id);
        return Ok(());
    }

    let Some(item) = ctl.store().get(id) else {
        return Ok(());
    };
    // Without --wait the timer dies with the process, so nothing is clearing
    println!("{}", view::item_line(&item, wait && ctl.is_pending(id)));

    if ctl.is_pending(id) {
        if wait {
            debug!(id, "cmd_toggle: waiting for auto-clear");
            ctl.scheduler().wait_idle().await;
            if ctl.store().get(id).is_none() {
                println!("Cleared #{}", id);
            }
        } else {
            println!(
                "{}",
                "Use --wait or the shell to let completed items clear themselves.".dimmed()
            );
        }
    }
    Ok(())
}

fn cmd_edit(ctl: &ListController, id: ItemId, text: &str) -> Result<()> {
    debug!(id, %text, "cmd_edit: called");
    if ctl.edit(id, text) {
        println!("Updated #{}", id);
    } else {
        println!("{}", format!("Item #{} unchanged.", id).dimmed());
    }
    Ok(())
}

fn cmd_rm(ctl: &ListController, id: ItemId) -> Result<()> {
    debug!(id, "cmd_rm: called");
    if ctl.delete(id) {
        println!("Deleted #{}", id);
    } else {
        println!("No item #{}", id);
    }
    Ok(())
}

fn cmd_clear_completed(ctl: &ListController) -> Result<()> {
    debug!("cmd_clear_completed: called");
    let before = ctl.store().len();
    if ctl.clear_completed() {
        println!("Cleared {} completed items", before - ctl.store().len());
    } else {
        println!("{}", "Nothing cleared.".dimmed());
    }
    Ok(())
}

fn cmd_clear_all(ctl: &ListController) -> Result<()> {
    debug!("cmd_clear_all: called");
    if ctl.clear_all() {
        println!("List cleared");
    } else {
        println!("{}", "Nothing cleared.".dimmed());
    }
    Ok(())
}

fn cmd_stats(ctl: &ListController, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_stats: called");
    let stats = ctl.stats();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => println!("{}", view::stats_line(&stats)),
    }
    Ok(())
}
