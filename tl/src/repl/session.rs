//! REPL session management

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, info};

use crate::controller::ListController;
use crate::state::Subscription;
use crate::view;

use super::command::ReplCommand;

/// What the loop does after a command
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Interactive task list session
pub struct ReplSession {
    controller: ListController,
    /// Bumped by the store on every committed change, including auto-clears
    changes: Arc<AtomicU64>,
    /// Value of `changes` when the list was last drawn
    rendered: AtomicU64,
    subscription: Option<Subscription>,
}

impl ReplSession {
    /// Create a new session and start observing the store
    pub fn new(controller: ListController) -> Self {
        debug!("ReplSession::new: called");
        let changes = Arc::new(AtomicU64::new(0));
        let counter = changes.clone();
        let subscription = controller.store().subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        Self {
            controller,
            changes,
            rendered: AtomicU64::new(0),
            subscription: Some(subscription),
        }
    }

    /// Run the REPL main loop
    ///
    /// Readline blocks in place, so this needs the multi-threaded runtime
    /// for auto-clear timers to keep firing while waiting for input.
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();
        self.render();

        // Create readline editor for proper line editing
        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let prompt = format!("{} ", ">".bright_green());
            let readline = tokio::task::block_in_place(|| rl.readline(&prompt));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if !input.is_empty() {
                        let _ = rl.add_history_entry(input);
                    }
                    if self.handle_line(input) == Flow::Quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C - just show new prompt
                    println!("^C");
                    self.redraw_if_changed();
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D - exit
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Handle one line of input, then redraw if the store moved on
    ///
    /// Blank and unparsable lines still redraw, so an auto-clear that fired
    /// while the prompt was waiting shows up after any input at all.
    fn handle_line(&self, input: &str) -> Flow {
        let input = input.trim();
        if !input.is_empty() {
            match ReplCommand::parse(input) {
                Ok(command) => {
                    if self.execute(command) == Flow::Quit {
                        return Flow::Quit;
                    }
                }
                Err(e) => {
                    println!("{} {}", "?".yellow(), e);
                    println!("Type {} for available commands", "help".yellow());
                }
            }
        }
        self.redraw_if_changed();
        Flow::Continue
    }

    fn redraw_if_changed(&self) {
        if self.changes.load(Ordering::SeqCst) != self.rendered.load(Ordering::SeqCst) {
            self.render();
        }
    }

    fn execute(&self, command: ReplCommand) -> Flow {
        debug!(?command, "ReplSession::execute: called");
        let ctl = &self.controller;
        match command {
            ReplCommand::Add(text) => match ctl.add(&text) {
                Some(id) => println!("Added #{}", id),
                None => println!("{}", "Nothing to add.".dimmed()),
            },
            ReplCommand::List => self.render(),
            ReplCommand::Toggle(id) => {
                if !ctl.toggle(id) {
                    println!("{} No item #{}", "?".yellow(), id);
                }
            }
            ReplCommand::Edit(id, text) => {
                if !ctl.edit(id, &text) {
                    println!("{}", format!("Item #{} unchanged.", id).dimmed());
                }
            }
            ReplCommand::Remove(id) => {
                if !ctl.delete(id) {
                    println!("{} No item #{}", "?".yellow(), id);
                }
            }
            ReplCommand::ClearCompleted => {
                if !ctl.clear_completed() {
                    println!("{}", "Nothing cleared.".dimmed());
                }
            }
            ReplCommand::ClearAll => {
                if !ctl.clear_all() {
                    println!("{}", "Nothing cleared.".dimmed());
                }
            }
            ReplCommand::Stats => println!("{}", view::stats_line(&ctl.stats())),
            ReplCommand::Help => self.print_help(),
            ReplCommand::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn render(&self) {
        self.rendered.store(self.changes.load(Ordering::SeqCst), Ordering::SeqCst);
        let ctl = &self.controller;
        view::print_list(&ctl.store().items(), &ctl.scheduler().pending_ids(), &ctl.stats());
    }

    /// Print welcome message
    fn print_welcome(&self) {
        println!();
        println!("{}", "tasklist".bright_cyan().bold());
        let auto_clear = self.controller.scheduler().config();
        if auto_clear.enabled {
            println!("Completed items clear after {} ms", auto_clear.delay_ms);
        }
        println!("Type {} for help, {} to quit", "help".yellow(), "quit".yellow());
        println!();
    }

    /// Print help message
    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:22} Add an item", "add <text>".yellow());
        println!("  {:22} Show the list", "list".yellow());
        println!("  {:22} Toggle completion", "toggle <id>".yellow());
        println!("  {:22} Replace an item's text", "edit <id> <text>".yellow());
        println!("  {:22} Delete an item", "rm <id>".yellow());
        println!("  {:22} Remove completed items", "clear-completed".yellow());
        println!("  {:22} Delete everything", "clear-all".yellow());
        println!("  {:22} Show counts", "stats".yellow());
        println!("  {:22} Exit the shell", "quit".yellow());
        println!();
    }
}

impl Drop for ReplSession {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            info!("Shell session closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::AutoConfirm;
    use crate::scheduler::AutoClearConfig;
    use crate::state::TodoStore;
    use std::time::Duration;

    fn session() -> ReplSession {
        let controller = ListController::new(
            Arc::new(TodoStore::in_memory()),
            AutoClearConfig::with_delay(Duration::from_millis(100)),
            Box::new(AutoConfirm(true)),
        );
        ReplSession::new(controller)
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_commands() {
        let session = session();
        assert_eq!(session.execute(ReplCommand::Add("first".into())), Flow::Continue);
        session.execute(ReplCommand::Add("second".into()));
        session.execute(ReplCommand::Edit(2, "renamed".into()));
        session.execute(ReplCommand::Toggle(1));

        let store = session.controller.store();
        assert_eq!(store.get(2).unwrap().text, "renamed");
        assert!(session.controller.is_pending(1));
        assert_eq!(session.changes.load(Ordering::SeqCst), 4);

        session.execute(ReplCommand::Remove(2));
        assert_eq!(store.len(), 1);
        assert_eq!(session.execute(ReplCommand::Quit), Flow::Quit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_clear_counts_as_change() {
        let session = session();
        session.execute(ReplCommand::Add("quick".into()));
        session.execute(ReplCommand::Toggle(1));
        let before = session.changes.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(session.changes.load(Ordering::SeqCst), before + 1);
        assert!(session.controller.store().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_line_redraws_after_auto_clear() {
        let session = session();
        session.execute(ReplCommand::Add("quick".into()));
        session.execute(ReplCommand::Toggle(1));
        session.render();
        let drawn = session.rendered.load(Ordering::SeqCst);
        assert_eq!(drawn, session.changes.load(Ordering::SeqCst));

        // The item clears while the prompt is waiting
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(session.controller.store().is_empty());
        assert_eq!(session.rendered.load(Ordering::SeqCst), drawn);

        assert_eq!(session.handle_line("frobnicate 7"), Flow::Continue);
        assert_eq!(session.rendered.load(Ordering::SeqCst), drawn + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_line_redraws_after_change() {
        let session = session();
        session.render();
        session.controller.add("from elsewhere");

        assert_eq!(session.handle_line("   "), Flow::Continue);
        assert_eq!(
            session.rendered.load(Ordering::SeqCst),
            session.changes.load(Ordering::SeqCst)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_line_quit() {
        let session = session();
        assert_eq!(session.handle_line("add one"), Flow::Continue);
        assert_eq!(session.controller.store().len(), 1);
        assert_eq!(session.handle_line("quit"), Flow::Quit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_unsubscribes() {
        let session = session();
        let store = session.controller.store().clone();
        assert_eq!(store.subscriber_count(), 1);
        drop(session);
        assert_eq!(store.subscriber_count(), 0);
    }
}
