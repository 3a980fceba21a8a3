//! Interactive shell for tasklist
//!
//! A rustyline loop over a [`ListController`]. After each line of input,
//! blank or invalid ones included, the list is redrawn if the store changed
//! since it was last drawn. An auto-clear that fires while the prompt is
//! waiting therefore shows up after the next line.

mod command;
mod session;

pub use command::{CommandError, ReplCommand};
pub use session::ReplSession;

use eyre::Result;

use crate::controller::ListController;

/// Run the interactive shell
///
/// This is the entry point for `tl` with no subcommand.
pub async fn run_interactive(controller: ListController) -> Result<()> {
    let mut session = ReplSession::new(controller);
    session.run().await
}
