//! One module per subcommand.

pub mod login;
pub mod logout;
pub mod roster;
pub mod status;
pub mod token;

use crewdesk_session::SessionState;

/// Print a session snapshot as pretty JSON on stdout.
pub(crate) fn print_state(state: &SessionState) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(state)?);
    Ok(())
}
