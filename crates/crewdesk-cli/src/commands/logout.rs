//! `crewdesk logout`

use crate::context::SessionContext;

pub fn run(ctx: &SessionContext) -> anyhow::Result<()> {
    ctx.bootstrapper()?.logout();
    eprintln!("Signed out");
    Ok(())
}
