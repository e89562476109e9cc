//! `crewdesk status`

use crate::commands::print_state;
use crate::context::SessionContext;

pub async fn run(ctx: &SessionContext) -> anyhow::Result<()> {
    let session = ctx.bootstrapper()?;
    let result = session.check_auth_status().await;

    // The snapshot carries the error message when the check failed.
    print_state(&session.snapshot())?;
    result?;
    Ok(())
}
