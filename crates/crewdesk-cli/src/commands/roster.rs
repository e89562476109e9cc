//! `crewdesk refresh-roster`

use crate::context::SessionContext;
use anyhow::Context;

pub async fn run(ctx: &SessionContext) -> anyhow::Result<()> {
    let session = ctx.bootstrapper()?;
    session.check_auth_status().await?;
    if !session.phase().is_signed_in() {
        anyhow::bail!("not signed in");
    }

    let roster = session
        .refresh_roster()
        .await
        .context("roster refresh failed")?;
    println!("{}", serde_json::to_string_pretty(&roster)?);
    Ok(())
}
