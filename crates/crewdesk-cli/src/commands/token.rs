//! `crewdesk token`

use crate::context::SessionContext;

pub async fn run(ctx: &SessionContext) -> anyhow::Result<()> {
    let session = ctx.bootstrapper()?;
    match session.tokens().get_valid_access_token().await? {
        Some(token) => {
            println!("{}", token);
            Ok(())
        }
        None => anyhow::bail!("not signed in"),
    }
}
