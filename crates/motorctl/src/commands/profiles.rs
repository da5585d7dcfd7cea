//! `motorctl profiles`

use anyhow::Result;

use crate::commands::Context;
use crate::output;

pub fn execute(ctx: &Context) -> Result<()> {
    let catalog = ctx.catalog()?;
    if let Some(name) = &ctx.profile {
        catalog.get(name).map_err(crate::error::CliError::from)?;
    }
    output::print_profiles(&catalog, ctx.profile.as_deref(), ctx.json);
    Ok(())
}
