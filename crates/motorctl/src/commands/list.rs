//! `motorctl list`

use anyhow::Result;
use motorlink_transport::list_devices;

use crate::commands::Context;
use crate::error::CliError;
use crate::output;

pub fn execute(ctx: &Context) -> Result<()> {
    let options = ctx.config.usb_options(ctx.timeout_ms);
    let devices = list_devices().map_err(CliError::from)?;
    output::print_devices(&devices, &options, ctx.json);
    Ok(())
}
