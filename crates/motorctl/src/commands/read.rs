//! `motorctl read`: one poll, printed.

use anyhow::{Context as _, Result};
use motorlink_engine::TelemetryPoller;

use crate::commands::Context;
use crate::device::open_channel;
use crate::error::CliError;
use crate::output;

pub fn execute(ctx: &Context) -> Result<()> {
    let profile = ctx.profile()?;
    let options = ctx.config.usb_options(ctx.timeout_ms);
    let mut channel = open_channel(&options, ctx.simulate, &profile)?;
    let mut poller = TelemetryPoller::new(profile).map_err(CliError::from)?;

    let poll = poller
        .poll(&mut channel)
        .map_err(|e| CliError::Session(e.into()))
        .context("failed to poll device")?;
    if poll.all_failed() {
        tracing::warn!("Every read failed; is the device responding?");
    }
    output::print_reading(&poll.reading, ctx.json);
    Ok(())
}
