//! `motorctl register`: raw encoder register reads.

use anyhow::{Context as _, Result};
use motorlink_protocol::{as5048a, decode_word};

use crate::commands::Context;
use crate::device::open_channel;
use crate::error::CliError;
use crate::output;

/// Profile used when none is selected, since only it can read registers.
pub const REGISTER_PROFILE: &str = "encoder-test";

/// Register words are two bytes.
const REGISTER_LEN: usize = 2;

/// Accept a register name, a decimal address or a `0x` hex address.
pub fn parse_register(s: &str) -> Result<u16, CliError> {
    let s = s.trim();
    if let Some(address) = as5048a::register_by_name(s) {
        return Ok(address);
    }
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|e| CliError::InvalidConfiguration(format!("invalid register '{s}': {e}")))
}

pub fn execute(ctx: &Context, register: &str) -> Result<()> {
    let address = parse_register(register)?;
    let profile = ctx.profile_or(REGISTER_PROFILE)?;
    let request = profile.register_read.ok_or_else(|| {
        CliError::InvalidConfiguration(format!(
            "profile '{}' has no register read request",
            profile.name
        ))
    })?;

    let options = ctx.config.usb_options(ctx.timeout_ms);
    let mut channel = open_channel(&options, ctx.simulate, &profile)?;
    let payload = channel
        .read_register(request, address, REGISTER_LEN)
        .map_err(CliError::from)
        .with_context(|| format!("failed to read register 0x{address:04X}"))?;
    let word = decode_word(payload.as_bytes(), REGISTER_LEN).map_err(CliError::from)?;
    let masked = u16::try_from(word & u32::from(as5048a::DATA_MASK)).unwrap_or(as5048a::DATA_MASK);

    output::print_register(
        address,
        as5048a::register_name(address),
        word,
        masked,
        ctx.json,
    );
    Ok(())
}
