//! `motorctl set NAME VALUE`: a single parameter write.

use anyhow::{Context as _, Result};
use motorlink_protocol::{DeviceProfile, ParameterSpec, RequestCode, encode_parameter};

use crate::commands::Context;
use crate::device::open_channel;
use crate::error::CliError;
use crate::output;

/// Check `name` and `value` against the profile before touching the device.
pub fn resolve(
    profile: &DeviceProfile,
    name: &str,
    value: i64,
) -> Result<(RequestCode, ParameterSpec, u8), CliError> {
    let request = profile.set_parameter.ok_or_else(|| {
        CliError::InvalidConfiguration(format!("profile '{}' has no parameters", profile.name))
    })?;
    let spec = profile
        .parameters
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| {
            let known: Vec<&str> = profile.parameters.iter().map(|p| p.name.as_str()).collect();
            CliError::InvalidConfiguration(format!(
                "unknown parameter '{name}' (known: {})",
                known.join(", ")
            ))
        })?;
    let byte = u8::try_from(value)
        .ok()
        .filter(|v| *v <= spec.max)
        .ok_or_else(|| {
            CliError::InvalidConfiguration(format!(
                "{name}={value} is outside 0..={}",
                spec.max
            ))
        })?;
    Ok((request, spec.clone(), byte))
}

pub fn execute(ctx: &Context, name: &str, value: i64) -> Result<()> {
    let profile = ctx.profile()?;
    let (request, spec, byte) = resolve(&profile, name, value)?;

    let options = ctx.config.usb_options(ctx.timeout_ms);
    let mut channel = open_channel(&options, ctx.simulate, &profile)?;
    channel
        .write(request, encode_parameter(byte, spec.index), 0)
        .map_err(CliError::from)
        .with_context(|| format!("failed to write {name}"))?;

    output::print_parameter_set(&spec.name, byte, spec.index, ctx.json);
    Ok(())
}
