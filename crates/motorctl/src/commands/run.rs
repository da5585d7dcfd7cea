//! `motorctl run`: the sampling session.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use motorlink_engine::{
    ControlSurface, LoopConfig, Observed, SampleLoop, StaticSurface, StopToken,
};
use motorlink_protocol::DeviceProfile;
use motorlink_recorder::{BufferedRecorder, CsvSink, DEFAULT_BATCH_SIZE};
use tracing::{info, warn};

use crate::commands::{Context, RunArgs};
use crate::config::SessionConfig;
use crate::device::open_channel;
use crate::error::CliError;
use crate::output;
use crate::surface::ParameterFileSurface;

/// `session_YYYYmmdd_HHMMSS.csv` for the current local time.
pub fn session_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("session_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Merge flags over the session file.
pub fn loop_config(args: &RunArgs, config: &SessionConfig) -> LoopConfig {
    let defaults = LoopConfig::default();
    LoopConfig {
        batch_size: args
            .batch_size
            .or(config.batch_size)
            .unwrap_or(DEFAULT_BATCH_SIZE),
        max_rate_hz: match args.rate.or(config.rate_hz) {
            Some(hz) if hz > 0.0 => Some(hz),
            Some(_) => None,
            None => defaults.max_rate_hz,
        },
        max_dead_ticks: args
            .max_dead_ticks
            .or(config.max_dead_ticks)
            .unwrap_or(defaults.max_dead_ticks),
        max_ticks: args.ticks,
    }
}

/// Initial values, then the session file, then `--param` flags.
pub fn fixed_parameters(
    profile: &DeviceProfile,
    args: &RunArgs,
    config: &SessionConfig,
) -> Result<Observed, CliError> {
    let mut values = StaticSurface::from_initial(&profile.parameters)
        .values()
        .clone();
    let overrides = config
        .parameters
        .iter()
        .map(|(n, v)| (n.as_str(), *v))
        .chain(args.param.iter().map(|(n, v)| (n.as_str(), *v)));
    for (name, value) in overrides {
        if !profile.parameters.iter().any(|p| p.name == name) {
            return Err(CliError::InvalidConfiguration(format!(
                "profile '{}' has no parameter '{name}'",
                profile.name
            )));
        }
        values.insert(name.to_string(), value);
    }
    Ok(values)
}

fn output_path(args: &RunArgs, config: &SessionConfig) -> Option<PathBuf> {
    if args.auto_output {
        return Some(PathBuf::from(session_file_name(chrono::Local::now())));
    }
    args.output.clone().or_else(|| config.output.clone())
}

/// Refuse to start over an existing file unless forced. Nothing is created.
fn check_output(path: Option<&Path>, force: bool) -> Result<(), CliError> {
    match path {
        Some(path) if path.exists() && !force => Err(CliError::OutputExists(path.to_path_buf())),
        _ => Ok(()),
    }
}

fn open_recorder(
    path: Option<&Path>,
    force: bool,
    fields: Vec<String>,
) -> Result<BufferedRecorder, CliError> {
    let Some(path) = path else {
        warn!("No output file given; readings will not be saved");
        return Ok(BufferedRecorder::disabled());
    };
    check_output(Some(path), force)?;
    let sink = if force {
        CsvSink::create(path, fields)
    } else {
        CsvSink::create_new(path, fields)
    }
    .map_err(|e| CliError::InvalidConfiguration(format!("{}: {e}", path.display())))?;
    info!("Recording to {}", path.display());
    Ok(BufferedRecorder::new(sink))
}

pub fn execute(ctx: &Context, args: &RunArgs) -> Result<()> {
    let profile = ctx.profile()?;
    let config = loop_config(args, &ctx.config);
    let fixed = fixed_parameters(&profile, args, &ctx.config)?;
    let params_file = args.params.clone().or_else(|| ctx.config.params_file.clone());
    let surface: Box<dyn ControlSurface> = match params_file {
        Some(path) => Box::new(ParameterFileSurface::new(path, fixed)),
        None => Box::new(StaticSurface::new(fixed)),
    };

    let output = output_path(args, &ctx.config);
    check_output(output.as_deref(), args.force)?;

    // The output file is only created or truncated once the device is open.
    let options = ctx.config.usb_options(ctx.timeout_ms);
    let channel = open_channel(&options, ctx.simulate, &profile)?;
    let recorder = open_recorder(output.as_deref(), args.force, profile.field_names())?;

    let stop = StopToken::new();
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.stop()).context("failed to install Ctrl-C handler")?;
    }

    let mut session = SampleLoop::new(channel, profile, surface, recorder, config)
        .map_err(CliError::from)?;

    let summary = session.run(&stop).map_err(CliError::from)?;
    output::print_summary(&summary, output.as_deref(), ctx.json);
    Ok(())
}
