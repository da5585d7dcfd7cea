//! motorctl - motorlink peripheral driver
//!
//! Lists, reads, tunes and logs a motor/encoder board that speaks vendor
//! control transfers over USB.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod config;
mod device;
mod error;
mod output;
mod surface;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{Commands, Context};
use crate::config::SessionConfig;
use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "motorctl")]
#[command(about = "Drive a motorlink motor/encoder board over USB control transfers")]
#[command(version)]
#[command(long_about = "
motorctl talks to the motor/encoder board (VID 0x6666, PID 0x0003) using
vendor control requests only. It can push tuning parameters, poll current,
angle and velocity, and log a continuous session to CSV.

Settings are read from motorctl.yaml in the working directory (or --config)
and overridden by command-line flags.
")]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Session file
    #[arg(short, long, global = true, env = "MOTORCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Device profile (see `motorctl profiles`)
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Per-transfer USB timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Talk to a simulated device instead of USB (for testing)
    #[arg(long, global = true, hide = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("motorctl={log_level},motorlink={log_level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match execute_command(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let exit_code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            if cli.json {
                output::print_error_json(&e, exit_code);
            } else {
                output::print_error_human(&e);
            }
            ExitCode::from(exit_code)
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    let ctx = Context {
        json: cli.json,
        simulate: cli.simulate,
        profile: cli.profile.clone(),
        timeout_ms: cli.timeout_ms,
        config: SessionConfig::discover(cli.config.as_deref())?,
    };

    match &cli.command {
        Commands::List => commands::list::execute(&ctx),
        Commands::Profiles => commands::profiles::execute(&ctx),
        Commands::Run(args) => commands::run::execute(&ctx, args),
        Commands::Read => commands::read::execute(&ctx),
        Commands::Set { name, value } => commands::set::execute(&ctx, name, *value),
        Commands::Register { register } => commands::register::execute(&ctx, register),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::RunArgs;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn parse_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["motorctl", "profiles"])?;
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
        assert!(cli.profile.is_none());
        assert!(matches!(cli.command, Commands::Profiles));
        Ok(())
    }

    #[test]
    fn parse_global_flags_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from(["motorctl", "read", "--json", "-p", "control-test", "-vv"])?;
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.profile.as_deref(), Some("control-test"));
        Ok(())
    }

    #[test]
    fn parse_run_flags() -> TestResult {
        let cli = Cli::try_parse_from([
            "motorctl",
            "run",
            "--output",
            "log.csv",
            "--force",
            "--batch-size",
            "20",
            "--rate",
            "250",
            "--max-dead-ticks",
            "0",
            "--ticks",
            "1000",
            "--param",
            "K_spring=3",
            "--param",
            "Mode=1",
        ])?;
        let Commands::Run(RunArgs {
            output,
            force,
            batch_size,
            rate,
            max_dead_ticks,
            ticks,
            param,
            ..
        }) = cli.command
        else {
            return Err("expected run".into());
        };
        assert_eq!(output, Some(PathBuf::from("log.csv")));
        assert!(force);
        assert_eq!(batch_size, Some(20));
        assert_eq!(rate, Some(250.0));
        assert_eq!(max_dead_ticks, Some(0));
        assert_eq!(ticks, Some(1000));
        assert_eq!(
            param,
            vec![("K_spring".to_string(), 3), ("Mode".to_string(), 1)]
        );
        Ok(())
    }

    #[test]
    fn output_conflicts_with_auto_output() {
        assert!(
            Cli::try_parse_from(["motorctl", "run", "--output", "a.csv", "--auto-output"]).is_err()
        );
    }

    #[test]
    fn parse_set_and_register() -> TestResult {
        let cli = Cli::try_parse_from(["motorctl", "set", "K_wall", "1"])?;
        assert!(matches!(
            cli.command,
            Commands::Set { ref name, value: 1 } if name == "K_wall"
        ));

        let cli = Cli::try_parse_from(["motorctl", "register", "0x3FFF"])?;
        assert!(matches!(
            cli.command,
            Commands::Register { ref register } if register == "0x3FFF"
        ));
        Ok(())
    }

    #[test]
    fn malformed_param_rejected() {
        assert!(Cli::try_parse_from(["motorctl", "run", "--param", "K_spring"]).is_err());
    }
}
