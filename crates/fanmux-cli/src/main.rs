//! fanmux CLI
//!
//! Runs the fan-in multiplexer scenarios and prints every step's result.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use fanmux_cli::logging;
use fanmux_cli::output::Reporter;
use fanmux_cli::scenarios::{self, ScenarioContext};
use fanmux_core::config::load_config;

const BASIC_ITERATIONS: usize = 5;
const TIMEOUT_DELAY_MS: u64 = 3000;
const TIMEOUT_DEADLINE_MS: u64 = 1000;
const CANCEL_AFTER_MS: u64 = 3000;
const FAN_IN_COUNT: usize = 3;

#[derive(Parser, Debug)]
#[command(name = "fanmux")]
#[command(version, about = "Fan-in multiplexer with cancellation and timeouts", long_about = None)]
struct Cli {
    /// JSON config file (session defaults)
    #[arg(long, env = "FANMUX_CONFIG")]
    config: Option<PathBuf>,

    /// Log level filter (e.g. "info", "debug", "trace").
    #[arg(long, default_value = "info", env = "FANMUX_LOG_LEVEL")]
    log_level: String,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "FANMUX_LOG_JSON")]
    log_json: bool,

    /// Multiplier for every scenario delay (0.1 runs ten times faster)
    #[arg(long, default_value_t = 1.0, value_parser = parse_time_scale)]
    time_scale: f64,

    /// Default per-step timeout in milliseconds, overriding the config file
    #[arg(long)]
    step_timeout_ms: Option<u64>,

    /// Print each result as one JSON line
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Race a fast and a slow producer for a fixed number of steps
    Basic {
        #[arg(long, default_value_t = BASIC_ITERATIONS)]
        iterations: usize,
    },
    /// Race a delayed producer against a deadline
    Timeout {
        #[arg(long, default_value_t = TIMEOUT_DELAY_MS)]
        delay_ms: u64,
        #[arg(long, default_value_t = TIMEOUT_DEADLINE_MS)]
        timeout_ms: u64,
    },
    /// Poll once without waiting
    NonBlocking,
    /// Cancel a cooperative worker through the shared token
    Cancel {
        #[arg(long, default_value_t = CANCEL_AFTER_MS)]
        after_ms: u64,
    },
    /// Merge two finite sources until both close
    FanIn {
        #[arg(long, default_value_t = FAN_IN_COUNT)]
        count: usize,
    },
    /// Run every scenario with its defaults
    All,
}

/// Largest accepted `--time-scale`; keeps a day-long demo delay representable.
const MAX_TIME_SCALE: f64 = 1_000_000.0;

fn parse_time_scale(raw: &str) -> Result<f64, String> {
    let scale: f64 = raw.parse().map_err(|e| format!("invalid number: {e}"))?;
    if !(scale.is_finite() && scale > 0.0) {
        return Err("time scale must be a positive number".to_string());
    }
    if scale > MAX_TIME_SCALE {
        return Err(format!("time scale must not exceed {MAX_TIME_SCALE}"));
    }
    Ok(scale)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level, cli.log_json);

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(ms) = cli.step_timeout_ms {
        config.multiplexer.timeout_ms = Some(ms);
    }
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        time_scale = cli.time_scale,
        timeout_ms = ?config.multiplexer.timeout_ms,
        "Starting fanmux"
    );

    let ctx = ScenarioContext {
        time_scale: cli.time_scale,
        config: config.multiplexer,
    };
    let mut reporter = Reporter::new(std::io::stdout().lock(), cli.json);

    match cli.command {
        Command::Basic { iterations } => {
            scenarios::basic(&ctx, &mut reporter, iterations).await?;
        }
        Command::Timeout {
            delay_ms,
            timeout_ms,
        } => {
            scenarios::timeout(&ctx, &mut reporter, delay_ms, timeout_ms).await?;
        }
        Command::NonBlocking => {
            scenarios::non_blocking(&ctx, &mut reporter)?;
        }
        Command::Cancel { after_ms } => {
            scenarios::cancellation(&ctx, &mut reporter, after_ms).await?;
        }
        Command::FanIn { count } => {
            scenarios::fan_in(&ctx, &mut reporter, count).await?;
        }
        Command::All => {
            scenarios::basic(&ctx, &mut reporter, BASIC_ITERATIONS).await?;
            scenarios::timeout(&ctx, &mut reporter, TIMEOUT_DELAY_MS, TIMEOUT_DEADLINE_MS).await?;
            scenarios::non_blocking(&ctx, &mut reporter)?;
            scenarios::cancellation(&ctx, &mut reporter, CANCEL_AFTER_MS).await?;
            scenarios::fan_in(&ctx, &mut reporter, FAN_IN_COUNT).await?;
        }
    }

    reporter.section("Done")?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn time_scale_must_be_positive() {
        assert!((parse_time_scale("0.5").unwrap() - 0.5).abs() < f64::EPSILON);
        assert!(parse_time_scale("0").is_err());
        assert!(parse_time_scale("-1").is_err());
        assert!(parse_time_scale("fast").is_err());
        assert!(parse_time_scale("inf").is_err());
    }

    #[test]
    fn huge_time_scale_is_rejected() {
        assert!(parse_time_scale("1e30").is_err());
        assert!(Cli::try_parse_from(["fanmux", "--time-scale", "1e30", "basic"]).is_err());
        assert!(parse_time_scale("1000000").is_ok());
    }

    #[test]
    fn all_runs_with_the_subcommand_defaults() {
        let cli = Cli::try_parse_from(["fanmux", "fan-in"]).unwrap();
        assert!(matches!(cli.command, Command::FanIn { count: FAN_IN_COUNT }));
        let cli = Cli::try_parse_from(["fanmux", "timeout"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Timeout {
                delay_ms: TIMEOUT_DELAY_MS,
                timeout_ms: TIMEOUT_DEADLINE_MS
            }
        ));
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from([
            "fanmux",
            "--time-scale",
            "0.1",
            "timeout",
            "--delay-ms",
            "50",
            "--timeout-ms",
            "10",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Timeout {
                delay_ms: 50,
                timeout_ms: 10
            }
        ));
        assert!((cli.time_scale - 0.1).abs() < f64::EPSILON);
    }
}
