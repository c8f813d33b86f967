//! Tessera CLI: the command-line interface for NoC traffic routing.
//!
//! Provides `tessera check` to validate a project and build its NoC topology,
//! and `tessera route` to route every traffic flow with the constraint solver.

#![warn(missing_docs)]

mod check;
mod diagnostics;
mod pipeline;
mod route;
#[cfg(test)]
mod test_support;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tessera_config::TurnModelName;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Tessera: deadlock-free routing of traffic flows over a Network-on-Chip.
#[derive(Parser, Debug)]
#[command(name = "tessera", version, about = "Tessera NoC traffic router")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `tessera.toml` file or the directory containing one.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the project and build the NoC topology without routing.
    Check(CheckArgs),
    /// Route every traffic flow of the project.
    Route(RouteArgs),
}

/// Arguments for the `tessera check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Output format for the topology summary and diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `tessera route` subcommand.
///
/// Every solver flag overrides the matching `[routing]` value.
#[derive(Parser, Debug)]
pub struct RouteArgs {
    /// Number of integer units that represent one full link bandwidth.
    #[arg(long)]
    pub resolution: Option<i64>,

    /// Seed for the solver's tie-breaking.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Wall-clock limit per solve, in seconds.
    #[arg(long, value_name = "SECS")]
    pub time_limit: Option<f64>,

    /// Number of independent solver workers.
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Turn model that decides which turns are forbidden.
    #[arg(long, value_enum)]
    pub turn_model: Option<TurnModelArg>,

    /// Run a second solve that minimizes aggregate bandwidth at equal overrun.
    #[arg(long)]
    pub minimize_aggregate_bandwidth: bool,

    /// Log solver progress events.
    #[arg(long)]
    pub log_search_progress: bool,

    /// Output format for routes and diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Turn model selectable on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TurnModelArg {
    /// Dimension-ordered routing: X first, then Y.
    Xy,
    /// No turn into the west direction.
    WestFirst,
    /// No turn out of the north direction.
    NorthLast,
    /// No turn from a positive to a negative direction.
    NegativeFirst,
}

impl From<TurnModelArg> for TurnModelName {
    fn from(arg: TurnModelArg) -> Self {
        match arg {
            TurnModelArg::Xy => TurnModelName::Xy,
            TurnModelArg::WestFirst => TurnModelName::WestFirst,
            TurnModelArg::NorthLast => TurnModelName::NorthLast,
            TurnModelArg::NegativeFirst => TurnModelName::NegativeFirst,
        }
    }
}

/// Color output mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect whether the terminal supports color.
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Resolved global flags shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    /// Suppress all output except errors.
    pub quiet: bool,
    /// Enable verbose output.
    pub verbose: bool,
    /// Use colored diagnostics.
    pub color: bool,
    /// Path given with `--config`.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => atty_is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Check(ref args) => check::run(args, &global),
        Command::Route(ref args) => route::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Returns the log filter for the given flags.
///
/// `--verbose` and `--quiet` win over `RUST_LOG`; otherwise `RUST_LOG` is
/// used when set and valid, and warnings are shown by default.
fn log_filter(global: &GlobalArgs, env: Option<&str>) -> EnvFilter {
    if global.verbose {
        return EnvFilter::new("debug");
    }
    if global.quiet {
        return EnvFilter::new("error");
    }
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

fn init_tracing(global: &GlobalArgs) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(global, env.as_deref());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(global.color)
                .with_target(false)
                .with_filter(filter),
        )
        .init();
}

/// Rough terminal detection: checks the TERM env var.
fn atty_is_terminal() -> bool {
    std::env::var("TERM").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(quiet: bool, verbose: bool) -> GlobalArgs {
        GlobalArgs {
            quiet,
            verbose,
            color: false,
            config: None,
        }
    }

    #[test]
    fn parse_check_default() {
        let cli = Cli::parse_from(["tessera", "check"]);
        match cli.command {
            Command::Check(args) => assert_eq!(args.format, ReportFormat::Text),
            _ => panic!("expected Check command"),
        }
        assert!(!cli.quiet);
        assert_eq!(cli.color, ColorChoice::Auto);
    }

    #[test]
    fn parse_route_defaults_leave_config_values() {
        let cli = Cli::parse_from(["tessera", "route"]);
        match cli.command {
            Command::Route(args) => {
                assert!(args.resolution.is_none());
                assert!(args.seed.is_none());
                assert!(args.time_limit.is_none());
                assert!(args.workers.is_none());
                assert!(args.turn_model.is_none());
                assert!(!args.minimize_aggregate_bandwidth);
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Route command"),
        }
    }

    #[test]
    fn parse_route_overrides() {
        let cli = Cli::parse_from([
            "tessera",
            "route",
            "--resolution",
            "100",
            "--seed",
            "7",
            "--time-limit",
            "2.5",
            "-j",
            "4",
            "--turn-model",
            "negative-first",
            "--minimize-aggregate-bandwidth",
            "--format",
            "json",
        ]);
        match cli.command {
            Command::Route(args) => {
                assert_eq!(args.resolution, Some(100));
                assert_eq!(args.seed, Some(7));
                assert_eq!(args.time_limit, Some(2.5));
                assert_eq!(args.workers, Some(4));
                assert_eq!(args.turn_model, Some(TurnModelArg::NegativeFirst));
                assert!(args.minimize_aggregate_bandwidth);
                assert_eq!(args.format, ReportFormat::Json);
            }
            _ => panic!("expected Route command"),
        }
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "tessera",
            "route",
            "--quiet",
            "--color",
            "never",
            "--config",
            "/tmp/proj/tessera.toml",
        ]);
        assert!(cli.quiet);
        assert_eq!(cli.color, ColorChoice::Never);
        assert_eq!(cli.config.as_deref(), Some("/tmp/proj/tessera.toml"));
    }

    #[test]
    fn unknown_turn_model_rejected() {
        let result = Cli::try_parse_from(["tessera", "route", "--turn-model", "odd-even"]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_subcommand_rejected() {
        assert!(Cli::try_parse_from(["tessera"]).is_err());
    }

    #[test]
    fn turn_model_arg_maps_to_config_name() {
        assert_eq!(TurnModelName::from(TurnModelArg::Xy), TurnModelName::Xy);
        assert_eq!(
            TurnModelName::from(TurnModelArg::NorthLast),
            TurnModelName::NorthLast
        );
    }

    #[test]
    fn verbose_and_quiet_override_env_filter() {
        let verbose = log_filter(&global(false, true), Some("error"));
        assert_eq!(verbose.to_string(), "debug");
        let quiet = log_filter(&global(true, false), Some("trace"));
        assert_eq!(quiet.to_string(), "error");
    }

    #[test]
    fn env_filter_used_when_valid() {
        let filter = log_filter(&global(false, false), Some("tessera_route=info"));
        assert_eq!(filter.to_string(), "tessera_route=info");
        let fallback = log_filter(&global(false, false), None);
        assert_eq!(fallback.to_string(), "warn");
    }
}
