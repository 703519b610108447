use clap::{Args, Parser, Subcommand, ValueEnum};
use infrastructure::config::{LogFormat, LogLevel};
use infrastructure::constants::DEFAULT_REPLAY_SECONDS;

#[derive(Parser, Debug)]
#[command(
    name = "floodgate-agent",
    about = "Streaming DDoS admission engine",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to the YAML configuration file (built-in defaults when omitted)
    #[arg(short, long, env = "FLOODGATE_CONFIG", global = true)]
    pub config: Option<String>,

    /// Log level override (takes precedence over config file)
    #[arg(short, long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log format: json (default, production) or text (development)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table (default)
    Table,
    /// JSON document
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Display version and build information
    Version,

    /// Load and validate the configuration, then print the effective values
    CheckConfig,

    /// Run the synthetic capture through the admission pipeline once
    Replay(ReplayArgs),

    /// Replay the synthetic capture in a loop until SIGINT/SIGTERM
    Run(ReplayArgs),
}

#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayArgs {
    /// Capture length in seconds
    #[arg(long, default_value_t = DEFAULT_REPLAY_SECONDS)]
    pub seconds: u64,

    /// Overlay the DNS amplification flood from second 1 on
    #[arg(long)]
    pub attack: bool,

    /// Print the Prometheus exposition after the report
    #[arg(long)]
    pub metrics: bool,
}

impl Default for ReplayArgs {
    fn default() -> Self {
        Self {
            seconds: DEFAULT_REPLAY_SECONDS,
            attack: false,
            metrics: false,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
