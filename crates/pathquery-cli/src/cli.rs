use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages (default for verbose)
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "pq")]
#[command(about = "pq - validate path queries and manage saved lists")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses config file value or defaults to 'warn'
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/pathquery/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Set output format
    #[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl Cli {
    /// Effective log level: flags win over the config file
    pub fn level_filter(&self, configured: &str) -> LevelFilter {
        if let Some(level) = self.log_level {
            return level.into();
        }
        if self.verbose {
            return LevelFilter::DEBUG;
        }
        configured.parse().unwrap_or(LevelFilter::WARN)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and validate a query file (XML or JSON)
    Validate {
        /// Query file; XML when it starts with `<query`, JSON otherwise
        query: PathBuf,

        /// Data model definition (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Schema reference (URL or path); defaults to the configured schema
        /// for the query's format
        #[arg(short, long)]
        schema: Option<String>,

        /// Saved lists of the user (JSON array); no lists when omitted
        #[arg(short, long)]
        bags: Option<PathBuf>,
    },

    /// Saved list management
    #[command(subcommand)]
    Bags(BagsCommands),
}

#[derive(Subcommand, Debug)]
pub enum BagsCommands {
    /// List saved lists and their states
    List {
        /// Profile file (JSON array of saved lists)
        #[arg(short, long)]
        bags: PathBuf,
    },

    /// Change the description of a saved list
    Describe {
        /// List name
        name: String,

        /// New description
        description: String,

        /// Profile file, rewritten on success
        #[arg(short, long)]
        bags: PathBuf,
    },
}
