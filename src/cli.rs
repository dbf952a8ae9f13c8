//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::aggregate::PublishPolicy;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// WhatchuCookin - company intel in one shot
///
/// Queries every intel backend for one company at once and renders
/// whatever comes back. Sources that fail are reported inline and never
/// hold up the others.
///
/// Examples:
///   whatchucookin NVDA
///   whatchucookin "Acme Corp" --format json -o acme.json
///   whatchucookin NVDA --sources intel,news,roast
///   whatchucookin NVDA --api-base https://intel.example.com --timeout 20
///   whatchucookin --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Company name or ticker to look up
    #[arg(value_name = "COMPANY", required_unless_present = "init_config")]
    pub company: Option<String>,

    /// Base URL of the intel API
    ///
    /// Overrides `api.base_url` from the config file.
    #[arg(long, value_name = "URL", env = "WHATCHUCOOKIN_API_BASE")]
    pub api_base: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .whatchucookin.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the report to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Sources to query (comma-separated)
    ///
    /// May name sources that are disabled by default, e.g. roast or gossip.
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub sources: Option<Vec<String>>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// When settled sources become visible (streaming, atomic)
    #[arg(long, value_name = "POLICY")]
    pub publish: Option<PublishArg>,

    /// Delay between the last source settling and the report being emitted
    #[arg(long, value_name = "MS")]
    pub ready_delay_ms: Option<u64>,

    /// Only list job postings whose title or location contains this text
    #[arg(long, value_name = "TEXT")]
    pub jobs_filter: Option<String>,

    /// Job listing order by title
    #[arg(long, default_value = "az", value_name = "ORDER")]
    pub jobs_sort: JobsSort,

    /// Exit with code 2 if any source ends in error
    #[arg(long)]
    pub fail_on_source_error: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .whatchucookin.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Publish policy as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PublishArg {
    /// Show each source as soon as it settles
    Streaming,
    /// Show every source together once all have settled
    Atomic,
}

impl From<PublishArg> for PublishPolicy {
    fn from(arg: PublishArg) -> Self {
        match arg {
            PublishArg::Streaming => PublishPolicy::Streaming,
            PublishArg::Atomic => PublishPolicy::Atomic,
        }
    }
}

/// Sort order for job listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum JobsSort {
    /// Title A-Z
    #[default]
    Az,
    /// Title Z-A
    Za,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The company as typed (validated non-blank unless `--init-config`).
    pub fn company(&self) -> &str {
        self.company.as_deref().unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.company().trim().is_empty() {
            return Err("Company must not be empty".to_string());
        }

        if let Some(ref base) = self.api_base {
            if !base.starts_with("http://") && !base.starts_with("https://") {
                return Err("API base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref sources) = self.sources {
            if sources.iter().all(|s| s.trim().is_empty()) {
                return Err("--sources needs at least one source name".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is `general.verbose` from the config file; `--quiet`
    /// still wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Whether to draw the progress bar.
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.no_progress
    }
}
