//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.whatchucookin.toml` files.

use crate::aggregate::PublishPolicy;
use crate::cli::OutputFormat;
use crate::sources::{default_catalog, validate_catalog, Source};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".whatchucookin.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Backend API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Source catalog. Replaces the built-in catalog when present.
    #[serde(default = "default_catalog")]
    pub sources: Vec<Source>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            api: ApiConfig::default(),
            report: ReportConfig::default(),
            sources: default_catalog(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// When settled sources become visible.
    #[serde(default)]
    pub publish: PublishPolicy,

    /// Delay between the cycle settling and the ready signal.
    #[serde(default = "default_ready_delay_ms")]
    pub ready_delay_ms: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            publish: PublishPolicy::default(),
            ready_delay_ms: default_ready_delay_ms(),
        }
    }
}

fn default_ready_delay_ms() -> u64 {
    100
}

/// Backend API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every source path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout. Unset means the HTTP client default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Render not-yet-implemented panels.
    #[serde(default = "default_true")]
    pub show_placeholders: bool,

    /// Maximum job keywords shown.
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            show_placeholders: true,
            max_keywords: default_max_keywords(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_keywords() -> usize {
    25
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from `dir/.whatchucookin.toml`.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        let base = self.api.base_url.trim();
        if !base.starts_with("http://") && !base.starts_with("https://") {
            bail!("API base URL must start with 'http://' or 'https://': {}", base);
        }
        if self.api.timeout_seconds == Some(0) {
            bail!("API timeout must be at least 1 second");
        }
        if self.sources.is_empty() {
            bail!("At least one source must be configured");
        }
        validate_catalog(&self.sources)
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref base) = args.api_base {
            self.api.base_url = base.clone();
        }

        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = Some(timeout);
        }

        if let Some(publish) = args.publish {
            self.general.publish = publish.into();
        }

        if let Some(delay) = args.ready_delay_ms {
            self.general.ready_delay_ms = delay;
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use crate::sources::{Fallback, Projection};
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.general.publish, PublishPolicy::Streaming);
        assert_eq!(config.general.ready_delay_ms, 100);
        assert_eq!(config.sources.len(), 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
publish = "atomic"
ready_delay_ms = 0

[api]
base_url = "https://intel.example.com"
timeout_seconds = 15

[report]
format = "json"
show_placeholders = false

[[sources]]
name = "intel"
path = "/companies/intel"
pick = "what_they_cookin"

[[sources]]
name = "events"
path = "/companies/events"
pick = "events"
fallback = "empty_list"
enabled = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.publish, PublishPolicy::Atomic);
        assert_eq!(config.general.ready_delay_ms, 0);
        assert_eq!(config.api.base_url, "https://intel.example.com");
        assert_eq!(config.api.timeout_seconds, Some(15));
        assert_eq!(config.report.format, OutputFormat::Json);
        assert!(!config.report.show_placeholders);
        assert_eq!(config.report.max_keywords, 25);
        assert_eq!(config.sources.len(), 2);
        assert!(!config.sources[1].enabled);
        assert_eq!(
            config.sources[1].projection,
            Projection::pick("events", Fallback::EmptyList)
        );
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("[api]\nbase_url = \"http://x\"\n").unwrap();
        assert_eq!(config.sources.len(), 8);
        assert!(config.report.show_placeholders);
    }

    #[test]
    fn test_config_verbose_raises_log_level() {
        let mut config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        let args = Args::try_parse_from(["whatchucookin", "NVDA"]).unwrap();
        config.merge_with_args(&args);

        assert!(config.general.verbose);
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::DEBUG);

        let quiet = Args::try_parse_from(["whatchucookin", "NVDA", "--quiet"]).unwrap();
        assert_eq!(quiet.log_level(config.general.verbose), tracing::Level::ERROR);
    }

    #[test]
    fn test_cli_publish_overrides_config() {
        let mut config: Config = toml::from_str("[general]\npublish = \"streaming\"\n").unwrap();
        let args =
            Args::try_parse_from(["whatchucookin", "NVDA", "--publish", "atomic"]).unwrap();
        config.merge_with_args(&args);

        assert_eq!(config.general.publish, PublishPolicy::Atomic);
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILE)).unwrap();
        writeln!(file, "[general]\nready_delay_ms = 250").unwrap();

        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.general.ready_delay_ms, 250);
    }

    #[test]
    fn test_load_rejects_duplicate_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.toml");
        std::fs::write(
            &path,
            r#"
[[sources]]
name = "news"
path = "/a"

[[sources]]
name = "news"
path = "/b"
"#,
        )
        .unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[[sources]]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.sources, Config::default().sources);
    }
}
