//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.lineloop/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use simplelog::LevelFilter;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::runtime::{DEFAULT_MAILBOX_CAPACITY, DEFAULT_TEARDOWN_TIMEOUT, RuntimeOptions};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LineloopConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RuntimeConfig {
    pub mailbox_capacity: Option<usize>,
    pub teardown_timeout_secs: Option<u64>,
    pub quit_on_eof: Option<bool>,
    pub handle_signals: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct JournalConfig {
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LogConfig {
    pub file: Option<String>,
    pub level: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_LOG_FILE: &str = "lineloop.log";
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;
const DEFAULT_JOURNAL_FILE: &str = "journal.json";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub mailbox_capacity: usize,
    pub teardown_timeout: Duration,
    pub quit_on_eof: bool,
    pub handle_signals: bool,
    pub journal_path: PathBuf,
    pub log_file: PathBuf,
    pub log_level: LevelFilter,
}

impl ResolvedConfig {
    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            mailbox_capacity: self.mailbox_capacity,
            teardown_timeout: self.teardown_timeout,
            quit_on_eof: self.quit_on_eof,
            handle_signals: self.handle_signals,
        }
    }
}

/// Values given on the command line. `None`/`false` means "not specified".
#[derive(Debug, Default)]
pub struct CliOverrides<'a> {
    pub journal: Option<&'a str>,
    pub log_level: Option<&'a str>,
    pub quit_on_eof: bool,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns `~/.lineloop`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".lineloop"))
}

/// Returns the path to `~/.lineloop/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load config from `~/.lineloop/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `LineloopConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<LineloopConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(LineloopConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(LineloopConfig::default());
    }

    load_config_from(&path)
}

/// Load config from an explicit path.
pub fn load_config_from(path: &Path) -> Result<LineloopConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: LineloopConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# lineloop configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [runtime]
# mailbox_capacity = 10          # bounded queue between producers and the event loop
# teardown_timeout_secs = 5      # budget for saving state on exit
# quit_on_eof = false            # stop when stdin is exhausted
# handle_signals = true          # SIGINT/SIGTERM request a quit

# [journal]
# path = "~/.lineloop/journal.json"   # Or set LINELOOP_JOURNAL env var

# [log]
# file = "lineloop.log"
# level = "info"                 # "off", "error", "warn", "info", "debug", "trace"
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &LineloopConfig, cli: &CliOverrides<'_>) -> ResolvedConfig {
    // Journal path: CLI → env → config → default
    let journal_path = cli
        .journal
        .map(expand_home)
        .or_else(|| std::env::var("LINELOOP_JOURNAL").ok().map(|p| expand_home(&p)))
        .or_else(|| config.journal.path.as_deref().map(expand_home))
        .unwrap_or_else(default_journal_path);

    // Log level: CLI → env → config → default
    let log_level = cli
        .log_level
        .map(str::to_string)
        .or_else(|| std::env::var("LINELOOP_LOG_LEVEL").ok())
        .or_else(|| config.log.level.clone())
        .and_then(|level| parse_level(&level))
        .unwrap_or(DEFAULT_LOG_LEVEL);

    let log_file = config
        .log
        .file
        .as_deref()
        .map(expand_home)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

    ResolvedConfig {
        mailbox_capacity: config
            .runtime
            .mailbox_capacity
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_MAILBOX_CAPACITY),
        teardown_timeout: config
            .runtime
            .teardown_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TEARDOWN_TIMEOUT),
        // A CLI flag can only switch this on.
        quit_on_eof: cli.quit_on_eof || config.runtime.quit_on_eof.unwrap_or(false),
        handle_signals: config.runtime.handle_signals.unwrap_or(true),
        journal_path,
        log_file,
        log_level,
    }
}

fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.parse::<LevelFilter>() {
        Ok(l) => Some(l),
        Err(_) => {
            warn!("Unknown log level '{}', using default", level);
            None
        }
    }
}

fn default_journal_path() -> PathBuf {
    config_dir()
        .map(|d| d.join(DEFAULT_JOURNAL_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_JOURNAL_FILE))
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = LineloopConfig::default();
        assert!(config.runtime.mailbox_capacity.is_none());
        assert!(config.journal.path.is_none());
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let resolved = resolve(&LineloopConfig::default(), &CliOverrides::default());
        assert_eq!(resolved.mailbox_capacity, DEFAULT_MAILBOX_CAPACITY);
        assert_eq!(resolved.teardown_timeout, DEFAULT_TEARDOWN_TIMEOUT);
        assert!(resolved.handle_signals);
        assert_eq!(resolved.log_file, PathBuf::from(DEFAULT_LOG_FILE));
        assert_eq!(resolved.runtime_options(), RuntimeOptions {
            quit_on_eof: resolved.quit_on_eof,
            ..RuntimeOptions::default()
        });
    }

    #[test]
    fn test_resolve_config_values_override_defaults() {
        let config = LineloopConfig {
            runtime: RuntimeConfig {
                mailbox_capacity: Some(64),
                teardown_timeout_secs: Some(2),
                quit_on_eof: Some(true),
                handle_signals: Some(false),
            },
            log: LogConfig {
                file: Some("/tmp/custom.log".to_string()),
                level: None,
            },
            ..Default::default()
        };
        let resolved = resolve(&config, &CliOverrides::default());
        assert_eq!(resolved.mailbox_capacity, 64);
        assert_eq!(resolved.teardown_timeout, Duration::from_secs(2));
        assert!(resolved.quit_on_eof);
        assert!(!resolved.handle_signals);
        assert_eq!(resolved.log_file, PathBuf::from("/tmp/custom.log"));
    }

    #[test]
    fn test_zero_mailbox_capacity_falls_back_to_default() {
        let config = LineloopConfig {
            runtime: RuntimeConfig {
                mailbox_capacity: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = resolve(&config, &CliOverrides::default());
        assert_eq!(resolved.mailbox_capacity, DEFAULT_MAILBOX_CAPACITY);
    }

    #[test]
    fn test_resolve_cli_journal_wins() {
        let config = LineloopConfig {
            journal: JournalConfig {
                path: Some("/from/config.json".to_string()),
            },
            ..Default::default()
        };
        let cli = CliOverrides {
            journal: Some("/from/cli.json"),
            log_level: Some("debug"),
            quit_on_eof: true,
        };
        let resolved = resolve(&config, &cli);
        assert_eq!(resolved.journal_path, PathBuf::from("/from/cli.json"));
        assert_eq!(resolved.log_level, LevelFilter::Debug);
        assert!(resolved.quit_on_eof);
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
[runtime]
mailbox_capacity = 32
teardown_timeout_secs = 10
quit_on_eof = true

[journal]
path = "/var/tmp/journal.json"

[log]
level = "warn"
"#;
        let config: LineloopConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.runtime.mailbox_capacity, Some(32));
        assert_eq!(config.runtime.teardown_timeout_secs, Some(10));
        assert_eq!(config.runtime.quit_on_eof, Some(true));
        assert!(config.runtime.handle_signals.is_none());
        assert_eq!(config.journal.path.as_deref(), Some("/var/tmp/journal.json"));
        assert_eq!(config.log.level.as_deref(), Some("warn"));
    }

    #[test]
    fn test_sparse_toml_parses() {
        // Only override one thing; everything else stays default
        let toml_str = r#"
[log]
file = "elsewhere.log"
"#;
        let config: LineloopConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log.file.as_deref(), Some("elsewhere.log"));
        assert!(config.runtime.mailbox_capacity.is_none());
        assert!(config.journal.path.is_none());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let path = std::env::temp_dir().join(format!("lineloop-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[runtime\nmailbox_capacity = ").unwrap();
        let result = load_config_from(&path);
        let _ = fs::remove_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_log_level_is_ignored() {
        assert_eq!(parse_level("loud"), None);
        assert_eq!(parse_level("trace"), Some(LevelFilter::Trace));
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
    }
}
