// LogScope - platform/config.rs
//
// Platform-specific configuration directory resolution and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for LogScope data and configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/logscope/ or %APPDATA%\LogScope\)
    pub config_dir: PathBuf,

    /// Data directory for exports, caches, etc.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let data_dir = proj_dirs.data_dir().to_path_buf();

            tracing::debug!(
                config = %config_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                config_dir: fallback.clone(),
                data_dir: fallback,
            }
        }
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility -- a newer
/// config file can be used with an older binary without crashing.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[engine]` section.
    pub engine: EngineSection,
    /// `[feed]` section.
    pub feed: FeedSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[engine]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Maximum entries retained in the timeline window.
    pub max_entries: Option<usize>,
    /// Records requested from the transport per reload.
    pub fetch_limit: Option<usize>,
    /// Whether error counting starts enabled.
    pub count_errors: Option<bool>,
    /// Whether warning counting starts enabled.
    pub count_warnings: Option<bool>,
}

/// `[feed]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct FeedSection {
    /// File poll interval in ms.
    pub poll_interval_ms: Option<u64>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// All values are validated against named constants at load time.
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // -- Engine --
    /// Maximum entries retained in the timeline window.
    pub max_entries: usize,
    /// Records requested from the transport per reload.
    pub fetch_limit: usize,
    /// Whether error counting starts enabled.
    pub count_errors: bool,
    /// Whether warning counting starts enabled.
    pub count_warnings: bool,

    // -- Feed --
    /// File poll interval in ms.
    pub poll_interval_ms: u64,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_entries: constants::DEFAULT_MAX_ENTRIES,
            fetch_limit: constants::DEFAULT_FETCH_LIMIT,
            count_errors: true,
            count_warnings: true,
            poll_interval_ms: constants::FEED_POLL_INTERVAL_MS,
            log_level: None,
        }
    }
}

/// Load and validate `config.toml` from the given config directory.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first-run).
/// If the file is unparseable, returns defaults with an error warning --
/// the application still starts but the user is informed.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);

    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!(
                "Could not read config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");

    let (config, mut validation_warnings) = validate(raw);
    warnings.append(&mut validation_warnings);

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }

    (config, warnings)
}

/// Validate a raw config against named constants, accumulating all warnings.
fn validate(raw: RawConfig) -> (AppConfig, Vec<String>) {
    let mut config = AppConfig::default();
    let mut warnings: Vec<String> = Vec::new();

    // -- Engine: max_entries --
    if let Some(max) = raw.engine.max_entries {
        if (constants::MIN_MAX_ENTRIES..=constants::ABSOLUTE_MAX_ENTRIES).contains(&max) {
            config.max_entries = max;
        } else {
            warnings.push(format!(
                "[engine] max_entries = {max} is out of range ({}-{}). Using default ({}).",
                constants::MIN_MAX_ENTRIES,
                constants::ABSOLUTE_MAX_ENTRIES,
                constants::DEFAULT_MAX_ENTRIES,
            ));
        }
    }

    // -- Engine: fetch_limit --
    if let Some(limit) = raw.engine.fetch_limit {
        if (constants::MIN_FETCH_LIMIT..=constants::MAX_FETCH_LIMIT).contains(&limit) {
            config.fetch_limit = limit;
        } else {
            warnings.push(format!(
                "[engine] fetch_limit = {limit} is out of range ({}-{}). Using default ({}).",
                constants::MIN_FETCH_LIMIT,
                constants::MAX_FETCH_LIMIT,
                constants::DEFAULT_FETCH_LIMIT,
            ));
        }
    }

    // -- Engine: counting flags --
    if let Some(flag) = raw.engine.count_errors {
        config.count_errors = flag;
    }
    if let Some(flag) = raw.engine.count_warnings {
        config.count_warnings = flag;
    }

    // -- Feed: poll_interval_ms --
    if let Some(interval) = raw.feed.poll_interval_ms {
        if (constants::MIN_FEED_POLL_INTERVAL_MS..=constants::MAX_FEED_POLL_INTERVAL_MS)
            .contains(&interval)
        {
            config.poll_interval_ms = interval;
        } else {
            warnings.push(format!(
                "[feed] poll_interval_ms = {interval} is out of range ({}-{}). Using default ({}).",
                constants::MIN_FEED_POLL_INTERVAL_MS,
                constants::MAX_FEED_POLL_INTERVAL_MS,
                constants::FEED_POLL_INTERVAL_MS,
            ));
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.clone());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    (config, warnings)
}
