//! Configuration management.
//!
//! Configuration comes from a TOML file, then environment overrides. Every
//! key is optional; missing keys keep their defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default bot nick.
pub const DEFAULT_BOT_NICK: &str = "factkeeper";

/// Default number of factoids a literal dump may list in a public scope.
pub const DEFAULT_LITERAL_PUBLIC_LIMIT: usize = 10;

/// Main configuration for factkeeper.
#[derive(Debug, Clone)]
pub struct FactkeeperConfig {
    /// The bot's own display name.
    pub bot_nick: String,
    /// Directory for the database and logs.
    pub data_dir: PathBuf,
    /// Store selection.
    pub storage: StorageSettings,
    /// Command engine settings.
    pub engine: EngineSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Metrics settings.
    pub metrics: MetricsSettings,
}

/// Available store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// `SQLite` database file.
    #[default]
    Sqlite,
    /// Volatile in-process map.
    Memory,
}

impl StorageBackend {
    /// Parses a backend name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for unknown names.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" | "in-memory" | "mem" => Ok(Self::Memory),
            other => Err(Error::InvalidInput(format!(
                "unknown storage backend '{other}'"
            ))),
        }
    }

    /// Returns the backend name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// Which backend to open.
    pub backend: StorageBackend,
    /// Database path; defaults to `<data_dir>/factoids.db`.
    pub path: Option<PathBuf>,
    /// How long a store call may wait on a locked database.
    pub busy_timeout_ms: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: None,
            busy_timeout_ms: 5000,
        }
    }
}

impl StorageSettings {
    /// Resolves the database path against the data directory.
    #[must_use]
    pub fn resolved_path(&self, data_dir: &Path) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| data_dir.join("factoids.db"))
    }
}

/// Command engine configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Literal dumps larger than this are refused in public scopes.
    pub literal_public_limit: usize,
    /// Scope prefixes that mark a shared (public) conversation.
    pub public_scope_prefixes: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            literal_public_limit: DEFAULT_LITERAL_PUBLIC_LIMIT,
            public_scope_prefixes: vec!["#".to_string(), "&".to_string()],
        }
    }
}

impl EngineSettings {
    /// Whether a scope name denotes a shared conversation.
    #[must_use]
    pub fn is_public_scope(&self, scope: &str) -> bool {
        self.public_scope_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && scope.starts_with(prefix.as_str()))
    }
}

/// Logging configuration as written in the config file.
#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// `EnvFilter` directive, e.g. `factkeeper=debug`.
    pub level: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Metrics configuration as written in the config file.
#[derive(Debug, Clone)]
pub struct MetricsSettings {
    /// Whether to install the Prometheus recorder.
    pub enabled: bool,
    /// Port for the Prometheus HTTP listener.
    pub port: u16,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Bot nick.
    pub bot_nick: Option<String>,
    /// Data directory.
    pub data_dir: Option<String>,
    /// Storage section.
    pub storage: Option<ConfigFileStorage>,
    /// Engine section.
    pub engine: Option<ConfigFileEngine>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
    /// Metrics section.
    pub metrics: Option<ConfigFileMetrics>,
}

/// Storage section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileStorage {
    /// Backend name.
    pub backend: Option<String>,
    /// Database path.
    pub path: Option<String>,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u64>,
}

/// Engine section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileEngine {
    /// Public literal limit.
    pub literal_public_limit: Option<usize>,
    /// Public scope prefixes.
    pub public_scope_prefixes: Option<Vec<String>>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Output format.
    pub format: Option<String>,
    /// Filter directive.
    pub level: Option<String>,
    /// Log file.
    pub file: Option<String>,
}

/// Metrics section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMetrics {
    /// Enable the recorder.
    pub enabled: Option<bool>,
    /// Listener port.
    pub port: Option<u16>,
}

impl Default for FactkeeperConfig {
    fn default() -> Self {
        Self {
            bot_nick: DEFAULT_BOT_NICK.to_string(),
            data_dir: default_data_dir(),
            storage: StorageSettings::default(),
            engine: EngineSettings::default(),
            logging: LoggingSettings::default(),
            metrics: MetricsSettings::default(),
        }
    }
}

impl FactkeeperConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;
        Self::from_config_file(file)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml(&contents)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir first, then `~/.config/factkeeper/`.
    /// Returns defaults if no readable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("factkeeper").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("factkeeper")
                .join("config.toml"),
        ];

        for candidate in &candidates {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(candidate) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %candidate.display(), error = %e, "ignoring unreadable config"),
            }
        }

        Self::default()
    }

    /// Applies `FACTKEEPER_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if an override does not parse.
    pub fn apply_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary lookup (the environment in
    /// production, a map in tests).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if an override does not parse.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(nick) = get("FACTKEEPER_NICK") {
            self.bot_nick = nick.trim().to_string();
        }
        if let Some(path) = get("FACTKEEPER_DB") {
            self.storage.path = Some(PathBuf::from(path));
        }
        if let Some(format) = get("FACTKEEPER_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Some(enabled) = get("FACTKEEPER_METRICS_ENABLED") {
            self.metrics.enabled = parse_bool(&enabled).ok_or_else(|| {
                Error::InvalidInput(format!("FACTKEEPER_METRICS_ENABLED='{enabled}'"))
            })?;
        }
        if let Some(port) = get("FACTKEEPER_METRICS_PORT") {
            self.metrics.port = port
                .trim()
                .parse()
                .map_err(|_| Error::InvalidInput(format!("FACTKEEPER_METRICS_PORT='{port}'")))?;
        }

        Ok(self)
    }

    /// Sets the bot nick.
    #[must_use]
    pub fn with_bot_nick(mut self, nick: impl Into<String>) -> Self {
        self.bot_nick = nick.into();
        self
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Converts a `ConfigFile` to `FactkeeperConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(nick) = file.bot_nick {
            config.bot_nick = nick;
        }
        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(storage) = file.storage {
            if let Some(backend) = storage.backend {
                config.storage.backend = StorageBackend::parse(&backend)?;
            }
            config.storage.path = storage.path.map(PathBuf::from);
            if let Some(timeout) = storage.busy_timeout_ms {
                config.storage.busy_timeout_ms = timeout;
            }
        }
        if let Some(engine) = file.engine {
            if let Some(limit) = engine.literal_public_limit {
                config.engine.literal_public_limit = limit;
            }
            if let Some(prefixes) = engine.public_scope_prefixes {
                config.engine.public_scope_prefixes = prefixes;
            }
        }
        if let Some(logging) = file.logging {
            config.logging = LoggingSettings {
                format: logging.format,
                level: logging.level,
                file: logging.file.map(PathBuf::from),
            };
        }
        if let Some(metrics) = file.metrics {
            if let Some(enabled) = metrics.enabled {
                config.metrics.enabled = enabled;
            }
            if let Some(port) = metrics.port {
                config.metrics.port = port;
            }
        }

        if config.bot_nick.trim().is_empty() {
            return Err(Error::InvalidInput("bot_nick cannot be empty".to_string()));
        }

        Ok(config)
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "factkeeper").map_or_else(
        || PathBuf::from(".factkeeper"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
