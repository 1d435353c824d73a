//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `PUBMED_EXPORT_` (sections separated by
//! `__`, e.g. `PUBMED_EXPORT_EXPORT__BATCH_SIZE=50`).
//!
//! ```toml
//! [provider]
//! api_key = "your-ncbi-key"
//! email = "you@example.org"
//! page_size = 500
//! max_results = 10000
//! fetch_batch_size = 200
//! timeout_seconds = 30
//!
//! [query]
//! strict = true
//!
//! [export]
//! delimiter = ";"
//! batch_size = 20
//! file_stem = "pubmed_articles"
//!
//! [report]
//! font_size = 12.0
//! line_height = 16.0
//! wrap_width = 90
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "pubmed-export.toml";

/// Default E-utilities endpoint root
pub const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Search provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// E-utilities root URL (without the trailing `esearch.fcgi`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// NCBI API key (raises the rate limit from 3 to 10 requests per second)
    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,

    /// Contact email sent with every request
    #[serde(default = "default_email")]
    pub email: Option<String>,

    /// Tool name sent with every request
    #[serde(default = "default_tool")]
    pub tool: String,

    /// Identifiers requested per esearch page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Upper bound on identifiers resolved for one query
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Identifiers per efetch request
    #[serde(default = "default_fetch_batch_size")]
    pub fetch_batch_size: usize,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: default_api_key(),
            email: default_email(),
            tool: default_tool(),
            page_size: default_page_size(),
            max_results: default_max_results(),
            fetch_batch_size: default_fetch_batch_size(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    EUTILS_BASE_URL.to_string()
}

fn default_api_key() -> Option<String> {
    std::env::var("NCBI_API_KEY").ok()
}

fn default_email() -> Option<String> {
    std::env::var("NCBI_EMAIL").ok()
}

fn default_tool() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_page_size() -> usize {
    500
}

fn default_max_results() -> usize {
    10_000
}

fn default_fetch_batch_size() -> usize {
    200
}

fn default_timeout() -> u64 {
    30
}

/// Query builder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Reject malformed term/condition alternation instead of passing it through
    #[serde(default = "default_true")]
    pub strict: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}

fn default_true() -> bool {
    true
}

/// Archive export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Single ASCII character separating CSV columns
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Records per PDF report
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Stem shared by the archive and all of its entries
    #[serde(default = "default_file_stem")]
    pub file_stem: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            batch_size: default_batch_size(),
            file_stem: default_file_stem(),
        }
    }
}

impl ExportConfig {
    /// Delimiter as the byte the CSV writer expects
    pub fn delimiter_byte(&self) -> Option<u8> {
        match self.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Some(*byte),
            _ => None,
        }
    }
}

fn default_delimiter() -> String {
    ";".to_string()
}

fn default_batch_size() -> usize {
    20
}

fn default_file_stem() -> String {
    "pubmed_articles".to_string()
}

/// PDF report layout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    #[serde(default = "default_line_height")]
    pub line_height: f32,

    /// Maximum characters per rendered line before wrapping
    #[serde(default = "default_wrap_width")]
    pub wrap_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            line_height: default_line_height(),
            wrap_width: default_wrap_width(),
        }
    }
}

fn default_font_size() -> f32 {
    12.0
}

fn default_line_height() -> f32 {
    16.0
}

fn default_wrap_width() -> usize {
    90
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Check values the serde defaults cannot guard
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.export.batch_size == 0 {
            return Err(invalid("export.batch_size must be greater than zero"));
        }
        if self.export.delimiter_byte().is_none() {
            return Err(invalid("export.delimiter must be a single ASCII character"));
        }
        if self.export.file_stem.trim().is_empty() {
            return Err(invalid("export.file_stem must not be empty"));
        }
        if self.provider.max_results == 0
            || self.provider.page_size == 0
            || self.provider.fetch_batch_size == 0
        {
            return Err(invalid(
                "provider.max_results, provider.page_size and provider.fetch_batch_size must be greater than zero",
            ));
        }
        if self.report.wrap_width == 0 {
            return Err(invalid("report.wrap_width must be greater than zero"));
        }
        Ok(())
    }

    /// Render the configuration as TOML (used by `config init`)
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn invalid(message: &str) -> config::ConfigError {
    config::ConfigError::Message(message.to_string())
}

/// Load configuration, layering an optional file and the environment over defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("PUBMED_EXPORT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Locate a configuration file in the working directory or the user config dir
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    default_config_path().filter(|path| path.is_file())
}

/// `<config_dir>/pubmed-export/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("config.toml"))
}
