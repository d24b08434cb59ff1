use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};

use crate::shield::{MissingPlaceholderPolicy, RestoreOptions};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Where sources, templates, catalogs and the cache live
    #[serde(default)]
    pub paths: PathsConfig,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Markup protection settings
    #[serde(default)]
    pub shield: ShieldConfig,

    /// PO output settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: DeepL REST API
    #[default]
    DeepL,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::DeepL => "DeepL",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::DeepL => "deepl".to_string(),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "deepl" => Ok(Self::DeepL),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: API key; DEEPL_API_KEY overrides it
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL; empty picks free or pro host from the key
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: more, less, prefer_more, prefer_less
    #[serde(default)]
    pub formality: Option<String>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        match provider_type {
            TranslationProvider::DeepL => Self {
                provider_type: "deepl".to_string(),
                api_key: String::new(),
                endpoint: String::new(),
                timeout_secs: default_timeout_secs(),
                formality: None,
            },
        }
    }
}

/// Filesystem layout of the documentation project
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathsConfig {
    /// Directory holding `.rst` sources
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Root of `<lang>/LC_MESSAGES/*.po`
    #[serde(default = "default_po_dir")]
    pub po_dir: PathBuf,

    /// Directory holding `.pot` templates
    #[serde(default = "default_pot_dir")]
    pub pot_dir: PathBuf,

    /// SQLite translation cache; platform data dir when unset
    #[serde(default)]
    pub cache_path: Option<PathBuf>,

    /// CSV or JSON glossary
    #[serde(default)]
    pub glossary_path: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            po_dir: default_po_dir(),
            pot_dir: default_pot_dir(),
            cache_path: None,
            glossary_path: None,
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Rate limit delay in milliseconds between consecutive requests
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,

    /// Attempts per segment, first call included
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound for a single backoff (in milliseconds)
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Markup shield settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ShieldConfig {
    /// Where markup goes when its token is lost
    #[serde(default)]
    pub missing_placeholder_policy: MissingPlaceholderPolicy,

    /// Decode `&amp;`-style entities the service introduced
    #[serde(default = "default_true")]
    pub decode_html_entities: bool,

    /// Restore spacing around inline markup
    #[serde(default = "default_true")]
    pub fix_inline_spacing: bool,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            missing_placeholder_policy: MissingPlaceholderPolicy::default(),
            decode_html_entities: true,
            fix_inline_spacing: true,
        }
    }
}

impl ShieldConfig {
    pub fn restore_options(&self) -> RestoreOptions {
        RestoreOptions {
            missing_policy: self.missing_placeholder_policy,
            decode_entities: self.decode_html_entities,
            fix_spacing: self.fix_inline_spacing,
        }
    }
}

/// Catalog output settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Line width for wrapped strings; 0 disables wrapping
    #[serde(default = "default_wrap_width")]
    pub wrap_width: usize,

    /// `Project-Id-Version` header for new catalogs
    #[serde(default = "default_project_id_version")]
    pub project_id_version: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            wrap_width: default_wrap_width(),
            project_id_version: default_project_id_version(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_rate_limit_delay_ms() -> u64 {
    200
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // doubled on each retry
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("source")
}

fn default_po_dir() -> PathBuf {
    PathBuf::from("locales")
}

fn default_pot_dir() -> PathBuf {
    PathBuf::from("build/gettext")
}

fn default_wrap_width() -> usize {
    crate::catalog::DEFAULT_WRAP_WIDTH
}

fn default_project_id_version() -> String {
    "Documentation".to_string()
}

fn base_language(code: &str) -> &str {
    code.split(['-', '_']).next().unwrap_or(code)
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages; regional variants (pt-br) are checked by their base code
        let source = base_language(&self.source_language);
        let target = base_language(&self.target_language);
        let _source_name = crate::language_utils::get_language_name(source)?;
        let _target_name = crate::language_utils::get_language_name(target)?;
        if crate::language_utils::language_codes_match(source, target) {
            return Err(anyhow!(
                "Source and target language are the same: {} / {}",
                self.source_language,
                self.target_language
            ));
        }

        let common = &self.translation.common;
        if common.retry_count == 0 {
            return Err(anyhow!("retry_count must be at least 1"));
        }
        if common.max_backoff_ms < common.retry_backoff_ms {
            return Err(anyhow!(
                "max_backoff_ms ({}) is smaller than retry_backoff_ms ({})",
                common.max_backoff_ms,
                common.retry_backoff_ms
            ));
        }

        if let Some(formality) = self.translation.get_formality() {
            if !["default", "more", "less", "prefer_more", "prefer_less"].contains(&formality.as_str()) {
                return Err(anyhow!("Unknown DeepL formality '{}'", formality));
            }
        }

        Ok(())
    }

    /// Require what a translation run needs beyond `validate`
    pub fn validate_for_translation(&self) -> Result<()> {
        self.validate()?;
        match self.translation.provider {
            TranslationProvider::DeepL => {
                if self.translation.get_api_key().is_empty() {
                    return Err(anyhow!(
                        "Translation API key is required for DeepL provider (set it in the config or DEEPL_API_KEY)"
                    ));
                }
            }
        }
        Ok(())
    }

    /// Load `path`, writing a default config there first when it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;
        Ok(config)
    }

    /// Cache database location, explicit or per-user default
    pub fn cache_path(&self) -> Result<PathBuf> {
        match &self.paths.cache_path {
            Some(path) => Ok(path.clone()),
            None => crate::database::DatabaseConnection::default_database_path(),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "sv".to_string(),
            paths: PathsConfig::default(),
            translation: TranslationConfig::default(),
            shield: ShieldConfig::default(),
            catalog: CatalogConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.provider.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let position = self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_str);
        let index = match position {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider.clone()));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Override the API key of the active provider
    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.active_provider_config_mut().api_key = api_key.into();
    }

    /// Get the endpoint for the active provider; empty means automatic
    pub fn get_endpoint(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.endpoint.clone())
            .unwrap_or_default()
    }

    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or_else(default_timeout_secs)
    }

    pub fn get_formality(&self) -> Option<String> {
        self.get_active_provider_config()
            .and_then(|p| p.formality.clone())
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![ProviderConfig::new(TranslationProvider::DeepL)],
            common: TranslationCommonConfig::default(),
        }
    }
}
