//! Configuration loading
//!
//! Bootstrap configuration comes from a TOML file. Every section and field is
//! optional; anything missing falls back to a compiled default, and a missing
//! file only produces a warning.
//!
//! Resolution priority for the config file path and the API key:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`CINEGRAPH_CONFIG`, `CINEGRAPH_API_KEY`)
//! 3. TOML config file (`~/.config/cinegraph/config.toml`)
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "CINEGRAPH_CONFIG";
/// Environment variable carrying the metadata provider API key
pub const API_KEY_ENV_VAR: &str = "CINEGRAPH_API_KEY";

/// Root of the TOML configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub source: SourceConfig,
    pub build: BuildConfig,
    pub graph: GraphParams,
    pub recommend: RecommendParams,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter (trace, debug, info, warn, error or a full EnvFilter directive)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Metadata provider connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.themoviedb.org/3".to_string(),
            api_key: None,
            timeout_secs: 15,
        }
    }
}

/// Maximum number of entities gathered per kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindLimits {
    pub movies: usize,
    pub people: usize,
    pub companies: usize,
    pub collections: usize,
    pub genres: usize,
    pub keywords: usize,
}

impl Default for KindLimits {
    fn default() -> Self {
        Self {
            movies: 400,
            people: 150,
            companies: 40,
            collections: 40,
            genres: 30,
            keywords: 60,
        }
    }
}

/// Search terms driving per-kind discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchTerms {
    pub companies: Vec<String>,
    pub collections: Vec<String>,
    pub people: Vec<String>,
    pub keywords: Vec<String>,
}

impl Default for SearchTerms {
    fn default() -> Self {
        let owned = |terms: &[&str]| terms.iter().map(|t| t.to_string()).collect();
        Self {
            companies: owned(&[
                "Warner Bros",
                "Universal Pictures",
                "Paramount",
                "Pixar",
                "A24",
                "Studio Ghibli",
                "Marvel Studios",
                "Lucasfilm",
            ]),
            collections: owned(&[
                "Star Wars",
                "Harry Potter",
                "James Bond",
                "The Lord of the Rings",
                "Toy Story",
                "Jurassic Park",
                "Mission: Impossible",
                "The Fast and the Furious",
            ]),
            people: owned(&[
                "Christopher Nolan",
                "Denis Villeneuve",
                "Greta Gerwig",
                "Tom Hanks",
                "Meryl Streep",
                "Keanu Reeves",
            ]),
            keywords: owned(&[
                "time travel",
                "heist",
                "dystopia",
                "superhero",
                "based on novel or book",
                "space",
                "coming of age",
            ]),
        }
    }
}

/// Pagination bounds for provider lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Maximum pages fetched per query
    pub max_pages: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { max_pages: 5 }
    }
}

/// Retry policy for transient lookup failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 4000,
        }
    }
}

/// Provider rate limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Token-bucket quota for the HTTP client
    pub requests_per_second: u32,
    /// Pause between paginated fetch batches
    pub batch_delay_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 20,
            batch_delay_ms: 250,
        }
    }
}

/// Build configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Upper bound on catalog size entering graph construction (pairwise cost)
    pub max_catalog_size: usize,
    /// Year "recent activity" is measured against; current year when unset
    pub reference_year: Option<i32>,
    pub limits: KindLimits,
    pub search_terms: SearchTerms,
    pub pagination: PaginationConfig,
    pub retry: RetryConfig,
    pub rate_limit: RateLimitConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_catalog_size: 1500,
            reference_year: None,
            limits: KindLimits::default(),
            search_terms: SearchTerms::default(),
            pagination: PaginationConfig::default(),
            retry: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl BuildConfig {
    /// Reference year for recency scoring
    pub fn reference_year(&self) -> i32 {
        use chrono::Datelike;
        self.reference_year.unwrap_or_else(|| chrono::Utc::now().year())
    }
}

/// Relationship graph tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphParams {
    /// Strength multiplier for mirrored (reverse) connections
    pub reverse_discount: f64,
    /// Strength multiplier for synthesized transitive peer connections
    pub peer_discount: f64,
    /// Synthesized peer connections below this strength are discarded
    pub peer_floor: f64,
    /// Boost when both hops of a peer path share the same relationship kind
    pub peer_type_boost: f64,
    /// Fan-out bound per entity per dimension
    pub max_connections_per_type: usize,
    /// Analyzer output below this strength is dropped
    pub min_strength: f64,
    /// Semantic clusters larger than this do not materialize connections
    pub max_cluster_size: usize,
    /// Maximum rating distance for collaborative peers
    pub rating_proximity: f64,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            reverse_discount: 0.85,
            peer_discount: 0.7,
            peer_floor: 0.2,
            peer_type_boost: 1.1,
            max_connections_per_type: 20,
            min_strength: 0.1,
            max_cluster_size: 40,
            rating_proximity: 0.75,
        }
    }
}

/// Recommendation engine tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendParams {
    pub quick_cap: usize,
    pub deep_cap: usize,
    pub category_cap: usize,
    pub trending_cap: usize,
    /// Candidates at or above this pairwise similarity to a kept one are skipped
    pub diversity_threshold: f64,
    pub quick_direct_confidence: f64,
    pub quick_semantic_confidence: f64,
    /// Entries held per tier in the on-demand query cache
    pub query_cache_capacity: usize,
    /// Weight of the trend signal in the trending tier
    pub trending_boost: f64,
}

impl Default for RecommendParams {
    fn default() -> Self {
        Self {
            quick_cap: 10,
            deep_cap: 20,
            category_cap: 10,
            trending_cap: 10,
            diversity_threshold: 0.8,
            quick_direct_confidence: 0.8,
            quick_semantic_confidence: 0.7,
            query_cache_capacity: 512,
            trending_boost: 0.5,
        }
    }
}

/// Default config file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cinegraph").join("config.toml"))
}

/// Resolve the config file path: CLI → ENV → platform default
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the config file if present, otherwise fall back to defaults
///
/// A missing file is not an error. A file that exists but fails to parse is.
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    match path {
        Some(path) if path.exists() => {
            let config = load_toml_config(path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        Some(path) => {
            warn!("Config file {} not found, using built-in defaults", path.display());
            Ok(TomlConfig::default())
        }
        None => {
            warn!("No config file location available, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Write a config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Resolve the provider API key: CLI → ENV → TOML
pub fn resolve_api_key(cli_arg: Option<&str>, toml_config: &TomlConfig) -> Option<String> {
    if let Some(key) = cli_arg.filter(|k| is_valid_key(k)) {
        return Some(key.to_string());
    }

    if let Ok(key) = std::env::var(API_KEY_ENV_VAR) {
        if is_valid_key(&key) {
            info!("API key loaded from environment variable");
            return Some(key);
        }
    }

    toml_config
        .source
        .api_key
        .as_ref()
        .filter(|k| is_valid_key(k))
        .cloned()
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// User-Agent string for HTTP clients
pub fn get_user_agent() -> String {
    format!("cinegraph/{}", env!("CARGO_PKG_VERSION"))
}
