use serde::Deserialize;

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub content_source: ContentSourceKind,
    #[serde(default = "crate::config::defaults::default_content_dir")]
    pub content_dir: String,
    #[serde(default = "crate::config::defaults::default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "crate::config::defaults::default_source_language")]
    pub source_language: u32,
    #[serde(default = "crate::config::defaults::default_target_language")]
    pub target_language: u32,
    #[serde(default = "crate::config::defaults::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "crate::config::defaults::default_content_cache_ttl_secs")]
    pub content_cache_ttl_secs: u64,
    #[serde(default = "crate::config::defaults::default_content_cache_entries")]
    pub content_cache_entries: usize,
    #[serde(default = "crate::config::defaults::default_cache_dir")]
    pub cache_dir: String,
    #[serde(default = "crate::config::defaults::default_namespace_prefix")]
    pub namespace_prefix: String,
    #[serde(default = "crate::config::defaults::default_autoplay_on_open")]
    pub autoplay_on_open: bool,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            content_source: ContentSourceKind::default(),
            content_dir: crate::config::defaults::default_content_dir(),
            api_base_url: crate::config::defaults::default_api_base_url(),
            source_language: crate::config::defaults::default_source_language(),
            target_language: crate::config::defaults::default_target_language(),
            request_timeout_secs: crate::config::defaults::default_request_timeout_secs(),
            content_cache_ttl_secs: crate::config::defaults::default_content_cache_ttl_secs(),
            content_cache_entries: crate::config::defaults::default_content_cache_entries(),
            cache_dir: crate::config::defaults::default_cache_dir(),
            namespace_prefix: crate::config::defaults::default_namespace_prefix(),
            autoplay_on_open: crate::config::defaults::default_autoplay_on_open(),
            log_level: crate::config::defaults::default_log_level(),
        }
    }
}

/// Where subtitle tracks and alignments come from.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ContentSourceKind {
    /// JSON files under `content_dir`.
    #[default]
    Files,
    /// The catalog HTTP API at `api_base_url`.
    Http,
}

impl std::fmt::Display for ContentSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ContentSourceKind::Files => "files",
            ContentSourceKind::Http => "http",
        };
        write!(f, "{}", label)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
