use super::defaults;
use super::models::{AppConfig, ContentSourceKind, LogLevel};
use serde::Deserialize;

/// On-disk layout of `conf/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    content: ContentConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            content_source: tables.content.source,
            content_dir: tables.content.content_dir,
            api_base_url: tables.content.api_base_url,
            source_language: tables.content.source_language,
            target_language: tables.content.target_language,
            request_timeout_secs: tables.content.request_timeout_secs,
            content_cache_ttl_secs: tables.content.cache_ttl_secs,
            content_cache_entries: tables.content.cache_entries,
            cache_dir: tables.storage.cache_dir,
            namespace_prefix: tables.storage.namespace_prefix,
            autoplay_on_open: tables.playback.autoplay_on_open,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            content: ContentConfig {
                source: config.content_source,
                content_dir: config.content_dir.clone(),
                api_base_url: config.api_base_url.clone(),
                source_language: config.source_language,
                target_language: config.target_language,
                request_timeout_secs: config.request_timeout_secs,
                cache_ttl_secs: config.content_cache_ttl_secs,
                cache_entries: config.content_cache_entries,
            },
            storage: StorageConfig {
                cache_dir: config.cache_dir.clone(),
                namespace_prefix: config.namespace_prefix.clone(),
            },
            playback: PlaybackConfig {
                autoplay_on_open: config.autoplay_on_open,
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ContentConfig {
    #[serde(default)]
    source: ContentSourceKind,
    #[serde(default = "defaults::default_content_dir")]
    content_dir: String,
    #[serde(default = "defaults::default_api_base_url")]
    api_base_url: String,
    #[serde(default = "defaults::default_source_language")]
    source_language: u32,
    #[serde(default = "defaults::default_target_language")]
    target_language: u32,
    #[serde(default = "defaults::default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "defaults::default_content_cache_ttl_secs")]
    cache_ttl_secs: u64,
    #[serde(default = "defaults::default_content_cache_entries")]
    cache_entries: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        ContentConfig {
            source: ContentSourceKind::default(),
            content_dir: defaults::default_content_dir(),
            api_base_url: defaults::default_api_base_url(),
            source_language: defaults::default_source_language(),
            target_language: defaults::default_target_language(),
            request_timeout_secs: defaults::default_request_timeout_secs(),
            cache_ttl_secs: defaults::default_content_cache_ttl_secs(),
            cache_entries: defaults::default_content_cache_entries(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_cache_dir")]
    cache_dir: String,
    #[serde(default = "defaults::default_namespace_prefix")]
    namespace_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            cache_dir: defaults::default_cache_dir(),
            namespace_prefix: defaults::default_namespace_prefix(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PlaybackConfig {
    #[serde(default = "defaults::default_autoplay_on_open")]
    autoplay_on_open: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            autoplay_on_open: defaults::default_autoplay_on_open(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
