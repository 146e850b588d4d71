pub(crate) fn default_content_dir() -> String {
    "content".to_string()
}

pub(crate) fn default_api_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

pub(crate) fn default_source_language() -> u32 {
    1
}

pub(crate) fn default_target_language() -> u32 {
    2
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    10
}

pub(crate) fn default_content_cache_ttl_secs() -> u64 {
    3600
}

pub(crate) fn default_content_cache_entries() -> usize {
    100
}

pub(crate) fn default_cache_dir() -> String {
    ".cache".to_string()
}

pub(crate) fn default_namespace_prefix() -> String {
    dualsub_core::prefs::DEFAULT_NAMESPACE.to_string()
}

pub(crate) fn default_autoplay_on_open() -> bool {
    false
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}
