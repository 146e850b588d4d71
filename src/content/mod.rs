//! Content sources for the reader binary.
//!
//! Both sources speak the catalog's JSON shapes: a track is
//! `{"subtitle_lines": [...]}` (a bare array is accepted too) and an
//! alignment is `{"link_data": [[source ids], [target ids]], ...}`.

mod files;
mod http;

pub use files::FileContentSource;
pub use http::HttpContentSource;

use crate::config::{AppConfig, ContentSourceKind};
use anyhow::Result;
use dualsub_core::model::LinkPair;
use dualsub_core::{AlignmentUnit, CachedContentSource, ContentError, ContentSource, SubtitleLine};
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

#[derive(Deserialize)]
#[serde(untagged)]
enum TrackPayload {
    Wrapped { subtitle_lines: Vec<SubtitleLine> },
    Bare(Vec<SubtitleLine>),
}

#[derive(Deserialize)]
struct AlignmentPayload {
    link_data: Vec<LinkPair>,
}

pub fn parse_track(text: &str) -> Result<Vec<SubtitleLine>, ContentError> {
    let payload: TrackPayload = serde_json::from_str(text)
        .map_err(|err| ContentError::Malformed(format!("subtitle track: {err}")))?;
    Ok(match payload {
        TrackPayload::Wrapped { subtitle_lines } => subtitle_lines,
        TrackPayload::Bare(lines) => lines,
    })
}

pub fn parse_alignment(text: &str) -> Result<Vec<AlignmentUnit>, ContentError> {
    let payload: AlignmentPayload = serde_json::from_str(text)
        .map_err(|err| ContentError::Malformed(format!("alignment: {err}")))?;
    Ok(AlignmentUnit::from_link_pairs(payload.link_data))
}

/// Build the configured source, wrapped in the in-memory content cache.
pub fn build_source(config: &AppConfig) -> Result<Box<dyn ContentSource>> {
    let ttl = Duration::from_secs(config.content_cache_ttl_secs);
    let entries = config.content_cache_entries;
    info!(
        source = %config.content_source,
        ttl_secs = config.content_cache_ttl_secs,
        entries,
        "Using content source"
    );
    Ok(match config.content_source {
        ContentSourceKind::Files => Box::new(CachedContentSource::new(
            FileContentSource::new(&config.content_dir),
            ttl,
            entries,
        )),
        ContentSourceKind::Http => Box::new(CachedContentSource::new(
            HttpContentSource::new(
                &config.api_base_url,
                Duration::from_secs(config.request_timeout_secs),
            )?,
            ttl,
            entries,
        )),
    })
}
