use super::{parse_alignment, parse_track};
use anyhow::{Context, Result};
use dualsub_core::{AlignmentUnit, ContentError, ContentSource, LanguageId, MovieId, SubtitleLine};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

/// Catalog API client.
///
/// `GET {base}/api/movies/{id}/subtitles?lang={lang}` and
/// `GET {base}/api/movies/{id}/alignment?from={source}&to={target}`; a 404
/// means the track or alignment does not exist.
pub struct HttpContentSource {
    client: Client,
    base_url: String,
}

impl HttpContentSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
        not_found: ContentError,
    ) -> Result<String, ContentError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Requesting content");
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|err| ContentError::Transport(format!("{url}: {err}")))?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(not_found),
            status if !status.is_success() => {
                Err(ContentError::Transport(format!("{url}: HTTP {status}")))
            }
            _ => response
                .text()
                .map_err(|err| ContentError::Transport(format!("{url}: {err}"))),
        }
    }
}

impl ContentSource for HttpContentSource {
    fn subtitle_track(
        &mut self,
        movie: MovieId,
        language: LanguageId,
    ) -> Result<Vec<SubtitleLine>, ContentError> {
        let text = self.get(
            &format!("/api/movies/{movie}/subtitles"),
            &[("lang", language.to_string())],
            ContentError::track_not_found(movie, language),
        )?;
        parse_track(&text)
    }

    fn alignment(
        &mut self,
        movie: MovieId,
        source: LanguageId,
        target: LanguageId,
    ) -> Result<Vec<AlignmentUnit>, ContentError> {
        let text = self.get(
            &format!("/api/movies/{movie}/alignment"),
            &[("from", source.to_string()), ("to", target.to_string())],
            ContentError::alignment_not_found(movie, source, target),
        )?;
        parse_alignment(&text)
    }
}
