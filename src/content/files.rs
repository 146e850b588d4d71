use super::{parse_alignment, parse_track};
use dualsub_core::{AlignmentUnit, ContentError, ContentSource, LanguageId, MovieId, SubtitleLine};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads `{root}/{movie}/subtitles_{lang}.json` and
/// `{root}/{movie}/alignment_{source}_{target}.json`.
#[derive(Debug, Clone)]
pub struct FileContentSource {
    root: PathBuf,
}

impl FileContentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn track_path(&self, movie: MovieId, language: LanguageId) -> PathBuf {
        self.root
            .join(movie.to_string())
            .join(format!("subtitles_{language}.json"))
    }

    fn alignment_path(&self, movie: MovieId, source: LanguageId, target: LanguageId) -> PathBuf {
        self.root
            .join(movie.to_string())
            .join(format!("alignment_{source}_{target}.json"))
    }
}

fn read(path: &Path, not_found: ContentError) -> Result<String, ContentError> {
    debug!(path = %path.display(), "Reading content file");
    fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => not_found,
        _ => ContentError::Transport(format!("{}: {err}", path.display())),
    })
}

impl ContentSource for FileContentSource {
    fn subtitle_track(
        &mut self,
        movie: MovieId,
        language: LanguageId,
    ) -> Result<Vec<SubtitleLine>, ContentError> {
        let text = read(
            &self.track_path(movie, language),
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
        let text = read(
            &self.alignment_path(movie, source, target),
            ContentError::alignment_not_found(movie, source, target),
        )?;
        parse_alignment(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dualsub_core::MovieSelection;
    use dualsub_core::content::load_content;

    fn write(root: &Path, name: &str, body: &str) {
        let dir = root.join("12");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join(name), body).expect("write");
    }

    #[test]
    fn loads_movie_from_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            dir.path(),
            "subtitles_1.json",
            r#"{"subtitle_lines": [{"id": 1, "sequence": 0, "content": "Hello", "language_id": 1}]}"#,
        );
        write(
            dir.path(),
            "subtitles_2.json",
            r#"[{"id": 9, "sequence": 0, "content": "Hola", "language_id": 2}]"#,
        );
        write(dir.path(), "alignment_1_2.json", r#"{"link_data": [[[1], [9]]]}"#);

        let mut source = FileContentSource::new(dir.path());
        let index = load_content(
            &mut source,
            &MovieSelection {
                movie_id: MovieId(12),
                source_language: LanguageId(1),
                target_language: LanguageId(2),
            },
        )
        .expect("content");
        assert_eq!(index.count(), 1);
        assert_eq!(index.preview(0).as_deref(), Some("Hello | Hola"));
    }

    #[test]
    fn missing_files_are_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut source = FileContentSource::new(dir.path());
        let err = source
            .alignment(MovieId(12), LanguageId(1), LanguageId(2))
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
