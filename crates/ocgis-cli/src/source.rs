//! Notice source backed by a directory of saved notice pages.

use crate::config::SourceConfig;
use ocgis_domain::traits::NoticeSource;
use ocgis_domain::{split_notices, RawNotice};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads every notice page in a directory.
///
/// Files are read in file-name order and split on the configured marker;
/// sequence numbers follow that order, so repeated runs over the same
/// directory number notices identically.
#[derive(Debug, Clone)]
pub struct DirectoryNoticeSource {
    dir: PathBuf,
    marker: String,
    extensions: Vec<String>,
}

impl DirectoryNoticeSource {
    /// Create a source for a directory.
    pub fn new(dir: impl Into<PathBuf>, marker: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            marker: marker.into(),
            extensions: vec!["html".to_string(), "htm".to_string()],
        }
    }

    /// Create a source from configuration, optionally reading another directory.
    pub fn from_config(config: &SourceConfig, dir: Option<&Path>) -> Self {
        Self {
            dir: dir.map(Path::to_path_buf).unwrap_or_else(|| config.dir.clone()),
            marker: config.marker.clone(),
            extensions: config.extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    /// Directory being read.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn wanted(&self, path: &Path) -> bool {
        path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| self.extensions.contains(&e.to_lowercase()))
    }

    /// Notice files in read order.
    pub fn files(&self) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if self.wanted(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Split one page into notices, numbering them from `next_sequence`.
    pub fn read_file(&self, path: &Path, next_sequence: usize) -> io::Result<Vec<RawNotice>> {
        let page = fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(split_notices(&page, &self.marker)
            .into_iter()
            .enumerate()
            .map(|(i, content)| RawNotice::new(next_sequence + i, format!("{}#{}", name, i), content))
            .collect())
    }
}

impl NoticeSource for DirectoryNoticeSource {
    type Error = io::Error;

    fn fetch_notices(&self) -> Result<Vec<RawNotice>, Self::Error> {
        let mut notices = Vec::new();
        for path in self.files()? {
            let batch = self.read_file(&path, notices.len())?;
            tracing::debug!(file = %path.display(), notices = batch.len(), "Read notice page");
            notices.extend(batch);
        }
        Ok(notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_sorted_and_splits() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.html"), "<nav/>NOTICE 3").unwrap();
        fs::write(dir.path().join("a.html"), "<nav/>NOTICE 1<hr>NOTICE 2").unwrap();
        fs::write(dir.path().join("notes.txt"), "NOTICE ignored").unwrap();

        let source = DirectoryNoticeSource::new(dir.path(), "NOTICE");
        let notices = source.fetch_notices().unwrap();

        assert_eq!(notices.len(), 3);
        let sequences: Vec<usize> = notices.iter().map(|n| n.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
        assert_eq!(notices[0].source, "a.html#0");
        assert_eq!(notices[1].content, "NOTICE 2");
        assert_eq!(notices[2].source, "b.html#0");
    }

    #[test]
    fn test_empty_marker_keeps_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.HTM"), "<html>NOTICE 1 NOTICE 2</html>").unwrap();
        fs::write(dir.path().join("blank.html"), "   ").unwrap();

        let source = DirectoryNoticeSource::new(dir.path(), "");
        let notices = source.fetch_notices().unwrap();

        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].source, "one.HTM#0");
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectoryNoticeSource::new(dir.path().join("absent"), "");
        assert!(source.fetch_notices().is_err());
    }

    #[test]
    fn test_from_config_override() {
        let config = SourceConfig::default();
        let source = DirectoryNoticeSource::from_config(&config, Some(Path::new("/tmp/inbox")));
        assert_eq!(source.dir(), Path::new("/tmp/inbox"));
    }
}
