//! Durable `(date, page)` crawl cursor
//!
//! Plain `key=value` text file:
//!
//! ```text
//! search_day=20250601
//! page=3
//! ```
//!
//! Writes go to a sibling temp file first and are renamed over the original,
//! so a crash never leaves a half-written cursor behind.

#![allow(clippy::uninlined_format_args)]

use crate::domain::{Checkpoint, TargetDate, ValueError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const KEY_SEARCH_DAY: &str = "search_day";
pub const KEY_PAGE: &str = "page";

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint file not found: {path}")]
    Missing { path: PathBuf },

    #[error("Checkpoint I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed checkpoint: {reason}")]
    Malformed { reason: String },

    #[error("Invalid search_day in checkpoint: {0}")]
    InvalidDate(#[source] ValueError),

    #[error("Invalid page in checkpoint: '{0}'")]
    InvalidPage(String),
}

/// File-backed checkpoint, exclusively owned by one crawl process
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the stored cursor
    pub fn load(&self) -> Result<Checkpoint, CheckpointError> {
        let content = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                CheckpointError::Missing {
                    path: self.path.clone(),
                }
            } else {
                CheckpointError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let checkpoint = parse(&content)?;
        debug!("📍 Loaded checkpoint {} from {}", checkpoint, self.path.display());
        Ok(checkpoint)
    }

    /// Overwrite the stored cursor (temp file + rename)
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let io_err = |source| CheckpointError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, render(checkpoint)).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;

        debug!("💾 Checkpoint saved: {}", checkpoint);
        Ok(())
    }
}

/// Serialize a checkpoint into the file format
#[must_use]
pub fn render(checkpoint: &Checkpoint) -> String {
    format!(
        "{}={}\n{}={}\n",
        KEY_SEARCH_DAY,
        checkpoint.target_date(),
        KEY_PAGE,
        checkpoint.next_page()
    )
}

/// Parse the file format; blank lines and `#` comments are ignored
pub fn parse(content: &str) -> Result<Checkpoint, CheckpointError> {
    let mut search_day = None;
    let mut page = None;

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(CheckpointError::Malformed {
                reason: format!("line without '=': '{}'", line),
            });
        };

        match key.trim() {
            KEY_SEARCH_DAY => search_day = Some(value.trim()),
            KEY_PAGE => page = Some(value.trim()),
            other => warn!("Ignoring unknown checkpoint key '{}'", other),
        }
    }

    let search_day = search_day.ok_or_else(|| CheckpointError::Malformed {
        reason: format!("missing '{}'", KEY_SEARCH_DAY),
    })?;
    let page = page.ok_or_else(|| CheckpointError::Malformed {
        reason: format!("missing '{}'", KEY_PAGE),
    })?;

    let target_date: TargetDate = search_day.parse().map_err(CheckpointError::InvalidDate)?;
    let next_page: u32 = page
        .parse()
        .map_err(|_| CheckpointError::InvalidPage(page.to_string()))?;

    Checkpoint::new(target_date, next_page).map_err(|_| CheckpointError::InvalidPage(page.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn checkpoint(date: &str, page: u32) -> Checkpoint {
        Checkpoint::new(date.parse().unwrap(), page).unwrap()
    }

    #[test]
    fn parses_plain_file() {
        let cp = parse("search_day=20250601\npage=3\n").unwrap();
        assert_eq!(cp, checkpoint("20250601", 3));
    }

    #[test]
    fn tolerates_whitespace_comments_and_order() {
        let cp = parse("# resume here\n\n page = 12 \r\nsearch_day= 20241231\n").unwrap();
        assert_eq!(cp, checkpoint("20241231", 12));
    }

    #[rstest]
    #[case("page=1\n")]
    #[case("search_day=20250601\n")]
    #[case("search_day 20250601\npage=1\n")]
    fn rejects_malformed(#[case] content: &str) {
        assert!(matches!(parse(content), Err(CheckpointError::Malformed { .. })));
    }

    #[rstest]
    #[case("0")]
    #[case("-1")]
    #[case("two")]
    fn rejects_bad_page(#[case] page: &str) {
        let content = format!("search_day=20250601\npage={}\n", page);
        assert!(matches!(parse(&content), Err(CheckpointError::InvalidPage(_))));
    }

    #[test]
    fn rejects_bad_date() {
        let result = parse("search_day=2025-06-01\npage=1\n");
        assert!(matches!(result, Err(CheckpointError::InvalidDate(_))));
    }

    #[test]
    fn render_then_parse_is_stable() {
        let cp = checkpoint("20250601", 42);
        assert_eq!(render(&cp), "search_day=20250601\npage=42\n");
        assert_eq!(parse(&render(&cp)).unwrap(), cp);
    }

    #[test]
    fn save_overwrites_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("state").join("sell_goods_param.txt"));

        store.save(&checkpoint("20250601", 1)).unwrap();
        store.save(&checkpoint("20250601", 2)).unwrap();

        assert_eq!(store.load().unwrap(), checkpoint("20250601", 2));
        assert!(!dir.path().join("state").join("sell_goods_param.txt.tmp").exists());
    }

    #[test]
    fn missing_file_is_reported_as_missing() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("nope.txt"));
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(CheckpointError::Missing { .. })));
    }
}
