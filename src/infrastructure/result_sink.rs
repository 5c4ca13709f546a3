//! Result accumulator for one target date
//!
//! Loads the already persisted CSV once, then every non-empty page is
//! appended in memory and the whole artifact is rewritten (temp file +
//! rename). With `dedupe` on, a record identical to one already held is not
//! appended again, so re-fetching a page after a crash does not duplicate it.

#![allow(clippy::uninlined_format_args)]

use crate::domain::{RecordRow, TargetDate};
use crate::infrastructure::config::OutputLayout;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const RESULT_FILE_PREFIX: &str = "s2b_result";

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Result file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Output file name for a run, per configured layout
#[must_use]
pub fn result_file_name(layout: OutputLayout, target_date: TargetDate, start_page: u32) -> String {
    match layout {
        OutputLayout::PerDate => format!("{}_{}.csv", RESULT_FILE_PREFIX, target_date),
        OutputLayout::PerRun => format!("{}_{}_{}.csv", RESULT_FILE_PREFIX, target_date, start_page),
    }
}

/// In-memory persisted set mirrored to one CSV file
#[derive(Debug)]
pub struct ResultAccumulator {
    path: PathBuf,
    rows: Vec<RecordRow>,
    seen: HashSet<RecordRow>,
    dedupe: bool,
}

impl ResultAccumulator {
    /// Open the artifact at `path`, loading any rows it already holds
    pub fn open(path: impl Into<PathBuf>, dedupe: bool) -> Result<Self, SinkError> {
        let path = path.into();
        let rows = if path.is_file() {
            let rows = read_rows(&path)?;
            info!("📂 Loaded {} existing records from {}", rows.len(), path.display());
            rows
        } else {
            Vec::new()
        };

        let seen = if dedupe {
            rows.iter().cloned().collect()
        } else {
            HashSet::new()
        };

        Ok(Self {
            path,
            rows,
            seen,
            dedupe,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn rows(&self) -> &[RecordRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append `records` and rewrite the artifact; returns how many were added
    pub fn merge(&mut self, records: &[RecordRow]) -> Result<usize, SinkError> {
        let mut added = 0;
        for record in records {
            if self.dedupe && !self.seen.insert(record.clone()) {
                debug!("Skipping already persisted record {}", record.contract_no);
                continue;
            }
            self.rows.push(record.clone());
            added += 1;
        }

        if added > 0 {
            write_rows(&self.path, &self.rows)?;
        }
        Ok(added)
    }
}

/// Read every record of a result CSV
pub fn read_rows(path: &Path) -> Result<Vec<RecordRow>, SinkError> {
    let csv_err = |source| SinkError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    reader
        .deserialize::<RecordRow>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_err)
}

/// Write a complete result CSV (header row included) via temp file + rename
pub fn write_rows(path: &Path, rows: &[RecordRow]) -> Result<(), SinkError> {
    let io_err = |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };
    let csv_err = |source| SinkError::Csv {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp = path.to_path_buf().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp)
            .map_err(csv_err)?;
        writer.write_record(RecordRow::HEADERS).map_err(csv_err)?;
        for row in rows {
            writer.serialize(row).map_err(csv_err)?;
        }
        writer.flush().map_err(io_err)?;
    }

    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(no: &str, contract_no: &str) -> RecordRow {
        RecordRow {
            sequence_no: no.to_string(),
            category: "물품".to_string(),
            contract_no: contract_no.to_string(),
            title: "복사용지, A4 \"80g\"".to_string(),
            amount: "1,200,000".to_string(),
            counterparty: "(주)가나다".to_string(),
            organization: "서울초등학교".to_string(),
            contract_date: "2025-06-01".to_string(),
        }
    }

    #[test]
    fn file_names_follow_layout() {
        let date = "20250601".parse().unwrap();
        assert_eq!(result_file_name(OutputLayout::PerDate, date, 7), "s2b_result_20250601.csv");
        assert_eq!(result_file_name(OutputLayout::PerRun, date, 7), "s2b_result_20250601_7.csv");
    }

    #[test]
    fn merge_rewrites_full_artifact_with_headers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s2b_result_20250601.csv");

        let mut acc = ResultAccumulator::open(&path, true).unwrap();
        assert!(acc.is_empty());
        assert_eq!(acc.merge(&[row("1", "20250601-0001")]).unwrap(), 1);
        assert_eq!(acc.merge(&[row("2", "20250601-0002")]).unwrap(), 1);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("No,계약구분,계약번호,계약명,금액,계약대상자,기관명,계약일\n"));
        assert_eq!(read_rows(&path).unwrap(), vec![row("1", "20250601-0001"), row("2", "20250601-0002")]);
    }

    #[test]
    fn reopening_keeps_existing_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        ResultAccumulator::open(&path, true)
            .unwrap()
            .merge(&[row("1", "20250601-0001")])
            .unwrap();

        let mut acc = ResultAccumulator::open(&path, true).unwrap();
        assert_eq!(acc.len(), 1);
        acc.merge(&[row("2", "20250601-0002")]).unwrap();
        assert_eq!(read_rows(&path).unwrap().len(), 2);
    }

    #[test]
    fn dedupe_skips_identical_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let page = [row("1", "20250601-0001"), row("2", "20250601-0002")];

        let mut acc = ResultAccumulator::open(&path, true).unwrap();
        acc.merge(&page).unwrap();

        let mut reopened = ResultAccumulator::open(&path, true).unwrap();
        assert_eq!(reopened.merge(&page).unwrap(), 0);
        assert_eq!(read_rows(&path).unwrap().len(), 2);
    }

    #[test]
    fn append_only_mode_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let page = [row("1", "20250601-0001")];

        let mut acc = ResultAccumulator::open(&path, false).unwrap();
        acc.merge(&page).unwrap();
        assert_eq!(acc.merge(&page).unwrap(), 1);
        assert_eq!(read_rows(&path).unwrap().len(), 2);
    }

    #[test]
    fn empty_merge_does_not_create_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        let mut acc = ResultAccumulator::open(&path, true).unwrap();
        assert_eq!(acc.merge(&[]).unwrap(), 0);
        assert!(!path.exists());
    }
}
