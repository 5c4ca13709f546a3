//! Combines per-run result files into one file per date
//!
//! Input files are grouped by the first standalone 8-digit date in their
//! name and concatenated in start-page order into
//! `{output_dir}/s2b_result_{date}.csv`.

#![allow(clippy::uninlined_format_args)]

use crate::domain::TargetDate;
use crate::infrastructure::result_sink::{
    RESULT_FILE_PREFIX, SinkError, read_rows, result_file_name, write_rows,
};
use crate::infrastructure::config::OutputLayout;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{info, warn};

static DATED_FILE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?:^|[^0-9])([0-9]{8})(?:_([0-9]+))?(?:[^0-9]|$)"));

/// Outcome for one merged date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub date: String,
    pub files: usize,
    pub rows: usize,
    pub output: PathBuf,
}

#[derive(Debug)]
struct DatedFile {
    start_page: u32,
    name: String,
    path: PathBuf,
}

/// `(date, start_page)` encoded in a result file name, if any
#[must_use]
pub fn parse_file_name(name: &str) -> Option<(TargetDate, u32)> {
    let caps = DATED_FILE.as_ref().ok()?.captures(name)?;
    let date = caps.get(1)?.as_str().parse().ok()?;
    let start_page = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    Some((date, start_page))
}

/// Merge every dated `*.csv` in `input_dir` into `output_dir`
pub fn merge_results(input_dir: &Path, output_dir: &Path) -> Result<Vec<MergeSummary>, SinkError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| SinkError::Io { path, source }
    };

    fs::create_dir_all(output_dir).map_err(io_err(output_dir))?;
    let output_canonical = fs::canonicalize(output_dir).map_err(io_err(output_dir))?;

    let mut groups: BTreeMap<TargetDate, Vec<DatedFile>> = BTreeMap::new();
    for entry in fs::read_dir(input_dir).map_err(io_err(input_dir))? {
        let path = entry.map_err(io_err(input_dir))?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }

        let in_output_dir = path
            .parent()
            .and_then(|p| fs::canonicalize(p).ok())
            .is_some_and(|p| p == output_canonical);
        if in_output_dir {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let Some((date, start_page)) = parse_file_name(&name) else {
            warn!("Skipping {}: no date in file name", name);
            continue;
        };

        groups.entry(date).or_default().push(DatedFile {
            start_page,
            name,
            path,
        });
    }

    let mut summaries = Vec::with_capacity(groups.len());
    for (date, mut files) in groups {
        files.sort_by(|a, b| a.start_page.cmp(&b.start_page).then_with(|| a.name.cmp(&b.name)));
        info!("📚 Merging {} files for {}", files.len(), date);

        let mut rows = Vec::new();
        for file in &files {
            rows.extend(read_rows(&file.path)?);
        }

        let output = output_dir.join(result_file_name(OutputLayout::PerDate, date, 1));
        write_rows(&output, &rows)?;
        info!("✅ {} -> {} ({} rows)", date, output.display(), rows.len());

        summaries.push(MergeSummary {
            date: date.to_string(),
            files: files.len(),
            rows: rows.len(),
            output,
        });
    }

    if summaries.is_empty() {
        warn!("No {}_*.csv files found in {}", RESULT_FILE_PREFIX, input_dir.display());
    }
    Ok(summaries)
}
