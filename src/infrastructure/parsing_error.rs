//! Parsing error types for the contract table extractor
//!
//! A missing table is benign (end of data); a broken record pair is skipped
//! and reported, never fatal to the page.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("No contract table found on page {page}")]
    TableNotFound { page: u32 },

    #[error("Record pair at row {row_index} skipped: '{field}' {reason}")]
    RowParse {
        row_index: usize,
        field: &'static str,
        reason: String,
    },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },
}

impl ParsingError {
    /// Create a row parse error for a missing cell
    pub fn missing_cell(row_index: usize, field: &'static str, offset: usize, available: usize) -> Self {
        Self::RowParse {
            row_index,
            field,
            reason: format!("expected cell #{offset}, row has {available} cells"),
        }
    }

    /// Errors that only cost one record (or one page) and never stop a run
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::TableNotFound { .. } | Self::RowParse { .. } => true,
            Self::InvalidSelector { .. } => false,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
