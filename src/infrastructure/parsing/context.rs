//! Parsing context for contract list pages

use crate::domain::TargetDate;

/// Context information for parsing one listing page
#[derive(Debug, Clone, Copy)]
pub struct ParseContext {
    /// Day every emitted record must belong to
    pub target_date: TargetDate,

    /// Page number, for diagnostics only
    pub page: u32,
}

impl ParseContext {
    #[must_use]
    pub const fn new(target_date: TargetDate, page: u32) -> Self {
        Self { target_date, page }
    }
}
