//! Outcomes of processing one page and of one whole crawl run

use serde::Serialize;

use super::entities::RecordRow;
use super::value_objects::Checkpoint;

/// Tagged outcome of one page; drives the orchestrator's next transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlVerdict {
    /// Every record on the page belongs to the target date; more pages may follow
    Continue(Vec<RecordRow>),

    /// A record of a later date was reached; holds the records before it
    DateBoundary(Vec<RecordRow>),

    /// No data table (or no records) on the page
    EmptyPage,

    /// Network / HTTP failure; the page was not processed
    TransientError(String),
}

impl CrawlVerdict {
    /// Records carried by the verdict (empty for non-data verdicts)
    #[must_use]
    pub fn records(&self) -> &[RecordRow] {
        match self {
            Self::Continue(records) | Self::DateBoundary(records) => records,
            Self::EmptyPage | Self::TransientError(_) => &[],
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Continue(_) => "continue",
            Self::DateBoundary(_) => "date_boundary",
            Self::EmptyPage => "empty_page",
            Self::TransientError(_) => "transient_error",
        }
    }
}

/// Terminal state of one process invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The stored date is today (or later); nothing was fetched
    TodayRefused { checkpoint: Checkpoint },

    /// A date boundary was crossed; the checkpoint now points at the next day
    DateRolled {
        pages_fetched: u32,
        records_saved: usize,
        next: Checkpoint,
    },

    /// An empty page ended the run; the checkpoint still points at that page
    Exhausted {
        pages_fetched: u32,
        records_saved: usize,
        checkpoint: Checkpoint,
    },

    /// The per-run page cap was reached
    PageLimitReached {
        pages_fetched: u32,
        records_saved: usize,
        next: Checkpoint,
    },

    /// A transient error stopped the run; retry resumes at `checkpoint`
    Halted {
        pages_fetched: u32,
        records_saved: usize,
        checkpoint: Checkpoint,
        reason: String,
    },
}

impl RunOutcome {
    /// Process exit code a scheduler can act on
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Halted { .. } => 2,
            _ => 0,
        }
    }

    /// Number of page fetches performed during the run
    #[must_use]
    pub const fn pages_fetched(&self) -> u32 {
        match self {
            Self::TodayRefused { .. } => 0,
            Self::DateRolled { pages_fetched, .. }
            | Self::Exhausted { pages_fetched, .. }
            | Self::PageLimitReached { pages_fetched, .. }
            | Self::Halted { pages_fetched, .. } => *pages_fetched,
        }
    }
}
