//! S2B Harvest - resumable, date-boundary-aware crawler for S2B contract listings
//!
//! A run reads the `(date, page)` checkpoint, fetches pages one at a time,
//! extracts paired-row records, appends them to the day's CSV and advances
//! the checkpoint, until the listing crosses into the next day.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{CrawlError, CrawlOrchestrator, CrawlSettings};
pub use domain::{Checkpoint, CrawlVerdict, RecordRow, RunOutcome, TargetDate};
