//! Domain module - crawl cursor, records and verdicts
//!
//! Pure types with no I/O. Everything that touches the network or the
//! filesystem lives in `infrastructure`.

pub mod entities;
pub mod events;
pub mod value_objects;

pub use entities::{RecordRow, digits_only};
pub use events::{CrawlVerdict, RunOutcome};
pub use value_objects::{COMPACT_DATE_FORMAT, Checkpoint, TargetDate, ValueError};
