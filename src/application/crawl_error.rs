//! Errors that abort a crawl run
//!
//! Transient fetch failures are *not* here: they end the run with
//! `RunOutcome::Halted` and a preserved checkpoint. These are the failures
//! that need an operator.

use crate::domain::{Checkpoint, ValueError};
use crate::infrastructure::checkpoint_store::CheckpointError;
use crate::infrastructure::parsing::ParsingError;
use crate::infrastructure::result_sink::SinkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Result sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Extractor setup failed: {0}")]
    Parser(#[from] ParsingError),

    #[error("Cursor error: {0}")]
    Value(#[from] ValueError),

    #[error("Refusing to move checkpoint backwards from {current} to {attempted}")]
    CheckpointRegression { current: Checkpoint, attempted: Checkpoint },
}

pub type CrawlResult<T> = Result<T, CrawlError>;
