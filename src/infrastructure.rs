//! Infrastructure layer: HTTP, parsing, persistence and ambient services
//!
//! Adapters the crawl orchestrator talks to (page fetcher, checkpoint store,
//! result sink) plus configuration and logging.

pub mod checkpoint_store; // search_day / page cursor file
pub mod config; // Layered configuration
pub mod http_client; // Page fetcher
pub mod logging; // Console + per-run log file
pub mod parsing; // Contract table extractor
pub mod parsing_error;
pub mod result_merger; // Per-date merge of per-run files
pub mod result_sink; // CSV accumulator

// Re-export commonly used items
pub use checkpoint_store::{CheckpointError, CheckpointStore};
pub use config::{AppConfig, ConfigError};
pub use http_client::{FetchError, PageSource, RawPage, S2bHttpClient};
pub use logging::{LogGuard, init_logging, run_log_file_name};
pub use parsing::{ContractTableParser, PageExtraction, ParseContext, ParsingError, ParsingResult};
pub use result_merger::{MergeSummary, merge_results};
pub use result_sink::{ResultAccumulator, SinkError, result_file_name};
