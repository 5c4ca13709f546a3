//! Application layer
//!
//! The crawl state machine and the pluggable session strategy it consults.

pub mod crawl_error;
pub mod crawl_orchestrator;
pub mod session_policy;

pub use crawl_error::{CrawlError, CrawlResult};
pub use crawl_orchestrator::{CrawlOrchestrator, CrawlSettings, current_date};
pub use session_policy::{
    FixedSession, IntervalSessionPolicy, SessionAction, SessionPolicy, policy_from_config,
};
