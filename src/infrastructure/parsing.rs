//! HTML parsing infrastructure for S2B contract listings
//!
//! Trait-based parsing: a parser turns one page of markup plus its context
//! into typed output.

pub mod context;
pub mod contract_table_parser;
pub mod error;

pub use context::ParseContext;
pub use contract_table_parser::{ContractTableParser, PageExtraction};
pub use error::{ParsingError, ParsingResult};

use scraper::Html;

/// Parser trait with context support
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse HTML with contextual information
    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output>;
}
