//! Contract list extractor
//!
//! Each logical record on the S2B contract list is rendered as two adjacent
//! table rows: a head row (`No, 계약구분, 계약번호, 계약명, 금액, 계약대상자`)
//! followed by a tail row holding the organization and the contract date.
//!
//! Precondition: rows are ordered by contract number, whose leading eight
//! digits are the contract day. The first record of another day therefore
//! marks the end of the target day's data; nothing after it is emitted.
//! Later rows are still inspected (never emitted) so a violation of the
//! ordering can be reported.

#![allow(clippy::uninlined_format_args)]

use super::{ContextualParser, ParseContext, ParsingError, ParsingResult};
use crate::domain::{CrawlVerdict, RecordRow};
use crate::infrastructure::config::s2b::markers;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Cell offsets inside the head and tail rows
mod offsets {
    pub const SEQUENCE_NO: usize = 0;
    pub const CATEGORY: usize = 1;
    pub const CONTRACT_NO: usize = 2;
    pub const TITLE: usize = 3;
    pub const AMOUNT: usize = 4;
    pub const COUNTERPARTY: usize = 5;

    pub const ORGANIZATION: usize = 1;
    pub const CONTRACT_DATE: usize = 3;
}

/// A data table needs more than two rows; smaller matches are layout tables
const MIN_TABLE_ROWS: usize = 3;

/// Result of extracting one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageExtraction {
    pub verdict: CrawlVerdict,

    /// False when no qualifying table was present
    pub table_found: bool,

    /// Record pairs dropped because a field could not be read
    pub skipped: Vec<ParsingError>,

    /// Target-date records found after the boundary (ordering violations)
    pub late_matches: usize,
}

impl PageExtraction {
    fn no_table() -> Self {
        Self {
            verdict: CrawlVerdict::EmptyPage,
            table_found: false,
            skipped: Vec::new(),
            late_matches: 0,
        }
    }

    #[must_use]
    pub fn records(&self) -> &[RecordRow] {
        self.verdict.records()
    }
}

/// Extracts paired-row contract records from a listing page
pub struct ContractTableParser {
    table_selector: Selector,
}

impl ContractTableParser {
    pub fn new() -> ParsingResult<Self> {
        let table_selector = Selector::parse("table").map_err(|e| ParsingError::InvalidSelector {
            selector: "table".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { table_selector })
    }

    /// Extract records and a continuation verdict from raw page markup.
    ///
    /// Never fails: a page without the contract table yields `EmptyPage`.
    pub fn extract(&self, markup: &str, context: &ParseContext) -> PageExtraction {
        let html = Html::parse_document(markup);

        match self.parse_with_context(&html, context) {
            Ok(extraction) => extraction,
            Err(e @ ParsingError::TableNotFound { .. }) => {
                debug!("{}", e);
                PageExtraction::no_table()
            }
            Err(e) => {
                warn!("Page {} could not be parsed: {}", context.page, e);
                PageExtraction::no_table()
            }
        }
    }

    /// Innermost table mentioning both column markers with enough rows
    fn find_contract_table<'a>(&self, html: &'a Html) -> Option<ElementRef<'a>> {
        let candidates: Vec<ElementRef<'a>> = html
            .select(&self.table_selector)
            .filter(|table| Self::is_contract_table(*table))
            .collect();

        candidates.iter().copied().find(|table| {
            !candidates
                .iter()
                .any(|other| other.id() != table.id() && other.ancestors().any(|a| a.id() == table.id()))
        })
    }

    fn is_contract_table(table: ElementRef<'_>) -> bool {
        let text: String = table.text().collect();
        text.contains(markers::CONTRACT_NAME)
            && text.contains(markers::CONTRACT_NUMBER)
            && own_rows(table).len() >= MIN_TABLE_ROWS
    }

    /// Merge a head row and its tail row into one record
    fn parse_pair(
        &self,
        head: &[ElementRef<'_>],
        tail: &[ElementRef<'_>],
        row_index: usize,
    ) -> ParsingResult<RecordRow> {
        let required = |offset: usize, field: &'static str| {
            head.get(offset)
                .map(|cell| cell_text(*cell))
                .ok_or_else(|| ParsingError::missing_cell(row_index, field, offset, head.len()))
        };
        let optional = |offset: usize| tail.get(offset).map(|cell| cell_text(*cell)).unwrap_or_default();

        Ok(RecordRow {
            sequence_no: required(offsets::SEQUENCE_NO, "sequence_no")?,
            category: required(offsets::CATEGORY, "category")?,
            contract_no: required(offsets::CONTRACT_NO, "contract_no")?,
            title: required(offsets::TITLE, "title")?,
            amount: required(offsets::AMOUNT, "amount")?,
            counterparty: required(offsets::COUNTERPARTY, "counterparty")?,
            organization: optional(offsets::ORGANIZATION),
            contract_date: optional(offsets::CONTRACT_DATE),
        })
    }
}

impl ContextualParser for ContractTableParser {
    type Output = PageExtraction;
    type Context = ParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        let table = self
            .find_contract_table(html)
            .ok_or(ParsingError::TableNotFound { page: context.page })?;

        let rows = own_rows(table);
        let prefix = context.target_date.compact();

        let mut records = Vec::new();
        let mut skipped = Vec::new();
        let mut boundary_row: Option<usize> = None;
        let mut late_matches = 0;

        let mut i = 0;
        while i < rows.len() {
            let head = cells(rows[i]);
            if !is_record_head(&head) {
                i += 1;
                continue;
            }

            let Some(tail_row) = rows.get(i + 1) else {
                debug!("Page {}: record head at row {} has no tail row, discarded", context.page, i);
                break;
            };
            let tail = cells(*tail_row);

            match self.parse_pair(&head, &tail, i) {
                Ok(record) => {
                    // a contract number without digits is past the date too
                    let in_date = record.contract_digits().starts_with(&prefix);
                    match boundary_row {
                        Some(_) if in_date => late_matches += 1,
                        Some(_) => {}
                        None if in_date => records.push(record),
                        None => {
                            debug!(
                                "Page {}: contract {} is past {}, boundary at row {}",
                                context.page, record.contract_no, prefix, i
                            );
                            boundary_row = Some(i);
                        }
                    }
                }
                Err(e) if boundary_row.is_none() => {
                    warn!("Page {}: {}", context.page, e);
                    skipped.push(e);
                }
                Err(_) => {}
            }

            i += 2;
        }

        let verdict = if boundary_row.is_some() {
            CrawlVerdict::DateBoundary(records)
        } else if records.is_empty() {
            CrawlVerdict::EmptyPage
        } else {
            CrawlVerdict::Continue(records)
        };

        Ok(PageExtraction {
            verdict,
            table_found: true,
            skipped,
            late_matches,
        })
    }
}

/// Rows belonging to this table, not to tables nested in its cells
fn own_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|e| e.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "td")
        .collect()
}

/// Cell text with every text node trimmed (including `&nbsp;`) and joined
/// without a separator, so markup splits never add spaces to a value
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().map(str::trim).collect()
}

/// A head row starts with a decimal sequence number
fn is_record_head(cells: &[ElementRef<'_>]) -> bool {
    cells.first().is_some_and(|first| {
        let text = cell_text(*first);
        !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
    })
}
