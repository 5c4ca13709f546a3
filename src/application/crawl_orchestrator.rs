//! Checkpointed crawl of one target date
//!
//! One invocation runs `LOAD_CHECKPOINT -> (FETCH -> EXTRACT -> ACCUMULATE ->
//! ADVANCE)* -> terminal` and returns a [`RunOutcome`]. Collection across days
//! happens by invoking the process again; the checkpoint file is the only
//! continuity between runs.
//!
//! Checkpoint writes within a run are monotonic: the cursor is only ever
//! moved to the next page, rolled to the next day, or rewritten unchanged.

#![allow(clippy::uninlined_format_args)]

use super::crawl_error::{CrawlError, CrawlResult};
use super::session_policy::{SessionAction, SessionPolicy};
use crate::domain::{Checkpoint, CrawlVerdict, RunOutcome, TargetDate};
use crate::infrastructure::checkpoint_store::CheckpointStore;
use crate::infrastructure::config::{AppConfig, OutputLayout};
use crate::infrastructure::http_client::{FetchError, PageSource, RawPage};
use crate::infrastructure::parsing::{ContractTableParser, ParseContext};
use crate::infrastructure::result_sink::{ResultAccumulator, result_file_name};
use chrono::{FixedOffset, Utc};
use std::path::PathBuf;
use tokio::time::sleep;
use tracing::{Instrument, error, info, info_span, warn};

/// Per-run knobs taken from configuration
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub output_dir: PathBuf,
    pub layout: OutputLayout,
    pub dedupe: bool,
    /// 0 = unlimited
    pub max_pages_per_run: u32,
    pub debug_dump_dir: Option<PathBuf>,
}

impl CrawlSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            output_dir: config.output.dir.clone(),
            layout: config.output.layout,
            dedupe: config.output.dedupe,
            max_pages_per_run: config.crawl.max_pages_per_run,
            debug_dump_dir: config.output.debug_dump_dir.clone(),
        }
    }

    const fn page_limit_reached(&self, pages_fetched: u32) -> bool {
        self.max_pages_per_run > 0 && pages_fetched >= self.max_pages_per_run
    }
}

/// Calendar date at the given UTC offset
#[must_use]
pub fn current_date(offset_hours: i32) -> Option<TargetDate> {
    let offset = FixedOffset::east_opt(offset_hours.checked_mul(3600)?)?;
    Some(TargetDate::from_naive(Utc::now().with_timezone(&offset).date_naive()))
}

/// Verdict for one fetched page, plus the markup when no data table was found
#[derive(Debug)]
struct PageJudgement {
    verdict: CrawlVerdict,
    tableless_body: Option<String>,
}

/// Turn a fetch result into the verdict driving the next transition
fn judge_page(
    parser: &ContractTableParser,
    fetched: Result<RawPage, FetchError>,
    date: TargetDate,
    page: u32,
) -> PageJudgement {
    let raw = match fetched {
        Ok(raw) => raw,
        Err(e) => {
            return PageJudgement {
                verdict: CrawlVerdict::TransientError(e.to_string()),
                tableless_body: None,
            };
        }
    };

    let extraction = parser.extract(&raw.body, &ParseContext::new(date, page));
    if !extraction.skipped.is_empty() {
        warn!("⚠️ Page {}: {} record pair(s) skipped", page, extraction.skipped.len());
    }
    if extraction.late_matches > 0 {
        warn!(
            "⚠️ Page {}: {} record(s) of {} appear after the date boundary and were not saved; rows may be out of order",
            page, extraction.late_matches, date
        );
    }

    PageJudgement {
        tableless_body: (!extraction.table_found).then_some(raw.body),
        verdict: extraction.verdict,
    }
}

/// Counters and cursor of the run in progress
#[derive(Debug)]
struct RunProgress {
    cursor: Checkpoint,
    persisted: Checkpoint,
    pages_fetched: u32,
    successful_pages: u32,
    records_saved: usize,
}

impl RunProgress {
    const fn new(start: Checkpoint) -> Self {
        Self {
            cursor: start,
            persisted: start,
            pages_fetched: 0,
            successful_pages: 0,
            records_saved: 0,
        }
    }
}

/// Drives fetch, extraction, accumulation and checkpointing for one run
pub struct CrawlOrchestrator<S, P> {
    source: S,
    policy: P,
    store: CheckpointStore,
    parser: ContractTableParser,
    settings: CrawlSettings,
}

impl<S: PageSource, P: SessionPolicy> CrawlOrchestrator<S, P> {
    pub fn new(source: S, policy: P, store: CheckpointStore, settings: CrawlSettings) -> CrawlResult<Self> {
        Ok(Self {
            source,
            policy,
            store,
            parser: ContractTableParser::new()?,
            settings,
        })
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Run until a terminal verdict; `today` is never harvested
    pub async fn run(&mut self, today: TargetDate) -> CrawlResult<RunOutcome> {
        let start = self.store.load()?;

        if start.target_date() >= today {
            warn!(
                "🛑 {} is not before today ({}); its data may still change, nothing fetched",
                start.target_date(),
                today
            );
            return Ok(RunOutcome::TodayRefused { checkpoint: start });
        }

        let span = info_span!("crawl", target_date = %start.target_date());
        self.crawl_from(start).instrument(span).await
    }

    async fn crawl_from(&mut self, start: Checkpoint) -> CrawlResult<RunOutcome> {
        let date = start.target_date();
        let output = self
            .settings
            .output_dir
            .join(result_file_name(self.settings.layout, date, start.next_page()));

        info!("{}", "=".repeat(60));
        info!("🚀 Crawl start: date {} / page {}", date, start.next_page());
        info!("💾 Output file: {}", output.display());
        info!("{}", "=".repeat(60));

        let mut sink = ResultAccumulator::open(&output, self.settings.dedupe)?;
        let mut run = RunProgress::new(start);

        loop {
            if self.settings.page_limit_reached(run.pages_fetched) {
                info!("⏸️ Page limit of {} reached, resuming at {} next run", self.settings.max_pages_per_run, run.cursor);
                return Ok(RunOutcome::PageLimitReached {
                    pages_fetched: run.pages_fetched,
                    records_saved: run.records_saved,
                    next: run.cursor,
                });
            }

            let page = run.cursor.next_page();
            info!("📄 Requesting page {}", page);
            let fetched = self.source.fetch(date, page).await;
            run.pages_fetched += 1;

            let judged = judge_page(&self.parser, fetched, date, page);

            match judged.verdict {
                CrawlVerdict::Continue(records) => {
                    let added = sink.merge(&records)?;
                    run.records_saved += added;
                    info!("    └ {} records ({} new, {} total)", records.len(), added, sink.len());

                    let next = run.cursor.advance_within_date();
                    self.persist(&mut run, next)?;
                    run.successful_pages += 1;

                    if !self.settings.page_limit_reached(run.pages_fetched) {
                        if let Err(e) = self.apply_session_policy(run.successful_pages).await {
                            return self.halt(&mut run, e.to_string());
                        }
                    }
                }
                CrawlVerdict::DateBoundary(records) => {
                    let added = sink.merge(&records)?;
                    run.records_saved += added;

                    let next = run.cursor.roll_to_next_date()?;
                    self.persist(&mut run, next)?;
                    info!("🏁 Date boundary on page {}: {} complete ({} records), next run starts {}", page, date, sink.len(), next);

                    return Ok(RunOutcome::DateRolled {
                        pages_fetched: run.pages_fetched,
                        records_saved: run.records_saved,
                        next,
                    });
                }
                CrawlVerdict::EmptyPage => {
                    if let Some(body) = &judged.tableless_body {
                        self.dump_page(date, page, body);
                    }
                    info!("❔ Page {} has no data; checkpoint left at {}", page, run.cursor);

                    return Ok(RunOutcome::Exhausted {
                        pages_fetched: run.pages_fetched,
                        records_saved: run.records_saved,
                        checkpoint: run.cursor,
                    });
                }
                CrawlVerdict::TransientError(reason) => return self.halt(&mut run, reason),
            }
        }
    }

    /// Rewrite the current cursor unchanged and stop
    fn halt(&self, run: &mut RunProgress, reason: String) -> CrawlResult<RunOutcome> {
        error!("❌ Page {} failed: {}", run.cursor.next_page(), reason);

        let cursor = run.cursor;
        self.persist(run, cursor)?;
        info!("📍 Checkpoint kept at {}; retry resumes there", cursor);

        Ok(RunOutcome::Halted {
            pages_fetched: run.pages_fetched,
            records_saved: run.records_saved,
            checkpoint: cursor,
            reason,
        })
    }

    fn persist(&self, run: &mut RunProgress, next: Checkpoint) -> CrawlResult<()> {
        if run.persisted.regresses_to(&next) {
            return Err(CrawlError::CheckpointRegression {
                current: run.persisted,
                attempted: next,
            });
        }

        self.store.save(&next)?;
        run.persisted = next;
        run.cursor = next;
        Ok(())
    }

    async fn apply_session_policy(&mut self, successful_pages: u32) -> Result<(), FetchError> {
        match self.policy.after_page(successful_pages) {
            SessionAction::Keep => {}
            SessionAction::Renew { pause } => {
                info!("🔄 Renewing session after {} pages, pausing {:?}", successful_pages, pause);
                self.source.rotate_session().await?;
                sleep(pause).await;
            }
            SessionAction::LongPause { pause } => {
                info!("😴 Long pause of {:?} after {} pages", pause, successful_pages);
                sleep(pause).await;
                self.source.rotate_session().await?;
            }
        }
        Ok(())
    }

    fn dump_page(&self, date: TargetDate, page: u32, body: &str) {
        let Some(dir) = &self.settings.debug_dump_dir else {
            return;
        };

        let path = dir.join(format!("debug_{}_{}.html", date, page));
        let written = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, body));
        match written {
            Ok(()) => info!("🧪 Page without data table saved to {}", path.display()),
            Err(e) => warn!("Could not save debug page {}: {}", path.display(), e),
        }
    }
}
