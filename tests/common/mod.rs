//! Shared fixtures: scripted page source and listing markup builders
#![allow(dead_code)]

use async_trait::async_trait;
use s2b_harvest_lib::application::{CrawlOrchestrator, CrawlSettings, FixedSession, SessionPolicy};
use s2b_harvest_lib::domain::{Checkpoint, TargetDate};
use s2b_harvest_lib::infrastructure::config::OutputLayout;
use s2b_harvest_lib::infrastructure::{CheckpointStore, FetchError, PageSource, RawPage};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

pub fn date(s: &str) -> TargetDate {
    s.parse().unwrap()
}

pub fn checkpoint(d: &str, page: u32) -> Checkpoint {
    Checkpoint::new(date(d), page).unwrap()
}

/// One record pair; `contract` decides which day the record belongs to
pub fn pair(no: u32, contract: &str) -> String {
    format!(
        "<tr><td>{no}</td><td>물품</td><td>{contract}</td><td>계약 {no}</td><td>1,000</td><td>업체{no}</td></tr>\
         <tr><td></td><td>기관{no}</td><td></td><td>2025-06-01</td></tr>"
    )
}

/// Listing page with the data table nested in a layout table
pub fn listing(pairs: &[String]) -> String {
    format!(
        "<html><body><table>\
         <tr><td>menu</td></tr><tr><td>search</td></tr>\
         <tr><td><table class=\"list\">\
         <tr><th>No</th><th>계약구분</th><th>계약번호</th><th>계약명</th><th>금액</th><th>계약대상자</th></tr>\
         <tr><th></th><th>기관명</th><th></th><th>계약일</th></tr>\
         {}</table></td></tr></table></body></html>",
        pairs.concat()
    )
}

pub fn ok(body: String) -> Result<RawPage, FetchError> {
    Ok(RawPage { status: 200, body })
}

pub fn http_error(status: u16, page: u32) -> Result<RawPage, FetchError> {
    Err(FetchError::HttpStatus { status, page })
}

/// Replays canned responses in order and records every request
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<RawPage, FetchError>>>,
    requests: Mutex<Vec<(TargetDate, u32)>>,
    rotations: u32,
}

impl ScriptedSource {
    pub fn new(responses: Vec<Result<RawPage, FetchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<(TargetDate, u32)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.requests().into_iter().map(|(_, page)| page).collect()
    }

    pub const fn rotations(&self) -> u32 {
        self.rotations
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch(&self, target_date: TargetDate, page: u32) -> Result<RawPage, FetchError> {
        self.requests.lock().unwrap().push((target_date, page));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request for page {page}"))
    }

    async fn rotate_session(&mut self) -> Result<(), FetchError> {
        self.rotations += 1;
        Ok(())
    }
}

/// Temp workspace with a checkpoint file and an output directory
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.dir.path().join("sell_goods_param.txt")
    }

    pub fn store(&self) -> CheckpointStore {
        CheckpointStore::new(self.checkpoint_path())
    }

    pub fn seed(&self, d: &str, page: u32) {
        self.store().save(&checkpoint(d, page)).unwrap();
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn result_file(&self, d: &str) -> PathBuf {
        self.output_dir().join(format!("s2b_result_{d}.csv"))
    }

    pub fn settings(&self) -> CrawlSettings {
        CrawlSettings {
            output_dir: self.output_dir(),
            layout: OutputLayout::PerDate,
            dedupe: true,
            max_pages_per_run: 0,
            debug_dump_dir: None,
        }
    }

    pub fn orchestrator(&self, source: ScriptedSource) -> CrawlOrchestrator<ScriptedSource, FixedSession> {
        self.orchestrator_with(source, FixedSession, self.settings())
    }

    pub fn orchestrator_with<P: SessionPolicy>(
        &self,
        source: ScriptedSource,
        policy: P,
        settings: CrawlSettings,
    ) -> CrawlOrchestrator<ScriptedSource, P> {
        CrawlOrchestrator::new(source, policy, self.store(), settings).unwrap()
    }
}
