//! Configuration infrastructure
//!
//! Layered settings for the S2B harvester, resolved in this order:
//! 1. `config/default.toml` next to the working directory (optional)
//! 2. An explicit `--config` file (required when given)
//! 3. Environment variables, e.g. `S2B_HARVEST_CRAWL__MAX_PAGES_PER_RUN=5`
//!
//! Every section has defaults, so an empty configuration is valid.

#![allow(clippy::uninlined_format_args)]

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fetch: FetchConfig,
    pub crawl: CrawlConfig,
    pub session: SessionConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Inclusive millisecond range a random delay is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    #[must_use]
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.max_ms == 0
    }

    /// Draw a uniformly distributed delay from the range
    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(fastrand::u64(self.min_ms..=self.max_ms))
    }
}

/// Page fetcher settings: endpoint, form fields, headers, pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub endpoint_url: String,
    pub referer: String,
    pub origin: String,

    /// `forwardName` form field selecting the contract list view
    pub forward_name: String,
    pub process_yn: String,
    pub search_yn: String,
    pub excel_section: String,

    /// Character encoding the endpoint serves; always applied, never sniffed
    pub charset: String,

    pub timeout_seconds: u64,

    /// The endpoint's certificate is not validated (explicit trust decision)
    pub accept_invalid_certs: bool,

    /// Delay before every request
    pub pacing: DelayRange,

    /// One of these is picked per request
    pub user_agents: Vec<String>,
    pub accept: String,
}

/// Crawl orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// `search_day=` / `page=` checkpoint file
    pub checkpoint_path: PathBuf,

    /// Stop after this many pages in one run (0 = unlimited)
    pub max_pages_per_run: u32,

    /// Offset from UTC used to decide what "today" is
    pub timezone_offset_hours: i32,
}

/// Session rotation / load-shedding heuristics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub enabled: bool,

    /// Rotate the cookie session every N successful pages
    pub renew_every: u32,
    pub renew_pause: DelayRange,

    /// Take a long pause (and rotate) every M successful pages, M > N
    pub long_pause_every: u32,
    pub long_pause: DelayRange,

    /// GET the endpoint once after each rotation to pick up cookies
    pub prime_on_rotate: bool,
}

/// Where output files go and how they are named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// `s2b_result_{date}.csv`
    PerDate,
    /// `s2b_result_{date}_{start_page}.csv`, combined later by `merge`
    PerRun,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub layout: OutputLayout,

    /// Skip records identical to one already persisted
    pub dedupe: bool,

    /// Raw markup of pages without a data table is saved here when set
    pub debug_dump_dir: Option<PathBuf>,

    /// Default target directory of the `merge` command
    pub merged_dir: PathBuf,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,
    pub console_output: bool,
    pub file_output: bool,
    pub log_dir: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint_url: s2b::CONTRACT_LIST_URL.to_string(),
            referer: s2b::CONTRACT_LIST_URL.to_string(),
            origin: s2b::ORIGIN.to_string(),
            forward_name: s2b::form::FORWARD_NAME_CONTRACT_LIST.to_string(),
            process_yn: "Y".to_string(),
            search_yn: "Y".to_string(),
            excel_section: "N".to_string(),
            charset: defaults::CHARSET.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            accept_invalid_certs: true,
            pacing: defaults::PACING,
            user_agents: defaults::USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            accept: defaults::ACCEPT.to_string(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: PathBuf::from(defaults::CHECKPOINT_FILE),
            max_pages_per_run: 0,
            timezone_offset_hours: defaults::TIMEZONE_OFFSET_HOURS,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            renew_every: defaults::RENEW_INTERVAL,
            renew_pause: defaults::RENEW_PAUSE,
            long_pause_every: defaults::LONG_PAUSE_INTERVAL,
            long_pause: defaults::LONG_PAUSE,
            prime_on_rotate: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            layout: OutputLayout::PerDate,
            dedupe: true,
            debug_dump_dir: None,
            merged_dir: PathBuf::from(defaults::MERGED_DIR),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            console_output: true,
            file_output: true,
            log_dir: PathBuf::from(defaults::LOG_DIR),
        }
    }
}

impl AppConfig {
    /// Load layered configuration; `path` is an explicit file that must exist
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(defaults::CONFIG_FILE_STEM).required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 설정값 유효성 검증
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Validation { message });

        for (name, range) in [
            ("fetch.pacing", &self.fetch.pacing),
            ("session.renew_pause", &self.session.renew_pause),
            ("session.long_pause", &self.session.long_pause),
        ] {
            if range.min_ms > range.max_ms {
                return invalid(format!("{} min_ms cannot be greater than max_ms", name));
            }
        }

        if self.fetch.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return invalid("fetch.user_agents must contain at least one entry".to_string());
        }

        if encoding_rs::Encoding::for_label(self.fetch.charset.as_bytes()).is_none() {
            return invalid(format!("fetch.charset '{}' is not a known encoding", self.fetch.charset));
        }

        if url::Url::parse(&self.fetch.endpoint_url).is_err() {
            return invalid(format!("fetch.endpoint_url '{}' is not a valid URL", self.fetch.endpoint_url));
        }

        if self.fetch.timeout_seconds == 0 {
            return invalid("fetch.timeout_seconds must be greater than 0".to_string());
        }

        if self.session.enabled {
            if self.session.renew_every == 0 {
                return invalid("session.renew_every must be greater than 0".to_string());
            }
            if self.session.long_pause_every <= self.session.renew_every {
                return invalid("session.long_pause_every must be greater than session.renew_every".to_string());
            }
        }

        if !(-12..=14).contains(&self.crawl.timezone_offset_hours) {
            return invalid(format!(
                "crawl.timezone_offset_hours {} is out of range",
                self.crawl.timezone_offset_hours
            ));
        }

        if !self.logging.console_output && !self.logging.file_output {
            return invalid("No logging output configured".to_string());
        }

        Ok(())
    }
}

/// S2B endpoint constants
pub mod s2b {
    /// Scheme + host used as the `Origin` header
    pub const ORIGIN: &str = "https://www.s2b.kr";

    /// Contract list search endpoint (POST, form-encoded, EUC-KR responses)
    pub const CONTRACT_LIST_URL: &str = "https://www.s2b.kr/S2BNCustomer/tcmo001.do";

    /// Form field names of the contract list query
    pub mod form {
        pub const FORWARD_NAME: &str = "forwardName";
        pub const PAGE_NO: &str = "pageNo";
        pub const DATE_START: &str = "tender_date_start";
        pub const DATE_END: &str = "tender_date_end";
        pub const PROCESS_YN: &str = "process_yn";
        pub const SEARCH_YN: &str = "search_yn";
        pub const EXCEL_SECTION: &str = "excelSection";

        /// `forwardName` value of the contract list view
        pub const FORWARD_NAME_CONTRACT_LIST: &str = "list03";
    }

    /// Text markers identifying the contract data table
    pub mod markers {
        /// 계약명 (contract name)
        pub const CONTRACT_NAME: &str = "계약명";
        /// 계약번호 (contract number)
        pub const CONTRACT_NUMBER: &str = "계약번호";
    }
}

/// Default configuration values
pub mod defaults {
    use super::DelayRange;

    pub const CONFIG_FILE_STEM: &str = "config/default";
    pub const ENV_PREFIX: &str = "S2B_HARVEST";

    pub const CHARSET: &str = "euc-kr";
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// 10-20 s before every request
    pub const PACING: DelayRange = DelayRange::new(10_000, 20_000);

    pub const RENEW_INTERVAL: u32 = 2;
    pub const RENEW_PAUSE: DelayRange = DelayRange::new(5_000, 8_000);
    pub const LONG_PAUSE_INTERVAL: u32 = 10;
    pub const LONG_PAUSE: DelayRange = DelayRange::new(60_000, 90_000);

    pub const CHECKPOINT_FILE: &str = "sell_goods_param.txt";
    pub const MERGED_DIR: &str = "combined";
    pub const LOG_DIR: &str = "logs";
    pub const LOG_LEVEL: &str = "info";

    /// Korea Standard Time
    pub const TIMEZONE_OFFSET_HOURS: i32 = 9;

    pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";

    pub const USER_AGENTS: &[&str] = &[
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/120.0.0.0 Safari/537.36",
    ];
}
