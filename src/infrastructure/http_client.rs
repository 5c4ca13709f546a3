//! HTTP page fetcher for the S2B contract list
//!
//! One paginated form POST per call, with a randomized pacing delay before
//! each request and a user agent picked per request. Responses are decoded
//! with the configured charset (EUC-KR) regardless of what the server
//! declares. Retrying is the orchestrator's decision, never done here.

#![allow(clippy::uninlined_format_args)]

use crate::domain::TargetDate;
use crate::infrastructure::config::{FetchConfig, s2b::form};
use async_trait::async_trait;
use encoding_rs::Encoding;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Raw markup of one listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    pub status: u16,
    pub body: String,
}

/// Every variant is transient from the crawl's point of view
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error {status} for page {page}")]
    HttpStatus { status: u16, page: u32 },

    #[error("HTTP request failed for page {page}: {source}")]
    Transport {
        page: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid header value for {header}")]
    InvalidHeader { header: &'static str },

    #[error("Unknown response charset '{0}'")]
    UnknownCharset(String),

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Source of listing pages; the orchestrator only talks to this seam
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page of the given day
    async fn fetch(&self, target_date: TargetDate, page: u32) -> Result<RawPage, FetchError>;

    /// Drop the current cookie session and start a fresh one
    async fn rotate_session(&mut self) -> Result<(), FetchError>;
}

/// reqwest-backed fetcher with a cookie-holding session
pub struct S2bHttpClient {
    client: Client,
    config: FetchConfig,
    encoding: &'static Encoding,
    prime_on_rotate: bool,
    session_generation: u32,
}

impl S2bHttpClient {
    /// Create a fetcher with a fresh session
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let encoding = Encoding::for_label(config.charset.as_bytes())
            .ok_or_else(|| FetchError::UnknownCharset(config.charset.clone()))?;

        if config.accept_invalid_certs {
            warn!("🔓 TLS certificate verification is disabled for {}", config.endpoint_url);
        }

        let client = Self::build_client(&config)?;

        Ok(Self {
            client,
            config,
            encoding,
            prime_on_rotate: false,
            session_generation: 1,
        })
    }

    /// GET the endpoint once after every rotation to obtain session cookies
    #[must_use]
    pub const fn with_session_priming(mut self, enabled: bool) -> Self {
        self.prime_on_rotate = enabled;
        self
    }

    fn build_client(config: &FetchConfig) -> Result<Client, FetchError> {
        ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .cookie_store(true)
            .gzip(true)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(FetchError::Client)
    }

    /// Form body of the contract list query, date range collapsed to one day
    #[must_use]
    pub fn form_fields(&self, target_date: TargetDate, page: u32) -> Vec<(&'static str, String)> {
        let day = target_date.compact();
        vec![
            (form::FORWARD_NAME, self.config.forward_name.clone()),
            (form::PAGE_NO, page.to_string()),
            (form::DATE_START, day.clone()),
            (form::DATE_END, day),
            (form::PROCESS_YN, self.config.process_yn.clone()),
            (form::SEARCH_YN, self.config.search_yn.clone()),
            (form::EXCEL_SECTION, self.config.excel_section.clone()),
        ]
    }

    /// Browser-like headers with a user agent drawn from the pool
    pub fn request_headers(&self) -> Result<HeaderMap, FetchError> {
        let pool: Vec<&String> = self
            .config
            .user_agents
            .iter()
            .filter(|ua| !ua.trim().is_empty())
            .collect();
        let user_agent = fastrand::choice(pool).map_or("", |ua| ua.as_str());

        let value = |header: &'static str, v: &str| {
            HeaderValue::from_str(v).map_err(|_| FetchError::InvalidHeader { header })
        };

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, value("User-Agent", user_agent)?);
        headers.insert(REFERER, value("Referer", &self.config.referer)?);
        headers.insert(ORIGIN, value("Origin", &self.config.origin)?);
        headers.insert(ACCEPT, value("Accept", &self.config.accept)?);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        Ok(headers)
    }

    /// Decode a response body with the configured charset
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, _, had_errors) = self.encoding.decode(bytes);
        if had_errors {
            warn!("Response contained bytes invalid in {}", self.encoding.name());
        }
        text.into_owned()
    }

    /// Number of sessions used so far (1 = the initial one)
    #[must_use]
    pub const fn session_generation(&self) -> u32 {
        self.session_generation
    }

    /// GET the endpoint to pick up session cookies; failures are only logged
    pub async fn prime_session(&self) {
        let headers = match self.request_headers() {
            Ok(headers) => headers,
            Err(e) => {
                warn!("Session priming skipped: {}", e);
                return;
            }
        };

        match self.client.get(&self.config.endpoint_url).headers(headers).send().await {
            Ok(response) => debug!("🍪 Session primed (status {})", response.status()),
            Err(e) => warn!("Session priming failed: {}", e),
        }
    }
}

#[async_trait]
impl PageSource for S2bHttpClient {
    async fn fetch(&self, target_date: TargetDate, page: u32) -> Result<RawPage, FetchError> {
        let delay = self.config.pacing.sample();
        if !delay.is_zero() {
            debug!("⏳ Pacing {:?} before page {}", delay, page);
            sleep(delay).await;
        }

        let headers = self.request_headers()?;
        let fields = self.form_fields(target_date, page);

        info!("🌐 HTTP POST {} (date {}, page {})", self.config.endpoint_url, target_date, page);
        let response = self
            .client
            .post(&self.config.endpoint_url)
            .headers(headers)
            .form(&fields)
            .send()
            .await
            .map_err(|source| FetchError::Transport { page, source })?;

        let status = response.status();
        if status != StatusCode::OK {
            error!("❌ HTTP error {} for page {}", status, page);
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                page,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport { page, source })?;
        let body = self.decode(&bytes);

        debug!("Fetched page {} ({} bytes)", page, bytes.len());
        Ok(RawPage {
            status: status.as_u16(),
            body,
        })
    }

    async fn rotate_session(&mut self) -> Result<(), FetchError> {
        self.client = Self::build_client(&self.config)?;
        self.session_generation += 1;
        info!("🔄 New HTTP session #{}", self.session_generation);

        if self.prime_on_rotate {
            self.prime_session().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::DelayRange;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn date(s: &str) -> TargetDate {
        s.parse().unwrap()
    }

    fn test_config(endpoint_url: String) -> FetchConfig {
        FetchConfig {
            endpoint_url,
            pacing: DelayRange::zero(),
            ..FetchConfig::default()
        }
    }

    /// Serves one canned response and hands back the raw request text
    async fn one_shot_server(response: Vec<u8>) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0_u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || String::from_utf8_lossy(&request).contains("excelSection=") {
                    break;
                }
            }
            socket.write_all(&response).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
        });

        (format!("http://{}/S2BNCustomer/tcmo001.do", addr), rx)
    }

    fn http_response(status_line: &str, body: &[u8]) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status_line,
            body.len()
        )
        .into_bytes();
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn form_collapses_date_range_to_one_day() {
        let client = S2bHttpClient::new(FetchConfig::default()).unwrap();
        let fields = client.form_fields(date("20250601"), 3);

        assert!(fields.contains(&("forwardName", "list03".to_string())));
        assert!(fields.contains(&("pageNo", "3".to_string())));
        assert!(fields.contains(&("tender_date_start", "20250601".to_string())));
        assert!(fields.contains(&("tender_date_end", "20250601".to_string())));
        assert!(fields.contains(&("process_yn", "Y".to_string())));
        assert!(fields.contains(&("search_yn", "Y".to_string())));
        assert!(fields.contains(&("excelSection", "N".to_string())));
    }

    #[test]
    fn user_agent_comes_from_pool() {
        let client = S2bHttpClient::new(FetchConfig::default()).unwrap();
        let pool = FetchConfig::default().user_agents;
        for _ in 0..20 {
            let headers = client.request_headers().unwrap();
            let ua = headers.get(USER_AGENT).unwrap().to_str().unwrap();
            assert!(pool.iter().any(|p| p == ua));
        }
    }

    #[test]
    fn decodes_euc_kr_bodies() {
        let client = S2bHttpClient::new(FetchConfig::default()).unwrap();
        let (bytes, _, _) = encoding_rs::EUC_KR.encode("<td>계약명</td>");
        assert_eq!(client.decode(&bytes), "<td>계약명</td>");
    }

    #[test]
    fn unknown_charset_is_rejected() {
        let config = FetchConfig {
            charset: "not-a-charset".to_string(),
            ..FetchConfig::default()
        };
        assert!(matches!(S2bHttpClient::new(config), Err(FetchError::UnknownCharset(_))));
    }

    #[tokio::test]
    async fn posts_form_and_decodes_declared_charset() {
        let (body, _, _) = encoding_rs::EUC_KR.encode("<table><tr><td>계약번호</td></tr></table>");
        let (url, request_rx) = one_shot_server(http_response("200 OK", &body)).await;

        let client = S2bHttpClient::new(test_config(url)).unwrap();
        let page = client.fetch(date("20250601"), 2).await.unwrap();

        assert_eq!(page.status, 200);
        assert!(page.body.contains("계약번호"));

        let request = request_rx.await.unwrap();
        assert!(request.starts_with("POST /S2BNCustomer/tcmo001.do"));
        assert!(request.contains("pageNo=2"));
        assert!(request.contains("tender_date_start=20250601"));
        assert!(request.to_ascii_lowercase().contains("content-type: application/x-www-form-urlencoded"));
    }

    #[tokio::test]
    async fn non_200_status_is_an_error() {
        let (url, _rx) = one_shot_server(http_response("500 Internal Server Error", b"")).await;

        let client = S2bHttpClient::new(test_config(url)).unwrap();
        let result = client.fetch(date("20250601"), 1).await;

        assert!(matches!(result, Err(FetchError::HttpStatus { status: 500, page: 1 })));
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = S2bHttpClient::new(test_config(format!("http://{}/", addr))).unwrap();
        let result = client.fetch(date("20250601"), 1).await;

        assert!(matches!(result, Err(FetchError::Transport { page: 1, .. })));
    }

    #[tokio::test]
    async fn rotation_bumps_session_generation() {
        let mut client = S2bHttpClient::new(FetchConfig::default()).unwrap();
        assert_eq!(client.session_generation(), 1);
        client.rotate_session().await.unwrap();
        assert_eq!(client.session_generation(), 2);
    }
}
