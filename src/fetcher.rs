use crate::config::RetryConfig;
use crate::error::{Result, ScrapeError, TransportError};
use crate::results::Page;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use url::Url;

/// Desktop Chrome on Windows
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";

/// Ports tried by the reachability probe, in order
pub const PROBE_PORTS: [u16; 2] = [443, 80];

pub type Headers = Vec<(&'static str, String)>;

/// Request header sets sent with a GET
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProfile {
    /// Top-level document navigation
    Document,
    /// Server-component stream request, answered with the serialized page
    ComponentStream,
}

impl HeaderProfile {
    pub fn headers(&self, url: &Url) -> Headers {
        let referer = url
            .join(".")
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());

        let mut headers = vec![
            ("User-Agent", USER_AGENT.to_string()),
            ("Accept-Language", "ja,en-US;q=0.9,en;q=0.8".to_string()),
            ("Cache-Control", "no-cache".to_string()),
            ("Pragma", "no-cache".to_string()),
            ("Referer", referer),
        ];

        match self {
            HeaderProfile::Document => headers.extend([
                (
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
                        .to_string(),
                ),
                ("Sec-Fetch-Dest", "document".to_string()),
                ("Sec-Fetch-Mode", "navigate".to_string()),
                ("Sec-Fetch-Site", "same-origin".to_string()),
                ("Upgrade-Insecure-Requests", "1".to_string()),
            ]),
            HeaderProfile::ComponentStream => headers.extend([
                ("Accept", "*/*".to_string()),
                ("rsc", "1".to_string()),
                ("next-router-prefetch", "1".to_string()),
                ("Sec-Fetch-Dest", "empty".to_string()),
                ("Sec-Fetch-Mode", "cors".to_string()),
                ("Sec-Fetch-Site", "same-origin".to_string()),
            ]),
        }
        headers
    }
}

/// A single GET attempt, without retries
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url, headers: &Headers) -> Result<String, TransportError>;
}

/// HTTP transport backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with a per-request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScrapeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url, headers: &Headers) -> Result<String, TransportError> {
        let mut request = self.client.get(url.as_str());
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

/// GET with exponential backoff and jitter
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    retry: RetryConfig,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, retry: RetryConfig) -> Self {
        Self { transport, retry }
    }

    /// Fetcher over a real HTTP client
    pub fn from_config(retry: &RetryConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(retry.request_timeout())?;
        Ok(Self::new(Arc::new(transport), retry.clone()))
    }

    pub async fn fetch(&self, url: &Url) -> Result<Page> {
        self.fetch_with(url, HeaderProfile::Document).await
    }

    /// Fetch a URL, retrying up to `max_retries` times after the first attempt
    ///
    /// Any transport error or non-2xx status counts as a failed attempt. The
    /// last attempt's error is reported in `FetchFailed`.
    pub async fn fetch_with(&self, url: &Url, profile: HeaderProfile) -> Result<Page> {
        let headers = profile.headers(url);
        let attempts = self.retry.max_retries.saturating_add(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = backoff_delay(&self.retry, attempt);
                ::log::info!(
                    "Retrying {} in {:.2}s (retry {}/{})",
                    url,
                    delay.as_secs_f64(),
                    attempt,
                    self.retry.max_retries
                );
                tokio::time::sleep(delay).await;
            }

            match self.transport.get(url, &headers).await {
                Ok(body) => {
                    ::log::debug!("Fetched {} ({} bytes)", url, body.len());
                    return Ok(Page::new(url.clone(), body));
                }
                Err(e) => {
                    ::log::warn!("Attempt {} for {} failed: {}", attempt + 1, url, e);
                    last_error = Some(e);
                }
            }
        }

        ::log::error!("Giving up on {} after {} attempts", url, attempts);
        Err(ScrapeError::FetchFailed {
            url: url.to_string(),
            source: last_error.unwrap_or_else(|| TransportError::Other("no attempt made".into())),
        })
    }
}

/// Delay before retry `attempt` (1-based)
///
/// `base * 2^(attempt - 1)` plus a uniform jitter in `[0, jitter_bound]`.
pub fn backoff_delay(retry: &RetryConfig, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    let jitter = match retry.jitter_ms {
        0 => 0,
        bound => rand::random::<u64>() % (bound + 1),
    };
    retry.base_delay().saturating_mul(factor) + Duration::from_millis(jitter)
}

/// Whether a TCP connection to `host` succeeds on any of `ports`
pub async fn is_reachable(host: &str, ports: &[u16], timeout: Duration) -> bool {
    for port in ports {
        match tokio::time::timeout(timeout, TcpStream::connect((host, *port))).await {
            Ok(Ok(_)) => {
                ::log::debug!("{}:{} is reachable", host, port);
                return true;
            }
            Ok(Err(e)) => ::log::debug!("Probe of {}:{} failed: {}", host, port, e),
            Err(_) => ::log::debug!("Probe of {}:{} timed out", host, port),
        }
    }
    false
}

/// Probe the host of a URL before crawling it
///
/// An explicit port in the URL is tried before the standard ones.
pub async fn probe(url: &Url, timeout: Duration) -> Result<()> {
    let host = url.host_str().ok_or_else(|| ScrapeError::Unreachable {
        host: url.to_string(),
    })?;

    let mut ports: Vec<u16> = url.port().into_iter().collect();
    ports.extend(PROBE_PORTS.iter().filter(|p| Some(**p) != url.port()));

    if is_reachable(host, &ports, timeout).await {
        Ok(())
    } else {
        ::log::error!("Could not reach {} on ports {:?}", host, ports);
        Err(ScrapeError::Unreachable {
            host: host.to_string(),
        })
    }
}
