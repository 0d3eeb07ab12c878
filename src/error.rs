use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while fetching, extracting and persisting pages
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network or HTTP failure after all retries were used up
    #[error("failed to fetch {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: TransportError,
    },

    /// Neither the selector chain nor the body heuristic found any text
    #[error("no main content found in {url}")]
    ContentNotFound { url: String },

    /// I/O failure while rewriting the links of a Markdown file
    #[error("failed to fix links in {}: {source}", path.display())]
    LinkFixFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reachability probe could not open a TCP connection
    #[error("host {host} is unreachable")]
    Unreachable { host: String },

    /// The response was not in the shape the strategy expects
    #[error("unexpected payload from {url}")]
    UnexpectedPayload { url: String },

    /// WebDriver session failure
    #[error("browser failed on {url}: {message}")]
    Browser { url: String, message: String },

    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl ScrapeError {
    /// Whether the next fetch strategy in the chain should be tried
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, ScrapeError::ContentNotFound { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ScrapeError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure of a single transport attempt
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_not_found_is_terminal() {
        let err = ScrapeError::ContentNotFound {
            url: "https://example.com/a".to_string(),
        };
        assert!(!err.allows_fallback());

        let err = ScrapeError::FetchFailed {
            url: "https://example.com/a".to_string(),
            source: TransportError::Status(503),
        };
        assert!(err.allows_fallback());
        assert_eq!(
            err.to_string(),
            "failed to fetch https://example.com/a: unexpected status 503"
        );
    }
}
