//! Outbound HTTP for sources.
//!
//! A shared [`HttpFetcher`] wraps one `reqwest::Client` and sends the
//! browser-like headers supermarket sites expect. Every request carries its
//! own timeout. Failures are classified into [`FetchError`] so sources can
//! log them precisely before degrading to an empty result.

use std::time::Duration;

use anyhow::Result;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use thiserror::Error;

use cesta_core::extract::looks_like_html;

use crate::config::{HttpConfig, TermEncoding};

const ACCEPT_JSON: &str = "application/json, text/plain, */*";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} returned an HTML page where JSON was expected")]
    NotJson { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    fn from_send(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source: err,
            }
        }
    }

    fn from_body(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else {
            FetchError::Body {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// Encode a search term for substitution into a URL template.
///
/// The term is trimmed and inner whitespace collapsed first.
pub fn encode_term(term: &str, encoding: TermEncoding) -> String {
    let words = term.split_whitespace().collect::<Vec<_>>().join(" ");
    let plus: String = url::form_urlencoded::byte_serialize(words.as_bytes()).collect();
    match encoding {
        TermEncoding::Plus => plus,
        // byte_serialize escapes a literal '+' as %2B, so any '+' left is a space
        TermEncoding::Percent => plus.replace('+', "%20"),
    }
}

/// Shared HTTP client with browser-like defaults.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
    accept_language: String,
    default_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder().gzip(true).brotli(true).build()?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
            default_timeout: config.timeout(),
        })
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// GET a JSON endpoint and return its body text.
    ///
    /// Bodies that look like HTML are rejected with [`FetchError::NotJson`].
    pub async fn get_json_text(
        &self,
        url: &str,
        headers: &[(&str, String)],
        timeout: Duration,
    ) -> Result<String, FetchError> {
        let body = self.get(url, ACCEPT_JSON, headers, timeout).await?;
        if looks_like_html(&body) {
            return Err(FetchError::NotJson { url: url.to_string() });
        }
        Ok(body)
    }

    /// GET an HTML page and return its body text.
    pub async fn get_html(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        self.get(url, ACCEPT_HTML, &[], timeout).await
    }

    async fn get(
        &self,
        url: &str,
        accept: &str,
        headers: &[(&str, String)],
        timeout: Duration,
    ) -> Result<String, FetchError> {
        let mut request = self
            .client
            .get(url)
            .timeout(timeout)
            .header(USER_AGENT, self.user_agent.as_str())
            .header(ACCEPT, accept)
            .header(ACCEPT_LANGUAGE, self.accept_language.as_str());
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|err| FetchError::from_send(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|err| FetchError::from_body(url, err))
    }
}
