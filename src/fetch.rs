//! Downloading remote documents.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use crate::encoding::transcode_to_utf8;
use crate::error::{Error, Result};
use crate::settings::USER_AGENT;

/// Fetches a URL and returns its decoded body, or `None` when nothing usable
/// came back.
pub trait Fetcher: Send + Sync {
    fn fetch_url(&self, url: &str) -> Option<String>;
}

/// Blocking HTTP client.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_url(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send() {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(%url, error = %e, "download failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "unexpected HTTP status");
            return None;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        match response.bytes() {
            Ok(body) if !body.is_empty() => Some(transcode_to_utf8(&body, content_type.as_deref())),
            Ok(_) => {
                tracing::debug!(%url, "empty response body");
                None
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "cannot read response body");
                None
            }
        }
    }
}
