//! HTTP fetch client for the comic JSON API: one request per document id.

use anyhow::{anyhow, Result};
use comicdex_core::{DocId, Fetch, Fetched, IndexError};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://xkcd.com/";
pub const DEFAULT_USER_AGENT: &str = "comicdex/0.1 (+https://github.com/comicdex/comicdex)";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Pause before every request after the first.
    pub delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(12),
            delay: Duration::ZERO,
        }
    }
}

pub struct HttpFetcher {
    client: Client,
    base: Url,
    delay: Duration,
    started: std::cell::Cell<bool>,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let base = parse_base(&config.base_url)?;
        let client = Client::builder()
            .user_agent(config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, base, delay: config.delay, started: std::cell::Cell::new(false) })
    }

    /// `<base>/<id>/info.0.json`
    pub fn info_url(&self, id: DocId) -> Result<Url> {
        Ok(self.base.join(&format!("{id}/info.0.json"))?)
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, id: DocId) -> comicdex_core::Result<Fetched> {
        if self.started.replace(true) && !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let url = self.info_url(id).map_err(|e| transport(id, e))?;
        tracing::debug!(id, %url, "fetching");
        let resp = self.client.get(url).send().map_err(|e| transport(id, e))?;
        match classify(resp.status()) {
            Outcome::Found => {
                let bytes = resp.bytes().map_err(|e| transport(id, e))?;
                Ok(Fetched::Payload(bytes.to_vec()))
            }
            Outcome::NotFound => Ok(Fetched::NotFound),
            Outcome::Failed => Err(transport(id, anyhow!("unexpected status {}", resp.status()))),
        }
    }

    fn base_url(&self) -> &str {
        self.base.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Found,
    NotFound,
    Failed,
}

fn classify(status: StatusCode) -> Outcome {
    match status {
        StatusCode::OK => Outcome::Found,
        StatusCode::NOT_FOUND => Outcome::NotFound,
        _ => Outcome::Failed,
    }
}

// Url::join drops the last path segment unless the base ends with '/'.
fn parse_base(base: &str) -> Result<Url> {
    let mut s = base.trim().to_string();
    if !s.contains("://") {
        s.insert_str(0, "https://");
    }
    if !s.ends_with('/') {
        s.push('/');
    }
    let url = Url::parse(&s)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!("base url must be http(s): {base}"));
    }
    Ok(url)
}

fn transport(id: DocId, err: impl std::fmt::Display) -> IndexError {
    IndexError::Transport { id, message: err.to_string() }
}
