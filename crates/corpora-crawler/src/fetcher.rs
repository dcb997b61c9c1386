use std::io::prelude::*;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE};

use crate::config::CrawlerConfig;
use crate::error::{FetchError, TransportError};

/// A single GET of a page, decoded to text.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &CrawlerConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        if !config.cookies.is_empty() {
            let cookies = config
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            headers.insert(
                COOKIE,
                HeaderValue::from_str(&cookies).context("Invalid session cookies")?,
            );
        }

        let client = reqwest::ClientBuilder::new()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .connect_timeout(config.timeout())
            .timeout(config.timeout())
            .gzip(true)
            .deflate(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, TransportError> {
        let resp = self.client.get(url).send().await?.error_for_status()?;

        let page = match resp.headers().get(CONTENT_TYPE) {
            Some(c) if c == "application/x-gzip" || c == "application/gzip" => {
                let compressed = resp.bytes().await?;
                let mut gz = GzDecoder::new(&compressed[..]);
                let mut page = String::new();
                gz.read_to_string(&mut page)
                    .with_context(|| format!("Couldn't decompress {url}"))?;
                page
            }
            _ => resp.text().await?,
        };

        Ok(page)
    }
}

/// Fetches pages, retrying on timeouts only.
#[derive(Debug, Clone)]
pub struct PageFetcher<T> {
    transport: T,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<T> PageFetcher<T>
where
    T: Transport,
{
    pub fn new(transport: T, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            transport,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    pub fn from_config(transport: T, config: &CrawlerConfig) -> Self {
        Self::new(transport, config.max_attempts, config.retry_delay())
    }

    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        for attempt in 1..=self.max_attempts {
            match self.transport.get(url).await {
                Ok(page) => return Ok(page),
                Err(TransportError::Timeout) => {
                    log::warn!(
                        "Timeout on {url}, attempt {attempt}/{}",
                        self.max_attempts
                    );
                    if attempt < self.max_attempts && !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                Err(TransportError::Other(source)) => {
                    return Err(FetchError::Permanent {
                        url: url.to_string(),
                        source,
                    })
                }
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
        })
    }
}
