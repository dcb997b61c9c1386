#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use corpora_crawler::{
    anyhow, async_trait, ExtractError, PageExtractor, PageFragment, Transport, TransportError,
};

/// In-memory site, pages are served by URL and may time out a few times first.
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pages: Arc<HashMap<String, String>>,
    timeouts: Arc<Mutex<HashMap<String, u32>>>,
    fetches: Arc<Mutex<Vec<String>>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.pages).insert(url.to_string(), body.into());
        self
    }

    pub fn timing_out(self, url: &str, times: u32) -> Self {
        self.timeouts
            .lock()
            .unwrap()
            .insert(url.to_string(), times);
        self
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Transport for FakeSite {
    async fn get(&self, url: &str) -> Result<String, TransportError> {
        self.fetches.lock().unwrap().push(url.to_string());

        if let Some(remaining) = self.timeouts.lock().unwrap().get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TransportError::Timeout);
            }
        }

        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("404 Not Found: {url}").into())
    }
}

/// Page body understood by [`PipeExtractor`].
pub fn page(text: &str, next: Option<&str>) -> String {
    format!("{text}|{}", next.unwrap_or_default())
}

/// Reads `text|next` bodies, an empty `next` is the last page.
#[derive(Debug, Clone, Copy)]
pub struct PipeExtractor;

impl PageExtractor for PipeExtractor {
    fn extract(&self, page: &str) -> Result<PageFragment, ExtractError> {
        match page.rsplit_once('|') {
            Some((text, "")) => Ok(PageFragment::new(text, None)),
            Some((text, next)) => Ok(PageFragment::new(text, Some(next.to_string()))),
            None => Err(ExtractError::MissingContent),
        }
    }
}
