use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub retry_delay_ms: u64,

    /// Session cookies sent with every request
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,

    #[serde(default = "default_on_document_error")]
    pub on_document_error: OnError,

    #[serde(default = "default_handle_sigint")]
    pub handle_sigint: bool,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub error_log: Option<PathBuf>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            num_workers: default_num_workers(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: 0,
            cookies: BTreeMap::new(),
            on_document_error: default_on_document_error(),
            handle_sigint: default_handle_sigint(),
            output_dir: default_output_dir(),
            error_log: None,
        }
    }
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.num_workers == 0 {
            anyhow::bail!("Invalid crawler config, `numWorkers` must be at least 1");
        }
        if self.max_attempts == 0 {
            anyhow::bail!("Invalid crawler config, `maxAttempts` must be at least 1");
        }
        Ok(())
    }
}

fn default_user_agent() -> String {
    String::from("CorporaBot")
}

fn default_num_workers() -> usize {
    num_cpus::get().max(1)
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    1000
}

fn default_on_document_error() -> OnError {
    OnError::SkipAndLog
}

fn default_handle_sigint() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ArgEnum))]
pub enum OnError {
    Fail,
    SkipAndLog,
}

/// Where the content and the link to the following page live in a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    /// Base URL relative links are resolved against
    pub base_url: String,

    pub content: Marker,

    pub next: Marker,

    #[serde(default = "default_placeholder_hrefs")]
    pub placeholder_hrefs: Vec<String>,

    #[serde(default)]
    pub require_content: bool,
}

impl SiteConfig {
    pub fn new(base_url: impl Into<String>, content: Marker, next: Marker) -> Self {
        Self {
            base_url: base_url.into(),
            content,
            next,
            placeholder_hrefs: default_placeholder_hrefs(),
            require_content: false,
        }
    }
}

fn default_placeholder_hrefs() -> Vec<String> {
    vec![String::from("#")]
}

/// Matches elements by tag name, CSS class and exact (trimmed) text.
///
/// Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl Marker {
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}
