use std::borrow::Cow;

use select::document::Document;
use select::node::Node;
use select::predicate::Predicate;
use url::Url;

use crate::config::{Marker, SiteConfig};
use crate::error::ExtractError;

/// Content of one page and where the document continues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFragment {
    pub text: String,
    /// `None` on the last page
    pub next_url: Option<String>,
}

impl PageFragment {
    pub fn new(text: impl Into<String>, next_url: Option<String>) -> Self {
        Self {
            text: text.into(),
            next_url,
        }
    }
}

pub trait PageExtractor: Send + Sync {
    fn extract(&self, page: &str) -> Result<PageFragment, ExtractError>;
}

const LINE_BREAKS: [&str; 3] = ["<br />", "<br/>", "<br>"];

const FRAGMENT_SEPARATOR: &str = "\n\n";

/// Extracts pages whose content and next link are found through [`Marker`]s.
#[derive(Debug, Clone)]
pub struct MarkerExtractor {
    site: SiteConfig,
    base_url: Url,
}

impl MarkerExtractor {
    pub fn new(site: SiteConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&site.base_url)
            .map_err(|e| anyhow::anyhow!("Invalid base URL {:?} got: {e}", site.base_url))?;
        Ok(Self { site, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn next_url(&self, document: &Document) -> Result<Option<String>, ExtractError> {
        let href = document
            .find(Matches(&self.site.next))
            .next()
            .and_then(|link| link.attr("href"))
            .map(str::trim);

        match href {
            None => Ok(None),
            Some(href) if href.is_empty() || self.is_placeholder(href) => Ok(None),
            Some(href) => self
                .base_url
                .join(href)
                .map(|url| Some(url.into()))
                .map_err(|source| ExtractError::InvalidNextUrl {
                    href: href.to_string(),
                    source,
                }),
        }
    }

    fn is_placeholder(&self, href: &str) -> bool {
        self.site.placeholder_hrefs.iter().any(|p| p == href)
    }
}

impl PageExtractor for MarkerExtractor {
    fn extract(&self, page: &str) -> Result<PageFragment, ExtractError> {
        let page = normalize_line_breaks(page);
        let document = Document::from(&*page);

        let mut text = String::new();
        let mut found = false;
        for node in document.find(Matches(&self.site.content)) {
            found = true;
            text.push_str(&node.text());
            text.push_str(FRAGMENT_SEPARATOR);
        }
        if !found && self.site.require_content {
            return Err(ExtractError::MissingContent);
        }

        let next_url = self.next_url(&document)?;

        Ok(PageFragment { text, next_url })
    }
}

fn normalize_line_breaks(page: &str) -> Cow<'_, str> {
    if !LINE_BREAKS.iter().any(|br| page.contains(br)) {
        return Cow::Borrowed(page);
    }
    let mut page = page.to_string();
    for br in LINE_BREAKS {
        page = page.replace(br, "\n");
    }
    Cow::Owned(page)
}

struct Matches<'a>(&'a Marker);

impl Predicate for Matches<'_> {
    fn matches(&self, node: &Node) -> bool {
        let Marker { tag, class, text } = self.0;

        if let Some(tag) = tag {
            if node.name() != Some(tag.as_str()) {
                return false;
            }
        }
        if let Some(class) = class {
            let has_class = node
                .attr("class")
                .map(|classes| classes.split_whitespace().any(|c| c == class))
                .unwrap_or(false);
            if !has_class {
                return false;
            }
        }
        if let Some(text) = text {
            if node.text().trim() != text {
                return false;
            }
        }
        // Text nodes have no name, only elements can be markers
        node.name().is_some()
    }
}
