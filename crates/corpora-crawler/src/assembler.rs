use std::collections::HashSet;

use crate::descriptor::DocumentDescriptor;
use crate::error::DownloadError;
use crate::extractor::PageExtractor;
use crate::fetcher::{PageFetcher, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    pub id: String,
    pub content: String,
    pub pages: usize,
}

/// Follows a document from page to page and concatenates their content.
pub struct DocumentAssembler<T, E> {
    fetcher: PageFetcher<T>,
    extractor: E,
}

impl<T, E> DocumentAssembler<T, E>
where
    T: Transport,
    E: PageExtractor,
{
    pub fn new(fetcher: PageFetcher<T>, extractor: E) -> Self {
        Self { fetcher, extractor }
    }

    pub async fn assemble_document(
        &self,
        descriptor: &DocumentDescriptor,
    ) -> Result<AssembledDocument, DownloadError> {
        let (content, pages) = self.assemble_pages(&descriptor.entry_url).await?;
        Ok(AssembledDocument {
            id: descriptor.id.clone(),
            content,
            pages,
        })
    }

    pub async fn assemble(&self, entry_url: &str) -> Result<String, DownloadError> {
        self.assemble_pages(entry_url)
            .await
            .map(|(content, _)| content)
    }

    async fn assemble_pages(&self, entry_url: &str) -> Result<(String, usize), DownloadError> {
        let mut visited = HashSet::new();
        let mut content = String::new();
        let mut next = Some(entry_url.to_string());

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                return Err(DownloadError::CycleDetected { url });
            }

            let page = self.fetcher.fetch(&url).await?;
            let fragment = self
                .extractor
                .extract(&page)
                .map_err(|source| DownloadError::Extraction {
                    url: url.clone(),
                    source,
                })?;
            log::debug!("Fetched page {} ({} chars)", url, fragment.text.len());

            content.push_str(&fragment.text);
            next = fragment.next_url;
        }

        Ok((content, visited.len()))
    }
}
