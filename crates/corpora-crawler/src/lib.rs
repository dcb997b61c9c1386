mod assembler;
mod config;
mod coordinator;
mod descriptor;
mod error;
mod extractor;
mod fetcher;
mod partition;
mod store;

pub use assembler::{AssembledDocument, DocumentAssembler};
pub use config::{CrawlerConfig, Marker, OnError, SiteConfig};
pub use coordinator::{
    DocumentOutcome, DownloadCoordinator, PartitionFailure, RunReport, WorkPartition,
};
pub use descriptor::{load_descriptors, load_index_dir, DocumentDescriptor};
pub use error::{DescriptorError, DownloadError, ExtractError, FetchError, TransportError};
pub use extractor::{MarkerExtractor, PageExtractor, PageFragment};
pub use fetcher::{HttpTransport, PageFetcher, Transport};
pub use partition::partition;
pub use store::DocumentStore;

pub use anyhow;
pub use async_trait::async_trait;
