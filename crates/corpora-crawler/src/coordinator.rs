use std::collections::HashSet;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use futures::future;
use tokio::sync::mpsc;

use crate::assembler::DocumentAssembler;
use crate::config::OnError;
use crate::descriptor::DocumentDescriptor;
use crate::error::DownloadError;
use crate::extractor::PageExtractor;
use crate::fetcher::Transport;
use crate::partition::partition;
use crate::store::DocumentStore;

/// Documents handled one after the other by a single worker.
pub type WorkPartition = Vec<DocumentDescriptor>;

#[derive(Debug)]
pub struct DocumentOutcome {
    pub descriptor: DocumentDescriptor,
    /// Number of pages on success
    pub result: Result<usize, DownloadError>,
}

#[derive(Debug)]
pub struct PartitionFailure {
    pub worker: usize,
    pub reason: String,
    pub unprocessed: Vec<DocumentDescriptor>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    /// Documents already in the store before the run
    pub skipped: usize,
    pub outcomes: Vec<DocumentOutcome>,
    pub failed_partitions: Vec<PartitionFailure>,
}

impl RunReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &DocumentOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &DocumentOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn is_complete(&self) -> bool {
        self.failed_partitions.is_empty() && self.failed().next().is_none()
    }

    /// Appends one `id<TAB>url<TAB>reason` line per document that didn't make
    /// it to the store.
    pub fn write_error_log(&self, path: &Path) -> io::Result<()> {
        let mut file = fs_err::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        for outcome in self.failed() {
            if let Err(e) = &outcome.result {
                let DocumentDescriptor { id, entry_url, .. } = &outcome.descriptor;
                writeln!(file, "{id}\t{entry_url}\t{}", one_line(&e.to_string()))?;
            }
        }
        for failure in &self.failed_partitions {
            for DocumentDescriptor { id, entry_url, .. } in &failure.unprocessed {
                writeln!(
                    file,
                    "{id}\t{entry_url}\tnot processed: {}",
                    one_line(&failure.reason)
                )?;
            }
        }

        file.flush()
    }
}

fn one_line(s: &str) -> String {
    s.replace(['\n', '\t'], " ")
}

/// Downloads documents with a fixed number of workers.
pub struct DownloadCoordinator<T, E> {
    assembler: Arc<DocumentAssembler<T, E>>,
    store: DocumentStore,
    on_error: OnError,
}

impl<T, E> DownloadCoordinator<T, E>
where
    T: Transport + 'static,
    E: PageExtractor + 'static,
{
    pub fn new(
        assembler: DocumentAssembler<T, E>,
        store: DocumentStore,
        on_error: OnError,
    ) -> Self {
        Self {
            assembler: Arc::new(assembler),
            store,
            on_error,
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Downloads every descriptor not yet in the store and waits for all
    /// workers to finish.
    pub async fn run(
        &self,
        descriptors: Vec<DocumentDescriptor>,
        concurrency: NonZeroUsize,
    ) -> RunReport {
        let (present, pending): (Vec<_>, Vec<_>) = descriptors
            .into_iter()
            .partition(|d| self.store.exists(d));

        log::info!(
            "{} documents to download, {} already present",
            pending.len(),
            present.len()
        );

        let total = pending.len();
        let done = Arc::new(AtomicUsize::new(0));
        let (tx_outcome, mut rx_outcome) = mpsc::unbounded_channel::<DocumentOutcome>();

        // Workers

        let partitions = partition(pending, concurrency);
        let mut assigned = Vec::with_capacity(partitions.len());
        let mut workers = Vec::with_capacity(partitions.len());
        for (id, documents) in partitions.into_iter().enumerate() {
            assigned.push(documents.clone());
            let worker = Worker {
                id,
                total,
                done: done.clone(),
                assembler: self.assembler.clone(),
                store: self.store.clone(),
                on_error: self.on_error,
                tx_outcome: tx_outcome.clone(),
            };
            workers.push(tokio::spawn(worker.process(documents)));
        }
        drop(tx_outcome);

        let results = future::join_all(workers).await;

        // Report

        let mut report = RunReport {
            skipped: present.len(),
            ..Default::default()
        };
        while let Some(outcome) = rx_outcome.recv().await {
            report.outcomes.push(outcome);
        }

        let processed = report
            .outcomes
            .iter()
            .map(|o| o.descriptor.target_path.as_path())
            .collect::<HashSet<_>>();

        let mut failed_partitions = vec![];
        for (worker, (result, documents)) in results.into_iter().zip(assigned).enumerate() {
            let reason = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(e) => format!("worker crashed: {e}"),
            };
            log::error!("Worker {worker} failed: {reason}");

            let unprocessed = documents
                .into_iter()
                .filter(|d| !processed.contains(d.target_path.as_path()))
                .collect();
            failed_partitions.push(PartitionFailure {
                worker,
                reason,
                unprocessed,
            });
        }
        report.failed_partitions = failed_partitions;

        report
    }
}

struct Worker<T, E> {
    id: usize,
    total: usize,
    done: Arc<AtomicUsize>,
    assembler: Arc<DocumentAssembler<T, E>>,
    store: DocumentStore,
    on_error: OnError,
    tx_outcome: mpsc::UnboundedSender<DocumentOutcome>,
}

impl<T, E> Worker<T, E>
where
    T: Transport + 'static,
    E: PageExtractor + 'static,
{
    async fn process(self, documents: WorkPartition) -> anyhow::Result<()> {
        log::debug!("Worker {} starts with {} documents", self.id, documents.len());

        for descriptor in documents {
            let result = self.download(&descriptor).await;
            let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;

            let failed = match &result {
                Ok(pages) => {
                    log::info!(
                        "[{done}/{}] Downloaded {} ({pages} pages)",
                        self.total,
                        descriptor.id
                    );
                    None
                }
                Err(e) => {
                    log::error!(
                        "[{done}/{}] Couldn't download {} got: {e}",
                        self.total,
                        descriptor.id
                    );
                    Some(descriptor.id.clone())
                }
            };

            self.tx_outcome
                .send(DocumentOutcome { descriptor, result })
                .ok();

            if let (Some(id), OnError::Fail) = (failed, self.on_error) {
                return Err(anyhow!("Stopped after {id} failed"));
            }
        }

        Ok(())
    }

    async fn download(&self, descriptor: &DocumentDescriptor) -> Result<usize, DownloadError> {
        let document = self.assembler.assemble_document(descriptor).await?;
        let pages = document.pages;

        let store = self.store.clone();
        let target = descriptor.clone();
        let saved = tokio::task::spawn_blocking(move || store.save(&target, &document.content))
            .await
            .unwrap_or_else(|e| Err(io::Error::new(io::ErrorKind::Other, e)));

        saved
            .map(|_| pages)
            .map_err(|source| DownloadError::Store {
                path: self.store.path_of(descriptor),
                source,
            })
    }
}
