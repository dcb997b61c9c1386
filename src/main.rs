use std::fs::{self, File};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::{env, io};

use anyhow::{anyhow, Context};
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use corpora_crawler::{
    load_descriptors, load_index_dir, CrawlerConfig, DocumentAssembler, DocumentDescriptor,
    DocumentStore, DownloadCoordinator, HttpTransport, MarkerExtractor, OnError, PageExtractor,
    PageFetcher, RunReport, SiteConfig,
};
use serde::Deserialize;
use tokio::runtime;

/// Download paginated documents into a text corpus
#[derive(Debug, Parser)]
#[clap(version)]
pub struct Args {
    #[clap(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    #[clap(name = "download")]
    Download(DownloadArgs),
    #[clap(name = "page")]
    Page(PageArgs),
    #[clap(hide = true)]
    Completion,
}

/// Yaml configuration file layout
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub site: Option<SiteConfig>,
}

impl ConfigFile {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Couldn't open config {}", path.display()))?;
                Ok(serde_yaml::from_reader(file)?)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn site(self) -> anyhow::Result<SiteConfig> {
        self.site
            .ok_or_else(|| anyhow!("Missing `site` section in the configuration file"))
    }
}

/// Download every document of an index that isn't on disk yet
#[derive(Debug, clap::Args)]
#[clap(group = clap::ArgGroup::new("input").required(true))]
pub struct DownloadArgs {
    /// Descriptor file, either a JSON array or JSON Lines
    #[clap(group = "input", parse(from_os_str), long)]
    pub index: Option<PathBuf>,
    /// Directory whose *.json and *.jsonl descriptor files are all loaded
    #[clap(group = "input", parse(from_os_str), long)]
    pub index_dir: Option<PathBuf>,
    /// Yaml configuration file with `crawler` and `site` sections
    #[clap(env = "CORPORA_CONFIG", parse(from_os_str), long, short)]
    pub config: Option<PathBuf>,
    /// Override crawler's user agent
    #[clap(long)]
    pub user_agent: Option<String>,
    /// Override crawler's number of concurrent workers
    #[clap(long)]
    pub num_workers: Option<usize>,
    /// Override crawler's per attempt timeout in seconds
    #[clap(long)]
    pub timeout_secs: Option<u64>,
    /// Override crawler's maximum attempts on timeouts
    #[clap(long)]
    pub max_attempts: Option<u32>,
    /// Override crawler's delay between attempts in milliseconds
    #[clap(long)]
    pub retry_delay_ms: Option<u64>,
    /// Override crawler's document error handling strategy
    #[clap(arg_enum, long)]
    pub on_document_error: Option<OnError>,
    /// Override crawler's directory relative target paths are resolved against
    #[clap(parse(from_os_str), long)]
    pub output_dir: Option<PathBuf>,
    /// Override crawler's error log, failed documents are appended to it
    #[clap(parse(from_os_str), long)]
    pub error_log: Option<PathBuf>,
    /// No SIGINT handling
    #[clap(long)]
    pub no_sigint: bool,
    /// When quiet no logs are outputted
    #[clap(long, short)]
    pub quiet: bool,
}

impl TryFrom<&DownloadArgs> for CrawlerConfig {
    type Error = anyhow::Error;

    fn try_from(args: &DownloadArgs) -> Result<Self, Self::Error> {
        let mut conf = ConfigFile::load(args.config.as_deref())?.crawler;
        if let Some(user_agent) = &args.user_agent {
            conf.user_agent = user_agent.to_string();
        }
        if let Some(num_workers) = args.num_workers {
            conf.num_workers = num_workers;
        }
        if let Some(timeout_secs) = args.timeout_secs {
            conf.timeout_secs = timeout_secs;
        }
        if let Some(max_attempts) = args.max_attempts {
            conf.max_attempts = max_attempts;
        }
        if let Some(retry_delay_ms) = args.retry_delay_ms {
            conf.retry_delay_ms = retry_delay_ms;
        }
        if let Some(on_document_error) = args.on_document_error {
            conf.on_document_error = on_document_error;
        }
        if let Some(output_dir) = &args.output_dir {
            conf.output_dir = output_dir.clone();
        }
        if let Some(error_log) = &args.error_log {
            conf.error_log = Some(error_log.clone());
        }
        if args.no_sigint {
            conf.handle_sigint = false;
        }
        conf.validate()?;
        Ok(conf)
    }
}

pub fn download(args: DownloadArgs) -> anyhow::Result<()> {
    let crawler_conf = CrawlerConfig::try_from(&args)?;
    let extractor = MarkerExtractor::new(ConfigFile::load(args.config.as_deref())?.site()?)?;

    let descriptors = match (&args.index, &args.index_dir) {
        (Some(file), _) => load_descriptors(file, Some(extractor.base_url()))?,
        (None, Some(dir)) => load_index_dir(dir, Some(extractor.base_url()))?,
        (None, None) => anyhow::bail!("Missing `index` or `index-dir`"),
    };
    log::info!("Loaded {} document descriptors", descriptors.len());

    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    let report = rt.block_on(run(&crawler_conf, extractor, descriptors))?;

    print_summary(&report);
    if let Some(error_log) = &crawler_conf.error_log {
        report
            .write_error_log(error_log)
            .with_context(|| format!("Couldn't write error log {}", error_log.display()))?;
    }

    if !report.is_complete() {
        anyhow::bail!("Partial download, some documents failed");
    }
    Ok(())
}

async fn run(
    conf: &CrawlerConfig,
    extractor: MarkerExtractor,
    descriptors: Vec<DocumentDescriptor>,
) -> anyhow::Result<RunReport> {
    let fetcher = PageFetcher::from_config(HttpTransport::new(conf)?, conf);
    let coordinator = DownloadCoordinator::new(
        DocumentAssembler::new(fetcher, extractor),
        DocumentStore::new(&conf.output_dir),
        conf.on_document_error,
    );
    let concurrency = NonZeroUsize::new(conf.num_workers)
        .ok_or_else(|| anyhow!("`numWorkers` must be at least 1"))?;

    if !conf.handle_sigint {
        return Ok(coordinator.run(descriptors, concurrency).await);
    }

    tokio::select! {
        report = coordinator.run(descriptors, concurrency) => Ok(report),
        _ = tokio::signal::ctrl_c() => Err(anyhow!(
            "Interrupted, documents already written are skipped on the next run"
        )),
    }
}

fn print_summary(report: &RunReport) {
    let not_processed: usize = report
        .failed_partitions
        .iter()
        .map(|f| f.unprocessed.len())
        .sum();

    println!(
        "Downloaded: {}, failed: {}, not processed: {}, already present: {}",
        report.succeeded().count(),
        report.failed().count(),
        not_processed,
        report.skipped
    );
    for outcome in report.failed() {
        if let Err(e) = &outcome.result {
            eprintln!("{}: {e}", outcome.descriptor.id);
        }
    }
}

/// Extract a single page and print its content, useful to tune site markers
#[derive(Debug, clap::Args)]
#[clap(group = clap::ArgGroup::new("page").required(true))]
pub struct PageArgs {
    /// Yaml configuration file with `crawler` and `site` sections
    #[clap(env = "CORPORA_CONFIG", parse(from_os_str), long, short)]
    pub config: Option<PathBuf>,
    /// A local html page to extract
    #[clap(group = "page", parse(from_os_str), long)]
    pub file: Option<PathBuf>,
    /// A distant html page to extract
    #[clap(group = "page", long)]
    pub url: Option<String>,
}

pub fn page(args: PageArgs) -> anyhow::Result<()> {
    let config = ConfigFile::load(args.config.as_deref())?;
    let crawler = config.crawler.clone();
    let extractor = MarkerExtractor::new(config.site()?)?;

    let page = if let Some(url) = args.url {
        let fetcher = PageFetcher::from_config(HttpTransport::new(&crawler)?, &crawler);
        let rt = runtime::Builder::new_current_thread().enable_all().build()?;
        rt.block_on(fetcher.fetch(&url))?
    } else if let Some(path) = args.file {
        fs::read_to_string(&path)?
    } else {
        anyhow::bail!("Missing `url` or `file`");
    };

    let fragment = extractor.extract(&page)?;
    print!("{}", fragment.text);
    match fragment.next_url {
        Some(next) => eprintln!("Next page: {next}"),
        None => eprintln!("Last page"),
    }
    Ok(())
}

fn init_logger(quiet: bool) {
    if quiet {
        return;
    }
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "corpora_crawler=info,corpora=info");
    }
    env_logger::init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.cmd {
        SubCommand::Download(args) => {
            init_logger(args.quiet);
            download(args)
        }
        SubCommand::Page(args) => {
            init_logger(false);
            page(args)
        }
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "corpora", &mut io::stdout());
            Ok(())
        }
    }
}
