mod common;

use std::time::Duration;

use common::FakeSite;
use corpora_crawler::{CrawlerConfig, FetchError, PageFetcher};

#[tokio::test]
async fn retries_timeouts_then_succeeds() {
    let site = FakeSite::new()
        .page("https://site/1", "content")
        .timing_out("https://site/1", 2);
    let fetcher = PageFetcher::new(site.clone(), 1000, Duration::ZERO);

    let page = fetcher.fetch("https://site/1").await.unwrap();

    assert_eq!("content", page);
    assert_eq!(3, site.fetch_count("https://site/1"));
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let site = FakeSite::new()
        .page("https://site/1", "content")
        .timing_out("https://site/1", u32::MAX);
    let fetcher = PageFetcher::new(site.clone(), 7, Duration::ZERO);

    match fetcher.fetch("https://site/1").await {
        Err(FetchError::Exhausted { url, attempts }) => {
            assert_eq!("https://site/1", url);
            assert_eq!(7, attempts);
        }
        res => panic!("Unexpected fetch result {res:?}"),
    }
    assert_eq!(7, site.fetch_count("https://site/1"));
}

#[tokio::test]
async fn other_errors_are_not_retried() {
    let site = FakeSite::new();
    let fetcher = PageFetcher::new(site.clone(), 1000, Duration::ZERO);

    let res = fetcher.fetch("https://site/missing").await;

    assert!(matches!(res, Err(FetchError::Permanent { .. })));
    assert_eq!(1, site.fetch_count("https://site/missing"));
}

#[tokio::test]
async fn waits_between_attempts() {
    let site = FakeSite::new()
        .page("https://site/1", "content")
        .timing_out("https://site/1", 2);
    let fetcher = PageFetcher::new(site, 3, Duration::from_millis(20));

    let start = std::time::Instant::now();
    fetcher.fetch("https://site/1").await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(40));
}

#[test]
fn attempts_default_to_a_large_bound() {
    let conf = CrawlerConfig::default();

    assert_eq!(1000, conf.max_attempts);
    assert_eq!(Duration::from_secs(120), conf.timeout());
    assert!(conf.num_workers >= 1);
    conf.validate().unwrap();
}
