use std::net::TcpListener;

use corpora_crawler::{CrawlerConfig, FetchError, HttpTransport, PageFetcher};

fn fetcher() -> PageFetcher<HttpTransport> {
    let conf = CrawlerConfig {
        timeout_secs: 1,
        max_attempts: 2,
        ..Default::default()
    };
    PageFetcher::from_config(HttpTransport::new(&conf).unwrap(), &conf)
}

#[tokio::test]
async fn unanswered_request_is_retried_as_timeout() {
    // Connections are accepted by the backlog but never answered
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/book/1", listener.local_addr().unwrap());

    match fetcher().fetch(&url).await {
        Err(FetchError::Exhausted { attempts, .. }) => assert_eq!(2, attempts),
        other => panic!("Unexpected result {other:?}"),
    }
    drop(listener);
}

#[tokio::test]
async fn unreachable_host_is_not_retried() {
    let addr = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let url = format!("http://{addr}/book/1");

    match fetcher().fetch(&url).await {
        Err(FetchError::Permanent { url: failed, .. }) => assert_eq!(url, failed),
        other => panic!("Unexpected result {other:?}"),
    }
}
