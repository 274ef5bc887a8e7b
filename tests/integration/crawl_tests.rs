//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, from seed file to index database.

use spider_index::config::{Config, CrawlerConfig, InputConfig, OutputConfig, UserAgentConfig};
use spider_index::crawler::run_crawl;
use spider_index::storage::{RunStatus, SqliteStorage, Storage};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with the given seeds, writing the seed file
/// and pointing the database into `dir`
fn create_test_config(dir: &TempDir, seeds: &[String], max_depth: u32) -> Config {
    let seed_file = dir.path().join("seeds.txt");
    std::fs::write(&seed_file, seeds.join("\n")).expect("Failed to write seed file");

    Config {
        crawler: CrawlerConfig {
            max_depth,
            workers: 4,
            fetch_timeout_secs: 5,
            connect_timeout_secs: 2,
            ..CrawlerConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        input: InputConfig {
            seed_file: seed_file.display().to_string(),
        },
        output: OutputConfig {
            database_path: database_path(dir).display().to_string(),
        },
    }
}

fn database_path(dir: &TempDir) -> PathBuf {
    dir.path().join("index.db")
}

fn open(dir: &TempDir) -> SqliteStorage {
    SqliteStorage::new(Path::new(&database_path(dir))).expect("Failed to open DB")
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_seed_and_linked_page_are_indexed() {
    let site_a = MockServer::start().await;
    let site_b = MockServer::start().await;
    let a = format!("{}/", site_a.uri());
    let b = format!("{}/", site_b.uri());

    mount_html(
        &site_a,
        "/",
        format!(
            r#"<html><head><title>A</title></head><body>hello hello <a href="{}">b</a></body></html>"#,
            b
        ),
    )
    .await;
    mount_html(&site_b, "/", "<html><body>hello from b</body></html>".to_string()).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &[a.clone()], 1);
    let report = run_crawl(config, "test-hash", CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert!(!report.cancelled);
    assert_eq!(report.indexed, 2);
    assert_eq!(report.fetch_failed, 0);

    let storage = open(&dir);
    assert!(storage.is_visited(&a).unwrap());
    assert!(storage.is_visited(&b).unwrap());

    let hello = storage.get_keyword("hello").unwrap().expect("hello indexed");
    assert_eq!(hello.posting(&a).unwrap().frequency, 2);
    assert_eq!(hello.posting(&b).unwrap().frequency, 1);
    assert_eq!(hello.total_frequency(), 3);

    let title = storage.get_keyword("A").unwrap().expect("title text indexed");
    assert_eq!(title.postings.len(), 1);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.indexed, 2);
}

#[tokio::test]
async fn test_max_depth_zero_indexes_only_seed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/",
        r#"<html><body>root <a href="/child">child</a></body></html>"#.to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/child"))
        .respond_with(ResponseTemplate::new(200).set_body_string("child"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &[format!("{}/", base)], 0);
    let report = run_crawl(config, "h", CancellationToken::new()).await.unwrap();

    assert_eq!(report.indexed, 1);
    assert_eq!(report.depth_exceeded, 1);

    let storage = open(&dir);
    assert_eq!(storage.counts().unwrap().visited, 1);
    assert!(!storage.is_visited(&format!("{}/child", base)).unwrap());
}

#[tokio::test]
async fn test_tasks_beyond_max_depth_are_never_fetched() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/",
        r#"<html><body><a href="/one">one</a></body></html>"#.to_string(),
    )
    .await;
    mount_html(
        &server,
        "/one",
        r#"<html><body><a href="/two">two</a></body></html>"#.to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/two"))
        .respond_with(ResponseTemplate::new(200).set_body_string("too deep"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &[format!("{}/", server.uri())], 1);
    let report = run_crawl(config, "h", CancellationToken::new()).await.unwrap();

    assert_eq!(report.indexed, 2);
    assert_eq!(report.depth_exceeded, 1);
    assert!(open(&dir).get_keyword("too").unwrap().is_none());
}

#[tokio::test]
async fn test_recrawl_leaves_frequencies_unchanged() {
    let server = MockServer::start().await;
    let seed = format!("{}/", server.uri());

    mount_html(
        &server,
        "/",
        r#"<html><body>alpha alpha beta <a href="/next">next</a></body></html>"#.to_string(),
    )
    .await;
    mount_html(&server, "/next", "<html><body>alpha</body></html>".to_string()).await;

    let dir = TempDir::new().unwrap();
    let first = run_crawl(
        create_test_config(&dir, &[seed.clone()], 1),
        "h",
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(first.indexed, 2);

    let second = run_crawl(
        create_test_config(&dir, &[seed.clone()], 1),
        "h",
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(second.indexed, 0);
    assert_eq!(second.skipped, 2);

    let storage = open(&dir);
    let alpha = storage.get_keyword("alpha").unwrap().unwrap();
    assert_eq!(alpha.posting(&seed).unwrap().frequency, 2);
    assert_eq!(alpha.total_frequency(), 3);
    assert_eq!(storage.get_keyword("beta").unwrap().unwrap().total_frequency(), 1);
}

#[tokio::test]
async fn test_duplicate_links_are_indexed_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/",
        r#"<html><body><a href="/dup">1</a><a href="/dup">2</a><a href="/dup">3</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_html(&server, "/dup", "<html><body>once</body></html>".to_string()).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &[format!("{}/", base)], 1);
    let report = run_crawl(config, "h", CancellationToken::new()).await.unwrap();

    assert_eq!(report.indexed, 2);
    assert_eq!(report.skipped, 2);

    let once = open(&dir).get_keyword("once").unwrap().unwrap();
    assert_eq!(once.postings.len(), 1);
    assert_eq!(once.postings[0].frequency, 1);
}

#[tokio::test]
async fn test_fetch_failure_is_not_marked_visited() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/",
        r#"<html><body>ok <a href="/missing">gone</a></body></html>"#.to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &[format!("{}/", base)], 1);
    let report = run_crawl(config, "h", CancellationToken::new()).await.unwrap();

    assert_eq!(report.indexed, 1);
    assert_eq!(report.fetch_failed, 1);

    let storage = open(&dir);
    assert!(!storage.is_visited(&format!("{}/missing", base)).unwrap());
    assert_eq!(storage.get_latest_run().unwrap().unwrap().failed, 1);
}

#[tokio::test]
async fn test_relative_links_resolve_against_page() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/docs/index.html",
        r#"<html><body><a href="intro.html">intro</a> <a href="/about">about</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_html(&server, "/docs/intro.html", "<html><body>intro page</body></html>".to_string())
        .await;
    mount_html(&server, "/about", "<html><body>about page</body></html>".to_string()).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &[format!("{}/docs/index.html", base)], 1);
    let report = run_crawl(config, "h", CancellationToken::new()).await.unwrap();

    assert_eq!(report.indexed, 3);

    let storage = open(&dir);
    assert!(storage.is_visited(&format!("{}/docs/intro.html", base)).unwrap());
    assert!(storage.is_visited(&format!("{}/about", base)).unwrap());
    assert_eq!(storage.get_keyword("page").unwrap().unwrap().postings.len(), 2);
}

#[tokio::test]
async fn test_cancellation_stops_crawl_and_records_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("slow")
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &[format!("{}/", server.uri())], 1);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        run_crawl(config, "h", cancel),
    )
    .await
    .expect("crawl did not stop after cancellation")
    .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.indexed, 0);

    let storage = open(&dir);
    assert_eq!(storage.counts().unwrap().visited, 0);
    assert_eq!(
        storage.get_latest_run().unwrap().unwrap().status,
        RunStatus::Cancelled
    );
}

#[tokio::test]
async fn test_invalid_seed_file_fails_before_crawling() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &["not a url".to_string()], 1);

    let result = run_crawl(config, "h", CancellationToken::new()).await;
    assert!(result.is_err());
    assert!(!database_path(&dir).exists());
}
