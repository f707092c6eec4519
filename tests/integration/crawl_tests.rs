//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small job board and run whole crawl
//! sessions against it, end to end into SQLite.

use async_trait::async_trait;
use jobhunter::config::{Config, DelayRange, RetrySettings};
use jobhunter::crawler::{crawl, Coordinator, CrawlRequest};
use jobhunter::output::StopReason;
use jobhunter::render::{Renderer, Snapshot, Tab};
use jobhunter::storage::{JobStore, MemoryJobStore, SqliteJobStore};
use jobhunter::{derive_job_id, HunterError};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/remote-jobs/search";

/// Creates a test configuration that never sleeps and never retries
fn create_test_config(start_url: &Url, db_path: &Path) -> Config {
    let mut config = Config::default();
    config.crawler.start_url = start_url.to_string();
    config.crawler.title_wait_ms = 0;
    config.crawler.navigation_timeout_ms = 5_000;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.pacing.batch_delay = DelayRange::zero();
    config.pacing.page_delay = DelayRange::zero();
    let no_wait = RetrySettings {
        max_attempts: 1,
        base_delay_ms: 0,
        max_jitter_ms: 0,
    };
    config.retry.navigation = no_wait;
    config.retry.persistence = no_wait;
    config.flush.cooldown_ms = 0;
    config.storage.database_path = db_path.display().to_string();
    config
}

fn create_request(start_url: &Url, max_pages: u32, max_no_new: u32) -> CrawlRequest {
    CrawlRequest {
        start_url: start_url.clone(),
        max_pages,
        max_consecutive_no_new_pages: max_no_new,
        concurrency: 2,
    }
}

fn detail_page(title: &str, company: &str, region: &str) -> String {
    format!(
        r#"<html><head><title>{title}</title></head><body>
        <div class="listing-header">
          <h1>{title}</h1>
          <span class="company">{company}</span>
          <span class="region">{region}</span>
        </div>
        <div class="listing-container"><p>Build &amp; ship Rust services.</p></div>
        </body></html>"#,
        title = title,
        company = company,
        region = region,
    )
}

async fn mount_html(server: &MockServer, route: &str, body: String, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .expect(expected_hits)
        .mount(server)
        .await;
}

const ALLOW_ALL: &str = "User-agent: *\nAllow: /\n";

/// Mounts robots.txt, one listing page and two job pages; each job page may be hit once
async fn mount_job_board(server: &MockServer, robots: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(robots))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><body>
                    <a href="/remote-jobs/acme-senior-rust-engineer">Senior Rust Engineer</a>
                    <a href="/remote-jobs/globex-backend-developer">Backend Developer</a>
                    <a href="/remote-jobs/new">Post a job</a>
                    <a href="/categories/remote-programming-jobs">Programming</a>
                    </body></html>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;

    mount_html(
        server,
        "/remote-jobs/acme-senior-rust-engineer",
        detail_page("Senior Rust Engineer", "Acme Corp", "Anywhere in the World"),
        1,
    )
    .await;
    mount_html(
        server,
        "/remote-jobs/globex-backend-developer",
        detail_page("Backend Developer", "Globex", "Europe Only"),
        1,
    )
    .await;
}

fn start_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}{}?term=rust", server.uri(), LISTING_PATH))
        .expect("Failed to parse start URL")
}

#[tokio::test]
async fn test_full_crawl_into_sqlite() {
    let mock_server = MockServer::start().await;
    mount_job_board(&mock_server, ALLOW_ALL).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("jobs.db");
    let start = start_url(&mock_server);
    let config = create_test_config(&start, &db_path);
    let source = config.source.tag.clone();

    let store = SqliteJobStore::new(&db_path).expect("Failed to open store");
    let summary = crawl(config, create_request(&start, 1, 3), store)
        .await
        .expect("Crawl failed");

    assert_eq!(summary.pages_visited, 1);
    assert_eq!(summary.new_candidates, 2);
    assert_eq!(summary.records_extracted, 2);
    assert_eq!(summary.records_flushed, 2);
    assert_eq!(summary.skipped_failed, 0);
    assert_eq!(summary.stop_reason, Some(StopReason::PageLimit));

    let store = SqliteJobStore::new(&db_path).expect("Failed to reopen store");
    assert_eq!(store.count().unwrap(), 2);

    let job_url = start.join("/remote-jobs/acme-senior-rust-engineer").unwrap();
    let stored = store
        .get(&derive_job_id(&source, &job_url))
        .unwrap()
        .expect("Job should be stored");
    assert_eq!(stored.record.title, "Senior Rust Engineer");
    assert_eq!(stored.record.company, "Acme Corp");
    assert_eq!(stored.record.location, "Anywhere in the World");
    assert_eq!(stored.record.apply_url, job_url.to_string());
    assert_eq!(stored.record.description, "Build & ship Rust services.");
}

#[tokio::test]
async fn test_rerun_skips_stored_jobs() {
    let mock_server = MockServer::start().await;
    // job pages are mounted with expect(1): the second run must not fetch them
    mount_job_board(&mock_server, ALLOW_ALL).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("jobs.db");
    let start = start_url(&mock_server);

    let first = crawl(
        create_test_config(&start, &db_path),
        create_request(&start, 1, 3),
        SqliteJobStore::new(&db_path).unwrap(),
    )
    .await
    .expect("First crawl failed");
    assert_eq!(first.records_flushed, 2);

    let before = SqliteJobStore::new(&db_path).unwrap();
    let first_page = before.scan_page(10, None).unwrap();
    drop(before);

    let second = crawl(
        create_test_config(&start, &db_path),
        create_request(&start, 1, 3),
        SqliteJobStore::new(&db_path).unwrap(),
    )
    .await
    .expect("Second crawl failed");

    assert_eq!(second.known_ids_at_start, 2);
    assert_eq!(second.new_candidates, 0);
    assert_eq!(second.records_extracted, 0);
    assert_eq!(second.records_flushed, 0);

    let after = SqliteJobStore::new(&db_path).unwrap();
    assert_eq!(after.count().unwrap(), 2);
    let second_page = after.scan_page(10, None).unwrap();
    assert_eq!(first_page.items, second_page.items);
}

#[tokio::test]
async fn test_robots_denial_aborts_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .mount(&mock_server)
        .await;
    mount_html(&mock_server, LISTING_PATH, String::new(), 0).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("jobs.db");
    let start = start_url(&mock_server);

    let result = crawl(
        create_test_config(&start, &db_path),
        create_request(&start, 5, 3),
        SqliteJobStore::new(&db_path).unwrap(),
    )
    .await;

    match result {
        Err(HunterError::PolicyDenied { origin }) => assert_eq!(origin, mock_server.uri()),
        other => panic!("expected PolicyDenied, got {:?}", other.map(|s| s.pages_visited)),
    }
}

#[tokio::test]
async fn test_robots_denial_for_other_agent_is_ignored() {
    let mock_server = MockServer::start().await;
    mount_job_board(&mock_server, "User-agent: OtherBot\nDisallow: /\n").await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("jobs.db");
    let start = start_url(&mock_server);

    let summary = crawl(
        create_test_config(&start, &db_path),
        create_request(&start, 1, 3),
        MemoryJobStore::new(),
    )
    .await
    .expect("Crawl should be allowed");
    assert_eq!(summary.records_extracted, 2);
}

/// Renderer serving the same listing on every page and a job page for every other URL
struct RepeatingBoard {
    listing: String,
    detail: String,
}

struct RepeatingTab {
    listing: String,
    detail: String,
    current: Mutex<Option<Snapshot>>,
}

#[async_trait]
impl Renderer for RepeatingBoard {
    async fn open_tab(&self) -> jobhunter::Result<Box<dyn Tab>> {
        Ok(Box::new(RepeatingTab {
            listing: self.listing.clone(),
            detail: self.detail.clone(),
            current: Mutex::new(None),
        }))
    }

    fn name(&self) -> &'static str {
        "repeating"
    }
}

#[async_trait]
impl Tab for RepeatingTab {
    async fn navigate(&self, url: &Url, _timeout: Duration) -> jobhunter::Result<Snapshot> {
        let html = if url.path() == LISTING_PATH {
            self.listing.clone()
        } else {
            self.detail.clone()
        };
        let snapshot = Snapshot {
            url: url.clone(),
            status: Some(200),
            html,
        };
        *self.current.lock().unwrap() = Some(snapshot.clone());
        Ok(snapshot)
    }

    async fn snapshot(&self) -> jobhunter::Result<Snapshot> {
        self.current
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| HunterError::Task("nothing loaded".to_string()))
    }

    async fn close(self: Box<Self>) {}
}

#[tokio::test]
async fn test_stops_after_consecutive_pages_without_new_jobs() {
    // only robots.txt is requested over HTTP; it 404s, which allows crawling
    let mock_server = MockServer::start().await;
    let start = start_url(&mock_server);
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&start, &temp_dir.path().join("unused.db"));

    let renderer = Arc::new(RepeatingBoard {
        listing: r#"<a href="/remote-jobs/acme-rust-engineer">A</a>
                    <a href="/remote-jobs/globex-go-developer">B</a>"#
            .to_string(),
        detail: detail_page("Engineer", "Acme", "Remote"),
    });

    let mut coordinator = Coordinator::new(
        config,
        create_request(&start, 100, 3),
        MemoryJobStore::new(),
        renderer,
    );
    let summary = coordinator.run().await.expect("Crawl failed");

    // page 0 yields two new jobs, pages 1-3 repeat them
    assert_eq!(summary.pages_visited, 4);
    assert_eq!(summary.new_candidates, 2);
    assert_eq!(summary.stop_reason, Some(StopReason::NoNewPages));
    assert_eq!(coordinator.store().count().unwrap(), 2);
}

#[tokio::test]
async fn test_dry_run_leaves_database_untouched() {
    let mock_server = MockServer::start().await;
    mount_job_board(&mock_server, ALLOW_ALL).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("jobs.db");
    let start = start_url(&mock_server);

    let summary = crawl(
        create_test_config(&start, &db_path),
        create_request(&start, 1, 3),
        MemoryJobStore::new(),
    )
    .await
    .expect("Crawl failed");

    assert_eq!(summary.records_flushed, 2);
    assert!(!db_path.exists());
}
