// tests/ingest_pipeline.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use horizons_jobs::ingest::normalize::derive_id;
use horizons_jobs::ingest::types::{JobSource, RawPosting, VendorClass};
use horizons_jobs::{run_and_write, run_once, RunOptions, ScrapeError};

enum Behaviour {
    Returns(Vec<RawPosting>),
    Fails,
    Hangs,
}

struct MockSource {
    code: &'static str,
    behaviour: Behaviour,
}

impl MockSource {
    fn new(code: &'static str, behaviour: Behaviour) -> Arc<dyn JobSource> {
        Arc::new(Self { code, behaviour })
    }
}

#[async_trait]
impl JobSource for MockSource {
    fn code(&self) -> &'static str {
        self.code
    }
    fn company(&self) -> &'static str {
        "Mock Co"
    }
    fn class(&self) -> VendorClass {
        VendorClass::StaticHtml
    }
    async fn fetch(&self) -> Result<Vec<RawPosting>, ScrapeError> {
        match &self.behaviour {
            Behaviour::Returns(v) => Ok(v.clone()),
            Behaviour::Fails => Err(ScrapeError::selector(
                "https://mock.test/jobs",
                "div.listing",
                "no cards",
            )),
            Behaviour::Hangs => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Vec::new())
            }
        }
    }
}

fn nurse(url: &str, scraped_at: &str) -> RawPosting {
    RawPosting::new()
        .with("title", "Nurse")
        .with("company", "Acme")
        .with("location", "Amarillo, TX")
        .with("url", url)
        .with("scraped_at", scraped_at)
}

fn opts(parallel: bool) -> RunOptions {
    RunOptions {
        timeout: Duration::from_secs(5),
        parallel,
    }
}

#[tokio::test]
async fn same_posting_from_two_adapters_merges_to_earliest() {
    let sources = || {
        vec![
            MockSource::new(
                "a",
                Behaviour::Returns(vec![nurse("https://x/1", "2025-05-01T10:00:05")]),
            ),
            MockSource::new(
                "b",
                Behaviour::Returns(vec![nurse("https://x/2", "2025-05-01T10:00:01")]),
            ),
        ]
    };

    let first = run_once(&sources(), &opts(false)).await;
    assert_eq!(first.postings.len(), 1);
    assert_eq!(first.dedup_removed, 1);
    let p = &first.postings[0];
    assert_eq!(
        p.scraped_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "2025-05-01T10:00:01"
    );
    let expected_id = derive_id("Nurse", "Acme", Some("Amarillo, TX"));
    assert_eq!(p.id.as_deref(), Some(expected_id.as_str()));

    // a second run derives the same id
    let second = run_once(&sources(), &opts(true)).await;
    assert_eq!(second.postings[0].id, p.id);
}

#[tokio::test]
async fn failing_adapter_contributes_nothing_and_run_continues() {
    let sources = vec![
        MockSource::new("broken", Behaviour::Fails),
        MockSource::new(
            "ok",
            Behaviour::Returns(vec![RawPosting::new().with("title", "Clerk")]),
        ),
    ];
    let report = run_once(&sources, &opts(false)).await;
    assert_eq!(report.postings.len(), 1);
    assert_eq!(report.postings[0].company.as_deref(), Some("Mock Co"));
    assert_eq!(report.failed_sources(), vec!["broken"]);
    assert!(report.outcomes[0].error.as_deref().unwrap().contains("div.listing"));
}

#[tokio::test]
async fn slow_adapter_times_out() {
    let sources = vec![
        MockSource::new("slow", Behaviour::Hangs),
        MockSource::new(
            "fast",
            Behaviour::Returns(vec![RawPosting::new().with("title", "Driver")]),
        ),
    ];
    let report = run_once(
        &sources,
        &RunOptions {
            timeout: Duration::from_millis(100),
            parallel: true,
        },
    )
    .await;
    assert_eq!(report.failed_sources(), vec!["slow"]);
    assert_eq!(report.postings.len(), 1);
}

#[tokio::test]
async fn parallel_run_keeps_adapter_order() {
    let sources: Vec<_> = ["one", "two", "three"]
        .into_iter()
        .map(|code| {
            MockSource::new(
                code,
                Behaviour::Returns(vec![RawPosting::new().with("id", 1).with("title", code)]),
            )
        })
        .collect();
    let report = run_once(&sources, &opts(true)).await;
    let order: Vec<_> = report.postings.iter().map(|p| p.source.as_str()).collect();
    assert_eq!(order, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn all_adapters_failing_still_writes_empty_array() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("data/latest_jobs.json");
    let sources = vec![
        MockSource::new("a", Behaviour::Fails),
        MockSource::new("b", Behaviour::Fails),
    ];
    let report = run_and_write(&sources, &opts(false), &out)
        .await
        .expect("write succeeds");
    assert!(report.postings.is_empty());

    let body = std::fs::read_to_string(&out).unwrap();
    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v, serde_json::json!([]));
}

#[tokio::test]
async fn partial_adapter_failure_is_still_a_successful_run() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("latest_jobs.json");
    let sources = vec![
        MockSource::new("ok", Behaviour::Returns(vec![nurse("https://x/1", "2025-05-01T10:00:00")])),
        MockSource::new("broken", Behaviour::Fails),
    ];
    let report = run_and_write(&sources, &opts(true), &out)
        .await
        .expect("a failing adapter does not fail the run");
    assert_eq!(report.postings.len(), 1);
    assert_eq!(report.failed_sources(), vec!["broken"]);
    assert!(out.exists());
}

#[tokio::test]
async fn unwritable_target_fails_the_run_and_keeps_the_old_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("latest_jobs.json");
    let sources = vec![MockSource::new(
        "a",
        Behaviour::Returns(vec![nurse("https://x/1", "2025-05-01T10:00:00")]),
    )];
    run_and_write(&sources, &opts(false), &artifact).await.unwrap();
    let before = std::fs::read(&artifact).unwrap();

    // parent of the target is the existing artifact, a regular file
    let blocked = artifact.join("latest_jobs.json");
    let err = run_and_write(&sources, &opts(false), &blocked)
        .await
        .expect_err("nothing can be written under a regular file");
    assert_eq!(err.stage, "create_dir");
    assert_eq!(err.path, artifact);

    assert_eq!(std::fs::read(&artifact).unwrap(), before);
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("latest_jobs.json")]);
}
