// tests/ingest_dedup.rs
use chrono::{NaiveDate, NaiveDateTime};
use horizons_jobs::ingest::normalize::normalize_record;
use horizons_jobs::ingest::types::{RawPosting, SourceMeta};
use horizons_jobs::{dedup, Posting};

fn at(sec: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 1)
        .unwrap()
        .and_hms_opt(8, 0, sec)
        .unwrap()
}

fn posting(code: &'static str, raw: RawPosting, sec: u32) -> Posting {
    let meta = SourceMeta {
        code,
        company: "Acme",
    };
    normalize_record(raw, &meta, at(sec)).unwrap()
}

fn sample() -> Vec<Posting> {
    vec![
        posting("yhmc", RawPosting::new().with("title", "Welder").with("location", "Amarillo, TX"), 5),
        posting("fmc", RawPosting::new().with("title", "Welder").with("location", "Amarillo, TX").with("url", "https://x/9"), 7),
        posting("fmc", RawPosting::new().with("job_id", "11").with("title", "Driver"), 1),
        posting("fmc", RawPosting::new().with("job_id", "11").with("title", "Driver"), 3),
        posting("yhmc", RawPosting::new().with("title", "Clerk"), 2),
    ]
}

#[test]
fn merging_twice_does_not_grow_or_change() {
    let (once, removed) = dedup(sample());
    assert_eq!(removed, 2);
    assert_eq!(once.len(), 3);

    let (twice, removed_again) = dedup(once.clone());
    assert_eq!(removed_again, 0);
    assert_eq!(twice, once);

    // same input sequence appended to itself collapses to the same set
    let mut doubled = sample();
    doubled.extend(sample());
    let (merged, _) = dedup(doubled);
    assert_eq!(merged, once);
}

#[test]
fn representative_is_richest_with_earliest_time() {
    let (out, _) = dedup(sample());
    let welder = &out[0];
    assert_eq!(welder.title.as_deref(), Some("Welder"));
    assert_eq!(welder.url.as_deref(), Some("https://x/9"));
    assert_eq!(welder.source, "fmc");
    assert_eq!(welder.scraped_at, at(5));

    let driver = &out[1];
    assert_eq!(driver.id.as_deref(), Some("fmc:11"));
    assert_eq!(driver.scraped_at, at(1));
}

#[test]
fn first_appearance_order_is_kept() {
    let (out, _) = dedup(sample());
    let titles: Vec<_> = out.iter().filter_map(|p| p.title.as_deref()).collect();
    assert_eq!(titles, vec!["Welder", "Driver", "Clerk"]);
}
