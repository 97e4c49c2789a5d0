// tests/ingest_normalize.rs
use chrono::NaiveDate;
use horizons_jobs::ingest::normalize::{derive_id, normalize_batch, normalize_record};
use horizons_jobs::ingest::types::{RawPosting, SourceMeta};
use horizons_jobs::NormalizationError;
use serde_json::{json, Value};

const META: SourceMeta = SourceMeta {
    code: "fmc",
    company: "FMC",
};

const CORE: [&str; 8] = [
    "id",
    "title",
    "company",
    "location",
    "salary",
    "url",
    "scraped_at",
    "source",
];

fn fetched_at() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(6, 30, 0)
        .unwrap()
}

#[test]
fn every_subset_of_missing_fields_still_yields_all_core_keys() {
    let optional = [
        ("job_id", json!("50211")),
        ("company", json!("Acme")),
        ("location_raw", json!("Amarillo, TX")),
        ("pay", json!("$20/hr")),
        ("url", json!("https://x.test/1")),
        ("scraped_at", json!("2025-05-30T12:00:00Z")),
    ];

    for mask in 0u32..(1 << optional.len()) {
        let mut raw = RawPosting::new().with("title", "Diesel Mechanic");
        for (i, (k, v)) in optional.iter().enumerate() {
            if mask & (1 << i) != 0 {
                raw.set(k, v.clone());
            }
        }
        let posting = normalize_record(raw, &META, fetched_at()).expect("title present");
        let v = serde_json::to_value(&posting).unwrap();
        let obj = v.as_object().unwrap();
        for key in CORE {
            assert!(obj.contains_key(key), "mask {mask:#b}: missing {key}");
        }
        assert_eq!(obj["source"], "fmc");
        assert!(!obj["id"].is_null());
        assert_eq!(obj["scraped_at"].as_str().unwrap().len(), 19);
    }
}

#[test]
fn core_fields_come_first_in_artifact_order() {
    let raw = RawPosting::new()
        .with("title", "Welder")
        .with("department", "Fabrication");
    let posting = normalize_record(raw, &META, fetched_at()).unwrap();
    let text = serde_json::to_string(&posting).unwrap();

    let positions: Vec<usize> = CORE
        .iter()
        .chain(std::iter::once(&"extra"))
        .map(|k| text.find(&format!("\"{k}\":")).expect(k))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
    assert!(text.contains(r#""scraped_at":"2025-06-01T06:30:00""#));
}

#[test]
fn derived_id_is_stable_and_content_based() {
    let raw = || {
        RawPosting::new()
            .with("title", "Nurse")
            .with("company", "Acme")
            .with("location", "Amarillo, TX")
    };
    let a = normalize_record(raw(), &META, fetched_at()).unwrap();
    let b = normalize_record(raw().with("url", "https://x/2"), &META, fetched_at()).unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(
        a.id.as_deref(),
        Some(derive_id("Nurse", "Acme", Some("Amarillo, TX")).as_str())
    );
    assert_eq!(a.id.as_ref().map(String::len), Some(64));

    let elsewhere = normalize_record(raw().with("location", "Lubbock, TX"), &META, fetched_at()).unwrap();
    assert_ne!(a.id, elsewhere.id);
}

#[test]
fn native_ids_are_namespaced_by_source() {
    let raw = RawPosting::new().with("id", 7781).with("title", "Driver");
    let p = normalize_record(raw, &META, fetched_at()).unwrap();
    assert_eq!(p.id.as_deref(), Some("fmc:7781"));
}

#[test]
fn record_timestamp_wins_and_is_converted_to_utc() {
    let raw = RawPosting::new()
        .with("title", "Driver")
        .with("scraped_at", "2025-05-30T07:15:42.913-05:00");
    let p = normalize_record(raw, &META, fetched_at()).unwrap();
    assert_eq!(
        p.scraped_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "2025-05-30T12:15:42"
    );

    let garbled = RawPosting::new()
        .with("title", "Driver")
        .with("scraped_at", "yesterday");
    let p = normalize_record(garbled, &META, fetched_at()).unwrap();
    assert_eq!(p.scraped_at, fetched_at());
}

#[test]
fn unmappable_records_are_dropped_not_fatal() {
    let raws = vec![
        RawPosting::new().with("title", "Keeps"),
        RawPosting::new().with("title", "   "),
        RawPosting::new().with("location", "Amarillo, TX"),
        RawPosting::new()
            .with("title", "Nested")
            .with("location", json!({"city": "Canyon"})),
    ];
    let (kept, dropped) = normalize_batch(raws, &META, fetched_at());
    assert_eq!(kept.len(), 1);
    assert_eq!(dropped, 3);

    let err = normalize_record(
        RawPosting::new().with("title", json!(["a", "b"])),
        &META,
        fetched_at(),
    )
    .unwrap_err();
    assert_eq!(err, NormalizationError::Unmappable { field: "title" });
}

#[test]
fn extras_keep_unknown_fields_and_drop_nulls() {
    let raw = RawPosting::new()
        .with("title", "<b>Parts&nbsp;Counter</b>")
        .with("source", "somebody else")
        .with("city", "Amarillo")
        .with("postal_code", Value::Null);
    let p = normalize_record(raw, &META, fetched_at()).unwrap();
    assert_eq!(p.title.as_deref(), Some("Parts Counter"));
    assert_eq!(p.source, "fmc");
    assert_eq!(p.company.as_deref(), Some("FMC"));
    assert_eq!(p.extra.get("city"), Some(&json!("Amarillo")));
    assert!(!p.extra.contains_key("postal_code"));
    assert!(!p.extra.contains_key("source"));
}
