// tests/providers_rendered.rs
// Browser-driven adapters are exercised on saved rendered HTML; no browser is launched.
use horizons_jobs::ingest::normalize::normalize_batch;
use horizons_jobs::ingest::providers::{talon_lpe, ttuhsc, western_equipment, wtamu};
use horizons_jobs::ingest::types::{RawPosting, SourceMeta};

const WESTERN: &str = include_str!("fixtures/western_equipment.html");
const TALON: &str = include_str!("fixtures/talon_lpe.html");
const TTUHSC: &str = include_str!("fixtures/ttuhsc.html");
const WTAMU: &str = include_str!("fixtures/wtamu.html");

fn batch_time() -> chrono::NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2025, 6, 2)
        .and_then(|d| d.and_hms_opt(7, 30, 0))
        .unwrap()
}

#[test]
fn western_equipment_cards_skip_untitled_links() {
    let rows = western_equipment::parse_rendered(WESTERN).unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].get_str("id"), Some("204311"));
    assert_eq!(rows[0].get_str("title"), Some("Service Technician"));
    assert_eq!(rows[0].get_str("location"), Some("Amarillo, TX"));
    assert_eq!(
        rows[0].get_str("summary"),
        Some("Maintain and repair Case IH equipment.")
    );
    assert!(rows[0]
        .get_str("url")
        .unwrap()
        .starts_with("https://www.paycomonline.net/v4/ats/web.php/portal/"));

    // plain <h2> without the typography marker still gives a title
    assert_eq!(rows[1].get_str("id"), Some("204377"));
    assert_eq!(rows[1].get_str("title"), Some("Parts Specialist"));
    assert_eq!(rows[1].get_str("location"), None);
}

#[test]
fn western_equipment_ids_from_query_or_path() {
    assert_eq!(
        western_equipment::job_id_from_url("https://www.paycomonline.net/x?job=55").as_deref(),
        Some("55")
    );
    assert_eq!(
        western_equipment::job_id_from_url("https://www.paycomonline.net/portal/ABC/jobs/9001").as_deref(),
        Some("9001")
    );
    assert_eq!(western_equipment::job_id_from_url("not a url"), None);
}

#[test]
fn talon_rows_need_an_apply_link() {
    let rows = talon_lpe::parse_table(TALON).unwrap();
    let ids: Vec<_> = rows.iter().filter_map(|r| r.get_str("id")).collect();
    assert_eq!(ids, vec!["kq1z8m", "p0w2rt"]);
    assert_eq!(rows[1].get_str("title"), Some("Environmental Technician"));
    assert_eq!(rows[1].get_str("location"), Some("Midland, TX"));
    assert_eq!(
        rows[1].get_str("url"),
        Some("https://apply.teamengine.io/apply/p0w2rt/")
    );
}

#[test]
fn ttuhsc_results_keyed_by_job_id() {
    let page = ttuhsc::parse_results(TTUHSC).unwrap();
    assert_eq!(page.keys, vec!["921004", "921077"]);
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.records[0].get_str("title"), Some("Registered Nurse - Pediatrics"));
    assert_eq!(page.records[0].get_str("location"), Some("Amarillo, Texas"));
    assert!(ttuhsc::check_campus(&page.records).is_ok());
}

#[test]
fn ttuhsc_unfiltered_results_are_rejected() {
    let rows = vec![
        RawPosting::new().with("title", "Lab Tech").with("location", "Lubbock, Texas"),
        RawPosting::new().with("title", "Librarian").with("location", "El Paso, Texas"),
    ];
    let err = ttuhsc::check_campus(&rows).unwrap_err();
    assert_eq!(err.kind(), "selector");
    assert!(ttuhsc::check_campus(&[]).is_ok());
}

#[test]
fn wtamu_listing_uses_requisition_ids_and_detail_urls() {
    let start = &wtamu::start_urls()[0];
    let page = wtamu::parse_listing(WTAMU, start).unwrap();
    assert_eq!(page.keys, vec!["R-081234", "R-081300-1"]);

    let first = &page.records[0];
    assert_eq!(first.get_str("location"), Some("Canyon, TX"));
    assert_eq!(
        first.get_str("url"),
        Some("https://tamus.wd1.myworkdayjobs.com/en-US/WTAMU_External/job/Canyon-TX/Assistant-Professor-of-Nursing_R-081234")
    );
    assert_eq!(
        page.records[1].get_str("url"),
        Some("https://tamus.wd1.myworkdayjobs.com/en-US/WTAMU_External/job/Amarillo-TX/Student-Worker_R-081300-1")
    );

    let meta = SourceMeta {
        code: wtamu::CODE,
        company: wtamu::COMPANY,
    };
    let (postings, dropped) = normalize_batch(page.records, &meta, batch_time());
    assert_eq!(dropped, 0);
    assert_eq!(postings[1].id.as_deref(), Some("wtamu:R-081300-1"));
    assert_eq!(postings[1].company.as_deref(), Some("West Texas A&M University"));
    assert_eq!(postings[1].scraped_at, batch_time());
}

#[test]
fn wtamu_page_urls() {
    let start = &wtamu::start_urls()[1];
    assert_eq!(wtamu::page_url(start, 1), *start);
    assert_eq!(
        wtamu::page_url(start, 3),
        "https://tamus.wd1.myworkdayjobs.com/WTAMU_External?page=3"
    );
}
