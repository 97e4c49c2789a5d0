//! Terminal view of the latest artifact, with the dashboard's filters.
//!
//! ```text
//! browse [--file PATH] [--keyword K] [--company C] [--place P] [--companies]
//! ```

use std::path::PathBuf;

use horizons_jobs::config::{AggregatorConfig, DEFAULT_OUTPUT_PATH};
use horizons_jobs::ingest::text::truncate_chars;
use horizons_jobs::logging::init_tracing;
use horizons_jobs::snapshot::{companies, load_snapshot, SnapshotEntry, SnapshotFilter};

#[derive(Debug, Default)]
struct Args {
    file: Option<PathBuf>,
    filter: SnapshotFilter,
    list_companies: bool,
}

fn parse_args(argv: &[String]) -> Args {
    let mut args = Args::default();
    let mut it = argv.iter();
    while let Some(flag) = it.next() {
        match flag.as_str() {
            "--file" => args.file = it.next().map(PathBuf::from),
            "--keyword" => args.filter.keyword = it.next().cloned(),
            "--company" => args.filter.company = it.next().cloned(),
            "--place" => args.filter.place = it.next().cloned(),
            "--companies" => args.list_companies = true,
            other => eprintln!("ignoring unknown argument {other}"),
        }
    }
    args
}

fn cell(v: &Option<String>, width: usize) -> String {
    truncate_chars(v.as_deref().unwrap_or("-"), width)
}

fn print_row(e: &SnapshotEntry) {
    let when = e
        .scraped_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into());
    println!(
        "{:<44} {:<30} {:<24} {:<16} {}",
        cell(&e.title, 44),
        cell(&e.company, 30),
        cell(&e.location, 24),
        when,
        e.url.as_deref().unwrap_or("-")
    );
}

fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = parse_args(&std::env::args().skip(1).collect::<Vec<_>>());
    let path = args.file.clone().unwrap_or_else(|| {
        AggregatorConfig::load_default()
            .map(|c| c.output_path)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_PATH))
    });

    let entries = load_snapshot(&path);
    if args.list_companies {
        for c in companies(&entries) {
            println!("{c}");
        }
        return;
    }

    let rows = args.filter.apply(&entries);
    if rows.is_empty() {
        println!("No data: {} has no postings matching the filters.", path.display());
        return;
    }
    println!("{} postings ({} in snapshot)", rows.len(), entries.len());
    rows.iter().for_each(print_row);
}
