// src/ingest/pagination.rs
//! Page cursor shared by the paginated adapters (HTTP and browser driven).

use std::collections::HashSet;

use crate::ingest::types::RawPosting;

/// One fetched result page.
#[derive(Debug, Default)]
pub struct Page {
    pub records: Vec<RawPosting>,
    /// Keys used to detect a site serving the same page again.
    pub keys: Vec<String>,
    /// Total result count the site advertises, if it shows one.
    pub advertised_total: Option<usize>,
    /// The site says there is nothing after this page.
    pub last: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EmptyPage,
    LastPage,
    TotalReached,
    NoNewResults,
    PageCeiling,
}

/// Drives `1..=max_pages` and decides when to stop.
#[derive(Debug)]
pub struct Pagination {
    max_pages: usize,
    next: usize,
    collected: usize,
    total: Option<usize>,
    seen: HashSet<String>,
    stopped: Option<StopReason>,
}

impl Pagination {
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages: max_pages.max(1),
            next: 1,
            collected: 0,
            total: None,
            seen: HashSet::new(),
            stopped: None,
        }
    }

    /// 1-based number of the page to fetch next, or `None` once stopped.
    pub fn next_page(&mut self) -> Option<usize> {
        if self.stopped.is_some() {
            return None;
        }
        if self.next > self.max_pages {
            self.stopped = Some(StopReason::PageCeiling);
            return None;
        }
        Some(self.next)
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }

    /// Record a fetched page, appending its new records to `out`.
    /// Returns `false` when pagination is over.
    pub fn accept(&mut self, page: Page, out: &mut Vec<RawPosting>) -> bool {
        self.next += 1;
        if page.advertised_total.is_some() {
            self.total = page.advertised_total;
        }

        if page.records.is_empty() {
            self.stopped = Some(StopReason::EmptyPage);
            return false;
        }

        let fresh = if page.keys.is_empty() {
            page.records.len()
        } else {
            page.keys
                .into_iter()
                .filter(|k| self.seen.insert(k.clone()))
                .count()
        };
        if fresh == 0 {
            self.stopped = Some(StopReason::NoNewResults);
            return false;
        }

        self.collected += page.records.len();
        out.extend(page.records);

        if page.last {
            self.stopped = Some(StopReason::LastPage);
            return false;
        }
        if self.total.is_some_and(|total| self.collected >= total) {
            self.stopped = Some(StopReason::TotalReached);
            return false;
        }
        if self.next > self.max_pages {
            self.stopped = Some(StopReason::PageCeiling);
            return false;
        }
        true
    }
}
