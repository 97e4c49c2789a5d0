// src/ingest/browser.rs
//! Headless Chrome plumbing for the browser-rendered career sites.
//!
//! Every adapter launches its own [`BrowserSession`] inside a blocking task;
//! the Chrome process dies when the session is dropped. Every session call is
//! bounded by the job's [`Deadline`], so the session is dropped within the
//! adapter budget on success, error and timeout alike.

use std::ffi::{OsStr, OsString};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::error::ScrapeError;

/// What a browser adapter needs to open a session.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub user_agent: String,
    /// Upper bound for the whole session, launch included.
    pub budget: Duration,
}

/// Stop signal shared by a blocking browser job and the task awaiting it: a
/// wall-clock deadline plus a flag raised when the awaiting side gives up.
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
    cancelled: Arc<AtomicBool>,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Time left; zero once cancelled.
    pub fn remaining(&self) -> Duration {
        if self.cancelled.load(Ordering::SeqCst) {
            return Duration::ZERO;
        }
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// `wanted`, shortened to what is left.
    pub fn cap(&self, wanted: Duration) -> Duration {
        wanted.min(self.remaining())
    }

    pub fn check(&self) -> Result<(), ScrapeError> {
        if self.expired() {
            Err(self.timeout_error())
        } else {
            Ok(())
        }
    }

    pub fn timeout_error(&self) -> ScrapeError {
        ScrapeError::Timeout {
            secs: self.budget.as_secs(),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

const COOKIE_BUTTON_WORDS: &[&str] = &["accept", "agree", "ok", "got it", "i accept", "close"];

pub struct BrowserSession {
    // declared first so it drops before the browser
    tab: Arc<Tab>,
    _browser: Browser,
    source: &'static str,
    deadline: Deadline,
}

const NAV_TIMEOUT: Duration = Duration::from_secs(60);

impl BrowserSession {
    pub fn launch(
        source: &'static str,
        user_agent: &str,
        deadline: Deadline,
    ) -> Result<Self, ScrapeError> {
        deadline.check()?;
        let ua_arg = OsString::from(format!("--user-agent={user_agent}"));
        let options = LaunchOptions {
            headless: true,
            sandbox: false,
            window_size: Some((1366, 900)),
            idle_browser_timeout: deadline.remaining(),
            args: vec![
                ua_arg.as_os_str(),
                OsStr::new("--disable-blink-features=AutomationControlled"),
            ],
            ..Default::default()
        };
        let browser =
            Browser::new(options).map_err(|e| ScrapeError::fetch("chrome://launch", "launch", e))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::fetch("chrome://new-tab", "launch", e))?;
        tab.set_default_timeout(deadline.cap(NAV_TIMEOUT));
        tab.set_user_agent(user_agent, Some("en-US,en;q=0.9"), None)
            .map_err(|e| ScrapeError::fetch("chrome://user-agent", "launch", e))?;
        tracing::debug!(source, "browser session opened");
        Ok(Self {
            tab,
            _browser: browser,
            source,
            deadline,
        })
    }

    /// `Err(Timeout)` once the job's budget is spent or the caller gave up.
    pub fn check(&self) -> Result<(), ScrapeError> {
        self.deadline.check()
    }

    /// Check the deadline and shrink the tab's per-call timeout to what is left.
    fn arm(&self) -> Result<(), ScrapeError> {
        self.deadline.check()?;
        self.tab.set_default_timeout(self.deadline.cap(NAV_TIMEOUT));
        Ok(())
    }

    /// Navigate and wait for the document to load.
    pub fn goto(&self, url: &str) -> Result<(), ScrapeError> {
        self.arm()?;
        self.tab
            .navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| self.or_timeout(ScrapeError::fetch(url, "navigate", e)))?;
        Ok(())
    }

    /// Best-effort click on a cookie/consent banner button.
    pub fn dismiss_cookie_banner(&self) {
        if self.arm().is_err() {
            return;
        }
        let Ok(buttons) = self.tab.find_elements("button") else {
            return;
        };
        for b in buttons {
            let text = b.get_inner_text().unwrap_or_default().trim().to_lowercase();
            if COOKIE_BUTTON_WORDS.contains(&text.as_str()) {
                if b.click().is_ok() {
                    tracing::debug!(source = self.source, button = %text, "dismissed cookie banner");
                }
                return;
            }
        }
    }

    /// Wait until `selector` matches. A miss within the budget means the page
    /// no longer has the expected structure; a spent budget is a timeout.
    pub fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), ScrapeError> {
        self.arm()?;
        self.tab
            .wait_for_element_with_custom_timeout(selector, self.deadline.cap(timeout))
            .map(|_| ())
            .map_err(|e| {
                self.or_timeout(ScrapeError::selector(self.current_url(), selector, e.to_string()))
            })
    }

    /// Report `err` as a timeout when the deadline is what cut the call short.
    fn or_timeout(&self, err: ScrapeError) -> ScrapeError {
        if self.deadline.expired() {
            self.deadline.timeout_error()
        } else {
            err
        }
    }

    /// Poll until `selector` matches more than `prev` elements.
    pub fn wait_for_count_above(&self, selector: &str, prev: usize, timeout: Duration) -> bool {
        let until = Instant::now() + self.deadline.cap(timeout);
        while Instant::now() < until && !self.deadline.expired() {
            if self.count(selector) > prev {
                return true;
            }
            std::thread::sleep(Duration::from_millis(250));
        }
        false
    }

    pub fn count(&self, selector: &str) -> usize {
        if self.arm().is_err() {
            return 0;
        }
        self.tab.find_elements(selector).map(|v| v.len()).unwrap_or(0)
    }

    /// Click the first element matching `selector`. `false` if none could be clicked.
    pub fn click_first(&self, selector: &str) -> bool {
        if self.arm().is_err() {
            return false;
        }
        match self.tab.find_element(selector) {
            Ok(el) => el.click().is_ok(),
            Err(_) => false,
        }
    }

    /// Click the first element matching `selector` whose normalized text
    /// satisfies `pred`.
    pub fn click_matching<F>(&self, selector: &str, pred: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        if self.arm().is_err() {
            return false;
        }
        let Ok(elements) = self.tab.find_elements(selector) else {
            return false;
        };
        for el in elements {
            let text = el.get_inner_text().unwrap_or_default();
            if pred(&crate::ingest::text::normalize_label(&text)) {
                let _ = el.scroll_into_view();
                return el.click().is_ok();
            }
        }
        false
    }

    /// Clear the first input matching `selector`, type `text` and press Enter.
    pub fn fill_and_submit(&self, selector: &str, text: &str) -> bool {
        if self.arm().is_err() {
            return false;
        }
        let Ok(input) = self.tab.find_element(selector) else {
            return false;
        };
        let typed = input
            .call_js_fn("function() { this.value = ''; }", vec![], false)
            .and_then(|_| input.click())
            .and_then(|_| self.tab.type_str(text))
            .and_then(|t| t.press_key("Enter"));
        typed.is_ok()
    }

    pub fn scroll_to_bottom(&self) {
        if self.arm().is_err() {
            return;
        }
        let _ = self
            .tab
            .evaluate("window.scrollTo(0, document.body.scrollHeight)", false);
    }

    pub fn content(&self) -> Result<String, ScrapeError> {
        self.arm()?;
        self.tab
            .get_content()
            .map_err(|e| ScrapeError::fetch(self.current_url(), "content", e))
    }

    pub fn current_url(&self) -> String {
        self.tab.get_url()
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        tracing::debug!(source = self.source, "browser session closed");
    }
}

/// Run a blocking browser job on the blocking pool, bounded by `budget`.
///
/// The job gets a [`Deadline`] for the same budget and must pass it to its
/// session. When the wait times out the deadline is cancelled, so the job's
/// next session call fails and the session is dropped.
pub async fn run_blocking<T, F>(budget: Duration, job: F) -> Result<T, ScrapeError>
where
    T: Send + 'static,
    F: FnOnce(Deadline) -> Result<T, ScrapeError> + Send + 'static,
{
    let deadline = Deadline::after(budget);
    let for_job = deadline.clone();
    let handle = tokio::task::spawn_blocking(move || job(for_job));
    match tokio::time::timeout(budget, handle).await {
        Ok(Ok(res)) => res,
        Ok(Err(join)) => Err(ScrapeError::fetch("chrome://task", "browser", join)),
        Err(_) => {
            deadline.cancel();
            Err(deadline.timeout_error())
        }
    }
}
