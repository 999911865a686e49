//! Paginated feed accumulation.
//!
//! [`FeedAggregator`] is a synchronous state machine. Starting a fetch hands
//! back a [`PageRequest`] ticket; the caller performs the network round trip
//! however it likes (inline via [`FeedAggregator::load`], or in a spawned task)
//! and feeds the outcome back through [`FeedAggregator::apply`]. Splitting the
//! two halves is what lets the interactive shell keep taking commands while a
//! page is in flight.

use crate::job::client::{FetchError, PageSource};
use crate::job::posting::JobPosting;

/// Lifecycle of the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    Loading,
    Loaded,
    /// Last fetch failed. Items loaded before the failure are still present.
    Error(String),
}

/// How responses that were superseded by a newer request are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Apply every response as it lands; the last one to arrive wins.
    #[default]
    LastWriteWins,
    /// Drop responses whose generation is older than the latest request.
    LatestOnly,
}

/// Ticket for one in-flight page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub generation: u64,
    /// Started by `refresh()` rather than pagination or retry.
    pub refresh: bool,
}

/// Outcome of applying a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Page 1 replaced the feed.
    Replaced(usize),
    /// A later page was appended.
    Appended(usize),
    Failed,
    /// Response was dropped by [`StalePolicy::LatestOnly`].
    Stale,
}

#[derive(Debug)]
pub struct FeedAggregator {
    items: Vec<JobPosting>,
    page: u32,
    state: FeedState,
    generation: u64,
    refreshing: bool,
    policy: StalePolicy,
    /// 0 = unlimited
    max_items: usize,
}

impl Default for FeedAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedAggregator {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            state: FeedState::Idle,
            generation: 0,
            refreshing: false,
            policy: StalePolicy::default(),
            max_items: 0,
        }
    }

    pub fn with_policy(mut self, policy: StalePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cap retained items, evicting the oldest first. 0 disables the cap.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn items(&self) -> &[JobPosting] {
        &self.items
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == FeedState::Loading
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            FeedState::Error(msg) => Some(msg),
            _ => None,
        }
    }

    /// Start a fetch for the current page counter.
    ///
    /// Not guarded against an in-flight fetch; use [`next_page`](Self::next_page)
    /// or [`retry`](Self::retry) from user-triggered paths.
    pub fn fetch_page(&mut self) -> PageRequest {
        self.issue(false)
    }

    /// Advance to the next page.
    ///
    /// # Returns
    ///
    /// The request for `page + 1`, or `None` while any fetch is in flight.
    /// A `None` leaves the page counter where it was, so repeated calls during
    /// one load issue a single request.
    pub fn next_page(&mut self) -> Option<PageRequest> {
        if self.is_loading() {
            tracing::debug!(page = self.page, "Ignoring next page while loading");
            return None;
        }
        self.page += 1;
        Some(self.issue(false))
    }

    /// Restart the session from page 1.
    ///
    /// # Behavior
    ///
    /// - Resets the page counter to 1 and sets the refreshing flag
    /// - Clears an `Error` state
    /// - Issued even when another fetch is in flight; that fetch is not
    ///   cancelled and its response is handled by the [`StalePolicy`]
    ///
    /// Items stay on screen until the page-1 response replaces them.
    pub fn refresh(&mut self) -> PageRequest {
        self.page = 1;
        if matches!(self.state, FeedState::Error(_)) {
            self.state = FeedState::Idle;
        }
        self.refreshing = true;
        self.issue(true)
    }

    /// Re-issue the current page after a failure.
    ///
    /// # Returns
    ///
    /// A request for the page that failed (page 1 if the first load failed),
    /// or `None` outside the `Error` state.
    pub fn retry(&mut self) -> Option<PageRequest> {
        if !matches!(self.state, FeedState::Error(_)) {
            tracing::debug!(state = ?self.state, "Retry ignored outside error state");
            return None;
        }
        Some(self.issue(false))
    }

    fn issue(&mut self, refresh: bool) -> PageRequest {
        self.generation += 1;
        self.state = FeedState::Loading;
        let request = PageRequest {
            page: self.page,
            generation: self.generation,
            refresh,
        };
        tracing::debug!(
            page = request.page,
            generation = request.generation,
            refresh,
            "Page fetch started"
        );
        request
    }

    /// Apply the outcome of `request`.
    ///
    /// # Arguments
    ///
    /// * `request` - the ticket returned when the fetch was started
    /// * `result` - the postings for `request.page`, or why the fetch failed
    ///
    /// # Behavior
    ///
    /// - A superseded response (older generation) is dropped under
    ///   [`StalePolicy::LatestOnly`] and applied normally otherwise
    /// - Page 1 replaces the feed, any other page appends in server order;
    ///   duplicates across pages are kept
    /// - The item cap, if any, evicts the oldest items after appending
    /// - A failure moves to `Error` and leaves the items untouched
    /// - The refreshing flag clears when the refresh's own response lands or
    ///   when a current response lands
    ///
    /// # Returns
    ///
    /// What happened to the feed, for status reporting.
    pub fn apply(
        &mut self,
        request: PageRequest,
        result: Result<Vec<JobPosting>, FetchError>,
    ) -> ApplyOutcome {
        let superseded = request.generation < self.generation;
        if superseded && self.policy == StalePolicy::LatestOnly {
            tracing::debug!(
                expected = self.generation,
                got = request.generation,
                page = request.page,
                "Ignoring superseded page response"
            );
            return ApplyOutcome::Stale;
        }

        if request.refresh || !superseded {
            self.refreshing = false;
        }

        match result {
            Ok(jobs) => {
                let count = jobs.len();
                let outcome = if request.page == 1 {
                    self.items = jobs;
                    ApplyOutcome::Replaced(count)
                } else {
                    self.items.extend(jobs);
                    ApplyOutcome::Appended(count)
                };
                self.evict_overflow();
                self.state = FeedState::Loaded;
                tracing::debug!(
                    page = request.page,
                    count,
                    total = self.items.len(),
                    "Page applied"
                );
                outcome
            }
            Err(e) => {
                tracing::warn!(page = request.page, error = %e, "Page fetch failed");
                self.state = FeedState::Error(e.to_string());
                ApplyOutcome::Failed
            }
        }
    }

    fn evict_overflow(&mut self) {
        if self.max_items == 0 || self.items.len() <= self.max_items {
            return;
        }
        let excess = self.items.len() - self.max_items;
        self.items.drain(..excess);
        tracing::debug!(evicted = excess, "Evicted oldest feed items");
    }

    /// Drive `request` to completion against `source`.
    ///
    /// Equivalent to awaiting `source.fetch_page(request.page)` and passing
    /// the result to [`apply`](Self::apply).
    pub async fn load<S: PageSource>(&mut self, source: &S, request: PageRequest) -> ApplyOutcome {
        let result = source.fetch_page(request.page).await;
        self.apply(request, result)
    }
}
