use std::borrow::Cow;
use std::time::Duration;

use anyhow::Result;
use reqwest::redirect::Policy;

use crate::config::Config;
use crate::job::{
    identity_of, FeedAggregator, FetchError, ItemIdentity, JobPosting, JobsClient, PageRequest,
};
use crate::storage::{BookmarkSet, BookmarkStore, Database, PersistError};
use crate::views::{BookmarksView, DetailsView, JobsView, PendingRemoval, PendingToggle};

/// Redirect policy for the listing API: at most 3 hops, loops rejected.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// Shared HTTP client with connection pooling.
///
/// `request_timeout` bounds a whole request including its body; [`JobsClient`]
/// applies the same limit per attempt on top.
pub fn build_http_client(request_timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .redirect(create_redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(request_timeout)
        .build()?;
    Ok(client)
}

/// Listing client configured from `config`.
pub fn build_jobs_client(config: &Config, http: reqwest::Client) -> Result<JobsClient> {
    let client = JobsClient::new(http, config.endpoint()?)
        .with_timeout(config.request_timeout())
        .with_retries(config.max_retries, config.retry_base_delay());
    Ok(client)
}

/// Which screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Jobs,
    Bookmarks,
    Details,
}

/// Results of background tasks, delivered to the event loop.
#[derive(Debug)]
pub enum AppEvent {
    PageLoaded {
        request: PageRequest,
        result: Result<Vec<JobPosting>, FetchError>,
    },
    /// A snapshot read for the activation of `screen`.
    BookmarksLoaded {
        screen: Screen,
        set: BookmarkSet,
    },
    BookmarkToggled {
        toggle: PendingToggle,
        result: Result<(), PersistError>,
    },
    BookmarkRemoved {
        removal: PendingRemoval,
        result: Result<(), PersistError>,
    },
    DetailToggled {
        identity: ItemIdentity,
        result: Result<bool, PersistError>,
    },
    /// A background task panicked.
    ///
    /// - `task`: name of the task (e.g. "page_fetch", "bookmarks_load")
    /// - `error`: the panic message
    TaskPanicked {
        task: &'static str,
        error: String,
    },
}

pub struct App {
    pub client: JobsClient,
    pub store: BookmarkStore<Database>,
    pub screen: Screen,
    /// List screen to go back to from details.
    pub return_to: Screen,
    pub jobs: JobsView,
    pub bookmarks: BookmarksView,
    pub details: Option<DetailsView>,
    pub needs_redraw: bool,
    status_message: Option<Cow<'static, str>>,
}

impl App {
    pub fn new(client: JobsClient, store: BookmarkStore<Database>, feed: FeedAggregator) -> Self {
        Self {
            client,
            store,
            screen: Screen::Jobs,
            return_to: Screen::Jobs,
            jobs: JobsView::new(feed),
            bookmarks: BookmarksView::new(),
            details: None,
            needs_redraw: true,
            status_message: None,
        }
    }

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some(msg.into());
    }

    pub fn take_status(&mut self) -> Option<Cow<'static, str>> {
        self.status_message.take()
    }

    /// Posting at `index` on the current list screen.
    pub fn listed_posting(&self, index: usize) -> Option<&JobPosting> {
        match self.screen {
            Screen::Jobs => self.jobs.posting(index),
            Screen::Bookmarks => self.bookmarks.items().get(index),
            Screen::Details => None,
        }
    }

    /// Open the details screen for the posting at `index` of the current list.
    pub fn open_details(&mut self, index: usize) -> Option<&DetailsView> {
        let posting = self.listed_posting(index)?.clone();
        tracing::debug!(item = %identity_of(&posting), "Opening details");
        self.return_to = self.screen;
        self.screen = Screen::Details;
        self.details = Some(DetailsView::new(posting));
        self.needs_redraw = true;
        self.details.as_ref()
    }

    /// Leave details for the list it was opened from.
    pub fn close_details(&mut self) -> Screen {
        self.details = None;
        self.screen = self.return_to;
        self.needs_redraw = true;
        self.screen
    }

    /// Identity of the posting on the details screen.
    pub fn details_identity(&self) -> Option<ItemIdentity> {
        self.details.as_ref().map(|d| identity_of(d.posting()))
    }
}
