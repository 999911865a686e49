//! Application event handling.
//!
//! Applies the results of background tasks (page fetches, bookmark loads and
//! writes) to the views and sets the status line.

use crate::app::{App, AppEvent, Screen};
use crate::job::ApplyOutcome;

/// Apply one background task result to `app`.
pub fn handle_app_event(app: &mut App, event: AppEvent) {
    app.needs_redraw = true;
    match event {
        AppEvent::PageLoaded { request, result } => {
            match app.jobs.feed_mut().apply(request, result) {
                ApplyOutcome::Replaced(count) => {
                    tracing::info!(count, "Feed loaded");
                    if count == 0 {
                        app.set_status("No jobs available");
                    }
                }
                ApplyOutcome::Appended(0) => app.set_status("No more jobs"),
                ApplyOutcome::Appended(count) => {
                    app.set_status(format!("Loaded {count} more jobs"));
                }
                ApplyOutcome::Failed => {
                    app.set_status(format!("Failed to load page {}", request.page));
                }
                ApplyOutcome::Stale => {
                    // Nothing changed on screen
                    app.needs_redraw = false;
                }
            }
        }

        AppEvent::BookmarksLoaded { screen, set } => match screen {
            Screen::Jobs => app.jobs.sync_bookmarks(set),
            Screen::Bookmarks => app.bookmarks.finish_load(set),
            Screen::Details => {
                if let Some(details) = app.details.as_mut() {
                    details.on_enter(&set);
                }
            }
        },

        AppEvent::BookmarkToggled { toggle, result } => {
            match app.jobs.finish_toggle(&toggle, result) {
                Ok(true) => app.set_status("Bookmarked"),
                Ok(false) => app.set_status("Bookmark removed"),
                Err(e) => app.set_status(format!("Could not save bookmark: {e}")),
            }
        }

        AppEvent::BookmarkRemoved { removal, result } => {
            match app.bookmarks.finish_remove(&removal, result) {
                Ok(()) => app.set_status("Bookmark removed"),
                Err(e) => app.set_status(format!("Could not remove bookmark: {e}")),
            }
        }

        AppEvent::DetailToggled { identity, result } => {
            if app.details_identity().as_ref() != Some(&identity) {
                // Details closed or replaced while the write was in flight
                tracing::debug!(item = %identity, "Detail toggle settled off-screen");
                if let Err(e) = result {
                    app.set_status(format!("Could not save bookmark: {e}"));
                }
                return;
            }
            let Some(details) = app.details.as_mut() else {
                return;
            };
            match details.finish_toggle(result) {
                Ok(true) => app.set_status("Bookmarked"),
                Ok(false) => app.set_status("Bookmark removed"),
                Err(e) => app.set_status(format!("Could not save bookmark: {e}")),
            }
        }

        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task, error = %error, "Background task panicked");
            app.set_status(format!("Internal error in {task}, try 'refresh'"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{FeedAggregator, FeedState, FetchError, JobPosting, JobsClient};
    use crate::storage::{BookmarkSet, BookmarkStore, Database, PersistError, StoreWriteError};
    use url::Url;

    async fn test_app() -> App {
        let db = Database::open(":memory:").await.unwrap();
        let client = JobsClient::new(
            reqwest::Client::new(),
            Url::parse("http://127.0.0.1:9/jobs").unwrap(),
        );
        App::new(client, BookmarkStore::new(db), FeedAggregator::new())
    }

    fn page(titles: &[&str]) -> Vec<JobPosting> {
        titles.iter().map(|t| JobPosting::new(*t, "ABC")).collect()
    }

    #[tokio::test]
    async fn test_page_loaded_updates_feed() {
        let mut app = test_app().await;
        let request = app.jobs.feed_mut().fetch_page();
        handle_app_event(
            &mut app,
            AppEvent::PageLoaded {
                request,
                result: Ok(page(&["Cook"])),
            },
        );
        assert_eq!(app.jobs.feed().items().len(), 1);
        assert_eq!(app.jobs.feed().state(), &FeedState::Loaded);
    }

    #[tokio::test]
    async fn test_page_failure_sets_status() {
        let mut app = test_app().await;
        let request = app.jobs.feed_mut().fetch_page();
        handle_app_event(
            &mut app,
            AppEvent::PageLoaded {
                request,
                result: Err(FetchError::Timeout),
            },
        );
        assert!(app.jobs.feed().error().is_some());
        assert_eq!(app.take_status().as_deref(), Some("Failed to load page 1"));
    }

    #[tokio::test]
    async fn test_empty_later_page() {
        let mut app = test_app().await;
        let first = app.jobs.feed_mut().fetch_page();
        handle_app_event(&mut app, AppEvent::PageLoaded { request: first, result: Ok(page(&["Cook"])) });
        let second = app.jobs.feed_mut().next_page().unwrap();
        handle_app_event(&mut app, AppEvent::PageLoaded { request: second, result: Ok(vec![]) });
        assert_eq!(app.take_status().as_deref(), Some("No more jobs"));
    }

    #[tokio::test]
    async fn test_bookmarks_loaded_routes_by_screen() {
        let mut app = test_app().await;
        let set = BookmarkSet::new().with(&JobPosting::new("Cook", "ABC"));

        app.bookmarks.begin_load();
        handle_app_event(
            &mut app,
            AppEvent::BookmarksLoaded {
                screen: Screen::Bookmarks,
                set: set.clone(),
            },
        );
        assert_eq!(app.bookmarks.items().len(), 1);
        assert!(!app.bookmarks.is_refreshing());
        assert!(app.jobs.bookmarks().is_empty());

        handle_app_event(&mut app, AppEvent::BookmarksLoaded { screen: Screen::Jobs, set });
        assert_eq!(app.jobs.bookmarks().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_toggle_reverts_jobs_marker() {
        let mut app = test_app().await;
        let request = app.jobs.feed_mut().fetch_page();
        app.jobs.feed_mut().apply(request, Ok(page(&["Cook"])));
        let toggle = app.jobs.begin_toggle(0).unwrap();

        handle_app_event(
            &mut app,
            AppEvent::BookmarkToggled {
                toggle,
                result: Err(PersistError::Write(StoreWriteError("full".into()))),
            },
        );
        assert!(app.jobs.bookmarks().is_empty());
        assert!(app
            .take_status()
            .is_some_and(|s| s.starts_with("Could not save bookmark")));
    }

    #[tokio::test]
    async fn test_detail_toggle_for_closed_details_is_ignored() {
        let mut app = test_app().await;
        let identity = JobPosting::new("Cook", "ABC").identity();
        handle_app_event(&mut app, AppEvent::DetailToggled { identity, result: Ok(true) });
        assert!(app.details.is_none());
        assert!(app.take_status().is_none());
    }

    #[tokio::test]
    async fn test_task_panic_reported() {
        let mut app = test_app().await;
        handle_app_event(
            &mut app,
            AppEvent::TaskPanicked {
                task: "page_fetch",
                error: "boom".into(),
            },
        );
        assert!(app.take_status().is_some_and(|s| s.contains("page_fetch")));
    }
}
