//! Background task spawning shared by the input and event handlers.
//!
//! Every network or storage round trip runs in its own task and reports back
//! through the `AppEvent` channel, so the shell keeps reading commands while
//! the work is in flight.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

use crate::app::{App, AppEvent, Screen};
use crate::job::{identity_of, PageRequest, PageSource};
use crate::storage::{PersistError, StoreWriteError};
use crate::views::{PendingRemoval, PendingToggle};

/// Wraps a future to catch panics and convert them to errors.
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else if let Some(e) = panic.downcast_ref::<Box<dyn std::error::Error + Send>>() {
                e.to_string()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

async fn send_event(tx: &mpsc::Sender<AppEvent>, event: AppEvent, name: &'static str) {
    if let Err(e) = tx.send(event).await {
        tracing::warn!(error = %e, event = name, "Channel send failed (receiver dropped)");
    }
}

/// A panicked write is reported as a failed write so the view reverts.
fn panicked_write(error: String) -> PersistError {
    PersistError::Write(StoreWriteError(format!("task panicked: {error}")))
}

/// Fetch `request.page` in the background.
pub(super) fn spawn_page_fetch(app: &App, request: PageRequest, tx: &mpsc::Sender<AppEvent>) {
    let client = app.client.clone();
    let tx = tx.clone();
    tracing::debug!(page = request.page, generation = request.generation, "Spawning page fetch");

    tokio::spawn(async move {
        match catch_task_panic(client.fetch_page(request.page)).await {
            Ok(result) => {
                send_event(&tx, AppEvent::PageLoaded { request, result }, "PageLoaded").await;
            }
            Err(error) => {
                tracing::error!(error = %error, "Page fetch task panicked");
                send_event(
                    &tx,
                    AppEvent::TaskPanicked {
                        task: "page_fetch",
                        error,
                    },
                    "TaskPanicked",
                )
                .await;
            }
        }
    });
}

/// Read the bookmark snapshot for the activation of `screen`.
pub(super) fn spawn_bookmarks_load(app: &App, screen: Screen, tx: &mpsc::Sender<AppEvent>) {
    let store = app.store.clone();
    let tx = tx.clone();

    tokio::spawn(async move {
        match catch_task_panic(store.load_all()).await {
            Ok(set) => {
                send_event(&tx, AppEvent::BookmarksLoaded { screen, set }, "BookmarksLoaded")
                    .await;
            }
            Err(error) => {
                tracing::error!(error = %error, "Bookmark load task panicked");
                send_event(
                    &tx,
                    AppEvent::TaskPanicked {
                        task: "bookmarks_load",
                        error,
                    },
                    "TaskPanicked",
                )
                .await;
            }
        }
    });
}

/// Write a jobs-screen toggle.
pub(super) fn spawn_toggle_persist(app: &App, toggle: PendingToggle, tx: &mpsc::Sender<AppEvent>) {
    let store = app.store.clone();
    let tx = tx.clone();

    tokio::spawn(async move {
        let result = catch_task_panic(toggle.save(&store))
            .await
            .unwrap_or_else(|error| Err(panicked_write(error)));
        send_event(&tx, AppEvent::BookmarkToggled { toggle, result }, "BookmarkToggled").await;
    });
}

/// Write a bookmarks-screen removal.
pub(super) fn spawn_removal_persist(
    app: &App,
    removal: PendingRemoval,
    tx: &mpsc::Sender<AppEvent>,
) {
    let store = app.store.clone();
    let tx = tx.clone();

    tokio::spawn(async move {
        let result = catch_task_panic(removal.save(&store))
            .await
            .unwrap_or_else(|error| Err(panicked_write(error)));
        send_event(&tx, AppEvent::BookmarkRemoved { removal, result }, "BookmarkRemoved").await;
    });
}

/// Read-toggle-write the details posting.
pub(super) fn spawn_detail_toggle(app: &App, tx: &mpsc::Sender<AppEvent>) {
    let Some(details) = app.details.as_ref() else {
        return;
    };
    let posting = details.posting().clone();
    let store = app.store.clone();
    let tx = tx.clone();

    tokio::spawn(async move {
        let identity = identity_of(&posting);
        let result = catch_task_panic(store.toggle_persisted(&posting))
            .await
            .unwrap_or_else(|error| Err(panicked_write(error)));
        send_event(&tx, AppEvent::DetailToggled { identity, result }, "DetailToggled").await;
    });
}

/// Switch to `screen` and start its bookmark reload.
pub(super) fn activate(app: &mut App, screen: Screen, tx: &mpsc::Sender<AppEvent>) {
    app.screen = screen;
    app.needs_redraw = true;
    if screen == Screen::Bookmarks {
        app.bookmarks.begin_load();
    }
    spawn_bookmarks_load(app, screen, tx);
}
