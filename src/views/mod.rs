//! View models for the three screens.
//!
//! Each view reloads the bookmark snapshot when it becomes active instead of
//! sharing a live reference, so the lists agree after a change made on another
//! screen. Every view offers a split `begin_*`/`finish_*` API for callers that
//! persist in a background task, and an inline async form of the same flow.

mod bookmarks;
mod details;
mod jobs;

pub use bookmarks::{BookmarksView, PendingRemoval};
pub use details::DetailsView;
pub use jobs::{JobsView, PendingToggle};
