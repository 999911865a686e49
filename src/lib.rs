//! Job listing client core.
//!
//! A paginated feed of postings fetched from a remote listing API, plus a
//! locally persisted set of bookmarks identified by `(title, company)`.
//!
//! - [`job`] - postings, the HTTP page source and the feed state machine
//! - [`storage`] - SQLite-backed key-value store and the bookmark snapshot
//! - [`views`] - jobs, bookmarks and details screen models
//! - [`app`] / [`ui`] - the interactive shell built on top

pub mod app;
pub mod config;
pub mod job;
pub mod storage;
pub mod ui;
pub mod util;
pub mod views;
