//! Job postings: data model, transport and paginated feed.
//!
//! - [`posting`] - `JobPosting` and the `(title, company)` bookmark identity
//! - [`client`] - HTTP fetching of listing pages with retry and size limits
//! - [`aggregator`] - the page-accumulating feed state machine
//!
//! # Example
//!
//! ```ignore
//! use jobfeed::job::{FeedAggregator, JobsClient};
//!
//! let mut feed = FeedAggregator::new();
//! let request = feed.fetch_page();
//! feed.load(&client, request).await;
//! ```

pub mod aggregator;
pub mod client;
pub mod posting;

pub use aggregator::{ApplyOutcome, FeedAggregator, FeedState, PageRequest, StalePolicy};
pub use client::{FetchError, JobsClient, PageSource, DEFAULT_API_URL};
pub use posting::{identity_of, same_item, ItemIdentity, JobDetails, JobPosting};
