use crate::job::{identity_of, same_item, FeedAggregator, JobPosting};
use crate::storage::{BookmarkSet, BookmarkStore, KeyValueStore, PersistError};

/// An optimistic bookmark change waiting for its write to complete.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingToggle {
    pub posting: JobPosting,
    /// Direction of the change: `true` adds, `false` removes.
    pub added: bool,
}

impl PendingToggle {
    /// Write this change, and only this change, to `store`.
    pub async fn save<S: KeyValueStore>(&self, store: &BookmarkStore<S>) -> Result<(), PersistError> {
        store.set_bookmarked(&self.posting, self.added).await.map(drop)
    }
}

/// The live feed screen: paginated postings plus a mirror of the bookmark set
/// used for the per-card bookmark marker.
///
/// The mirror is always `confirmed` with the pending changes applied on top.
/// `confirmed` only moves on an activation reload or a successful write, so a
/// failed change drops out of the mirror without touching any other item.
#[derive(Debug, Default)]
pub struct JobsView {
    feed: FeedAggregator,
    confirmed: BookmarkSet,
    bookmarks: BookmarkSet,
    pending: Vec<PendingToggle>,
}

impl JobsView {
    pub fn new(feed: FeedAggregator) -> Self {
        Self {
            feed,
            ..Self::default()
        }
    }

    pub fn feed(&self) -> &FeedAggregator {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut FeedAggregator {
        &mut self.feed
    }

    pub fn bookmarks(&self) -> &BookmarkSet {
        &self.bookmarks
    }

    pub fn posting(&self, index: usize) -> Option<&JobPosting> {
        self.feed.items().get(index)
    }

    pub fn is_bookmarked(&self, posting: &JobPosting) -> bool {
        self.bookmarks.contains(posting)
    }

    /// A write for this posting's identity is in flight; its toggle is disabled.
    pub fn is_pending(&self, posting: &JobPosting) -> bool {
        self.pending.iter().any(|t| same_item(&t.posting, posting))
    }

    /// Take a freshly loaded snapshot (activation). Changes still in flight
    /// stay applied on top of it.
    pub fn sync_bookmarks(&mut self, set: BookmarkSet) {
        self.confirmed = set;
        self.rebuild_mirror();
    }

    fn rebuild_mirror(&mut self) {
        self.bookmarks = self.pending.iter().fold(self.confirmed.clone(), |set, t| {
            if t.added {
                set.with(&t.posting)
            } else {
                set.without(&t.posting)
            }
        });
    }

    /// Flip the bookmark state of the posting at `index` in the mirror.
    ///
    /// Returns `None` for an out-of-range index or while a write for the same
    /// identity is pending.
    pub fn begin_toggle(&mut self, index: usize) -> Option<PendingToggle> {
        let posting = self.feed.items().get(index)?.clone();
        if self.is_pending(&posting) {
            tracing::debug!(item = %identity_of(&posting), "Toggle ignored while write pending");
            return None;
        }

        let toggle = PendingToggle {
            added: !self.bookmarks.contains(&posting),
            posting,
        };
        self.pending.push(toggle.clone());
        self.rebuild_mirror();
        Some(toggle)
    }

    /// Settle a toggle. A failed write drops that item's change from the
    /// mirror; other pending changes are kept.
    ///
    /// Returns whether the posting ended up added, or the write error.
    pub fn finish_toggle(
        &mut self,
        toggle: &PendingToggle,
        result: Result<(), PersistError>,
    ) -> Result<bool, PersistError> {
        self.pending.retain(|t| !same_item(&t.posting, &toggle.posting));
        let outcome = match result {
            Ok(()) => {
                self.confirmed = if toggle.added {
                    self.confirmed.with(&toggle.posting)
                } else {
                    self.confirmed.without(&toggle.posting)
                };
                Ok(toggle.added)
            }
            Err(e) => {
                tracing::warn!(item = %identity_of(&toggle.posting), error = %e, "Bookmark write failed, reverting");
                Err(e)
            }
        };
        self.rebuild_mirror();
        outcome
    }

    /// Reload the mirror from `store`.
    pub async fn activate<S: KeyValueStore>(&mut self, store: &BookmarkStore<S>) {
        let set = store.load_all().await;
        self.sync_bookmarks(set);
    }

    /// Toggle and persist inline. `None` when the toggle was not started.
    pub async fn toggle<S: KeyValueStore>(
        &mut self,
        store: &BookmarkStore<S>,
        index: usize,
    ) -> Option<Result<bool, PersistError>> {
        let pending = self.begin_toggle(index)?;
        let result = pending.save(store).await;
        Some(self.finish_toggle(&pending, result))
    }
}
