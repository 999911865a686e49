use crate::job::JobPosting;
use crate::storage::{BookmarkSet, BookmarkStore, KeyValueStore, PersistError};

/// One posting, opened from either list.
#[derive(Debug, Clone)]
pub struct DetailsView {
    posting: JobPosting,
    bookmarked: bool,
    pending: bool,
}

impl DetailsView {
    pub fn new(posting: JobPosting) -> Self {
        Self {
            posting,
            bookmarked: false,
            pending: false,
        }
    }

    pub fn posting(&self) -> &JobPosting {
        &self.posting
    }

    pub fn is_bookmarked(&self) -> bool {
        self.bookmarked
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Re-derive the bookmarked flag from a freshly loaded snapshot.
    pub fn on_enter(&mut self, current: &BookmarkSet) {
        self.bookmarked = current.contains(&self.posting);
    }

    /// Flip the flag optimistically. False while a write is in flight.
    pub fn begin_toggle(&mut self) -> bool {
        if self.pending {
            tracing::debug!("Detail toggle ignored while write pending");
            return false;
        }
        self.pending = true;
        self.bookmarked = !self.bookmarked;
        true
    }

    /// Settle the write started by [`begin_toggle`](Self::begin_toggle).
    ///
    /// On success the flag follows what the store actually did, which differs
    /// from the optimistic guess only if another writer changed the snapshot
    /// in between.
    pub fn finish_toggle(&mut self, result: Result<bool, PersistError>) -> Result<bool, PersistError> {
        self.pending = false;
        match result {
            Ok(added) => {
                self.bookmarked = added;
                Ok(added)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Detail bookmark write failed, reverting");
                self.bookmarked = !self.bookmarked;
                Err(e)
            }
        }
    }

    pub async fn enter<S: KeyValueStore>(&mut self, store: &BookmarkStore<S>) {
        let current = store.load_all().await;
        self.on_enter(&current);
    }

    /// Toggle through [`BookmarkStore::toggle_persisted`].
    pub async fn toggle<S: KeyValueStore>(
        &mut self,
        store: &BookmarkStore<S>,
    ) -> Option<Result<bool, PersistError>> {
        if !self.begin_toggle() {
            return None;
        }
        let result = store.toggle_persisted(&self.posting).await;
        Some(self.finish_toggle(result))
    }
}
