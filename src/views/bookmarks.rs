use crate::job::{identity_of, same_item, JobPosting};
use crate::storage::{BookmarkSet, BookmarkStore, KeyValueStore, PersistError};

/// An optimistic removal waiting for its write to complete.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRemoval {
    pub posting: JobPosting,
}

impl PendingRemoval {
    /// Remove this posting, and nothing else, from `store`.
    pub async fn save<S: KeyValueStore>(&self, store: &BookmarkStore<S>) -> Result<(), PersistError> {
        store.set_bookmarked(&self.posting, false).await.map(drop)
    }
}

/// The saved-postings screen. Reads the store directly; never goes through
/// the feed.
///
/// Shows the last loaded snapshot minus removals still being written.
#[derive(Debug, Default)]
pub struct BookmarksView {
    confirmed: BookmarkSet,
    items: BookmarkSet,
    refreshing: bool,
    pending: Vec<JobPosting>,
}

impl BookmarksView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &BookmarkSet {
        &self.items
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn is_pending(&self, posting: &JobPosting) -> bool {
        self.pending.iter().any(|p| same_item(p, posting))
    }

    /// Mark a reload as started.
    pub fn begin_load(&mut self) {
        self.refreshing = true;
    }

    pub fn finish_load(&mut self, set: BookmarkSet) {
        self.confirmed = set;
        self.refreshing = false;
        self.rebuild_items();
    }

    fn rebuild_items(&mut self) {
        self.items = self
            .pending
            .iter()
            .fold(self.confirmed.clone(), |set, p| set.without(p));
    }

    /// Drop the bookmark at `index` from the displayed list.
    pub fn begin_remove(&mut self, index: usize) -> Option<PendingRemoval> {
        let posting = self.items.get(index)?.clone();
        if self.is_pending(&posting) {
            return None;
        }
        self.pending.push(posting.clone());
        self.rebuild_items();
        Some(PendingRemoval { posting })
    }

    /// Settle a removal; a failed write puts the posting back where it was.
    pub fn finish_remove(
        &mut self,
        removal: &PendingRemoval,
        result: Result<(), PersistError>,
    ) -> Result<(), PersistError> {
        self.pending.retain(|p| !same_item(p, &removal.posting));
        let outcome = match result {
            Ok(()) => {
                self.confirmed = self.confirmed.without(&removal.posting);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(item = %identity_of(&removal.posting), error = %e, "Bookmark removal failed, restoring");
                Err(e)
            }
        };
        self.rebuild_items();
        outcome
    }

    /// Reload from `store` (activation).
    pub async fn activate<S: KeyValueStore>(&mut self, store: &BookmarkStore<S>) {
        self.begin_load();
        let set = store.load_all().await;
        self.finish_load(set);
    }

    /// Remove and persist inline. `None` when nothing was removed.
    pub async fn remove<S: KeyValueStore>(
        &mut self,
        store: &BookmarkStore<S>,
        index: usize,
    ) -> Option<Result<(), PersistError>> {
        let removal = self.begin_remove(index)?;
        let result = removal.save(store).await;
        Some(self.finish_remove(&removal, result))
    }
}
