//! Persisted bookmark collection.
//!
//! Bookmarks are stored as one JSON array under a single key and are always
//! written as a whole snapshot. Set operations on [`BookmarkSet`] are pure.
//! Changes made from the screens go through [`BookmarkStore::set_bookmarked`]
//! and [`BookmarkStore::toggle_persisted`], which read the stored snapshot,
//! apply one change and write it back while holding the store's write lock.
//! A change whose write fails is therefore never carried into a later
//! snapshot.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;

use super::kv::KeyValueStore;
use super::types::{LoadError, PersistError};
use crate::job::posting::{identity_of, same_item, ItemIdentity, JobPosting};

/// Storage key for the whole bookmark collection.
pub const BOOKMARKS_KEY: &str = "bookmarkedJobs";

/// Bookmarked postings, at most one per [`ItemIdentity`] when built through
/// [`with`](Self::with) and [`toggled`](Self::toggled).
///
/// Order is insertion order; it has no meaning beyond stable display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookmarkSet {
    items: Vec<JobPosting>,
}

/// Result of [`BookmarkSet::toggled`].
#[derive(Debug, Clone, PartialEq)]
pub struct Toggle {
    pub set: BookmarkSet,
    pub added: bool,
}

impl BookmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JobPosting> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&JobPosting> {
        self.items.get(index)
    }

    pub fn as_slice(&self) -> &[JobPosting] {
        &self.items
    }

    pub fn contains(&self, posting: &JobPosting) -> bool {
        self.items.iter().any(|b| same_item(b, posting))
    }

    pub fn identities(&self) -> impl Iterator<Item = ItemIdentity> + '_ {
        self.items.iter().map(identity_of)
    }

    /// Copy with `posting` appended, unless an equal identity is present.
    pub fn with(&self, posting: &JobPosting) -> BookmarkSet {
        if self.contains(posting) {
            return self.clone();
        }
        let mut items = Vec::with_capacity(self.items.len() + 1);
        items.extend(self.items.iter().cloned());
        items.push(posting.clone());
        BookmarkSet { items }
    }

    /// Copy without any element sharing `posting`'s identity. Duplicates that
    /// crept into a stored snapshot are all dropped.
    pub fn without(&self, posting: &JobPosting) -> BookmarkSet {
        BookmarkSet {
            items: self
                .items
                .iter()
                .filter(|b| !same_item(b, posting))
                .cloned()
                .collect(),
        }
    }

    /// Remove `posting` if bookmarked, otherwise add it.
    pub fn toggled(&self, posting: &JobPosting) -> Toggle {
        if self.contains(posting) {
            Toggle {
                set: self.without(posting),
                added: false,
            }
        } else {
            Toggle {
                set: self.with(posting),
                added: true,
            }
        }
    }
}

impl From<Vec<JobPosting>> for BookmarkSet {
    /// Wraps a stored snapshot as-is, duplicates included.
    fn from(items: Vec<JobPosting>) -> Self {
        Self { items }
    }
}

impl<'a> IntoIterator for &'a BookmarkSet {
    type Item = &'a JobPosting;
    type IntoIter = std::slice::Iter<'a, JobPosting>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// True iff `posting`'s identity matches some element of `current`.
pub fn is_bookmarked(posting: &JobPosting, current: &BookmarkSet) -> bool {
    current.contains(posting)
}

/// Pure toggle over the supplied set. Persisting the result is the caller's job.
pub fn toggle(posting: &JobPosting, current: &BookmarkSet) -> Toggle {
    current.toggled(posting)
}

/// Loads and saves the bookmark snapshot through a [`KeyValueStore`].
///
/// Holds no cached copy of the set: every `load_all` reads the store, so each
/// view that reloads on activation sees the latest persisted state. Clones
/// share one write lock, so read-modify-write updates from concurrent tasks
/// are applied one after another.
#[derive(Debug, Clone)]
pub struct BookmarkStore<S> {
    store: S,
    key: String,
    write_lock: Arc<Mutex<()>>,
}

impl<S: KeyValueStore> BookmarkStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, BOOKMARKS_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Read the persisted snapshot.
    ///
    /// # Returns
    ///
    /// The stored set, duplicates included. A missing snapshot, a failed read
    /// and an unparsable value all yield an empty set.
    ///
    /// # Errors
    ///
    /// None. Failures are logged at `warn` and never returned.
    pub async fn load_all(&self) -> BookmarkSet {
        match self.try_load().await {
            Ok(set) => {
                tracing::debug!(count = set.len(), "Loaded bookmarks");
                set
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to load bookmarks, treating as empty");
                BookmarkSet::new()
            }
        }
    }

    async fn try_load(&self) -> Result<BookmarkSet, LoadError> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(BookmarkSet::new());
        };
        let items: Vec<JobPosting> = serde_json::from_str(&raw)?;
        Ok(BookmarkSet::from(items))
    }

    /// Snapshot to base a change on. An unparsable value counts as empty so
    /// the next write replaces it; a failed read aborts the change instead of
    /// overwriting bookmarks that could not be seen.
    async fn load_for_update(&self) -> Result<BookmarkSet, PersistError> {
        match self.try_load().await {
            Ok(set) => Ok(set),
            Err(LoadError::Parse(e)) => {
                tracing::warn!(key = %self.key, error = %e, "Replacing unparsable bookmarks");
                Ok(BookmarkSet::new())
            }
            Err(LoadError::Read(e)) => Err(PersistError::Read(e)),
        }
    }

    /// Overwrite the snapshot with `set`.
    ///
    /// # Arguments
    ///
    /// * `set` - the complete collection to store; it replaces whatever was
    ///   stored before
    ///
    /// # Errors
    ///
    /// * `PersistError::Encode` - the set could not be serialized
    /// * `PersistError::Write` - the store rejected the write; the previous
    ///   snapshot is still in place
    pub async fn persist(&self, set: &BookmarkSet) -> Result<(), PersistError> {
        let json = serde_json::to_string(set.as_slice())?;
        self.store.set(&self.key, &json).await?;
        tracing::debug!(count = set.len(), "Persisted bookmarks");
        Ok(())
    }

    /// Add or remove `posting` in the stored snapshot.
    ///
    /// # Behavior
    ///
    /// Under the write lock: reads the current snapshot, applies only this
    /// change and writes the result back. Adding an already bookmarked
    /// identity, or removing one that is absent, still rewrites the same set.
    ///
    /// # Returns
    ///
    /// The snapshot as written.
    ///
    /// # Errors
    ///
    /// * `PersistError::Read` - the current snapshot could not be read;
    ///   nothing was written
    /// * `PersistError::Encode` / `PersistError::Write` - as for
    ///   [`persist`](Self::persist)
    pub async fn set_bookmarked(
        &self,
        posting: &JobPosting,
        bookmarked: bool,
    ) -> Result<BookmarkSet, PersistError> {
        let _guard = self.write_lock.lock().await;
        let current = self.load_for_update().await?;
        let set = if bookmarked {
            current.with(posting)
        } else {
            current.without(posting)
        };
        self.persist(&set).await?;
        tracing::info!(item = %identity_of(posting), bookmarked, "Bookmark saved");
        Ok(set)
    }

    /// Read, toggle and write back `posting` under the write lock.
    ///
    /// # Returns
    ///
    /// Whether the posting was added (`false` means it was removed).
    ///
    /// # Errors
    ///
    /// Same as [`set_bookmarked`](Self::set_bookmarked).
    pub async fn toggle_persisted(&self, posting: &JobPosting) -> Result<bool, PersistError> {
        let _guard = self.write_lock.lock().await;
        let current = self.load_for_update().await?;
        let Toggle { set, added } = current.toggled(posting);
        self.persist(&set).await?;
        tracing::info!(item = %identity_of(posting), added, "Bookmark toggled");
        Ok(added)
    }

    /// Write the current snapshot to `path` as pretty JSON.
    ///
    /// Goes through a temp file and rename so `path` is never left partial.
    /// Returns the number of exported bookmarks.
    pub async fn export_to(&self, path: &Path) -> anyhow::Result<usize> {
        let set = self.load_all().await;
        let json = serde_json::to_vec_pretty(set.as_slice())?;
        atomic_write(path, &json)?;
        tracing::info!(path = %path.display(), count = set.len(), "Exported bookmarks");
        Ok(set.len())
    }
}

/// Write `content` to `dst` via a uniquely named temp file and rename.
fn atomic_write(dst: &Path, content: &[u8]) -> anyhow::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", random_suffix));

    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true) // Fails if the path exists (no symlink race)
        .open(&temp_path)
        .with_context(|| format!("Failed to create temporary file '{}'", temp_path.display()))?;

    temp_file.write_all(content).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!("Failed to write to temporary file '{}'", temp_path.display())
    })?;
    temp_file.sync_all().with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!("Failed to sync temporary file '{}'", temp_path.display())
    })?;
    drop(temp_file);

    // Windows rename fails if destination exists
    #[cfg(windows)]
    if dst.exists() {
        std::fs::remove_file(dst).with_context(|| {
            let _ = std::fs::remove_file(&temp_path);
            format!("Failed to remove existing '{}'", dst.display())
        })?;
    }

    std::fs::rename(&temp_path, dst).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to rename '{}' to '{}'",
            temp_path.display(),
            dst.display()
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::{StoreReadError, StoreWriteError};
    use crate::storage::Database;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::future::Future;

    async fn test_store() -> BookmarkStore<Database> {
        BookmarkStore::new(Database::open(":memory:").await.unwrap())
    }

    fn job(title: &str, company: &str) -> JobPosting {
        JobPosting::new(title, company)
    }

    /// Store whose writes always fail; reads return a fixed value.
    struct ReadOnlyStore(Option<String>);

    impl KeyValueStore for ReadOnlyStore {
        fn get(
            &self,
            _key: &str,
        ) -> impl Future<Output = Result<Option<String>, StoreReadError>> + Send {
            std::future::ready(Ok(self.0.clone()))
        }

        fn set(
            &self,
            _key: &str,
            _value: &str,
        ) -> impl Future<Output = Result<(), StoreWriteError>> + Send {
            std::future::ready(Err(StoreWriteError("read-only".into())))
        }
    }

    struct UnreadableStore;

    impl KeyValueStore for UnreadableStore {
        fn get(
            &self,
            _key: &str,
        ) -> impl Future<Output = Result<Option<String>, StoreReadError>> + Send {
            std::future::ready(Err(StoreReadError("io error".into())))
        }

        fn set(
            &self,
            _key: &str,
            _value: &str,
        ) -> impl Future<Output = Result<(), StoreWriteError>> + Send {
            std::future::ready(Ok(()))
        }
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let cook = job("Cook", "ABC");
        let empty = BookmarkSet::new();

        let added = toggle(&cook, &empty);
        assert!(added.added);
        assert_eq!(added.set.len(), 1);
        assert!(is_bookmarked(&cook, &added.set));

        let removed = toggle(&cook, &added.set);
        assert!(!removed.added);
        assert!(removed.set.is_empty());
    }

    #[test]
    fn test_toggle_does_not_mutate_input() {
        let current = BookmarkSet::from(vec![job("Cook", "ABC")]);
        let _ = toggle(&job("Cook", "ABC"), &current);
        assert_eq!(current.len(), 1);
    }

    #[test]
    fn test_toggle_matches_by_identity_only() {
        let mut stored = job("Cook", "ABC");
        stored.details.salary = Some("10000".into());
        let current = BookmarkSet::from(vec![stored]);

        let mut refetched = job("Cook", "ABC");
        refetched.details.salary = Some("15000".into());

        assert!(is_bookmarked(&refetched, &current));
        let result = toggle(&refetched, &current);
        assert!(!result.added);
        assert!(result.set.is_empty());
    }

    #[test]
    fn test_remove_drops_all_duplicates() {
        let current = BookmarkSet::from(vec![
            job("Cook", "ABC"),
            job("Driver", "XYZ"),
            job("Cook", "ABC"),
        ]);
        let result = toggle(&job("Cook", "ABC"), &current);

        assert!(!result.added);
        assert_eq!(result.set.as_slice(), &[job("Driver", "XYZ")]);
    }

    #[test]
    fn test_with_is_idempotent() {
        let cook = job("Cook", "ABC");
        let set = BookmarkSet::new().with(&cook).with(&cook);
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_load_all_empty_when_never_written() {
        let store = test_store().await;
        assert!(store.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_persist_then_load_in_fresh_store() {
        let db = Database::open(":memory:").await.unwrap();
        let store = BookmarkStore::new(db.clone());
        let cook = job("Cook", "ABC");

        let Toggle { set, added } = toggle(&cook, &store.load_all().await);
        assert!(added);
        store.persist(&set).await.unwrap();
        assert!(is_bookmarked(&cook, &set));

        let fresh = BookmarkStore::new(db);
        let loaded = fresh.load_all().await;
        assert_eq!(loaded.as_slice(), &[cook]);
    }

    #[tokio::test]
    async fn test_load_all_malformed_is_empty() {
        let db = Database::open(":memory:").await.unwrap();
        db.set_value(BOOKMARKS_KEY, "this is {not json").await.unwrap();

        let store = BookmarkStore::new(db);
        assert!(store.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_all_wrong_shape_is_empty() {
        let store = BookmarkStore::new(ReadOnlyStore(Some(r#"{"title": "Cook"}"#.into())));
        assert!(store.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_all_read_failure_is_empty() {
        let store = BookmarkStore::new(UnreadableStore);
        assert!(store.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_all_keeps_stored_duplicates() {
        let store = BookmarkStore::new(ReadOnlyStore(Some(
            r#"[{"title":"Cook","company":"ABC"},{"title":"Cook","company":"ABC"}]"#.into(),
        )));
        assert_eq!(store.load_all().await.len(), 2);
    }

    #[tokio::test]
    async fn test_persist_failure_is_reported() {
        let store = BookmarkStore::new(ReadOnlyStore(None));
        let set = BookmarkSet::new().with(&job("Cook", "ABC"));

        match store.persist(&set).await {
            Err(PersistError::Write(_)) => {}
            other => panic!("Expected write failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_toggle_persisted_round_trip() {
        let store = test_store().await;
        let cook = job("Cook", "ABC");

        assert!(store.toggle_persisted(&cook).await.unwrap());
        assert!(store.load_all().await.contains(&cook));

        assert!(!store.toggle_persisted(&cook).await.unwrap());
        assert!(store.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_persisted_failure_leaves_snapshot() {
        let stored = r#"[{"title":"Cook","company":"ABC"}]"#;
        let store = BookmarkStore::new(ReadOnlyStore(Some(stored.into())));

        assert!(store.toggle_persisted(&job("Driver", "XYZ")).await.is_err());
        assert_eq!(store.load_all().await.len(), 1);
    }

    /// Real database whose first write fails.
    struct FailFirstWrite {
        db: Database,
        failed: std::sync::atomic::AtomicBool,
    }

    impl KeyValueStore for FailFirstWrite {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreReadError> {
            self.db.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StoreWriteError> {
            if !self.failed.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return Err(StoreWriteError("disk full".into()));
            }
            self.db.set(key, value).await
        }
    }

    #[tokio::test]
    async fn test_set_bookmarked_adds_and_removes() {
        let store = test_store().await;
        let cook = job("Cook", "ABC");

        let set = store.set_bookmarked(&cook, true).await.unwrap();
        assert_eq!(set.as_slice(), &[cook.clone()]);
        // Adding twice keeps one entry
        assert_eq!(store.set_bookmarked(&cook, true).await.unwrap().len(), 1);

        assert!(store.set_bookmarked(&cook, false).await.unwrap().is_empty());
        assert!(store.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_change_not_carried_into_next_write() {
        let store = BookmarkStore::new(FailFirstWrite {
            db: Database::open(":memory:").await.unwrap(),
            failed: std::sync::atomic::AtomicBool::new(false),
        });

        assert!(store.set_bookmarked(&job("Cook", "ABC"), true).await.is_err());
        store.set_bookmarked(&job("Driver", "XYZ"), true).await.unwrap();

        assert_eq!(store.load_all().await.as_slice(), &[job("Driver", "XYZ")]);
    }

    #[tokio::test]
    async fn test_concurrent_changes_all_land() {
        let store = test_store().await;
        let other = store.clone();

        let (cook, driver, tutor) = (job("Cook", "ABC"), job("Driver", "XYZ"), job("Tutor", "ABC"));
        let (a, b, c) = tokio::join!(
            store.set_bookmarked(&cook, true),
            other.set_bookmarked(&driver, true),
            store.toggle_persisted(&tutor),
        );
        a.unwrap();
        b.unwrap();
        assert!(c.unwrap());

        assert_eq!(store.load_all().await.len(), 3);
    }

    #[tokio::test]
    async fn test_set_bookmarked_read_failure_writes_nothing() {
        let store = BookmarkStore::new(UnreadableStore);
        match store.set_bookmarked(&job("Cook", "ABC"), true).await {
            Err(PersistError::Read(_)) => {}
            other => panic!("Expected read failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_set_bookmarked_replaces_malformed_snapshot() {
        let db = Database::open(":memory:").await.unwrap();
        db.set_value(BOOKMARKS_KEY, "{not json").await.unwrap();
        let store = BookmarkStore::new(db);

        store.set_bookmarked(&job("Cook", "ABC"), true).await.unwrap();
        assert_eq!(store.load_all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_persisted_json_shape() {
        let db = Database::open(":memory:").await.unwrap();
        let store = BookmarkStore::new(db.clone());
        let mut cook = job("Cook", "ABC");
        cook.details.place = Some("Pune".into());
        store.persist(&BookmarkSet::new().with(&cook)).await.unwrap();

        let raw = db.get_value(BOOKMARKS_KEY).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["title"], "Cook");
        assert_eq!(value[0]["primary_details"]["Place"], "Pune");
    }

    #[tokio::test]
    async fn test_custom_key_is_isolated() {
        let db = Database::open(":memory:").await.unwrap();
        let a = BookmarkStore::with_key(db.clone(), "a");
        let b = BookmarkStore::with_key(db, "b");

        a.toggle_persisted(&job("Cook", "ABC")).await.unwrap();
        assert_eq!(a.load_all().await.len(), 1);
        assert!(b.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_export_writes_snapshot_file() {
        let dir = std::env::temp_dir().join("jobfeed_bookmarks_test_export");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bookmarks.json");

        let store = test_store().await;
        store.toggle_persisted(&job("Cook", "ABC")).await.unwrap();
        store.toggle_persisted(&job("Driver", "XYZ")).await.unwrap();

        let count = store.export_to(&path).await.unwrap();
        assert_eq!(count, 2);

        let exported: Vec<JobPosting> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(exported, vec![job("Cook", "ABC"), job("Driver", "XYZ")]);

        std::fs::remove_dir_all(&dir).ok();
    }

    fn arb_job() -> impl Strategy<Value = JobPosting> {
        (prop_oneof![Just("Cook"), Just("Driver"), Just("Tutor")], prop_oneof![Just("ABC"), Just("XYZ")])
            .prop_map(|(t, c)| job(t, c))
    }

    proptest! {
        #[test]
        fn toggle_twice_restores_membership(
            seed in proptest::collection::vec(arb_job(), 0..6),
            target in arb_job(),
        ) {
            let start = seed.iter().fold(BookmarkSet::new(), |set, j| set.with(j));
            let once = toggle(&target, &start);
            let twice = toggle(&target, &once.set);

            prop_assert_eq!(is_bookmarked(&target, &twice.set), is_bookmarked(&target, &start));
            prop_assert_ne!(once.added, twice.added);
        }

        #[test]
        fn toggles_never_create_duplicates(ops in proptest::collection::vec(arb_job(), 0..30)) {
            let mut set = BookmarkSet::new();
            for posting in &ops {
                set = toggle(posting, &set).set;
            }
            let mut ids: Vec<_> = set.identities().collect();
            let total = ids.len();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), total);
        }
    }
}
