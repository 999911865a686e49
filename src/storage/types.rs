use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of jobfeed appears to be running. Please close it and try again.")]
    InstanceLocked,

    #[error("Database migration failed: {0}")]
    Migration(String),

    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        // SQLITE_CANTOPEN (14) also shows up when another process holds the file
        let message = err.to_string();
        if is_lock_message(&message) || message.to_lowercase().contains("unable to open database file") {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5) or SQLITE_LOCKED (6), judged from the error text.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["database is locked", "database table is locked", "sqlite_busy", "sqlite_locked"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Failure reading a value from the key-value store.
#[derive(Debug, Error)]
#[error("Store read failed: {0}")]
pub struct StoreReadError(pub String);

/// Failure writing a value to the key-value store.
#[derive(Debug, Error)]
#[error("Store write failed: {0}")]
pub struct StoreWriteError(pub String);

/// A bookmark snapshot could not be written.
///
/// The persisted snapshot is unchanged when this is returned; callers revert
/// any optimistic change they made to the displayed set.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The current snapshot could not be read before applying a change.
    #[error("Failed to read bookmarks: {0}")]
    Read(#[from] StoreReadError),
    #[error("Failed to encode bookmarks: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Failed to save bookmarks: {0}")]
    Write(#[from] StoreWriteError),
}

/// The stored snapshot could not be turned into a bookmark set.
///
/// Never surfaced past `BookmarkStore::load_all`, which logs it and treats the
/// collection as empty.
#[derive(Debug, Error)]
pub(crate) enum LoadError {
    #[error(transparent)]
    Read(#[from] StoreReadError),
    #[error("Stored bookmarks are not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
