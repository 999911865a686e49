mod bookmarks;
mod kv;
mod schema;
mod types;

pub use bookmarks::{is_bookmarked, toggle, BookmarkSet, BookmarkStore, Toggle, BOOKMARKS_KEY};
pub use kv::KeyValueStore;
pub use schema::Database;
pub use types::{DatabaseError, PersistError, StoreReadError, StoreWriteError};
