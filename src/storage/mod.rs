pub mod key;
pub mod postgres;
pub mod sqlite;
pub mod trait_def;


pub use key::{KeyMatch, LinkKey};
pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{LinkStore, StorageError, StorageResult};

/// Columns selected for every link lookup, in `LinkRecord` field order.
pub(crate) const LINK_COLUMNS: &str =
    "id, handle, slug, app, app_route, app_id, url, android_scheme, apple_scheme, team_id";
