//! `tunebook-store` — SQLite-backed fakebook index storage.
//!
//! Owns the library database: offset segments, title records, and the
//! local-name to canonical-book mapping. The reconciliation engine never
//! touches storage directly; callers load snapshots here and hand them over.

pub mod db;
pub mod error;
pub mod pagelist;

pub use db::Library;
pub use error::{PagelistError, StoreError};
pub use pagelist::PagelistBook;
