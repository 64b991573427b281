//! `tunebook-recon` — cross-source fakebook index reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded title records and offset segments,
//! returns page-resolved, classified results. No CLI or IO dependencies.

pub mod engine;
pub mod model;
pub mod offsets;
pub mod report;

pub use engine::run;
pub use model::{BookKey, BookResult, DiffInput, DiffResult, OffsetSegment, TitleRecord};
pub use offsets::OffsetTable;
