//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range | Domain    | Description                                   |
//! |-------|-----------|-----------------------------------------------|
//! | 0     | Universal | Success                                       |
//! | 1     | Universal | General error (unspecified)                   |
//! | 2     | Universal | CLI usage error (bad args, missing file)      |
//! | 3-9   | library   | Reconciliation / offset-table codes           |
//!
//! A diff run that finds mismatches still exits 0: mismatches are data,
//! not program errors.

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Library (3-9)
// =============================================================================

/// Named canonical book does not exist in the library.
pub const EXIT_UNKNOWN_BOOK: u8 = 3;

/// Library database could not be opened, read, or written.
pub const EXIT_STORE: u8 = 4;

/// Pagelist file failed to parse.
pub const EXIT_PAGELIST: u8 = 5;

/// `offsets check` found segment lists violating increasing
/// sheet-start order.
pub const EXIT_UNORDERED: u8 = 6;
