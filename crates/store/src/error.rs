use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite failure (open, query, transaction).
    Sqlite(rusqlite::Error),
    /// Pagelist file could not be parsed.
    Pagelist(PagelistError),
    /// File read error while loading a pagelist.
    Io(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "database error: {e}"),
            Self::Pagelist(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}

impl From<PagelistError> for StoreError {
    fn from(e: PagelistError) -> Self {
        Self::Pagelist(e)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[derive(Debug)]
pub enum PagelistError {
    /// A record line has no `|` between book name and pairs.
    MissingSeparator { line: usize },
    /// A `(sheet_start, offset)` pair failed to parse as integers.
    BadPair { line: usize, text: String },
}

impl fmt::Display for PagelistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator { line } => {
                write!(f, "pagelist line {line}: missing '|' separator")
            }
            Self::BadPair { line, text } => {
                write!(f, "pagelist line {line}: cannot parse pair '{text}'")
            }
        }
    }
}

impl std::error::Error for PagelistError {}
