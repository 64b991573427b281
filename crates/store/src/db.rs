// Library index database over SQLite.
//
// The connection is owned here and injected into callers; nothing in the
// engine reaches for a shared handle.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection};

use tunebook_recon::{BookKey, OffsetSegment, OffsetTable, TitleRecord};

use crate::error::StoreError;
use crate::pagelist::PagelistBook;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sheet_offsets (
    id INTEGER PRIMARY KEY,
    src TEXT NOT NULL,
    local TEXT NOT NULL,
    sheet_start INTEGER NOT NULL,
    sheet_offset INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS sheet_offsets_book ON sheet_offsets(src, local, sheet_start);

CREATE TABLE IF NOT EXISTS titles (
    title TEXT NOT NULL,
    sheet TEXT,
    src TEXT NOT NULL,
    local TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS titles_by_book ON titles(src, local);

CREATE TABLE IF NOT EXISTS local2canonical (
    src TEXT NOT NULL,
    local TEXT NOT NULL,
    canonical TEXT NOT NULL,
    PRIMARY KEY (src, local)
);
CREATE INDEX IF NOT EXISTS local2canonical_by_canonical ON local2canonical(canonical);
"#;

pub struct Library {
    conn: Connection,
}

impl Library {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // -----------------------------------------------------------------------
    // Offset segments
    // -----------------------------------------------------------------------

    /// Segments for one (source, local) book in file-read order; `sequence`
    /// is the position within that order.
    pub fn offset_segments(
        &self,
        source: &str,
        local: &str,
    ) -> Result<Vec<OffsetSegment>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT sheet_start, sheet_offset FROM sheet_offsets
             WHERE src = ?1 AND local = ?2 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![source, local], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut segments = Vec::new();
        for row in rows {
            let (sheet_start, offset) = row?;
            segments.push(OffsetSegment {
                sequence: segments.len() as u32,
                sheet_start,
                offset,
            });
        }
        Ok(segments)
    }

    /// All (source, local) books that carry offset segments.
    pub fn offset_books(&self) -> Result<Vec<(String, String)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT src, local FROM sheet_offsets ORDER BY src, local",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Every book's segments as one lookup table.
    pub fn load_offset_table(&self) -> Result<OffsetTable, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT src, local, sheet_start, sheet_offset FROM sheet_offsets
             ORDER BY src, local, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut grouped: HashMap<BookKey, Vec<OffsetSegment>> = HashMap::new();
        for row in rows {
            let (src, local, sheet_start, offset) = row?;
            let segments = grouped.entry(BookKey::new(src, local)).or_default();
            segments.push(OffsetSegment {
                sequence: segments.len() as u32,
                sheet_start,
                offset,
            });
        }

        let mut table = OffsetTable::new();
        for (key, segments) in grouped {
            table.insert(key, segments);
        }
        Ok(table)
    }

    /// Replace one source's segments from a parsed pagelist, wholesale.
    pub fn replace_offsets(
        &mut self,
        source: &str,
        books: &[PagelistBook],
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM sheet_offsets WHERE src = ?1", params![source])?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO sheet_offsets (src, local, sheet_start, sheet_offset)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for book in books {
                for &(sheet_start, offset) in &book.pairs {
                    stmt.execute(params![source, book.local, sheet_start, offset])?;
                    inserted += 1;
                }
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    // -----------------------------------------------------------------------
    // Titles and canonical books
    // -----------------------------------------------------------------------

    /// Normalized title records for one canonical book, title order.
    pub fn title_records(&self, canonical: &str) -> Result<Vec<TitleRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT t.title, t.sheet, t.src, t.local
             FROM titles t
             JOIN local2canonical lc ON lc.src = t.src AND lc.local = t.local
             WHERE lc.canonical = ?1
             ORDER BY t.title, t.rowid",
        )?;
        let rows = stmt.query_map(params![canonical], |row| {
            Ok(TitleRecord {
                title: row.get(0)?,
                sheet: row.get(1)?,
                source: row.get(2)?,
                local: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Canonical books worth reconciling: indexed by two or more sources.
    pub fn list_canonical_books(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT canonical FROM local2canonical
             GROUP BY canonical HAVING COUNT(DISTINCT src) >= 2
             ORDER BY canonical",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Substring search across every known canonical name.
    pub fn canonicals_like(&self, fragment: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT canonical FROM local2canonical
             WHERE canonical LIKE ?1 ORDER BY canonical",
        )?;
        let pattern = format!("%{fragment}%");
        let rows = stmt.query_map(params![pattern], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn canonical_exists(&self, canonical: &str) -> Result<bool, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM local2canonical WHERE canonical = ?1",
            params![canonical],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // -----------------------------------------------------------------------
    // Ingestion (used by upstream index loaders and tests)
    // -----------------------------------------------------------------------

    pub fn add_title_record(
        &self,
        title: &str,
        sheet: Option<&str>,
        source: &str,
        local: &str,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO titles (title, sheet, src, local) VALUES (?1, ?2, ?3, ?4)",
            params![title, sheet, source, local],
        )?;
        Ok(())
    }

    pub fn add_canonical_mapping(
        &self,
        source: &str,
        local: &str,
        canonical: &str,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO local2canonical (src, local, canonical)
             VALUES (?1, ?2, ?3)",
            params![source, local, canonical],
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
