use std::collections::HashMap;

use crate::model::{BookKey, OffsetSegment};

// ---------------------------------------------------------------------------
// OffsetTable
// ---------------------------------------------------------------------------

/// Piecewise sheet↔page translation for every book in the library.
///
/// A book's scan interleaves front matter, reprints, and re-paginated
/// sections, each with its own constant offset; the segment whose threshold
/// is the greatest value at or below the probe governs the conversion.
#[derive(Debug, Default)]
pub struct OffsetTable {
    books: HashMap<BookKey, SegmentMap>,
}

impl OffsetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a book's segments. Replaces any previous list for the key.
    pub fn insert(&mut self, key: BookKey, segments: Vec<OffsetSegment>) {
        self.books.insert(key, SegmentMap::new(segments));
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// PDF page for a printed sheet number, or `None` when the sheet
    /// precedes every segment (or the book has none). Not an error: the
    /// caller treats an unresolved lookup as "cannot be page-compared".
    pub fn sheet_to_page(&self, key: &BookKey, sheet: i64) -> Option<i64> {
        let segment = self.books.get(key)?.floor_by_sheet(sheet)?;
        Some(sheet + segment.offset)
    }

    /// Printed sheet number for a PDF page, the inverse of `sheet_to_page`.
    pub fn page_to_sheet(&self, key: &BookKey, page: i64) -> Option<i64> {
        let segment = self.books.get(key)?.floor_by_page(page)?;
        Some(page - segment.offset)
    }

    /// Offset in force at a PDF page. Same selection as `page_to_sheet`.
    pub fn offset_at_page(&self, key: &BookKey, page: i64) -> Option<i64> {
        let segment = self.books.get(key)?.floor_by_page(page)?;
        Some(segment.offset)
    }
}

// ---------------------------------------------------------------------------
// Per-book segment lookup
// ---------------------------------------------------------------------------

/// One book's segments, sorted for floor lookup in both directions.
///
/// Sort key is (threshold, sequence): among segments with an equal
/// threshold the one appended last wins, which keeps lookups stable for
/// legacy data that carries duplicate thresholds.
#[derive(Debug)]
struct SegmentMap {
    by_sheet: Vec<OffsetSegment>,
    by_page: Vec<OffsetSegment>,
}

impl SegmentMap {
    fn new(segments: Vec<OffsetSegment>) -> Self {
        let mut by_sheet = segments.clone();
        by_sheet.sort_by_key(|s| (s.sheet_start, s.sequence));
        let mut by_page = segments;
        by_page.sort_by_key(|s| (s.sheet_start + s.offset, s.sequence));
        Self { by_sheet, by_page }
    }

    fn floor_by_sheet(&self, sheet: i64) -> Option<&OffsetSegment> {
        floor(&self.by_sheet, |s| s.sheet_start, sheet)
    }

    fn floor_by_page(&self, page: i64) -> Option<&OffsetSegment> {
        floor(&self.by_page, |s| s.sheet_start + s.offset, page)
    }
}

/// Last segment whose threshold is `<= probe` in a threshold-sorted list.
fn floor(
    sorted: &[OffsetSegment],
    threshold: impl Fn(&OffsetSegment) -> i64,
    probe: i64,
) -> Option<&OffsetSegment> {
    let idx = sorted.partition_point(|s| threshold(s) <= probe);
    if idx == 0 {
        None
    } else {
        Some(&sorted[idx - 1])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
