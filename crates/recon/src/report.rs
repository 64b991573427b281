//! Presentation-ready views over a reconciliation result.
//!
//! Pure transforms: ranked offender lists, per-source mismatch grids,
//! partial-coverage rows, deviation summaries. Rendering to text lives in
//! the caller.

use serde::Serialize;

use crate::model::{BookResult, DiffResult, Verdict};

// ---------------------------------------------------------------------------
// Ranked offender lists
// ---------------------------------------------------------------------------

/// (canonical, mismatch count), worst offenders first, ties by name.
pub fn ranked_mismatches(result: &DiffResult) -> Vec<(String, usize)> {
    ranked(result, |b| b.mismatched)
}

/// (canonical, partial-coverage count), worst offenders first.
pub fn ranked_partials(result: &DiffResult) -> Vec<(String, usize)> {
    ranked(result, |b| b.partial)
}

fn ranked(result: &DiffResult, count: impl Fn(&BookResult) -> usize) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = result
        .books
        .iter()
        .filter(|b| count(b) > 0)
        .map(|b| (b.canonical.clone(), count(b)))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

// ---------------------------------------------------------------------------
// Mismatch detail grid
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MismatchCell {
    pub local: String,
    pub sheet: i64,
    pub page: i64,
}

/// One mismatched title; `cells` is aligned with the book's
/// `book_sources`, blank where a source has no resolved entry.
#[derive(Debug, Clone, Serialize)]
pub struct MismatchRow {
    pub title: String,
    pub first_sheet: i64,
    pub cells: Vec<Option<MismatchCell>>,
}

/// Mismatched titles of one book, ordered by the first sheet number
/// encountered in each group (ascending), ties by title.
pub fn mismatch_table(book: &BookResult) -> Vec<MismatchRow> {
    let mut rows: Vec<MismatchRow> = book
        .titles
        .iter()
        .filter(|t| t.verdict == Verdict::Mismatch)
        .map(|t| MismatchRow {
            title: t.title.clone(),
            first_sheet: t.first_sheet.unwrap_or(0),
            cells: book
                .book_sources
                .iter()
                .map(|src| {
                    t.entries.iter().find(|e| &e.source == src).map(|e| MismatchCell {
                        local: e.local.clone(),
                        sheet: e.sheet,
                        page: e.page,
                    })
                })
                .collect(),
        })
        .collect();
    rows.sort_by(|a, b| {
        a.first_sheet
            .cmp(&b.first_sheet)
            .then_with(|| a.title.cmp(&b.title))
    });
    rows
}

// ---------------------------------------------------------------------------
// Partial coverage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PartialRow {
    pub title: String,
    pub missing: Vec<String>,
}

/// Titles missing from at least one of the book's sources, title order.
pub fn partial_table(book: &BookResult) -> Vec<PartialRow> {
    book.titles
        .iter()
        .filter(|t| !t.missing_sources.is_empty())
        .map(|t| PartialRow {
            title: t.title.clone(),
            missing: t.missing_sources.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Deviation summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SourceDeviation {
    pub source: String,
    /// Mismatched titles this source contributed a resolved page to.
    pub titles: u32,
    /// Mean absolute deviation from the per-title group means.
    pub mean_abs: f64,
}

/// Per-source page deviation for one book, a proxy for how far off that
/// source's offsets tend to be relative to the consensus of the others.
pub fn deviation_summary(book: &BookResult) -> Vec<SourceDeviation> {
    book.deviation
        .iter()
        .map(|(source, acc)| SourceDeviation {
            source: source.clone(),
            titles: acc.count,
            mean_abs: acc.mean(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
