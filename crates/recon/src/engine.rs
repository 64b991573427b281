use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    Accumulator, BookKey, BookResult, DiffInput, DiffMeta, DiffResult, DiffSummary, ResolvedEntry,
    TitleRecord, TitleResult, Verdict,
};
use crate::offsets::OffsetTable;

/// Run reconciliation over every book in the input.
pub fn run(input: &DiffInput, offsets: &OffsetTable) -> DiffResult {
    let books: Vec<BookResult> = input
        .books
        .iter()
        .map(|(canonical, records)| reconcile_book(canonical, records, offsets))
        .collect();

    let summary = summarize(&books);

    DiffResult {
        meta: DiffMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        books,
    }
}

/// Reconcile one canonical book: group by exact title, resolve sheets to
/// pages, test consensus, accumulate deviation and coverage.
pub fn reconcile_book(
    canonical: &str,
    records: &[TitleRecord],
    offsets: &OffsetTable,
) -> BookResult {
    // Group by exact post-normalization title. Spelling reconciliation
    // happens upstream; string equality is the only matching rule here.
    let mut groups: BTreeMap<&str, Vec<&TitleRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.title.as_str()).or_default().push(record);
    }

    let mut titles: Vec<TitleResult> = Vec::with_capacity(groups.len());
    let mut deviation: BTreeMap<String, Accumulator> = BTreeMap::new();
    let mut missing_offsets: BTreeMap<String, u32> = BTreeMap::new();
    let mut book_sources: BTreeSet<String> = BTreeSet::new();
    let mut matched = 0;
    let mut mismatched = 0;

    for (title, group) in &groups {
        // Coverage counts presence in the index, resolved or not.
        let title_sources: BTreeSet<String> =
            group.iter().map(|r| r.source.clone()).collect();
        book_sources.extend(title_sources.iter().cloned());

        let mut entries: Vec<ResolvedEntry> = Vec::with_capacity(group.len());
        for record in group {
            match resolve(record, offsets) {
                Some((sheet, page)) => entries.push(ResolvedEntry {
                    source: record.source.clone(),
                    local: record.local.clone(),
                    sheet,
                    page,
                }),
                None => {
                    *missing_offsets.entry(record.source.clone()).or_insert(0) += 1;
                }
            }
        }

        let first_sheet = entries.first().map(|e| e.sheet);

        let verdict = if entries.is_empty() {
            // Skipped for consensus, still counts as a title seen.
            Verdict::Unresolved
        } else if entries.iter().all(|e| e.page == entries[0].page) {
            matched += 1;
            Verdict::Same
        } else {
            mismatched += 1;
            let mean =
                entries.iter().map(|e| e.page as f64).sum::<f64>() / entries.len() as f64;
            for entry in &entries {
                deviation
                    .entry(entry.source.clone())
                    .or_default()
                    .add((entry.page as f64 - mean).abs());
            }
            Verdict::Mismatch
        };

        entries.sort_by(|a, b| a.source.cmp(&b.source));

        titles.push(TitleResult {
            title: (*title).to_string(),
            verdict,
            first_sheet,
            entries,
            title_sources: title_sources.into_iter().collect(),
            missing_sources: Vec::new(),
        });
    }

    // The missing set needs the full union, so fill it in a second pass.
    let mut partial = 0;
    for title in &mut titles {
        let covered: BTreeSet<&str> =
            title.title_sources.iter().map(String::as_str).collect();
        title.missing_sources = book_sources
            .iter()
            .filter(|s| !covered.contains(s.as_str()))
            .cloned()
            .collect();
        if !title.missing_sources.is_empty() {
            partial += 1;
        }
    }

    BookResult {
        canonical: canonical.to_string(),
        matched,
        mismatched,
        partial,
        book_sources: book_sources.into_iter().collect(),
        titles,
        deviation,
        missing_offsets,
    }
}

/// A record resolves when its sheet label parses as an integer and an
/// offset segment covers it.
fn resolve(record: &TitleRecord, offsets: &OffsetTable) -> Option<(i64, i64)> {
    let sheet: i64 = record.sheet.as_deref()?.trim().parse().ok()?;
    let key = BookKey::new(record.source.as_str(), record.local.as_str());
    let page = offsets.sheet_to_page(&key, sheet)?;
    Some((sheet, page))
}

fn summarize(books: &[BookResult]) -> DiffSummary {
    DiffSummary {
        books: books.len(),
        matched: books.iter().map(|b| b.matched).sum(),
        mismatched: books.iter().map(|b| b.mismatched).sum(),
        partial: books.iter().map(|b| b.partial).sum(),
        unresolved_records: books
            .iter()
            .flat_map(|b| b.missing_offsets.values())
            .sum(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OffsetSegment;
    use std::collections::BTreeMap;

    fn record(title: &str, sheet: &str, source: &str, local: &str) -> TitleRecord {
        TitleRecord {
            title: title.into(),
            sheet: if sheet.is_empty() { None } else { Some(sheet.into()) },
            source: source.into(),
            local: local.into(),
        }
    }

    fn seg(sequence: u32, sheet_start: i64, offset: i64) -> OffsetSegment {
        OffsetSegment {
            sequence,
            sheet_start,
            offset,
        }
    }

    /// Source A indexes "rb1" with a zero offset; source B indexes
    /// "realbook1" with everything shifted by two pages of front matter.
    fn real_book_offsets() -> OffsetTable {
        let mut offsets = OffsetTable::new();
        offsets.insert(BookKey::new("A", "rb1"), vec![seg(1, 1, 0)]);
        offsets.insert(BookKey::new("B", "realbook1"), vec![seg(1, 1, 2)]);
        offsets
    }

    #[test]
    fn consensus_across_differing_sheets() {
        let records = vec![
            record("Blue Moon", "20", "A", "rb1"),
            record("Blue Moon", "18", "B", "realbook1"),
        ];
        let book = reconcile_book("Real Book Vol 1", &records, &real_book_offsets());

        assert_eq!(book.matched, 1);
        assert_eq!(book.mismatched, 0);
        assert_eq!(book.partial, 0);
        let group = &book.titles[0];
        assert_eq!(group.verdict, Verdict::Same);
        assert_eq!(group.entries[0].page, 20);
        assert_eq!(group.entries[1].page, 20);
        assert!(book.deviation.is_empty());
    }

    #[test]
    fn partial_coverage_missing_set() {
        let records = vec![
            record("Blue Moon", "20", "A", "rb1"),
            record("Blue Moon", "18", "B", "realbook1"),
            record("Autumn Leaves", "30", "A", "rb1"),
        ];
        let book = reconcile_book("Real Book Vol 1", &records, &real_book_offsets());

        assert_eq!(book.partial, 1);
        let autumn = book
            .titles
            .iter()
            .find(|t| t.title == "Autumn Leaves")
            .unwrap();
        assert_eq!(autumn.missing_sources, vec!["B".to_string()]);
        let blue = book.titles.iter().find(|t| t.title == "Blue Moon").unwrap();
        assert!(blue.missing_sources.is_empty());
    }

    #[test]
    fn title_sources_subset_of_book_sources() {
        let records = vec![
            record("Blue Moon", "20", "A", "rb1"),
            record("Blue Moon", "18", "B", "realbook1"),
            record("Autumn Leaves", "30", "A", "rb1"),
            record("Misty", "50", "B", "realbook1"),
        ];
        let book = reconcile_book("Real Book Vol 1", &records, &real_book_offsets());
        for title in &book.titles {
            for src in &title.title_sources {
                assert!(book.book_sources.contains(src), "{src} not in book sources");
            }
        }
    }

    #[test]
    fn mismatch_mean_deviation() {
        let records = vec![
            record("Misty", "50", "A", "rb1"),
            record("Misty", "46", "B", "realbook1"),
        ];
        let book = reconcile_book("Real Book Vol 1", &records, &real_book_offsets());

        // A resolves to 50, B to 48; mean 49, each a page away.
        assert_eq!(book.mismatched, 1);
        assert_eq!(book.titles[0].verdict, Verdict::Mismatch);
        let dev_a = book.deviation.get("A").unwrap();
        let dev_b = book.deviation.get("B").unwrap();
        assert_eq!(dev_a.count, 1);
        assert!((dev_a.sum - 1.0).abs() < f64::EPSILON);
        assert_eq!(dev_b.count, 1);
        assert!((dev_b.sum - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unresolvable_record_excluded_not_fatal() {
        let records = vec![
            record("Blue Moon", "20", "A", "rb1"),
            record("Blue Moon", "18", "B", "realbook1"),
            record("Blue Moon", "n/a", "C", "rb-c"),
        ];
        let book = reconcile_book("Real Book Vol 1", &records, &real_book_offsets());

        assert_eq!(book.matched, 1);
        assert_eq!(book.titles[0].verdict, Verdict::Same);
        assert_eq!(book.missing_offsets.get("C"), Some(&1));
        // C still counts toward coverage: it indexed the title.
        assert!(book.titles[0].title_sources.contains(&"C".to_string()));
    }

    #[test]
    fn group_with_no_resolutions_is_unresolved() {
        let records = vec![
            record("Blue Moon", "", "A", "rb1"),
            record("Blue Moon", "n/a", "B", "realbook1"),
        ];
        let book = reconcile_book("Real Book Vol 1", &records, &real_book_offsets());

        assert_eq!(book.matched, 0);
        assert_eq!(book.mismatched, 0);
        assert_eq!(book.titles.len(), 1);
        assert_eq!(book.titles[0].verdict, Verdict::Unresolved);
        assert_eq!(book.missing_offsets.get("A"), Some(&1));
        assert_eq!(book.missing_offsets.get("B"), Some(&1));
    }

    #[test]
    fn single_source_group_is_trivial_consensus() {
        let records = vec![record("Autumn Leaves", "30", "A", "rb1")];
        let book = reconcile_book("Real Book Vol 1", &records, &real_book_offsets());
        assert_eq!(book.matched, 1);
        // One source covering the whole book: nothing is partial.
        assert_eq!(book.partial, 0);
    }

    #[test]
    fn empty_book_yields_empty_result() {
        let book = reconcile_book("Real Book Vol 1", &[], &real_book_offsets());
        assert_eq!(book.matched, 0);
        assert_eq!(book.mismatched, 0);
        assert!(book.titles.is_empty());
        assert!(book.book_sources.is_empty());
    }

    #[test]
    fn entries_ordered_by_source_first_sheet_in_feed_order() {
        let mut offsets = real_book_offsets();
        offsets.insert(BookKey::new("C", "rb-c"), vec![seg(1, 1, 10)]);
        let records = vec![
            record("Misty", "50", "B", "realbook1"),
            record("Misty", "46", "A", "rb1"),
            record("Misty", "44", "C", "rb-c"),
        ];
        let book = reconcile_book("Real Book Vol 1", &records, &offsets);

        let group = &book.titles[0];
        // First resolved record in feed order came from B.
        assert_eq!(group.first_sheet, Some(50));
        let order: Vec<&str> = group.entries.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn run_aggregates_across_books() {
        let mut books = BTreeMap::new();
        books.insert(
            "Real Book Vol 1".to_string(),
            vec![
                record("Misty", "50", "A", "rb1"),
                record("Misty", "46", "B", "realbook1"),
            ],
        );
        books.insert(
            "Real Book Vol 2".to_string(),
            vec![
                record("Nardis", "12", "A", "rb1"),
                record("Nardis", "10", "B", "realbook1"),
            ],
        );
        let input = DiffInput { books };
        let result = run(&input, &real_book_offsets());

        assert_eq!(result.summary.books, 2);
        assert_eq!(result.summary.matched, 1);
        assert_eq!(result.summary.mismatched, 1);
        assert_eq!(result.books[0].canonical, "Real Book Vol 1");
    }

    #[test]
    fn result_serializes_to_json() {
        let mut books = BTreeMap::new();
        books.insert(
            "Real Book Vol 1".to_string(),
            vec![record("Blue Moon", "20", "A", "rb1")],
        );
        let result = run(&DiffInput { books }, &real_book_offsets());
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"Blue Moon\""));
        assert!(json.contains("\"verdict\":\"same\""));
    }
}
