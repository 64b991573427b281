//! The pagelist file format: per-book offset segments as curated text.
//!
//! ```text
//! # Real Book 6th edition scan
//! rb1 | (1, 0) (50, 3) (120, 5) \
//!     (200, 8)
//! ```
//!
//! One record per book: local name, `|`, then `(sheet_start, offset)` pairs.
//! A trailing backslash joins the next physical line; `#` lines and blank
//! lines are skipped. Pair order is significant — it assigns each segment's
//! sequence, and curators append pairs in increasing sheet-start order.

use regex::Regex;

use crate::error::PagelistError;

/// One parsed pagelist record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagelistBook {
    pub local: String,
    /// `(sheet_start, offset)` in file-read order.
    pub pairs: Vec<(i64, i64)>,
}

/// Parse a whole pagelist file.
pub fn parse(input: &str) -> Result<Vec<PagelistBook>, PagelistError> {
    let pair_re = Regex::new(r"\((.*?),(.*?)\)").unwrap();

    let mut books = Vec::new();
    for (line_no, line) in logical_lines(input) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (local, rest) = line
            .split_once('|')
            .ok_or(PagelistError::MissingSeparator { line: line_no })?;

        let mut pairs = Vec::new();
        for caps in pair_re.captures_iter(rest) {
            let parse_int = |text: &str| {
                text.trim().parse::<i64>().map_err(|_| PagelistError::BadPair {
                    line: line_no,
                    text: caps[0].to_string(),
                })
            };
            pairs.push((parse_int(&caps[1])?, parse_int(&caps[2])?));
        }

        books.push(PagelistBook {
            local: local.trim().to_string(),
            pairs,
        });
    }
    Ok(books)
}

/// Join continuation lines: a trailing backslash splices the next physical
/// line. Yields (1-based starting line number, joined text).
fn logical_lines(input: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut lines = input.lines().enumerate();
    while let Some((no, first)) = lines.next() {
        let mut joined = first.to_string();
        while joined.ends_with('\\') {
            joined.pop();
            match lines.next() {
                Some((_, next)) => joined.push_str(next),
                None => break,
            }
        }
        out.push((no + 1, joined));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
