//! `tbook diff` — cross-source page comparison for canonical books.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::Args;

use tunebook_config::Settings;
use tunebook_recon::model::BookResult;
use tunebook_recon::{engine, report, DiffInput, DiffResult};
use tunebook_store::Library;

use crate::exit_codes::{EXIT_ERROR, EXIT_UNKNOWN_BOOK};
use crate::CliError;

#[derive(Args)]
pub struct DiffArgs {
    /// Reconcile every canonical book with two or more sources
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Reconcile one canonical book
    #[arg(long, short = 'b', value_name = "NAME", conflicts_with = "all")]
    pub book: Option<String>,

    /// Show match/mismatch counts and ranked per-book lists
    #[arg(long, short = 's')]
    pub summary: bool,

    /// Show per-title mismatch and coverage detail
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Show per-source page-deviation statistics
    #[arg(long)]
    pub page_summary: bool,

    /// Output the full result as JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Write the full JSON result to a file
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Export the mismatch detail table as CSV
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,
}

pub fn cmd_diff(database: &Path, settings: &Settings, args: &DiffArgs) -> Result<(), CliError> {
    let library = Library::open(database).map_err(CliError::store)?;

    let canonicals: Vec<String> = if args.all {
        library.list_canonical_books().map_err(CliError::store)?
    } else if let Some(ref book) = args.book {
        if !library.canonical_exists(book).map_err(CliError::store)? {
            return Err(CliError {
                code: EXIT_UNKNOWN_BOOK,
                message: format!("unknown canonical book: \"{book}\""),
                hint: Some("try `tbook books --contains <fragment>`".into()),
            });
        }
        vec![book.clone()]
    } else {
        return Err(CliError::usage(
            "nothing to reconcile: pass --all or --book NAME",
        ));
    };

    let offsets = library.load_offset_table().map_err(CliError::store)?;
    let mut books = BTreeMap::new();
    for canonical in canonicals {
        let records = library.title_records(&canonical).map_err(CliError::store)?;
        books.insert(canonical, records);
    }

    let result = engine::run(&DiffInput { books }, &offsets);

    if args.json || args.output.is_some() {
        let json = serde_json::to_string_pretty(&result).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        if let Some(ref path) = args.output {
            std::fs::write(path, &json).map_err(|e| CliError {
                code: EXIT_ERROR,
                message: format!("cannot write {}: {e}", path.display()),
                hint: None,
            })?;
            eprintln!("wrote {}", path.display());
        }
        if args.json {
            println!("{json}");
        }
    }

    if let Some(ref path) = args.csv {
        export_csv(&result, path)?;
        eprintln!("wrote {}", path.display());
    }

    if !args.json {
        render_text(&result, settings.report_width, args);
    }

    // One-line run summary to stderr. Mismatches are data, not errors.
    let s = &result.summary;
    eprintln!(
        "{} book(s): {} matched, {} mismatched, {} partial-coverage, {} unresolved record(s)",
        s.books, s.matched, s.mismatched, s.partial, s.unresolved_records,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

fn render_text(result: &DiffResult, width: usize, args: &DiffArgs) {
    if args.summary {
        render_summary(result);
    }
    if args.verbose {
        for book in &result.books {
            render_book_detail(book, width);
        }
    }
    if args.page_summary {
        render_page_summary(result);
    }
}

fn render_summary(result: &DiffResult) {
    println!(
        "Matches: {}, Mis-Matches: {}",
        result.summary.matched, result.summary.mismatched,
    );

    let ranked = report::ranked_mismatches(result);
    if !ranked.is_empty() {
        println!();
        println!("Page mismatches by canonical:");
        println!("Mismatches occur because of sheet offset misalignment or errors in incoming index data.");
        for (canonical, count) in &ranked {
            println!("  {count:>4} {canonical}");
        }
    }

    let partials = report::ranked_partials(result);
    if !partials.is_empty() {
        println!();
        println!("Partial coverage by canonical:");
        println!("Partial coverage occurs because of differences in title spelling or missing titles.");
        for (canonical, count) in &partials {
            println!("  {count:>4} {canonical}");
        }
    }
}

fn render_book_detail(book: &BookResult, width: usize) {
    let mismatches = report::mismatch_table(book);
    let partials = report::partial_table(book);
    if mismatches.is_empty() && partials.is_empty() {
        return;
    }

    println!("{}", "=".repeat(width));
    println!("{}", book.canonical);
    println!("{}", "=".repeat(width));

    for row in &mismatches {
        println!("   {}", row.title);
        for (source, cell) in book.book_sources.iter().zip(&row.cells) {
            match cell {
                Some(c) => println!(
                    "      (s {:>3})    (p {:>3})   {}   {}",
                    c.sheet, c.page, source, c.local,
                ),
                None => println!("      {:>18}   {}", "-", source),
            }
        }
        println!();
    }

    if !partials.is_empty() {
        println!("     {:>40}  {:<30}", "Title", "Missing in index from");
        println!("     {:>40}  {:<30}", "-".repeat(40), "-".repeat(30));
        for row in &partials {
            println!("     {:>40}  {:<30}", row.title, row.missing.join(", "));
        }
        println!();
    }
}

fn render_page_summary(result: &DiffResult) {
    println!("Page deviation by canonical and source, mismatched titles only:");
    for book in result.books.iter().filter(|b| !b.deviation.is_empty()) {
        println!("{}", book.canonical);
        for dev in report::deviation_summary(book) {
            println!(
                "   {}: titles with mismatches: {}, avg difference: {:.2}",
                dev.source, dev.titles, dev.mean_abs,
            );
        }
        println!();
    }
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

fn export_csv(result: &DiffResult, path: &Path) -> Result<(), CliError> {
    let csv_err = |e: csv::Error| CliError {
        code: EXIT_ERROR,
        message: format!("cannot write {}: {e}", path.display()),
        hint: None,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer
        .write_record(["canonical", "title", "first_sheet", "source", "local", "sheet", "page"])
        .map_err(csv_err)?;

    for book in &result.books {
        for row in report::mismatch_table(book) {
            for (source, cell) in book.book_sources.iter().zip(&row.cells) {
                let Some(cell) = cell else { continue };
                writer
                    .write_record([
                        book.canonical.clone(),
                        row.title.clone(),
                        row.first_sheet.to_string(),
                        source.clone(),
                        cell.local.clone(),
                        cell.sheet.to_string(),
                        cell.page.to_string(),
                    ])
                    .map_err(csv_err)?;
            }
        }
    }

    writer.flush().map_err(|e| CliError {
        code: EXIT_ERROR,
        message: format!("cannot write {}: {e}", path.display()),
        hint: None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
