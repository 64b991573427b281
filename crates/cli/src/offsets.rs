//! `tbook offsets` — sheet-offset table maintenance and single lookups.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use tunebook_config::Settings;
use tunebook_recon::BookKey;
use tunebook_store::{pagelist, Library};

use crate::exit_codes::{EXIT_ERROR, EXIT_PAGELIST, EXIT_UNORDERED};
use crate::CliError;

#[derive(Subcommand)]
pub enum OffsetsCommands {
    /// Replace one source's segments from a pagelist file
    #[command(after_help = "\
Pagelist format, one record per book, backslash continues a line:
  rb1 | (1, 0) (50, 3) \\
      (120, 5)

Examples:
  tbook offsets import Page-Offsets.txt --source Asp")]
    Import {
        /// Pagelist file to load
        file: PathBuf,

        /// Source code the pagelist belongs to
        #[arg(long, value_name = "SRC")]
        source: Option<String>,
    },

    /// Report segment lists that violate increasing sheet-start order
    #[command(after_help = "\
Floor lookups stay correct regardless, but out-of-order lists usually
mean a curation slip worth fixing in the pagelist file.")]
    Check,

    /// Translate a single sheet or page number for one book
    #[command(after_help = "\
Examples:
  tbook offsets lookup --source Asp --local rb1 --sheet 50
  tbook offsets lookup --source Asp --local rb1 --page 53")]
    Lookup {
        /// Source code the local book name belongs to
        #[arg(long, value_name = "SRC")]
        source: Option<String>,

        /// Book name as the source spells it
        #[arg(long, value_name = "NAME")]
        local: String,

        /// Printed sheet number to translate to a PDF page
        #[arg(long, conflicts_with = "page")]
        sheet: Option<i64>,

        /// PDF page number to translate back to a printed sheet
        #[arg(long)]
        page: Option<i64>,
    },
}

pub fn cmd_offsets(
    database: &Path,
    settings: &Settings,
    command: OffsetsCommands,
) -> Result<(), CliError> {
    match command {
        OffsetsCommands::Import { file, source } => {
            cmd_import(database, settings, &file, source)
        }
        OffsetsCommands::Check => cmd_check(database),
        OffsetsCommands::Lookup {
            source,
            local,
            sheet,
            page,
        } => cmd_lookup(database, settings, source, &local, sheet, page),
    }
}

/// `--source`, or the configured default when omitted.
fn required_source(explicit: Option<String>, settings: &Settings) -> Result<String, CliError> {
    explicit
        .or_else(|| settings.default_source.clone())
        .ok_or_else(|| {
            CliError::usage(
                "no source given: pass --source or set default_source in settings.toml",
            )
        })
}

fn cmd_import(
    database: &Path,
    settings: &Settings,
    file: &Path,
    source: Option<String>,
) -> Result<(), CliError> {
    let source = required_source(source, settings)?;

    let contents = std::fs::read_to_string(file).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: format!("cannot read {}: {e}", file.display()),
        hint: None,
    })?;
    let books = pagelist::parse(&contents).map_err(|e| CliError {
        code: EXIT_PAGELIST,
        message: e.to_string(),
        hint: None,
    })?;

    let mut library = Library::open(database).map_err(CliError::store)?;
    let inserted = library
        .replace_offsets(&source, &books)
        .map_err(CliError::store)?;

    eprintln!(
        "imported {inserted} segment(s) for {} book(s) into source {source}",
        books.len(),
    );
    Ok(())
}

fn cmd_check(database: &Path) -> Result<(), CliError> {
    let library = Library::open(database).map_err(CliError::store)?;

    let mut violations = 0;
    for (source, local) in library.offset_books().map_err(CliError::store)? {
        let segments = library
            .offset_segments(&source, &local)
            .map_err(CliError::store)?;
        for pair in segments.windows(2) {
            if pair[1].sheet_start <= pair[0].sheet_start {
                violations += 1;
                println!(
                    "{source} {local}: segment {} (start {}) does not increase after start {}",
                    pair[1].sequence, pair[1].sheet_start, pair[0].sheet_start,
                );
            }
        }
    }

    if violations > 0 {
        return Err(CliError {
            code: EXIT_UNORDERED,
            message: format!("{violations} out-of-order segment(s) found"),
            hint: Some("re-curate the pagelist and re-import".into()),
        });
    }
    eprintln!("all segment lists are in increasing sheet-start order");
    Ok(())
}

fn cmd_lookup(
    database: &Path,
    settings: &Settings,
    source: Option<String>,
    local: &str,
    sheet: Option<i64>,
    page: Option<i64>,
) -> Result<(), CliError> {
    let source = required_source(source, settings)?;
    let library = Library::open(database).map_err(CliError::store)?;
    let table = library.load_offset_table().map_err(CliError::store)?;
    let key = BookKey::new(source, local);

    let uncovered = |what: String| CliError {
        code: EXIT_ERROR,
        message: format!("no covering segment for {what} in {} {}", key.source, key.local),
        hint: None,
    };

    match (sheet, page) {
        (Some(sheet), None) => match table.sheet_to_page(&key, sheet) {
            Some(page) => {
                println!("sheet {sheet} -> page {page}");
                Ok(())
            }
            None => Err(uncovered(format!("sheet {sheet}"))),
        },
        (None, Some(page)) => {
            match (table.page_to_sheet(&key, page), table.offset_at_page(&key, page)) {
                (Some(sheet), Some(offset)) => {
                    println!("page {page} -> sheet {sheet} (offset {offset})");
                    Ok(())
                }
                _ => Err(uncovered(format!("page {page}"))),
            }
        }
        _ => Err(CliError::usage("pass exactly one of --sheet or --page")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::EXIT_USAGE;

    fn temp_db(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("library.db")
    }

    #[test]
    fn import_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let db = temp_db(&dir);
        let pagelist_path = dir.path().join("offsets.txt");
        std::fs::write(&pagelist_path, "rb1 | (1, 0) (50, 3)\n").unwrap();

        cmd_import(&db, &Settings::default(), &pagelist_path, Some("Asp".into())).unwrap();

        cmd_lookup(&db, &Settings::default(), Some("Asp".into()), "rb1", Some(60), None)
            .unwrap();
        cmd_lookup(&db, &Settings::default(), Some("Asp".into()), "rb1", None, Some(63))
            .unwrap();
    }

    #[test]
    fn import_uses_configured_default_source() {
        let dir = tempfile::tempdir().unwrap();
        let db = temp_db(&dir);
        let pagelist_path = dir.path().join("offsets.txt");
        std::fs::write(&pagelist_path, "rb1 | (1, 0)\n").unwrap();

        let settings = Settings {
            default_source: Some("Asp".into()),
            ..Settings::default()
        };
        cmd_import(&db, &settings, &pagelist_path, None).unwrap();

        let library = Library::open(&db).unwrap();
        assert_eq!(library.offset_segments("Asp", "rb1").unwrap().len(), 1);
    }

    #[test]
    fn import_without_source_is_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = temp_db(&dir);
        let pagelist_path = dir.path().join("offsets.txt");
        std::fs::write(&pagelist_path, "rb1 | (1, 0)\n").unwrap();

        let err = cmd_import(&db, &Settings::default(), &pagelist_path, None).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
    }

    #[test]
    fn import_rejects_malformed_pagelist() {
        let dir = tempfile::tempdir().unwrap();
        let db = temp_db(&dir);
        let pagelist_path = dir.path().join("offsets.txt");
        std::fs::write(&pagelist_path, "rb1 (1, 0)\n").unwrap();

        let err =
            cmd_import(&db, &Settings::default(), &pagelist_path, Some("Asp".into())).unwrap_err();
        assert_eq!(err.code, EXIT_PAGELIST);
    }

    #[test]
    fn check_flags_out_of_order_segments() {
        let dir = tempfile::tempdir().unwrap();
        let db = temp_db(&dir);
        let pagelist_path = dir.path().join("offsets.txt");
        std::fs::write(&pagelist_path, "rb1 | (50, 3) (1, 0)\n").unwrap();
        cmd_import(&db, &Settings::default(), &pagelist_path, Some("Asp".into())).unwrap();

        let err = cmd_check(&db).unwrap_err();
        assert_eq!(err.code, EXIT_UNORDERED);
    }

    #[test]
    fn check_passes_ordered_segments() {
        let dir = tempfile::tempdir().unwrap();
        let db = temp_db(&dir);
        let pagelist_path = dir.path().join("offsets.txt");
        std::fs::write(&pagelist_path, "rb1 | (1, 0) (50, 3)\n").unwrap();
        cmd_import(&db, &Settings::default(), &pagelist_path, Some("Asp".into())).unwrap();

        assert!(cmd_check(&db).is_ok());
    }

    #[test]
    fn lookup_requires_exactly_one_probe() {
        let dir = tempfile::tempdir().unwrap();
        let db = temp_db(&dir);
        Library::open(&db).unwrap();

        let err = cmd_lookup(&db, &Settings::default(), Some("Asp".into()), "rb1", None, None)
            .unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
    }

    #[test]
    fn lookup_outside_coverage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let db = temp_db(&dir);
        let pagelist_path = dir.path().join("offsets.txt");
        std::fs::write(&pagelist_path, "rb1 | (10, 5)\n").unwrap();
        cmd_import(&db, &Settings::default(), &pagelist_path, Some("Asp".into())).unwrap();

        let err =
            cmd_lookup(&db, &Settings::default(), Some("Asp".into()), "rb1", Some(9), None)
                .unwrap_err();
        assert_eq!(err.code, EXIT_ERROR);
    }
}
