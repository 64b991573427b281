//! `tbook books` — canonical book listing.

use std::path::Path;

use tunebook_store::Library;

use crate::CliError;

/// List reconcilable books (two or more sources), or search every
/// canonical name when `--contains` is given.
pub fn cmd_books(database: &Path, contains: Option<&str>) -> Result<(), CliError> {
    let library = Library::open(database).map_err(CliError::store)?;
    let books = match contains {
        Some(fragment) => library.canonicals_like(fragment),
        None => library.list_canonical_books(),
    }
    .map_err(CliError::store)?;

    for book in &books {
        println!("{book}");
    }
    eprintln!("{} book(s)", books.len());
    Ok(())
}
