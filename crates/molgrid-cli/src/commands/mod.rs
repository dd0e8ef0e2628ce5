pub mod batch;
pub mod grid;
pub mod types;

use crate::cli::TyperSelection;
use crate::error::Result;
use molgrid::core::typing::Typer;
use tracing::debug;

/// Builds the typer named on the command line, or `fallback` when none was given.
pub(crate) fn select_typer(selection: &TyperSelection, fallback: &str) -> Result<Typer> {
    let typer = match (&selection.typer, &selection.map) {
        (_, Some(path)) => {
            debug!("Loading type mapping from {:?}", path);
            Typer::from_map_file(path)?
        }
        (Some(name), None) => Typer::resolve(name)?,
        (None, None) => Typer::resolve(fallback)?,
    };
    Ok(typer)
}
