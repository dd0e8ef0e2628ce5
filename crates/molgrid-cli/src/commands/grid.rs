use super::select_typer;
use crate::cli::GridArgs;
use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::utils::parser;
use molgrid::workflows::gridify;
use nalgebra::Point3;
use tracing::info;

pub fn run(args: GridArgs) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref(), &args.set_values)?;
    let typer = select_typer(&args.typer, &config.ligand_typer)?;

    let center = match args.center.as_deref() {
        Some(text) => {
            let [x, y, z] = parser::parse_point(text).map_err(|e| CliError::Argument(e.to_string()))?;
            Some(Point3::new(x, y, z))
        }
        None => None,
    };

    info!("Loading input structure from {:?}", &args.input);
    let gridded = gridify::grid_structure(&args.input, &typer, &config.grid, center)?;

    let c = gridded.grid.center();
    println!(
        "Gridded {} atoms into {} channels of {}^3 points centered at ({:.3}, {:.3}, {:.3}).",
        gridded.num_atoms,
        gridded.grid.num_channels(),
        config.grid.dim(),
        c.x,
        c.y,
        c.z
    );

    let written = gridded.grid.write_dx(&args.output, &gridded.type_names)?;
    for path in &written {
        info!("Wrote {:?}", path);
    }
    println!(
        "✓ {} DX file(s) written with prefix: {}",
        written.len(),
        args.output
    );
    Ok(())
}
