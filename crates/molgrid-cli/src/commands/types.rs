use super::select_typer;
use crate::cli::TypesArgs;
use crate::config::DEFAULT_LIGAND_TYPER;
use crate::error::Result;
use tracing::info;

pub fn run(args: TypesArgs) -> Result<()> {
    let typer = select_typer(&args.typer, DEFAULT_LIGAND_TYPER.as_str())?;
    let names = typer.type_names();
    let radii = typer.type_radii();
    info!("Typer provides {} channels.", names.len());

    println!("{:>5}  {:<32} {:>8}", "Index", "Channel", "Radius");
    for (i, (name, radius)) in names.iter().zip(&radii).enumerate() {
        println!("{:>5}  {:<32} {:>8.3}", i, name, radius);
    }
    Ok(())
}
