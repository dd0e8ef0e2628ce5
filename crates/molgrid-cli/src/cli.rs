use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "molgrid CLI - Grid molecular structures into voxel densities and stream gridded training batches.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Grid a single structure file and write one OpenDX file per channel.
    Grid(GridArgs),
    /// Stream gridded batches of examples listed in a types file.
    Batch(BatchArgs),
    /// List the channels of an atom typer.
    Types(TypesArgs),
}

/// Selects an atom typer by name or by mapping file.
#[derive(Args, Debug, Clone, Default)]
#[group(required = false, multiple = false)]
pub struct TyperSelection {
    /// Built-in typer (gnina, gnina-receptor, gnina-ligand, element, element-subset,
    /// gnina-vector, null).
    #[arg(long, value_name = "NAME")]
    pub typer: Option<String>,
    /// A mapping file that groups gnina type names into channels, one group per line.
    #[arg(long, value_name = "PATH")]
    pub map: Option<PathBuf>,
}

/// Arguments for the `grid` subcommand.
#[derive(Args, Debug)]
pub struct GridArgs {
    /// Path to the input structure (.bgf, .pdb, .sdf, .mol, .xyz, .gninatypes).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Output prefix; channels are written to PREFIX_<type>.dx.
    #[arg(short, long, required = true, value_name = "PREFIX")]
    pub output: String,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub typer: TyperSelection,

    /// Grid center as x,y,z. Defaults to the centroid of the typed atoms.
    #[arg(long, value_name = "X,Y,Z", allow_hyphen_values = true)]
    pub center: Option<String>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S grid.resolution=0.375
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `batch` subcommand.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Types file listing `label* [group] file+` per line.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub types: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of batches to grid.
    #[arg(long, default_value_t = 1, value_name = "INT")]
    pub batches: usize,

    /// Examples per batch. Defaults to `provider.default-batch-size`.
    #[arg(long, value_name = "INT")]
    pub batch_size: Option<usize>,

    /// Output stem; grids go to OUT.bin (little-endian f32) and labels to OUT.csv.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S provider.shuffle=true
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `types` subcommand.
#[derive(Args, Debug)]
pub struct TypesArgs {
    #[command(flatten)]
    pub typer: TyperSelection,
}
