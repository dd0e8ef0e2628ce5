use crate::core::coords::CoordinateSet;
use crate::core::grid::{CartesianGrid, GridError, GridMaker};
use crate::core::io::error::StructureReadError;
use crate::core::io::load_structure;
use crate::core::transform::Transform;
use crate::core::typing::{Typer, TyperError};
use crate::engine::error::ProviderError;
use crate::engine::example::Example;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::provider::ExampleProvider;
use nalgebra::Point3;
use ndarray::{Array2, Array5};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Failed to read structure: {0}")]
    Structure(#[from] StructureReadError),
    #[error(transparent)]
    Typer(#[from] TyperError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Structure has no typed atoms")]
    NoAtoms,
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// A structure gridded on its own.
#[derive(Debug, Clone)]
pub struct GriddedStructure {
    pub grid: CartesianGrid,
    pub type_names: Vec<String>,
    pub num_atoms: usize,
}

/// Loads, types and grids one structure file.
///
/// The grid is centered at `center`, or at the centroid of the typed atoms.
#[instrument(skip_all, name = "grid_structure_workflow", fields(path = %path.as_ref().display()))]
pub fn grid_structure<P: AsRef<Path>>(
    path: P,
    typer: &Typer,
    gmaker: &GridMaker,
    center: Option<Point3<f32>>,
) -> Result<GriddedStructure, WorkflowError> {
    let path = path.as_ref();
    let source = load_structure(path)?;
    let name = path.display().to_string();
    let coords = CoordinateSet::from_source(&source, typer, Some(&name))?;
    if coords.is_empty() {
        return Err(WorkflowError::NoAtoms);
    }
    let center = center.unwrap_or_else(|| coords.center());
    info!(
        "Gridding {} of {} atoms into {} channels around ({:.3}, {:.3}, {:.3}).",
        coords.size(),
        source.len(),
        coords.num_types(),
        center.x,
        center.y,
        center.z
    );
    let mut values = gmaker.make_grid(coords.num_types());
    gmaker.forward(&center, &coords, values.view_mut())?;
    Ok(GriddedStructure {
        grid: CartesianGrid::new(values, center, gmaker.resolution(), gmaker.dimension()),
        type_names: typer.type_names(),
        num_atoms: coords.size(),
    })
}

/// Random augmentation applied to every gridded example.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Augmentation {
    pub random_translation: f32,
    pub random_rotation: bool,
    pub seed: Option<u64>,
}

/// One gridded batch handed to the sink.
#[derive(Debug, Clone)]
pub struct GriddedBatch {
    pub index: usize,
    pub grids: Array5<f32>,
    pub labels: Array2<f32>,
    pub transforms: Vec<Transform>,
    pub new_epoch: bool,
}

/// Totals over a streaming run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatchStats {
    pub batches: usize,
    pub examples: usize,
    pub atoms: usize,
    pub small_epochs: usize,
    pub large_epochs: usize,
}

impl BatchStats {
    pub fn mean_atoms(&self) -> f64 {
        if self.examples == 0 {
            0.0
        } else {
            self.atoms as f64 / self.examples as f64
        }
    }
}

/// Grids `num_batches` batches from `provider` and hands each to `sink`.
#[instrument(skip_all, name = "batch_workflow", fields(num_batches = num_batches, batch_size = batch_size))]
pub fn stream_batches(
    provider: &mut ExampleProvider,
    gmaker: &GridMaker,
    augmentation: &Augmentation,
    num_batches: usize,
    batch_size: usize,
    reporter: &ProgressReporter,
    mut sink: impl FnMut(GriddedBatch) -> Result<(), WorkflowError>,
) -> Result<BatchStats, WorkflowError> {
    let mut rng = match augmentation.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let channels = provider.num_types();
    info!(
        "Streaming {} batches from {} examples with {} channels.",
        num_batches,
        provider.size(),
        channels
    );

    reporter.report(Progress::PhaseStart { name: "Gridding batches" });
    reporter.report(Progress::TaskStart {
        total_steps: num_batches as u64,
    });

    let mut stats = BatchStats::default();
    for index in 0..num_batches {
        let examples = provider.next_batch(batch_size)?;
        let mut grids = gmaker.make_batch(examples.len(), channels);
        let transforms = gmaker.forward_batch(
            &examples,
            augmentation.random_translation,
            augmentation.random_rotation,
            &mut rng,
            grids.view_mut(),
        )?;
        stats.batches += 1;
        stats.examples += examples.len();
        stats.atoms += examples.iter().map(Example::num_coordinates).sum::<usize>();
        debug!("Batch {} gridded {} examples.", index, examples.len());

        sink(GriddedBatch {
            index,
            grids,
            labels: Example::extract_labels(&examples),
            transforms,
            new_epoch: provider.at_new_epoch(),
        })?;
        reporter.report(Progress::TaskIncrement);
    }
    stats.small_epochs = provider.small_epoch_num();
    stats.large_epochs = provider.large_epoch_num();

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    info!(
        "Gridded {} examples in {} batches ({:.1} atoms per example).",
        stats.examples,
        stats.batches,
        stats.mean_atoms()
    );
    Ok(stats)
}
