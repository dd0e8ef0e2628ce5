use crate::cli::BatchArgs;
use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use molgrid::engine::progress::ProgressReporter;
use molgrid::engine::provider::ExampleProvider;
use molgrid::workflows::gridify::{self, GriddedBatch, WorkflowError};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Destination files for streamed batches.
struct BatchWriter {
    grids: BufWriter<File>,
    labels: csv::Writer<File>,
    grids_path: PathBuf,
    labels_path: PathBuf,
}

impl BatchWriter {
    fn create(stem: &Path) -> Result<Self> {
        let grids_path = stem.with_extension("bin");
        let labels_path = stem.with_extension("csv");
        if let Some(parent) = grids_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            grids: BufWriter::new(File::create(&grids_path)?),
            labels: csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&labels_path)?,
            grids_path,
            labels_path,
        })
    }

    fn write(&mut self, batch: &GriddedBatch) -> io::Result<()> {
        for value in batch.grids.iter() {
            self.grids.write_all(&value.to_le_bytes())?;
        }
        for row in batch.labels.rows() {
            let mut record = Vec::with_capacity(row.len() + 1);
            record.push(batch.index.to_string());
            record.extend(row.iter().map(|v| v.to_string()));
            self.labels.write_record(&record).map_err(io::Error::from)?;
        }
        Ok(())
    }

    fn finish(mut self) -> io::Result<(PathBuf, PathBuf)> {
        self.grids.flush()?;
        self.labels.flush()?;
        Ok((self.grids_path, self.labels_path))
    }
}

pub fn run(args: BatchArgs) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref(), &args.set_values)?;
    let batch_size = args.batch_size.unwrap_or(config.provider.default_batch_size);
    if batch_size == 0 {
        return Err(CliError::Argument("batch size must be at least 1".into()));
    }

    let mut provider = ExampleProvider::new(config.provider.clone(), config.typers()?)?;
    info!("Populating examples from {:?}", &args.types);
    let added = provider.populate(&args.types)?;
    println!(
        "Loaded {} example(s) with {} label(s) and {} channel(s).",
        added,
        provider.num_labels(),
        provider.num_types()
    );

    let mut writer = args.output.as_deref().map(BatchWriter::create).transpose()?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Gridding {} batch(es) of {} example(s)...", args.batches, batch_size);
    let stats = gridify::stream_batches(
        &mut provider,
        &config.grid,
        &config.augmentation,
        args.batches,
        batch_size,
        &reporter,
        |batch| match writer.as_mut() {
            Some(w) => w.write(&batch).map_err(WorkflowError::Output),
            None => Ok(()),
        },
    )?;

    if stats.examples == 0 {
        warn!("No examples were gridded.");
    }
    println!(
        "Gridded {} example(s) in {} batch(es), {:.1} atoms per example on average.",
        stats.examples,
        stats.batches,
        stats.mean_atoms()
    );
    println!(
        "Epochs completed: {} small, {} large.",
        stats.small_epochs, stats.large_epochs
    );

    if let Some(writer) = writer {
        let (grids_path, labels_path) = writer.finish()?;
        println!(
            "✓ Grids written to: {}\n✓ Labels written to: {}",
            grids_path.display(),
            labels_path.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array5};

    #[test]
    fn batch_writer_emits_little_endian_grids_and_indexed_labels() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("out").join("train");
        let mut writer = BatchWriter::create(&stem).unwrap();

        let mut grids = Array5::<f32>::zeros((2, 1, 1, 1, 2));
        grids[[0, 0, 0, 0, 1]] = 1.5;
        let labels = Array2::from_shape_vec((2, 1), vec![1.0, 0.0]).unwrap();
        let batch = GriddedBatch {
            index: 3,
            grids,
            labels,
            transforms: Vec::new(),
            new_epoch: false,
        };
        writer.write(&batch).unwrap();
        let (grids_path, labels_path) = writer.finish().unwrap();

        let bytes = std::fs::read(grids_path).unwrap();
        assert_eq!(bytes.len(), 4 * 4);
        assert_eq!(f32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1.5);

        let text = std::fs::read_to_string(labels_path).unwrap();
        assert_eq!(text, "3,1\n3,0\n");
    }
}
