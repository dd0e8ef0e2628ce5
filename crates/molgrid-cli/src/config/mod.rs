//! Configuration loading: TOML files and `--set` overrides merged over library defaults.

pub mod file;

use crate::error::{CliError, Result};
use file::{FileAugmentationConfig, FileConfig, FileGridConfig, FileProviderConfig, FileTypingConfig};
use molgrid::core::grid::GridMaker;
use molgrid::core::typing::{Typer, TyperName};
use molgrid::engine::config::{ExampleProviderSettings, IterationScheme};
use molgrid::workflows::gridify::Augmentation;
use std::path::Path;

pub const DEFAULT_RECEPTOR_TYPER: TyperName = TyperName::GninaReceptor;
pub const DEFAULT_LIGAND_TYPER: TyperName = TyperName::GninaLigand;

/// Fully resolved settings for a command.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub grid: GridMaker,
    pub provider: ExampleProviderSettings,
    pub receptor_typer: String,
    pub ligand_typer: String,
    pub augmentation: Augmentation,
}

impl AppConfig {
    pub fn load(path: Option<&Path>, set_values: &[String]) -> Result<Self> {
        let file = FileConfig::load(path, set_values)?;
        Self::from_file_config(file)
    }

    pub fn from_file_config(file: FileConfig) -> Result<Self> {
        let typing = file.typing.unwrap_or_default();
        Ok(Self {
            grid: build_grid_maker(file.grid.unwrap_or_default())?,
            provider: build_provider_settings(file.provider.unwrap_or_default())?,
            receptor_typer: resolve_typer_name(&typing, true),
            ligand_typer: resolve_typer_name(&typing, false),
            augmentation: build_augmentation(file.augmentation.unwrap_or_default())?,
        })
    }

    /// Typers for the receptor and the remaining structures of an example.
    pub fn typers(&self) -> Result<Vec<Typer>> {
        Ok(vec![
            Typer::resolve(&self.receptor_typer)?,
            Typer::resolve(&self.ligand_typer)?,
        ])
    }
}

fn resolve_typer_name(typing: &FileTypingConfig, receptor: bool) -> String {
    let (value, default) = if receptor {
        (&typing.receptor, DEFAULT_RECEPTOR_TYPER)
    } else {
        (&typing.ligand, DEFAULT_LIGAND_TYPER)
    };
    value.clone().unwrap_or_else(|| default.as_str().to_string())
}

fn build_grid_maker(file: FileGridConfig) -> Result<GridMaker> {
    let mut builder = GridMaker::builder();
    if let Some(v) = file.resolution {
        builder = builder.resolution(v);
    }
    if let Some(v) = file.dimension {
        builder = builder.dimension(v);
    }
    if let Some(v) = file.binary {
        builder = builder.binary(v);
    }
    if let Some(v) = file.radius_scale {
        builder = builder.radius_scale(v);
    }
    if let Some(v) = file.gaussian_radius_multiple {
        builder = builder.gaussian_radius_multiple(v);
    }
    if let Some(v) = file.radii_type_indexed {
        builder = builder.radii_type_indexed(v);
    }
    Ok(builder.build()?)
}

fn build_provider_settings(file: FileProviderConfig) -> Result<ExampleProviderSettings> {
    let defaults = ExampleProviderSettings::default();
    let iteration_scheme = match file.iteration_scheme {
        Some(name) => name
            .parse::<IterationScheme>()
            .map_err(|e| CliError::Config(e.to_string()))?,
        None => defaults.iteration_scheme,
    };
    let settings = ExampleProviderSettings {
        shuffle: file.shuffle.unwrap_or(defaults.shuffle),
        balanced: file.balanced.unwrap_or(defaults.balanced),
        stratify_receptor: file.stratify_receptor.unwrap_or(defaults.stratify_receptor),
        labelpos: file.labelpos.unwrap_or(defaults.labelpos),
        stratify_pos: file.stratify_pos.unwrap_or(defaults.stratify_pos),
        stratify_abs: file.stratify_abs.unwrap_or(defaults.stratify_abs),
        stratify_min: file.stratify_min.unwrap_or(defaults.stratify_min),
        stratify_max: file.stratify_max.unwrap_or(defaults.stratify_max),
        stratify_step: file.stratify_step.unwrap_or(defaults.stratify_step),
        group_batch_size: file.group_batch_size.unwrap_or(defaults.group_batch_size),
        max_group_size: file.max_group_size.unwrap_or(defaults.max_group_size),
        cache_structs: file.cache_structs.unwrap_or(defaults.cache_structs),
        duplicate_first: file.duplicate_first.unwrap_or(defaults.duplicate_first),
        make_vector_types: file.make_vector_types.unwrap_or(defaults.make_vector_types),
        data_root: file.data_root.unwrap_or(defaults.data_root),
        recmolcache: file.recmolcache,
        ligmolcache: file.ligmolcache,
        num_labels: file.num_labels,
        default_batch_size: file.default_batch_size.unwrap_or(defaults.default_batch_size),
        iteration_scheme,
        seed: file.seed,
    };
    settings
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(settings)
}

fn build_augmentation(file: FileAugmentationConfig) -> Result<Augmentation> {
    let random_translation = file.random_translation.unwrap_or(0.0);
    if !random_translation.is_finite() {
        return Err(CliError::Config(format!(
            "augmentation.random-translation must be a finite number, got {}",
            random_translation
        )));
    }
    Ok(Augmentation {
        random_translation,
        random_rotation: file.random_rotation.unwrap_or(false),
        seed: file.seed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_resolves_to_library_defaults() {
        let app = AppConfig::load(None, &[]).unwrap();
        assert_eq!(app.grid, GridMaker::default());
        assert_eq!(app.provider, ExampleProviderSettings::default());
        assert_eq!(app.receptor_typer, "gnina-receptor");
        assert_eq!(app.ligand_typer, "gnina-ligand");
        assert_eq!(app.augmentation, Augmentation::default());
        assert_eq!(app.typers().unwrap().len(), 2);
    }

    #[test]
    fn overrides_flow_into_library_types() {
        let sets: Vec<String> = [
            "grid.dimension=12",
            "grid.binary=true",
            "provider.balanced=true",
            "provider.iteration-scheme=small-epoch",
            "augmentation.random-translation=2.0",
            "augmentation.seed=7",
            "typing.ligand=element",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let app = AppConfig::load(None, &sets).unwrap();
        assert_eq!(app.grid.dim(), 25);
        assert!(app.grid.binary());
        assert!(app.provider.balanced);
        assert_eq!(app.provider.iteration_scheme, IterationScheme::SmallEpoch);
        assert_eq!(app.augmentation.random_translation, 2.0);
        assert_eq!(app.augmentation.seed, Some(7));
        assert_eq!(app.typers().unwrap()[1].num_types(), 84);
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        assert!(matches!(
            AppConfig::load(None, &["grid.resolution=-1".to_string()]),
            Err(CliError::Grid(_))
        ));
        assert!(matches!(
            AppConfig::load(None, &["provider.iteration-scheme=forever".to_string()]),
            Err(CliError::Config(_))
        ));
        assert!(matches!(
            AppConfig::load(None, &["provider.default-batch-size=0".to_string()]),
            Err(CliError::Config(_))
        ));
        for value in ["nan", "inf", "-inf"] {
            assert!(matches!(
                AppConfig::load(None, &[format!("augmentation.random-translation={}", value)]),
                Err(CliError::Config(_))
            ));
        }
    }
}
