use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileGridConfig {
    pub resolution: Option<f32>,
    pub dimension: Option<f32>,
    pub binary: Option<bool>,
    pub radius_scale: Option<f32>,
    pub gaussian_radius_multiple: Option<f32>,
    pub radii_type_indexed: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileProviderConfig {
    pub shuffle: Option<bool>,
    pub balanced: Option<bool>,
    pub stratify_receptor: Option<bool>,
    pub labelpos: Option<usize>,
    pub stratify_pos: Option<usize>,
    pub stratify_abs: Option<bool>,
    pub stratify_min: Option<f32>,
    pub stratify_max: Option<f32>,
    pub stratify_step: Option<f32>,
    pub group_batch_size: Option<usize>,
    pub max_group_size: Option<usize>,
    pub cache_structs: Option<bool>,
    pub duplicate_first: Option<bool>,
    pub make_vector_types: Option<bool>,
    pub data_root: Option<PathBuf>,
    pub recmolcache: Option<PathBuf>,
    pub ligmolcache: Option<PathBuf>,
    pub num_labels: Option<usize>,
    pub default_batch_size: Option<usize>,
    pub iteration_scheme: Option<String>,
    pub seed: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileTypingConfig {
    /// Typer name or mapping file for the first structure of each example.
    pub receptor: Option<String>,
    /// Typer name or mapping file for the remaining structures.
    pub ligand: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileAugmentationConfig {
    pub random_translation: Option<f32>,
    pub random_rotation: Option<bool>,
    pub seed: Option<u64>,
}

/// A configuration file in which every setting is optional.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub grid: Option<FileGridConfig>,
    pub provider: Option<FileProviderConfig>,
    pub typing: Option<FileTypingConfig>,
    pub augmentation: Option<FileAugmentationConfig>,
}

impl FileConfig {
    /// Reads `path` (when given), applies `KEY=VALUE` overrides, and deserializes.
    pub fn load(path: Option<&Path>, set_values: &[String]) -> Result<Self> {
        let mut table = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                debug!("Read configuration file {:?}", path);
                toml::from_str::<toml::Table>(&text).map_err(|e| CliError::FileParsing {
                    path: path.to_path_buf(),
                    source: e.into(),
                })?
            }
            None => toml::Table::new(),
        };
        apply_set_values(&mut table, set_values)?;
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| CliError::Config(e.to_string()))
    }
}

/// Parses a `--set` value as TOML, treating anything that is not valid TOML as a string.
fn parse_value(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("value = {}", raw))
        .ok()
        .and_then(|mut t| t.remove("value"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

fn apply_set_values(table: &mut toml::Table, set_values: &[String]) -> Result<()> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let Some((section, field)) = key.trim().split_once('.') else {
            return Err(CliError::Config(format!(
                "Invalid --set key: '{}'. Expected SECTION.KEY (e.g., provider.shuffle).",
                key
            )));
        };
        let entry = table
            .entry(section.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        let toml::Value::Table(section_table) = entry else {
            return Err(CliError::Config(format!("'{}' is not a configuration section", section)));
        };
        section_table.insert(field.replace('_', "-"), parse_value(value_str.trim()));
    }
    Ok(())
}
