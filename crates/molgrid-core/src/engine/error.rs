use super::config::ConfigError;
use crate::core::coords::CoordinateError;
use crate::core::io::error::StructureReadError;
use crate::core::io::molcache::MolcacheError;
use crate::core::typing::TyperError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Example provider has no examples")]
    Empty,

    #[error("Types file {source_name} line {line}: {message}")]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("Failed to read types file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Structure file not found: {0:?}")]
    MissingFile(PathBuf),

    #[error("Failed to load structure {path:?}: {source}")]
    Structure {
        path: PathBuf,
        #[source]
        source: StructureReadError,
    },

    #[error("Sampler setup failed: {0}")]
    Sampler(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Molcache(#[from] MolcacheError),

    #[error(transparent)]
    Typer(#[from] TyperError),

    #[error(transparent)]
    Coordinates(#[from] CoordinateError),
}
