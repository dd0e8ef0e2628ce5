use crate::core::models::structure::StructureError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StructureReadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{format} parse error on line {line}: {kind}")]
    Parse {
        format: &'static str,
        line: usize,
        kind: ParseErrorKind,
    },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Missing required record: {0}")]
    MissingRecord(String),
    #[error("Unsupported structure format for '{0}'")]
    UnsupportedFormat(String),
    #[error("Invalid structure: {0}")]
    Structure(#[from] StructureError),
}

#[derive(Debug, Error)]
pub enum ParseErrorKind {
    #[error("Invalid integer in {field} (value: '{value}')")]
    InvalidInt { field: String, value: String },
    #[error("Invalid float in {field} (value: '{value}')")]
    InvalidFloat { field: String, value: String },
    #[error("Required field {field} is empty")]
    MissingRequiredField { field: String },
    #[error("Line is too short (expected at least {expected} characters)")]
    LineTooShort { expected: usize },
    #[error("Unexpected end of file while reading {0}")]
    UnexpectedEof(String),
}

impl StructureReadError {
    pub(crate) fn parse(format: &'static str, line: usize, kind: ParseErrorKind) -> Self {
        Self::Parse { format, line, kind }
    }
}

pub(crate) fn parse_float(
    format: &'static str,
    line: usize,
    field: &str,
    value: &str,
) -> Result<f64, StructureReadError> {
    value.parse().map_err(|_| {
        StructureReadError::parse(
            format,
            line,
            ParseErrorKind::InvalidFloat {
                field: field.into(),
                value: value.into(),
            },
        )
    })
}

pub(crate) fn parse_int<T: std::str::FromStr>(
    format: &'static str,
    line: usize,
    field: &str,
    value: &str,
) -> Result<T, StructureReadError> {
    value.parse().map_err(|_| {
        StructureReadError::parse(
            format,
            line,
            ParseErrorKind::InvalidInt {
                field: field.into(),
                value: value.into(),
            },
        )
    })
}
