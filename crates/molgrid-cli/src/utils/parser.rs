use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid point '{0}'. Expected three comma-separated numbers (e.g., '1.0,-2.5,3').")]
    InvalidPoint(String),
}

/// Parses `x,y,z` into three coordinates.
pub fn parse_point(text: &str) -> Result<[f32; 3], ParseError> {
    let values: Vec<f32> = text
        .split(',')
        .map(|t| t.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|_| ParseError::InvalidPoint(text.to_string()))?;
    match values.as_slice() {
        [x, y, z] if values.iter().all(|v| v.is_finite()) => Ok([*x, *y, *z]),
        _ => Err(ParseError::InvalidPoint(text.to_string())),
    }
}
