//! OpenDX scalar field input and output for single grid channels.

use ndarray::{Array3, ArrayView3, ArrayView4};
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Writes one channel as an OpenDX scalar field.
///
/// `origin` is the position of the first grid point. Values are written three per
/// line with the last axis varying fastest.
pub fn write_dx(
    writer: &mut impl Write,
    grid: ArrayView3<f32>,
    origin: &Point3<f32>,
    resolution: f32,
) -> io::Result<()> {
    let (nx, ny, nz) = grid.dim();

    writeln!(writer, "object 1 class gridpositions counts {} {} {}", nx, ny, nz)?;
    writeln!(writer, "origin {:.5} {:.5} {:.5}", origin.x, origin.y, origin.z)?;
    writeln!(writer, "delta {:.5} 0 0", resolution)?;
    writeln!(writer, "delta 0 {:.5} 0", resolution)?;
    writeln!(writer, "delta 0 0 {:.5}", resolution)?;
    writeln!(writer, "object 2 class gridconnections counts {} {} {}", nx, ny, nz)?;
    writeln!(
        writer,
        "object 3 class array type double rank 0 items {} data follows",
        nx * ny * nz
    )?;

    let mut column = 0;
    for value in grid.iter() {
        if column > 0 {
            write!(writer, " ")?;
        }
        write!(writer, "{:.5}", value)?;
        column += 1;
        if column == 3 {
            writeln!(writer)?;
            column = 0;
        }
    }
    if column != 0 {
        writeln!(writer)?;
    }
    writeln!(writer, "attribute \"dep\" string \"positions\"")?;
    writeln!(writer, "object \"regular positions regular connections\" class field")?;
    writeln!(writer, "component \"positions\" value 1")?;
    writeln!(writer, "component \"connections\" value 2")?;
    writeln!(writer, "component \"data\" value 3")?;
    Ok(())
}

/// Writes each channel of a grid to `<prefix>_<name>.dx` and returns the paths written.
///
/// # Errors
///
/// Returns [`io::ErrorKind::InvalidInput`] when the number of names differs from the
/// number of channels.
pub fn write_dx_grids(
    prefix: &str,
    names: &[String],
    grid: ArrayView4<f32>,
    origin: &Point3<f32>,
    resolution: f32,
) -> io::Result<Vec<PathBuf>> {
    if names.len() != grid.shape()[0] {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{} channel names given for a grid with {} channels",
                names.len(),
                grid.shape()[0]
            ),
        ));
    }
    let mut written = Vec::with_capacity(names.len());
    for (name, channel) in names.iter().zip(grid.outer_iter()) {
        let path = PathBuf::from(format!("{}_{}.dx", prefix, name));
        let mut writer = BufWriter::new(File::create(&path)?);
        write_dx(&mut writer, channel, origin, resolution)?;
        writer.flush()?;
        debug!("Wrote channel '{}' to {}", name, path.display());
        written.push(path);
    }
    Ok(written)
}

/// A grid channel read back from an OpenDX file.
#[derive(Debug, Clone)]
pub struct DxGrid {
    pub values: Array3<f32>,
    pub origin: Point3<f32>,
    pub resolution: f32,
}

/// Reads a cubic-voxel OpenDX scalar field as written by [`write_dx`].
pub fn read_dx(reader: &mut impl BufRead) -> io::Result<DxGrid> {
    let mut counts: Option<(usize, usize, usize)> = None;
    let mut origin: Option<Point3<f32>> = None;
    let mut resolution: Option<f32> = None;
    let mut values: Vec<f32> = Vec::new();
    let mut in_data = false;

    let parse_f32 = |token: &str| {
        token
            .parse::<f32>()
            .map_err(|_| invalid(format!("invalid number '{}' in dx file", token)))
    };

    for line in reader.lines() {
        let line = line?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&first) = tokens.first() else {
            continue;
        };
        if in_data {
            if first.starts_with(|c: char| c.is_ascii_alphabetic()) {
                in_data = false;
                continue;
            }
            for token in tokens {
                values.push(parse_f32(token)?);
            }
            continue;
        }
        match first {
            "object" if line.contains("gridpositions") => {
                let n = tokens.len();
                if n < 3 {
                    return Err(invalid("truncated gridpositions line".into()));
                }
                let dims: Vec<usize> = tokens[n - 3..]
                    .iter()
                    .map(|t| t.parse().map_err(|_| invalid(format!("invalid count '{}'", t))))
                    .collect::<io::Result<_>>()?;
                counts = Some((dims[0], dims[1], dims[2]));
            }
            "object" if line.contains("data follows") => in_data = true,
            "origin" if tokens.len() >= 4 => {
                origin = Some(Point3::new(
                    parse_f32(tokens[1])?,
                    parse_f32(tokens[2])?,
                    parse_f32(tokens[3])?,
                ));
            }
            "delta" if tokens.len() >= 4 && resolution.is_none() => {
                resolution = Some(parse_f32(tokens[1])?);
            }
            _ => {}
        }
    }

    let (nx, ny, nz) = counts.ok_or_else(|| invalid("dx file has no gridpositions".into()))?;
    let origin = origin.ok_or_else(|| invalid("dx file has no origin".into()))?;
    let resolution = resolution.ok_or_else(|| invalid("dx file has no delta".into()))?;
    let values = Array3::from_shape_vec((nx, ny, nz), values)
        .map_err(|e| invalid(format!("dx data does not match counts: {}", e)))?;
    Ok(DxGrid {
        values,
        origin,
        resolution,
    })
}

pub fn read_dx_path<P: AsRef<Path>>(path: P) -> io::Result<DxGrid> {
    read_dx(&mut BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;
    use tempfile::tempdir;

    #[test]
    fn header_records_the_first_grid_point() {
        let grid = Array3::<f32>::zeros((5, 5, 5));
        let mut out = Vec::new();
        write_dx(&mut out, grid.view(), &Point3::new(0.0, 1.0, 2.0), 0.5).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("object 1 class gridpositions counts 5 5 5"));
        assert_eq!(lines.next(), Some("origin 0.00000 1.00000 2.00000"));
        assert!(text.contains("items 125 data follows"));
    }

    #[test]
    fn write_then_read_restores_values_and_origin() {
        let mut grid = Array3::<f32>::zeros((3, 4, 2));
        grid[[0, 0, 1]] = 0.25;
        grid[[2, 3, 0]] = 1.0;
        let mut out = Vec::new();
        write_dx(&mut out, grid.view(), &Point3::new(-11.85, 0.0, 4.0), 1.0).unwrap();

        let parsed = read_dx(&mut out.as_slice()).unwrap();
        assert_eq!(parsed.values, grid);
        assert!((parsed.resolution - 1.0).abs() < 1e-6);
        assert!((parsed.origin - Point3::new(-11.85, 0.0, 4.0)).norm() < 1e-4);
    }

    #[test]
    fn writes_one_file_per_channel() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("lig");
        let grid = Array4::<f32>::zeros((2, 3, 3, 3));
        let names = vec!["C".to_string(), "N".to_string()];
        let paths =
            write_dx_grids(prefix.to_str().unwrap(), &names, grid.view(), &Point3::origin(), 0.5)
                .unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[1].ends_with("lig_N.dx"));
        assert!(paths.iter().all(|p| p.exists()));
    }

    #[test]
    fn channel_name_count_must_match() {
        let grid = Array4::<f32>::zeros((2, 1, 1, 1));
        let err =
            write_dx_grids("x", &["only".to_string()], grid.view(), &Point3::origin(), 0.5)
                .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
