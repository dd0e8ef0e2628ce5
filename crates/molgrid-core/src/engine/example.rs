use crate::core::coords::{CoordinateError, CoordinateSet};
use ndarray::Array2;

/// One parsed line of a types file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExampleRef {
    pub labels: Vec<f32>,
    pub group: Option<i32>,
    pub files: Vec<String>,
}

fn is_numeric(token: &str) -> bool {
    token.parse::<f32>().is_ok()
}

impl ExampleRef {
    /// Counts the leading numeric tokens of a line, ignoring any comment.
    pub fn count_numeric_prefix(line: &str) -> usize {
        strip_comment(line)
            .split_whitespace()
            .take_while(|t| is_numeric(t))
            .count()
    }

    /// Parses `label* [group] file+ [# comment]`.
    ///
    /// Returns `Ok(None)` for blank and comment-only lines.
    pub fn parse(line: &str, num_labels: usize, has_group: bool) -> Result<Option<Self>, String> {
        let mut tokens = strip_comment(line).split_whitespace().peekable();
        if tokens.peek().is_none() {
            return Ok(None);
        }
        let mut labels = Vec::with_capacity(num_labels);
        for i in 0..num_labels {
            let token = tokens
                .next()
                .ok_or_else(|| format!("expected {} labels, found {}", num_labels, i))?;
            let value = token
                .parse::<f32>()
                .map_err(|_| format!("invalid label '{}'", token))?;
            labels.push(value);
        }
        let group = if has_group {
            let token = tokens.next().ok_or("missing group id")?;
            let value = token
                .parse::<f32>()
                .map_err(|_| format!("invalid group id '{}'", token))?;
            Some(value as i32)
        } else {
            None
        };
        let files: Vec<String> = tokens.map(str::to_string).collect();
        if files.is_empty() {
            return Err("no structure files listed".to_string());
        }
        Ok(Some(Self {
            labels,
            group,
            files,
        }))
    }

    /// The first file; examples sharing it share a receptor.
    pub fn receptor(&self) -> &str {
        self.files.first().map(String::as_str).unwrap_or("")
    }

    pub fn label(&self, pos: usize) -> Option<f32> {
        self.labels.get(pos).copied()
    }
}

fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(data, _)| data)
}

/// A loaded example: typed coordinate sets plus labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub coord_sets: Vec<CoordinateSet>,
    pub labels: Vec<f32>,
    pub group: Option<i32>,
    /// True when this example continues its group's sequence from the previous batch.
    pub seqcont: bool,
}

impl Example {
    pub fn new(coord_sets: Vec<CoordinateSet>, labels: Vec<f32>, group: Option<i32>) -> Self {
        Self {
            coord_sets,
            labels,
            group,
            seqcont: false,
        }
    }

    /// Total number of atoms over all coordinate sets.
    pub fn num_coordinates(&self) -> usize {
        self.coord_sets.iter().map(CoordinateSet::size).sum()
    }

    /// Number of types of the merged example: the sum over sets when types are kept
    /// unique, else the widest set.
    pub fn num_types(&self, unique_index_types: bool) -> usize {
        let counts = self.coord_sets.iter().map(CoordinateSet::num_types);
        if unique_index_types {
            counts.sum()
        } else {
            counts.max().unwrap_or(0)
        }
    }

    pub fn merge_coordinates(&self, unique_index_types: bool) -> Result<CoordinateSet, CoordinateError> {
        let sets: Vec<&CoordinateSet> = self.coord_sets.iter().collect();
        CoordinateSet::merge(&sets, unique_index_types)
    }

    /// Merges only the sets from `start` onward, e.g. to skip the receptor.
    pub fn merge_coordinates_from(
        &self,
        start: usize,
        unique_index_types: bool,
    ) -> Result<CoordinateSet, CoordinateError> {
        let sets: Vec<&CoordinateSet> = self.coord_sets.iter().skip(start).collect();
        CoordinateSet::merge(&sets, unique_index_types)
    }

    pub fn sum_types(&self, unique_index_types: bool) -> Result<Vec<f32>, CoordinateError> {
        Ok(self.merge_coordinates(unique_index_types)?.sum_types())
    }

    pub fn has_index_types(&self) -> bool {
        self.coord_sets.iter().all(CoordinateSet::has_indexed_types)
    }

    pub fn has_vector_types(&self) -> bool {
        !self.coord_sets.is_empty() && self.coord_sets.iter().all(CoordinateSet::has_vector_types)
    }

    /// Label `pos` of every example; missing labels read as 0.
    pub fn extract_label(examples: &[Example], pos: usize) -> Vec<f32> {
        examples
            .iter()
            .map(|e| e.labels.get(pos).copied().unwrap_or(0.0))
            .collect()
    }

    /// A `batch x num_labels` matrix of labels, padded with zeros.
    pub fn extract_labels(examples: &[Example]) -> Array2<f32> {
        let width = examples.iter().map(|e| e.labels.len()).max().unwrap_or(0);
        let mut out = Array2::zeros((examples.len(), width));
        for (mut row, example) in out.outer_iter_mut().zip(examples) {
            for (dst, src) in row.iter_mut().zip(&example.labels) {
                *dst = *src;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn parses_labels_group_files_and_comments() {
        let r = ExampleRef::parse("1 -7.5 rec.pdb lig.sdf # docked pose", 2, false)
            .unwrap()
            .unwrap();
        assert_eq!(r.labels, vec![1.0, -7.5]);
        assert_eq!(r.group, None);
        assert_eq!(r.files, vec!["rec.pdb", "lig.sdf"]);
        assert_eq!(r.receptor(), "rec.pdb");

        let g = ExampleRef::parse("0 12 rec.gninatypes lig.gninatypes", 1, true)
            .unwrap()
            .unwrap();
        assert_eq!(g.labels, vec![0.0]);
        assert_eq!(g.group, Some(12));
    }

    #[test]
    fn blank_and_malformed_lines() {
        assert_eq!(ExampleRef::parse("   # nothing", 1, false), Ok(None));
        assert!(ExampleRef::parse("1 2", 2, false).is_err());
        assert!(ExampleRef::parse("x rec.pdb", 1, false).is_err());
        assert_eq!(ExampleRef::count_numeric_prefix("1 0.5 3 rec.pdb 4"), 3);
    }

    fn set(n: usize, t: i32, max_type: usize) -> CoordinateSet {
        CoordinateSet::new_indexed(vec![Point3::origin(); n], vec![t; n], vec![1.0; n], max_type).unwrap()
    }

    #[test]
    fn counts_merges_and_labels() {
        let a = Example::new(vec![set(3, 1, 2), set(2, 0, 3)], vec![1.0, 2.0], None);
        assert_eq!(a.num_coordinates(), 5);
        assert_eq!(a.num_types(true), 5);
        assert_eq!(a.num_types(false), 3);
        assert!(a.has_index_types());
        assert!(!a.has_vector_types());
        assert_eq!(a.sum_types(true).unwrap(), vec![0.0, 3.0, 2.0, 0.0, 0.0]);
        assert_eq!(a.merge_coordinates_from(1, true).unwrap().size(), 2);

        let b = Example::new(vec![], vec![0.0], Some(4));
        let batch = [a, b];
        assert_eq!(Example::extract_label(&batch, 1), vec![2.0, 0.0]);
        let labels = Example::extract_labels(&batch);
        assert_eq!(labels.shape(), &[2, 2]);
        assert_eq!(labels[[1, 0]], 0.0);
        assert_eq!(labels[[0, 1]], 2.0);
    }
}
