use super::error::{ParseErrorKind, StructureReadError, parse_float, parse_int};
use super::traits::StructureFile;
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::structure::MolecularStructure;
use nalgebra::Point3;
use std::io::BufRead;

const FORMAT: &str = "XYZ";

/// Reader for XYZ coordinate files. Only the first frame is read and bonds are perceived
/// from distances.
pub struct XyzFile;

impl StructureFile for XyzFile {
    const FORMAT: &'static str = FORMAT;

    fn read_from(reader: &mut impl BufRead) -> Result<MolecularStructure, StructureReadError> {
        let mut lines = reader.lines();
        let eof = |what: &str| {
            StructureReadError::parse(FORMAT, 0, ParseErrorKind::UnexpectedEof(what.to_string()))
        };

        let count_line = lines.next().ok_or_else(|| eof("atom count"))??;
        let count: usize = parse_int(FORMAT, 1, "atom count", count_line.trim())?;
        let comment = lines.next().ok_or_else(|| eof("comment line"))??;

        let mut structure = MolecularStructure::with_title(comment.trim());
        for i in 0..count {
            let line_num = i + 3;
            let line = lines.next().ok_or_else(|| eof("atom lines"))??;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(StructureReadError::parse(
                    FORMAT,
                    line_num,
                    ParseErrorKind::MissingRequiredField {
                        field: "x y z".into(),
                    },
                ));
            }
            let element = fields[0]
                .parse::<Element>()
                .or_else(|_| {
                    fields[0]
                        .parse::<u8>()
                        .ok()
                        .and_then(Element::from_atomic_number)
                        .ok_or(())
                })
                .unwrap_or(Element::DUMMY);
            let x = parse_float(FORMAT, line_num, "x", fields[1])?;
            let y = parse_float(FORMAT, line_num, "y", fields[2])?;
            let z = parse_float(FORMAT, line_num, "z", fields[3])?;
            structure.add_atom(Atom::new(fields[0], element, Point3::new(x, y, z)));
        }

        if structure.is_empty() {
            return Err(StructureReadError::MissingRecord("atom lines".into()));
        }
        structure.perceive_bonds();
        Ok(structure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_water_and_perceives_bonds() {
        let water = "3\nwater\nO 0.0 0.0 0.0\nH 0.96 0.0 0.0\n1 -0.24 0.93 0.0\n";
        let s = XyzFile::read_from_str(water).unwrap();
        assert_eq!(s.title(), "water");
        assert_eq!(s.len(), 3);
        assert_eq!(s.atom(2).unwrap().element, Element::H);
        assert_eq!(s.degree(0), 2);
        assert!(s.bond_between(1, 2).is_none());
    }

    #[test]
    fn short_file_is_an_error() {
        let err = XyzFile::read_from_str("2\nx\nC 0 0 0\n").unwrap_err();
        assert!(matches!(
            err,
            StructureReadError::Parse { kind: ParseErrorKind::UnexpectedEof(_), .. }
        ));
    }
}
