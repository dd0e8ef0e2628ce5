use super::error::{ParseErrorKind, StructureReadError, parse_float, parse_int};
use super::traits::StructureFile;
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::structure::MolecularStructure;
use crate::core::models::topology::BondOrder;
use crate::core::utils::text::slice_and_trim;
use nalgebra::Point3;
use std::io::BufRead;

const FORMAT: &str = "SDF";

/// Reader for MDL molfiles and the first record of SD files (V2000 connection tables).
///
/// Bond type 4 marks both partners aromatic. Everything after `M  END` is ignored.
pub struct SdfFile;

fn bond_order_from_code(code: u8) -> BondOrder {
    match code {
        2 => BondOrder::Double,
        3 => BondOrder::Triple,
        4 => BondOrder::Aromatic,
        _ => BondOrder::Single,
    }
}

impl StructureFile for SdfFile {
    const FORMAT: &'static str = FORMAT;

    fn read_from(reader: &mut impl BufRead) -> Result<MolecularStructure, StructureReadError> {
        let mut lines = reader.lines().enumerate().map(|(i, l)| (i + 1, l));
        let mut next_line = |what: &str| -> Result<(usize, String), StructureReadError> {
            match lines.next() {
                Some((num, line)) => Ok((num, line?)),
                None => Err(StructureReadError::parse(
                    FORMAT,
                    0,
                    ParseErrorKind::UnexpectedEof(what.to_string()),
                )),
            }
        };

        let (_, title) = next_line("header")?;
        next_line("header")?;
        next_line("header")?;

        let (counts_num, counts) = next_line("counts line")?;
        if counts.contains("V3000") {
            return Err(StructureReadError::UnsupportedFormat("V3000 molfile".into()));
        }
        let atom_count: usize =
            parse_int(FORMAT, counts_num, "atom count", slice_and_trim(&counts, 0, 3))?;
        let bond_count: usize =
            parse_int(FORMAT, counts_num, "bond count", slice_and_trim(&counts, 3, 6))?;
        if atom_count == 0 {
            return Err(StructureReadError::MissingRecord("atom block".into()));
        }

        let mut structure = MolecularStructure::with_title(title.trim());
        for _ in 0..atom_count {
            let (num, line) = next_line("atom block")?;
            if line.len() < 34 {
                return Err(StructureReadError::parse(
                    FORMAT,
                    num,
                    ParseErrorKind::LineTooShort { expected: 34 },
                ));
            }
            let x = parse_float(FORMAT, num, "x", slice_and_trim(&line, 0, 10))?;
            let y = parse_float(FORMAT, num, "y", slice_and_trim(&line, 10, 20))?;
            let z = parse_float(FORMAT, num, "z", slice_and_trim(&line, 20, 30))?;
            let symbol = slice_and_trim(&line, 31, 34);
            let element = symbol.parse::<Element>().unwrap_or(Element::DUMMY);
            let mut atom = Atom::new(symbol, element, Point3::new(x, y, z));
            atom.hetero = true;
            structure.add_atom(atom);
        }

        for _ in 0..bond_count {
            let (num, line) = next_line("bond block")?;
            let a: usize = parse_int(FORMAT, num, "first atom", slice_and_trim(&line, 0, 3))?;
            let b: usize = parse_int(FORMAT, num, "second atom", slice_and_trim(&line, 3, 6))?;
            let code: u8 = parse_int(FORMAT, num, "bond type", slice_and_trim(&line, 6, 9))?;
            if a == 0 || b == 0 {
                return Err(StructureReadError::Inconsistency(format!(
                    "bond on line {} uses 0 as an atom number",
                    num
                )));
            }
            structure.add_bond(a - 1, b - 1, bond_order_from_code(code))?;
        }

        structure.mark_aromatic_from_bonds();
        Ok(structure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BENZALDEHYDE_FRAGMENT: &str = "\
fragment
  test

  4  3  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    1.3900    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
   -0.7000    1.2000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    2.1000    1.2000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  4  0
  1  3  4  0
  2  4  2  0
M  END
$$$$
";

    #[test]
    fn reads_atoms_bonds_and_aromaticity() {
        let s = SdfFile::read_from_str(BENZALDEHYDE_FRAGMENT).unwrap();
        assert_eq!(s.title(), "fragment");
        assert_eq!(s.len(), 4);
        assert_eq!(s.atom(3).unwrap().element, Element::O);
        assert_eq!(s.bonds().len(), 3);
        assert_eq!(s.bond_between(1, 3).unwrap().order, BondOrder::Double);
        assert!(s.atom(0).unwrap().aromatic);
        assert!(s.atom(2).unwrap().aromatic);
        assert!(!s.atom(3).unwrap().aromatic);
    }

    #[test]
    fn truncated_atom_block_is_an_error() {
        let truncated = "x\n\n\n  3  0  0  0  0  0  0  0  0  0999 V2000\n    0.0000    0.0000    0.0000 C   0  0\n";
        let err = SdfFile::read_from_str(truncated).unwrap_err();
        assert!(matches!(
            err,
            StructureReadError::Parse { kind: ParseErrorKind::UnexpectedEof(_), .. }
        ));
    }

    #[test]
    fn rejects_v3000() {
        let v3000 = "x\n\n\n  0  0  0     0  0            999 V3000\n";
        assert!(matches!(
            SdfFile::read_from_str(v3000),
            Err(StructureReadError::UnsupportedFormat(_))
        ));
    }
}
