use super::error::{ParseErrorKind, StructureReadError, parse_float, parse_int};
use super::traits::StructureFile;
use crate::core::models::atom::Atom;
use crate::core::models::builder::StructureBuilder;
use crate::core::models::structure::MolecularStructure;
use crate::core::models::topology::BondOrder;
use crate::core::utils::text::{element_from_type_label, slice_and_trim};
use nalgebra::Point3;
use std::collections::HashMap;
use std::io::BufRead;

const FORMAT: &str = "BGF";

/// Reader for BIOGRAF (BGF) structure files.
///
/// Atom records follow the fixed-column layout written by DREIDING tools. Elements are
/// derived from the force field type, and types ending in `_R` mark aromatic atoms.
/// Connectivity comes from `CONECT` records with orders from matching `ORDER` records.
pub struct BgfFile;

impl StructureFile for BgfFile {
    const FORMAT: &'static str = FORMAT;

    fn read_from(reader: &mut impl BufRead) -> Result<MolecularStructure, StructureReadError> {
        let mut builder = StructureBuilder::new();
        let mut conect: Vec<(usize, usize)> = Vec::new();
        let mut orders: HashMap<(usize, usize), BondOrder> = HashMap::new();
        let mut current_chain = '\0';
        let mut current_residue = isize::MIN;
        let mut atom_count = 0usize;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            match slice_and_trim(&line, 0, 6) {
                "ATOM" | "HETATM" => {
                    if line.len() < 80 {
                        return Err(StructureReadError::parse(
                            FORMAT,
                            line_num,
                            ParseErrorKind::LineTooShort { expected: 80 },
                        ));
                    }
                    let serial: usize =
                        parse_int(FORMAT, line_num, "columns 8-12", slice_and_trim(&line, 7, 12))?;
                    let name = slice_and_trim(&line, 13, 18);
                    if name.is_empty() {
                        return Err(StructureReadError::parse(
                            FORMAT,
                            line_num,
                            ParseErrorKind::MissingRequiredField {
                                field: "columns 14-18".into(),
                            },
                        ));
                    }
                    let res_name = slice_and_trim(&line, 19, 22);
                    let chain_id = slice_and_trim(&line, 23, 24).chars().next().unwrap_or('A');
                    let res_id: isize =
                        parse_int(FORMAT, line_num, "columns 26-30", slice_and_trim(&line, 25, 30))?;
                    let x = parse_float(FORMAT, line_num, "columns 31-40", slice_and_trim(&line, 30, 40))?;
                    let y = parse_float(FORMAT, line_num, "columns 41-50", slice_and_trim(&line, 40, 50))?;
                    let z = parse_float(FORMAT, line_num, "columns 51-60", slice_and_trim(&line, 50, 60))?;
                    let ff_type = slice_and_trim(&line, 61, 66);
                    if ff_type.is_empty() {
                        return Err(StructureReadError::parse(
                            FORMAT,
                            line_num,
                            ParseErrorKind::MissingRequiredField {
                                field: "columns 62-66".into(),
                            },
                        ));
                    }
                    let charge = parse_float(FORMAT, line_num, "columns 73-80", slice_and_trim(&line, 72, 80))?;

                    if chain_id != current_chain {
                        builder.start_chain(chain_id);
                        current_chain = chain_id;
                        current_residue = isize::MIN;
                    }
                    if res_id != current_residue {
                        builder.start_residue(res_id, res_name);
                        current_residue = res_id;
                    }

                    let mut atom = Atom::new(name, element_from_type_label(ff_type), Point3::new(x, y, z));
                    atom.force_field_type = ff_type.to_string();
                    atom.partial_charge = charge;
                    atom.aromatic = ff_type.ends_with("_R");
                    atom.hetero = line.starts_with("HETATM");
                    builder.add_atom(serial, atom)?;
                    atom_count += 1;
                }
                record @ ("CONECT" | "ORDER") => {
                    let parts: Vec<&str> = line.split_whitespace().collect();
                    let Some(Ok(origin)) = parts.get(1).map(|p| p.parse::<usize>()) else {
                        continue;
                    };
                    if record == "CONECT" {
                        for partner in parts.iter().skip(2).filter_map(|p| p.parse::<usize>().ok()) {
                            conect.push((origin.min(partner), origin.max(partner)));
                        }
                    } else if let Some(Ok(partner)) = parts.get(2).map(|p| p.parse::<usize>()) {
                        let order = parts
                            .get(3)
                            .and_then(|o| o.parse().ok())
                            .unwrap_or_default();
                        orders.insert((origin.min(partner), origin.max(partner)), order);
                    }
                }
                "END" => break,
                _ => {
                    if let Some(title) = line.strip_prefix("DESCRP") {
                        builder.title(title.trim());
                    }
                }
            }
        }

        if atom_count == 0 {
            return Err(StructureReadError::MissingRecord("ATOM/HETATM records".into()));
        }

        conect.sort_unstable();
        conect.dedup();
        for (a, b) in conect {
            let order = orders.get(&(a, b)).copied().unwrap_or_default();
            builder.add_bond(a, b, order);
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::element::Element;

    fn atom_line(serial: usize, name: &str, x: f64, ff: &str, charge: f64) -> String {
        format!(
            "{:<6} {:>5} {:<5} {:>3} {:1} {:>5}{:>10.5}{:>10.5}{:>10.5} {:<5}{:>3}{:>2} {:>8.5}",
            "HETATM", serial, name, "LIG", "A", 1, x, 0.0, 0.0, ff, 1, 0, charge
        )
    }

    fn sample() -> String {
        [
            "BIOGRF  332".to_string(),
            "DESCRP benzene fragment".to_string(),
            "FORMAT ATOM   (a6,1x,i5,1x,a5,1x,a3,1x,a1,1x,a5,3f10.5,1x,a5,i3,i2,1x,f8.5)".to_string(),
            atom_line(1, "C1", 0.0, "C_R", -0.1),
            atom_line(2, "C2", 1.39, "C_R", -0.1),
            atom_line(3, "H1", -1.0, "H_", 0.1),
            "CONECT     1     2     3".to_string(),
            "ORDER      1     2     2".to_string(),
            "END".to_string(),
        ]
        .join("\n")
    }

    #[test]
    fn reads_atoms_types_and_connectivity() {
        let s = BgfFile::read_from_str(&sample()).unwrap();

        assert_eq!(s.title(), "benzene fragment");
        assert_eq!(s.len(), 3);
        let c1 = s.atom(0).unwrap();
        assert_eq!(c1.element, Element::C);
        assert_eq!(c1.force_field_type, "C_R");
        assert!(c1.aromatic);
        assert!(c1.hetero);
        assert_eq!(c1.residue_name, "LIG");
        assert!((c1.partial_charge + 0.1).abs() < 1e-9);
        assert_eq!(s.atom(2).unwrap().element, Element::H);
        assert!(!s.atom(2).unwrap().aromatic);

        assert_eq!(s.bonds().len(), 2);
        assert_eq!(s.bond_between(0, 1).unwrap().order, BondOrder::Double);
        assert_eq!(s.bond_between(0, 2).unwrap().order, BondOrder::Single);
    }

    #[test]
    fn short_atom_line_is_a_parse_error() {
        let content = "HETATM     1 C1    LIG A    1   0.0 0.0 0.0\nEND\n";
        let err = BgfFile::read_from_str(content).unwrap_err();
        assert!(matches!(
            err,
            StructureReadError::Parse {
                line: 1,
                kind: ParseErrorKind::LineTooShort { .. },
                ..
            }
        ));
    }

    #[test]
    fn file_without_atoms_is_rejected() {
        let err = BgfFile::read_from_str("BIOGRF  332\nEND\n").unwrap_err();
        assert!(matches!(err, StructureReadError::MissingRecord(_)));
    }
}
