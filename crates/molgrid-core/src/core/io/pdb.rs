use super::error::{ParseErrorKind, StructureReadError, parse_float, parse_int};
use super::traits::StructureFile;
use crate::core::models::atom::Atom;
use crate::core::models::builder::StructureBuilder;
use crate::core::models::element::Element;
use crate::core::models::structure::MolecularStructure;
use crate::core::models::topology::BondOrder;
use crate::core::utils::text::slice_and_trim;
use nalgebra::Point3;
use phf::{Set, phf_set};
use std::io::BufRead;
use tracing::{debug, warn};

const FORMAT: &str = "PDB";

/// Ring atoms of the standard aromatic residues, keyed as `RES:ATOM`.
static AROMATIC_RESIDUE_ATOMS: Set<&'static str> = phf_set! {
    "PHE:CG", "PHE:CD1", "PHE:CD2", "PHE:CE1", "PHE:CE2", "PHE:CZ",
    "TYR:CG", "TYR:CD1", "TYR:CD2", "TYR:CE1", "TYR:CE2", "TYR:CZ",
    "TRP:CG", "TRP:CD1", "TRP:CD2", "TRP:NE1", "TRP:CE2", "TRP:CE3",
    "TRP:CZ2", "TRP:CZ3", "TRP:CH2",
    "HIS:CG", "HIS:ND1", "HIS:CD2", "HIS:CE1", "HIS:NE2",
    "HID:CG", "HID:ND1", "HID:CD2", "HID:CE1", "HID:NE2",
    "HIE:CG", "HIE:ND1", "HIE:CD2", "HIE:CE1", "HIE:NE2",
    "HIP:CG", "HIP:ND1", "HIP:CD2", "HIP:CE1", "HIP:NE2",
};

/// Reader for Protein Data Bank files.
///
/// Only the first model is read and only the first alternate location of each atom is
/// kept. Elements come from columns 77-78, falling back to the atom name. `CONECT`
/// records are honored, and the remaining connectivity is perceived from distances.
/// Ring atoms of standard aromatic residues are flagged aromatic.
pub struct PdbFile;

fn element_from_name(name: &str, hetero: bool) -> Element {
    let letters: String = name.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    if hetero && letters.len() <= 2 {
        if let Ok(element) = letters.parse::<Element>() {
            return element;
        }
    }
    letters
        .get(..1)
        .map_or(Element::DUMMY, Element::from_symbol_lossy)
}

impl StructureFile for PdbFile {
    const FORMAT: &'static str = FORMAT;

    fn read_from(reader: &mut impl BufRead) -> Result<MolecularStructure, StructureReadError> {
        let mut builder = StructureBuilder::new();
        let mut conect: Vec<(usize, usize)> = Vec::new();
        let mut current_chain = '\0';
        let mut current_residue: Option<(isize, String)> = None;
        let mut atom_count = 0usize;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let record = slice_and_trim(&line, 0, 6);

            match record {
                "ATOM" | "HETATM" => {
                    if line.len() < 54 {
                        return Err(StructureReadError::parse(
                            FORMAT,
                            line_num,
                            ParseErrorKind::LineTooShort { expected: 54 },
                        ));
                    }
                    let alt_loc = slice_and_trim(&line, 16, 17);
                    if !alt_loc.is_empty() && alt_loc != "A" && alt_loc != "1" {
                        continue;
                    }
                    let serial: usize =
                        parse_int(FORMAT, line_num, "columns 7-11", slice_and_trim(&line, 6, 11))?;
                    let name = slice_and_trim(&line, 12, 16);
                    let res_name = slice_and_trim(&line, 17, 20);
                    let chain_id = line.chars().nth(21).unwrap_or(' ');
                    let res_num_str = slice_and_trim(&line, 22, 26);
                    let res_num: isize = if res_num_str.is_empty() {
                        0
                    } else {
                        parse_int(FORMAT, line_num, "columns 23-26", res_num_str)?
                    };
                    let x = parse_float(FORMAT, line_num, "columns 31-38", slice_and_trim(&line, 30, 38))?;
                    let y = parse_float(FORMAT, line_num, "columns 39-46", slice_and_trim(&line, 38, 46))?;
                    let z = parse_float(FORMAT, line_num, "columns 47-54", slice_and_trim(&line, 46, 54))?;
                    let hetero = record == "HETATM";

                    let symbol = slice_and_trim(&line, 76, 78);
                    let element = match symbol.parse::<Element>() {
                        Ok(element) => element,
                        Err(_) => element_from_name(name, hetero),
                    };

                    if chain_id != current_chain {
                        builder.start_chain(chain_id);
                        current_chain = chain_id;
                        current_residue = None;
                    }
                    let residue_key = (res_num, res_name.to_string());
                    if current_residue.as_ref() != Some(&residue_key) {
                        builder.start_residue(res_num, res_name);
                        current_residue = Some(residue_key);
                    }

                    let mut atom = Atom::new(name, element, Point3::new(x, y, z));
                    atom.hetero = hetero;
                    atom.aromatic = AROMATIC_RESIDUE_ATOMS.contains(format!("{}:{}", res_name, name).as_str());
                    if builder.has_serial(serial) {
                        warn!("Skipping atom with duplicate serial {} on line {}.", serial, line_num);
                        continue;
                    }
                    builder.add_atom(serial, atom)?;
                    atom_count += 1;
                }
                "CONECT" => {
                    let Ok(origin) = slice_and_trim(&line, 6, 11).parse::<usize>() else {
                        continue;
                    };
                    for start in [11, 16, 21, 26] {
                        if let Ok(partner) = slice_and_trim(&line, start, start + 5).parse::<usize>() {
                            conect.push((origin.min(partner), origin.max(partner)));
                        }
                    }
                }
                "TITLE" => {
                    builder.title(slice_and_trim(&line, 10, 80));
                }
                "ENDMDL" | "END" => break,
                _ => {}
            }
        }

        if atom_count == 0 {
            return Err(StructureReadError::MissingRecord("ATOM/HETATM records".into()));
        }

        conect.sort_unstable();
        conect.dedup();
        let mut skipped = 0;
        for (a, b) in conect {
            if builder.has_serial(a) && builder.has_serial(b) {
                builder.add_bond(a, b, BondOrder::Single);
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            debug!("Ignored {} CONECT pairs referring to skipped atoms.", skipped);
        }

        let mut structure = builder.build()?;
        structure.perceive_bonds();
        Ok(structure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
TITLE     SMALL TEST
ATOM      1  N   PHE A   1      11.104   6.134  -6.504  1.00  0.00           N
ATOM      2  CA  PHE A   1      11.639   6.071  -5.147  1.00  0.00           C
ATOM      3  CG  PHE A   1      12.000   7.400  -4.600  1.00  0.00           C
ATOM      4  CB AALA A   2      20.000  20.000  20.000  0.50  0.00           C
ATOM      5  CB BALA A   2      20.100  20.000  20.000  0.50  0.00           C
HETATM    6 ZN    ZN A 101      30.000  30.000  30.000  1.00  0.00
HETATM    7  O   HOH A 201      40.000  40.000  40.000  1.00  0.00           O
CONECT    6    9
END
";

    #[test]
    fn reads_atoms_and_derives_elements() {
        let s = PdbFile::read_from_str(SAMPLE).unwrap();

        assert_eq!(s.title(), "SMALL TEST");
        assert_eq!(s.len(), 6);
        assert_eq!(s.atom(0).unwrap().element, Element::N);
        assert_eq!(s.atom(1).unwrap().element, Element::C);
        assert_eq!(s.atom(1).unwrap().name, "CA");
        assert_eq!(s.atom(4).unwrap().element, Element::ZN);
        assert!(s.atom(4).unwrap().hetero);
        assert_eq!(s.atom(5).unwrap().residue_name, "HOH");
        assert_eq!(s.atom(5).unwrap().residue_number, 201);
    }

    #[test]
    fn keeps_only_first_alternate_location() {
        let s = PdbFile::read_from_str(SAMPLE).unwrap();
        let alanine: Vec<_> = s.atoms().iter().filter(|a| a.residue_name == "ALA").collect();
        assert_eq!(alanine.len(), 1);
        assert!((alanine[0].position.x - 20.0).abs() < 1e-9);
    }

    #[test]
    fn marks_aromatic_ring_atoms_and_perceives_bonds() {
        let s = PdbFile::read_from_str(SAMPLE).unwrap();
        assert!(s.atom(2).unwrap().aromatic);
        assert!(!s.atom(1).unwrap().aromatic);
        assert!(s.bond_between(0, 1).is_some());
        assert!(s.neighbors(4).is_empty());
    }

    #[test]
    fn element_falls_back_to_atom_name() {
        assert_eq!(element_from_name("CA", false), Element::C);
        assert_eq!(element_from_name("CA", true), Element::CA);
        assert_eq!(element_from_name("1HB", false), Element::H);
        assert_eq!(element_from_name("CL1", true), Element::CL);
    }
}
