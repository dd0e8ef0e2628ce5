use super::{AtomTyper, IndexTyper, VectorTyper};
use crate::core::models::element::Element;
use crate::core::models::structure::MolecularStructure;
use phf::{Map, phf_map};

/// The smina/gnina atom types, in their canonical index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum GninaType {
    Hydrogen = 0,
    PolarHydrogen,
    AliphaticCarbonXSHydrophobe,
    AliphaticCarbonXSNonHydrophobe,
    AromaticCarbonXSHydrophobe,
    AromaticCarbonXSNonHydrophobe,
    Nitrogen,
    NitrogenXSDonor,
    NitrogenXSDonorAcceptor,
    NitrogenXSAcceptor,
    Oxygen,
    OxygenXSDonor,
    OxygenXSDonorAcceptor,
    OxygenXSAcceptor,
    Sulfur,
    SulfurAcceptor,
    Phosphorus,
    Fluorine,
    Chlorine,
    Bromine,
    Iodine,
    Magnesium,
    Manganese,
    Zinc,
    Calcium,
    Iron,
    GenericMetal,
    Boron,
}

pub const NUM_GNINA_TYPES: usize = 28;

/// Static properties of one gnina type.
#[derive(Debug, Clone, Copy)]
pub struct GninaTypeInfo {
    pub name: &'static str,
    /// AutoDock type label.
    pub ad_name: &'static str,
    pub element: Element,
    pub covalent_radius: f32,
    pub xs_radius: f32,
    pub xs_hydrophobe: bool,
    pub xs_donor: bool,
    pub xs_acceptor: bool,
    pub ad_heteroatom: bool,
}

const fn info(
    name: &'static str,
    ad_name: &'static str,
    element: Element,
    covalent_radius: f32,
    xs_radius: f32,
    flags: [bool; 4],
) -> GninaTypeInfo {
    GninaTypeInfo {
        name,
        ad_name,
        element,
        covalent_radius,
        xs_radius,
        xs_hydrophobe: flags[0],
        xs_donor: flags[1],
        xs_acceptor: flags[2],
        ad_heteroatom: flags[3],
    }
}

const NONE: [bool; 4] = [false, false, false, false];
const HETERO: [bool; 4] = [false, false, false, true];
const METAL: [bool; 4] = [false, true, false, true];

pub static GNINA_TYPES: [GninaTypeInfo; NUM_GNINA_TYPES] = [
    info("Hydrogen", "H", Element::H, 0.37, 0.37, NONE),
    info("PolarHydrogen", "HD", Element::H, 0.37, 0.37, NONE),
    info("AliphaticCarbonXSHydrophobe", "C", Element::C, 0.77, 1.9, [true, false, false, false]),
    info("AliphaticCarbonXSNonHydrophobe", "C", Element::C, 0.77, 1.9, NONE),
    info("AromaticCarbonXSHydrophobe", "A", Element::C, 0.77, 1.9, [true, false, false, false]),
    info("AromaticCarbonXSNonHydrophobe", "A", Element::C, 0.77, 1.9, NONE),
    info("Nitrogen", "N", Element::N, 0.75, 1.8, HETERO),
    info("NitrogenXSDonor", "N", Element::N, 0.75, 1.8, [false, true, false, true]),
    info("NitrogenXSDonorAcceptor", "NA", Element::N, 0.75, 1.8, [false, true, true, true]),
    info("NitrogenXSAcceptor", "NA", Element::N, 0.75, 1.8, [false, false, true, true]),
    info("Oxygen", "O", Element::O, 0.73, 1.7, HETERO),
    info("OxygenXSDonor", "O", Element::O, 0.73, 1.7, [false, true, false, true]),
    info("OxygenXSDonorAcceptor", "OA", Element::O, 0.73, 1.7, [false, true, true, true]),
    info("OxygenXSAcceptor", "OA", Element::O, 0.73, 1.7, [false, false, true, true]),
    info("Sulfur", "S", Element::S, 1.02, 2.0, HETERO),
    info("SulfurAcceptor", "SA", Element::S, 1.02, 2.0, HETERO),
    info("Phosphorus", "P", Element::P, 1.06, 2.1, HETERO),
    info("Fluorine", "F", Element::F, 0.71, 1.5, [true, false, false, true]),
    info("Chlorine", "Cl", Element::CL, 0.99, 1.8, [true, false, false, true]),
    info("Bromine", "Br", Element::BR, 1.14, 2.0, [true, false, false, true]),
    info("Iodine", "I", Element::I, 1.33, 2.2, [true, false, false, true]),
    info("Magnesium", "Mg", Element::MG, 1.30, 1.2, METAL),
    info("Manganese", "Mn", Element::MN, 1.39, 1.2, METAL),
    info("Zinc", "Zn", Element::ZN, 1.31, 1.2, METAL),
    info("Calcium", "Ca", Element::CA, 1.74, 1.2, METAL),
    info("Iron", "Fe", Element::FE, 1.25, 1.2, METAL),
    info("GenericMetal", "M", Element::DUMMY, 1.75, 1.2, METAL),
    info("Boron", "B", Element::B, 0.90, 1.92, [true, false, false, false]),
];

static GNINA_TYPE_INDEX: Map<&'static str, i32> = phf_map! {
    "Hydrogen" => 0,
    "PolarHydrogen" => 1,
    "AliphaticCarbonXSHydrophobe" => 2,
    "AliphaticCarbonXSNonHydrophobe" => 3,
    "AromaticCarbonXSHydrophobe" => 4,
    "AromaticCarbonXSNonHydrophobe" => 5,
    "Nitrogen" => 6,
    "NitrogenXSDonor" => 7,
    "NitrogenXSDonorAcceptor" => 8,
    "NitrogenXSAcceptor" => 9,
    "Oxygen" => 10,
    "OxygenXSDonor" => 11,
    "OxygenXSDonorAcceptor" => 12,
    "OxygenXSAcceptor" => 13,
    "Sulfur" => 14,
    "SulfurAcceptor" => 15,
    "Phosphorus" => 16,
    "Fluorine" => 17,
    "Chlorine" => 18,
    "Bromine" => 19,
    "Iodine" => 20,
    "Magnesium" => 21,
    "Manganese" => 22,
    "Zinc" => 23,
    "Calcium" => 24,
    "Iron" => 25,
    "GenericMetal" => 26,
    "Boron" => 27,
};

impl GninaType {
    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn info(self) -> &'static GninaTypeInfo {
        &GNINA_TYPES[self as usize]
    }
}

/// Looks up a gnina type index by its full name.
pub fn gnina_type_by_name(name: &str) -> Option<i32> {
    GNINA_TYPE_INDEX.get(name).copied()
}

/// Looks up the static properties of a type index, if it is valid.
pub fn gnina_type_info(index: i32) -> Option<&'static GninaTypeInfo> {
    usize::try_from(index).ok().and_then(|i| GNINA_TYPES.get(i))
}

/// Assigns the gnina type of one atom from its element, aromaticity and bonded
/// neighbors. Returns `None` for elements without a gnina type.
pub fn perceive_gnina_type(structure: &MolecularStructure, index: usize) -> Option<GninaType> {
    use GninaType::*;
    let atom = structure.atom(index)?;
    let element = atom.element;

    let t = match element {
        Element::H => {
            if structure.is_bonded_to(index, Element::N) || structure.is_bonded_to(index, Element::O) {
                PolarHydrogen
            } else {
                Hydrogen
            }
        }
        Element::C => match (atom.aromatic, structure.is_bonded_to_heteroatom(index)) {
            (false, false) => AliphaticCarbonXSHydrophobe,
            (false, true) => AliphaticCarbonXSNonHydrophobe,
            (true, false) => AromaticCarbonXSHydrophobe,
            (true, true) => AromaticCarbonXSNonHydrophobe,
        },
        Element::N => {
            let hydrogens = structure.hydrogen_count(index);
            if hydrogens > 0 {
                NitrogenXSDonor
            } else if structure.degree(index) < 3 {
                NitrogenXSAcceptor
            } else {
                Nitrogen
            }
        }
        Element::O => {
            if structure.hydrogen_count(index) > 0 {
                OxygenXSDonorAcceptor
            } else {
                OxygenXSAcceptor
            }
        }
        Element::S => Sulfur,
        Element::P => Phosphorus,
        Element::F => Fluorine,
        Element::CL => Chlorine,
        Element::BR => Bromine,
        Element::I => Iodine,
        Element::MG => Magnesium,
        Element::MN => Manganese,
        Element::ZN => Zinc,
        Element::CA => Calcium,
        Element::FE => Iron,
        Element::B => Boron,
        e if e.is_metal() => GenericMetal,
        _ => return None,
    };
    Some(t)
}

/// Types atoms with the 28 gnina types.
///
/// Radii are the XS radii of the types unless `use_covalent_radius` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct GninaIndexTyper {
    use_covalent_radius: bool,
}

impl GninaIndexTyper {
    pub fn new(use_covalent_radius: bool) -> Self {
        Self {
            use_covalent_radius,
        }
    }

    fn radius(&self, info: &GninaTypeInfo) -> f32 {
        if self.use_covalent_radius {
            info.covalent_radius
        } else {
            info.xs_radius
        }
    }
}

impl AtomTyper for GninaIndexTyper {
    fn num_types(&self) -> usize {
        NUM_GNINA_TYPES
    }

    fn type_names(&self) -> Vec<String> {
        GNINA_TYPES.iter().map(|t| t.name.to_string()).collect()
    }

    fn type_radii(&self) -> Vec<f32> {
        GNINA_TYPES.iter().map(|t| self.radius(t)).collect()
    }
}

impl IndexTyper for GninaIndexTyper {
    fn atom_type_index(&self, structure: &MolecularStructure, atom: usize) -> (i32, f32) {
        match perceive_gnina_type(structure, atom) {
            Some(t) => (t.index(), self.radius(t.info())),
            None => (-1, 0.0),
        }
    }

    fn int_type_index(&self, t: i32) -> Option<(i32, f32)> {
        Some(match gnina_type_info(t) {
            Some(info) => (t, self.radius(info)),
            None => (-1, 0.0),
        })
    }
}

/// Element channels of [`GninaVectorTyper`], each paired with the gnina type whose
/// radius it reports.
const VECTOR_ELEMENT_CHANNELS: [(&str, GninaType); 17] = [
    ("Hydrogen", GninaType::Hydrogen),
    ("Carbon", GninaType::AliphaticCarbonXSHydrophobe),
    ("Nitrogen", GninaType::Nitrogen),
    ("Oxygen", GninaType::Oxygen),
    ("Sulfur", GninaType::Sulfur),
    ("Phosphorus", GninaType::Phosphorus),
    ("Fluorine", GninaType::Fluorine),
    ("Chlorine", GninaType::Chlorine),
    ("Bromine", GninaType::Bromine),
    ("Iodine", GninaType::Iodine),
    ("Boron", GninaType::Boron),
    ("Magnesium", GninaType::Magnesium),
    ("Manganese", GninaType::Manganese),
    ("Zinc", GninaType::Zinc),
    ("Calcium", GninaType::Calcium),
    ("Iron", GninaType::Iron),
    ("GenericMetal", GninaType::GenericMetal),
];

const VECTOR_PROPERTY_CHANNELS: [&str; 5] =
    ["Aromatic", "XSHydrophobe", "XSDonor", "XSAcceptor", "ADHeteroatom"];

/// Types atoms with a multi-hot vector: a one-hot element block followed by flags for
/// aromaticity and the XS/AutoDock chemical properties of the atom's gnina type.
#[derive(Debug, Clone, Copy, Default)]
pub struct GninaVectorTyper {
    index_typer: GninaIndexTyper,
}

impl GninaVectorTyper {
    pub fn new(index_typer: GninaIndexTyper) -> Self {
        Self { index_typer }
    }

    fn element_channel(t: GninaType) -> usize {
        use GninaType::*;
        match t {
            Hydrogen | PolarHydrogen => 0,
            AliphaticCarbonXSHydrophobe
            | AliphaticCarbonXSNonHydrophobe
            | AromaticCarbonXSHydrophobe
            | AromaticCarbonXSNonHydrophobe => 1,
            Nitrogen | NitrogenXSDonor | NitrogenXSDonorAcceptor | NitrogenXSAcceptor => 2,
            Oxygen | OxygenXSDonor | OxygenXSDonorAcceptor | OxygenXSAcceptor => 3,
            Sulfur | SulfurAcceptor => 4,
            Phosphorus => 5,
            Fluorine => 6,
            Chlorine => 7,
            Bromine => 8,
            Iodine => 9,
            Boron => 10,
            Magnesium => 11,
            Manganese => 12,
            Zinc => 13,
            Calcium => 14,
            Iron => 15,
            GenericMetal => 16,
        }
    }

    fn fill(&self, t: GninaType, out: &mut [f32]) -> f32 {
        out.iter_mut().for_each(|v| *v = 0.0);
        let info = t.info();
        let n = VECTOR_ELEMENT_CHANNELS.len();
        out[Self::element_channel(t)] = 1.0;
        let aromatic = matches!(
            t,
            GninaType::AromaticCarbonXSHydrophobe | GninaType::AromaticCarbonXSNonHydrophobe
        );
        let flags = [
            aromatic,
            info.xs_hydrophobe,
            info.xs_donor,
            info.xs_acceptor,
            info.ad_heteroatom,
        ];
        for (slot, flag) in out[n..].iter_mut().zip(flags) {
            *slot = if flag { 1.0 } else { 0.0 };
        }
        self.index_typer.radius(info)
    }
}

impl AtomTyper for GninaVectorTyper {
    fn num_types(&self) -> usize {
        VECTOR_ELEMENT_CHANNELS.len() + VECTOR_PROPERTY_CHANNELS.len()
    }

    fn type_names(&self) -> Vec<String> {
        VECTOR_ELEMENT_CHANNELS
            .iter()
            .map(|(name, _)| *name)
            .chain(VECTOR_PROPERTY_CHANNELS)
            .map(str::to_string)
            .collect()
    }

    /// Element channels report the radius of their representative type; property
    /// channels have no radius of their own.
    fn type_radii(&self) -> Vec<f32> {
        VECTOR_ELEMENT_CHANNELS
            .iter()
            .map(|(_, t)| self.index_typer.radius(t.info()))
            .chain(std::iter::repeat_n(0.0, VECTOR_PROPERTY_CHANNELS.len()))
            .collect()
    }
}

impl VectorTyper for GninaVectorTyper {
    fn atom_type_vector(&self, structure: &MolecularStructure, atom: usize, out: &mut [f32]) -> f32 {
        match perceive_gnina_type(structure, atom) {
            Some(t) => self.fill(t, out),
            None => {
                out.iter_mut().for_each(|v| *v = 0.0);
                0.0
            }
        }
    }

    fn int_type_vector(&self, t: i32, out: &mut [f32]) -> Option<f32> {
        let gnina = GninaType::from_index(t);
        Some(match gnina {
            Some(g) => self.fill(g, out),
            None => {
                out.iter_mut().for_each(|v| *v = 0.0);
                0.0
            }
        })
    }
}

impl GninaType {
    pub fn from_index(index: i32) -> Option<Self> {
        use GninaType::*;
        const ALL: [GninaType; NUM_GNINA_TYPES] = [
            Hydrogen,
            PolarHydrogen,
            AliphaticCarbonXSHydrophobe,
            AliphaticCarbonXSNonHydrophobe,
            AromaticCarbonXSHydrophobe,
            AromaticCarbonXSNonHydrophobe,
            Nitrogen,
            NitrogenXSDonor,
            NitrogenXSDonorAcceptor,
            NitrogenXSAcceptor,
            Oxygen,
            OxygenXSDonor,
            OxygenXSDonorAcceptor,
            OxygenXSAcceptor,
            Sulfur,
            SulfurAcceptor,
            Phosphorus,
            Fluorine,
            Chlorine,
            Bromine,
            Iodine,
            Magnesium,
            Manganese,
            Zinc,
            Calcium,
            Iron,
            GenericMetal,
            Boron,
        ];
        usize::try_from(index).ok().and_then(|i| ALL.get(i)).copied()
    }
}
