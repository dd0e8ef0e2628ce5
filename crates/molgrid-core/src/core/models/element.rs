use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of elements with tabulated data, including the dummy element at index 0.
pub const NUM_ELEMENTS: usize = 87;

static SYMBOLS: [&str; NUM_ELEMENTS] = [
    "Xx", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na",
    "Mg", "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V",
    "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se", "Br",
    "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag",
    "Cd", "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr",
    "Nd", "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu",
    "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi",
    "Po", "At", "Rn",
];

/// Covalent radii in Angstroms (Cordero et al., 2008). The dummy element has zero radius.
static COVALENT_RADII: [f32; NUM_ELEMENTS] = [
    0.00, 0.31, 0.28, 1.28, 0.96, 0.84, 0.76, 0.71, 0.66, 0.57,
    0.58, 1.66, 1.41, 1.21, 1.11, 1.07, 1.05, 1.02, 1.06, 2.03,
    1.76, 1.70, 1.60, 1.53, 1.39, 1.39, 1.32, 1.26, 1.24, 1.32,
    1.22, 1.22, 1.20, 1.19, 1.20, 1.20, 1.16, 2.20, 1.95, 1.90,
    1.75, 1.64, 1.54, 1.47, 1.46, 1.42, 1.39, 1.45, 1.44, 1.42,
    1.39, 1.39, 1.38, 1.39, 1.40, 2.44, 2.15, 2.07, 2.04, 2.03,
    2.01, 1.99, 1.98, 1.98, 1.96, 1.94, 1.92, 1.92, 1.89, 1.90,
    1.87, 1.87, 1.75, 1.70, 1.62, 1.51, 1.44, 1.41, 1.36, 1.36,
    1.32, 1.45, 1.46, 1.48, 1.40, 1.50, 1.50,
];

/// A chemical element identified by its atomic number.
///
/// Atomic number 0 is reserved for the dummy element (`Xx`), used for atoms whose
/// element could not be determined. Only elements up to radon are tabulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Element(u8);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown element symbol: '{0}'")]
pub struct ParseElementError(pub String);

impl Element {
    pub const DUMMY: Element = Element(0);
    pub const H: Element = Element(1);
    pub const B: Element = Element(5);
    pub const C: Element = Element(6);
    pub const N: Element = Element(7);
    pub const O: Element = Element(8);
    pub const F: Element = Element(9);
    pub const NA: Element = Element(11);
    pub const MG: Element = Element(12);
    pub const P: Element = Element(15);
    pub const S: Element = Element(16);
    pub const CL: Element = Element(17);
    pub const K: Element = Element(19);
    pub const CA: Element = Element(20);
    pub const MN: Element = Element(25);
    pub const FE: Element = Element(26);
    pub const ZN: Element = Element(30);
    pub const BR: Element = Element(35);
    pub const I: Element = Element(53);

    /// Creates an element from its atomic number, if it is tabulated.
    pub fn from_atomic_number(number: u8) -> Option<Self> {
        ((number as usize) < NUM_ELEMENTS).then_some(Element(number))
    }

    /// Parses a symbol, falling back to the dummy element for anything unknown.
    pub fn from_symbol_lossy(symbol: &str) -> Self {
        symbol.parse().unwrap_or(Element::DUMMY)
    }

    pub fn atomic_number(self) -> u8 {
        self.0
    }

    pub fn symbol(self) -> &'static str {
        SYMBOLS[self.0 as usize]
    }

    pub fn covalent_radius(self) -> f32 {
        COVALENT_RADII[self.0 as usize]
    }

    pub fn is_dummy(self) -> bool {
        self.0 == 0
    }

    pub fn is_hydrogen(self) -> bool {
        self == Element::H
    }

    /// Any real element other than carbon and hydrogen.
    pub fn is_heteroatom(self) -> bool {
        !matches!(self.0, 0 | 1 | 6)
    }

    pub fn is_metal(self) -> bool {
        !self.is_dummy() && !NON_METALS.contains(&self.0)
    }
}

/// H, He, B, C, N, O, F, Ne, Si, P, S, Cl, Ar, As, Se, Br, Kr, Te, I, Xe, At, Rn
const NON_METALS: [u8; 22] = [
    1, 2, 5, 6, 7, 8, 9, 10, 14, 15, 16, 17, 18, 33, 34, 35, 36, 52, 53, 54, 85, 86,
];

impl FromStr for Element {
    type Err = ParseElementError;

    /// Parses an element symbol case-insensitively (`"CL"`, `"cl"` and `"Cl"` all
    /// yield chlorine).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        SYMBOLS
            .iter()
            .skip(1)
            .position(|sym| sym.eq_ignore_ascii_case(trimmed))
            .map(|idx| Element(idx as u8 + 1))
            .ok_or_else(|| ParseElementError(trimmed.to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_parse_case_insensitively() {
        assert_eq!("Cl".parse::<Element>(), Ok(Element::CL));
        assert_eq!("CL".parse::<Element>(), Ok(Element::CL));
        assert_eq!("fe".parse::<Element>(), Ok(Element::FE));
        assert_eq!(" C ".parse::<Element>(), Ok(Element::C));
    }

    #[test]
    fn unknown_symbols_are_rejected_or_become_dummy() {
        assert!("Qq".parse::<Element>().is_err());
        assert!("Xx".parse::<Element>().is_err());
        assert_eq!(Element::from_symbol_lossy("Qq"), Element::DUMMY);
    }

    #[test]
    fn tables_are_indexed_by_atomic_number() {
        assert_eq!(Element::I.symbol(), "I");
        assert_eq!(Element::FE.symbol(), "Fe");
        assert_eq!(Element::from_atomic_number(86).unwrap().symbol(), "Rn");
        assert!(Element::from_atomic_number(87).is_none());
        assert!((Element::C.covalent_radius() - 0.76).abs() < 1e-6);
        assert_eq!(Element::DUMMY.covalent_radius(), 0.0);
    }

    #[test]
    fn classification_helpers_are_consistent() {
        assert!(Element::N.is_heteroatom());
        assert!(!Element::C.is_heteroatom());
        assert!(!Element::H.is_heteroatom());
        assert!(Element::ZN.is_metal());
        assert!(Element::NA.is_metal());
        assert!(!Element::S.is_metal());
        assert!(!Element::DUMMY.is_metal());
    }
}
