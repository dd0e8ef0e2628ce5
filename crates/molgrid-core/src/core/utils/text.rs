use crate::core::models::element::Element;

/// Returns the trimmed column range `start..end` of a fixed-width record, or `""` when
/// the line is too short.
pub fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    line.get(start..end).unwrap_or("").trim()
}

/// Derives an element from a force field or atom type label such as `C_R`, `N.ar`,
/// `Cl`, `H___A` or `Fe3+2`.
///
/// The leading alphabetic run is tried first as a two-letter symbol, then as its first
/// letter alone. Labels that match neither yield the dummy element.
pub fn element_from_type_label(label: &str) -> Element {
    let letters: String = label
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .take(2)
        .collect();
    if letters.len() == 2 {
        if let Ok(element) = letters.parse::<Element>() {
            let second_is_lower = letters.chars().nth(1).is_some_and(|c| c.is_ascii_lowercase());
            if second_is_lower || !label.contains(['_', '.']) {
                return element;
            }
        }
    }
    letters
        .get(..1)
        .map_or(Element::DUMMY, Element::from_symbol_lossy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_and_trim_handles_short_lines() {
        assert_eq!(slice_and_trim("ATOM      1", 0, 6), "ATOM");
        assert_eq!(slice_and_trim("ATOM", 6, 11), "");
        assert_eq!(slice_and_trim("ATOM   12", 6, 11), "12");
    }

    #[test]
    fn element_from_type_label_understands_common_schemes() {
        assert_eq!(element_from_type_label("C_R"), Element::C);
        assert_eq!(element_from_type_label("N.ar"), Element::N);
        assert_eq!(element_from_type_label("Cl"), Element::CL);
        assert_eq!(element_from_type_label("Br"), Element::BR);
        assert_eq!(element_from_type_label("H___A"), Element::H);
        assert_eq!(element_from_type_label("Fe3+2"), Element::FE);
        assert_eq!(element_from_type_label("Zn"), Element::ZN);
        assert_eq!(element_from_type_label("CA"), Element::CA);
        assert_eq!(element_from_type_label("OW"), Element::O);
        assert_eq!(element_from_type_label(""), Element::DUMMY);
    }
}
