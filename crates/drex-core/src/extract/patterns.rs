//! Pattern catalog for structural drawing parameters.
//!
//! Each parameter kind maps to an ordered list of synonym patterns (label
//! form, symbol form, trailing-unit form). The ordering is not a priority
//! ladder of correctness: every pattern for a kind recognizes the same
//! fact, and order only decides which match's context survives key-level
//! deduplication downstream (first match wins by catalog order). Capture
//! group 1 is the value; group 2, when present, the unit. Grade kinds
//! carry no unit group.

use lazy_static::lazy_static;
use regex::Regex;

/// A parameter kind with its ordered synonym patterns.
pub struct ParameterKind {
    pub name: &'static str,
    pub patterns: Vec<Regex>,
}

macro_rules! kind {
    ($name:literal, $($pattern:literal),+ $(,)?) => {
        ParameterKind {
            name: $name,
            patterns: vec![$(Regex::new($pattern).unwrap()),+],
        }
    };
}

lazy_static! {
    static ref CATALOG: Vec<ParameterKind> = vec![
        kind!(
            "length",
            r"(?i)length\s*[:=]?\s*(\d+(?:\.\d+)?)\s*(mm|cm|m)\b",
            r"(?i)\bL\s*=\s*(\d+(?:\.\d+)?)\s*(mm|cm|m)\b",
            r"(?i)(\d+(?:\.\d+)?)\s*(mm|cm|m)\s+long\b",
        ),
        kind!(
            "width",
            r"(?i)width\s*[:=]?\s*(\d+(?:\.\d+)?)\s*(mm|cm|m)\b",
            r"(?i)\bB\s*=\s*(\d+(?:\.\d+)?)\s*(mm|cm|m)\b",
            r"(?i)(\d+(?:\.\d+)?)\s*(mm|cm|m)\s+wide\b",
        ),
        kind!(
            "thickness",
            r"(?i)(?:thickness|thk\.?)\s*[:=]?\s*(\d+(?:\.\d+)?)\s*(mm|cm)\b",
            r"(?i)\bt\s*=\s*(\d+(?:\.\d+)?)\s*(mm|cm)\b",
            r"(?i)(\d+(?:\.\d+)?)\s*(mm|cm)\s+thick\b",
        ),
        kind!(
            "depth",
            r"(?i)(?:overall\s+|effective\s+)?depth\s*[:=]?\s*(\d+(?:\.\d+)?)\s*(mm|cm|m)\b",
            r"(?i)\bD\s*=\s*(\d+(?:\.\d+)?)\s*(mm|cm|m)\b",
        ),
        kind!(
            "height",
            r"(?i)height\s*[:=]?\s*(\d+(?:\.\d+)?)\s*(mm|cm|m)\b",
            r"(?i)\bH\s*=\s*(\d+(?:\.\d+)?)\s*(mm|cm|m)\b",
        ),
        kind!(
            "span",
            r"(?i)(?:clear\s+|effective\s+)?span\s*[:=]?\s*(\d+(?:\.\d+)?)\s*(mm|cm|m)\b",
        ),
        kind!(
            "cover",
            r"(?i)(?:clear\s+|nominal\s+)?cover\s*[:=]?\s*(\d+(?:\.\d+)?)\s*(mm)\b",
        ),
        kind!(
            "rebar_diameter",
            r"(?i)(?:dia(?:meter)?|ø)\s*[.:=]?\s*(\d+(?:\.\d+)?)\s*(mm)\b",
            r"(?i)\b(\d+(?:\.\d+)?)\s*(mm)\s*(?:dia(?:meter)?|ø|bars?)\b",
            r"(?i)\b[TY](\d{1,2})\b",
        ),
        kind!(
            "spacing",
            r"(?i)spacing\s*[:=]?\s*(\d+(?:\.\d+)?)\s*(mm|cm)\b",
            r"(?i)(?:@|c/c)\s*(\d+(?:\.\d+)?)\s*(mm|cm)\b",
            r"(?i)\b(\d+(?:\.\d+)?)\s*(mm|cm)\s+c/c\b",
        ),
        kind!(
            "concrete_grade",
            r"(?i)\b(M\s?(?:10|15|20|25|30|35|40|45|50|55|60))\b",
            r"(?i)(?:concrete\s+grade|grade\s+of\s+concrete)\s*[:=]?\s*(M?\s?\d{2})",
        ),
        kind!(
            "steel_grade",
            r"(?i)\b(Fe\s?(?:250|415|500|550|600))\b",
            r"(?i)(?:steel\s+grade|grade\s+of\s+steel)\s*[:=]?\s*([A-Za-z]*\s?\d{3})",
        ),
        kind!(
            "live_load",
            r"(?i)(?:live|imposed)\s+load\s*[:=]?\s*(\d+(?:\.\d+)?)\s*(kn/m²|kn/m2|kn/m|kpa)",
        ),
        kind!(
            "dead_load",
            r"(?i)dead\s+load\s*[:=]?\s*(\d+(?:\.\d+)?)\s*(kn/m²|kn/m2|kn/m|kpa)",
        ),
    ];

    /// Compound `A x B <unit>` form, decomposed by the matcher into
    /// `dimensions_length` and `dimensions_width`.
    static ref DIMENSIONS: Regex =
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*[x×]\s*(\d+(?:\.\d+)?)\s*(mm|cm|m)\b").unwrap();
}

/// Static table of extraction patterns.
pub struct PatternCatalog;

impl PatternCatalog {
    /// Name of the compound kind handled specially by the matcher.
    pub const DIMENSIONS_KIND: &'static str = "dimensions";

    /// All scalar parameter kinds, in catalog order.
    pub fn kinds() -> impl Iterator<Item = &'static ParameterKind> {
        CATALOG.iter()
    }

    /// The ordered pattern list for one scalar kind.
    pub fn patterns_for(kind: &str) -> Option<&'static [Regex]> {
        CATALOG
            .iter()
            .find(|k| k.name == kind)
            .map(|k| k.patterns.as_slice())
    }

    /// The compound dimensions pattern.
    pub fn dimensions() -> &'static Regex {
        &DIMENSIONS
    }

    /// Names of every supported kind, compound form included.
    pub fn kind_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = CATALOG.iter().map(|k| k.name).collect();
        names.push(Self::DIMENSIONS_KIND);
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_patterns() {
        for kind in PatternCatalog::kinds() {
            assert!(
                !kind.patterns.is_empty(),
                "kind `{}` has no patterns",
                kind.name
            );
        }
    }

    #[test]
    fn lookup_is_case_insensitive_on_input() {
        let patterns = PatternCatalog::patterns_for("thickness").unwrap();
        assert!(patterns[0].is_match("THICKNESS: 150 MM"));
        assert!(patterns[0].is_match("thickness = 150 mm"));
    }

    #[test]
    fn symbol_and_label_forms_are_synonyms() {
        let patterns = PatternCatalog::patterns_for("length").unwrap();
        assert!(patterns.iter().any(|p| p.is_match("length: 450 mm")));
        assert!(patterns.iter().any(|p| p.is_match("L = 450 mm")));
        assert!(patterns.iter().any(|p| p.is_match("450 mm long")));
    }

    #[test]
    fn dimensions_matches_compound_form() {
        let caps = PatternCatalog::dimensions().captures("300 x 500 mm").unwrap();
        assert_eq!(&caps[1], "300");
        assert_eq!(&caps[2], "500");
        assert_eq!(&caps[3], "mm");
    }

    #[test]
    fn grade_patterns_have_no_unit_group() {
        let patterns = PatternCatalog::patterns_for("steel_grade").unwrap();
        let caps = patterns[0].captures("Fe415 bars").unwrap();
        assert_eq!(&caps[1], "Fe415");
        assert!(caps.get(2).is_none());
    }

    #[test]
    fn kind_names_include_compound() {
        let names = PatternCatalog::kind_names();
        assert!(names.contains(&"dimensions"));
        assert!(names.contains(&"rebar_diameter"));
    }
}
