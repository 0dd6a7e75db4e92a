//! Candidate parameters extracted from a drawing and the merged result set.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Value carried by an extracted parameter.
///
/// Numeric parsing is attempted first; values that are not plain numbers
/// (steel grade codes like `Fe415`, concrete grades like `M25`) keep the
/// raw matched string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// A parsed decimal measurement.
    Number(f64),
    /// The raw matched string when numeric parsing fails.
    Text(String),
}

impl ParameterValue {
    /// Parse a raw matched string, falling back to text.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(n) => Self::Number(n),
            Err(_) => Self::Text(raw.trim().to_string()),
        }
    }

    /// The numeric value, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Number(_))
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Axis-aligned bounding box in page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// One candidate fact pulled from one page by one channel.
///
/// Instances are immutable once constructed: the channels finish building
/// a parameter with the `with_*` methods before handing it off, and the
/// merger only selects or discards, never edits. `unit` and `coordinates`
/// serialize as explicit `null` when absent so export consumers can
/// distinguish "not extracted" from an omitted key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedParameter {
    /// Parameter kind identifier (e.g. `length`, `rebar_diameter`).
    pub name: String,

    /// Parsed numeric value, or the raw matched string.
    pub value: ParameterValue,

    /// Normalized lower-case unit token, if the pattern carries one.
    pub unit: Option<String>,

    /// Surrounding text window, kept for provenance.
    pub context: String,

    /// Heuristic certainty in `[0, 1]`.
    pub confidence: f32,

    /// 1-based source page index.
    pub page_number: u32,

    /// On-page bounding box, when coordinate recovery succeeded.
    pub coordinates: Option<BoundingBox>,
}

impl ExtractedParameter {
    /// Create a parameter. Confidence is clamped into `[0, 1]`.
    pub fn new(
        name: impl Into<String>,
        value: ParameterValue,
        confidence: f32,
        page_number: u32,
    ) -> Self {
        debug_assert!(page_number >= 1, "page numbers are 1-based");
        Self {
            name: name.into(),
            value,
            unit: None,
            context: String::new(),
            confidence: confidence.clamp(0.0, 1.0),
            page_number,
            coordinates: None,
        }
    }

    /// Attach a normalized (lower-cased) unit token.
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_lowercase());
        self
    }

    /// Attach the surrounding context window.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Attach recovered page coordinates.
    pub fn with_coordinates(mut self, bbox: BoundingBox) -> Self {
        self.coordinates = Some(bbox);
        self
    }

    /// Scale confidence by a channel discount factor, clamped to `[0, 1]`.
    pub fn discounted(mut self, factor: f32) -> Self {
        self.confidence = (self.confidence * factor).clamp(0.0, 1.0);
        self
    }

    /// The deduplication key of this parameter.
    pub fn key(&self) -> ParamKey {
        ParamKey::new(&self.name, self.page_number)
    }
}

/// Deduplication key: one "fact slot" per parameter name and page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamKey {
    pub name: String,
    pub page: u32,
}

impl ParamKey {
    pub fn new(name: impl Into<String>, page: u32) -> Self {
        Self {
            name: name.into(),
            page,
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_p{}", self.name, self.page)
    }
}

/// The reconciled parameter set: one winning parameter per key.
///
/// Built once per run by the merger and read-only afterward. Backed by an
/// ordered map so iteration and serialization are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedSet {
    entries: BTreeMap<ParamKey, ExtractedParameter>,
}

impl MergedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_key(&self, key: &ParamKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &ParamKey) -> Option<&ExtractedParameter> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &ExtractedParameter)> {
        self.entries.iter()
    }

    /// Iterate winning parameters in key order.
    pub fn parameters(&self) -> impl Iterator<Item = &ExtractedParameter> {
        self.entries.values()
    }

    pub(crate) fn insert(&mut self, key: ParamKey, parameter: ExtractedParameter) {
        self.entries.insert(key, parameter);
    }
}

impl Serialize for MergedSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, parameter) in &self.entries {
            map.serialize_entry(&key.to_string(), parameter)?;
        }
        map.end()
    }
}
