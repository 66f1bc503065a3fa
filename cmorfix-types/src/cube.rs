use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A named coordinate with optional cell bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub name: String,

    #[serde(default)]
    pub units: String,

    pub points: Vec<f64>,

    /// One `[lower, upper]` pair per point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Vec<[f64; 2]>>,
}

impl Coord {
    pub fn new(name: impl Into<String>, units: impl Into<String>, points: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            points,
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Vec<[f64; 2]>) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CubeError {
    ShapeMismatch { expected: usize, actual: usize },
    BoundsMismatch { coord: String, points: usize, bounds: usize },
}

impl std::fmt::Display for CubeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CubeError::ShapeMismatch { expected, actual } => write!(
                f,
                "data has {} values but coordinates describe {}",
                actual, expected
            ),
            CubeError::BoundsMismatch {
                coord,
                points,
                bounds,
            } => write!(
                f,
                "coordinate '{}' has {} points but {} bounds pairs",
                coord, points, bounds
            ),
        }
    }
}

impl std::error::Error for CubeError {}

/// One geophysical variable on a grid: labeled data plus coordinate metadata.
///
/// `data` is flat and row-major over `dim_coords`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cube {
    #[serde(default = "default_schema")]
    pub schema: String,

    pub var_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,

    #[serde(default)]
    pub units: String,

    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    #[serde(default)]
    pub dim_coords: Vec<Coord>,

    #[serde(default)]
    pub scalar_coords: Vec<Coord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_value: Option<f64>,

    #[serde(default)]
    pub data: Vec<f64>,
}

fn default_schema() -> String {
    crate::schema::CMORFIX_CUBE_V1.to_string()
}

impl Cube {
    pub fn new(var_name: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            schema: default_schema(),
            var_name: var_name.into(),
            standard_name: None,
            long_name: None,
            units: units.into(),
            attributes: BTreeMap::new(),
            dim_coords: Vec::new(),
            scalar_coords: Vec::new(),
            fill_value: None,
            data: Vec::new(),
        }
    }

    pub fn with_dim(mut self, coord: Coord) -> Self {
        self.dim_coords.push(coord);
        self
    }

    pub fn with_data(mut self, data: Vec<f64>) -> Self {
        self.data = data;
        self
    }

    pub fn shape(&self) -> Vec<usize> {
        self.dim_coords.iter().map(Coord::len).collect()
    }

    pub fn ndim(&self) -> usize {
        self.dim_coords.len()
    }

    /// Look up a dimension or scalar coordinate by name.
    pub fn coord(&self, name: &str) -> Option<&Coord> {
        self.dim_coords
            .iter()
            .chain(self.scalar_coords.iter())
            .find(|c| c.name == name)
    }

    pub fn coord_mut(&mut self, name: &str) -> Option<&mut Coord> {
        self.dim_coords
            .iter_mut()
            .chain(self.scalar_coords.iter_mut())
            .find(|c| c.name == name)
    }

    pub fn has_dim(&self, name: &str) -> bool {
        self.dim_coords.iter().any(|c| c.name == name)
    }

    /// True when `value` is this cube's fill value.
    pub fn is_masked(&self, value: f64) -> bool {
        self.fill_value == Some(value)
    }

    /// Apply `f` to every unmasked value.
    pub fn map_data(mut self, f: impl Fn(f64) -> f64) -> Self {
        let fill = self.fill_value;
        for v in self.data.iter_mut() {
            if fill != Some(*v) {
                *v = f(*v);
            }
        }
        self
    }

    /// Check that data and bounds agree with the coordinates.
    pub fn validate(&self) -> Result<(), CubeError> {
        let expected: usize = self.shape().iter().product();
        if expected != self.data.len() {
            return Err(CubeError::ShapeMismatch {
                expected,
                actual: self.data.len(),
            });
        }
        for coord in self.dim_coords.iter().chain(self.scalar_coords.iter()) {
            if let Some(bounds) = &coord.bounds
                && bounds.len() != coord.points.len()
            {
                return Err(CubeError::BoundsMismatch {
                    coord: coord.name.clone(),
                    points: coord.points.len(),
                    bounds: bounds.len(),
                });
            }
        }
        Ok(())
    }

    /// Hex sha256 over everything except `data`.
    pub fn metadata_digest(&self) -> String {
        let mut h = Sha256::new();
        field(&mut h, "var_name", self.var_name.as_bytes());
        field(
            &mut h,
            "standard_name",
            self.standard_name.as_deref().unwrap_or("").as_bytes(),
        );
        field(
            &mut h,
            "long_name",
            self.long_name.as_deref().unwrap_or("").as_bytes(),
        );
        field(&mut h, "units", self.units.as_bytes());
        for (k, v) in &self.attributes {
            field(&mut h, "attr.key", k.as_bytes());
            field(&mut h, "attr.value", v.as_bytes());
        }
        for (kind, coords) in [("dim", &self.dim_coords), ("scalar", &self.scalar_coords)] {
            for c in coords {
                field(&mut h, kind, c.name.as_bytes());
                field(&mut h, "units", c.units.as_bytes());
                for p in &c.points {
                    h.update(p.to_le_bytes());
                }
                if let Some(bounds) = &c.bounds {
                    field(&mut h, "bounds", &[]);
                    for [lo, hi] in bounds {
                        h.update(lo.to_le_bytes());
                        h.update(hi.to_le_bytes());
                    }
                }
            }
        }
        if let Some(fill) = self.fill_value {
            field(&mut h, "fill_value", &fill.to_le_bytes());
        }
        hex::encode(h.finalize())
    }
}

fn field(h: &mut Sha256, tag: &str, bytes: &[u8]) {
    h.update(tag.as_bytes());
    h.update((bytes.len() as u64).to_le_bytes());
    h.update(bytes);
}
