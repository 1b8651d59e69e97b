use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::fragment::Fragment;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn clamp_unit(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
        }
    }
}

/// Axis-aligned rectangle in normalized page space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl BoundingBox {
    /// Builds a rectangle from two corners, rejecting inverted or non-finite input.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self, String> {
        if ![x1, y1, x2, y2].iter().all(|value| value.is_finite()) {
            return Err("region coordinates must be finite".to_string());
        }
        if x2 <= x1 || y2 <= y1 {
            return Err("region requires x2>x1 and y2>y1".to_string());
        }

        Ok(Self {
            x_min: x1,
            x_max: x2,
            y_min: y1,
            y_max: y2,
        })
    }

    /// Smallest rectangle covering the full extents of every fragment.
    pub fn enclosing<'a, I>(fragments: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Fragment>,
    {
        fragments
            .into_iter()
            .map(Fragment::extent)
            .reduce(Self::union)
    }

    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        (self.x_min..=self.x_max).contains(&point.x) && (self.y_min..=self.y_max).contains(&point.y)
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            x_min: self.x_min.min(other.x_min),
            x_max: self.x_max.max(other.x_max),
            y_min: self.y_min.min(other.y_min),
            y_max: self.y_max.max(other.y_max),
        }
    }

    #[must_use]
    pub fn expand(self, padding: f64) -> Self {
        Self {
            x_min: self.x_min - padding,
            x_max: self.x_max + padding,
            y_min: self.y_min - padding,
            y_max: self.y_max + padding,
        }
    }

    #[must_use]
    pub fn clamp_unit(self) -> Self {
        Self {
            x_min: self.x_min.clamp(0.0, 1.0),
            x_max: self.x_max.clamp(0.0, 1.0),
            y_min: self.y_min.clamp(0.0, 1.0),
            y_max: self.y_max.clamp(0.0, 1.0),
        }
    }

    /// Corners clockwise from the top-left, the order OCR polygons use.
    #[must_use]
    pub fn vertices(&self) -> [Point; 4] {
        [
            Point::new(self.x_min, self.y_min),
            Point::new(self.x_max, self.y_min),
            Point::new(self.x_max, self.y_max),
            Point::new(self.x_min, self.y_max),
        ]
    }
}

impl FromStr for BoundingBox {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let parts = input.split(',').map(str::trim).collect::<Vec<_>>();
        if parts.len() != 4 {
            return Err(format!(
                "invalid rectangle '{input}', expected exactly 4 coordinates"
            ));
        }

        let mut coords = [0.0_f64; 4];
        for (slot, (name, raw)) in coords
            .iter_mut()
            .zip(["x1", "y1", "x2", "y2"].iter().zip(&parts))
        {
            *slot = raw
                .parse()
                .map_err(|_| format!("invalid {name} coordinate: '{raw}'"))?;
        }

        let [x1, y1, x2, y2] = coords;
        if [x1, y1, x2, y2]
            .iter()
            .any(|value| !(0.0..=1.0).contains(value))
        {
            return Err("region coordinates must be normalized to [0,1]".to_string());
        }

        Self::from_corners(x1, y1, x2, y2)
    }
}

/// Fragments sharing one vertical band, ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<'a> {
    reference_y: f64,
    fragments: Vec<&'a Fragment>,
}

impl<'a> Row<'a> {
    #[must_use]
    pub fn new(reference_y: f64, mut fragments: Vec<&'a Fragment>) -> Self {
        fragments.sort_by(|left, right| left.x_center().total_cmp(&right.x_center()));
        Self {
            reference_y,
            fragments,
        }
    }

    /// Vertical center of the fragment that seeded the row.
    #[must_use]
    pub fn reference_y(&self) -> f64 {
        self.reference_y
    }

    #[must_use]
    pub fn fragments(&self) -> &[&'a Fragment] {
        &self.fragments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRegion {
    pub id: String,
    pub bounding_box: BoundingBox,
    pub row_count: usize,
    pub confidence: f64,
}

/// Row-major text matrix; every row has the same width.
pub type Grid = Vec<Vec<String>>;

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTable {
    pub page: u32,
    pub table_id: usize,
    pub region_id: String,
    pub bounding_box: Option<BoundingBox>,
    pub grid: Grid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedOutput {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub table_count: usize,
    pub row_count: usize,
}
