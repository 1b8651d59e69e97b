#![allow(dead_code)]

use std::path::Path;

use ocr_table_grid::{BoundingBox, Fragment};
use serde_json::{Value, json};

/// Half-width and half-height of every fixture cell.
const HALF_WIDTH: f64 = 0.03;
const HALF_HEIGHT: f64 = 0.005;

/// One OCR block centered at `(x, y)` in normalized coordinates.
pub fn block(text: &str, x: f64, y: f64) -> Value {
    json!({
        "text": text,
        "confidence": 0.95,
        "boundingPoly": {
            "normalizedVertices": [
                {"x": x - HALF_WIDTH, "y": y - HALF_HEIGHT},
                {"x": x + HALF_WIDTH, "y": y - HALF_HEIGHT},
                {"x": x + HALF_WIDTH, "y": y + HALF_HEIGHT},
                {"x": x - HALF_WIDTH, "y": y + HALF_HEIGHT},
            ]
        }
    })
}

/// Blocks for a table whose rows sit at `ys` and columns at `xs`.
pub fn table_blocks<'a, R: AsRef<[&'a str]>>(rows: &[R], xs: &[f64], ys: &[f64]) -> Vec<Value> {
    rows.iter()
        .zip(ys)
        .flat_map(|(cells, &y)| {
            cells
                .as_ref()
                .iter()
                .zip(xs)
                .map(move |(text, &x)| block(text, x, y))
        })
        .collect()
}

pub fn page(blocks: Vec<Value>) -> Value {
    json!({ "width": 1654, "height": 2339, "blocks": blocks })
}

pub fn write_ocr_json(path: &Path, pages: Vec<Value>) -> Result<(), Box<dyn std::error::Error>> {
    let document = json!({ "pages": pages });
    std::fs::write(path, serde_json::to_string_pretty(&document)?)?;
    Ok(())
}

pub fn fragment(text: &str, x: f64, y: f64) -> Fragment {
    let extent = BoundingBox::from_corners(
        x - HALF_WIDTH,
        y - HALF_HEIGHT,
        x + HALF_WIDTH,
        y + HALF_HEIGHT,
    )
    .expect("fixture extent should be valid");
    Fragment::from_extent(text, text, 0.95, extent).expect("fixture fragment should be valid")
}

/// The equipment table used across tests: three rows, three columns.
pub const EQUIPMENT: [[&str; 3]; 3] = [
    ["Tag", "Service", "Temp"],
    ["P-101", "Crude", "40"],
    ["P-102", "Water", "25"],
];

pub const EQUIPMENT_XS: [f64; 3] = [0.15, 0.40, 0.65];
pub const EQUIPMENT_YS: [f64; 3] = [0.10, 0.15, 0.20];
