//! Serde schema of the OCR result document consumed and annotated by this crate.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ExtractError;
use crate::model::{Point, TableRegion};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrDocument {
    pub pages: Vec<OcrPage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default)]
    pub blocks: Vec<OcrBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<TableRegionRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OcrPage {
    /// Explicit page number, or the 1-based position in the document.
    #[must_use]
    pub fn page_number(&self, index: usize) -> u32 {
        self.page
            .unwrap_or_else(|| u32::try_from(index + 1).unwrap_or(u32::MAX))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    #[serde(default = "default_confidence", alias = "score")]
    pub confidence: f64,
    #[serde(rename = "boundingPoly")]
    pub bounding_poly: BoundingPoly,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_confidence() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingPoly {
    #[serde(rename = "normalizedVertices", default)]
    pub normalized_vertices: Vec<Point>,
    /// Pixel-space vertices, used only when `normalizedVertices` is absent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vertices: Vec<Point>,
}

/// Table region in the output schema shared with layout detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRegionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub confidence: f64,
    pub rows: usize,
    #[serde(rename = "boundingPoly")]
    pub bounding_poly: BoundingPoly,
}

impl From<&TableRegion> for TableRegionRecord {
    fn from(region: &TableRegion) -> Self {
        Self {
            id: region.id.clone(),
            kind: "table".to_string(),
            confidence: region.confidence,
            rows: region.row_count,
            bounding_poly: BoundingPoly {
                normalized_vertices: region.bounding_box.vertices().to_vec(),
                vertices: Vec::new(),
            },
        }
    }
}

pub fn read_document(path: &Path) -> Result<OcrDocument, ExtractError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn write_document(path: &Path, document: &OcrDocument) -> Result<(), ExtractError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, document)?;
    Ok(())
}
