//! Normalization of OCR blocks into [`Fragment`] records.

use tracing::{debug, trace};

use crate::document::{OcrBlock, OcrPage};
use crate::error::ExtractError;
use crate::model::{BoundingBox, Point};

/// A recognized text span with its quadrilateral in normalized page space.
///
/// Extents and centers are derived from the quad on demand. Coordinates are
/// finite and clamped to `[0, 1]` at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    id: String,
    text: String,
    confidence: f64,
    quad: [Point; 4],
}

impl Fragment {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        confidence: f64,
        vertices: &[Point],
    ) -> Result<Self, ExtractError> {
        let id = id.into();
        let quad: [Point; 4] = vertices.try_into().map_err(|_| {
            ExtractError::malformed(
                &id,
                format!("expected 4 vertices, found {}", vertices.len()),
            )
        })?;

        if let Some(point) = quad
            .iter()
            .find(|point| !point.x.is_finite() || !point.y.is_finite())
        {
            return Err(ExtractError::malformed(
                &id,
                format!("non-finite coordinate ({}, {})", point.x, point.y),
            ));
        }
        if !confidence.is_finite() {
            return Err(ExtractError::malformed(&id, "non-finite confidence"));
        }

        Ok(Self {
            id,
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            quad: quad.map(Point::clamp_unit),
        })
    }

    /// Axis-aligned fragment covering `[x_min, x_max] x [y_min, y_max]`.
    pub fn from_extent(
        id: impl Into<String>,
        text: impl Into<String>,
        confidence: f64,
        extent: BoundingBox,
    ) -> Result<Self, ExtractError> {
        Self::new(id, text, confidence, &extent.vertices())
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    #[must_use]
    pub fn quad(&self) -> &[Point; 4] {
        &self.quad
    }

    #[must_use]
    pub fn x_min(&self) -> f64 {
        self.quad.iter().map(|p| p.x).fold(f64::INFINITY, f64::min)
    }

    #[must_use]
    pub fn x_max(&self) -> f64 {
        self.quad.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max)
    }

    #[must_use]
    pub fn y_min(&self) -> f64 {
        self.quad.iter().map(|p| p.y).fold(f64::INFINITY, f64::min)
    }

    #[must_use]
    pub fn y_max(&self) -> f64 {
        self.quad.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max)
    }

    #[must_use]
    pub fn x_center(&self) -> f64 {
        (self.x_min() + self.x_max()) / 2.0
    }

    #[must_use]
    pub fn y_center(&self) -> f64 {
        (self.y_min() + self.y_max()) / 2.0
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x_center(), self.y_center())
    }

    #[must_use]
    pub fn extent(&self) -> BoundingBox {
        BoundingBox {
            x_min: self.x_min(),
            x_max: self.x_max(),
            y_min: self.y_min(),
            y_max: self.y_max(),
        }
    }
}

fn block_vertices(block: &OcrBlock, page: &OcrPage, id: &str) -> Result<Vec<Point>, ExtractError> {
    let poly = &block.bounding_poly;
    if !poly.normalized_vertices.is_empty() || poly.vertices.is_empty() {
        return Ok(poly.normalized_vertices.clone());
    }

    let (Some(width), Some(height)) = (page.width, page.height) else {
        return Err(ExtractError::malformed(
            id,
            "pixel vertices require page width and height",
        ));
    };
    if !(width > 0.0 && height > 0.0) {
        return Err(ExtractError::malformed(
            id,
            format!("page size {width}x{height} cannot normalize pixel vertices"),
        ));
    }

    Ok(poly
        .vertices
        .iter()
        .map(|point| Point::new(point.x / width, point.y / height))
        .collect())
}

/// Builds the fragment list for one page.
///
/// Every block's geometry is validated, then blocks with blank text are
/// skipped. Blocks without an id get `<page>-<n>` (1-indexed). The first
/// malformed block aborts the page.
pub fn index_fragments(page: &OcrPage, page_number: u32) -> Result<Vec<Fragment>, ExtractError> {
    let mut fragments = Vec::with_capacity(page.blocks.len());

    for (index, block) in page.blocks.iter().enumerate() {
        let id = block
            .id
            .clone()
            .unwrap_or_else(|| format!("{page_number}-{}", index + 1));
        let vertices = block_vertices(block, page, &id)?;
        let fragment = Fragment::new(id, block.text.clone(), block.confidence, &vertices)?;
        if fragment.text().trim().is_empty() {
            trace!(fragment = %fragment.id(), "skipping blank block");
            continue;
        }
        fragments.push(fragment);
    }

    debug!(
        page = page_number,
        blocks = page.blocks.len(),
        fragments = fragments.len(),
        "indexed page fragments"
    );
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::{Fragment, index_fragments};
    use crate::document::{BoundingPoly, OcrBlock, OcrPage};
    use crate::error::ExtractError;
    use crate::model::Point;

    fn block(text: &str, vertices: Vec<Point>, pixel: Vec<Point>) -> OcrBlock {
        OcrBlock {
            id: None,
            text: text.to_string(),
            confidence: 0.9,
            bounding_poly: BoundingPoly {
                normalized_vertices: vertices,
                vertices: pixel,
            },
            extra: serde_json::Map::new(),
        }
    }

    fn square(x: f64, y: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ]
    }

    #[test]
    fn derives_extents_from_quad() {
        let fragment = Fragment::new(
            "a",
            "Total",
            0.95,
            &[
                Point::new(0.2, 0.4),
                Point::new(0.4, 0.41),
                Point::new(0.39, 0.45),
                Point::new(0.21, 0.44),
            ],
        )
        .expect("fragment should build");

        assert_eq!(fragment.x_min(), 0.2);
        assert_eq!(fragment.x_max(), 0.4);
        assert_eq!(fragment.y_min(), 0.4);
        assert_eq!(fragment.y_max(), 0.45);
        assert!((fragment.x_center() - 0.3).abs() < 1e-12);
        assert!((fragment.y_center() - 0.425).abs() < 1e-12);
    }

    #[test]
    fn rejects_triangle() {
        let err = Fragment::new("tri", "x", 1.0, &square(0.1, 0.1, 0.1)[..3])
            .expect_err("three points should fail");
        assert!(
            matches!(err, ExtractError::MalformedFragment { ref id, .. } if id == "tri"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn rejects_non_finite_coordinate() {
        let mut vertices = square(0.1, 0.1, 0.1);
        vertices[2].x = f64::NAN;
        let err = Fragment::new("nan", "x", 1.0, &vertices).expect_err("NaN should fail");
        assert!(err.to_string().contains("non-finite coordinate"));
    }

    #[test]
    fn clamps_slight_overshoot() {
        let fragment = Fragment::new("edge", "x", 1.2, &square(0.95, 0.95, 0.1))
            .expect("finite overshoot is accepted");
        assert_eq!(fragment.x_max(), 1.0);
        assert_eq!(fragment.confidence(), 1.0);
    }

    #[test]
    fn normalizes_pixel_vertices_and_skips_blank_text() {
        let page = OcrPage {
            width: Some(1000.0),
            height: Some(2000.0),
            blocks: vec![
                block("   ", square(0.1, 0.1, 0.1), Vec::new()),
                block("pixels", Vec::new(), square(100.0, 200.0, 100.0)),
            ],
            ..OcrPage::default()
        };

        let fragments = index_fragments(&page, 3).expect("page should index");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].id(), "3-2");
        assert!((fragments[0].x_min() - 0.1).abs() < 1e-12);
        assert!((fragments[0].y_max() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn pixel_vertices_without_page_size_are_malformed() {
        let page = OcrPage {
            blocks: vec![block("pixels", Vec::new(), square(100.0, 200.0, 100.0))],
            ..OcrPage::default()
        };

        let err = index_fragments(&page, 1).expect_err("missing size should fail");
        assert!(err.to_string().contains("1-1"));
    }

    #[test]
    fn blank_block_with_broken_polygon_is_malformed() {
        let mut broken = block("  ", square(0.1, 0.1, 0.1)[..2].to_vec(), Vec::new());
        broken.id = Some("broken".to_string());
        let page = OcrPage {
            blocks: vec![broken],
            ..OcrPage::default()
        };

        let err = index_fragments(&page, 1).expect_err("two vertices should fail");
        assert!(
            matches!(err, ExtractError::MalformedFragment { ref id, .. } if id == "broken"),
            "unexpected error: {err:?}"
        );
    }
}
