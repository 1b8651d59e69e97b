use std::collections::BTreeSet;
use std::str::FromStr;

use regex::Regex;

use crate::error::ExtractError;
use crate::fragment::Fragment;
use crate::model::BoundingBox;

/// Row clustering thresholds, as fractions of page height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowOptions {
    pub y_tolerance: f64,
    pub min_fragments: usize,
}

impl Default for RowOptions {
    fn default() -> Self {
        Self {
            y_tolerance: 0.02,
            min_fragments: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentOptions {
    pub row_gap_tolerance: f64,
    /// Maximum `x_center` distance for two fragments to share a column.
    pub column_alignment_tolerance: f64,
    pub min_rows: usize,
    pub padding: f64,
    /// Reported for every geometric region.
    pub confidence: f64,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            row_gap_tolerance: 0.1,
            column_alignment_tolerance: 0.02,
            min_rows: 3,
            padding: 0.01,
            confidence: 0.85,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DetectOptions {
    pub rows: RowOptions,
    pub segment: SegmentOptions,
}

/// Which horizontal coordinate of a fragment positions it in a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColumnPosition {
    #[default]
    LeftEdge,
    Center,
}

impl ColumnPosition {
    #[must_use]
    pub fn of(self, fragment: &Fragment) -> f64 {
        match self {
            Self::LeftEdge => fragment.x_min(),
            Self::Center => fragment.x_center(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnOptions {
    pub column_cluster_tolerance: f64,
    pub position: ColumnPosition,
}

impl Default for ColumnOptions {
    fn default() -> Self {
        Self {
            column_cluster_tolerance: 0.03,
            position: ColumnPosition::LeftEdge,
        }
    }
}

/// Settings for turning one region into a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridOptions {
    /// Defaults to a 0.01 tolerance and single-fragment rows so every
    /// fragment in the region lands in the grid.
    pub rows: RowOptions,
    pub columns: ColumnOptions,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            rows: RowOptions {
                y_tolerance: 0.01,
                min_fragments: 1,
            },
            columns: ColumnOptions::default(),
        }
    }
}

/// Vocabulary and geometry for forms with known column and row anchors.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorOptions {
    /// Matched against trimmed fragment text.
    pub column_pattern: String,
    /// Case-insensitive substrings identifying row labels.
    pub row_keywords: Vec<String>,
    pub label_x_threshold: f64,
    /// Column anchors must be centered below this y.
    pub column_anchor_min_y: f64,
    pub vertical_buffer: f64,
    /// Half-width of the outermost columns.
    pub column_margin: f64,
}

impl Default for AnchorOptions {
    fn default() -> Self {
        Self {
            column_pattern: r"^[VP]-T\d+".to_string(),
            row_keywords: [
                "EQUIPMENT",
                "DESCRIPTION",
                "TYPE",
                "DESIGN",
                "OPERATING",
                "CAPACITY",
                "SIZE",
                "PRESSURE",
                "TEMPERATURE",
                "POWER",
                "DUTY",
                "MATERIAL",
                "CODE",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            label_x_threshold: 0.85,
            column_anchor_min_y: 0.0,
            vertical_buffer: 0.005,
            column_margin: 0.05,
        }
    }
}

impl AnchorOptions {
    pub fn compile_pattern(&self) -> Result<Regex, ExtractError> {
        Ok(Regex::new(&self.column_pattern)?)
    }
}

/// Settings for tables whose rows are labelled by right-aligned headers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowLabelOptions {
    pub header_x_threshold: f64,
    /// Vertical extent of the table and horizontal extent of the data columns.
    pub bounds: BoundingBox,
    pub min_header_chars: usize,
    pub columns: ColumnOptions,
}

impl Default for RowLabelOptions {
    fn default() -> Self {
        Self {
            header_x_threshold: 0.90,
            bounds: BoundingBox {
                x_min: 0.0,
                x_max: 0.90,
                y_min: 0.0,
                y_max: 1.0,
            },
            min_header_chars: 2,
            columns: ColumnOptions::default(),
        }
    }
}

/// Extraction strategy, chosen by the caller per document class.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Strategy {
    #[default]
    Geometric,
    AnchorBased(AnchorOptions),
    RowLabelled(RowLabelOptions),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pages: BTreeSet<u32>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

fn parse_page_number(raw: &str, what: &str) -> Result<u32, String> {
    let page: u32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid {what}: '{raw}'"))?;
    if page == 0 {
        return Err("pages are 1-based".to_string());
    }
    Ok(page)
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut pages = BTreeSet::new();
        for token in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some((start, end)) = token.split_once('-') {
                let start = parse_page_number(start, "page range start")?;
                let end = parse_page_number(end, "page range end")?;
                if end < start {
                    return Err(format!(
                        "invalid range '{token}': end is smaller than start"
                    ));
                }
                pages.extend(start..=end);
            } else {
                pages.insert(parse_page_number(token, "page number")?);
            }
        }

        if pages.is_empty() {
            return Err("page selection cannot be empty".to_string());
        }

        Ok(Self { pages })
    }
}

/// A caller-supplied table rectangle on one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSpec {
    pub page: u32,
    pub bounds: BoundingBox,
}

impl FromStr for RegionSpec {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (page_part, rect_part) = input
            .split_once(':')
            .ok_or_else(|| format!("invalid region format '{input}', expected page:x1,y1,x2,y2"))?;

        let page = parse_page_number(page_part, "page number in region")?;
        let bounds = rect_part.parse::<BoundingBox>()?;
        Ok(Self { page, bounds })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub pages: Option<PageSelection>,
    pub strategy: Strategy,
    pub detect: DetectOptions,
    pub grid: GridOptions,
    /// When non-empty for a page, these replace geometric detection there.
    pub regions: Vec<RegionSpec>,
    /// Tighten caller regions to the fragments inside them first.
    pub refine_regions: bool,
    pub delimiter: u8,
    pub no_page: bool,
    pub no_table: bool,
    pub no_header: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            pages: None,
            strategy: Strategy::Geometric,
            detect: DetectOptions::default(),
            grid: GridOptions::default(),
            regions: Vec::new(),
            refine_regions: false,
            delimiter: b',',
            no_page: false,
            no_table: false,
            no_header: false,
        }
    }
}

fn require_positive(name: &str, value: f64) -> Result<(), ExtractError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ExtractError::InvalidOption(format!(
            "{name} must be a positive finite number, got {value}"
        )))
    }
}

fn require_non_negative(name: &str, value: f64) -> Result<(), ExtractError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ExtractError::InvalidOption(format!(
            "{name} must be a non-negative finite number, got {value}"
        )))
    }
}

impl DetectOptions {
    pub fn validate(&self) -> Result<(), ExtractError> {
        require_positive("y_tolerance", self.rows.y_tolerance)?;
        require_positive("row_gap_tolerance", self.segment.row_gap_tolerance)?;
        require_positive(
            "column_alignment_tolerance",
            self.segment.column_alignment_tolerance,
        )?;
        require_non_negative("padding", self.segment.padding)?;
        if self.segment.min_rows == 0 {
            return Err(ExtractError::InvalidOption(
                "min_rows must be at least 1".to_string(),
            ));
        }
        if self.rows.min_fragments == 0 {
            return Err(ExtractError::InvalidOption(
                "min_fragments must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl ExtractOptions {
    pub fn validate(&self) -> Result<(), ExtractError> {
        self.detect.validate()?;
        require_positive("grid y_tolerance", self.grid.rows.y_tolerance)?;
        require_positive(
            "column_cluster_tolerance",
            self.grid.columns.column_cluster_tolerance,
        )?;
        if self.grid.rows.min_fragments == 0 {
            return Err(ExtractError::InvalidOption(
                "grid min_fragments must be at least 1".to_string(),
            ));
        }

        for region in &self.regions {
            let bounds = region.bounds;
            if region.page == 0 {
                return Err(ExtractError::InvalidRegion(
                    "region pages are 1-based".to_string(),
                ));
            }
            if !(bounds.x_max > bounds.x_min && bounds.y_max > bounds.y_min) {
                return Err(ExtractError::InvalidRegion(format!(
                    "region on page {} requires x2>x1 and y2>y1",
                    region.page
                )));
            }
        }

        match &self.strategy {
            Strategy::Geometric => {}
            Strategy::AnchorBased(anchor) => {
                anchor.compile_pattern()?;
                if anchor.row_keywords.iter().all(|kw| kw.trim().is_empty()) {
                    return Err(ExtractError::InvalidOption(
                        "anchor extraction needs at least one row keyword".to_string(),
                    ));
                }
                require_non_negative("vertical_buffer", anchor.vertical_buffer)?;
                require_non_negative("column_margin", anchor.column_margin)?;
            }
            Strategy::RowLabelled(labelled) => {
                require_positive(
                    "column_cluster_tolerance",
                    labelled.columns.column_cluster_tolerance,
                )?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{
        AnchorOptions, ExtractOptions, PageSelection, RegionSpec, SegmentOptions, Strategy,
    };
    use crate::error::ExtractError;
    use crate::model::BoundingBox;

    #[test]
    fn parse_page_selection_range_and_single() {
        let selection = PageSelection::from_str("1-3,5").expect("selection should parse");
        assert!(selection.contains(1));
        assert!(selection.contains(3));
        assert!(selection.contains(5));
        assert!(!selection.contains(4));
    }

    #[test]
    fn reject_invalid_page_selection() {
        let err = PageSelection::from_str("3-1").expect_err("invalid range should fail");
        assert!(err.contains("invalid range"));
    }

    #[test]
    fn parse_region_spec() {
        let region = RegionSpec::from_str("2:0.02,0.02,0.65,0.2").expect("region should parse");
        assert_eq!(region.page, 2);
        assert_eq!(region.bounds.x_max, 0.65);
        assert_eq!(region.bounds.y_min, 0.02);
    }

    #[test]
    fn reject_region_without_page() {
        let err = RegionSpec::from_str("0.1,0.1,0.2,0.2").expect_err("missing page should fail");
        assert!(err.contains("expected page:x1,y1,x2,y2"));
    }

    #[test]
    fn validate_rejects_zero_min_rows() {
        let mut options = ExtractOptions::default();
        options.detect.segment = SegmentOptions {
            min_rows: 0,
            ..SegmentOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ExtractError::InvalidOption(message)) if message.contains("min_rows")
        ));
    }

    #[test]
    fn validate_rejects_bad_anchor_pattern() {
        let options = ExtractOptions {
            strategy: Strategy::AnchorBased(AnchorOptions {
                column_pattern: "([".to_string(),
                ..AnchorOptions::default()
            }),
            ..ExtractOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ExtractError::InvalidPattern(_))
        ));
    }

    #[test]
    fn validate_rejects_inverted_region() {
        let options = ExtractOptions {
            regions: vec![RegionSpec {
                page: 1,
                bounds: BoundingBox {
                    x_min: 0.5,
                    x_max: 0.2,
                    y_min: 0.1,
                    y_max: 0.3,
                },
            }],
            ..ExtractOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ExtractError::InvalidRegion(_))
        ));
    }

    #[test]
    fn defaults_validate() {
        ExtractOptions::default()
            .validate()
            .expect("defaults should be valid");
    }
}
