/// Recoverable conditions reported alongside a result instead of failing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCode {
    NoTablesDetected,
    EmptyRegion,
    NoColumnAnchors,
    NoRowLabels,
    RegionPageMissing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractWarning {
    pub code: WarningCode,
    pub message: String,
    pub page: Option<u32>,
    pub region: Option<String>,
}

impl ExtractWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            page: None,
            region: None,
        }
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}
