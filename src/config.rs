// attendance-record: render configuration

/// A4 portrait dimensions in mm
pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;

/// Device-pixel oversampling applied when rasterizing for print
pub const DEFAULT_SCALE_FACTOR: f32 = 2.0;

/// Uniform bottom spacing between paragraphs, in px
pub const DEFAULT_PARAGRAPH_SPACING_PX: u32 = 8;

/// Container class the rich-text editor styles are scoped to
pub const DEFAULT_WRAPPER_CLASS: &str = "ql-editor";

pub const DEFAULT_DOCUMENT_TITLE: &str = "document";

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Settings for normalizing and rendering exported documents.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub scale_factor: f32,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub paragraph_spacing_px: u32,
    pub wrapper_class: String,
    pub default_title: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            page_width_mm: A4_WIDTH_MM,
            page_height_mm: A4_HEIGHT_MM,
            paragraph_spacing_px: DEFAULT_PARAGRAPH_SPACING_PX,
            wrapper_class: DEFAULT_WRAPPER_CLASS.to_string(),
            default_title: DEFAULT_DOCUMENT_TITLE.to_string(),
        }
    }
}

impl RenderConfig {
    pub fn with_scale_factor(mut self, scale_factor: f32) -> Self {
        if scale_factor.is_finite() && scale_factor > 0.0 {
            self.scale_factor = scale_factor;
        }
        self
    }

    pub fn with_paragraph_spacing(mut self, px: u32) -> Self {
        self.paragraph_spacing_px = px;
        self
    }
}
