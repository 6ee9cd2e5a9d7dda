// attendance-record: paginated PDF renderer

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ::image::imageops::{self, FilterType};
use ::image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use printpdf::*;

use crate::config::RenderConfig;
use crate::error::RenderError;

const MM_PER_INCH: f32 = 25.4;

// ============================================================================
// Surfaces
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Device-pixel oversampling
    pub scale: f32,
    pub background: Rgb<u8>,
}

impl RasterOptions {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            scale: config.scale_factor,
            background: Rgb([255, 255, 255]),
        }
    }
}

/// Mounted content that can be turned into pixels.
#[allow(async_fn_in_trait)]
pub trait Surface {
    async fn rasterize(&self, options: &RasterOptions) -> Result<RgbaImage, RenderError>;
}

/// A surface backed by an already captured image at 1x.
#[derive(Debug, Clone)]
pub struct ImageSurface {
    image: DynamicImage,
}

impl ImageSurface {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RenderError> {
        ::image::load_from_memory(bytes)
            .map(Self::new)
            .map_err(|e| RenderError::Rasterize(format!("Failed to decode image: {}", e)))
    }
}

impl Surface for ImageSurface {
    async fn rasterize(&self, options: &RasterOptions) -> Result<RgbaImage, RenderError> {
        let rgba = self.image.to_rgba8();
        if (options.scale - 1.0).abs() < f32::EPSILON {
            return Ok(rgba);
        }
        let (width, height) = rgba.dimensions();
        let target_w = ((width as f32 * options.scale).round() as u32).max(1);
        let target_h = ((height as f32 * options.scale).round() as u32).max(1);
        Ok(imageops::resize(&rgba, target_w, target_h, FilterType::Triangle))
    }
}

/// Composite against a solid background so transparent or tinted content
/// cannot leak into the page.
pub fn flatten_onto(rgba: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    let (width, height) = rgba.dimensions();
    let mut rgb_image = RgbImage::new(width, height);
    let Rgb([bg_r, bg_g, bg_b]) = background;

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        let blend = |c: u8, bg: u8| (c as f32 * alpha + bg as f32 * (1.0 - alpha)).round() as u8;
        rgb_image.put_pixel(x, y, Rgb([blend(r, bg_r), blend(g, bg_g), blend(b, bg_b)]));
    }

    rgb_image
}

// ============================================================================
// Pagination
// ============================================================================

/// One page of output: the full image drawn at a vertical offset.
///
/// `offset` is measured top-down from the page's top edge, in mm; page
/// clipping hides everything outside the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSlice {
    pub index: usize,
    pub offset: f32,
}

/// Split an image `total_height` tall into pages `page_height` tall.
pub fn plan_pages(total_height: f32, page_height: f32) -> Vec<PageSlice> {
    if total_height <= page_height || !(page_height > 0.0) || !total_height.is_finite() {
        return vec![PageSlice {
            index: 0,
            offset: 0.0,
        }];
    }

    let mut pages = Vec::new();
    let mut remaining = total_height;
    while remaining > 0.0 {
        pages.push(PageSlice {
            index: pages.len(),
            offset: -(total_height - remaining),
        });
        remaining -= page_height;
    }
    pages
}

/// Size of a raster scaled to exactly fill the page width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFit {
    pub width_mm: f32,
    pub height_mm: f32,
    pub dpi: f32,
}

impl PageFit {
    pub fn new(width_px: u32, height_px: u32, page_width_mm: f32) -> Self {
        let height_mm = height_px as f32 * page_width_mm / width_px as f32;
        Self {
            width_mm: page_width_mm,
            height_mm,
            dpi: width_px as f32 / (page_width_mm / MM_PER_INCH),
        }
    }
}

// ============================================================================
// Rendered document
// ============================================================================

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub title: String,
    pub filename: String,
    pub pages: Vec<PageSlice>,
    pub bytes: Vec<u8>,
}

impl RenderedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&self.bytes)?;
        writer.flush()
    }
}

/// Download name for a document title. Blank titles fall back to `default_title`.
pub fn document_filename(title: Option<&str>, default_title: &str) -> String {
    let sanitize = |s: &str| {
        s.trim()
            .to_lowercase()
            .replace(' ', "-")
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect::<String>()
    };
    let name = title.map(sanitize).filter(|s| !s.is_empty());
    format!("{}.pdf", name.unwrap_or_else(|| sanitize(default_title)))
}

// ============================================================================
// Renderer
// ============================================================================

pub struct PaginatedRenderer {
    config: RenderConfig,
}

impl PaginatedRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Rasterize `surface` and lay it out over as many pages as it needs.
    ///
    /// An unmounted surface (`None`) yields `Ok(None)`: nothing is rendered
    /// and nothing is reported.
    pub async fn render<S: Surface>(
        &self,
        surface: Option<&S>,
        title: Option<&str>,
    ) -> Result<Option<RenderedDocument>, RenderError> {
        let Some(surface) = surface else {
            return Ok(None);
        };

        let options = RasterOptions::from_config(&self.config);
        let raster = surface.rasterize(&options).await?;
        let (width_px, height_px) = raster.dimensions();
        if width_px == 0 || height_px == 0 {
            return Err(RenderError::EmptyRaster);
        }

        let rgb = flatten_onto(&raster, options.background);
        let fit = PageFit::new(width_px, height_px, self.config.page_width_mm);
        let pages = plan_pages(fit.height_mm, self.config.page_height_mm);

        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.config.default_title)
            .to_string();
        let filename = document_filename(Some(&title), &self.config.default_title);

        let bytes = self.assemble(&title, rgb, &fit, &pages)?;

        tracing::info!(
            filename = %filename,
            pages = pages.len(),
            width_px,
            height_px,
            "Rendered paginated document"
        );

        Ok(Some(RenderedDocument {
            title,
            filename,
            pages,
            bytes,
        }))
    }

    fn assemble(
        &self,
        title: &str,
        rgb: RgbImage,
        fit: &PageFit,
        pages: &[PageSlice],
    ) -> Result<Vec<u8>, RenderError> {
        let page_w = self.config.page_width_mm;
        let page_h = self.config.page_height_mm;
        let (width_px, height_px) = rgb.dimensions();
        let raw_pixels = rgb.into_raw();

        let (doc, page1, layer1) = PdfDocument::new(title, Mm(page_w), Mm(page_h), "Layer 1");

        for slice in pages {
            let layer = if slice.index == 0 {
                doc.get_page(page1).get_layer(layer1)
            } else {
                let (page, layer) = doc.add_page(Mm(page_w), Mm(page_h), "Layer 1");
                doc.get_page(page).get_layer(layer)
            };

            let image = Image::from(ImageXObject {
                width: Px(width_px as usize),
                height: Px(height_px as usize),
                color_space: ColorSpace::Rgb,
                bits_per_component: ColorBits::Bit8,
                interpolate: true,
                image_data: raw_pixels.clone(),
                image_filter: None,
                clipping_bbox: None,
                smask: None,
            });

            // PDF space is bottom-up: place the image's top edge `offset` below the page top.
            let translate_y = page_h - fit.height_mm - slice.offset;

            image.add_to_layer(
                layer,
                ImageTransform {
                    translate_x: Some(Mm(0.0)),
                    translate_y: Some(Mm(translate_y)),
                    dpi: Some(fit.dpi),
                    ..Default::default()
                },
            );
        }

        doc.save_to_bytes()
            .map_err(|e| RenderError::Pdf(e.to_string()))
    }
}
