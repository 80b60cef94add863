//! Configuration types for a conversion run.
//!
//! All behaviour of one batch is controlled through [`ConversionSettings`],
//! built via its [`ConversionSettingsBuilder`]. The settings value is
//! immutable for the duration of a run: every file in a batch shares one
//! settings value and one strategy, which makes runs reproducible and lets
//! two runs be diffed by serialising their settings.
//!
//! # Design choice: builder over constructor
//! Callers set only what they care about and rely on documented defaults for
//! the rest; the builder clamps out-of-range values where a sensible nearest
//! value exists and rejects the rest in [`ConversionSettingsBuilder::build`].

use crate::error::BatchError;
use crate::format::{OutputFormat, RasterFormat};
use serde::{Deserialize, Serialize};

/// Settings for one conversion batch.
///
/// Built via [`ConversionSettings::builder()`] or using
/// [`ConversionSettings::default()`].
///
/// # Example
/// ```rust
/// use formshift::{ConversionSettings, OutputFormat, RasterFormat};
///
/// let settings = ConversionSettings::builder()
///     .target(OutputFormat::Raster(RasterFormat::Jpeg))
///     .quality(0.85)
///     .dpi(150)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionSettings {
    /// Fractional encoding quality in [0, 1] for lossy raster codecs. Default: 0.9.
    ///
    /// Maps to the familiar 1–100 scale of JPEG encoders. Lossless targets
    /// (PNG and friends) ignore it.
    pub quality: f32,

    /// Output container/codec for the whole batch. Default: PNG.
    pub target: OutputFormat,

    /// Preserve the image's aspect ratio when fitting it onto a document
    /// page. Default: true. When false the image is stretched to fill the
    /// page's content box.
    pub maintain_aspect_ratio: bool,

    /// Rasterisation resolution for document pages. Range: 72–400. Default: 150.
    ///
    /// PDF pages are measured in 72-per-inch points; rendering scales each
    /// page by `dpi / 72`. 150 keeps text legible while a full A4 page stays
    /// around 1200 × 1750 px.
    pub dpi: u32,

    /// Page size used when assembling a document from images. Default: A4.
    pub page_size: PageSize,

    /// Page orientation used when assembling a document. Default: portrait.
    pub orientation: Orientation,

    /// Compression effort for archives, PNG output, and document streams.
    /// Default: balanced.
    pub compression: CompressionLevel,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            quality: 0.9,
            target: OutputFormat::Raster(RasterFormat::Png),
            maintain_aspect_ratio: true,
            dpi: 150,
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            compression: CompressionLevel::Balanced,
        }
    }
}

impl ConversionSettings {
    /// Create a new builder for `ConversionSettings`.
    pub fn builder() -> ConversionSettingsBuilder {
        ConversionSettingsBuilder {
            settings: Self::default(),
        }
    }

    /// Quality on the 1–100 integer scale expected by JPEG encoders.
    pub fn quality_percent(&self) -> u8 {
        ((self.quality * 100.0).round() as u8).clamp(1, 100)
    }
}

/// Builder for [`ConversionSettings`].
#[derive(Debug)]
pub struct ConversionSettingsBuilder {
    settings: ConversionSettings,
}

impl ConversionSettingsBuilder {
    pub fn quality(mut self, q: f32) -> Self {
        self.settings.quality = q.clamp(0.0, 1.0);
        self
    }

    pub fn target(mut self, target: OutputFormat) -> Self {
        self.settings.target = target;
        self
    }

    pub fn maintain_aspect_ratio(mut self, v: bool) -> Self {
        self.settings.maintain_aspect_ratio = v;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.settings.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.settings.page_size = size;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.settings.orientation = orientation;
        self
    }

    pub fn compression(mut self, level: CompressionLevel) -> Self {
        self.settings.compression = level;
        self
    }

    /// Build the settings, validating constraints.
    pub fn build(self) -> Result<ConversionSettings, BatchError> {
        let s = &self.settings;
        if !s.quality.is_finite() {
            return Err(BatchError::InvalidSettings(format!(
                "quality must be a finite number in [0, 1], got {}",
                s.quality
            )));
        }
        Ok(self.settings)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Physical page size for assembled documents, in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// 210 × 297 mm. (default)
    #[default]
    A4,
    /// 8.5 × 11 in.
    Letter,
    /// 8.5 × 14 in.
    Legal,
}

impl PageSize {
    /// Page dimensions `(width, height)` in points for the given orientation.
    pub fn dimensions(self, orientation: Orientation) -> (f64, f64) {
        let (w, h) = match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
        };
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

/// Page orientation for assembled documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Compression effort, traded against encoding speed.
///
/// One knob drives three consumers: the ZIP bundler's deflate level, the
/// PNG encoder's compression type, and whether assembled document streams
/// are flate-compressed before saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Fastest encode, largest output.
    Fast,
    /// Encoder defaults. (default)
    #[default]
    Balanced,
    /// Smallest output, slowest encode.
    Best,
}

impl CompressionLevel {
    /// Deflate level for the ZIP bundler, `None` meaning the library default.
    pub fn zip_level(self) -> Option<i64> {
        match self {
            CompressionLevel::Fast => Some(1),
            CompressionLevel::Balanced => None,
            CompressionLevel::Best => Some(9),
        }
    }

    /// Compression type for the PNG encoder.
    pub fn png_compression(self) -> image::codecs::png::CompressionType {
        match self {
            CompressionLevel::Fast => image::codecs::png::CompressionType::Fast,
            CompressionLevel::Balanced => image::codecs::png::CompressionType::Default,
            CompressionLevel::Best => image::codecs::png::CompressionType::Best,
        }
    }
}
