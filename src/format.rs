//! Format model: raster codecs, source classification, conversion directions.
//!
//! Every conversion is keyed by a `(source kind, target format)` pair. The
//! source kind is classified from the file's MIME type at admission; the
//! target format is declared in [`crate::config::ConversionSettings`]. Both
//! sides of the pair are closed enums so the dispatch in
//! [`crate::strategy::Strategy::select`] is exhaustive and a new codec only
//! needs to be wired in one place.

use serde::{Deserialize, Serialize};
use std::fmt;

/// MIME type of PDF documents, the only document container accepted.
pub const PDF_MIME: &str = "application/pdf";

/// A raster image codec supported on both the decode and encode side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    Png,
    Jpeg,
    WebP,
    Bmp,
    Gif,
    Tiff,
}

impl RasterFormat {
    /// Every supported raster format, in UI presentation order.
    pub fn all() -> &'static [RasterFormat] {
        &[
            RasterFormat::Png,
            RasterFormat::Jpeg,
            RasterFormat::WebP,
            RasterFormat::Bmp,
            RasterFormat::Gif,
            RasterFormat::Tiff,
        ]
    }

    /// Canonical MIME type for this format.
    pub fn mime_type(self) -> &'static str {
        match self {
            RasterFormat::Png => "image/png",
            RasterFormat::Jpeg => "image/jpeg",
            RasterFormat::WebP => "image/webp",
            RasterFormat::Bmp => "image/bmp",
            RasterFormat::Gif => "image/gif",
            RasterFormat::Tiff => "image/tiff",
        }
    }

    /// File extension used when naming output artifacts.
    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpg",
            RasterFormat::WebP => "webp",
            RasterFormat::Bmp => "bmp",
            RasterFormat::Gif => "gif",
            RasterFormat::Tiff => "tiff",
        }
    }

    /// Parse a MIME type, tolerating the common `image/jpg` misnomer.
    pub fn from_mime(mime: &str) -> Option<RasterFormat> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(RasterFormat::Png),
            "image/jpeg" | "image/jpg" => Some(RasterFormat::Jpeg),
            "image/webp" => Some(RasterFormat::WebP),
            "image/bmp" => Some(RasterFormat::Bmp),
            "image/gif" => Some(RasterFormat::Gif),
            "image/tiff" => Some(RasterFormat::Tiff),
            _ => None,
        }
    }

    /// Parse a file extension (without the dot, case-insensitive).
    pub fn from_extension(ext: &str) -> Option<RasterFormat> {
        match ext.trim().to_ascii_lowercase().as_str() {
            "png" => Some(RasterFormat::Png),
            "jpg" | "jpeg" => Some(RasterFormat::Jpeg),
            "webp" => Some(RasterFormat::WebP),
            "bmp" => Some(RasterFormat::Bmp),
            "gif" => Some(RasterFormat::Gif),
            "tif" | "tiff" => Some(RasterFormat::Tiff),
            _ => None,
        }
    }

    /// Whether the container carries an alpha channel.
    ///
    /// Targets without alpha get their transparency composited onto an opaque
    /// background before encoding — an explicit lossy step, not an accident.
    pub fn supports_alpha(self) -> bool {
        match self {
            RasterFormat::Png | RasterFormat::WebP | RasterFormat::Gif | RasterFormat::Tiff => true,
            RasterFormat::Jpeg | RasterFormat::Bmp => false,
        }
    }

    /// The `image` crate's format identifier for this codec.
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            RasterFormat::Png => image::ImageFormat::Png,
            RasterFormat::Jpeg => image::ImageFormat::Jpeg,
            RasterFormat::WebP => image::ImageFormat::WebP,
            RasterFormat::Bmp => image::ImageFormat::Bmp,
            RasterFormat::Gif => image::ImageFormat::Gif,
            RasterFormat::Tiff => image::ImageFormat::Tiff,
        }
    }
}

impl fmt::Display for RasterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Coarse classification of an input file, derived from its MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A single raster image.
    Raster,
    /// A paged PDF document.
    Document,
}

impl SourceKind {
    /// Classify a MIME type, or `None` for anything the engine cannot read.
    pub fn from_mime(mime: &str) -> Option<SourceKind> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime == PDF_MIME {
            Some(SourceKind::Document)
        } else if RasterFormat::from_mime(&mime).is_some() {
            Some(SourceKind::Raster)
        } else {
            None
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Raster => f.write_str("raster image"),
            SourceKind::Document => f.write_str("document"),
        }
    }
}

/// The declared output side of a conversion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Encode to a raster image codec.
    Raster(RasterFormat),
    /// Assemble a paged PDF document.
    Document,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Raster(f) => f.mime_type(),
            OutputFormat::Document => PDF_MIME,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Raster(f) => f.extension(),
            OutputFormat::Document => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One conversion direction, used both for admission checks and as the
/// strategy-selection key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionMode {
    /// Raster image in, raster image out.
    RasterToRaster,
    /// PDF in, one raster image per page out.
    DocumentToRaster,
    /// Raster images in, one PDF out.
    RasterToDocument,
}

impl ConversionMode {
    /// The source kind this direction accepts.
    pub fn source_kind(self) -> SourceKind {
        match self {
            ConversionMode::RasterToRaster | ConversionMode::RasterToDocument => SourceKind::Raster,
            ConversionMode::DocumentToRaster => SourceKind::Document,
        }
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionMode::RasterToRaster => f.write_str("image to image"),
            ConversionMode::DocumentToRaster => f.write_str("document to images"),
            ConversionMode::RasterToDocument => f.write_str("images to document"),
        }
    }
}
