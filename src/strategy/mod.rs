//! Conversion strategies, one module per direction.
//!
//! Each submodule implements exactly one `(source kind, target)` direction;
//! [`Strategy`] is the tagged-variant dispatch over them, selected once per
//! batch. Keeping directions separate makes each independently testable and
//! lets a new direction be added without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! source bytes ──▶ strategy ──▶ payload(s) ──▶ bundler ──▶ artifact
//!                 (decode,       (1 per page     (zip or
//!                  transform,     or exactly 1)   pass-through)
//!                  encode)
//! ```
//!
//! 1. [`raster`]        — raster image in, raster image out
//! 2. [`doc_to_raster`] — PDF in, one image per page out
//! 3. [`raster_to_doc`] — images in, one assembled PDF out

pub mod doc_to_raster;
pub mod raster;
pub mod raster_to_doc;

use crate::config::ConversionSettings;
use crate::error::ConvertError;
use crate::format::{ConversionMode, OutputFormat, RasterFormat, SourceKind, PDF_MIME};
use crate::output::{ConversionOutcome, Payload};
use crate::progress::ProgressFn;
use bytes::Bytes;

/// One selected conversion direction, carrying its target parameters.
///
/// Selected by [`Strategy::select`] from the batch's declared
/// `(source kind, target format)` pair; every file in a batch runs through
/// the same strategy value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Re-encode a raster image to another raster format.
    RasterToRaster(RasterFormat),
    /// Render each document page to a raster image.
    DocumentToRaster(RasterFormat),
    /// Assemble raster images into one document.
    RasterToDocument,
}

impl Strategy {
    /// Pick the strategy for a `(source, target)` pair, or `None` when no
    /// direction exists (document to document is not a conversion).
    pub fn select(source: SourceKind, target: OutputFormat) -> Option<Strategy> {
        match (source, target) {
            (SourceKind::Raster, OutputFormat::Raster(f)) => Some(Strategy::RasterToRaster(f)),
            (SourceKind::Document, OutputFormat::Raster(f)) => Some(Strategy::DocumentToRaster(f)),
            (SourceKind::Raster, OutputFormat::Document) => Some(Strategy::RasterToDocument),
            (SourceKind::Document, OutputFormat::Document) => None,
        }
    }

    /// The direction key, shared with admission checks.
    pub fn mode(self) -> ConversionMode {
        match self {
            Strategy::RasterToRaster(_) => ConversionMode::RasterToRaster,
            Strategy::DocumentToRaster(_) => ConversionMode::DocumentToRaster,
            Strategy::RasterToDocument => ConversionMode::RasterToDocument,
        }
    }

    /// Convert one file's bytes, reporting progress as monotonically
    /// increasing 0–100 percentages ending at 100.
    ///
    /// The images-to-document direction applied to a single file yields a
    /// one-page document; the orchestrator uses
    /// [`raster_to_doc::build_document`] directly when it aggregates a whole
    /// batch into one document.
    pub async fn convert(
        self,
        source: Bytes,
        settings: &ConversionSettings,
        progress: ProgressFn,
    ) -> Result<ConversionOutcome, ConvertError> {
        match self {
            Strategy::RasterToRaster(target) => raster::convert(source, target, settings, progress)
                .await
                .map(ConversionOutcome::Single),
            Strategy::DocumentToRaster(target) => {
                doc_to_raster::convert(source, target, settings, progress)
                    .await
                    .map(ConversionOutcome::Sequence)
            }
            Strategy::RasterToDocument => {
                let build =
                    raster_to_doc::build_document(vec![source], settings, progress).await?;
                if build.page_count == 0 {
                    Err(build
                        .failures
                        .into_iter()
                        .next()
                        .map(|(_, e)| e)
                        .unwrap_or(ConvertError::EmptyOutcome))
                } else {
                    Ok(ConversionOutcome::Single(Payload::new(
                        build.bytes,
                        PDF_MIME,
                    )))
                }
            }
        }
    }
}
