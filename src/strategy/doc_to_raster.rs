//! Document-to-raster conversion: render each PDF page to an image.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto the blocking thread
//! pool, so the executor stays responsive and per-page progress reports can
//! be observed while a large document renders.
//!
//! ## Resolution
//!
//! PDF pages are measured in 72-per-inch points; each page is rendered at
//! `dpi / 72` of its native point size, so a 150-dpi render of an A4 page
//! comes out around 1240 × 1754 px. Pages keep their individual sizes — a
//! mixed-size document produces mixed-size images.

use crate::config::ConversionSettings;
use crate::error::ConvertError;
use crate::format::RasterFormat;
use crate::output::Payload;
use crate::progress::ProgressFn;
use crate::strategy::raster;
use bytes::Bytes;
use pdfium_render::prelude::*;
use tracing::debug;

/// Render every page of a PDF to the target raster format, in page order.
///
/// Produces one payload per page. Progress is reported as
/// `pages_done / pages_total × 100` after each page.
pub async fn convert(
    source: Bytes,
    target: RasterFormat,
    settings: &ConversionSettings,
    progress: ProgressFn,
) -> Result<Vec<Payload>, ConvertError> {
    let settings = settings.clone();
    tokio::task::spawn_blocking(move || render_all(&source, target, &settings, progress))
        .await
        .map_err(|e| ConvertError::Internal(format!("render task panicked: {e}")))?
}

/// Blocking implementation of full-document rendering.
fn render_all(
    bytes: &[u8],
    target: RasterFormat,
    settings: &ConversionSettings,
    progress: ProgressFn,
) -> Result<Vec<Payload>, ConvertError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| ConvertError::DocumentOpenFailed {
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    debug!(pages = total, dpi = settings.dpi, "document opened");

    let scale = settings.dpi as f32 / 72.0;
    let mut payloads = Vec::with_capacity(total);

    for idx in 0..total {
        let page = pages
            .get(idx as u16)
            .map_err(|e| ConvertError::PageRenderFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;

        let width = (page.width().value * scale).round().max(1.0) as i32;
        let height = (page.height().value * scale).round().max(1.0) as i32;
        let render_config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_target_height(height)
            .rotate_if_landscape(PdfPageRenderRotation::None, false);

        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| ConvertError::PageRenderFailed {
                    page: idx + 1,
                    detail: format!("{e:?}"),
                })?;

        let image = bitmap.as_image();
        debug!(page = idx + 1, width = image.width(), height = image.height(), "page rendered");

        payloads.push(raster::encode(&image, target, settings)?);
        progress((((idx + 1) * 100) / total) as u8);
    }

    Ok(payloads)
}

/// Bind a pdfium library: an explicit `PDFIUM_LIB_PATH`, the working
/// directory, the usual system locations, then the system loader.
fn bind_pdfium() -> Result<Pdfium, ConvertError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(dir) if !dir.is_empty() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("/usr/lib"))
            })
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                    "/usr/local/lib",
                ))
            })
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ConvertError::PdfiumBinding(e.to_string()))?;

    Ok(Pdfium::new(bindings))
}
