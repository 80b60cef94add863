//! Raster-to-document conversion: assemble one PDF from a sequence of images.
//!
//! Every image gets its own page of the configured size and orientation. The
//! image is scaled into the page's content box (page minus a half-inch
//! margin), preserving aspect ratio and centred — or stretched to fill the
//! box when `maintain_aspect_ratio` is off.
//!
//! ## Embedding
//!
//! JPEG sources pass through as `DCTDecode` streams, byte for byte — no
//! generational re-encode loss and no decode/re-encode cost. Everything else
//! is decoded and embedded as a raw `DeviceRGB` stream, which
//! `Document::compress` deflates before saving unless the compression level
//! asks for speed.
//!
//! A bad image does not sink the whole document: its failure is recorded per
//! index and the remaining images still get their pages. The caller decides
//! what a partial build means for each input file.

use crate::config::{CompressionLevel, ConversionSettings};
use crate::error::ConvertError;
use crate::progress::ProgressFn;
use crate::strategy::raster;
use bytes::Bytes;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

/// Page margin in points (half an inch on every side).
const PAGE_MARGIN: f64 = 36.0;

/// Result of assembling a document from a sequence of images.
#[derive(Debug)]
pub struct DocumentBuild {
    /// Serialised PDF. Meaningful only when `page_count > 0`.
    pub bytes: Vec<u8>,
    /// Pages actually embedded.
    pub page_count: usize,
    /// Per-input failures, as `(input index, error)` pairs.
    pub failures: Vec<(usize, ConvertError)>,
}

impl DocumentBuild {
    /// The failure recorded for a given input index, if any.
    pub fn failure_for(&self, index: usize) -> Option<&ConvertError> {
        self.failures
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, e)| e)
    }
}

/// Assemble one PDF from the given images, in order.
///
/// Progress is reported as `images_done / images_total × 100` after each
/// image, counting failed images as done.
pub async fn build_document(
    images: Vec<Bytes>,
    settings: &ConversionSettings,
    progress: ProgressFn,
) -> Result<DocumentBuild, ConvertError> {
    let settings = settings.clone();
    tokio::task::spawn_blocking(move || build_blocking(&images, &settings, progress))
        .await
        .map_err(|e| ConvertError::Internal(format!("document build task panicked: {e}")))?
}

/// Blocking implementation of document assembly.
fn build_blocking(
    images: &[Bytes],
    settings: &ConversionSettings,
    progress: ProgressFn,
) -> Result<DocumentBuild, ConvertError> {
    let total = images.len();
    if total == 0 {
        return Ok(DocumentBuild {
            bytes: Vec::new(),
            page_count: 0,
            failures: Vec::new(),
        });
    }

    let (page_w, page_h) = settings.page_size.dimensions(settings.orientation);
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    let mut failures: Vec<(usize, ConvertError)> = Vec::new();

    for (index, bytes) in images.iter().enumerate() {
        match embed_page(&mut doc, pages_id, bytes, page_w, page_h, settings) {
            Ok(page_id) => kids.push(page_id.into()),
            Err(e) => {
                warn!(index, error = %e, "image skipped during document build");
                failures.push((index, e));
            }
        }
        progress((((index + 1) * 100) / total) as u8);
    }

    let page_count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if settings.compression != CompressionLevel::Fast {
        doc.compress();
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ConvertError::DocumentBuildFailed {
            detail: e.to_string(),
        })?;

    debug!(pages = page_count, failed = failures.len(), bytes = buffer.len(), "document built");

    Ok(DocumentBuild {
        bytes: buffer,
        page_count,
        failures,
    })
}

/// Embed one image as a new page; returns the page's object id.
fn embed_page(
    doc: &mut Document,
    pages_id: ObjectId,
    bytes: &[u8],
    page_w: f64,
    page_h: f64,
    settings: &ConversionSettings,
) -> Result<ObjectId, ConvertError> {
    let img = raster::decode(bytes)?;
    let (width, height) = (img.width(), img.height());

    // JPEG bytes embed directly as a DCTDecode stream; everything else
    // becomes raw DeviceRGB samples.
    let is_jpeg = image::guess_format(bytes)
        .map(|f| f == image::ImageFormat::Jpeg)
        .unwrap_or(false);

    let image_stream = if is_jpeg {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            bytes.to_vec(),
        )
    } else {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            img.to_rgb8().into_raw(),
        )
    };

    let image_id = doc.new_object_id();
    doc.objects.insert(image_id, Object::Stream(image_stream));

    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! {
            "Im1" => image_id,
        },
    });

    let (draw_w, draw_h, x, y) = fit_rect(
        width,
        height,
        page_w,
        page_h,
        settings.maintain_aspect_ratio,
    );

    let content = format!(
        "q\n{draw_w:.2} 0 0 {draw_h:.2} {x:.2} {y:.2} cm\n/Im1 Do\nQ\n"
    );
    let content_id = doc.add_object(Object::Stream(Stream::new(
        dictionary! {},
        content.into_bytes(),
    )));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            (page_w.round() as i64).into(),
            (page_h.round() as i64).into(),
        ],
        "Resources" => resources_id,
        "Contents" => content_id,
    });

    Ok(page_id)
}

/// Compute the drawn size and origin for an image on a page.
///
/// Returns `(width, height, x, y)` in points. With aspect preservation the
/// image is scaled by the smaller of the two axis ratios and centred in the
/// content box; otherwise it fills the content box exactly.
fn fit_rect(
    img_w: u32,
    img_h: u32,
    page_w: f64,
    page_h: f64,
    maintain_aspect_ratio: bool,
) -> (f64, f64, f64, f64) {
    let avail_w = page_w - 2.0 * PAGE_MARGIN;
    let avail_h = page_h - 2.0 * PAGE_MARGIN;

    let (draw_w, draw_h) = if maintain_aspect_ratio {
        let scale = (avail_w / img_w as f64).min(avail_h / img_h as f64);
        (img_w as f64 * scale, img_h as f64 * scale)
    } else {
        (avail_w, avail_h)
    };

    let x = (page_w - draw_w) / 2.0;
    let y = (page_h - draw_h) / 2.0;
    (draw_w, draw_h, x, y)
}
