//! Raster-to-raster conversion: decode, optionally flatten alpha, re-encode.
//!
//! ## Why spawn_blocking?
//!
//! Decoding and re-encoding a full-resolution image is CPU-bound work that
//! would stall the async executor's worker threads. `spawn_blocking` moves it
//! onto the dedicated blocking pool, which also gives progress reports a
//! chance to be observed between stages.
//!
//! ## Transparency policy
//!
//! Alpha is preserved whenever the target container carries it. For opaque
//! targets (JPEG, BMP) the image is composited onto a white background before
//! encoding — an explicit, documented lossy step rather than whatever the
//! encoder would silently do with a fourth channel.

use crate::config::ConversionSettings;
use crate::error::ConvertError;
use crate::format::RasterFormat;
use crate::output::Payload;
use crate::progress::ProgressFn;
use bytes::Bytes;
use image::{DynamicImage, ImageEncoder};
use std::io::Cursor;
use tracing::debug;

/// Convert one raster image to the target format.
pub async fn convert(
    source: Bytes,
    target: RasterFormat,
    settings: &ConversionSettings,
    progress: ProgressFn,
) -> Result<Payload, ConvertError> {
    let settings = settings.clone();
    tokio::task::spawn_blocking(move || {
        let img = decode(&source)?;
        progress(40);
        let payload = encode(&img, target, &settings)?;
        progress(100);
        debug!(
            target = %target,
            input_bytes = source.len(),
            output_bytes = payload.bytes.len(),
            "raster conversion done"
        );
        Ok(payload)
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("conversion task panicked: {e}")))?
}

/// Decode source bytes into a pixel buffer, sniffing the container.
pub(crate) fn decode(bytes: &[u8]) -> Result<DynamicImage, ConvertError> {
    image::load_from_memory(bytes).map_err(|e| ConvertError::DecodeFailed {
        detail: e.to_string(),
    })
}

/// Encode a pixel buffer at the target format and quality.
pub(crate) fn encode(
    img: &DynamicImage,
    target: RasterFormat,
    settings: &ConversionSettings,
) -> Result<Payload, ConvertError> {
    // Opaque targets get the alpha composited away first.
    let flattened;
    let img = if !target.supports_alpha() && img.color().has_alpha() {
        flattened = flatten_alpha(img);
        &flattened
    } else {
        img
    };

    let mut buf = Vec::new();
    match target {
        RasterFormat::Jpeg => {
            // The JPEG encoder takes RGB8 only; alpha was flattened above.
            let rgb = img.to_rgb8();
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                Cursor::new(&mut buf),
                settings.quality_percent(),
            );
            encoder
                .encode_image(&rgb)
                .map_err(|e| encode_error(target, e))?;
        }
        RasterFormat::Png => {
            let encoder = image::codecs::png::PngEncoder::new_with_quality(
                Cursor::new(&mut buf),
                settings.compression.png_compression(),
                image::codecs::png::FilterType::Adaptive,
            );
            encoder
                .write_image(img.as_bytes(), img.width(), img.height(), img.color().into())
                .map_err(|e| encode_error(target, e))?;
        }
        _ => {
            img.write_to(&mut Cursor::new(&mut buf), target.image_format())
                .map_err(|e| encode_error(target, e))?;
        }
    }

    Ok(Payload::new(buf, target.mime_type()))
}

/// Composite an image with transparency onto an opaque white background.
pub(crate) fn flatten_alpha(img: &DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let mut out = image::RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = px[3] as f32 / 255.0;
        let inv = 1.0 - alpha;
        out.put_pixel(
            x,
            y,
            image::Rgb([
                (px[0] as f32 * alpha + 255.0 * inv) as u8,
                (px[1] as f32 * alpha + 255.0 * inv) as u8,
                (px[2] as f32 * alpha + 255.0 * inv) as u8,
            ]),
        );
    }
    DynamicImage::ImageRgb8(out)
}

fn encode_error(target: RasterFormat, e: image::ImageError) -> ConvertError {
    ConvertError::EncodeFailed {
        format: target.extension().to_string(),
        detail: e.to_string(),
    }
}
