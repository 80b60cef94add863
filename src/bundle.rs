//! Bundling: turn a conversion outcome into exactly one named deliverable.
//!
//! One payload passes through with a name derived from the input file. Two
//! or more payloads (a rendered page sequence) are packed into a single ZIP
//! archive with deterministic entry names, so repeated downloads of the same
//! conversion produce byte-identical listings:
//!
//! ```text
//! report.pdf ──▶ report_pages.zip
//!                ├─ report_page_1.jpg
//!                ├─ report_page_2.jpg
//!                └─ report_page_3.jpg
//! ```

use crate::config::CompressionLevel;
use crate::error::ConvertError;
use crate::format::{RasterFormat, PDF_MIME};
use crate::output::{Artifact, ConversionOutcome, Payload};
use bytes::Bytes;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Reduce an outcome to one deliverable artifact.
///
/// An empty outcome is an error: per the state machine, a strategy that
/// produces no artifact fails the file.
pub fn bundle(
    outcome: ConversionOutcome,
    original_name: &str,
    compression: CompressionLevel,
) -> Result<Artifact, ConvertError> {
    let base = base_name(original_name);
    match outcome {
        ConversionOutcome::Single(payload) => Ok(named(payload, &base)),
        ConversionOutcome::Sequence(mut seq) => match seq.len() {
            0 => Err(ConvertError::EmptyOutcome),
            1 => Ok(named(seq.remove(0), &base)),
            _ => archive(&seq, &base, compression),
        },
    }
}

/// Pack a payload sequence into `<base>_pages.zip`.
fn archive(
    seq: &[Payload],
    base: &str,
    compression: CompressionLevel,
) -> Result<Artifact, ConvertError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(compression.zip_level());

    for (i, payload) in seq.iter().enumerate() {
        let entry = format!("{base}_page_{}.{}", i + 1, extension_for(&payload.mime_type));
        writer.start_file(entry, options).map_err(zip_err)?;
        writer
            .write_all(&payload.bytes)
            .map_err(|e| ConvertError::BundleFailed {
                detail: e.to_string(),
            })?;
    }

    let cursor = writer.finish().map_err(zip_err)?;
    let bytes = cursor.into_inner();
    debug!(entries = seq.len(), bytes = bytes.len(), "sequence bundled");

    Ok(Artifact {
        file_name: format!("{base}_pages.zip"),
        mime_type: "application/zip".to_string(),
        bytes: Bytes::from(bytes),
    })
}

/// Name a pass-through payload after the input file.
fn named(payload: Payload, base: &str) -> Artifact {
    Artifact {
        file_name: format!("{base}.{}", extension_for(&payload.mime_type)),
        mime_type: payload.mime_type,
        bytes: payload.bytes,
    }
}

/// The input file's name without its final extension.
fn base_name(original_name: &str) -> String {
    Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("converted")
        .to_string()
}

fn extension_for(mime: &str) -> &'static str {
    if mime == PDF_MIME {
        "pdf"
    } else {
        RasterFormat::from_mime(mime)
            .map(RasterFormat::extension)
            .unwrap_or("bin")
    }
}

fn zip_err(e: zip::result::ZipError) -> ConvertError {
    ConvertError::BundleFailed {
        detail: e.to_string(),
    }
}
