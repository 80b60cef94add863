//! Admission checks: size and type constraints, applied before a file can
//! enter the queue.
//!
//! Validation is a pure function of the candidate's metadata — no bytes are
//! read, no state is touched. Each candidate in a batch is judged
//! independently, so one oversized download never blocks the valid files
//! submitted alongside it.
//!
//! The ceilings differ per kind: documents are routinely tens of megabytes
//! (scanned PDFs), while a raster image past 25 MB almost always indicates
//! the wrong file was picked — and decoding it would allocate a
//! full-resolution pixel buffer several times that size.

use crate::error::AdmissionError;
use crate::format::{ConversionMode, RasterFormat, SourceKind, PDF_MIME};
use tracing::debug;

/// Size ceiling for raster image input.
pub const MAX_RASTER_BYTES: u64 = 25 * 1024 * 1024;

/// Size ceiling for document input.
pub const MAX_DOCUMENT_BYTES: u64 = 100 * 1024 * 1024;

/// Maximum number of files accepted in one submission.
pub const MAX_BATCH_FILES: usize = 50;

/// A file offered for admission: metadata only, no content.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub size_bytes: u64,
    /// Declared MIME type, if the host environment supplied one.
    pub mime_type: Option<String>,
}

impl Candidate {
    pub fn new(name: impl Into<String>, size_bytes: u64, mime_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            mime_type: mime_type.map(|m| m.to_string()),
        }
    }

    /// The declared MIME type, falling back to a guess from the file name.
    ///
    /// Browsers leave the type empty for files with unregistered extensions,
    /// so the extension is the only signal left.
    pub fn effective_mime(&self) -> String {
        match self.mime_type.as_deref() {
            Some(m) if !m.trim().is_empty() => m.trim().to_ascii_lowercase(),
            _ => mime_guess::from_path(&self.name)
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string(),
        }
    }
}

/// Check one candidate against the mode's type and size constraints.
///
/// Pure check: no side effects, and one rejection carries the specific
/// reason rather than a generic failure.
pub fn validate(candidate: &Candidate, mode: ConversionMode) -> Result<(), AdmissionError> {
    let mime = candidate.effective_mime();

    let accepted = match mode.source_kind() {
        SourceKind::Raster => RasterFormat::from_mime(&mime).is_some(),
        SourceKind::Document => mime == PDF_MIME,
    };
    if !accepted {
        debug!(name = %candidate.name, %mime, %mode, "rejected: unsupported type");
        return Err(AdmissionError::UnsupportedType {
            name: candidate.name.clone(),
            mime_type: mime,
            mode,
        });
    }

    let limit_bytes = match mode.source_kind() {
        SourceKind::Raster => MAX_RASTER_BYTES,
        SourceKind::Document => MAX_DOCUMENT_BYTES,
    };
    if candidate.size_bytes > limit_bytes {
        debug!(name = %candidate.name, size = candidate.size_bytes, limit = limit_bytes, "rejected: too large");
        return Err(AdmissionError::TooLarge {
            name: candidate.name.clone(),
            size_bytes: candidate.size_bytes,
            limit_bytes,
        });
    }

    Ok(())
}

/// Validate a whole submission, one verdict per candidate, order preserved.
///
/// Candidates past the batch cap are rejected with
/// [`AdmissionError::BatchLimitExceeded`]; the first [`MAX_BATCH_FILES`]
/// are still judged on their own merits, so a too-long submission degrades
/// instead of failing wholesale.
pub fn validate_batch(
    candidates: &[Candidate],
    mode: ConversionMode,
) -> Vec<Result<(), AdmissionError>> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i >= MAX_BATCH_FILES {
                Err(AdmissionError::BatchLimitExceeded {
                    count: candidates.len(),
                    limit: MAX_BATCH_FILES,
                })
            } else {
                validate(c, mode)
            }
        })
        .collect()
}
