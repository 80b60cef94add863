//! Error types for the formshift library.
//!
//! Four distinct error types reflect four distinct failure boundaries:
//!
//! * [`AdmissionError`] — the file never enters the queue. Returned by
//!   [`crate::validate`] before any bytes are touched.
//!
//! * [`ConvertError`] — a single file's conversion failed (bad decode,
//!   rasterisation glitch, encoder rejection). Caught per file by the
//!   orchestrator and stored as the file's `error_message`; sibling files
//!   in the same batch are unaffected.
//!
//! * [`DeliveryError`] — a completed artifact could not be written out.
//!   Reported to the caller at delivery time and never mutates file status.
//!
//! * [`BatchError`] — the whole batch is unrunnable (no strategy exists for
//!   the requested direction). Returned before any file is touched.
//!
//! The separation keeps the propagation policy honest: a `ConvertError` can
//! never escape one file's boundary and abort the batch, because the batch
//! path only ever sees it as a stored message.

use std::path::PathBuf;
use thiserror::Error;

/// A file was rejected at validation time and never entered the store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdmissionError {
    /// The file's MIME type is not accepted by the current conversion mode.
    #[error("'{name}' has unsupported type '{mime_type}' for {mode}")]
    UnsupportedType {
        name: String,
        mime_type: String,
        mode: crate::format::ConversionMode,
    },

    /// The file exceeds the size ceiling for its kind.
    #[error("'{name}' is too large: {size_bytes} bytes (limit {limit_bytes} bytes)")]
    TooLarge {
        name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },

    /// The batch already holds the maximum number of files.
    #[error("batch limit exceeded: {count} files submitted, limit is {limit}")]
    BatchLimitExceeded { count: usize, limit: usize },
}

/// A single file's conversion failed.
///
/// Stored as the file's `error_message`; the batch continues.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The source bytes could not be decoded as an image.
    #[error("failed to decode image: {detail}")]
    DecodeFailed { detail: String },

    /// No pdfium library could be bound.
    #[error("failed to bind to pdfium library: {0}\nSet PDFIUM_LIB_PATH or install libpdfium on the library search path.")]
    PdfiumBinding(String),

    /// The source bytes are not a readable PDF.
    #[error("failed to open document: {detail}")]
    DocumentOpenFailed { detail: String },

    /// Rasterisation failed for a specific page.
    #[error("rasterisation failed for page {page}: {detail}")]
    PageRenderFailed { page: usize, detail: String },

    /// Re-encoding to the target raster format failed.
    #[error("failed to encode as {format}: {detail}")]
    EncodeFailed { format: String, detail: String },

    /// Assembling the output PDF failed.
    #[error("failed to build document: {detail}")]
    DocumentBuildFailed { detail: String },

    /// The strategy produced no artifact at all (e.g. a zero-page document).
    #[error("conversion produced no output")]
    EmptyOutcome,

    /// Packing multiple artifacts into an archive failed.
    #[error("failed to bundle artifacts: {detail}")]
    BundleFailed { detail: String },

    /// A blocking conversion task panicked.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A completed artifact could not be materialised for download.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Could not create the destination directory or write the artifact.
    #[error("failed to write '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file has no result attached (not `Completed`).
    #[error("file has no completed result to deliver")]
    NoResult,
}

/// The batch as a whole could not run.
#[derive(Debug, Error)]
pub enum BatchError {
    /// No strategy exists for the requested (source, target) pair.
    #[error("no conversion available from {from_format} to {target}")]
    UnsupportedConversion { from_format: String, target: String },

    /// Settings validation failed.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}
