//! # formshift
//!
//! A batch file-format conversion engine: raster images and PDF documents
//! in, converted artifacts out, entirely in-process.
//!
//! ## Why this crate?
//!
//! Most conversion tooling is built as a one-shot function call: bytes in,
//! bytes out, and good luck showing a queue of twelve files to a user. This
//! crate keeps the conversion *session* as a first-class object — an
//! observable store of files with an explicit per-file state machine — so a
//! host application can admit files, run a batch, watch per-file progress,
//! retry failures, and download results individually or as one archive,
//! without inventing that plumbing itself.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Validate  size/type checks per conversion mode
//!  ├─ 2. Admit     enter the store as Pending
//!  ├─ 3. Convert   one strategy per batch (raster↔raster, pdf→images, images→pdf)
//!  ├─ 4. Bundle    N page artifacts → one zip, single artifacts pass through
//!  ├─ 5. Attach    store transitions to Completed / Error per file
//!  └─ 6. Deliver   atomic writes into a destination directory, releasable
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formshift::{
//!     run_batch, validate, Candidate, ConversionMode, ConversionSettings, Delivery,
//!     FileStore, OutputFormat, RasterFormat,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FileStore::new();
//!
//!     // Validate, then admit.
//!     let bytes = std::fs::read("photo.png")?;
//!     let candidate = Candidate::new("photo.png", bytes.len() as u64, Some("image/png"));
//!     validate(&candidate, ConversionMode::RasterToRaster)?;
//!     store.admit("photo.png", Some("image/png"), bytes.into());
//!
//!     // Convert the whole queue to JPEG at 85% quality.
//!     let settings = ConversionSettings::builder()
//!         .target(OutputFormat::Raster(RasterFormat::Jpeg))
//!         .quality(0.85)
//!         .build()?;
//!     let summary = run_batch(&store, &settings).await?;
//!     eprintln!("{} converted, {} failed", summary.converted, summary.failed);
//!
//!     // Download everything that completed.
//!     let delivery = Delivery::new("downloads");
//!     delivery.deliver_completed(&store).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Contracts worth knowing
//!
//! * One batch runs at a time against a given store; files are processed
//!   sequentially in submission order, pages in page order.
//! * Per-file errors never abort the batch — a failed file shows an error
//!   message, its siblings convert normally.
//! * Removing a file mid-conversion is soft cancellation: the in-flight
//!   work finishes and its result is discarded.
//! * Rendering PDFs requires a pdfium shared library at runtime (see
//!   `PDFIUM_LIB_PATH`); everything else is pure Rust.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bundle;
pub mod config;
pub mod convert;
pub mod deliver;
pub mod error;
pub mod format;
pub mod output;
pub mod progress;
pub mod store;
pub mod strategy;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use bundle::bundle;
pub use config::{
    CompressionLevel, ConversionSettings, ConversionSettingsBuilder, Orientation, PageSize,
};
pub use convert::{run_batch, run_batch_with_progress, BatchSummary};
pub use deliver::Delivery;
pub use error::{AdmissionError, BatchError, ConvertError, DeliveryError};
pub use format::{ConversionMode, OutputFormat, RasterFormat, SourceKind};
pub use output::{Artifact, ConversionOutcome, Payload};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback, ProgressFn};
pub use store::{FileId, FileStatus, FileStore, ManagedFile};
pub use validate::{validate, validate_batch, Candidate, MAX_BATCH_FILES, MAX_DOCUMENT_BYTES, MAX_RASTER_BYTES};
