//! Conversion output types: raw payloads, per-file outcomes, deliverables.
//!
//! Strategies produce *payloads* (bytes + MIME type, no name). The bundler
//! turns a [`ConversionOutcome`] into one named [`Artifact`] — passing a
//! single payload through or packing a sequence into an archive — so naming
//! policy lives in exactly one place.
//!
//! Payload bytes are [`bytes::Bytes`], so attaching the same artifact to
//! several files (the images-to-document direction) or snapshotting the
//! store clones a pointer, not megabytes of pixels.

use bytes::Bytes;

/// The raw product of one conversion step: a byte payload and its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub bytes: Bytes,
    pub mime_type: String,
}

impl Payload {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// What a strategy produced for one input file.
///
/// The distinction drives the bundling decision: a sequence of two or more
/// payloads becomes a single archive deliverable, anything else passes
/// through unbundled.
#[derive(Debug, Clone)]
pub enum ConversionOutcome {
    /// One payload — a converted image or an assembled document.
    Single(Payload),
    /// An ordered sequence of payloads, one per page.
    Sequence(Vec<Payload>),
}

impl ConversionOutcome {
    /// Number of payloads in this outcome.
    pub fn len(&self) -> usize {
        match self {
            ConversionOutcome::Single(_) => 1,
            ConversionOutcome::Sequence(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named, deliverable conversion result.
///
/// Attached to a `ManagedFile` when it completes; written to disk by
/// [`crate::deliver::Delivery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Suggested download file name, derived from the input file's name.
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl Artifact {
    /// Size of the payload in bytes.
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}
