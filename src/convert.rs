//! Batch orchestration: drive the store through the state machine.
//!
//! [`run_batch`] is the engine's main entry point. It picks exactly one
//! strategy for the whole batch, walks the `Pending` files in submission
//! order, and records every outcome back into the store — which stays the
//! single source of truth; the returned [`BatchSummary`] is only a log-line
//! convenience.
//!
//! ## Why one file at a time?
//!
//! Rasterisation works on full-resolution pixel surfaces; a ten-file batch
//! converted in parallel can hold ten of those at once, which is exactly how
//! memory-constrained devices fall over. Sequential processing bounds peak
//! memory to one file's working set and keeps progress reporting honest.
//! A small bounded worker pool would be a safe widening; unbounded
//! parallelism is out of contract.
//!
//! ## Failure containment
//!
//! Every per-file error is caught here, at the file boundary, and stored as
//! that file's `error_message`. Nothing a single file does can abort its
//! siblings; the only batch-level failure is asking for a direction that
//! does not exist.

use crate::bundle::bundle;
use crate::config::ConversionSettings;
use crate::error::BatchError;
use crate::format::{SourceKind, PDF_MIME};
use crate::output::{ConversionOutcome, Payload};
use crate::progress::{NoopProgressCallback, ProgressCallback, ProgressFn};
use crate::store::{FileId, FileStore, ManagedFile};
use crate::strategy::{raster_to_doc, Strategy};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Tallies for one batch run. The store holds the per-file detail.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Files that were `Pending` when the run started.
    pub total: usize,
    /// Files that reached `Completed`.
    pub converted: usize,
    /// Files that reached `Error`.
    pub failed: usize,
    pub duration: Duration,
}

/// Convert every `Pending` file in the store with the given settings.
///
/// Restartable by design: files already `Completed` or `Error` are left
/// untouched, so "add more files, convert again" just works. Returns
/// `Err` only when the batch as a whole cannot run; per-file failures are
/// recorded in the store and counted in the summary.
pub async fn run_batch(
    store: &FileStore,
    settings: &ConversionSettings,
) -> Result<BatchSummary, BatchError> {
    run_batch_with_progress(store, settings, Arc::new(NoopProgressCallback)).await
}

/// [`run_batch`] with a progress callback for host UIs.
pub async fn run_batch_with_progress(
    store: &FileStore,
    settings: &ConversionSettings,
    callback: ProgressCallback,
) -> Result<BatchSummary, BatchError> {
    let start = Instant::now();

    let pending = store.pending();
    if pending.is_empty() {
        debug!("no pending files, nothing to do");
        return Ok(BatchSummary::default());
    }

    // One strategy for the whole batch, from the declared (source, target)
    // pair. The first pending file declares the source kind; stragglers of
    // another kind fail individually below instead of poisoning the batch.
    let source_kind = SourceKind::from_mime(&pending[0].mime_type).ok_or_else(|| {
        BatchError::UnsupportedConversion {
            from_format: pending[0].mime_type.clone(),
            target: settings.target.to_string(),
        }
    })?;
    let strategy = Strategy::select(source_kind, settings.target).ok_or_else(|| {
        BatchError::UnsupportedConversion {
            from_format: source_kind.to_string(),
            target: settings.target.to_string(),
        }
    })?;

    if let Ok(json) = serde_json::to_string(settings) {
        debug!(settings = %json, "batch settings");
    }
    info!(files = pending.len(), strategy = ?strategy, "batch started");
    callback.on_batch_start(pending.len());

    let mut summary = match strategy {
        Strategy::RasterToDocument => {
            run_aggregate(store, settings, &callback, pending).await
        }
        _ => run_per_file(store, settings, &callback, pending, strategy, source_kind).await,
    };
    summary.duration = start.elapsed();

    info!(
        converted = summary.converted,
        failed = summary.failed,
        duration_ms = summary.duration.as_millis() as u64,
        "batch finished"
    );
    callback.on_batch_complete(summary.converted, summary.failed);
    Ok(summary)
}

/// Per-file directions: one strategy call per file, in submission order.
async fn run_per_file(
    store: &FileStore,
    settings: &ConversionSettings,
    callback: &ProgressCallback,
    pending: Vec<ManagedFile>,
    strategy: Strategy,
    batch_kind: SourceKind,
) -> BatchSummary {
    let total = pending.len();
    let mut converted = 0;
    let mut failed = 0;

    for file in pending {
        // Claim the file before the first await point; a false return means
        // it was removed or another run already claimed it.
        if !store.begin_processing(file.id) {
            debug!(id = %file.id, "skipped: no longer pending");
            continue;
        }
        callback.on_file_start(file.id, &file.name);

        if SourceKind::from_mime(&file.mime_type) != Some(batch_kind) {
            let msg = format!(
                "'{}' is not a {batch_kind}, which this batch converts",
                file.name
            );
            if store.fail(file.id, &msg) {
                failed += 1;
                callback.on_file_error(file.id, &msg);
            }
            continue;
        }

        let progress = progress_fn(store, file.id, callback);
        let result = match strategy.convert(file.source.clone(), settings, progress).await {
            Ok(outcome) => bundle(outcome, &file.name, settings.compression),
            Err(e) => Err(e),
        };

        match result {
            Ok(artifact) => {
                let size = artifact.size_bytes();
                if store.complete(file.id, artifact) {
                    converted += 1;
                    callback.on_file_complete(file.id, size);
                } else {
                    debug!(id = %file.id, "result discarded, file removed mid-conversion");
                }
            }
            Err(e) => {
                let msg = e.to_string();
                warn!(id = %file.id, name = %file.name, error = %msg, "file conversion failed");
                if store.fail(file.id, &msg) {
                    failed += 1;
                    callback.on_file_error(file.id, &msg);
                } else {
                    debug!(id = %file.id, "failure discarded, file removed mid-conversion");
                }
            }
        }
    }

    BatchSummary {
        total,
        converted,
        failed,
        duration: Duration::ZERO,
    }
}

/// The images-to-document direction: the whole batch becomes one document.
///
/// Every participating file receives the shared artifact as its result
/// (named after itself); images that fail to decode get their own per-file
/// error while the rest still make it into the document.
async fn run_aggregate(
    store: &FileStore,
    settings: &ConversionSettings,
    callback: &ProgressCallback,
    pending: Vec<ManagedFile>,
) -> BatchSummary {
    let total = pending.len();
    let mut converted = 0;
    let mut failed = 0;
    let mut members: Vec<ManagedFile> = Vec::new();

    for file in pending {
        if !store.begin_processing(file.id) {
            debug!(id = %file.id, "skipped: no longer pending");
            continue;
        }
        callback.on_file_start(file.id, &file.name);

        if SourceKind::from_mime(&file.mime_type) != Some(SourceKind::Raster) {
            let msg = format!("'{}' is not a raster image, which this batch converts", file.name);
            if store.fail(file.id, &msg) {
                failed += 1;
                callback.on_file_error(file.id, &msg);
            }
            continue;
        }
        members.push(file);
    }

    if members.is_empty() {
        return BatchSummary {
            total,
            converted,
            failed,
            duration: Duration::ZERO,
        };
    }

    let ids: Vec<FileId> = members.iter().map(|f| f.id).collect();
    let progress: ProgressFn = {
        let store = store.clone();
        let callback = Arc::clone(callback);
        let ids = ids.clone();
        Arc::new(move |pct| {
            for &id in &ids {
                if store.set_progress(id, pct) {
                    callback.on_file_progress(id, pct);
                }
            }
        })
    };

    let images: Vec<Bytes> = members.iter().map(|f| f.source.clone()).collect();
    match raster_to_doc::build_document(images, settings, progress).await {
        Ok(mut build) => {
            let shared = Bytes::from(std::mem::take(&mut build.bytes));
            for (index, file) in members.iter().enumerate() {
                if let Some(err) = build.failure_for(index) {
                    let msg = err.to_string();
                    warn!(id = %file.id, name = %file.name, error = %msg, "image excluded from document");
                    if store.fail(file.id, &msg) {
                        failed += 1;
                        callback.on_file_error(file.id, &msg);
                    }
                    continue;
                }

                let outcome =
                    ConversionOutcome::Single(Payload::new(shared.clone(), PDF_MIME));
                match bundle(outcome, &file.name, settings.compression) {
                    Ok(artifact) => {
                        let size = artifact.size_bytes();
                        if store.complete(file.id, artifact) {
                            converted += 1;
                            callback.on_file_complete(file.id, size);
                        } else {
                            debug!(id = %file.id, "result discarded, file removed mid-conversion");
                        }
                    }
                    Err(e) => {
                        let msg = e.to_string();
                        if store.fail(file.id, &msg) {
                            failed += 1;
                            callback.on_file_error(file.id, &msg);
                        }
                    }
                }
            }
        }
        Err(e) => {
            let msg = e.to_string();
            warn!(error = %msg, "document build failed for the whole batch");
            for file in &members {
                if store.fail(file.id, &msg) {
                    failed += 1;
                    callback.on_file_error(file.id, &msg);
                }
            }
        }
    }

    BatchSummary {
        total,
        converted,
        failed,
        duration: Duration::ZERO,
    }
}

/// Wire one file's strategy progress into the store and the batch callback.
///
/// Reports for a file that has been removed mid-conversion stop propagating
/// to the callback — the store is the relevance check.
fn progress_fn(store: &FileStore, id: FileId, callback: &ProgressCallback) -> ProgressFn {
    let store = store.clone();
    let callback = Arc::clone(callback);
    Arc::new(move |pct| {
        if store.set_progress(id, pct) {
            callback.on_file_progress(id, pct);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionSettings;
    use crate::format::OutputFormat;

    #[tokio::test]
    async fn empty_store_is_a_quiet_no_op() {
        let store = FileStore::new();
        let summary = run_batch(&store, &ConversionSettings::default())
            .await
            .expect("empty batch");
        assert_eq!(summary.total, 0);
        assert_eq!(summary.converted, 0);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn document_to_document_is_rejected_up_front() {
        let store = FileStore::new();
        store.admit(
            "scan.pdf",
            Some("application/pdf"),
            Bytes::from_static(b"%PDF-1.5"),
        );
        let settings = ConversionSettings::builder()
            .target(OutputFormat::Document)
            .build()
            .unwrap();
        let err = run_batch(&store, &settings).await.expect_err("no direction");
        assert!(matches!(err, BatchError::UnsupportedConversion { .. }));
        // The file was never touched.
        let f = &store.snapshot()[0];
        assert_eq!(f.status, crate::store::FileStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_mime_is_rejected_up_front() {
        let store = FileStore::new();
        store.admit("data.bin", Some("application/octet-stream"), Bytes::new());
        let err = run_batch(&store, &ConversionSettings::default())
            .await
            .expect_err("unknown source kind");
        assert!(matches!(err, BatchError::UnsupportedConversion { .. }));
    }
}
