//! The managed-file store: single source of truth for the conversion queue.
//!
//! Every file admitted to a session lives here as a [`ManagedFile`] with an
//! explicit status, and every mutation goes through a named method — there is
//! no ambient shared state. Observers (a UI layer, tests) read immutable
//! [`snapshot`](FileStore::snapshot)s; only the orchestrator and the
//! admit/remove/clear operations write.
//!
//! # State machine
//!
//! ```text
//! Pending --(orchestrator picks up)--> Processing
//! Processing --(strategy ok)--> Completed
//! Processing --(strategy err)--> Error
//! Completed | Error --(requeue)--> Pending
//! any state --(remove / clear)--> gone
//! ```
//!
//! # Soft cancellation
//!
//! Removing a file that is mid-`Processing` does not abort the in-flight
//! strategy call. Instead, [`complete`](FileStore::complete),
//! [`fail`](FileStore::fail) and [`set_progress`](FileStore::set_progress)
//! return whether the id was still present; the orchestrator discards the
//! result when it is not. Ids are assigned from a monotonic counter and never
//! reused, so a stale id from an in-flight task can never alias a file
//! admitted later.

use crate::output::Artifact;
use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Opaque identifier of a managed file, stable for the file's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId(u64);

impl FileId {
    /// Construct from a raw value. Intended for tests and log correlation.
    pub fn from_raw(raw: u64) -> Self {
        FileId(raw)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle status of a managed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Admitted, waiting for the next batch run.
    Pending,
    /// A strategy is converting this file right now.
    Processing,
    /// Conversion succeeded; `result` holds the deliverable.
    Completed,
    /// Conversion failed; `error_message` says why.
    Error,
}

/// One file in the conversion queue.
///
/// Invariants, maintained by the store's mutation methods:
/// * `result.is_some()` iff `status == Completed`
/// * `error_message.is_some()` iff `status == Error`
/// * `progress` never decreases while `Processing` and is reset to 0 on
///   every transition into `Pending`.
#[derive(Debug, Clone)]
pub struct ManagedFile {
    pub id: FileId,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Original input bytes; never mutated after admission.
    pub source: Bytes,
    pub status: FileStatus,
    /// 0–100 while `Processing`; 100 once `Completed`.
    pub progress: u8,
    pub result: Option<Artifact>,
    pub error_message: Option<String>,
}

#[derive(Default)]
struct Inner {
    files: Vec<ManagedFile>,
    next_id: u64,
}

impl Inner {
    fn find(&mut self, id: FileId) -> Option<&mut ManagedFile> {
        self.files.iter_mut().find(|f| f.id == id)
    }
}

/// Shared, thread-safe store of [`ManagedFile`]s, in submission order.
///
/// Cloning is cheap (an `Arc` bump); all clones observe the same queue. The
/// store is the only mutable state shared between the orchestrator and the
/// caller.
#[derive(Clone, Default)]
pub struct FileStore {
    inner: Arc<Mutex<Inner>>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a validated file to the queue in `Pending` state.
    ///
    /// When `mime_type` is absent or empty, it is guessed from the file name's
    /// extension; callers that already validated the candidate will always
    /// have a concrete type to pass.
    pub fn admit(&self, name: impl Into<String>, mime_type: Option<&str>, source: Bytes) -> FileId {
        let name = name.into();
        let mime_type = match mime_type {
            Some(m) if !m.trim().is_empty() => m.trim().to_ascii_lowercase(),
            _ => mime_guess::from_path(&name)
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string(),
        };

        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.next_id += 1;
        let id = FileId(inner.next_id);
        let size_bytes = source.len() as u64;
        inner.files.push(ManagedFile {
            id,
            name: name.clone(),
            mime_type,
            size_bytes,
            source,
            status: FileStatus::Pending,
            progress: 0,
            result: None,
            error_message: None,
        });
        debug!(%id, name = %name, size_bytes, "file admitted");
        id
    }

    /// Snapshot of the whole queue, in submission order.
    pub fn snapshot(&self) -> Vec<ManagedFile> {
        self.inner.lock().expect("store lock poisoned").files.clone()
    }

    /// Look up one file by id.
    pub fn get(&self, id: FileId) -> Option<ManagedFile> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .files
            .iter()
            .find(|f| f.id == id)
            .cloned()
    }

    /// Whether the id is still present.
    pub fn contains(&self, id: FileId) -> bool {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .files
            .iter()
            .any(|f| f.id == id)
    }

    /// All `Pending` files, in submission order.
    pub fn pending(&self) -> Vec<ManagedFile> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .files
            .iter()
            .filter(|f| f.status == FileStatus::Pending)
            .cloned()
            .collect()
    }

    /// All `Completed` files, in submission order.
    pub fn completed(&self) -> Vec<ManagedFile> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .files
            .iter()
            .filter(|f| f.status == FileStatus::Completed)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transition `Pending` → `Processing`, resetting progress.
    ///
    /// Returns false when the file is gone or not `Pending` — the guard that
    /// prevents double dispatch when two batch runs race on the same store.
    pub fn begin_processing(&self, id: FileId) -> bool {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        match inner.find(id) {
            Some(f) if f.status == FileStatus::Pending => {
                f.status = FileStatus::Processing;
                f.progress = 0;
                f.result = None;
                f.error_message = None;
                true
            }
            _ => false,
        }
    }

    /// Record a progress report for a `Processing` file.
    ///
    /// Clamped to 100; a report lower than the stored value is ignored, so
    /// observed progress is monotonically non-decreasing. Returns false when
    /// the id is no longer present (the file was removed mid-flight).
    pub fn set_progress(&self, id: FileId, percent: u8) -> bool {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        match inner.find(id) {
            Some(f) => {
                if f.status == FileStatus::Processing {
                    f.progress = f.progress.max(percent.min(100));
                }
                true
            }
            None => false,
        }
    }

    /// Transition `Processing` → `Completed`, attaching the deliverable.
    ///
    /// Returns false when the id is gone (result discarded) or the file is
    /// not `Processing`.
    pub fn complete(&self, id: FileId, artifact: Artifact) -> bool {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        match inner.find(id) {
            Some(f) if f.status == FileStatus::Processing => {
                f.status = FileStatus::Completed;
                f.progress = 100;
                f.result = Some(artifact);
                f.error_message = None;
                true
            }
            Some(_) => false,
            None => {
                debug!(%id, "conversion result discarded, file was removed");
                false
            }
        }
    }

    /// Transition `Processing` → `Error`, attaching the message.
    pub fn fail(&self, id: FileId, message: impl Into<String>) -> bool {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        match inner.find(id) {
            Some(f) if f.status == FileStatus::Processing => {
                f.status = FileStatus::Error;
                f.result = None;
                f.error_message = Some(message.into());
                true
            }
            Some(_) => false,
            None => {
                debug!(%id, "conversion failure discarded, file was removed");
                false
            }
        }
    }

    /// Re-queue a terminal file for another conversion pass.
    ///
    /// The file keeps its identity: same id, same source bytes. Progress is
    /// reset and any previous result or error is cleared. Only `Completed`
    /// and `Error` files can be re-queued.
    pub fn requeue(&self, id: FileId) -> bool {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        match inner.find(id) {
            Some(f) if matches!(f.status, FileStatus::Completed | FileStatus::Error) => {
                f.status = FileStatus::Pending;
                f.progress = 0;
                f.result = None;
                f.error_message = None;
                true
            }
            _ => false,
        }
    }

    /// Remove one file, in any state. Safe to call while it is `Processing`;
    /// the in-flight result will be discarded on arrival.
    pub fn remove(&self, id: FileId) -> bool {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let before = inner.files.len();
        inner.files.retain(|f| f.id != id);
        let removed = inner.files.len() != before;
        if removed {
            debug!(%id, "file removed");
        }
        removed
    }

    /// Remove every file. The id counter is not reset, so ids stay unique
    /// across the store's whole lifetime.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let n = inner.files.len();
        inner.files.clear();
        debug!(count = n, "store cleared");
    }
}
