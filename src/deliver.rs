//! Output delivery: materialise completed artifacts as downloadable files.
//!
//! A [`Delivery`] owns one destination directory and tracks every path it
//! has written, so a long session can hand out many downloads and then
//! [`release_all`](Delivery::release_all) them in one sweep instead of
//! accumulating transient files forever.
//!
//! Writes are atomic (temp file + rename): a crash mid-write leaves a
//! `.part` file behind, never a truncated artifact under the final name.

use crate::error::DeliveryError;
use crate::output::Artifact;
use crate::store::{FileId, FileStore, ManagedFile};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Materialises artifacts into a destination directory and releases them.
pub struct Delivery {
    dest: PathBuf,
    delivered: Mutex<Vec<PathBuf>>,
}

impl Delivery {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self {
            dest: dest.into(),
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.dest
    }

    /// Write one artifact under its suggested file name.
    ///
    /// Returns the final path; the path is recorded for
    /// [`release_all`](Delivery::release_all).
    pub async fn deliver(&self, artifact: &Artifact) -> Result<PathBuf, DeliveryError> {
        tokio::fs::create_dir_all(&self.dest)
            .await
            .map_err(|e| DeliveryError::WriteFailed {
                path: self.dest.clone(),
                source: e,
            })?;

        let path = self.dest.join(&artifact.file_name);
        let tmp = self.dest.join(format!("{}.part", artifact.file_name));

        tokio::fs::write(&tmp, &artifact.bytes)
            .await
            .map_err(|e| DeliveryError::WriteFailed {
                path: path.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| DeliveryError::WriteFailed {
                path: path.clone(),
                source: e,
            })?;

        debug!(path = %path.display(), bytes = artifact.size_bytes(), "artifact delivered");
        self.delivered
            .lock()
            .expect("delivery lock poisoned")
            .push(path.clone());
        Ok(path)
    }

    /// Deliver one managed file's result, failing with
    /// [`DeliveryError::NoResult`] when it has none.
    pub async fn deliver_file(&self, file: &ManagedFile) -> Result<PathBuf, DeliveryError> {
        match &file.result {
            Some(artifact) => self.deliver(artifact).await,
            None => Err(DeliveryError::NoResult),
        }
    }

    /// "Download all": deliver every `Completed` file independently.
    ///
    /// One failed write never blocks the rest; each file gets its own
    /// verdict in the returned list. File statuses are not touched.
    pub async fn deliver_completed(
        &self,
        store: &FileStore,
    ) -> Vec<(FileId, Result<PathBuf, DeliveryError>)> {
        let mut results = Vec::new();
        for file in store.completed() {
            let verdict = self.deliver_file(&file).await;
            if let Err(e) = &verdict {
                warn!(id = %file.id, name = %file.name, error = %e, "delivery failed");
            }
            results.push((file.id, verdict));
        }
        results
    }

    /// Remove every delivered file from disk. Already-gone files are fine.
    ///
    /// Returns how many paths were released.
    pub async fn release_all(&self) -> usize {
        let paths: Vec<PathBuf> = {
            let mut delivered = self.delivered.lock().expect("delivery lock poisoned");
            std::mem::take(&mut *delivered)
        };

        let count = paths.len();
        for path in paths {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not release artifact"),
            }
        }
        if count > 0 {
            info!(count, "delivered artifacts released");
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn artifact(name: &str, data: &'static [u8]) -> Artifact {
        Artifact {
            file_name: name.to_string(),
            mime_type: "image/png".to_string(),
            bytes: Bytes::from_static(data),
        }
    }

    #[tokio::test]
    async fn deliver_writes_the_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let delivery = Delivery::new(dir.path());
        let path = delivery
            .deliver(&artifact("out.png", b"pixels"))
            .await
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"pixels");
        assert_eq!(path.file_name().unwrap(), "out.png");
    }

    #[tokio::test]
    async fn release_all_removes_delivered_files() {
        let dir = tempfile::tempdir().unwrap();
        let delivery = Delivery::new(dir.path());
        let a = delivery.deliver(&artifact("a.png", b"a")).await.unwrap();
        let b = delivery.deliver(&artifact("b.png", b"b")).await.unwrap();

        assert_eq!(delivery.release_all().await, 2);
        assert!(!a.exists());
        assert!(!b.exists());

        // Releasing twice is a no-op.
        assert_eq!(delivery.release_all().await, 0);
    }

    #[tokio::test]
    async fn deliver_completed_skips_nothing_and_fails_nothing_else() {
        let dir = tempfile::tempdir().unwrap();
        let delivery = Delivery::new(dir.path());
        let store = FileStore::new();

        let done = store.admit("done.png", Some("image/png"), Bytes::from_static(b"src"));
        store.begin_processing(done);
        store.complete(done, artifact("done-converted.png", b"out"));

        let errored = store.admit("bad.png", Some("image/png"), Bytes::from_static(b"src"));
        store.begin_processing(errored);
        store.fail(errored, "decode failed");

        let results = delivery.deliver_completed(&store).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, done);
        assert!(results[0].1.is_ok());
    }

    #[tokio::test]
    async fn pending_file_has_no_result_to_deliver() {
        let dir = tempfile::tempdir().unwrap();
        let delivery = Delivery::new(dir.path());
        let store = FileStore::new();
        let id = store.admit("p.png", Some("image/png"), Bytes::new());
        let file = store.get(id).unwrap();
        let err = delivery.deliver_file(&file).await.unwrap_err();
        assert!(matches!(err, DeliveryError::NoResult));
    }
}
