//! End-to-end tests for the batch conversion engine.
//!
//! Everything here runs on pure-Rust codecs (`image`, `lopdf`, `zip`) except
//! the PDF-rendering tests, which need a pdfium shared library at runtime.
//! Those are gated behind the `PDFIUM_TESTS` environment variable so they do
//! not run in CI unless explicitly requested:
//!
//!   PDFIUM_TESTS=1 cargo test --test engine -- --nocapture

use bytes::Bytes;
use formshift::{
    run_batch, run_batch_with_progress, validate_batch, BatchProgressCallback, Candidate,
    ConversionMode, ConversionSettings, Delivery, FileId, FileStatus, FileStore, Orientation,
    OutputFormat, PageSize, RasterFormat,
};
use image::{DynamicImage, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn png_bytes(w: u32, h: u32, pixel: [u8; 4]) -> Bytes {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(pixel)));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("png encode");
    Bytes::from(buf)
}

fn jpeg_settings() -> ConversionSettings {
    ConversionSettings::builder()
        .target(OutputFormat::Raster(RasterFormat::Jpeg))
        .quality(0.85)
        .build()
        .expect("settings")
}

fn document_settings() -> ConversionSettings {
    ConversionSettings::builder()
        .target(OutputFormat::Document)
        .page_size(PageSize::A4)
        .orientation(Orientation::Portrait)
        .build()
        .expect("settings")
}

/// Records every progress report per file, for monotonicity checks.
#[derive(Default)]
struct Recorder {
    reports: Mutex<HashMap<FileId, Vec<u8>>>,
}

impl BatchProgressCallback for Recorder {
    fn on_file_progress(&self, id: FileId, percent: u8) {
        self.reports
            .lock()
            .unwrap()
            .entry(id)
            .or_default()
            .push(percent);
    }
}

// ── Validation → admission flow ──────────────────────────────────────────────

#[test]
fn invalid_files_are_rejected_without_blocking_valid_ones() {
    let store = FileStore::new();
    let candidates = vec![
        Candidate::new("a.png", 100, Some("image/png")),
        Candidate::new("b.txt", 100, Some("text/plain")),
        Candidate::new("c.jpg", 100, Some("image/jpeg")),
    ];

    let verdicts = validate_batch(&candidates, ConversionMode::RasterToRaster);
    for (candidate, verdict) in candidates.iter().zip(&verdicts) {
        if verdict.is_ok() {
            store.admit(
                candidate.name.as_str(),
                candidate.mime_type.as_deref(),
                Bytes::new(),
            );
        }
    }

    assert_eq!(store.len(), 2);
    let names: Vec<String> = store.snapshot().iter().map(|f| f.name.clone()).collect();
    assert_eq!(names, vec!["a.png", "c.jpg"]);
}

// ── Raster batches ───────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_file_does_not_affect_its_siblings() {
    let store = FileStore::new();
    let a = store.admit("a.png", Some("image/png"), png_bytes(16, 16, [255, 0, 0, 255]));
    let b = store.admit("b.png", Some("image/png"), Bytes::from_static(b"corrupt bytes"));
    let c = store.admit("c.png", Some("image/png"), png_bytes(8, 8, [0, 255, 0, 255]));

    let summary = run_batch(&store, &jpeg_settings()).await.expect("batch runs");
    assert_eq!(summary.total, 3);
    assert_eq!(summary.converted, 2);
    assert_eq!(summary.failed, 1);

    let status = |id| store.get(id).unwrap().status;
    assert_eq!(status(a), FileStatus::Completed);
    assert_eq!(status(b), FileStatus::Error);
    assert_eq!(status(c), FileStatus::Completed);

    let failed = store.get(b).unwrap();
    assert!(failed.result.is_none());
    assert!(failed.error_message.unwrap().contains("decode"));

    // Siblings carry real JPEG artifacts named after themselves.
    let done = store.get(a).unwrap();
    let artifact = done.result.expect("artifact");
    assert_eq!(artifact.file_name, "a.jpg");
    assert_eq!(artifact.mime_type, "image/jpeg");
    image::load_from_memory(&artifact.bytes).expect("output decodes");
}

#[tokio::test]
async fn progress_is_monotonic_and_ends_at_hundred() {
    let store = FileStore::new();
    let a = store.admit("a.png", Some("image/png"), png_bytes(16, 16, [1, 2, 3, 255]));
    let b = store.admit("b.png", Some("image/png"), png_bytes(16, 16, [4, 5, 6, 255]));

    let recorder = Arc::new(Recorder::default());
    run_batch_with_progress(&store, &jpeg_settings(), recorder.clone())
        .await
        .expect("batch runs");

    let reports = recorder.reports.lock().unwrap();
    for id in [a, b] {
        let series = reports.get(&id).expect("file reported progress");
        assert!(
            series.windows(2).all(|w| w[0] <= w[1]),
            "{id} reported non-monotonic progress: {series:?}"
        );
        assert_eq!(series.last(), Some(&100), "{id} did not finish at 100");
        assert_eq!(store.get(id).unwrap().progress, 100);
    }
}

#[tokio::test]
async fn rerun_only_touches_pending_files() {
    let store = FileStore::new();
    let first = store.admit("first.png", Some("image/png"), png_bytes(8, 8, [9, 9, 9, 255]));

    run_batch(&store, &jpeg_settings()).await.expect("first run");
    let artifact_before = store.get(first).unwrap().result.expect("artifact");

    let second = store.admit("second.png", Some("image/png"), png_bytes(8, 8, [7, 7, 7, 255]));
    let summary = run_batch(&store, &jpeg_settings()).await.expect("second run");

    // Only the new file was eligible.
    assert_eq!(summary.total, 1);
    assert_eq!(store.get(second).unwrap().status, FileStatus::Completed);

    // The first file's result is bitwise untouched.
    let artifact_after = store.get(first).unwrap().result.expect("artifact");
    assert_eq!(artifact_before, artifact_after);
}

#[tokio::test]
async fn requeued_file_converts_again() {
    let store = FileStore::new();
    let id = store.admit("photo.png", Some("image/png"), png_bytes(8, 8, [1, 1, 1, 255]));

    run_batch(&store, &jpeg_settings()).await.expect("first run");
    assert_eq!(store.get(id).unwrap().status, FileStatus::Completed);

    assert!(store.requeue(id));
    assert_eq!(store.get(id).unwrap().progress, 0);

    // Same identity, new pass — this time to PNG.
    let settings = ConversionSettings::builder()
        .target(OutputFormat::Raster(RasterFormat::Png))
        .build()
        .unwrap();
    run_batch(&store, &settings).await.expect("second run");

    let file = store.get(id).unwrap();
    assert_eq!(file.id, id);
    assert_eq!(file.status, FileStatus::Completed);
    assert_eq!(file.result.unwrap().mime_type, "image/png");
}

#[tokio::test]
async fn mixed_batch_fails_only_the_odd_one_out() {
    let store = FileStore::new();
    let img = store.admit("a.png", Some("image/png"), png_bytes(8, 8, [1, 2, 3, 255]));
    let doc = store.admit("b.pdf", Some("application/pdf"), Bytes::from_static(b"%PDF"));

    let summary = run_batch(&store, &jpeg_settings()).await.expect("batch runs");
    assert_eq!(summary.converted, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(store.get(img).unwrap().status, FileStatus::Completed);
    assert_eq!(store.get(doc).unwrap().status, FileStatus::Error);
}

// ── Images → document ────────────────────────────────────────────────────────

#[tokio::test]
async fn two_images_become_one_two_page_document() {
    let store = FileStore::new();
    // Differing aspect ratios, per the fitting contract.
    let wide = store.admit("wide.png", Some("image/png"), png_bytes(200, 50, [1, 2, 3, 255]));
    let tall = store.admit("tall.png", Some("image/png"), png_bytes(40, 300, [4, 5, 6, 255]));

    let summary = run_batch(&store, &document_settings()).await.expect("batch runs");
    assert_eq!(summary.converted, 2);
    assert_eq!(summary.failed, 0);

    let a = store.get(wide).unwrap().result.expect("artifact");
    let b = store.get(tall).unwrap().result.expect("artifact");

    // One shared document, named after each input.
    assert_eq!(a.file_name, "wide.pdf");
    assert_eq!(b.file_name, "tall.pdf");
    assert_eq!(a.bytes.as_ptr(), b.bytes.as_ptr(), "artifact bytes must be shared");

    let doc = lopdf::Document::load_mem(&a.bytes).expect("parseable PDF");
    assert_eq!(doc.get_pages().len(), 2);
}

#[tokio::test]
async fn bad_image_is_left_out_of_the_document() {
    let store = FileStore::new();
    let good1 = store.admit("one.png", Some("image/png"), png_bytes(8, 8, [1, 1, 1, 255]));
    let bad = store.admit("two.png", Some("image/png"), Bytes::from_static(b"nope"));
    let good2 = store.admit("three.png", Some("image/png"), png_bytes(8, 8, [2, 2, 2, 255]));

    let summary = run_batch(&store, &document_settings()).await.expect("batch runs");
    assert_eq!(summary.converted, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(store.get(bad).unwrap().status, FileStatus::Error);

    let artifact = store.get(good1).unwrap().result.expect("artifact");
    let doc = lopdf::Document::load_mem(&artifact.bytes).expect("parseable PDF");
    assert_eq!(doc.get_pages().len(), 2);
    assert_eq!(store.get(good2).unwrap().status, FileStatus::Completed);
}

// ── Delivery ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn completed_results_are_delivered_and_released() {
    let store = FileStore::new();
    store.admit("a.png", Some("image/png"), png_bytes(8, 8, [1, 2, 3, 255]));
    store.admit("broken.png", Some("image/png"), Bytes::from_static(b"x"));
    store.admit("b.png", Some("image/png"), png_bytes(8, 8, [3, 2, 1, 255]));

    run_batch(&store, &jpeg_settings()).await.expect("batch runs");

    let dir = tempfile::tempdir().unwrap();
    let delivery = Delivery::new(dir.path());
    let results = delivery.deliver_completed(&store).await;

    // Only the two completed files, each delivered independently.
    assert_eq!(results.len(), 2);
    for (_, verdict) in &results {
        let path = verdict.as_ref().expect("delivered");
        assert!(path.exists());
    }

    assert_eq!(delivery.release_all().await, 2);
    for (_, verdict) in &results {
        assert!(!verdict.as_ref().unwrap().exists());
    }
}

// ── PDF rendering (requires a pdfium shared library) ─────────────────────────

/// Skip the test unless PDFIUM_TESTS is set.
macro_rules! skip_unless_pdfium {
    () => {
        if std::env::var("PDFIUM_TESTS").is_err() {
            println!("SKIP — set PDFIUM_TESTS=1 (and make libpdfium loadable) to run");
            return;
        }
    };
}

/// Build a 3-page PDF fixture from three images, entirely in Rust.
async fn three_page_pdf() -> Bytes {
    let store = FileStore::new();
    store.admit("p1.png", Some("image/png"), png_bytes(64, 64, [255, 0, 0, 255]));
    store.admit("p2.png", Some("image/png"), png_bytes(64, 64, [0, 255, 0, 255]));
    store.admit("p3.png", Some("image/png"), png_bytes(64, 64, [0, 0, 255, 255]));
    run_batch(&store, &document_settings()).await.expect("fixture build");
    store.completed()[0].result.clone().expect("fixture artifact").bytes
}

#[tokio::test]
async fn three_page_document_becomes_a_named_archive() {
    skip_unless_pdfium!();

    let pdf = three_page_pdf().await;
    let store = FileStore::new();
    let id = store.admit("report.pdf", Some("application/pdf"), pdf);

    let settings = ConversionSettings::builder()
        .target(OutputFormat::Raster(RasterFormat::Jpeg))
        .dpi(150)
        .build()
        .unwrap();
    let summary = run_batch(&store, &settings).await.expect("batch runs");
    assert_eq!(summary.converted, 1);

    let artifact = store.get(id).unwrap().result.expect("artifact");
    assert_eq!(artifact.file_name, "report_pages.zip");
    assert_eq!(artifact.mime_type, "application/zip");

    let mut zip = zip::ZipArchive::new(Cursor::new(artifact.bytes.to_vec())).expect("zip");
    assert_eq!(zip.len(), 3);
    for (i, expected) in ["report_page_1.jpg", "report_page_2.jpg", "report_page_3.jpg"]
        .iter()
        .enumerate()
    {
        let mut entry = zip.by_index(i).expect("entry");
        assert_eq!(entry.name(), *expected);
        let mut data = Vec::new();
        std::io::Read::read_to_end(&mut entry, &mut data).expect("read entry");
        let page = image::load_from_memory(&data).expect("entry is a decodable JPEG");
        assert!(page.width() > 0 && page.height() > 0);
    }
}

#[tokio::test]
async fn page_count_survives_the_round_trip() {
    skip_unless_pdfium!();

    // images → document → images: 3 in, 3 out, back to 3 pages.
    let pdf = three_page_pdf().await;
    let store = FileStore::new();
    let id = store.admit("trip.pdf", Some("application/pdf"), pdf);

    let settings = ConversionSettings::builder()
        .target(OutputFormat::Raster(RasterFormat::Png))
        .build()
        .unwrap();
    run_batch(&store, &settings).await.expect("render");

    let artifact = store.get(id).unwrap().result.expect("artifact");
    let mut zip = zip::ZipArchive::new(Cursor::new(artifact.bytes.to_vec())).expect("zip");
    assert_eq!(zip.len(), 3);

    // And back: the three rendered pages assemble into a 3-page document.
    let back = FileStore::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).expect("entry");
        let mut data = Vec::new();
        std::io::Read::read_to_end(&mut entry, &mut data).expect("read entry");
        back.admit(format!("page{}.png", i + 1), Some("image/png"), Bytes::from(data));
    }
    run_batch(&back, &document_settings()).await.expect("assemble");

    let rebuilt = back.completed()[0].result.clone().expect("artifact");
    let doc = lopdf::Document::load_mem(&rebuilt.bytes).expect("parseable PDF");
    assert_eq!(doc.get_pages().len(), 3);
}
