//! End-to-end snapshot lifecycle through real PNG bytes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use probar_snapshot::{
    CompareOptions, ComparisonAlgorithm, ComparisonConfig, ComparisonEngine, ImageCodec,
    OutcomeKind, PixelBuffer, PngCodec, SnapshotName, SnapshotUpdateMode, ThresholdType,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

/// A page mock: flat background with a filled rectangle
fn page(background: [u8; 4], block: [u8; 4]) -> Vec<u8> {
    let mut img = PixelBuffer::filled(48, 32, background);
    for y in 8..24 {
        for x in 12..36 {
            img.put_pixel(x, y, block);
        }
    }
    PngCodec.encode(&img).unwrap()
}

fn green_page() -> Vec<u8> {
    page([255, 255, 255, 255], [0, 160, 0, 255])
}

fn red_page() -> Vec<u8> {
    page([255, 255, 255, 255], [120, 0, 0, 255])
}

fn setup() -> (TempDir, ComparisonEngine) {
    let dir = TempDir::new().unwrap();
    let engine = ComparisonEngine::new(dir.path().join("__snapshots__"), dir.path().join("results"));
    (dir, engine)
}

fn options(algorithm: ComparisonAlgorithm) -> CompareOptions {
    CompareOptions::new(ComparisonConfig::new().with_algorithm(algorithm))
}

#[test]
fn first_run_writes_baseline_then_matches() {
    for algorithm in [ComparisonAlgorithm::PixelDiff, ComparisonAlgorithm::StructuralSimilarity] {
        let (_dir, engine) = setup();
        let name = SnapshotName::new(["pages", "green-page.png"]);

        let first = engine.compare(&green_page(), &name, &options(algorithm)).unwrap();
        assert_eq!(first.kind, OutcomeKind::BaselineWritten);
        assert!(first.passed);
        assert!(engine.store().exists(&name));

        let second = engine.compare(&green_page(), &name, &options(algorithm)).unwrap();
        assert_eq!(second.kind, OutcomeKind::Matched);
        assert_eq!(second.diff_pixel_count, 0);
        assert!(second.message.starts_with("Comparison passed with diff ratio 0"));
    }
}

#[test]
fn red_page_does_not_match_green_baseline() {
    for algorithm in [ComparisonAlgorithm::PixelDiff, ComparisonAlgorithm::StructuralSimilarity] {
        let (_dir, engine) = setup();
        let name = SnapshotName::from("green-page.png");
        engine.store().write_bytes(&name, &green_page()).unwrap();

        let outcome = engine.compare(&red_page(), &name, &options(algorithm)).unwrap();
        assert!(!outcome.passed, "{algorithm} should detect the change");
        assert_eq!(outcome.kind, OutcomeKind::Mismatched);
        assert!(outcome.diff_ratio > 0.02);

        let attachments = outcome.attachments();
        assert_eq!(attachments.len(), 3);
        for attachment in &attachments {
            assert!(attachment.path.exists(), "{}", attachment.path.display());
            assert_eq!(attachment.content_type, "image/png");
        }
        assert!(outcome.message.contains("Snapshot comparison failed:"));
        assert!(outcome.message.contains("-diff.png"));
    }
}

#[test]
fn negated_assertion_confirms_mismatch_without_artifacts() {
    for algorithm in [ComparisonAlgorithm::PixelDiff, ComparisonAlgorithm::StructuralSimilarity] {
        let (dir, engine) = setup();
        let name = SnapshotName::from("green-page.png");
        engine.store().write_bytes(&name, &green_page()).unwrap();

        let outcome = engine
            .compare(&red_page(), &name, &options(algorithm).with_negated(true))
            .unwrap();
        assert!(outcome.passed);
        assert_eq!(outcome.kind, OutcomeKind::MismatchExpected);
        assert!(outcome.attachments().is_empty());
        assert!(!dir.path().join("results").exists());
    }
}

#[test]
fn absolute_count_threshold_tolerates_small_changes() {
    let (_dir, engine) = setup();
    let name = SnapshotName::from("dot.png");
    let baseline = PixelBuffer::filled(10, 10, [255, 255, 255, 255]);
    engine.store().write_bytes(&name, &PngCodec.encode(&baseline).unwrap()).unwrap();

    let mut captured = baseline;
    captured.put_pixel(5, 5, [0, 0, 0, 255]);
    let bytes = PngCodec.encode(&captured).unwrap();

    let lenient = CompareOptions::new(
        ComparisonConfig::new()
            .with_algorithm(ComparisonAlgorithm::PixelDiff)
            .with_failure_threshold(1.0, ThresholdType::AbsoluteCount),
    );
    let outcome = engine.compare(&bytes, &name, &lenient).unwrap();
    assert!(outcome.passed);
    assert_eq!(outcome.diff_pixel_count, 1);
    assert!((outcome.diff_ratio - 0.01).abs() < 1e-12);

    let strict = CompareOptions::new(
        ComparisonConfig::new()
            .with_algorithm(ComparisonAlgorithm::PixelDiff)
            .with_failure_threshold(0.0, ThresholdType::AbsoluteCount),
    );
    assert!(!engine.compare(&bytes, &name, &strict).unwrap().passed);
}

#[test]
fn update_all_replaces_baseline() {
    let (_dir, engine) = setup();
    let name = SnapshotName::from("green-page.png");
    engine.store().write_bytes(&name, &green_page()).unwrap();

    let outcome = engine
        .compare(
            &red_page(),
            &name,
            &options(ComparisonAlgorithm::StructuralSimilarity)
                .with_update_mode(SnapshotUpdateMode::All),
        )
        .unwrap();
    assert!(outcome.passed);
    assert_eq!(outcome.kind, OutcomeKind::BaselineUpdated);
    assert_eq!(fs::read(engine.store().path(&name)).unwrap(), red_page());
}

#[test]
fn config_loaded_from_json_drives_the_engine() {
    let (dir, engine) = setup();
    let config_path = dir.path().join("snapshot.json");
    fs::write(
        &config_path,
        r#"{ "algorithm": "pixelmatch", "failure_threshold": 0, "failure_threshold_type": "pixel" }"#,
    )
    .unwrap();
    let config = ComparisonConfig::from_json_file(&config_path).unwrap();
    let name = SnapshotName::from("page.png");
    engine.store().write_bytes(&name, &green_page()).unwrap();

    let outcome = engine.compare(&red_page(), &name, &CompareOptions::new(config)).unwrap();
    assert!(!outcome.passed);
    assert_eq!(outcome.diff_pixel_count, 16 * 24);
}

#[test]
fn concurrent_calls_with_distinct_names() {
    let (_dir, engine) = setup();
    let engine = Arc::new(engine);
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                let name = SnapshotName::new(["worker".to_string(), format!("shot-{i}.png")]);
                let opts = options(ComparisonAlgorithm::PixelDiff);
                engine.compare(&green_page(), &name, &opts).unwrap();
                engine.compare(&green_page(), &name, &opts).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let outcome = handle.join().unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Matched);
    }
}
