//! End-to-end pipeline tests with a scripted recognizer: rendered page
//! images go in, an SVG and report come out, no model runtime required.

use futures::future::BoxFuture;
use pdfocr::pipeline::enhance::EnhanceStrategy;
use pdfocr::process;
use pdfocr::{
    DisplayMode, ModelCatalog, OcrEngine, OcrFailure, PageImage, ProcessConfig, Recognizer,
    ReportStatus,
};
use std::io::Write;
use std::time::{Duration, Instant};

/// Answers each page with positioned JSON; pages listed in `fail_pages`
/// always fail with a process error.
struct FakeModel {
    fail_pages: Vec<usize>,
}

impl Recognizer for FakeModel {
    fn recognize<'a>(
        &'a self,
        _model: &'a str,
        _prompt: &'a str,
        image: &'a [u8],
        _timeout: Duration,
    ) -> BoxFuture<'a, Result<String, OcrFailure>> {
        // Image files are seeded with their page index, see make_pages().
        let index: usize = String::from_utf8_lossy(image).trim().parse().unwrap();
        Box::pin(async move {
            if self.fail_pages.contains(&index) {
                return Err(OcrFailure::ProcessTimeout { secs: 1 });
            }
            Ok(format!(
                concat!(
                    "Here is the result:\n",
                    "{{\"text\":\"content of page {i}\",\"confidence\":0.9,\"language\":\"en\",",
                    "\"blocks\":[{{\"text\":\"content of page {i}\",\"bbox\":[40,50,700,30],",
                    "\"confidence\":0.9}}]}}"
                ),
                i = index
            ))
        })
    }
}

fn make_pages(dir: &tempfile::TempDir, n: usize) -> Vec<PageImage> {
    (0..n)
        .map(|i| {
            let path = dir.path().join(format!("page-{i:04}.png"));
            let mut f = std::fs::File::create(&path).unwrap();
            write!(f, "{i}").unwrap();
            PageImage {
                index: i,
                path,
                width: 800,
                height: 600,
                enhancement: EnhanceStrategy::Original,
            }
        })
        .collect()
}

fn fast_config() -> ProcessConfig {
    let mut config = ProcessConfig::default();
    config.workers = 2;
    config.retry.max_retries = 1;
    config.retry.initial_delay = Duration::from_millis(1);
    config.retry.max_delay = Duration::from_millis(2);
    config
}

fn engine(fail_pages: Vec<usize>, config: &ProcessConfig) -> OcrEngine<FakeModel> {
    let catalog = ModelCatalog::from_models(["llava:7b"]);
    OcrEngine::new(FakeModel { fail_pages }, &catalog, config).unwrap()
}

#[tokio::test]
async fn full_pipeline_produces_svg_and_report() {
    let page_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let pages = make_pages(&page_dir, 3);
    let config = fast_config();
    let eng = engine(vec![], &config);

    let output = process::process_pages(
        &eng,
        &pages,
        "doc.pdf",
        "doc",
        out_dir.path(),
        &config,
        Instant::now(),
    )
    .await
    .unwrap();

    assert!(output.svg_path.exists());
    assert_eq!(output.svg_path.file_name().unwrap(), "doc.svg");
    assert_eq!(output.results.len(), 3);
    assert_eq!(output.report.status, ReportStatus::Completed);
    assert_eq!(output.report.pages_processed, 3);
    assert_eq!(output.report.total_pages, 3);
    assert!((output.report.average_confidence - 0.9).abs() < 1e-9);
    assert_eq!(output.report.artifacts, vec![output.svg_path.clone()]);

    let svg = std::fs::read_to_string(&output.svg_path).unwrap();
    assert!(svg.starts_with("<svg "));
    assert!(svg.contains("data-display-mode=\"scroll\""));
    for i in 0..3 {
        assert!(svg.contains(&format!("content of page {i}")), "page {i} text missing");
    }
    // Visible run + search duplicate per block.
    assert!(svg.contains("class=\"search-layer\""));
    // Three pages in scroll mode get navigation.
    assert!(svg.contains("showPage"));
}

#[tokio::test]
async fn exhausted_page_is_reported_but_does_not_fail_the_run() {
    let page_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let pages = make_pages(&page_dir, 3);
    let config = fast_config();
    let eng = engine(vec![1], &config);

    let output = process::process_pages(
        &eng,
        &pages,
        "doc.pdf",
        "doc",
        out_dir.path(),
        &config,
        Instant::now(),
    )
    .await
    .unwrap();

    assert_eq!(output.report.status, ReportStatus::Completed);
    assert_eq!(output.report.pages_processed, 2);
    assert_eq!(output.report.total_pages, 3);
    assert_eq!(output.report.errors.len(), 1);
    assert!(output.report.errors[0].starts_with("page 2:"));
    assert!(!output.results[1].is_success());

    // The failed page still occupies its canvas slot; its neighbours keep
    // their text.
    let svg = std::fs::read_to_string(&output.svg_path).unwrap();
    assert!(svg.contains("content of page 0"));
    assert!(svg.contains("content of page 2"));
    assert!(svg.contains("id=\"page-2\""));
}

#[tokio::test]
async fn grid_mode_composes_all_pages_visible() {
    let page_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let pages = make_pages(&page_dir, 4);
    let mut config = fast_config();
    config.display_mode = DisplayMode::Grid;
    config.grid_columns = 2;
    let eng = engine(vec![], &config);

    let output = process::process_pages(
        &eng,
        &pages,
        "doc.pdf",
        "doc",
        out_dir.path(),
        &config,
        Instant::now(),
    )
    .await
    .unwrap();

    let svg = std::fs::read_to_string(&output.svg_path).unwrap();
    assert!(svg.contains("data-display-mode=\"grid\""));
    assert!(!svg.contains("showPage"), "grid mode has no page navigation");
    assert!(!svg.contains("display:none"), "all grid pages start visible");
    // 2 columns × (800 + 20) spacing.
    assert!(svg.contains("width=\"1640\""));
}

#[tokio::test]
async fn report_written_to_disk_roundtrips() {
    let page_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let pages = make_pages(&page_dir, 2);
    let config = fast_config();
    let eng = engine(vec![0], &config);

    let output = process::process_pages(
        &eng,
        &pages,
        "doc.pdf",
        "doc",
        out_dir.path(),
        &config,
        Instant::now(),
    )
    .await
    .unwrap();

    let path = process::report_path(out_dir.path(), "doc");
    process::write_report(&path, &output.report).unwrap();

    let parsed: pdfocr::FileReport =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(parsed.pages_processed, 1);
    assert_eq!(parsed.total_pages, 2);
    assert_eq!(parsed.status, ReportStatus::Completed);
    assert_eq!(parsed.pages.len(), 2);
    assert!(parsed.pages[0].error.is_some());
    assert!(parsed.pages[1].error.is_none());
}
