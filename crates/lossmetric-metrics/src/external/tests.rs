//! Tests for the external metrics collector.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::*;
use lossmetric_core::{KeyStatus, PluginErrorCode};
use pretty_assertions::assert_eq;

/// One recorded invocation.
#[derive(Debug, Clone)]
struct Call {
    argv: Vec<String>,
    input_existed: bool,
    decompressed_existed: bool,
}

/// Runner returning a canned outcome and recording what it was asked to run.
#[derive(Debug)]
struct FakeRunner {
    outcome: ProcessOutcome,
    calls: Mutex<Vec<Call>>,
}

impl FakeRunner {
    fn new(outcome: ProcessOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn replying(stdout: &str, stderr: &str, return_code: i32) -> Arc<Self> {
        Self::new(ProcessOutcome {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            return_code,
            error_code: ExternalErrorCode::Success,
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, argv: &[String]) -> ProcessOutcome {
        let path_after = |flag: &str| {
            argv.iter()
                .position(|a| a == flag)
                .and_then(|i| argv.get(i + 1))
                .map(PathBuf::from)
        };
        let existed = |flag: &str| path_after(flag).map(|p| p.exists()).unwrap_or(false);

        self.calls.lock().unwrap().push(Call {
            argv: argv.to_vec(),
            input_existed: existed("--input"),
            decompressed_existed: existed("--decompressed"),
        });
        self.outcome.clone()
    }
}

fn collector(dir: &tempfile::TempDir, runner: Arc<FakeRunner>) -> ExternalMetrics {
    let mut metrics = ExternalMetrics::with_config(ExternalConfig::default().temp_dir(dir.path()))
        .runner(runner);
    metrics
        .set_options(&Options::new().with(EXTERNAL_COMMAND, "analyze --mode fast"))
        .unwrap();
    metrics
}

fn sample() -> (Dataset, Dataset) {
    let original = Dataset::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], vec![3, 2]).unwrap();
    let reconstructed =
        Dataset::from_vec(vec![1.0f32, 2.5, 3.0, 4.0, 5.0, 6.5], vec![3, 2]).unwrap();
    (original, reconstructed)
}

fn run(metrics: &mut ExternalMetrics) {
    let (original, reconstructed) = sample();
    metrics.begin(&original);
    metrics.end(&original, &reconstructed, 0);
}

fn leftover_files(dir: &tempfile::TempDir) -> Vec<String> {
    std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

// ============================================================================
// Result Tests
// ============================================================================

#[test]
fn test_placeholders_before_run() {
    let metrics = ExternalMetrics::new();
    let results = metrics.results();

    assert_eq!(results.len(), 3);
    assert_eq!(results.key_status(ERROR_CODE), KeyStatus::Exists);
    assert_eq!(results.key_status(RETURN_CODE), KeyStatus::Exists);
    assert_eq!(results.key_status(STDERR), KeyStatus::Exists);
    assert_eq!(
        results.get_value(STDERR).map(|v| v.option_type()),
        Some(OptionType::String)
    );
}

#[test]
fn test_successful_run() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::replying("external:api=1\nfoo=1.5\nbar= 2e3 \n", "note\n", 0);
    let mut metrics = collector(&dir, runner.clone());
    run(&mut metrics);

    let results = metrics.results();
    assert_eq!(results.get::<f64>("external:results:foo"), Some(1.5));
    assert_eq!(results.get::<f64>("external:results:bar"), Some(2000.0));
    assert_eq!(results.get::<String>(STDERR), Some("note\n".to_string()));
    assert_eq!(results.get::<i32>(RETURN_CODE), Some(0));
    assert_eq!(results.get::<i32>(ERROR_CODE), Some(0));
    assert_eq!(results.len(), 5);
    assert_eq!(runner.calls().len(), 1);
}

#[test]
fn test_error_code_mirrors_return_code() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::replying("external:api=1\nfoo=1\n", "", 3);
    let mut metrics = collector(&dir, runner);
    run(&mut metrics);

    let results = metrics.results();
    assert_eq!(results.get::<i32>(RETURN_CODE), Some(3));
    assert_eq!(results.get::<i32>(ERROR_CODE), Some(3));
    assert_eq!(results.get::<f64>("external:results:foo"), Some(1.0));
}

#[test]
fn test_later_duplicates_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::replying("external:api=1\r\nfoo=1\r\nfoo=2\r\n", "", 0);
    let mut metrics = collector(&dir, runner);
    run(&mut metrics);

    assert_eq!(metrics.results().get::<f64>("external:results:foo"), Some(2.0));
}

#[test]
fn test_no_values_still_reports_fixed_fields() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::replying("external:api=1\n", "", 0);
    let mut metrics = collector(&dir, runner);
    run(&mut metrics);

    let results = metrics.results();
    assert_eq!(results.len(), 3);
    assert_eq!(results.get::<i32>(ERROR_CODE), Some(0));
}

fn assert_format_error(results: &Options) {
    let expected = Options::new()
        .with(ERROR_CODE, 4i32)
        .with(RETURN_CODE, 0i32)
        .with(STDERR, "");
    assert_eq!(results, &expected);
}

#[test]
fn test_missing_version_line_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::replying("foo=1.5\n", "boom", 2);
    let mut metrics = collector(&dir, runner);
    run(&mut metrics);

    assert_format_error(&metrics.results());
}

#[test]
fn test_empty_output_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::replying("", "", 0);
    let mut metrics = collector(&dir, runner);
    run(&mut metrics);

    assert_format_error(&metrics.results());
}

#[test]
fn test_unsupported_version_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::replying("external:api=2\nfoo=1\n", "", 0);
    let mut metrics = collector(&dir, runner);
    run(&mut metrics);

    assert_format_error(&metrics.results());
}

#[test]
fn test_bad_value_line_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::replying("external:api=1\nfoo=1\nbar=abc\n", "", 0);
    let mut metrics = collector(&dir, runner);
    run(&mut metrics);

    assert_format_error(&metrics.results());
}

#[test]
fn test_line_without_equals_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::replying("external:api=1\nfoo\n", "", 0);
    let mut metrics = collector(&dir, runner);
    run(&mut metrics);

    assert_format_error(&metrics.results());
}

#[test]
fn test_exec_failure_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let error = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
    let runner = FakeRunner::new(ProcessOutcome::exec_failure("analyze", &error));
    let mut metrics = collector(&dir, runner);
    run(&mut metrics);

    assert_format_error(&metrics.results());
}

#[test]
fn test_pipe_error_skips_parsing() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new(ProcessOutcome::failure(ExternalErrorCode::PipeError, 7));
    let mut metrics = collector(&dir, runner);
    run(&mut metrics);

    let expected = Options::new()
        .with(ERROR_CODE, 1i32)
        .with(RETURN_CODE, 7i32)
        .with(STDERR, "");
    assert_eq!(metrics.results(), expected);
}

#[test]
fn test_fork_error_skips_parsing() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new(ProcessOutcome::failure(ExternalErrorCode::ForkError, -1));
    let mut metrics = collector(&dir, runner);
    run(&mut metrics);

    assert_eq!(metrics.results().get::<i32>(ERROR_CODE), Some(2));
    assert_eq!(metrics.results().get::<i32>(RETURN_CODE), Some(-1));
}

#[test]
fn test_results_replaced_on_each_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut metrics = collector(&dir, FakeRunner::replying("external:api=1\nfoo=1\n", "", 0));
    run(&mut metrics);
    assert!(metrics.results().contains("external:results:foo"));

    metrics = metrics.runner(FakeRunner::replying("garbage", "", 0));
    run(&mut metrics);
    assert!(!metrics.results().contains("external:results:foo"));
}

// ============================================================================
// Invocation Tests
// ============================================================================

#[test]
fn test_argument_layout() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::replying("external:api=1\n", "", 0);
    let mut metrics = collector(&dir, runner.clone());
    run(&mut metrics);

    let calls = runner.calls();
    let argv = &calls[0].argv;
    assert_eq!(argv.len(), 15);
    assert_eq!(&argv[..5], &["analyze", "--mode", "fast", "--api", "1"]);
    assert_eq!(argv[5], "--input");
    assert_eq!(argv[7], "--decompressed");
    assert_eq!(
        &argv[9..],
        &["--type", "float", "--dim", "3", "--dim", "2"]
    );
}

#[test]
fn test_temp_files_exist_during_run_and_are_removed() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::replying("external:api=1\n", "", 1);
    let mut metrics = collector(&dir, runner.clone());
    run(&mut metrics);

    let call = &runner.calls()[0];
    assert!(call.input_existed);
    assert!(call.decompressed_existed);

    let input = PathBuf::from(&call.argv[6]);
    let decompressed = PathBuf::from(&call.argv[8]);
    let input_name = input.file_name().unwrap().to_string_lossy().into_owned();
    let decompressed_name = decompressed.file_name().unwrap().to_string_lossy().into_owned();
    assert!(input_name.starts_with(".lossmetricin"));
    assert_eq!(input_name.len(), ".lossmetricin".len() + 6);
    assert!(decompressed_name.starts_with(".lossmetricout"));
    assert_eq!(input.parent(), Some(dir.path()));

    assert!(leftover_files(&dir).is_empty());
}

#[test]
fn test_temp_files_hold_serialized_data() {
    #[derive(Debug, Default)]
    struct Capture {
        sizes: Mutex<Vec<u64>>,
    }

    impl CommandRunner for Capture {
        fn run(&self, argv: &[String]) -> ProcessOutcome {
            let mut sizes = self.sizes.lock().unwrap();
            for flag in ["--input", "--decompressed"] {
                let i = argv.iter().position(|a| a == flag).unwrap();
                sizes.push(std::fs::metadata(&argv[i + 1]).unwrap().len());
            }
            ProcessOutcome::failure(ExternalErrorCode::Success, 0)
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let capture = Arc::new(Capture::default());
    let mut metrics = ExternalMetrics::with_config(ExternalConfig::default().temp_dir(dir.path()))
        .runner(capture.clone());
    run(&mut metrics);

    assert_eq!(*capture.sizes.lock().unwrap(), vec![24, 24]);
}

#[test]
fn test_unwritable_temp_dir_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");
    let runner = FakeRunner::replying("external:api=1\n", "", 0);
    let mut metrics = ExternalMetrics::with_config(ExternalConfig::default().temp_dir(&missing))
        .runner(runner.clone());
    run(&mut metrics);

    let results = metrics.results();
    assert_eq!(results.get::<i32>(ERROR_CODE), Some(5));
    assert_eq!(results.get::<i32>(RETURN_CODE), Some(0));
    assert!(results.get::<String>(STDERR).unwrap().starts_with("bad path"));
    assert!(runner.calls().is_empty());
}

#[test]
fn test_serialization_failure_removes_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::replying("external:api=1\n", "", 0);
    let mut metrics = collector(&dir, runner.clone());
    metrics
        .set_options(&Options::new().with(EXTERNAL_IO_FORMAT, "csv"))
        .unwrap();

    let original = Dataset::from_vec(vec![1.0f64, 2.0, 3.0], vec![3]).unwrap();
    metrics.begin(&original);
    metrics.end(&original, &original, 0);

    let results = metrics.results();
    assert_eq!(results.get::<i32>(ERROR_CODE), Some(5));
    assert_eq!(
        results.get::<String>(STDERR),
        Some("only 2d data is supported".to_string())
    );
    assert!(runner.calls().is_empty());
    assert!(leftover_files(&dir).is_empty());
}

// ============================================================================
// Option Tests
// ============================================================================

#[test]
fn test_default_options() {
    let metrics = ExternalMetrics::new();
    let options = metrics.options();
    assert_eq!(options.get::<String>(EXTERNAL_COMMAND), Some(String::new()));
    assert_eq!(
        options.get::<String>(EXTERNAL_IO_FORMAT),
        Some("posix".to_string())
    );
    assert_eq!(metrics.config().temp_dir, PathBuf::from("."));
}

#[test]
fn test_set_io_format() {
    let mut metrics = ExternalMetrics::new();
    metrics
        .set_options(&Options::new().with(EXTERNAL_IO_FORMAT, "csv"))
        .unwrap();
    assert_eq!(
        metrics.options().get::<String>(EXTERNAL_IO_FORMAT),
        Some("csv".to_string())
    );
}

#[test]
fn test_unknown_io_format_keeps_previous_backend() {
    let mut metrics = ExternalMetrics::new();
    metrics
        .set_options(&Options::new().with(EXTERNAL_IO_FORMAT, "csv"))
        .unwrap();

    let err = metrics
        .set_options(&Options::new().with(EXTERNAL_IO_FORMAT, "hdf5"))
        .unwrap_err();
    assert!(matches!(err, PluginError::UnknownIoFormat(ref name) if name == "hdf5"));
    assert_eq!(err.code(), 1);
    assert_eq!(
        metrics.options().get::<String>(EXTERNAL_IO_FORMAT),
        Some("csv".to_string())
    );
}

#[test]
fn test_io_format_placeholder_is_ignored() {
    let mut metrics = ExternalMetrics::new();
    let mut options = Options::new();
    options.set_type(EXTERNAL_IO_FORMAT, OptionType::String);
    metrics.set_options(&options).unwrap();

    assert_eq!(
        metrics.options().get::<String>(EXTERNAL_IO_FORMAT),
        Some("posix".to_string())
    );
}

#[test]
fn test_custom_io_registry() {
    let mut registry = IoRegistry::new();
    registry
        .register("raw", || {
            Box::new(lossmetric_io::PosixIo::new()) as Box<dyn IoPlugin>
        })
        .unwrap();

    let mut metrics = ExternalMetrics::new().io_registry(registry);
    assert!(metrics
        .set_options(&Options::new().with(EXTERNAL_IO_FORMAT, "csv"))
        .is_err());
    metrics
        .set_options(&Options::new().with(EXTERNAL_IO_FORMAT, "raw"))
        .unwrap();
}

#[test]
fn test_duplicate_is_independent() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::replying("external:api=1\nfoo=4\n", "", 0);
    let mut metrics = collector(&dir, runner);
    run(&mut metrics);

    let mut copy = metrics.duplicate();
    copy.set_options(&Options::new().with(EXTERNAL_COMMAND, "other"))
        .unwrap();

    assert_eq!(
        metrics.options().get::<String>(EXTERNAL_COMMAND),
        Some("analyze --mode fast".to_string())
    );
    assert_eq!(copy.results(), metrics.results());
    assert_eq!(copy.name(), "external");
}

// ============================================================================
// Protocol Tests
// ============================================================================

#[test]
fn test_protocol_errors() {
    let outcome = |stdout: &str| ProcessOutcome {
        stdout: stdout.to_string(),
        stderr: String::new(),
        return_code: 0,
        error_code: ExternalErrorCode::Success,
    };

    assert_eq!(
        protocol::parse_output(&outcome("")),
        Err(ProtocolError::MissingVersion)
    );
    assert_eq!(
        protocol::parse_output(&outcome("external:api=x\n")),
        Err(ProtocolError::MalformedVersion("external:api=x".to_string()))
    );
    assert_eq!(
        protocol::parse_output(&outcome("external:api=3\n")),
        Err(ProtocolError::UnsupportedVersion(3))
    );
    assert_eq!(
        protocol::parse_output(&outcome("external:api=1\na=1\nb\n")),
        Err(ProtocolError::MalformedLine {
            line: 3,
            text: "b".to_string()
        })
    );
}

#[test]
fn test_version_header_must_be_exact() {
    let outcome = |stdout: &str| ProcessOutcome {
        stdout: stdout.to_string(),
        stderr: String::new(),
        return_code: 0,
        error_code: ExternalErrorCode::Success,
    };

    for header in ["external:api= 1 ", "external:api=1 ", "external:api=+1", "external:api="] {
        assert_eq!(
            protocol::parse_output(&outcome(&format!("{}\nfoo=1\n", header))),
            Err(ProtocolError::MalformedVersion(header.to_string()))
        );
    }

    let results = protocol::parse_output(&outcome("external:api=1\r\nfoo=1\r\n")).unwrap();
    assert_eq!(results.get::<f64>("external:results:foo"), Some(1.0));
}

#[test]
fn test_error_code_display() {
    assert_eq!(ExternalErrorCode::FormatError.to_string(), "format_error");
    assert_eq!(ExternalErrorCode::IoError.code(), 5);
    assert_eq!(EXEC_FAILURE_STATUS, 255);
}
