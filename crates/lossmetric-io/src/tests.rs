//! Tests for the I/O backends.

use super::*;
use lossmetric_core::{DType, Dataset, IoError, Options, PluginErrorCode, IO_PATH};
use pretty_assertions::assert_eq;

fn path_options(path: &std::path::Path) -> Options {
    Options::new().with(IO_PATH, path.to_string_lossy().into_owned())
}

// ============================================================================
// Posix Tests
// ============================================================================

#[test]
fn test_posix_roundtrip_with_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.bin");
    let data = Dataset::from_vec(vec![1.5f32, -2.0, 3.25, 4.0, 0.0, 9.5], vec![3, 2]).unwrap();

    let mut io = PosixIo::new();
    io.set_options(&path_options(&path)).unwrap();
    io.write(&data).unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 24);

    let template = Dataset::empty(DType::Float, vec![3, 2]).unwrap();
    let read = io.read(Some(template)).unwrap();
    assert_eq!(read, data);
}

#[test]
fn test_posix_read_without_template_yields_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.bin");
    std::fs::write(&path, [1u8, 2, 3, 4, 5]).unwrap();

    let mut io = PosixIo::with_path(&path);
    let read = io.read(None).unwrap();
    assert_eq!(read.dtype(), DType::Byte);
    assert_eq!(read.dims(), &[5]);
}

#[test]
fn test_posix_size_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.bin");
    std::fs::write(&path, [0u8; 10]).unwrap();

    let mut io = PosixIo::with_path(&path);
    let err = io
        .read(Some(Dataset::empty(DType::Double, vec![2]).unwrap()))
        .unwrap_err();
    assert!(matches!(
        err,
        IoError::SizeMismatch {
            expected: 16,
            actual: 10
        }
    ));
}

#[test]
fn test_posix_without_path_is_bad_path() {
    let mut io = PosixIo::new();
    let data = Dataset::empty(DType::Int32, vec![4]).unwrap();
    let err = io.write(&data).unwrap_err();
    assert_eq!(err.code(), 3);
}

// ============================================================================
// CSV Tests
// ============================================================================

#[test]
fn test_csv_write_with_headers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.csv");
    let data = Dataset::from_vec(vec![1i32, 2, 3, 4, 5, 6], vec![2, 3]).unwrap();

    let mut io = CsvIo::new();
    let opts = path_options(&path).with(
        CSV_HEADERS,
        vec!["a".to_string(), "b".to_string(), "c".to_string()],
    );
    io.set_options(&opts).unwrap();
    io.write(&data).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "a,b,c\n1,2,3\n4,5,6\n");
    assert_eq!(content.lines().count(), 3);
}

#[test]
fn test_csv_write_floats_use_default_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.csv");
    let data = Dataset::from_vec(vec![0.5f64, 2.0], vec![1, 2]).unwrap();

    let mut io = CsvIo::new();
    io.set_options(&path_options(&path)).unwrap();
    io.write(&data).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "0.5,2\n");
}

#[test]
fn test_csv_write_rejects_non_2d_without_creating_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.csv");
    let data = Dataset::from_vec(vec![1.0f32, 2.0, 3.0], vec![3]).unwrap();

    let mut io = CsvIo::new();
    io.set_options(&path_options(&path)).unwrap();
    let err = io.write(&data).unwrap_err();

    assert!(matches!(err, IoError::InvalidDimensions { dims: 1 }));
    assert_eq!(err.code(), 1);
    assert_eq!(err.to_string(), "only 2d data is supported");
    assert!(!path.exists());
}

#[test]
fn test_csv_write_rejects_header_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.csv");
    let data = Dataset::from_vec(vec![1u8, 2, 3, 4], vec![2, 2]).unwrap();

    let mut io = CsvIo::new();
    let opts = path_options(&path).with(CSV_HEADERS, vec!["only".to_string()]);
    io.set_options(&opts).unwrap();
    let err = io.write(&data).unwrap_err();

    assert_eq!(err.code(), 2);
    assert!(!path.exists());
}

#[test]
fn test_csv_read_skips_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.csv");
    std::fs::write(&path, "x,y,z\n1,2,3\n4.5, 5 ,6\n").unwrap();

    let mut io = CsvIo::new();
    let opts = path_options(&path).with(CSV_SKIP_ROWS, 1u32);
    io.set_options(&opts).unwrap();
    let read = io.read(None).unwrap();

    assert_eq!(read.dtype(), DType::Double);
    assert_eq!(read.dims(), &[2, 3]);
    let values: Vec<f64> = read.values_f64().collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0, 4.5, 5.0, 6.0]);
}

#[test]
fn test_csv_read_header_without_skip_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.csv");
    std::fs::write(&path, "x,y\n1,2\n").unwrap();

    let mut io = CsvIo::new();
    io.set_options(&path_options(&path)).unwrap();
    let err = io.read(None).unwrap_err();
    assert!(matches!(err, IoError::Parse { line: 1, .. }));
}

#[test]
fn test_csv_read_ragged_rows_fail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.csv");
    std::fs::write(&path, "1,2,3\n4,5\n").unwrap();

    let mut io = CsvIo::new();
    io.set_options(&path_options(&path)).unwrap();
    let err = io.read(None).unwrap_err();
    assert!(matches!(err, IoError::Parse { line: 2, .. }));
}

#[test]
fn test_csv_read_missing_file_is_bad_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.csv");

    let mut io = CsvIo::new();
    io.set_options(&path_options(&path)).unwrap();
    let err = io.read(None).unwrap_err();
    assert_eq!(err.code(), 3);
    assert!(err.to_string().starts_with("bad path "));
}

#[test]
fn test_csv_options_and_duplicate() {
    let mut io = CsvIo::new();
    io.set_options(&Options::new().with(CSV_SKIP_ROWS, 4u32))
        .unwrap();

    let copy = io.duplicate();
    io.set_options(&Options::new().with(CSV_SKIP_ROWS, 0u32))
        .unwrap();

    assert_eq!(copy.options().get::<u32>(CSV_SKIP_ROWS), Some(4));
    assert_eq!(io.options().get::<u32>(CSV_SKIP_ROWS), Some(0));
    assert_eq!(copy.name(), "csv");
}

// ============================================================================
// Registry Tests
// ============================================================================

#[test]
fn test_builtin_registry() {
    let registry = builtin_registry();
    let names: Vec<_> = registry.names().collect();
    assert_eq!(names, vec!["csv", "posix"]);

    let io = registry.build(DEFAULT_IO_FORMAT).unwrap();
    assert_eq!(io.name(), "posix");
}

#[test]
fn test_register_builtins_twice_conflicts() {
    let mut registry = builtin_registry();
    assert!(register_builtins(&mut registry).is_err());
}
