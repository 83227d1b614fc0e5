#![cfg(feature = "test-utils")]
#![allow(unsafe_code)]

use pq_middleware::prelude::*;
use pq_middleware::test_utils::{MockLibrary, MockResult};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

fn sample_result() -> ResultClear<MockLibrary> {
    let raw = MockLibrary::alloc_result(
        MockResult::default()
            .column("id", 20)
            .column("name", 25)
            .column("payload", 17)
            .column("meta", 3802)
            .row(&[Some("1"), Some("alice"), Some("\\x0102"), Some(r#"{"a":1}"#)])
            .row(&[Some("2"), None, None, Some("null")]),
    );
    unsafe { ResultClear::from_raw(raw) }
}

#[test]
fn output_parameters_borrow_the_result_buffer() {
    let result = sample_result();
    assert_eq!(result.row_count(), 2);
    assert_eq!(result.column_count(), 4);
    assert_eq!(result.column_names(), ["id", "name", "payload", "meta"]);

    let cells = result.output_parameters();
    assert_eq!(cells.len(), 8);

    let name = cells[1];
    assert_eq!(name.field_type(), FieldType::String);
    assert_eq!(name.internal_field_type(), 25);
    assert_eq!(name.data(), Some(b"alice".as_slice()));
    assert_eq!(name.row_number(), 0);

    let missing = cells[5];
    assert!(missing.is_null());
    assert_eq!(missing.size(), 0);
    assert_eq!(missing.row_number(), 1);

    assert!(result.output_parameter(2, 0).is_none());
    assert!(result.output_parameter(0, 4).is_none());
}

#[test]
fn released_result_exposes_no_cells() {
    MockLibrary::reset_counts();
    let mut result = sample_result();
    result.release();
    assert_eq!(result.row_count(), 0);
    assert!(result.output_parameters().is_empty());
    assert!(result.column_names().is_empty());
    drop(result);
    assert_eq!(MockLibrary::counts().results_cleared, 1);
}

#[test]
fn builds_a_typed_result_set() -> Result<(), PqMiddlewareError> {
    init_tracing();
    let result = sample_result();
    let rs = build_result_set(&result)?;

    assert_eq!(rs.len(), 2);
    let first = &rs.results[0];
    assert_eq!(first.get("id"), Some(&RowValues::Int(1)));
    assert_eq!(first.get("name").and_then(RowValues::as_text), Some("alice"));
    assert_eq!(first.get("payload").and_then(RowValues::as_blob), Some([1u8, 2].as_slice()));
    assert_eq!(
        first.get("meta").and_then(RowValues::as_json),
        Some(&serde_json::json!({"a": 1}))
    );

    let second = &rs.results[1];
    assert!(second.get("name").is_some_and(RowValues::is_null));
    assert_eq!(second.get("meta"), Some(&RowValues::JSON(serde_json::Value::Null)));
    Ok(())
}

#[test]
fn decode_failure_surfaces_and_still_clears() {
    init_tracing();
    MockLibrary::reset_counts();
    {
        let raw = MockLibrary::alloc_result(
            MockResult::default().column("n", 23).row(&[Some("not a number")]),
        );
        let result = unsafe { ResultClear::<MockLibrary>::from_raw(raw) };
        let err = build_result_set(&result).unwrap_err();
        assert!(matches!(err, PqMiddlewareError::ExecutionError(_)));
    }
    assert_eq!(MockLibrary::counts().results_cleared, 1);
}
