use fnmock::{
    dispatch, CallError, CallResult, MockBuilder, MockError, MockableFunction, Replacement, Value,
};
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

fn real_time(_args: &[Value]) -> CallResult {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(CallError::failed)?;
    Ok(json!(now.as_secs()))
}

/// Code under test: reads the clock through the dispatch point.
fn time() -> u64 {
    dispatch("ns", "time", &[], real_time)
        .ok()
        .and_then(|v| v.as_u64())
        .unwrap_or_default()
}

#[test]
fn test_fixed_value_then_real_clock() {
    fnmock::logging::init_test_subscriber();
    let mut mock = MockBuilder::new()
        .scope("ns")
        .name("time")
        .value(1234)
        .build()
        .unwrap();

    mock.enable().unwrap();
    assert_eq!(time(), 1234);
    assert_eq!(time(), 1234);
    mock.disable();

    let now = time();
    assert_ne!(now, 1234);
    assert!(now > 1_577_836_800);
}

#[test]
fn test_raw_function_then_provider() {
    let builder = MockBuilder::new()
        .scope("ns")
        .name("time")
        .function(|_| Ok(json!(1234)));

    let mut mock = builder.build().unwrap();
    mock.enable().unwrap();
    assert_eq!(time(), 1234);
    mock.disable();

    let builder = builder.replacement(Replacement::value(123));
    let mut mock = builder.build().unwrap();
    mock.enable().unwrap();
    assert_eq!(time(), 123);
    mock.disable();
}

#[test]
fn test_value_provider_then_sequence_provider() {
    let builder = MockBuilder::new()
        .scope("ns")
        .name("time")
        .value(1234)
        .sequence([1, 2, 3]);

    let mut mock = builder.build().unwrap();
    mock.enable().unwrap();
    let rand = MockableFunction::new("ns", "time", real_time);
    assert_eq!(rand.call(&[]).unwrap(), json!(1));
    assert_eq!(rand.call(&[]).unwrap(), json!(2));
    assert_eq!(rand.call(&[]).unwrap(), json!(3));
    assert!(matches!(
        rand.call(&[]),
        Err(CallError::SequenceExhausted { len: 3, .. })
    ));
    mock.disable();
}

#[test]
fn test_incomplete_builder_fails_at_build() {
    let err = MockBuilder::new()
        .scope("ns")
        .value(1)
        .build()
        .unwrap_err();
    assert!(matches!(err, MockError::IncompleteConfiguration("name")));
    assert_eq!(err.to_string(), "Incomplete mock configuration: missing name");
}

#[test]
fn test_scoped_guard_cleans_up_after_failed_test_body() {
    let mut mock = MockBuilder::new()
        .scope("ns")
        .name("time")
        .value(1)
        .build()
        .unwrap();

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _guard = mock.enable_scoped().unwrap();
        assert_eq!(time(), 2, "deliberately failing assertion");
    }));

    assert!(outcome.is_err());
    assert!(!mock.is_enabled());
    assert_ne!(time(), 1);
}
