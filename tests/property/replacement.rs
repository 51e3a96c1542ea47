use fnmock::{CallError, MockBuilder, MockableFunction, Registry, Value};
use proptest::prelude::*;
use std::sync::Arc;

use crate::utils::{args, json_value};

fn echo(registry: &Arc<Registry>) -> MockableFunction {
    MockableFunction::new("ns", "echo", |args| Ok(Value::Array(args.to_vec())))
        .with_registry(Arc::clone(registry))
}

proptest! {
    #[test]
    fn test_sequence_returns_values_in_order(
        values in prop::collection::vec(json_value(), 0..8)
    ) {
        let registry = Arc::new(Registry::default());
        let f = echo(&registry);
        let mut mock = MockBuilder::new()
            .scope("ns")
            .name("echo")
            .sequence(values.clone())
            .registry(Arc::clone(&registry))
            .build()
            .unwrap();
        mock.enable().unwrap();

        for expected in &values {
            prop_assert_eq!(&f.call(&[]).unwrap(), expected);
        }
        let exhausted = matches!(
            f.call(&[]),
            Err(CallError::SequenceExhausted { len, .. }) if len == values.len()
        );
        prop_assert!(exhausted);
        mock.disable();
    }

    #[test]
    fn test_value_mock_ignores_arguments(value in json_value(), call_args in args()) {
        let registry = Arc::new(Registry::default());
        let f = echo(&registry);
        let mut mock = MockBuilder::new()
            .scope("ns")
            .name("echo")
            .value(value.clone())
            .registry(Arc::clone(&registry))
            .build()
            .unwrap();

        mock.enable().unwrap();
        prop_assert_eq!(f.call(&call_args).unwrap(), value);
        mock.disable();
        prop_assert_eq!(f.call(&call_args).unwrap(), Value::Array(call_args.clone()));
    }

    #[test]
    fn test_value_map_finds_every_case(cases in prop::collection::vec((args(), json_value()), 1..6)) {
        let registry = Arc::new(Registry::default());
        let f = echo(&registry);
        let mut mock = MockBuilder::new()
            .scope("ns")
            .name("echo")
            .value_map(cases.clone())
            .registry(Arc::clone(&registry))
            .build()
            .unwrap();
        mock.enable().unwrap();

        // Later duplicates of the same argument list win.
        for (i, (case_args, _)) in cases.iter().enumerate() {
            let expected = cases
                .iter()
                .rev()
                .find(|(a, _)| a == case_args)
                .map(|(_, r)| r.clone())
                .unwrap();
            prop_assert_eq!(f.call(case_args).unwrap(), expected, "case {}", i);
        }
        mock.disable();
    }
}
