//! Property tests for configuration parsing and the naming convention.

use std::time::Duration;

use casework::config::{ENV_MEASURE_ITERATIONS, ENV_POLL_INTERVAL_MS};
use casework::{HarnessConfig, is_test_method_name};
use proptest::prelude::*;

proptest! {
    #[test]
    fn positive_poll_intervals_are_accepted(ms in 1u64..1_000_000) {
        let value = ms.to_string();
        let config = HarnessConfig::from_lookup(|var| (var == ENV_POLL_INTERVAL_MS).then(|| value.clone()));
        prop_assert_eq!(config.map(|c| c.poll_interval), Ok(Duration::from_millis(ms)));
    }

    #[test]
    fn non_numeric_iterations_are_rejected(value in "[a-z]{1,8}") {
        let config = HarnessConfig::from_lookup(|var| (var == ENV_MEASURE_ITERATIONS).then(|| value.clone()));
        prop_assert!(config.is_err());
    }

    #[test]
    fn prefixed_names_are_tests(suffix in "[A-Za-z0-9_]{0,12}") {
        let test_name = format!("test{suffix}");
        let helper_name = format!("helper{suffix}");
        prop_assert!(is_test_method_name(&test_name));
        prop_assert!(!is_test_method_name(&helper_name));
    }
}
