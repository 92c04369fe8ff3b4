//! Fuzz statement sanitization.

#![no_main]

use dbservice::instrumentation::{SanitizationConfig, extract_operation};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(sql) = std::str::from_utf8(data) else {
        return;
    };

    let config = SanitizationConfig::default();
    let sanitized = config.sanitize(sql);
    assert!(sanitized.len() <= config.max_length);

    // String literals are replaced whole, quotes included.
    assert!(!sanitized.contains('\''));

    let unbounded = SanitizationConfig::no_sanitization().sanitize(sql);
    assert_eq!(unbounded, sql);

    let _ = extract_operation(sql);
});
