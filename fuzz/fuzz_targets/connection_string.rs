//! Fuzz connection string parsing.
//!
//! Parsing must never panic, whatever the input.

#![no_main]

use dbservice::Config;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(conn_str) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(config) = Config::from_connection_string(conn_str) {
        let _ = config.endpoint();
        let _ = config.validate();
        let _ = config.pool_config();
        let _ = format!("{config:?}");
    }
});
