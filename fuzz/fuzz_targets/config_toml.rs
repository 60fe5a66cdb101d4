#![no_main]

use libfuzzer_sys::fuzz_target;
use playerwatch_core::config::PlayerwatchConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        if let Ok(config) = PlayerwatchConfig::parse(content) {
            let _ = config.validate();
        }
    }
});
