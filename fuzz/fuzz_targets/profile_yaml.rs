#![no_main]

use libfuzzer_sys::fuzz_target;
use playerwatch_tracker::ProfileLoader;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // 컴파일에 성공한 프로파일은 분류까지 크래시 없이 동작해야 함
        if let Ok(profile) = ProfileLoader::parse_yaml(content, "fuzz/profile.yml") {
            let _ = profile.patterns.classify(content);
        }
    }
});
