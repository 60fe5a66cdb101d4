#![no_main]

use libfuzzer_sys::fuzz_target;
use playerwatch_tracker::GameProfile;

fuzz_target!(|data: &[u8]| {
    // 수집기와 동일하게 손실 허용 UTF-8 디코딩
    let line = String::from_utf8_lossy(data);

    for name in GameProfile::builtin_names() {
        if let Ok(profile) = GameProfile::builtin(name) {
            let _ = profile.patterns.classify(&line);
        }
    }
});
