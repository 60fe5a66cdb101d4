#![no_main]

use std::collections::HashSet;
use std::time::{Duration, SystemTime};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use playerwatch_core::types::Identifier;
use playerwatch_tracker::{CorrelationStore, GameProfile, LivenessSweeper, LogEvent};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 이벤트 시퀀스 (최대 64개로 제한)
    steps: Vec<FuzzStep>,
    /// 타임아웃 (초, 1..=255)
    timeout_secs: u8,
}

#[derive(Arbitrary, Debug)]
struct FuzzStep {
    event: FuzzEvent,
    /// 이전 단계 이후 경과 시간 (초)
    advance_secs: u8,
    /// 이 단계 뒤에 감시기를 돌릴지 여부
    sweep: bool,
}

/// 식별자와 이름을 작은 공간에 모아 충돌을 자주 일으킴
#[derive(Arbitrary, Debug)]
enum FuzzEvent {
    Connect(u8),
    Confirm(u8),
    Grant(u8),
    Logout(u8),
    Disconnect(u8),
}

const NAMES: [&str; 4] = ["Mira", "Odo", "Kestrel", "Mira "];
const TOKENS: [&str; 4] = ["CanKickBan", "CanEditBase", "CanExtendBase", "CanAccessInventories"];

impl FuzzEvent {
    fn to_log_event(&self) -> LogEvent {
        match *self {
            FuzzEvent::Connect(id) => LogEvent::ConnectionOpened(Identifier::Handle(u64::from(id % 8))),
            FuzzEvent::Confirm(n) => LogEvent::IdentityConfirmed(NAMES[usize::from(n) % NAMES.len()].to_owned()),
            FuzzEvent::Grant(t) => LogEvent::AttributeGranted(TOKENS[usize::from(t) % TOKENS.len()].to_owned()),
            FuzzEvent::Logout(n) => LogEvent::SessionTerminated(NAMES[usize::from(n) % NAMES.len()].to_owned()),
            FuzzEvent::Disconnect(id) => {
                LogEvent::IdentifierDisconnected(Identifier::Handle(u64::from(id % 8)))
            }
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    let Ok(profile) = GameProfile::builtin("enshrouded") else {
        return;
    };
    let mut store = CorrelationStore::new(profile.correlation_window, profile.role_resolver(None));
    let timeout = Duration::from_secs(u64::from(input.timeout_secs.max(1)));
    let mut sweeper = LivenessSweeper::new(timeout, Duration::from_secs(10));
    let mut now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

    for step in input.steps.iter().take(64) {
        now += Duration::from_secs(u64::from(step.advance_secs));
        let _ = store.apply(step.event.to_log_event(), now);
        if step.sweep {
            let _ = sweeper.sweep(&mut store, now);
        }

        // 활성 세션의 표시 이름은 항상 유일해야 함
        let snapshot = store.snapshot();
        let names: HashSet<_> = snapshot.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), snapshot.len());
        assert_eq!(store.active_count(), snapshot.len());
    }
});
