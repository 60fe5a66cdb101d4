//! 활동 감시기 -- 제어 루프의 매 반복마다 호출됩니다.
//!
//! 스로틀 간격(기본 10초)마다 한 번, 이전 반복에서 갱신된 `last_seen` 기준으로
//! 타임아웃 세션을 제거하고 역할 판정기의 핫 리로드를 확인합니다.
//! 그 다음 모든 활성 세션의 `last_seen`을 현재 시각으로 갱신합니다.
//! 따라서 세션은 루프 자체가 타임아웃보다 오래 멈췄을 때만 만료됩니다.

use std::time::{Duration, SystemTime};

use crate::store::CorrelationStore;

/// 한 번의 `sweep` 호출 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// 스로틀 구간을 통과하여 검사가 실행되었는지
    pub checked: bool,
    /// 타임아웃으로 제거된 세션 이름
    pub evicted: Vec<String>,
    /// 역할 판정기 외부 상태가 다시 로드되었는지
    pub roles_reloaded: bool,
}

/// 활동 감시기
#[derive(Debug, Clone)]
pub struct LivenessSweeper {
    timeout: Duration,
    interval: Duration,
    last_check: Option<SystemTime>,
}

impl LivenessSweeper {
    /// 새 감시기를 생성합니다. 첫 `sweep` 호출은 항상 검사를 실행합니다.
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            last_check: None,
        }
    }

    /// 세션 타임아웃
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 마지막 검사 시각
    pub fn last_check(&self) -> Option<SystemTime> {
        self.last_check
    }

    /// 감시 한 회를 수행합니다.
    pub fn sweep(&mut self, store: &mut CorrelationStore, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();

        if self.is_due(now) {
            report.checked = true;
            report.evicted = store.evict_stale(now, self.timeout);
            report.roles_reloaded = store.reload_roles();
            self.last_check = Some(now);
        }

        store.touch_all(now);
        report
    }

    fn is_due(&self, now: SystemTime) -> bool {
        match self.last_check {
            None => true,
            // 시계가 뒤로 가면 즉시 검사하고 기준을 다시 잡음
            Some(last) => now
                .duration_since(last)
                .map_or(true, |elapsed| elapsed >= self.interval),
        }
    }
}
