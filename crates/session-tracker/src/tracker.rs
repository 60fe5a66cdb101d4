//! 세션 추적기 -- 제어 루프 오케스트레이션
//!
//! [`SessionTracker`]는 하나의 tokio 태스크에서 순차적으로 실행되며
//! 수집 소스, 분류 규칙, 상관 저장소, 활동 감시기, 스냅샷 기록기를 소유합니다.
//!
//! # 루프 한 회
//! ```text
//! next_line() ──> sweep(now) ──> classify ──> store.apply ──> snapshot (변경 시)
//! ```
//! 소스가 줄 없이 반환해도 감시기는 매번 실행됩니다.

use std::future::Future;
use std::time::{Instant, SystemTime};

use metrics::{counter, gauge, histogram};
use playerwatch_core::metrics as m;
use serde::Serialize;

use crate::collector::{AnySource, LineSource};
use crate::config::TrackerSettings;
use crate::error::TrackerError;
use crate::pattern::{GameProfile, PatternSet};
use crate::snapshot::SnapshotWriter;
use crate::store::{ApplyOutcome, CorrelationStore};
use crate::sweeper::{LivenessSweeper, SweepReport};

/// 추적기 누적 통계
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    /// 읽은 줄 수
    pub lines_read: u64,
    /// 규칙에 매칭된 줄 수
    pub events_matched: u64,
    /// 이름 연결 실패 수
    pub correlation_failures: u64,
    /// 타임아웃으로 제거된 세션 수
    pub evictions: u64,
    /// 성공한 스냅샷 기록 수
    pub snapshot_writes: u64,
    /// 실패한 스냅샷 기록 수
    pub snapshot_failures: u64,
    /// 현재 활성 세션 수
    pub active_sessions: usize,
    /// 현재 대기 식별자 수
    pub pending_identities: usize,
}

/// 세션 추적기
pub struct SessionTracker<S: LineSource> {
    source: S,
    profile_name: String,
    patterns: PatternSet,
    store: CorrelationStore,
    sweeper: LivenessSweeper,
    writer: SnapshotWriter,
    stats: TrackerStats,
}

impl SessionTracker<AnySource> {
    /// 설정에서 프로파일과 소스를 결정하여 추적기를 생성합니다.
    ///
    /// # Errors
    /// - 알 수 없는 게임이거나 사용자 정의 프로파일 로딩이 실패한 경우
    pub async fn from_settings(settings: &TrackerSettings) -> Result<Self, TrackerError> {
        settings.validate()?;
        let profile = GameProfile::from_settings(settings).await?;
        let source = AnySource::from_spec(
            &settings.source,
            settings.poll_interval,
            settings.reopen_backoff,
        );
        Ok(Self::new(settings, profile, source))
    }
}

impl<S: LineSource> SessionTracker<S> {
    /// 주어진 프로파일과 소스로 추적기를 생성합니다.
    pub fn new(settings: &TrackerSettings, profile: GameProfile, source: S) -> Self {
        let resolver = profile.role_resolver(settings.admin_list_path.as_deref());
        let store = CorrelationStore::new(profile.correlation_window, resolver);

        tracing::info!(
            profile = %profile.name,
            source = %source.describe(),
            rules = profile.patterns.len(),
            resolver = store.resolver_name(),
            window_secs = profile.correlation_window.as_secs(),
            timeout_secs = settings.player_timeout.as_secs(),
            output = %settings.output_path.display(),
            "session tracker created"
        );

        Self {
            source,
            profile_name: profile.name,
            patterns: profile.patterns,
            store,
            sweeper: LivenessSweeper::new(settings.player_timeout, settings.sweep_interval),
            writer: SnapshotWriter::new(settings.output_path.clone()),
            stats: TrackerStats::default(),
        }
    }

    /// 사용 중인 프로파일 이름
    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    /// 누적 통계
    pub fn stats(&self) -> &TrackerStats {
        &self.stats
    }

    /// 상관 저장소
    pub fn store(&self) -> &CorrelationStore {
        &self.store
    }

    /// 줄 하나를 분류하고 저장소에 적용합니다.
    ///
    /// 매칭되지 않은 줄은 `None`을 반환하며 상태를 바꾸지 않습니다.
    /// 활성 세션이 바뀌면 즉시 스냅샷을 기록합니다.
    pub fn process_line(&mut self, line: &str, now: SystemTime) -> Option<ApplyOutcome> {
        let started = Instant::now();
        self.stats.lines_read += 1;
        counter!(m::TRACKER_LINES_READ_TOTAL).increment(1);

        let Some(event) = self.patterns.classify(line) else {
            tracing::trace!(line, "line did not match any rule");
            return None;
        };

        let kind = event.kind();
        self.stats.events_matched += 1;
        counter!(m::TRACKER_EVENTS_MATCHED_TOTAL, m::LABEL_EVENT_KIND => kind.as_str())
            .increment(1);
        tracing::debug!(event = %event, "event matched");

        let outcome = self.store.apply(event, now);
        match outcome {
            ApplyOutcome::SessionsChanged => self.write_snapshot(),
            ApplyOutcome::CorrelationFailed => {
                self.stats.correlation_failures += 1;
                counter!(m::TRACKER_CORRELATION_FAILURES_TOTAL).increment(1);
            }
            ApplyOutcome::PendingChanged | ApplyOutcome::Unchanged => {}
        }
        self.refresh_gauges();

        histogram!(m::TRACKER_LINE_PROCESSING_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        Some(outcome)
    }

    /// 활동 감시를 한 회 수행합니다. 제거된 세션이 있으면 스냅샷을 기록합니다.
    pub fn tick(&mut self, now: SystemTime) -> SweepReport {
        let report = self.sweeper.sweep(&mut self.store, now);
        if !report.evicted.is_empty() {
            let count = report.evicted.len() as u64;
            self.stats.evictions += count;
            counter!(m::TRACKER_EVICTIONS_TOTAL).increment(count);
            tracing::info!(evicted = ?report.evicted, "stale sessions evicted");
            self.write_snapshot();
        }
        if report.checked {
            self.refresh_gauges();
        }
        report
    }

    /// 현재 세션 목록으로 스냅샷을 기록합니다.
    pub fn write_snapshot(&mut self) {
        if self.writer.write_logged(&self.store.snapshot()) {
            self.stats.snapshot_writes += 1;
        } else {
            self.stats.snapshot_failures += 1;
        }
    }

    /// `shutdown`이 완료될 때까지 제어 루프를 실행합니다.
    ///
    /// 시작 시 빈 스냅샷을 한 번 기록합니다. 종료 시 최종 통계를 반환합니다.
    ///
    /// # Errors
    /// 소스가 복구할 수 없는 에러를 반환한 경우
    pub async fn run<F>(&mut self, shutdown: F) -> Result<TrackerStats, TrackerError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            profile = %self.profile_name,
            source = %self.source.describe(),
            "session tracker started"
        );
        self.write_snapshot();

        tokio::pin!(shutdown);
        loop {
            let next = tokio::select! {
                _ = &mut shutdown => break,
                next = self.source.next_line() => next,
            };

            let now = SystemTime::now();
            self.tick(now);
            match next {
                Ok(Some(line)) => {
                    self.process_line(&line, now);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "line source failed");
                    return Err(e);
                }
            }
        }

        self.refresh_gauges();
        tracing::info!(
            lines_read = self.stats.lines_read,
            events_matched = self.stats.events_matched,
            active_sessions = self.stats.active_sessions,
            pending_identities = self.stats.pending_identities,
            evictions = self.stats.evictions,
            "session tracker stopped"
        );
        Ok(self.stats.clone())
    }

    fn refresh_gauges(&mut self) {
        self.stats.active_sessions = self.store.active_count();
        self.stats.pending_identities = self.store.pending_count();
        gauge!(m::TRACKER_SESSIONS_ACTIVE).set(self.stats.active_sessions as f64);
        gauge!(m::TRACKER_PENDING_IDENTITIES).set(self.stats.pending_identities as f64);
    }
}
