//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 추적기와 데몬은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `playerwatch_`
//! - 모듈명: `tracker_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(playerwatch_core::metrics::TRACKER_LINES_READ_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 이벤트 종류 레이블 키 (connection_opened, identity_confirmed, ...)
pub const LABEL_EVENT_KIND: &str = "kind";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 수집 소스 레이블 키 (file, process)
pub const LABEL_SOURCE: &str = "source";

/// 게임 프로파일 레이블 키
pub const LABEL_GAME: &str = "game";

// ─── Session Tracker 메트릭 ─────────────────────────────────────────

/// Tracker: 소스에서 읽은 전체 줄 수 (counter)
pub const TRACKER_LINES_READ_TOTAL: &str = "playerwatch_tracker_lines_read_total";

/// Tracker: 분류된 이벤트 수 (counter, label: kind)
pub const TRACKER_EVENTS_MATCHED_TOTAL: &str = "playerwatch_tracker_events_matched_total";

/// Tracker: 이름 연결 실패 수 (counter)
pub const TRACKER_CORRELATION_FAILURES_TOTAL: &str =
    "playerwatch_tracker_correlation_failures_total";

/// Tracker: 현재 활성 세션 수 (gauge)
pub const TRACKER_SESSIONS_ACTIVE: &str = "playerwatch_tracker_sessions_active";

/// Tracker: 현재 대기 중인 식별자 수 (gauge)
pub const TRACKER_PENDING_IDENTITIES: &str = "playerwatch_tracker_pending_identities";

/// Tracker: 타임아웃으로 제거된 세션 수 (counter)
pub const TRACKER_EVICTIONS_TOTAL: &str = "playerwatch_tracker_evictions_total";

/// Tracker: 스냅샷 기록 횟수 (counter, label: result)
pub const TRACKER_SNAPSHOT_WRITES_TOTAL: &str = "playerwatch_tracker_snapshot_writes_total";

/// Tracker: 소스 재시작/재오픈 횟수 (counter, label: source)
pub const TRACKER_SOURCE_RESTARTS_TOTAL: &str = "playerwatch_tracker_source_restarts_total";

/// Tracker: 관리자 목록 재로딩 횟수 (counter)
pub const TRACKER_ROSTER_RELOADS_TOTAL: &str = "playerwatch_tracker_roster_reloads_total";

/// Tracker: 한 줄 처리 지연 시간 (histogram, 초)
pub const TRACKER_LINE_PROCESSING_DURATION_SECONDS: &str =
    "playerwatch_tracker_line_processing_duration_seconds";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "playerwatch_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, 항상 1, labels: version, game)
pub const DAEMON_BUILD_INFO: &str = "playerwatch_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 줄 처리 지연 시간 히스토그램 버킷 (초)
///
/// 10us ~ 1s 범위. 스냅샷 기록이 포함되면 상위 버킷에 걸립니다.
pub const LINE_PROCESSING_BUCKETS: [f64; 9] = [
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.1, 1.0,
];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `playerwatch-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Session Tracker
    describe_counter!(
        TRACKER_LINES_READ_TOTAL,
        "Total number of raw log lines read from the source"
    );
    describe_counter!(
        TRACKER_EVENTS_MATCHED_TOTAL,
        "Total number of lines classified into a session event, by kind"
    );
    describe_counter!(
        TRACKER_CORRELATION_FAILURES_TOTAL,
        "Total number of identity confirmations with no pending identifier in the window"
    );
    describe_gauge!(
        TRACKER_SESSIONS_ACTIVE,
        "Number of currently active sessions"
    );
    describe_gauge!(
        TRACKER_PENDING_IDENTITIES,
        "Number of identifiers connected but not yet removed"
    );
    describe_counter!(
        TRACKER_EVICTIONS_TOTAL,
        "Total number of sessions evicted by liveness timeout"
    );
    describe_counter!(
        TRACKER_SNAPSHOT_WRITES_TOTAL,
        "Total number of snapshot writes, by result"
    );
    describe_counter!(
        TRACKER_SOURCE_RESTARTS_TOTAL,
        "Total number of source reopen or relaunch attempts"
    );
    describe_counter!(
        TRACKER_ROSTER_RELOADS_TOTAL,
        "Total number of admin roster reloads"
    );
    describe_histogram!(
        TRACKER_LINE_PROCESSING_DURATION_SECONDS,
        "Time to classify and apply a single line in seconds"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "playerwatch daemon uptime in seconds");
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version/game labels)"
    );
}
