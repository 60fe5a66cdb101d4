#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`collector`]: 줄 소스 (파일 tail, 하위 프로세스 표준 출력)
//! - [`pattern`]: 게임 프로파일과 정규식 기반 이벤트 분류
//! - [`role`]: 역할 판정 전략 (권한 등급, 관리자 목록)
//! - [`store`]: 대기 식별자와 활성 세션을 연결하는 상관 저장소
//! - [`sweeper`]: 주기적 타임아웃 제거 및 관리자 목록 핫 리로드
//! - [`snapshot`]: 활성 세션 JSON 스냅샷 기록/읽기
//! - [`tracker`]: 제어 루프 오케스트레이션
//! - [`config`]: 추적기 실행 설정 (core 설정 변환)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! LineSource -> PatternSet -> CorrelationStore -> SnapshotWriter
//!  File/Process   classify      apply(event)        players.json
//!                                   ^
//!                          LivenessSweeper (every iteration)
//! ```

pub mod collector;
pub mod config;
pub mod error;
pub mod pattern;
pub mod role;
pub mod snapshot;
pub mod store;
pub mod sweeper;
pub mod tracker;

// --- 주요 타입 re-export ---

// 추적기
pub use tracker::{SessionTracker, TrackerStats};

// 설정
pub use config::{SourceSpec, TrackerSettings, TrackerSettingsBuilder};

// 에러
pub use error::TrackerError;

// 수집 소스
pub use collector::{AnySource, FileTail, LineSource, ProcessStream};

// 분류
pub use pattern::{EventKind, GameProfile, LogEvent, PatternRule, PatternSet, ProfileLoader};

// 역할
pub use role::{AdminRoster, PermissionTiers, RoleTier};

// 상태
pub use snapshot::{SnapshotWriter, read_snapshot};
pub use store::{ApplyOutcome, CorrelationStore, PendingIdentity, PendingStatus};
pub use sweeper::{LivenessSweeper, SweepReport};
