//! 줄 분류 모듈 -- 로그 한 줄을 세션 이벤트로 변환합니다.
//!
//! # 구성
//! - [`PatternSet`]: 우선순위 순서의 정규식 규칙 목록 (상태 없음)
//! - [`profile`]: 게임별 프로파일과 컴파일 타임 레지스트리
//! - [`loader`]: YAML 사용자 정의 프로파일 로더
//!
//! 각 규칙은 이벤트 종류에 맞는 이름 있는 캡처 그룹을 가져야 합니다.
//!
//! | 이벤트 | 캡처 |
//! |--------|------|
//! | `connection_opened` | `identifier` |
//! | `identity_confirmed` | `name` |
//! | `attribute_granted` | `token` |
//! | `session_terminated` | `name` |
//! | `identifier_disconnected` | `identifier` |

pub mod loader;
pub mod profile;

pub use loader::ProfileLoader;
pub use profile::{GameProfile, ProfileSpec, RoleSpec, RuleSpec, TierSpec};

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use playerwatch_core::types::{Identifier, IdentifierKind};

use crate::error::TrackerError;

/// 식별자 캡처 그룹 이름
pub const CAPTURE_IDENTIFIER: &str = "identifier";
/// 표시 이름 캡처 그룹 이름
pub const CAPTURE_NAME: &str = "name";
/// 권한 토큰 캡처 그룹 이름
pub const CAPTURE_TOKEN: &str = "token";

/// 추상 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// 전송 계층 접속
    ConnectionOpened,
    /// 표시 이름 확인
    IdentityConfirmed,
    /// 권한 토큰 부여
    AttributeGranted,
    /// 명시적 로그아웃
    SessionTerminated,
    /// 전송 계층 접속 해제
    IdentifierDisconnected,
}

impl EventKind {
    /// 모든 이벤트 종류 (표시 순서)
    pub const ALL: [EventKind; 5] = [
        Self::ConnectionOpened,
        Self::IdentityConfirmed,
        Self::AttributeGranted,
        Self::SessionTerminated,
        Self::IdentifierDisconnected,
    ];

    /// 메트릭 레이블 등에 쓰이는 snake_case 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionOpened => "connection_opened",
            Self::IdentityConfirmed => "identity_confirmed",
            Self::AttributeGranted => "attribute_granted",
            Self::SessionTerminated => "session_terminated",
            Self::IdentifierDisconnected => "identifier_disconnected",
        }
    }

    /// 이 종류의 규칙이 반드시 가져야 하는 캡처 그룹 이름
    pub fn required_capture(self) -> &'static str {
        match self {
            Self::ConnectionOpened | Self::IdentifierDisconnected => CAPTURE_IDENTIFIER,
            Self::IdentityConfirmed | Self::SessionTerminated => CAPTURE_NAME,
            Self::AttributeGranted => CAPTURE_TOKEN,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 분류된 세션 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// 새 접속 -- 대기 식별자를 생성합니다.
    ConnectionOpened(Identifier),
    /// 표시 이름 확인 -- 윈도우 내 대기 식별자와 연결합니다.
    IdentityConfirmed(String),
    /// 권한 토큰 -- 속성 대기 중인 세션에 추가합니다.
    AttributeGranted(String),
    /// 로그아웃 -- 이름으로 세션을 제거합니다.
    SessionTerminated(String),
    /// 접속 해제 -- 식별자로 세션을 제거합니다.
    IdentifierDisconnected(Identifier),
}

impl LogEvent {
    /// 이벤트 종류를 반환합니다.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ConnectionOpened(_) => EventKind::ConnectionOpened,
            Self::IdentityConfirmed(_) => EventKind::IdentityConfirmed,
            Self::AttributeGranted(_) => EventKind::AttributeGranted,
            Self::SessionTerminated(_) => EventKind::SessionTerminated,
            Self::IdentifierDisconnected(_) => EventKind::IdentifierDisconnected,
        }
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionOpened(id) | Self::IdentifierDisconnected(id) => {
                write!(f, "{}({id})", self.kind())
            }
            Self::IdentityConfirmed(value)
            | Self::AttributeGranted(value)
            | Self::SessionTerminated(value) => write!(f, "{}({value})", self.kind()),
        }
    }
}

/// 단일 분류 규칙
#[derive(Debug, Clone)]
pub struct PatternRule {
    kind: EventKind,
    regex: Regex,
}

impl PatternRule {
    /// 정규식을 컴파일하고 필수 캡처 그룹이 있는지 검증합니다.
    pub fn new(kind: EventKind, pattern: &str) -> Result<Self, TrackerError> {
        let regex = Regex::new(pattern)?;
        let capture = kind.required_capture();
        if !regex.capture_names().any(|name| name == Some(capture)) {
            return Err(TrackerError::ProfileValidation {
                profile: kind.as_str().to_owned(),
                reason: format!("pattern '{pattern}' lacks named capture '{capture}'"),
            });
        }
        Ok(Self { kind, regex })
    }

    /// 이벤트 종류
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// 원본 정규식 문자열
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    fn extract(&self, line: &str, identifier_kind: IdentifierKind) -> Option<LogEvent> {
        let caps = self.regex.captures(line)?;
        let raw = caps.name(self.kind.required_capture())?.as_str();
        match self.kind {
            EventKind::ConnectionOpened => {
                identifier_kind.parse(raw).map(LogEvent::ConnectionOpened)
            }
            EventKind::IdentifierDisconnected => identifier_kind
                .parse(raw)
                .map(LogEvent::IdentifierDisconnected),
            EventKind::IdentityConfirmed => {
                non_empty(raw).map(LogEvent::IdentityConfirmed)
            }
            EventKind::SessionTerminated => non_empty(raw).map(LogEvent::SessionTerminated),
            EventKind::AttributeGranted => non_empty(raw).map(LogEvent::AttributeGranted),
        }
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// 우선순위 순서의 분류 규칙 집합
///
/// 줄마다 규칙을 순서대로 시험하고 처음으로 유효한 이벤트를 만든 규칙이
/// 이벤트 종류를 결정합니다. 캡처 값이 식별자로 해석되지 않는 경우
/// 그 규칙은 매칭되지 않은 것으로 보고 다음 규칙으로 넘어갑니다.
#[derive(Debug, Clone)]
pub struct PatternSet {
    identifier_kind: IdentifierKind,
    rules: Vec<PatternRule>,
}

impl PatternSet {
    /// 새 규칙 집합을 생성합니다.
    pub fn new(identifier_kind: IdentifierKind, rules: Vec<PatternRule>) -> Self {
        Self {
            identifier_kind,
            rules,
        }
    }

    /// 한 줄을 분류합니다. 매칭되는 규칙이 없으면 `None`을 반환합니다.
    pub fn classify(&self, line: &str) -> Option<LogEvent> {
        self.rules
            .iter()
            .find_map(|rule| rule.extract(line, self.identifier_kind))
    }

    /// 규칙 목록 (우선순위 순서)
    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    /// 식별자 해석 방식
    pub fn identifier_kind(&self) -> IdentifierKind {
        self.identifier_kind
    }

    /// 규칙 수
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 규칙이 없는지 확인
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 해당 종류의 규칙이 하나 이상 있는지 확인
    pub fn covers(&self, kind: EventKind) -> bool {
        self.rules.iter().any(|rule| rule.kind == kind)
    }
}
