//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 세션 추적기와 CLI가 공유하는 데이터 구조를 정의합니다.
//! [`ActiveSession`]은 스냅샷 JSON 문서의 원소 형식이기도 합니다.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// 전송 계층 식별자
///
/// 접속 이벤트에서 추출되며 접속 시점부터 세션이 끝날 때까지 유지됩니다.
/// 스냅샷에서는 `Handle`은 숫자로, `Account`는 문자열로 직렬화됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    /// 숫자 핸들 (예: Enshrouded의 player handle)
    Handle(u64),
    /// 플랫폼 계정 ID (예: 17자리 SteamID)
    Account(String),
}

impl Identifier {
    /// 로스터 파일 비교 등에 쓰이는 문자열 표현을 반환합니다.
    pub fn as_key(&self) -> String {
        match self {
            Self::Handle(handle) => handle.to_string(),
            Self::Account(account) => account.clone(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handle(handle) => write!(f, "{handle}"),
            Self::Account(account) => write!(f, "{account}"),
        }
    }
}

/// 식별자 종류 — 캡처된 문자열을 어떤 [`Identifier`]로 해석할지 결정합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    /// 숫자 핸들
    #[default]
    Handle,
    /// 계정 ID 문자열
    Account,
}

impl IdentifierKind {
    /// 정규식 캡처 문자열을 식별자로 변환합니다.
    ///
    /// `Handle`인데 숫자가 아니거나 u64 범위를 넘으면 `None`을 반환합니다.
    pub fn parse(self, raw: &str) -> Option<Identifier> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match self {
            Self::Handle => raw.parse::<u64>().ok().map(Identifier::Handle),
            Self::Account => Some(Identifier::Account(raw.to_owned())),
        }
    }
}

/// 세션 역할 등급
///
/// `Ord` 구현은 권한 순서를 따릅니다 (`Guest < Community < Admin`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Role {
    /// 기본 등급
    #[default]
    Guest,
    /// 커뮤니티 멤버
    Community,
    /// 관리자
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guest => write!(f, "Guest"),
            Self::Community => write!(f, "Community"),
            Self::Admin => write!(f, "Admin"),
        }
    }
}

/// 활성 세션 — 이름 확인까지 끝난 접속 플레이어
///
/// 표시 이름은 활성 세션 사이에서 유일합니다.
/// `last_seen`은 스냅샷에서 유닉스 초(부동소수점)로 직렬화됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSession {
    /// 표시 이름
    pub name: String,
    /// 소유 식별자
    pub id: Identifier,
    /// 누적된 권한 토큰 (중복 허용, 수신 순서 유지)
    #[serde(default)]
    pub permissions: Vec<String>,
    /// 판정된 역할
    pub role: Role,
    /// 마지막 활동 시각
    #[serde(with = "unix_seconds")]
    pub last_seen: SystemTime,
}

impl fmt::Display for ActiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id={}, role={})", self.name, self.id, self.role)
    }
}

/// `SystemTime` <-> 유닉스 초(f64) 직렬화
pub mod unix_seconds {
    use super::*;
    use serde::{Deserializer, Serializer};

    /// 시각을 유닉스 초로 직렬화합니다. 에포크 이전 시각은 0으로 기록합니다.
    pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        let secs = time
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        serializer.serialize_f64(secs)
    }

    /// 유닉스 초를 시각으로 역직렬화합니다. 음수나 NaN은 에포크로 취급합니다.
    ///
    /// 표현할 수 없을 만큼 큰 값은 에러입니다.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        use serde::de::Error;

        let secs = f64::deserialize(deserializer)?;
        if secs.is_nan() || secs <= 0.0 {
            return Ok(UNIX_EPOCH);
        }
        Duration::try_from_secs_f64(secs)
            .ok()
            .and_then(|offset| UNIX_EPOCH.checked_add(offset))
            .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {secs}")))
    }
}
