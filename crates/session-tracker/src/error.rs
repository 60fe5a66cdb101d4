//! 세션 추적기 에러 타입
//!
//! [`TrackerError`]는 추적기 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<TrackerError> for PlayerwatchError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use playerwatch_core::error::{PipelineError, PlayerwatchError};

/// 세션 추적기 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// 알 수 없는 게임 프로파일
    #[error("unknown game profile: {0}")]
    UnknownGame(String),

    /// 프로파일 파일 로딩 실패
    #[error("profile load error: {path}: {reason}")]
    ProfileLoad {
        /// 프로파일 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 프로파일 유효성 검증 실패
    #[error("profile validation error: profile '{profile}': {reason}")]
    ProfileValidation {
        /// 문제가 된 프로파일 이름
        profile: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 수집 소스 에러
    #[error("source error: {source_type}: {reason}")]
    Source {
        /// 소스 유형 (file, process)
        source_type: String,
        /// 에러 사유
        reason: String,
    },

    /// 스냅샷 기록 실패
    #[error("snapshot error: {path}: {reason}")]
    Snapshot {
        /// 스냅샷 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<TrackerError> for PlayerwatchError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::Source { .. } => {
                PlayerwatchError::Pipeline(PipelineError::SourceFailed(err.to_string()))
            }
            other => PlayerwatchError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_load_error_display() {
        let err = TrackerError::ProfileLoad {
            path: "/etc/playerwatch/custom.yml".to_owned(),
            reason: "invalid YAML".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("custom.yml"));
        assert!(msg.contains("invalid YAML"));
    }

    #[test]
    fn source_error_converts_to_source_failed() {
        let err = TrackerError::Source {
            source_type: "process".to_owned(),
            reason: "stdout not captured".to_owned(),
        };
        let top: PlayerwatchError = err.into();
        assert!(matches!(
            top,
            PlayerwatchError::Pipeline(PipelineError::SourceFailed(_))
        ));
    }

    #[test]
    fn other_errors_convert_to_init_failed() {
        let top: PlayerwatchError = TrackerError::UnknownGame("minecraft".to_owned()).into();
        assert!(matches!(
            top,
            PlayerwatchError::Pipeline(PipelineError::InitFailed(_))
        ));
        assert!(top.to_string().contains("minecraft"));
    }
}
