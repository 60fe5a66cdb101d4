//! 에러 타입 — 도메인별 에러 정의

/// playerwatch 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum PlayerwatchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 세션 추적 파이프라인 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 세션 추적 파이프라인 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 파이프라인 초기화 실패 (프로파일 로딩, 정규식 컴파일 등)
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 복구할 수 없는 수집 소스 에러
    #[error("source failed: {0}")]
    SourceFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: PlayerwatchError = ConfigError::FileNotFound {
            path: "playerwatch.toml".to_owned(),
        }
        .into();
        assert!(matches!(err, PlayerwatchError::Config(_)));
        assert!(err.to_string().contains("playerwatch.toml"));
    }

    #[test]
    fn invalid_value_display_names_field() {
        let err = ConfigError::InvalidValue {
            field: "tracker.mode".to_owned(),
            reason: "must be one of: native, docker".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("tracker.mode"));
        assert!(msg.contains("native"));
    }

    #[test]
    fn pipeline_error_display() {
        let err = PlayerwatchError::from(PipelineError::InitFailed("bad regex".to_owned()));
        assert_eq!(err.to_string(), "pipeline error: pipeline init failed: bad regex");
    }
}
