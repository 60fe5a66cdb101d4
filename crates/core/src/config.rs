//! 설정 관리 — playerwatch.toml 파싱 및 런타임 설정
//!
//! [`PlayerwatchConfig`]는 데몬, 추적기, CLI가 공유하는 최상위 설정 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`PLAYERWATCH_TRACKER_MODE=docker` 형식)
//! 3. 설정 파일 (`playerwatch.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), playerwatch_core::error::PlayerwatchError> {
//! use playerwatch_core::config::PlayerwatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = PlayerwatchConfig::load("playerwatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = PlayerwatchConfig::parse("[tracker]\ngame = \"valheim\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, PlayerwatchError};

/// 내장 게임 프로파일 이름
///
/// 추적기 크레이트의 프로파일 레지스트리와 일치해야 합니다.
pub const BUILTIN_GAMES: &[&str] = &["enshrouded", "valheim"];

/// 지원하는 수집 모드
pub const TRACKER_MODES: &[&str] = &["native", "docker"];

/// playerwatch 통합 설정
///
/// `playerwatch.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerwatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 세션 추적기 설정
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// 메트릭 노출 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl PlayerwatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PlayerwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlayerwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                PlayerwatchError::Io(e)
            }
        })?;
        let mut config = Self::parse(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, PlayerwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlayerwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                PlayerwatchError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, PlayerwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            PlayerwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `PLAYERWATCH_{SECTION}_{FIELD}`
    /// 예: `PLAYERWATCH_TRACKER_CONTAINER_NAME=enshrouded-server`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "PLAYERWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "PLAYERWATCH_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.log_file, "PLAYERWATCH_GENERAL_LOG_FILE");
        override_string(&mut self.general.pid_file, "PLAYERWATCH_GENERAL_PID_FILE");

        // Tracker
        override_string(&mut self.tracker.game, "PLAYERWATCH_TRACKER_GAME");
        override_string(&mut self.tracker.mode, "PLAYERWATCH_TRACKER_MODE");
        override_string(&mut self.tracker.log_path, "PLAYERWATCH_TRACKER_LOG_PATH");
        override_string(
            &mut self.tracker.container_name,
            "PLAYERWATCH_TRACKER_CONTAINER_NAME",
        );
        override_string(
            &mut self.tracker.docker_binary,
            "PLAYERWATCH_TRACKER_DOCKER_BINARY",
        );
        override_string(
            &mut self.tracker.output_json_path,
            "PLAYERWATCH_TRACKER_OUTPUT_JSON_PATH",
        );
        override_u64(
            &mut self.tracker.player_timeout_secs,
            "PLAYERWATCH_TRACKER_PLAYER_TIMEOUT_SECS",
        );
        override_string(
            &mut self.tracker.admin_list_path,
            "PLAYERWATCH_TRACKER_ADMIN_LIST_PATH",
        );
        override_string(
            &mut self.tracker.profile_path,
            "PLAYERWATCH_TRACKER_PROFILE_PATH",
        );
        override_u64(
            &mut self.tracker.poll_interval_ms,
            "PLAYERWATCH_TRACKER_POLL_INTERVAL_MS",
        );
        override_u64(
            &mut self.tracker.reopen_backoff_secs,
            "PLAYERWATCH_TRACKER_REOPEN_BACKOFF_SECS",
        );
        override_u64(
            &mut self.tracker.sweep_interval_secs,
            "PLAYERWATCH_TRACKER_SWEEP_INTERVAL_SECS",
        );
        override_u64(
            &mut self.tracker.correlation_window_secs,
            "PLAYERWATCH_TRACKER_CORRELATION_WINDOW_SECS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "PLAYERWATCH_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "PLAYERWATCH_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "PLAYERWATCH_METRICS_PORT");
        override_string(&mut self.metrics.endpoint, "PLAYERWATCH_METRICS_ENDPOINT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PlayerwatchError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        self.tracker.validate()?;

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(invalid("metrics.port", "must be greater than 0"));
            }
            if !self.metrics.endpoint.starts_with('/') {
                return Err(invalid("metrics.endpoint", "must start with '/'"));
            }
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 표준 출력과 함께 기록할 로그 파일 경로 (빈 문자열이면 표준 출력만 사용)
    pub log_file: String,
    /// PID 파일 경로 (빈 문자열이면 생성하지 않음)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            log_file: String::new(),
            pid_file: String::new(),
        }
    }
}

/// 세션 추적기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// 게임 프로파일 이름 (`enshrouded`, `valheim`)
    pub game: String,
    /// 수집 모드 (`native`: 로그 파일 tail, `docker`: 컨테이너 로그 스트림)
    pub mode: String,
    /// native 모드에서 감시할 로그 파일 경로
    pub log_path: String,
    /// docker 모드에서 로그를 읽을 컨테이너 이름
    pub container_name: String,
    /// docker 실행 파일 (경로 또는 이름)
    pub docker_binary: String,
    /// 스냅샷 JSON 출력 경로
    pub output_json_path: String,
    /// 세션 타임아웃 (초)
    pub player_timeout_secs: u64,
    /// 관리자 목록 파일 경로 (로스터 기반 역할 판정에 사용)
    pub admin_list_path: String,
    /// 사용자 정의 프로파일 YAML 경로 (지정 시 `game`보다 우선)
    pub profile_path: String,
    /// 새 줄이 없을 때 대기하는 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// 소스를 열 수 없을 때 재시도 간격 (초)
    pub reopen_backoff_secs: u64,
    /// 타임아웃 검사 주기 (초)
    pub sweep_interval_secs: u64,
    /// 이름 연결 윈도우 (초, 0이면 프로파일 기본값)
    pub correlation_window_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            game: "enshrouded".to_owned(),
            mode: "native".to_owned(),
            log_path: "/home/steam/enshrouded/logs/enshrouded_server.log".to_owned(),
            container_name: String::new(),
            docker_binary: "docker".to_owned(),
            output_json_path: "/var/lib/playerwatch/players.json".to_owned(),
            player_timeout_secs: 300,
            admin_list_path: String::new(),
            profile_path: String::new(),
            poll_interval_ms: 100,
            reopen_backoff_secs: 10,
            sweep_interval_secs: 10,
            correlation_window_secs: 0,
        }
    }
}

impl TrackerConfig {
    /// 추적기 섹션의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PlayerwatchError> {
        if !TRACKER_MODES.contains(&self.mode.as_str()) {
            return Err(invalid(
                "tracker.mode",
                format!(
                    "unknown mode '{}', must be one of: {}",
                    self.mode,
                    TRACKER_MODES.join(", ")
                ),
            ));
        }

        match self.mode.as_str() {
            "native" => require_concrete("tracker.log_path", &self.log_path)?,
            _ => {
                require_concrete("tracker.container_name", &self.container_name)?;
                require_concrete("tracker.docker_binary", &self.docker_binary)?;
            }
        }

        require_concrete("tracker.output_json_path", &self.output_json_path)?;

        if self.profile_path.is_empty() {
            if !BUILTIN_GAMES.contains(&self.game.as_str()) {
                return Err(invalid(
                    "tracker.game",
                    format!(
                        "unknown game '{}', must be one of: {} (or set tracker.profile_path)",
                        self.game,
                        BUILTIN_GAMES.join(", ")
                    ),
                ));
            }
        } else if is_placeholder(&self.profile_path) {
            return Err(invalid(
                "tracker.profile_path",
                "looks like an unfilled placeholder",
            ));
        }

        if !self.admin_list_path.is_empty() && is_placeholder(&self.admin_list_path) {
            return Err(invalid(
                "tracker.admin_list_path",
                "looks like an unfilled placeholder",
            ));
        }

        let positive = [
            ("tracker.player_timeout_secs", self.player_timeout_secs),
            ("tracker.poll_interval_ms", self.poll_interval_ms),
            ("tracker.reopen_backoff_secs", self.reopen_backoff_secs),
            ("tracker.sweep_interval_secs", self.sweep_interval_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
        }

        Ok(())
    }
}

/// 메트릭 노출 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 바인딩 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9464,
            endpoint: "/metrics".to_owned(),
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> PlayerwatchError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// `<container-name>` 같은 예시 값이 그대로 남아 있는지 확인합니다.
fn is_placeholder(value: &str) -> bool {
    value.contains('<') || value.contains('>')
}

fn require_concrete(field: &str, value: &str) -> Result<(), PlayerwatchError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if is_placeholder(value) {
        return Err(invalid(field, "looks like an unfilled placeholder"));
    }
    Ok(())
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
