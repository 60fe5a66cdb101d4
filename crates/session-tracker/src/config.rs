//! 세션 추적기 설정
//!
//! [`TrackerSettings`]는 core의 [`TrackerConfig`](playerwatch_core::config::TrackerConfig)를
//! 실행 시점에 바로 쓸 수 있는 형태(경로, `Duration`, 소스 명세)로 변환한 설정입니다.
//!
//! # 사용 예시
//! ```ignore
//! use playerwatch_core::config::PlayerwatchConfig;
//! use playerwatch_tracker::config::TrackerSettings;
//!
//! let core_config = PlayerwatchConfig::default();
//! let settings = TrackerSettings::from_core(&core_config.tracker)?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use playerwatch_core::config::TrackerConfig;

use crate::error::TrackerError;

/// 줄을 읽어 올 소스 명세
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// 로그 파일 tail
    File {
        /// 감시할 파일 경로
        path: PathBuf,
    },
    /// 하위 프로세스 표준 출력 스트림
    Process {
        /// 실행 파일
        program: String,
        /// 인자 목록
        args: Vec<String>,
    },
}

impl SourceSpec {
    /// `docker logs --since 1s -f <container>` 명세를 생성합니다.
    pub fn docker_logs(binary: impl Into<String>, container: impl Into<String>) -> Self {
        Self::Process {
            program: binary.into(),
            args: vec![
                "logs".to_owned(),
                "--since".to_owned(),
                "1s".to_owned(),
                "-f".to_owned(),
                container.into(),
            ],
        }
    }

    /// 로그/메트릭 레이블용 소스 유형 이름
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Process { .. } => "process",
        }
    }

    /// 사람이 읽을 수 있는 소스 설명
    pub fn describe(&self) -> String {
        match self {
            Self::File { path } => format!("file:{}", path.display()),
            Self::Process { program, args } => format!("process:{} {}", program, args.join(" ")),
        }
    }
}

/// 세션 추적기 실행 설정
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    /// 내장 게임 프로파일 이름
    pub game: String,
    /// 줄 소스
    pub source: SourceSpec,
    /// 스냅샷 출력 경로
    pub output_path: PathBuf,
    /// 세션 타임아웃
    pub player_timeout: Duration,
    /// 관리자 목록 파일 (로스터 기반 역할 판정)
    pub admin_list_path: Option<PathBuf>,
    /// 사용자 정의 프로파일 YAML
    pub profile_path: Option<PathBuf>,
    /// 새 줄이 없을 때의 대기 간격
    pub poll_interval: Duration,
    /// 소스를 열 수 없을 때의 재시도 간격
    pub reopen_backoff: Duration,
    /// 타임아웃 검사 스로틀 간격
    pub sweep_interval: Duration,
    /// 프로파일 기본 연결 윈도우를 덮어쓸 값
    pub correlation_window: Option<Duration>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            game: "enshrouded".to_owned(),
            source: SourceSpec::File {
                path: PathBuf::from("/home/steam/enshrouded/logs/enshrouded_server.log"),
            },
            output_path: PathBuf::from("/var/lib/playerwatch/players.json"),
            player_timeout: Duration::from_secs(300),
            admin_list_path: None,
            profile_path: None,
            poll_interval: Duration::from_millis(100),
            reopen_backoff: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(10),
            correlation_window: None,
        }
    }
}

impl TrackerSettings {
    /// core의 `TrackerConfig`에서 실행 설정을 생성합니다.
    ///
    /// 빈 문자열 경로는 `None`으로, 초/밀리초 값은 `Duration`으로 변환합니다.
    pub fn from_core(core: &TrackerConfig) -> Result<Self, TrackerError> {
        let source = match core.mode.as_str() {
            "native" => SourceSpec::File {
                path: PathBuf::from(&core.log_path),
            },
            "docker" => SourceSpec::docker_logs(&core.docker_binary, &core.container_name),
            other => {
                return Err(TrackerError::Config {
                    field: "tracker.mode".to_owned(),
                    reason: format!("unknown mode '{other}'"),
                });
            }
        };

        let settings = Self {
            game: core.game.clone(),
            source,
            output_path: PathBuf::from(&core.output_json_path),
            player_timeout: Duration::from_secs(core.player_timeout_secs),
            admin_list_path: non_empty_path(&core.admin_list_path),
            profile_path: non_empty_path(&core.profile_path),
            poll_interval: Duration::from_millis(core.poll_interval_ms),
            reopen_backoff: Duration::from_secs(core.reopen_backoff_secs),
            sweep_interval: Duration::from_secs(core.sweep_interval_secs),
            correlation_window: (core.correlation_window_secs > 0)
                .then(|| Duration::from_secs(core.correlation_window_secs)),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TrackerError> {
        let durations = [
            ("player_timeout", self.player_timeout),
            ("poll_interval", self.poll_interval),
            ("reopen_backoff", self.reopen_backoff),
            ("sweep_interval", self.sweep_interval),
        ];
        for (field, value) in durations {
            if value.is_zero() {
                return Err(TrackerError::Config {
                    field: field.to_owned(),
                    reason: "must be greater than 0".to_owned(),
                });
            }
        }

        if self.correlation_window.is_some_and(|w| w.is_zero()) {
            return Err(TrackerError::Config {
                field: "correlation_window".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        match &self.source {
            SourceSpec::File { path } if path.as_os_str().is_empty() => {
                return Err(TrackerError::Config {
                    field: "source".to_owned(),
                    reason: "log path must not be empty".to_owned(),
                });
            }
            SourceSpec::Process { program, .. } if program.is_empty() => {
                return Err(TrackerError::Config {
                    field: "source".to_owned(),
                    reason: "program must not be empty".to_owned(),
                });
            }
            _ => {}
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(TrackerError::Config {
                field: "output_path".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        Ok(())
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

/// 추적기 설정 빌더
#[derive(Default)]
pub struct TrackerSettingsBuilder {
    settings: TrackerSettings,
}

impl TrackerSettingsBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 게임 프로파일 이름을 설정합니다.
    pub fn game(mut self, game: impl Into<String>) -> Self {
        self.settings.game = game.into();
        self
    }

    /// 줄 소스를 설정합니다.
    pub fn source(mut self, source: SourceSpec) -> Self {
        self.settings.source = source;
        self
    }

    /// 스냅샷 출력 경로를 설정합니다.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.output_path = path.into();
        self
    }

    /// 세션 타임아웃을 설정합니다.
    pub fn player_timeout(mut self, timeout: Duration) -> Self {
        self.settings.player_timeout = timeout;
        self
    }

    /// 관리자 목록 파일을 설정합니다.
    pub fn admin_list_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.admin_list_path = Some(path.into());
        self
    }

    /// 사용자 정의 프로파일 YAML을 설정합니다.
    pub fn profile_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.profile_path = Some(path.into());
        self
    }

    /// 대기 간격을 설정합니다.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.settings.poll_interval = interval;
        self
    }

    /// 재시도 간격을 설정합니다.
    pub fn reopen_backoff(mut self, backoff: Duration) -> Self {
        self.settings.reopen_backoff = backoff;
        self
    }

    /// 타임아웃 검사 간격을 설정합니다.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.settings.sweep_interval = interval;
        self
    }

    /// 연결 윈도우를 설정합니다.
    pub fn correlation_window(mut self, window: Duration) -> Self {
        self.settings.correlation_window = Some(window);
        self
    }

    /// 설정을 검증하고 `TrackerSettings`를 생성합니다.
    pub fn build(self) -> Result<TrackerSettings, TrackerError> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}
