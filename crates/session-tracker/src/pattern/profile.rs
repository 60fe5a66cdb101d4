//! 게임 프로파일 -- 분류 규칙, 식별자 형식, 연결 윈도우, 역할 판정 전략의 묶음
//!
//! 내장 프로파일은 컴파일 타임 레지스트리([`REGISTRY`])에 등록되며
//! 설정의 `tracker.game` 값으로 선택됩니다. 사용자 정의 프로파일은
//! 같은 [`ProfileSpec`] 스키마의 YAML 파일로 정의합니다.
//!
//! # YAML 스키마
//! ```yaml
//! name: enshrouded
//! identifier: handle
//! correlation_window_secs: 30
//! rules:
//!   - kind: connection_opened
//!     pattern: 'added\. Player handle: (?P<identifier>\d+)\(\d+\)'
//! roles:
//!   strategy: tiers
//!   default_role: Guest
//!   tiers:
//!     - role: Admin
//!       any_of: [CanKickBan]
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use playerwatch_core::pipeline::RoleResolver;
use playerwatch_core::types::{IdentifierKind, Role};

use crate::config::TrackerSettings;
use crate::error::TrackerError;
use crate::role::{AdminRoster, PermissionTiers, RoleTier};

use super::loader::ProfileLoader;
use super::{EventKind, PatternRule, PatternSet};

/// 프로파일 하나에 허용되는 최대 규칙 수
const MAX_RULES: usize = 64;
/// 정규식 한 개의 최대 길이
const MAX_PATTERN_LEN: usize = 4096;
/// 연결 윈도우 기본값 (초)
const DEFAULT_WINDOW_SECS: u64 = 30;

/// 컴파일 타임 프로파일 레지스트리 -- 게임 이름과 프로파일 생성자의 쌍
pub const REGISTRY: &[(&str, fn() -> ProfileSpec)] =
    &[("enshrouded", enshrouded), ("valheim", valheim)];

/// 프로파일 정의 (YAML 역직렬화 대상)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSpec {
    /// 프로파일 이름
    pub name: String,
    /// 식별자 해석 방식
    #[serde(default)]
    pub identifier: IdentifierKind,
    /// 이름 연결 윈도우 (초)
    #[serde(default = "default_window_secs")]
    pub correlation_window_secs: u64,
    /// 분류 규칙 (우선순위 순서)
    pub rules: Vec<RuleSpec>,
    /// 역할 판정 전략
    #[serde(default)]
    pub roles: RoleSpec,
}

fn default_window_secs() -> u64 {
    DEFAULT_WINDOW_SECS
}

/// 분류 규칙 정의
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    /// 이벤트 종류
    pub kind: EventKind,
    /// 정규식 (필수 캡처 그룹 포함)
    pub pattern: String,
}

impl RuleSpec {
    fn new(kind: EventKind, pattern: &str) -> Self {
        Self {
            kind,
            pattern: pattern.to_owned(),
        }
    }
}

/// 역할 판정 전략 정의
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RoleSpec {
    /// 권한 토큰 우선순위
    Tiers {
        /// 우선순위 순서의 등급 목록
        #[serde(default)]
        tiers: Vec<TierSpec>,
        /// 어떤 등급에도 해당하지 않을 때의 역할
        #[serde(default)]
        default_role: Role,
    },
    /// 관리자 목록 파일 포함 여부
    Roster {
        /// 목록에 있는 식별자의 역할
        #[serde(default = "admin_role")]
        admin_role: Role,
        /// 목록에 없는 식별자의 역할
        #[serde(default = "community_role")]
        default_role: Role,
    },
}

fn admin_role() -> Role {
    Role::Admin
}

fn community_role() -> Role {
    Role::Community
}

impl Default for RoleSpec {
    fn default() -> Self {
        Self::Tiers {
            tiers: Vec::new(),
            default_role: Role::Guest,
        }
    }
}

/// 권한 등급 정의
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSpec {
    /// 부여할 역할
    pub role: Role,
    /// 이 중 하나라도 있으면 해당 역할
    pub any_of: Vec<String>,
}

impl ProfileSpec {
    /// 프로파일 정의를 검증합니다.
    pub fn validate(&self) -> Result<(), TrackerError> {
        let fail = |reason: String| TrackerError::ProfileValidation {
            profile: if self.name.is_empty() {
                "(empty)".to_owned()
            } else {
                self.name.clone()
            },
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(fail("profile name must not be empty".to_owned()));
        }
        if self.rules.is_empty() {
            return Err(fail("at least one rule is required".to_owned()));
        }
        if self.rules.len() > MAX_RULES {
            return Err(fail(format!("too many rules: max {MAX_RULES}")));
        }
        for required in [EventKind::ConnectionOpened, EventKind::IdentityConfirmed] {
            if !self.rules.iter().any(|rule| rule.kind == required) {
                return Err(fail(format!("missing a '{required}' rule")));
            }
        }
        if let Some(rule) = self.rules.iter().find(|r| r.pattern.len() > MAX_PATTERN_LEN) {
            return Err(fail(format!(
                "'{}' pattern exceeds {MAX_PATTERN_LEN} characters",
                rule.kind
            )));
        }
        if self.correlation_window_secs == 0 {
            return Err(fail(
                "correlation_window_secs must be greater than 0".to_owned(),
            ));
        }
        if let RoleSpec::Tiers { tiers, .. } = &self.roles {
            if let Some(tier) = tiers.iter().find(|tier| tier.any_of.is_empty()) {
                return Err(fail(format!("tier '{}' has no tokens", tier.role)));
            }
        }
        Ok(())
    }

    /// 검증 후 정규식을 컴파일하여 [`GameProfile`]을 생성합니다.
    pub fn compile(self) -> Result<GameProfile, TrackerError> {
        self.validate()?;

        let rules = self
            .rules
            .iter()
            .map(|rule| {
                PatternRule::new(rule.kind, &rule.pattern).map_err(|e| {
                    TrackerError::ProfileValidation {
                        profile: self.name.clone(),
                        reason: format!("invalid '{}' rule: {e}", rule.kind),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GameProfile {
            name: self.name,
            correlation_window: Duration::from_secs(self.correlation_window_secs),
            patterns: PatternSet::new(self.identifier, rules),
            roles: self.roles,
        })
    }
}

/// 컴파일된 게임 프로파일
#[derive(Debug, Clone)]
pub struct GameProfile {
    /// 프로파일 이름
    pub name: String,
    /// 이름 연결 윈도우
    pub correlation_window: Duration,
    /// 분류 규칙
    pub patterns: PatternSet,
    /// 역할 판정 전략
    pub roles: RoleSpec,
}

impl GameProfile {
    /// 내장 프로파일을 이름으로 찾아 컴파일합니다.
    pub fn builtin(name: &str) -> Result<Self, TrackerError> {
        let (_, constructor) = REGISTRY
            .iter()
            .find(|(game, _)| *game == name)
            .ok_or_else(|| TrackerError::UnknownGame(name.to_owned()))?;
        constructor().compile()
    }

    /// 등록된 내장 프로파일 이름 목록
    pub fn builtin_names() -> impl Iterator<Item = &'static str> {
        REGISTRY.iter().map(|(name, _)| *name)
    }

    /// 설정에 따라 프로파일을 결정합니다.
    ///
    /// `profile_path`가 있으면 YAML 파일을, 없으면 `game` 이름의 내장 프로파일을
    /// 사용합니다. 설정의 연결 윈도우 값이 있으면 프로파일 기본값을 덮어씁니다.
    pub async fn from_settings(settings: &TrackerSettings) -> Result<Self, TrackerError> {
        let mut profile = match &settings.profile_path {
            Some(path) => ProfileLoader::load_file(path).await?,
            None => Self::builtin(&settings.game)?,
        };
        if let Some(window) = settings.correlation_window {
            profile.correlation_window = window;
        }
        Ok(profile)
    }

    /// 프로파일의 역할 판정 전략에 맞는 [`RoleResolver`]를 생성합니다.
    pub fn role_resolver(&self, admin_list_path: Option<&Path>) -> Box<dyn RoleResolver> {
        match &self.roles {
            RoleSpec::Tiers {
                tiers,
                default_role,
            } => Box::new(PermissionTiers::new(
                tiers
                    .iter()
                    .map(|tier| RoleTier::new(tier.role, tier.any_of.clone()))
                    .collect(),
                *default_role,
            )),
            RoleSpec::Roster {
                admin_role,
                default_role,
            } => {
                if admin_list_path.is_none() {
                    tracing::warn!(
                        profile = %self.name,
                        "roster role strategy without admin_list_path, every session gets the default role"
                    );
                }
                Box::new(AdminRoster::new(
                    admin_list_path.map(Path::to_path_buf),
                    *admin_role,
                    *default_role,
                ))
            }
        }
    }
}

/// Enshrouded 전용 서버 프로파일
///
/// 숫자 핸들, 30초 윈도우, 권한 토큰 기반 역할.
pub fn enshrouded() -> ProfileSpec {
    ProfileSpec {
        name: "enshrouded".to_owned(),
        identifier: IdentifierKind::Handle,
        correlation_window_secs: 30,
        rules: vec![
            RuleSpec::new(
                EventKind::ConnectionOpened,
                r"added\. Player handle: (?P<identifier>\d+)\(\d+\)",
            ),
            RuleSpec::new(
                EventKind::IdentityConfirmed,
                r"Player '(?P<name>[^']+)' logged in with Permissions:",
            ),
            RuleSpec::new(
                EventKind::AttributeGranted,
                r"(?:^|\s)- (?P<token>Can[A-Za-z]+)\s*$",
            ),
            RuleSpec::new(
                EventKind::SessionTerminated,
                r"Remove Player '(?P<name>[^']+)'",
            ),
            RuleSpec::new(
                EventKind::IdentifierDisconnected,
                r"(?:Disconnecting|Removed) peer #(?P<identifier>\d+)",
            ),
        ],
        roles: RoleSpec::Tiers {
            tiers: vec![
                TierSpec {
                    role: Role::Admin,
                    any_of: vec!["CanKickBan".to_owned()],
                },
                TierSpec {
                    role: Role::Community,
                    any_of: vec![
                        "CanAccessInventories".to_owned(),
                        "CanEditBase".to_owned(),
                        "CanExtendBase".to_owned(),
                    ],
                },
            ],
            default_role: Role::Guest,
        },
    }
}

/// Valheim 전용 서버 프로파일
///
/// 17자리 SteamID, 60초 윈도우, 관리자 목록 기반 역할.
pub fn valheim() -> ProfileSpec {
    ProfileSpec {
        name: "valheim".to_owned(),
        identifier: IdentifierKind::Account,
        correlation_window_secs: 60,
        rules: vec![
            RuleSpec::new(
                EventKind::ConnectionOpened,
                r"Got connection SteamID (?P<identifier>\d{17})",
            ),
            RuleSpec::new(
                EventKind::IdentityConfirmed,
                r"Got character ZDOID from (?P<name>[^:]+)\s+:",
            ),
            RuleSpec::new(
                EventKind::IdentifierDisconnected,
                r"Closing socket (?P<identifier>\d{17})",
            ),
        ],
        roles: RoleSpec::Roster {
            admin_role: Role::Admin,
            default_role: Role::Community,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::LogEvent;
    use playerwatch_core::types::Identifier;

    #[test]
    fn registry_matches_core_builtin_games() {
        let names: Vec<_> = GameProfile::builtin_names().collect();
        assert_eq!(names, playerwatch_core::config::BUILTIN_GAMES);
    }

    #[test]
    fn all_builtin_profiles_compile() {
        for name in GameProfile::builtin_names() {
            let profile = GameProfile::builtin(name).unwrap();
            assert_eq!(profile.name, name);
            assert!(profile.patterns.covers(EventKind::ConnectionOpened));
            assert!(profile.patterns.covers(EventKind::IdentityConfirmed));
        }
    }

    #[test]
    fn unknown_builtin_is_rejected() {
        let err = GameProfile::builtin("minecraft").unwrap_err();
        assert!(matches!(err, TrackerError::UnknownGame(ref game) if game == "minecraft"));
    }

    #[test]
    fn enshrouded_classifies_server_lines() {
        let profile = GameProfile::builtin("enshrouded").unwrap();
        let p = &profile.patterns;
        assert_eq!(profile.correlation_window, Duration::from_secs(30));

        assert_eq!(
            p.classify("[I 20:14:04,431] [online] Remote player added. Player handle: 42(7)"),
            Some(LogEvent::ConnectionOpened(Identifier::Handle(42)))
        );
        assert_eq!(
            p.classify("[I 20:14:09,002] [server] Player 'Alice' logged in with Permissions:"),
            Some(LogEvent::IdentityConfirmed("Alice".to_owned()))
        );
        assert_eq!(
            p.classify("[I 20:14:09,002]    - CanKickBan"),
            Some(LogEvent::AttributeGranted("CanKickBan".to_owned()))
        );
        assert_eq!(
            p.classify("- CanEditBase"),
            Some(LogEvent::AttributeGranted("CanEditBase".to_owned()))
        );
        assert_eq!(
            p.classify("[I 21:00:00,000] [server] Remove Player 'Alice'"),
            Some(LogEvent::SessionTerminated("Alice".to_owned()))
        );
        assert_eq!(
            p.classify("[I 21:00:00,100] [online] Disconnecting peer #42"),
            Some(LogEvent::IdentifierDisconnected(Identifier::Handle(42)))
        );
        assert_eq!(
            p.classify("Removed peer #42"),
            Some(LogEvent::IdentifierDisconnected(Identifier::Handle(42)))
        );
    }

    #[test]
    fn enshrouded_ignores_machine_login() {
        let profile = GameProfile::builtin("enshrouded").unwrap();
        assert_eq!(
            profile
                .patterns
                .classify("[server] Player '76561198(1)' logged in"),
            None
        );
    }

    #[test]
    fn valheim_classifies_server_lines() {
        let profile = GameProfile::builtin("valheim").unwrap();
        let p = &profile.patterns;
        assert_eq!(profile.correlation_window, Duration::from_secs(60));

        assert_eq!(
            p.classify("06/14/2024 20:01:02: Got connection SteamID 76561198000000001"),
            Some(LogEvent::ConnectionOpened(Identifier::Account(
                "76561198000000001".to_owned()
            )))
        );
        assert_eq!(
            p.classify("06/14/2024 20:01:40: Got character ZDOID from Ragnar Lothbrok : -1234:1"),
            Some(LogEvent::IdentityConfirmed("Ragnar Lothbrok".to_owned()))
        );
        assert_eq!(
            p.classify("06/14/2024 21:00:00: Closing socket 76561198000000001"),
            Some(LogEvent::IdentifierDisconnected(Identifier::Account(
                "76561198000000001".to_owned()
            )))
        );
        // 16자리는 SteamID가 아님
        assert_eq!(p.classify("Got connection SteamID 7656119800000000"), None);
    }

    #[test]
    fn validate_requires_connection_and_identity_rules() {
        let mut spec = valheim();
        spec.rules.retain(|r| r.kind != EventKind::IdentityConfirmed);
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("identity_confirmed"));
    }

    #[test]
    fn validate_rejects_zero_window() {
        let mut spec = enshrouded();
        spec.correlation_window_secs = 0;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_tier() {
        let mut spec = enshrouded();
        spec.roles = RoleSpec::Tiers {
            tiers: vec![TierSpec {
                role: Role::Admin,
                any_of: vec![],
            }],
            default_role: Role::Guest,
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn compile_reports_rule_without_capture() {
        let mut spec = enshrouded();
        spec.rules[0].pattern = r"Player handle: (\d+)".to_owned();
        let err = spec.compile().unwrap_err();
        assert!(matches!(err, TrackerError::ProfileValidation { .. }));
        assert!(err.to_string().contains("connection_opened"));
    }

    #[test]
    fn role_resolver_follows_strategy() {
        let enshrouded = GameProfile::builtin("enshrouded").unwrap();
        let resolver = enshrouded.role_resolver(None);
        assert_eq!(
            resolver.resolve(&Identifier::Handle(1), &["CanKickBan".to_owned()]),
            Role::Admin
        );

        let valheim = GameProfile::builtin("valheim").unwrap();
        let resolver = valheim.role_resolver(None);
        assert_eq!(
            resolver.resolve(&Identifier::Account("76561198000000001".to_owned()), &[]),
            Role::Community
        );
    }

    #[tokio::test]
    async fn from_settings_applies_window_override() {
        let settings = crate::config::TrackerSettingsBuilder::new()
            .game("valheim")
            .correlation_window(Duration::from_secs(5))
            .build()
            .unwrap();
        let profile = GameProfile::from_settings(&settings).await.unwrap();
        assert_eq!(profile.name, "valheim");
        assert_eq!(profile.correlation_window, Duration::from_secs(5));
    }
}
