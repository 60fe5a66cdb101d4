//! 프로파일 파일 로더 -- YAML 사용자 정의 프로파일을 디스크에서 로드합니다.

use std::path::Path;

use crate::error::TrackerError;

use super::profile::{GameProfile, ProfileSpec};

/// 프로파일 파일 최대 크기
const MAX_PROFILE_FILE_SIZE: u64 = 1024 * 1024; // 1MB

/// 프로파일 파일 로더
pub struct ProfileLoader;

impl ProfileLoader {
    /// 단일 YAML 파일에서 프로파일을 로드하고 컴파일합니다.
    ///
    /// # Errors
    /// - 파일이 없거나 읽을 수 없는 경우
    /// - 파일이 `MAX_PROFILE_FILE_SIZE`를 넘는 경우
    /// - YAML 파싱, 검증, 정규식 컴파일이 실패한 경우
    pub async fn load_file(path: impl AsRef<Path>) -> Result<GameProfile, TrackerError> {
        let path = path.as_ref();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| TrackerError::ProfileLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_PROFILE_FILE_SIZE {
            return Err(TrackerError::ProfileLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_PROFILE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| TrackerError::ProfileLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file: {e}"),
                })?;

        let profile = Self::parse_yaml(&content, &path.display().to_string())?;

        tracing::info!(
            path = %path.display(),
            profile = %profile.name,
            rules = profile.patterns.len(),
            "loaded custom game profile"
        );

        Ok(profile)
    }

    /// YAML 문자열을 파싱하여 프로파일을 생성합니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<GameProfile, TrackerError> {
        let spec: ProfileSpec =
            serde_yaml::from_str(yaml_str).map_err(|e| TrackerError::ProfileLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;

        spec.compile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{EventKind, LogEvent, RoleSpec};
    use playerwatch_core::types::{Identifier, IdentifierKind, Role};
    use std::io::Write;
    use std::time::Duration;

    const CUSTOM: &str = r#"
name: ark
identifier: account
correlation_window_secs: 45
rules:
  - kind: connection_opened
    pattern: 'joined from (?P<identifier>\d+)'
  - kind: identity_confirmed
    pattern: 'Player (?P<name>\w+) spawned'
  - kind: identifier_disconnected
    pattern: 'connection (?P<identifier>\d+) closed'
roles:
  strategy: roster
"#;

    #[test]
    fn parse_valid_yaml() {
        let profile = ProfileLoader::parse_yaml(CUSTOM, "ark.yml").unwrap();
        assert_eq!(profile.name, "ark");
        assert_eq!(profile.correlation_window, Duration::from_secs(45));
        assert_eq!(profile.patterns.identifier_kind(), IdentifierKind::Account);
        assert_eq!(
            profile.roles,
            RoleSpec::Roster {
                admin_role: Role::Admin,
                default_role: Role::Community,
            }
        );
        assert_eq!(
            profile.patterns.classify("client joined from 1234"),
            Some(LogEvent::ConnectionOpened(Identifier::Account(
                "1234".to_owned()
            )))
        );
    }

    #[test]
    fn defaults_apply_for_optional_fields() {
        let yaml = r#"
name: minimal
rules:
  - kind: connection_opened
    pattern: 'conn (?P<identifier>\d+)'
  - kind: identity_confirmed
    pattern: 'name (?P<name>\w+)'
"#;
        let profile = ProfileLoader::parse_yaml(yaml, "minimal.yml").unwrap();
        assert_eq!(profile.correlation_window, Duration::from_secs(30));
        assert_eq!(profile.patterns.identifier_kind(), IdentifierKind::Handle);
        assert_eq!(profile.roles, RoleSpec::default());
        assert!(!profile.patterns.covers(EventKind::AttributeGranted));
    }

    #[test]
    fn parse_invalid_yaml_returns_error() {
        let result = ProfileLoader::parse_yaml("not: [valid: yaml: {{{", "bad.yml");
        assert!(matches!(result, Err(TrackerError::ProfileLoad { .. })));
    }

    #[test]
    fn unknown_event_kind_is_rejected() {
        let yaml = r#"
name: broken
rules:
  - kind: player_teleported
    pattern: 'x (?P<name>\w+)'
"#;
        assert!(ProfileLoader::parse_yaml(yaml, "broken.yml").is_err());
    }

    #[test]
    fn missing_capture_is_rejected() {
        let yaml = r#"
name: nocap
rules:
  - kind: connection_opened
    pattern: 'conn (\d+)'
  - kind: identity_confirmed
    pattern: 'name (?P<name>\w+)'
"#;
        let err = ProfileLoader::parse_yaml(yaml, "nocap.yml").unwrap_err();
        assert!(matches!(err, TrackerError::ProfileValidation { .. }));
    }

    #[tokio::test]
    async fn load_file_reads_profile() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CUSTOM.as_bytes()).unwrap();
        let profile = ProfileLoader::load_file(file.path()).await.unwrap();
        assert_eq!(profile.name, "ark");
    }

    #[tokio::test]
    async fn load_nonexistent_file_returns_error() {
        let result = ProfileLoader::load_file("/nonexistent/path/profile.yml").await;
        assert!(matches!(result, Err(TrackerError::ProfileLoad { .. })));
    }
}
