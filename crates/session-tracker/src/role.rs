//! 역할 판정 전략 구현
//!
//! - [`PermissionTiers`]: 누적된 권한 토큰의 우선순위로 판정
//! - [`AdminRoster`]: 관리자 목록 파일 포함 여부로 판정 (수정 시각 기반 핫 리로드)

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use metrics::counter;
use playerwatch_core::metrics as m;
use playerwatch_core::pipeline::RoleResolver;
use playerwatch_core::types::{Identifier, Role};

/// 권한 등급 -- 토큰 중 하나라도 있으면 `role`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTier {
    role: Role,
    any_of: Vec<String>,
}

impl RoleTier {
    /// 새 등급을 생성합니다.
    pub fn new(role: Role, any_of: Vec<String>) -> Self {
        Self { role, any_of }
    }
}

/// 권한 토큰 우선순위 판정
///
/// 등급을 순서대로 확인하여 처음으로 토큰이 겹치는 등급의 역할을 반환합니다.
/// 결과는 토큰 목록의 내용에만 의존합니다 (순서, 중복 무관).
#[derive(Debug, Clone)]
pub struct PermissionTiers {
    tiers: Vec<RoleTier>,
    default_role: Role,
}

impl PermissionTiers {
    /// 새 판정기를 생성합니다.
    pub fn new(tiers: Vec<RoleTier>, default_role: Role) -> Self {
        Self {
            tiers,
            default_role,
        }
    }
}

impl RoleResolver for PermissionTiers {
    fn name(&self) -> &str {
        "permission-tiers"
    }

    fn resolve(&self, _identifier: &Identifier, permissions: &[String]) -> Role {
        self.tiers
            .iter()
            .find(|tier| tier.any_of.iter().any(|token| permissions.contains(token)))
            .map_or(self.default_role, |tier| tier.role)
    }
}

/// 관리자 목록 기반 판정
///
/// 목록 파일은 한 줄에 식별자 하나이며 빈 줄과 `//`, `#` 주석 줄은 무시합니다.
/// 파일이 사라지거나 읽을 수 없게 되면 경고와 함께 목록을 비웁니다.
#[derive(Debug)]
pub struct AdminRoster {
    path: Option<PathBuf>,
    ids: HashSet<String>,
    loaded_mtime: Option<SystemTime>,
    admin_role: Role,
    default_role: Role,
}

impl AdminRoster {
    /// 목록 파일을 처음 로드하여 판정기를 생성합니다.
    ///
    /// 파일이 없거나 읽을 수 없으면 빈 목록으로 시작합니다.
    pub fn new(path: Option<PathBuf>, admin_role: Role, default_role: Role) -> Self {
        let mut roster = Self {
            path,
            ids: HashSet::new(),
            loaded_mtime: None,
            admin_role,
            default_role,
        };
        if let Some(path) = roster.path.clone() {
            match std::fs::metadata(&path) {
                Ok(meta) => roster.load(&path, meta.modified().ok()),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "admin list not found, starting with an empty roster"
                ),
            }
        }
        roster
    }

    /// 목록에 있는 식별자 수
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// 목록이 비어 있는지 확인
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// 식별자가 목록에 있는지 확인
    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.ids.contains(&identifier.as_key())
    }

    fn load(&mut self, path: &Path, mtime: Option<SystemTime>) {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                self.ids = parse_roster(&content);
                self.loaded_mtime = mtime;
                counter!(m::TRACKER_ROSTER_RELOADS_TOTAL).increment(1);
                tracing::info!(
                    path = %path.display(),
                    admins = self.ids.len(),
                    "admin list loaded"
                );
            }
            Err(e) => {
                // 같은 mtime으로는 다시 시도하지 않음
                self.ids.clear();
                self.loaded_mtime = mtime;
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "failed to read admin list, clearing roster"
                );
            }
        }
    }
}

/// 목록 파일 내용을 식별자 집합으로 변환합니다.
pub fn parse_roster(content: &str) -> HashSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("//") && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

impl RoleResolver for AdminRoster {
    fn name(&self) -> &str {
        "admin-roster"
    }

    fn resolve(&self, identifier: &Identifier, _permissions: &[String]) -> Role {
        if self.contains(identifier) {
            self.admin_role
        } else {
            self.default_role
        }
    }

    fn reload_if_changed(&mut self) -> bool {
        let Some(path) = self.path.clone() else {
            return false;
        };

        match std::fs::metadata(&path) {
            Ok(meta) => {
                let mtime = meta.modified().ok();
                let advanced = match (mtime, self.loaded_mtime) {
                    (Some(current), Some(loaded)) => current > loaded,
                    (_, None) => true,
                    (None, Some(_)) => false,
                };
                if advanced {
                    tracing::info!(path = %path.display(), "admin list changed, reloading");
                    self.load(&path, mtime);
                }
                advanced
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.loaded_mtime = None;
                if self.ids.is_empty() {
                    return false;
                }
                tracing::warn!(path = %path.display(), "admin list removed, clearing roster");
                self.ids.clear();
                true
            }
            Err(e) => {
                self.loaded_mtime = None;
                if self.ids.is_empty() {
                    return false;
                }
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "admin list unreadable, clearing roster"
                );
                self.ids.clear();
                true
            }
        }
    }
}
