//! 상관 저장소 -- 대기 식별자와 활성 세션을 소유하는 유일한 쓰기 주체
//!
//! 이벤트는 [`CorrelationStore::apply`]로 적용되며 시각은 호출자가 넘겨 줍니다.
//! 두 매핑 모두 생성 순서(`seq`)를 기억하여 연결 우선순위와 스냅샷 순서를 정합니다.
//!
//! # 대기 식별자 상태 전이
//! ```text
//! Started --(IdentityConfirmed)--> AwaitingAttributes --(다른 식별자 연결)--> Linked
//! ```

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use playerwatch_core::pipeline::RoleResolver;
use playerwatch_core::types::{ActiveSession, Identifier};

use crate::pattern::LogEvent;

/// 대기 식별자의 생명주기 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingStatus {
    /// 접속만 확인됨
    Started,
    /// 이름 연결 완료, 권한 토큰 수신 중
    AwaitingAttributes,
    /// 다른 식별자가 연결되어 더 이상 토큰을 받지 않음
    Linked,
}

/// 접속 이벤트로 생성된 대기 식별자
#[derive(Debug, Clone)]
pub struct PendingIdentity {
    /// 전송 계층 식별자
    pub identifier: Identifier,
    /// 연결된 표시 이름
    pub name: Option<String>,
    /// 접속 시각 (연결 윈도우 기준)
    pub opened_at: SystemTime,
    /// 생명주기 상태
    pub status: PendingStatus,
    seq: u64,
}

#[derive(Debug, Clone)]
struct SessionEntry {
    session: ActiveSession,
    seq: u64,
}

/// 이벤트 적용 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// 상태 변화 없음
    Unchanged,
    /// 대기 식별자만 변경됨
    PendingChanged,
    /// 활성 세션이 변경됨 (스냅샷 기록 필요)
    SessionsChanged,
    /// 이름을 연결할 대기 식별자가 없음
    CorrelationFailed,
}

/// 상관 저장소
pub struct CorrelationStore {
    pending: HashMap<Identifier, PendingIdentity>,
    sessions: HashMap<String, SessionEntry>,
    next_seq: u64,
    window: Duration,
    resolver: Box<dyn RoleResolver>,
}

impl CorrelationStore {
    /// 연결 윈도우와 역할 판정기로 빈 저장소를 생성합니다.
    pub fn new(window: Duration, resolver: Box<dyn RoleResolver>) -> Self {
        Self {
            pending: HashMap::new(),
            sessions: HashMap::new(),
            next_seq: 0,
            window,
            resolver,
        }
    }

    /// 이벤트를 적용합니다.
    pub fn apply(&mut self, event: LogEvent, now: SystemTime) -> ApplyOutcome {
        match event {
            LogEvent::ConnectionOpened(identifier) => self.open(identifier, now),
            LogEvent::IdentityConfirmed(name) => self.confirm(name, now),
            LogEvent::AttributeGranted(token) => self.grant(token),
            LogEvent::SessionTerminated(name) => self.terminate(&name),
            LogEvent::IdentifierDisconnected(identifier) => self.disconnect(&identifier),
        }
    }

    fn open(&mut self, identifier: Identifier, now: SystemTime) -> ApplyOutcome {
        if self.pending.contains_key(&identifier) {
            tracing::debug!(identifier = %identifier, "connection for known identifier ignored");
            return ApplyOutcome::Unchanged;
        }
        let seq = self.bump_seq();
        tracing::debug!(identifier = %identifier, "connection opened");
        self.pending.insert(
            identifier.clone(),
            PendingIdentity {
                identifier,
                name: None,
                opened_at: now,
                status: PendingStatus::Started,
                seq,
            },
        );
        ApplyOutcome::PendingChanged
    }

    fn confirm(&mut self, name: String, now: SystemTime) -> ApplyOutcome {
        let window = self.window;
        let candidate = self
            .pending
            .values()
            .filter(|p| p.name.is_none() && within(p.opened_at, now, window))
            .min_by_key(|p| p.seq)
            .map(|p| p.identifier.clone());

        let Some(identifier) = candidate else {
            tracing::warn!(
                name = %name,
                window_secs = window.as_secs(),
                "no pending identifier within the correlation window, dropping identity"
            );
            return ApplyOutcome::CorrelationFailed;
        };

        for other in self.pending.values_mut() {
            if other.status == PendingStatus::AwaitingAttributes {
                other.status = PendingStatus::Linked;
            }
        }
        if let Some(pending) = self.pending.get_mut(&identifier) {
            pending.name = Some(name.clone());
            pending.status = PendingStatus::AwaitingAttributes;
        }

        let role = self.resolver.resolve(&identifier, &[]);
        let seq = match self.sessions.get(&name) {
            Some(previous) => {
                tracing::warn!(
                    name = %name,
                    previous = %previous.session.id,
                    identifier = %identifier,
                    "display name already active, replacing session"
                );
                previous.seq
            }
            None => self.bump_seq(),
        };

        tracing::info!(
            name = %name,
            identifier = %identifier,
            role = %role,
            "session started"
        );
        self.sessions.insert(
            name.clone(),
            SessionEntry {
                session: ActiveSession {
                    name,
                    id: identifier,
                    permissions: Vec::new(),
                    role,
                    last_seen: now,
                },
                seq,
            },
        );
        ApplyOutcome::SessionsChanged
    }

    fn grant(&mut self, token: String) -> ApplyOutcome {
        let sessions = &self.sessions;
        let target = self
            .pending
            .values()
            .filter(|p| p.status == PendingStatus::AwaitingAttributes)
            .filter_map(|p| {
                let name = p.name.as_ref()?;
                sessions.contains_key(name).then_some((p.seq, name.clone()))
            })
            .min_by_key(|(seq, _)| *seq)
            .map(|(_, name)| name);

        let Some(name) = target else {
            tracing::debug!(token = %token, "no session awaiting attributes, token ignored");
            return ApplyOutcome::Unchanged;
        };

        let Some(entry) = self.sessions.get_mut(&name) else {
            return ApplyOutcome::Unchanged;
        };
        entry.session.permissions.push(token);
        let role = self
            .resolver
            .resolve(&entry.session.id, &entry.session.permissions);
        if role != entry.session.role {
            tracing::info!(name = %name, role = %role, "session role updated");
        }
        entry.session.role = role;
        ApplyOutcome::SessionsChanged
    }

    fn terminate(&mut self, name: &str) -> ApplyOutcome {
        let removed = self.sessions.remove(name).is_some();
        let before = self.pending.len();
        self.pending
            .retain(|_, p| p.name.as_deref() != Some(name));
        let pending_removed = self.pending.len() != before;

        if removed {
            tracing::info!(name = %name, "session terminated");
            ApplyOutcome::SessionsChanged
        } else if pending_removed {
            ApplyOutcome::PendingChanged
        } else {
            ApplyOutcome::Unchanged
        }
    }

    fn disconnect(&mut self, identifier: &Identifier) -> ApplyOutcome {
        let pending_removed = self.pending.remove(identifier).is_some();
        let before = self.sessions.len();
        self.sessions.retain(|name, entry| {
            let owned = entry.session.id == *identifier;
            if owned {
                tracing::info!(name = %name, identifier = %identifier, "session disconnected");
            }
            !owned
        });

        if self.sessions.len() != before {
            ApplyOutcome::SessionsChanged
        } else if pending_removed {
            ApplyOutcome::PendingChanged
        } else {
            ApplyOutcome::Unchanged
        }
    }

    /// 모든 활성 세션의 마지막 활동 시각을 갱신합니다.
    pub fn touch_all(&mut self, now: SystemTime) {
        for entry in self.sessions.values_mut() {
            entry.session.last_seen = now;
        }
    }

    /// 마지막 활동 이후 `timeout`보다 오래된 세션을 제거하고 이름을 반환합니다.
    ///
    /// 대기 식별자는 타임아웃 대상이 아닙니다.
    pub fn evict_stale(&mut self, now: SystemTime, timeout: Duration) -> Vec<String> {
        let mut evicted: Vec<(u64, String)> = self
            .sessions
            .iter()
            .filter(|(_, entry)| {
                now.duration_since(entry.session.last_seen)
                    .is_ok_and(|age| age > timeout)
            })
            .map(|(name, entry)| (entry.seq, name.clone()))
            .collect();
        evicted.sort_unstable();

        for (_, name) in &evicted {
            self.sessions.remove(name);
            tracing::info!(name = %name, timeout_secs = timeout.as_secs(), "session evicted by timeout");
        }
        evicted.into_iter().map(|(_, name)| name).collect()
    }

    /// 역할 판정기의 외부 상태 변경을 확인합니다.
    pub fn reload_roles(&mut self) -> bool {
        self.resolver.reload_if_changed()
    }

    /// 생성 순서대로 정렬된 활성 세션 목록
    pub fn snapshot(&self) -> Vec<ActiveSession> {
        let mut entries: Vec<&SessionEntry> = self.sessions.values().collect();
        entries.sort_unstable_by_key(|entry| entry.seq);
        entries.into_iter().map(|e| e.session.clone()).collect()
    }

    /// 이름으로 활성 세션을 조회합니다.
    pub fn session(&self, name: &str) -> Option<&ActiveSession> {
        self.sessions.get(name).map(|entry| &entry.session)
    }

    /// 식별자로 대기 식별자를 조회합니다.
    pub fn pending(&self, identifier: &Identifier) -> Option<&PendingIdentity> {
        self.pending.get(identifier)
    }

    /// 활성 세션 수
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// 대기 식별자 수
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// 연결 윈도우
    pub fn window(&self) -> Duration {
        self.window
    }

    /// 역할 판정기 이름
    pub fn resolver_name(&self) -> &str {
        self.resolver.name()
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

/// `opened_at`이 `now` 기준 윈도우 안에 있는지 확인합니다.
///
/// 시계가 뒤로 간 경우(`now < opened_at`)는 경과 0으로 봅니다.
fn within(opened_at: SystemTime, now: SystemTime, window: Duration) -> bool {
    now.duration_since(opened_at)
        .map_or(true, |elapsed| elapsed < window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::GameProfile;
    use playerwatch_core::types::Role;
    use std::time::UNIX_EPOCH;

    fn t(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
    }

    fn enshrouded_store() -> CorrelationStore {
        let profile = GameProfile::builtin("enshrouded").unwrap();
        CorrelationStore::new(profile.correlation_window, profile.role_resolver(None))
    }

    fn open(store: &mut CorrelationStore, handle: u64, at: SystemTime) -> ApplyOutcome {
        store.apply(LogEvent::ConnectionOpened(Identifier::Handle(handle)), at)
    }

    fn confirm(store: &mut CorrelationStore, name: &str, at: SystemTime) -> ApplyOutcome {
        store.apply(LogEvent::IdentityConfirmed(name.to_owned()), at)
    }

    fn grant(store: &mut CorrelationStore, token: &str, at: SystemTime) -> ApplyOutcome {
        store.apply(LogEvent::AttributeGranted(token.to_owned()), at)
    }

    #[test]
    fn connection_creates_pending_once() {
        let mut store = enshrouded_store();
        assert_eq!(open(&mut store, 42, t(0)), ApplyOutcome::PendingChanged);
        assert_eq!(open(&mut store, 42, t(5)), ApplyOutcome::Unchanged);
        assert_eq!(store.pending_count(), 1);
        let pending = store.pending(&Identifier::Handle(42)).unwrap();
        assert_eq!(pending.opened_at, t(0));
        assert_eq!(pending.status, PendingStatus::Started);
    }

    #[test]
    fn confirm_within_window_creates_session() {
        let mut store = enshrouded_store();
        open(&mut store, 42, t(0));
        assert_eq!(confirm(&mut store, "Alice", t(29)), ApplyOutcome::SessionsChanged);

        let session = store.session("Alice").unwrap();
        assert_eq!(session.id, Identifier::Handle(42));
        assert_eq!(session.role, Role::Guest);
        assert!(session.permissions.is_empty());
        assert_eq!(
            store.pending(&Identifier::Handle(42)).unwrap().status,
            PendingStatus::AwaitingAttributes
        );
    }

    #[test]
    fn confirm_outside_window_fails() {
        let mut store = enshrouded_store();
        open(&mut store, 42, t(0));
        assert_eq!(confirm(&mut store, "Alice", t(30)), ApplyOutcome::CorrelationFailed);
        assert_eq!(store.active_count(), 0);
        assert!(store.pending(&Identifier::Handle(42)).unwrap().name.is_none());
    }

    #[test]
    fn confirm_without_pending_fails() {
        let mut store = enshrouded_store();
        assert_eq!(confirm(&mut store, "Ghost", t(0)), ApplyOutcome::CorrelationFailed);
    }

    #[test]
    fn confirm_links_first_created_pending() {
        let mut store = enshrouded_store();
        open(&mut store, 9, t(0));
        open(&mut store, 3, t(1));
        confirm(&mut store, "Alice", t(2));

        assert_eq!(store.active_count(), 1);
        assert_eq!(store.session("Alice").unwrap().id, Identifier::Handle(9));
        assert!(store.pending(&Identifier::Handle(3)).unwrap().name.is_none());

        confirm(&mut store, "Bob", t(3));
        assert_eq!(store.session("Bob").unwrap().id, Identifier::Handle(3));
    }

    #[test]
    fn new_link_moves_previous_awaiting_to_linked() {
        let mut store = enshrouded_store();
        open(&mut store, 1, t(0));
        open(&mut store, 2, t(0));
        confirm(&mut store, "Alice", t(1));
        confirm(&mut store, "Bob", t(2));

        assert_eq!(
            store.pending(&Identifier::Handle(1)).unwrap().status,
            PendingStatus::Linked
        );
        assert_eq!(
            store.pending(&Identifier::Handle(2)).unwrap().status,
            PendingStatus::AwaitingAttributes
        );

        grant(&mut store, "CanKickBan", t(3));
        assert_eq!(store.session("Bob").unwrap().role, Role::Admin);
        assert_eq!(store.session("Alice").unwrap().role, Role::Guest);
    }

    #[test]
    fn grant_accumulates_and_recomputes_role() {
        let mut store = enshrouded_store();
        open(&mut store, 42, t(0));
        confirm(&mut store, "Alice", t(1));

        assert_eq!(grant(&mut store, "CanEditBase", t(1)), ApplyOutcome::SessionsChanged);
        assert_eq!(store.session("Alice").unwrap().role, Role::Community);
        grant(&mut store, "CanKickBan", t(1));
        grant(&mut store, "CanKickBan", t(1));

        let session = store.session("Alice").unwrap();
        assert_eq!(session.role, Role::Admin);
        assert_eq!(
            session.permissions,
            vec!["CanEditBase", "CanKickBan", "CanKickBan"]
        );
    }

    #[test]
    fn grant_without_awaiting_session_is_noop() {
        let mut store = enshrouded_store();
        assert_eq!(grant(&mut store, "CanKickBan", t(0)), ApplyOutcome::Unchanged);

        open(&mut store, 42, t(0));
        assert_eq!(grant(&mut store, "CanKickBan", t(0)), ApplyOutcome::Unchanged);
    }

    #[test]
    fn grant_skips_awaiting_pending_whose_session_is_gone() {
        let mut store = enshrouded_store();
        open(&mut store, 1, t(0));
        confirm(&mut store, "Alice", t(1));
        store.evict_stale(t(1000), Duration::from_secs(10));
        assert_eq!(store.active_count(), 0);
        assert_eq!(grant(&mut store, "CanKickBan", t(1000)), ApplyOutcome::Unchanged);
    }

    #[test]
    fn terminate_removes_session_and_pending() {
        let mut store = enshrouded_store();
        open(&mut store, 42, t(0));
        confirm(&mut store, "Alice", t(1));

        assert_eq!(
            store.apply(LogEvent::SessionTerminated("Alice".to_owned()), t(2)),
            ApplyOutcome::SessionsChanged
        );
        assert_eq!(store.active_count(), 0);
        assert_eq!(store.pending_count(), 0);

        // 두 번째 적용은 변화 없음
        assert_eq!(
            store.apply(LogEvent::SessionTerminated("Alice".to_owned()), t(3)),
            ApplyOutcome::Unchanged
        );
    }

    #[test]
    fn disconnect_removes_pending_and_owned_sessions() {
        let mut store = enshrouded_store();
        open(&mut store, 42, t(0));
        open(&mut store, 43, t(0));
        confirm(&mut store, "Alice", t(1));

        assert_eq!(
            store.apply(LogEvent::IdentifierDisconnected(Identifier::Handle(42)), t(2)),
            ApplyOutcome::SessionsChanged
        );
        assert_eq!(store.active_count(), 0);
        assert!(store.pending(&Identifier::Handle(42)).is_none());
        assert!(store.pending(&Identifier::Handle(43)).is_some());

        assert_eq!(
            store.apply(LogEvent::IdentifierDisconnected(Identifier::Handle(43)), t(3)),
            ApplyOutcome::PendingChanged
        );
        assert_eq!(
            store.apply(LogEvent::IdentifierDisconnected(Identifier::Handle(43)), t(4)),
            ApplyOutcome::Unchanged
        );
    }

    #[test]
    fn reused_name_overwrites_and_keeps_position() {
        let mut store = enshrouded_store();
        open(&mut store, 1, t(0));
        confirm(&mut store, "Alice", t(1));
        open(&mut store, 2, t(2));
        confirm(&mut store, "Bob", t(3));
        open(&mut store, 3, t(4));
        confirm(&mut store, "Alice", t(5));

        let names: Vec<_> = store.snapshot().into_iter().map(|s| (s.name, s.id)).collect();
        assert_eq!(
            names,
            vec![
                ("Alice".to_owned(), Identifier::Handle(3)),
                ("Bob".to_owned(), Identifier::Handle(2)),
            ]
        );
    }

    #[test]
    fn evict_uses_strict_timeout() {
        let mut store = enshrouded_store();
        open(&mut store, 1, t(0));
        confirm(&mut store, "Alice", t(0));

        assert!(store.evict_stale(t(60), Duration::from_secs(60)).is_empty());
        assert_eq!(
            store.evict_stale(t(61), Duration::from_secs(60)),
            vec!["Alice".to_owned()]
        );
        // 대기 식별자는 남아 있음
        assert_eq!(store.pending_count(), 1);
    }

    #[test]
    fn touch_all_refreshes_last_seen() {
        let mut store = enshrouded_store();
        open(&mut store, 1, t(0));
        confirm(&mut store, "Alice", t(0));
        store.touch_all(t(100));
        assert_eq!(store.session("Alice").unwrap().last_seen, t(100));
        assert!(store.evict_stale(t(150), Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn snapshot_is_in_creation_order() {
        let mut store = enshrouded_store();
        for (handle, name) in [(5, "Zed"), (2, "Amy"), (9, "Kai")] {
            open(&mut store, handle, t(0));
            confirm(&mut store, name, t(1));
        }
        let names: Vec<_> = store.snapshot().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Zed", "Amy", "Kai"]);
    }
}
