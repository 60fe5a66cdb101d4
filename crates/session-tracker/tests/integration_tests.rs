//! 통합 테스트 -- 추적기 전체 흐름 검증
//!
//! 로그 줄 입력부터 스냅샷 파일까지의 흐름을 실제 소스(파일, 프로세스)와 함께 검증합니다.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use playerwatch_core::types::{Identifier, Role};
use playerwatch_tracker::{
    ApplyOutcome, GameProfile, LineSource, SessionTracker, SourceSpec, TrackerError,
    TrackerSettings, TrackerSettingsBuilder, read_snapshot,
};

fn t(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
}

/// 줄을 내보내지 않는 소스 -- `process_line`/`tick`을 직접 호출하는 테스트용
struct NoSource;

impl LineSource for NoSource {
    fn describe(&self) -> String {
        "none".to_owned()
    }

    async fn next_line(&mut self) -> Result<Option<String>, TrackerError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(None)
    }
}

fn settings(dir: &Path, source: SourceSpec) -> TrackerSettings {
    TrackerSettingsBuilder::new()
        .source(source)
        .output_path(dir.join("players.json"))
        .player_timeout(Duration::from_secs(30))
        .sweep_interval(Duration::from_secs(10))
        .poll_interval(Duration::from_millis(10))
        .reopen_backoff(Duration::from_millis(20))
        .build()
        .unwrap()
}

fn offline_tracker(dir: &Path, game: &str) -> SessionTracker<NoSource> {
    let settings = settings(
        dir,
        SourceSpec::File {
            path: dir.join("unused.log"),
        },
    );
    SessionTracker::new(&settings, GameProfile::builtin(game).unwrap(), NoSource)
}

/// 접속 -> 로그인 -> 권한 -> 로그아웃 전체 흐름
#[test]
fn test_enshrouded_login_to_logout() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("players.json");
    let mut tracker = offline_tracker(dir.path(), "enshrouded");

    tracker.process_line(
        "[Session] 'HostOnline' (up)! added. Player handle: 42(7)",
        t(0),
    );
    tracker.process_line(
        "[Session] Player 'Alice' logged in with Permissions:",
        t(5),
    );
    tracker.process_line("[Session]    - CanKickBan", t(5));

    let sessions = read_snapshot(&snapshot);
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].name, "Alice");
    assert_eq!(sessions[0].id, Identifier::Handle(42));
    assert_eq!(sessions[0].role, Role::Admin);

    let outcome = tracker.process_line("[Session] Remove Player 'Alice'", t(60));
    assert_eq!(outcome, Some(ApplyOutcome::SessionsChanged));

    let content = std::fs::read_to_string(&snapshot).unwrap();
    assert_eq!(content.trim(), "[]");
}

/// 이름 확인 없이 멈춘 대기 식별자는 제거 대상이 아님
#[test]
fn test_pending_identity_survives_stall() {
    let dir = tempfile::tempdir().unwrap();
    let mut tracker = offline_tracker(dir.path(), "enshrouded");

    tracker.process_line("added. Player handle: 99(1)", t(0));
    tracker.tick(t(0));
    let report = tracker.tick(t(600));

    assert!(report.checked);
    assert!(report.evicted.is_empty());
    assert_eq!(tracker.store().active_count(), 0);
    assert_eq!(tracker.store().pending_count(), 1);
    assert_eq!(tracker.stats().evictions, 0);
}

/// 윈도우를 넘긴 로그인은 연결되지 않음
#[test]
fn test_login_outside_window_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let mut tracker = offline_tracker(dir.path(), "enshrouded");

    tracker.process_line("added. Player handle: 5(1)", t(0));
    let outcome = tracker.process_line("Player 'Late' logged in with Permissions:", t(31));

    assert_eq!(outcome, Some(ApplyOutcome::CorrelationFailed));
    assert_eq!(tracker.store().active_count(), 0);
}

/// 두 명이 연달아 접속하면 먼저 생성된 식별자부터 연결
#[test]
fn test_two_players_link_in_arrival_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut tracker = offline_tracker(dir.path(), "enshrouded");

    tracker.process_line("added. Player handle: 1(1)", t(0));
    tracker.process_line("added. Player handle: 2(1)", t(1));
    tracker.process_line("Player 'Alice' logged in with Permissions:", t(2));
    tracker.process_line("Player 'Bob' logged in with Permissions:", t(3));
    tracker.process_line("  - CanEditBase", t(3));

    let sessions = read_snapshot(dir.path().join("players.json"));
    let names: Vec<&str> = sessions.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob"]);
    assert_eq!(sessions[0].id, Identifier::Handle(1));
    assert_eq!(sessions[1].id, Identifier::Handle(2));
    assert_eq!(sessions[1].role, Role::Community);

    tracker.process_line("Disconnecting peer #1", t(10));
    let sessions = read_snapshot(dir.path().join("players.json"));
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].name, "Bob");
}

/// Valheim: 관리자 목록 기반 역할
#[test]
fn test_valheim_roster_roles() {
    let dir = tempfile::tempdir().unwrap();
    let admins = dir.path().join("adminlist.txt");
    std::fs::write(&admins, "// admins\n76561198000000001\n").unwrap();

    let settings = TrackerSettingsBuilder::new()
        .game("valheim")
        .source(SourceSpec::docker_logs("docker", "valheim"))
        .output_path(dir.path().join("players.json"))
        .admin_list_path(&admins)
        .build()
        .unwrap();
    let mut tracker =
        SessionTracker::new(&settings, GameProfile::builtin("valheim").unwrap(), NoSource);

    tracker.process_line("Got connection SteamID 76561198000000001", t(0));
    tracker.process_line("Got character ZDOID from Ragnar : -123:1", t(10));
    tracker.process_line("Got connection SteamID 76561198000000002", t(20));
    tracker.process_line("Got character ZDOID from Freya : -456:1", t(30));

    let sessions = read_snapshot(dir.path().join("players.json"));
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].name, "Ragnar");
    assert_eq!(sessions[0].role, Role::Admin);
    assert_eq!(sessions[1].name, "Freya");
    assert_eq!(sessions[1].role, Role::Community);

    tracker.process_line("Closing socket 76561198000000001", t(40));
    let sessions = read_snapshot(dir.path().join("players.json"));
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].name, "Freya");
}

fn append(path: &Path, data: &str) {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(data.as_bytes()).unwrap();
}

async fn wait_for_sessions(path: &Path, count: usize) -> bool {
    for _ in 0..200 {
        if read_snapshot(path).len() == count {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// 실제 파일 소스로 제어 루프 실행
#[tokio::test]
async fn test_run_with_file_source() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("server.log");
    let snapshot = dir.path().join("players.json");
    std::fs::write(&log, "added. Player handle: 8(1)\nPlayer 'Stale' logged in with Permissions:\n")
        .unwrap();

    let settings = settings(dir.path(), SourceSpec::File { path: log.clone() });
    let mut tracker = SessionTracker::from_settings(&settings).await.unwrap();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let shutdown = async {
            let _ = stop_rx.await;
        };
        tracker.run(shutdown).await
    });

    // 시작 시 빈 스냅샷
    for _ in 0..200 {
        if snapshot.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(std::fs::read_to_string(&snapshot).unwrap().trim(), "[]");
    tokio::time::sleep(Duration::from_millis(100)).await;

    append(
        &log,
        "added. Player handle: 9(1)\nPlayer 'Alice' logged in with Permissions:\n",
    );
    assert!(wait_for_sessions(&snapshot, 1).await);
    assert_eq!(read_snapshot(&snapshot)[0].name, "Alice");

    append(&log, "Remove Player 'Alice'\n");
    assert!(wait_for_sessions(&snapshot, 0).await);

    stop_tx.send(()).unwrap();
    let stats = handle.await.unwrap().unwrap();
    assert_eq!(stats.active_sessions, 0);
    assert!(stats.events_matched >= 3);
}

/// 하위 프로세스 소스로 제어 루프 실행
#[cfg(unix)]
#[tokio::test]
async fn test_run_with_process_source() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("players.json");
    let script = "printf \"added. Player handle: 3(1)\\nPlayer 'Bob' logged in with Permissions:\\n - CanAccessInventories\\n\"; sleep 5";

    let settings = settings(
        dir.path(),
        SourceSpec::Process {
            program: "sh".to_owned(),
            args: vec!["-c".to_owned(), script.to_owned()],
        },
    );
    let mut tracker = SessionTracker::from_settings(&settings).await.unwrap();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        tracker
            .run(async {
                let _ = stop_rx.await;
            })
            .await
    });

    assert!(wait_for_sessions(&snapshot, 1).await);
    let mut bob = read_snapshot(&snapshot);
    for _ in 0..100 {
        if bob[0].role == Role::Community {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        bob = read_snapshot(&snapshot);
    }
    assert_eq!(bob[0].name, "Bob");
    assert_eq!(bob[0].role, Role::Community);

    stop_tx.send(()).unwrap();
    let stats = handle.await.unwrap().unwrap();
    assert_eq!(stats.active_sessions, 1);
}

/// 알 수 없는 게임은 생성 단계에서 거부
#[tokio::test]
async fn test_unknown_game_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(
        dir.path(),
        SourceSpec::File {
            path: dir.path().join("server.log"),
        },
    );
    settings.game = "minecraft".to_owned();

    let result = SessionTracker::from_settings(&settings).await;
    assert!(result.is_err());
}
