//! 줄 분류 및 상관 벤치마크
//!
//! 내장 프로파일의 분류 비용과 저장소 적용 비용을 측정합니다.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use playerwatch_tracker::pattern::{GameProfile, LogEvent};
use playerwatch_tracker::store::CorrelationStore;
use playerwatch_core::types::Identifier;

const ENSHROUDED_LINES: &[(&str, &str)] = &[
    ("connection", "[Session] 'HostOnline' (up)! added. Player handle: 42(7)"),
    ("login", "[Session] Player 'Alice' logged in with Permissions:"),
    ("permission", "[Session]    - CanKickBan"),
    ("logout", "[Session] Remove Player 'Alice'"),
    ("noise", "[server] Saved 1234 entities in 12.5 ms"),
];

fn bench_classify(c: &mut Criterion) {
    let profile = GameProfile::builtin("enshrouded").unwrap();

    let mut group = c.benchmark_group("classify_enshrouded");
    group.throughput(Throughput::Elements(1));

    for (label, line) in ENSHROUDED_LINES {
        group.bench_with_input(BenchmarkId::from_parameter(label), line, |b, line| {
            b.iter(|| profile.patterns.classify(black_box(line)))
        });
    }

    group.finish();
}

fn bench_classify_valheim(c: &mut Criterion) {
    let profile = GameProfile::builtin("valheim").unwrap();
    let line = "02/18/2024 12:00:00: Got connection SteamID 76561198000000001";

    let mut group = c.benchmark_group("classify_valheim");
    group.throughput(Throughput::Elements(1));
    group.bench_function("connection", |b| {
        b.iter(|| profile.patterns.classify(black_box(line)))
    });
    group.finish();
}

fn bench_store_apply(c: &mut Criterion) {
    let profile = GameProfile::builtin("enshrouded").unwrap();
    let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

    let mut group = c.benchmark_group("store_apply");

    for players in [1u64, 10, 100].iter() {
        group.throughput(Throughput::Elements(*players * 2));
        group.bench_with_input(BenchmarkId::new("login", players), players, |b, &players| {
            b.iter(|| {
                let mut store =
                    CorrelationStore::new(profile.correlation_window, profile.role_resolver(None));
                for handle in 0..players {
                    let at: SystemTime = now + Duration::from_millis(handle);
                    store.apply(LogEvent::ConnectionOpened(Identifier::Handle(handle)), at);
                    store.apply(LogEvent::IdentityConfirmed(format!("player-{handle}")), at);
                }
                black_box(store.active_count())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_classify,
    bench_classify_valheim,
    bench_store_apply
);
criterion_main!(benches);
