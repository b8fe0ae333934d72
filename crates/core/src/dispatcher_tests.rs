// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use crate::coordination::{LevelStore, MemoryStore, SingleTier, Tiered};
use crate::coordinator::TaskCoordinator;
use crate::id::NodeId;
use crate::schedule::{SystemIntervals, Vars};
use crate::task::{ScheduledTask, TaskDefinition, TaskError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

const MARGIN: Duration = Duration::from_millis(10);

fn intervals() -> SystemIntervals {
    SystemIntervals::new(Vars::isolated(HashMap::new()))
}

fn local_registry<A: LevelArbiter>(
    store: MemoryStore<FakeClock>,
    arbiter: A,
) -> Registry<MemoryStore<FakeClock>, A, SystemIntervals> {
    Registry::new(TaskCoordinator::new(store, arbiter, intervals()).with_skew_margin(MARGIN))
}

fn counting(count: &Arc<AtomicUsize>) -> impl ScheduledTask + 'static {
    let count = Arc::clone(count);
    move || {
        let count = Arc::clone(&count);
        async move {
            count.fetch_add(1, Ordering::SeqCst);
            Ok::<(), TaskError>(())
        }
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn fixed_rate_fires_on_grid() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut reg = local_registry(MemoryStore::with_clock(FakeClock::new()), SingleTier::default());
    reg.register(
        TaskDefinition::new("jobs", "tick", ScheduleSpec::fixed_rate("100ms")).ignored(),
        counting(&count),
    )
    .unwrap();

    let dispatcher = reg.init();
    tokio::time::sleep(ms(350)).await;
    assert_eq!(count.load(Ordering::SeqCst), 3);

    dispatcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn fixed_delay_waits_for_run_to_finish() {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let mut reg = local_registry(MemoryStore::with_clock(FakeClock::new()), SingleTier::default());
    reg.register(
        TaskDefinition::new("jobs", "slow", ScheduleSpec::fixed_delay("100ms")).ignored(),
        move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(ms(50)).await;
                Ok::<(), TaskError>(())
            }
        },
    )
    .unwrap();

    // Starts at 100ms and 250ms; a fixed rate would also have fired at 300ms
    let dispatcher = reg.init();
    tokio::time::sleep(ms(320)).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);

    dispatcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failing_body_keeps_timer_running() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let mut reg = local_registry(MemoryStore::with_clock(FakeClock::new()), SingleTier::default());
    reg.register(
        TaskDefinition::new("jobs", "flaky", ScheduleSpec::fixed_rate("100ms")).ignored(),
        move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), TaskError>("unreachable host".into())
            }
        },
    )
    .unwrap();

    let dispatcher = reg.init();
    tokio::time::sleep(ms(350)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    dispatcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_timers() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut reg = local_registry(MemoryStore::with_clock(FakeClock::new()), SingleTier::default());
    reg.register(
        TaskDefinition::new("jobs", "tick", ScheduleSpec::fixed_rate("100ms")).ignored(),
        counting(&count),
    )
    .unwrap();

    let dispatcher = reg.init();
    tokio::time::sleep(ms(150)).await;
    dispatcher.shutdown().await;
    let seen = count.load(Ordering::SeqCst);

    tokio::time::sleep(ms(1_000)).await;
    assert_eq!(count.load(Ordering::SeqCst), seen);
}

#[tokio::test(start_paused = true)]
async fn shutdown_lets_in_flight_run_finish() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    let mut reg = local_registry(MemoryStore::with_clock(FakeClock::new()), SingleTier::default());
    reg.register(
        TaskDefinition::new("jobs", "long", ScheduleSpec::fixed_rate("100ms")).ignored(),
        move || {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(ms(200)).await;
                flag.store(true, Ordering::SeqCst);
                Ok::<(), TaskError>(())
            }
        },
    )
    .unwrap();

    let dispatcher = reg.init();
    tokio::time::sleep(ms(150)).await;
    assert!(!finished.load(Ordering::SeqCst));

    dispatcher.shutdown().await;
    assert!(finished.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn two_nodes_run_each_fire_once() {
    let clock = FakeClock::new();
    let store = MemoryStore::with_clock(clock.clone());
    let count = Arc::new(AtomicUsize::new(0));

    let mut dispatchers = Vec::new();
    for node in ["node-a", "node-b"] {
        let mut reg = local_registry(store.node_view(NodeId::new(node)), SingleTier::default());
        reg.register(
            TaskDefinition::new("jobs", "sweep", ScheduleSpec::fixed_rate("100ms")),
            counting(&count),
        )
        .unwrap();
        dispatchers.push(reg.init());
    }

    // Both nodes fire at 100ms; the lease (90ms of store time) admits one
    tokio::time::sleep(ms(150)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // Store time moves past the lease before the 200ms fire
    clock.advance(ms(100));
    tokio::time::sleep(ms(100)).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);

    for dispatcher in dispatchers {
        dispatcher.shutdown().await;
    }
}

#[tokio::test(start_paused = true)]
async fn heartbeat_keeps_level_alive() {
    let clock = FakeClock::new();
    let store = MemoryStore::with_clock(clock.clone());
    let arbiter = Tiered::new(store.clone(), 2, Duration::from_secs(30));
    let dispatcher = local_registry(store.clone(), arbiter).init();

    tokio::time::sleep(ms(1)).await;
    assert_eq!(store.max_alive_level().await.unwrap(), Some(2));

    // Re-asserted at the 15s tick, 20s into store time
    clock.advance(Duration::from_secs(20));
    tokio::time::sleep(Duration::from_secs(16)).await;
    clock.advance(Duration::from_secs(20));
    assert_eq!(store.max_alive_level().await.unwrap(), Some(2));

    dispatcher.shutdown().await;
    clock.advance(Duration::from_secs(60));
    assert_eq!(store.max_alive_level().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn level_zero_never_heartbeats() {
    let clock = FakeClock::new();
    let store = MemoryStore::with_clock(clock);
    let arbiter = Tiered::new(store.clone(), 0, Duration::from_secs(30));
    let dispatcher = local_registry(store.clone(), arbiter).init();

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(store.max_alive_level().await.unwrap(), None);

    dispatcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn dispatcher_exposes_registry() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut reg = local_registry(MemoryStore::with_clock(FakeClock::new()), SingleTier::default());
    reg.register(
        TaskDefinition::new("jobs", "tick", ScheduleSpec::fixed_rate("100ms")).ignored(),
        counting(&count),
    )
    .unwrap();

    let dispatcher = reg.init();
    assert_eq!(dispatcher.registry().len(), 1);
    tokio::time::sleep(ms(250)).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);
    dispatcher.shutdown().await;
}
