mod harness;
mod support;

use std::collections::BTreeMap;
use std::sync::Arc;

use basketwatch::app::{local_day, ExecutionLimits, PersistedState, RuntimeState, StateStore};
use basketwatch::domain::{BasketKey, BasketRuntime, FilterConfig};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

use harness::scripted_executor::ScriptedExecutor;
use support::book::top_asks;
use support::engine::{engine, gate, settings};
use support::universe::{three_way, universe};

#[tokio::test]
async fn same_day_halt_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("state.json"));
    let now = Utc::now();

    let mut runtime = RuntimeState::new(local_day(now));
    runtime.executions_today = 2;
    runtime.notional_today = dec!(40);
    runtime.halt("daily loss 60 exceeds limit 50");
    store
        .save(&PersistedState {
            runtime,
            baskets: BTreeMap::new(),
        })
        .unwrap();

    let executor = Arc::new(ScriptedExecutor::new());
    let mut s = settings();
    s.execution_enabled = true;
    let (mut engine, recorder) = engine(s, universe(vec![three_way()]), FilterConfig::default(), now);
    engine.restore(store.load().unwrap().unwrap());
    let mut engine = engine
        .with_gate(gate(executor.clone(), ExecutionLimits::default(), 1))
        .with_store(store.clone());

    assert!(engine.state().halted);
    assert_eq!(engine.state().executions_today, 2);

    let keys = engine.apply_updates(
        top_asks(&[("a-yes", dec!(0.30)), ("b-yes", dec!(0.30)), ("c-yes", dec!(0.30))]),
        now,
    );
    engine.on_impacted_baskets(&keys, now, now).await;

    assert_eq!(recorder.alerts(), 1);
    assert_eq!(executor.calls(), 0);
    assert!(store.load().unwrap().unwrap().runtime.halted);
}

#[tokio::test]
async fn stale_day_resets_counters_but_keeps_mute_window() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("state.json"));
    let now = Utc::now();
    let yesterday = local_day(now).pred_opt().unwrap();

    let mut runtime = RuntimeState::new(yesterday);
    runtime.executions_today = 5;
    runtime.halt("daily loss 80 exceeds limit 50");
    let mut baskets = BTreeMap::new();
    baskets.insert(
        BasketKey::from("three-way"),
        BasketRuntime {
            filtered_until: Some(now + Duration::minutes(10)),
            ..Default::default()
        },
    );
    store.save(&PersistedState { runtime, baskets }).unwrap();

    let (mut engine, recorder) =
        engine(settings(), universe(vec![three_way()]), FilterConfig::default(), now);
    engine.restore(store.load().unwrap().unwrap());

    assert!(!engine.state().halted);
    assert_eq!(engine.state().executions_today, 0);
    assert_eq!(engine.state().day, local_day(now));

    let keys = engine.apply_updates(
        top_asks(&[("a-yes", dec!(0.30)), ("b-yes", dec!(0.30)), ("c-yes", dec!(0.30))]),
        now,
    );
    engine.on_impacted_baskets(&keys, now, now).await;

    assert_eq!(recorder.alerts(), 0);
    assert_eq!(engine.stats().filtered, 1);
}

#[test]
fn state_file_is_readable_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = StateStore::new(&path);
    let day = local_day(Utc::now());

    store
        .save(&PersistedState {
            runtime: RuntimeState::new(day),
            baskets: BTreeMap::new(),
        })
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["runtime"]["executions_today"], 0);
    assert_eq!(value["runtime"]["halted"], false);
    assert_eq!(value["runtime"]["day"], day.to_string());
}

#[test]
fn every_field_survives_a_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("state.json"));
    let now = Utc::now();

    let mut runtime = RuntimeState::new(local_day(now));
    runtime.executions_today = 3;
    runtime.notional_today = dec!(27.45);
    runtime.consecutive_failures = 2;
    runtime.halt("daily loss 61.20 exceeds limit 50");
    runtime.start_pnl = Some(dec!(120.5));
    runtime.last_pnl = Some(dec!(59.3));
    runtime.open_orders = 4;

    let mut baskets = BTreeMap::new();
    baskets.insert(
        BasketKey::from("three-way"),
        BasketRuntime {
            last_alert_ts: Some(now - Duration::seconds(90)),
            last_exec_ts: Some(now - Duration::seconds(60)),
            last_eval_ts: Some(now),
            last_signature: Some("a-yes:0.30|b-yes:0.30|c-yes:0.30".into()),
            neg_exec_streak: 2,
            filtered_until: Some(now + Duration::minutes(15)),
        },
    );
    baskets.insert(BasketKey::from("pair-a"), BasketRuntime::default());

    let saved = PersistedState { runtime, baskets };
    store.save(&saved).unwrap();

    assert_eq!(store.load().unwrap(), Some(saved));
}
