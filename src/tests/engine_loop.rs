//! Engine loop behavior against the recording runtime.

use std::sync::Arc;

use crate::core::backend::HeadlessBackend;
use crate::core::channels::BindingRegistry;
use crate::core::engine::api::{
    DeviceKind, PointerEvent, PointerPhase, RuntimeTask, SignalKind,
};
use crate::core::engine::{Engine, EnginePaths};
use crate::core::errors::EmbedderError;
use crate::tests::support::{fixture_bundle, MockCall, MockRuntime};

fn engine_with_mock() -> (Arc<MockRuntime>, Arc<Engine>) {
    let mock = MockRuntime::new();
    let backend = Arc::new(HeadlessBackend::new());
    let registry = Arc::new(BindingRegistry::new());
    let engine = Engine::from_parts(mock.clone(), backend, registry, 0, 0);
    (mock, engine)
}

fn booted_engine() -> (Arc<MockRuntime>, Arc<Engine>, tempfile::TempDir) {
    let (mock, engine) = engine_with_mock();
    let bundle = fixture_bundle();
    let paths = EnginePaths::resolve(bundle.path(), false).unwrap();
    engine.clone().run(&paths, Vec::new()).unwrap();
    mock.take_calls();
    (mock, engine, bundle)
}

fn pointer(x: f64) -> PointerEvent {
    PointerEvent {
        phase: PointerPhase::Move,
        timestamp: 0,
        x,
        y: 0.0,
        device: 0,
        signal_kind: SignalKind::None,
        scroll_delta_x: 0.0,
        scroll_delta_y: 0.0,
        device_kind: DeviceKind::Mouse,
        buttons: 0,
    }
}

#[test]
fn boot_runs_initialize_then_locale_and_accessibility() {
    let (mock, engine) = engine_with_mock();
    let bundle = fixture_bundle();
    let paths = EnginePaths::resolve(bundle.path(), false).unwrap();
    engine.clone().run(&paths, Vec::new()).unwrap();

    assert_eq!(
        mock.calls(),
        vec![
            MockCall::Initialize,
            MockCall::RunInitialized,
            MockCall::UpdateLocales(1),
            MockCall::UpdateAccessibility(0),
        ]
    );
    assert!(engine.is_running());
}

#[test]
fn metrics_are_rejected_before_boot() {
    let (_mock, engine) = engine_with_mock();
    let err = engine.send_window_metrics(800, 600, 1.0).unwrap_err();
    assert!(matches!(err, EmbedderError::NotRunning));
}

#[test]
fn due_tasks_run_in_order_then_input_flushes() {
    let (mock, engine, _bundle) = booted_engine();
    let hooks = mock.hooks().unwrap();

    hooks.post_task(RuntimeTask::synthetic(2), 200);
    hooks.post_task(RuntimeTask::synthetic(1), 100);
    engine.queue_pointer_event(pointer(5.0));

    mock.set_clock(250);
    engine.run_task().unwrap();

    assert_eq!(
        mock.calls(),
        vec![
            MockCall::RunTask(1),
            MockCall::RunTask(2),
            MockCall::PointerBatch(vec![pointer(5.0)]),
        ]
    );
}

#[test]
fn not_yet_due_tasks_wait_for_their_deadline() {
    let (mock, engine, _bundle) = booted_engine();
    let hooks = mock.hooks().unwrap();

    hooks.post_task(RuntimeTask::synthetic(1), 100);
    hooks.post_task(RuntimeTask::synthetic(2), 9_000);

    mock.set_clock(100);
    engine.run_task().unwrap();
    assert_eq!(mock.take_calls(), vec![MockCall::RunTask(1)]);

    mock.set_clock(9_000);
    engine.run_task().unwrap();
    assert_eq!(mock.take_calls(), vec![MockCall::RunTask(2)]);
}

fn scroll(delta_y: f64) -> PointerEvent {
    PointerEvent { signal_kind: SignalKind::Scroll, scroll_delta_y: delta_y, ..pointer(0.0) }
}

#[test]
fn moves_and_scroll_flush_as_one_batch_in_arrival_order() {
    let (mock, engine, _bundle) = booted_engine();

    engine.queue_pointer_event(pointer(1.0));
    engine.queue_pointer_event(pointer(2.0));
    engine.queue_pointer_event(scroll(-3.0));
    engine.run_task().unwrap();

    assert_eq!(
        mock.take_calls(),
        vec![MockCall::PointerBatch(vec![pointer(1.0), pointer(2.0), scroll(-3.0)])]
    );
}

#[test]
fn pointer_events_coalesce_into_one_batch_per_turn() {
    let (mock, engine, _bundle) = booted_engine();

    engine.queue_pointer_event(pointer(1.0));
    engine.queue_pointer_event(pointer(2.0));
    engine.queue_pointer_event(pointer(3.0));
    engine.run_task().unwrap();

    assert_eq!(
        mock.take_calls(),
        vec![MockCall::PointerBatch(vec![pointer(1.0), pointer(2.0), pointer(3.0)])]
    );

    // Next turn starts a fresh batch.
    engine.queue_pointer_event(pointer(4.0));
    engine.run_task().unwrap();
    assert_eq!(mock.take_calls(), vec![MockCall::PointerBatch(vec![pointer(4.0)])]);
}

#[test]
fn idle_turn_sends_nothing() {
    let (mock, engine, _bundle) = booted_engine();
    engine.run_task().unwrap();
    assert!(mock.calls().is_empty());
}

#[test]
fn shutdown_is_idempotent() {
    let (mock, engine, _bundle) = booted_engine();

    engine.shutdown().unwrap();
    engine.shutdown().unwrap();

    assert_eq!(mock.calls(), vec![MockCall::Shutdown]);
    assert!(!engine.is_running());
}

#[test]
fn run_task_before_boot_is_a_no_op() {
    let (mock, engine) = engine_with_mock();
    engine.queue_pointer_event(pointer(1.0));
    engine.run_task().unwrap();
    assert!(mock.calls().is_empty());
}
