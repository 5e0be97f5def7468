//! Texture registry semantics through a booted engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::core::backend::HeadlessBackend;
use crate::core::channels::BindingRegistry;
use crate::core::engine::{Engine, EnginePaths};
use crate::core::texture::Texture;
use crate::tests::support::{fixture_bundle, MockCall, MockRuntime};

fn booted_engine() -> (Arc<MockRuntime>, Arc<Engine>, tempfile::TempDir) {
    let mock = MockRuntime::new();
    let backend = Arc::new(HeadlessBackend::new());
    let registry = Arc::new(BindingRegistry::new());
    let engine = Engine::from_parts(mock.clone(), backend, registry, 0, 0);
    let bundle = fixture_bundle();
    let paths = EnginePaths::resolve(bundle.path(), false).unwrap();
    engine.clone().run(&paths, Vec::new()).unwrap();
    mock.take_calls();
    (mock, engine, bundle)
}

#[test]
fn enable_registers_and_marks_one_frame() {
    let (mock, engine, _bundle) = booted_engine();
    let texture = Texture::new(42, 128, 128, None, None, None);
    texture.set_gl_name(7);

    engine.register_texture(texture.clone()).unwrap();

    assert_eq!(mock.calls(), vec![MockCall::RegisterTexture(42), MockCall::MarkFrame(42)]);
    assert!(engine.texture_registry_get(42).is_some());
}

#[test]
fn removing_twice_is_not_an_error() {
    let (_mock, engine, _bundle) = booted_engine();
    let texture = Texture::new(9, 16, 16, None, None, None);
    engine.register_texture(texture.clone()).unwrap();

    engine.texture_registry_remove(9);
    engine.texture_registry_remove(9);

    assert!(engine.texture_registry_get(9).is_none());
}

#[test]
fn colliding_id_replaces_the_existing_entry() {
    let (_mock, engine, _bundle) = booted_engine();
    let first = Texture::new(5, 16, 16, None, None, None);
    let second = Texture::new(5, 32, 32, None, None, None);

    engine.texture_registry_add(first);
    engine.texture_registry_add(second);

    let kept = engine.texture_registry_get(5).unwrap();
    assert_eq!(kept.size(), (32, 32));
}

#[test]
fn draw_runs_only_when_a_frame_was_flagged() {
    let (mock, engine, _bundle) = booted_engine();
    let draws = Arc::new(AtomicUsize::new(0));
    let counter = draws.clone();
    let texture = Texture::new(
        3,
        8,
        8,
        None,
        Some(Box::new(move |_t| {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
        None,
    );
    texture.set_gl_name(11);
    engine.register_texture(texture.clone()).unwrap();
    mock.take_calls();

    // No frame flagged: nothing happens.
    engine.draw_textures();
    assert_eq!(draws.load(Ordering::SeqCst), 0);
    assert!(mock.calls().is_empty());

    // One flag, one draw, one availability signal.
    texture.frame_ready();
    engine.draw_textures();
    engine.draw_textures();
    assert_eq!(draws.load(Ordering::SeqCst), 1);
    assert_eq!(mock.calls(), vec![MockCall::MarkFrame(3)]);
}

#[test]
fn dispose_runs_callback_and_clears_the_entry() {
    let (mock, engine, _bundle) = booted_engine();
    let disposed = Arc::new(AtomicUsize::new(0));
    let counter = disposed.clone();
    let texture = Texture::new(
        6,
        8,
        8,
        None,
        None,
        Some(Box::new(move |_t| {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
    );
    engine.register_texture(texture.clone()).unwrap();
    mock.take_calls();

    texture.dispose(&engine);

    assert_eq!(disposed.load(Ordering::SeqCst), 1);
    assert_eq!(mock.calls(), vec![MockCall::UnregisterTexture(6)]);
    assert!(engine.texture_registry_get(6).is_none());
}

#[test]
fn compositor_frame_lookup_goes_through_the_registry() {
    let (mock, engine, _bundle) = booted_engine();
    let texture = Texture::new(12, 64, 64, None, None, None);
    texture.set_gl_name(99);
    engine.register_texture(texture.clone()).unwrap();
    mock.take_calls();

    let hooks = mock.hooks().unwrap();
    let frame = hooks.external_texture_frame(12, 64, 64).unwrap();
    assert_eq!(frame.name, 99);
    assert_eq!(frame.target, gl::TEXTURE_2D);

    assert!(hooks.external_texture_frame(404, 64, 64).is_none());
}
