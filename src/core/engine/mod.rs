//! Runtime hosting.
//!
//! One [`Engine`] per window. It owns the loaded runtime instance, the
//! deferred task queue, the coalesced pointer buffer and the external
//! texture registry, and implements [`RuntimeHooks`] so runtime callbacks
//! land back here. Everything protocol-facing stays in `core::wayland`;
//! everything ABI-facing stays in `abi`/`api`/`loader`.

pub mod abi;
pub mod api;
pub mod input;
pub mod loader;
pub mod scheduler;

use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::core::backend::RenderBackend;
use crate::core::channels::{BindingRegistry, PlatformMessage, Responder};
use crate::core::engine::api::{
    AotData, ExternalTextureFrame, Locale, PointerEvent, RuntimeApi, RuntimeHooks,
    RuntimeLaunchArgs, RuntimeTask,
};
use crate::core::engine::input::PointerBuffer;
use crate::core::engine::scheduler::TaskScheduler;
use crate::core::errors::{EmbedderError, Result};
use crate::core::texture::Texture;
use crate::prelude::HashMap;
use crate::util::paths;

// ============================================================================
// Data file resolution
// ============================================================================

/// Resolved bundle paths an engine launches with.
#[derive(Debug, Clone)]
pub struct EnginePaths {
    pub assets: PathBuf,
    pub icu_data: PathBuf,
    pub persistent_cache: PathBuf,
    /// AOT blob, present only in AOT mode and only if the bundle ships one.
    pub aot_blob: Option<PathBuf>,
}

impl EnginePaths {
    /// Resolves every data file for `bundle`. In AOT mode a missing blob
    /// is tolerated; in interpreted mode a missing kernel snapshot is not.
    pub fn resolve(bundle: &Path, aot_mode: bool) -> Result<Self> {
        let assets = paths::assets_dir(bundle);
        if !assets.is_dir() {
            return Err(EmbedderError::MissingDataFile(assets.display().to_string()));
        }

        let icu_data = paths::icu_data_path(bundle)
            .ok_or_else(|| EmbedderError::MissingDataFile("icudtl.dat".to_string()))?;

        let persistent_cache = paths::persistent_cache_dir().map_err(|e| {
            EmbedderError::runtime_boot(format!("cannot create persistent cache dir: {e}"))
        })?;

        let aot_blob = if aot_mode {
            let blob = paths::aot_blob_path(bundle);
            if paths::is_file(&blob) {
                Some(blob)
            } else {
                debug!("no AOT blob in bundle, launching without one");
                None
            }
        } else {
            let kernel = paths::kernel_snapshot_path(bundle);
            if !paths::is_file(&kernel) {
                return Err(EmbedderError::MissingDataFile(kernel.display().to_string()));
            }
            None
        };

        Ok(Self { assets, icu_data, persistent_cache, aot_blob })
    }
}

/// Default locale from the environment, `en_US` style. Falls back to
/// plain English when nothing usable is set.
pub fn default_locale() -> Locale {
    let raw = env::var("LC_ALL").or_else(|_| env::var("LANG")).unwrap_or_default();
    let raw = raw.split('.').next().unwrap_or("");
    let mut parts = raw.split('_');
    match parts.next().filter(|l| !l.is_empty()) {
        Some(language) => Locale {
            language: language.to_string(),
            country: parts.next().map(str::to_string),
            script: None,
        },
        None => Locale::new("en"),
    }
}

// ============================================================================
// Engine
// ============================================================================

pub struct Engine {
    api: Arc<dyn RuntimeApi>,
    backend: Arc<dyn RenderBackend>,
    registry: Arc<BindingRegistry>,
    scheduler: TaskScheduler,
    pointer_buffer: PointerBuffer,
    textures: Mutex<HashMap<i64, Arc<Texture>>>,
    running: AtomicBool,
    window_index: usize,
    accessibility_features: i64,
    aot_data: Mutex<Option<AotData>>,
}

impl Engine {
    /// Loads the runtime library for `bundle` and wraps it. The engine is
    /// not running until [`Engine::run`].
    pub fn load(
        bundle: &Path,
        backend: Arc<dyn RenderBackend>,
        registry: Arc<BindingRegistry>,
        window_index: usize,
        accessibility_features: i64,
    ) -> Result<Arc<Self>> {
        let runtime = loader::load(bundle)?;
        Ok(Self::from_parts(Arc::new(runtime), backend, registry, window_index, accessibility_features))
    }

    /// Wraps an already constructed runtime. Tests inject mocks here.
    pub fn from_parts(
        api: Arc<dyn RuntimeApi>,
        backend: Arc<dyn RenderBackend>,
        registry: Arc<BindingRegistry>,
        window_index: usize,
        accessibility_features: i64,
    ) -> Arc<Self> {
        Arc::new(Self {
            api,
            backend,
            registry,
            scheduler: TaskScheduler::new(),
            pointer_buffer: PointerBuffer::new(),
            textures: Mutex::new(HashMap::new()),
            running: AtomicBool::new(false),
            window_index,
            accessibility_features,
            aot_data: Mutex::new(None),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn window_index(&self) -> usize {
        self.window_index
    }

    pub(crate) fn api(&self) -> &Arc<dyn RuntimeApi> {
        &self.api
    }

    /// Boots the runtime: initialize, run, then push locale and
    /// accessibility state. Any failure here is fatal to the process.
    /// Takes an owned handle because the engine installs itself as the
    /// runtime's callback target; callers keep their own clone.
    pub fn run(
        self: Arc<Self>,
        engine_paths: &EnginePaths,
        command_line_args: Vec<String>,
    ) -> Result<()> {
        let aot_data = match &engine_paths.aot_blob {
            Some(blob) if self.api.runs_aot_compiled_code() => {
                let data = self.api.create_aot_data(blob)?;
                // Keep a handle for collection after shutdown.
                *self.aot_data.lock().unwrap() = Some(AotData(data.0));
                info!("AOT data loaded from {}", blob.display());
                Some(data)
            }
            _ => None,
        };

        self.api.initialize(
            RuntimeLaunchArgs {
                assets_path: engine_paths.assets.clone(),
                icu_data_path: engine_paths.icu_data.clone(),
                persistent_cache_path: engine_paths.persistent_cache.clone(),
                command_line_args,
                aot_data,
            },
            self.clone() as Arc<dyn RuntimeHooks>,
        )?;
        self.api.run_initialized()?;
        self.running.store(true, Ordering::Release);

        self.api.update_locales(&[default_locale()])?;
        self.api.update_accessibility_features(self.accessibility_features)?;
        info!("engine for window {} running", self.window_index);
        Ok(())
    }

    /// One loop turn: execute every due deferred task, then flush the
    /// coalesced pointer batch.
    pub fn run_task(&self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        let now = self.api.current_time();
        for task in self.scheduler.take_due(now) {
            self.api.run_task(&task)?;
        }
        let batch = self.pointer_buffer.take_all();
        self.api.send_pointer_events(&batch)
    }

    /// Queues a pointer event for the next flush. Safe from handlers on
    /// the dispatch path.
    pub fn queue_pointer_event(&self, event: PointerEvent) {
        self.pointer_buffer.push(event);
    }

    pub fn send_window_metrics(&self, width: usize, height: usize, pixel_ratio: f64) -> Result<()> {
        if !self.is_running() {
            return Err(EmbedderError::NotRunning);
        }
        self.api.send_window_metrics(width, height, pixel_ratio)
    }

    pub fn send_platform_message(&self, channel: &str, payload: &[u8]) -> Result<()> {
        if !self.is_running() {
            return Err(EmbedderError::NotRunning);
        }
        self.api.send_platform_message(channel, payload)
    }

    // ------------------------------------------------------------------
    // Texture registry
    // ------------------------------------------------------------------

    /// Runs the texture's create callback, adds it to the registry and
    /// announces it to the runtime compositor with one frame available.
    /// On a compositor-side failure the registry entry is rolled back.
    pub fn register_texture(&self, texture: Arc<Texture>) -> Result<()> {
        let id = texture.id();
        texture.run_create();
        texture.set_enabled(true);
        self.texture_registry_add(texture);
        if let Err(e) = self.texture_enable(id) {
            if let Some(t) = self.texture_registry_get(id) {
                t.set_enabled(false);
            }
            self.texture_registry_remove(id);
            warn!("texture {id} enable failed: {e}");
            return Err(e);
        }
        Ok(())
    }

    /// Adds a texture to the registry. A colliding id replaces the
    /// existing entry.
    pub fn texture_registry_add(&self, texture: Arc<Texture>) {
        let id = texture.id();
        if self.textures.lock().unwrap().insert(id, texture).is_some() {
            warn!("texture {id} re-registered, previous entry replaced");
        }
    }

    /// Removes a texture. Removing an absent id is not an error.
    pub fn texture_registry_remove(&self, id: i64) {
        if self.textures.lock().unwrap().remove(&id).is_none() {
            debug!("texture {id} already removed");
        }
    }

    pub fn texture_registry_get(&self, id: i64) -> Option<Arc<Texture>> {
        self.textures.lock().unwrap().get(&id).cloned()
    }

    /// Announces the texture to the runtime compositor and marks one
    /// frame available so it paints without waiting for a producer.
    pub fn texture_enable(&self, id: i64) -> Result<()> {
        if !self.is_running() {
            return Err(EmbedderError::NotRunning);
        }
        self.api.register_external_texture(id)?;
        self.api.mark_texture_frame_available(id)
    }

    pub fn texture_disable(&self, id: i64) -> Result<()> {
        if !self.is_running() {
            return Err(EmbedderError::NotRunning);
        }
        self.api.unregister_external_texture(id)
    }

    pub fn mark_texture_frame_available(&self, id: i64) -> Result<()> {
        self.api.mark_texture_frame_available(id)
    }

    /// Gives every registered texture its once-per-loop draw opportunity.
    pub fn draw_textures(&self) {
        let textures: Vec<Arc<Texture>> =
            self.textures.lock().unwrap().values().cloned().collect();
        for texture in textures {
            texture.draw(self);
        }
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Stops the runtime and collects AOT data. Idempotent.
    pub fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        self.api.shutdown()?;
        if let Some(aot) = self.aot_data.lock().unwrap().take() {
            self.api.collect_aot_data(aot)?;
        }
        info!("engine for window {} shut down", self.window_index);
        Ok(())
    }
}

impl RuntimeHooks for Engine {
    fn on_platform_message(&self, message: PlatformMessage, responder: Responder) {
        self.registry.dispatch(&message, responder);
    }

    fn post_task(&self, task: RuntimeTask, target_time_nanos: u64) {
        self.scheduler.post(task, target_time_nanos);
    }

    fn log_message(&self, tag: &str, message: &str) {
        info!("runtime[{tag}]: {message}");
    }

    fn gl_make_current(&self) -> bool {
        self.backend.make_current(self.window_index)
    }

    fn gl_clear_current(&self) -> bool {
        self.backend.clear_current()
    }

    fn gl_present(&self) -> bool {
        self.backend.present(self.window_index)
    }

    fn gl_make_resource_current(&self) -> bool {
        self.backend.make_resource_current()
    }

    fn gl_proc_resolve(&self, name: &str) -> *mut std::ffi::c_void {
        self.backend.gl_proc_resolve(name)
    }

    fn external_texture_frame(
        &self,
        texture_id: i64,
        _width: usize,
        _height: usize,
    ) -> Option<ExternalTextureFrame> {
        self.texture_registry_get(texture_id).and_then(|t| t.frame())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn paths_resolve_in_interpreted_mode() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path();
        fs::create_dir_all(bundle.join("assets")).unwrap();
        fs::write(bundle.join("assets/kernel_blob.bin"), b"snapshot").unwrap();
        fs::write(bundle.join("icudtl.dat"), b"icu").unwrap();

        let resolved = EnginePaths::resolve(bundle, false).unwrap();
        assert_eq!(resolved.assets, bundle.join("assets"));
        assert_eq!(resolved.icu_data, bundle.join("icudtl.dat"));
        assert!(resolved.aot_blob.is_none());
    }

    #[test]
    fn interpreted_mode_requires_kernel_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path();
        fs::create_dir_all(bundle.join("assets")).unwrap();
        fs::write(bundle.join("icudtl.dat"), b"icu").unwrap();

        let err = EnginePaths::resolve(bundle, false).unwrap_err();
        assert!(matches!(err, EmbedderError::MissingDataFile(_)));
    }

    #[test]
    fn aot_mode_tolerates_missing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path();
        fs::create_dir_all(bundle.join("assets")).unwrap();
        fs::write(bundle.join("icudtl.dat"), b"icu").unwrap();

        let resolved = EnginePaths::resolve(bundle, true).unwrap();
        assert!(resolved.aot_blob.is_none());
    }

    #[test]
    fn aot_mode_picks_up_bundled_blob() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path();
        fs::create_dir_all(bundle.join("assets")).unwrap();
        fs::write(bundle.join("assets/libapp.so"), b"elf").unwrap();
        fs::write(bundle.join("icudtl.dat"), b"icu").unwrap();

        let resolved = EnginePaths::resolve(bundle, true).unwrap();
        assert_eq!(resolved.aot_blob, Some(bundle.join("assets/libapp.so")));
    }

    #[test]
    fn missing_icu_data_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path();
        fs::create_dir_all(bundle.join("assets")).unwrap();
        fs::write(bundle.join("assets/kernel_blob.bin"), b"snapshot").unwrap();

        let err = EnginePaths::resolve(bundle, false).unwrap_err();
        assert!(matches!(err, EmbedderError::MissingDataFile(f) if f.contains("icudtl")));
    }
}
