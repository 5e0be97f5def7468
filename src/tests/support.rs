//! Test doubles: a recording runtime with a settable clock.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::engine::api::{
    AotData, Locale, PointerEvent, RuntimeApi, RuntimeHooks, RuntimeLaunchArgs, RuntimeTask,
};
use crate::core::errors::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Initialize,
    RunInitialized,
    Shutdown,
    WindowMetrics { width: usize, height: usize, pixel_ratio: f64 },
    PointerBatch(Vec<PointerEvent>),
    PlatformMessage { channel: String },
    RegisterTexture(i64),
    UnregisterTexture(i64),
    MarkFrame(i64),
    RunTask(u64),
    UpdateLocales(usize),
    UpdateAccessibility(i64),
    CollectAotData,
}

/// Records every call and lets tests drive the runtime clock.
#[derive(Default)]
pub struct MockRuntime {
    calls: Mutex<Vec<MockCall>>,
    clock: AtomicU64,
    hooks: Mutex<Option<Arc<dyn RuntimeHooks>>>,
}

impl MockRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_clock(&self, nanos: u64) {
        self.clock.store(nanos, Ordering::Release);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn take_calls(&self) -> Vec<MockCall> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn hooks(&self) -> Option<Arc<dyn RuntimeHooks>> {
        self.hooks.lock().unwrap().clone()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RuntimeApi for MockRuntime {
    fn initialize(&self, _args: RuntimeLaunchArgs, hooks: Arc<dyn RuntimeHooks>) -> Result<()> {
        *self.hooks.lock().unwrap() = Some(hooks);
        self.record(MockCall::Initialize);
        Ok(())
    }

    fn run_initialized(&self) -> Result<()> {
        self.record(MockCall::RunInitialized);
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        self.record(MockCall::Shutdown);
        Ok(())
    }

    fn send_window_metrics(&self, width: usize, height: usize, pixel_ratio: f64) -> Result<()> {
        self.record(MockCall::WindowMetrics { width, height, pixel_ratio });
        Ok(())
    }

    fn send_pointer_events(&self, events: &[PointerEvent]) -> Result<()> {
        if !events.is_empty() {
            self.record(MockCall::PointerBatch(events.to_vec()));
        }
        Ok(())
    }

    fn send_platform_message(&self, channel: &str, _payload: &[u8]) -> Result<()> {
        self.record(MockCall::PlatformMessage { channel: channel.to_string() });
        Ok(())
    }

    fn register_external_texture(&self, texture_id: i64) -> Result<()> {
        self.record(MockCall::RegisterTexture(texture_id));
        Ok(())
    }

    fn unregister_external_texture(&self, texture_id: i64) -> Result<()> {
        self.record(MockCall::UnregisterTexture(texture_id));
        Ok(())
    }

    fn mark_texture_frame_available(&self, texture_id: i64) -> Result<()> {
        self.record(MockCall::MarkFrame(texture_id));
        Ok(())
    }

    fn run_task(&self, task: &RuntimeTask) -> Result<()> {
        self.record(MockCall::RunTask(task.id()));
        Ok(())
    }

    fn current_time(&self) -> u64 {
        self.clock.load(Ordering::Acquire)
    }

    fn update_locales(&self, locales: &[Locale]) -> Result<()> {
        self.record(MockCall::UpdateLocales(locales.len()));
        Ok(())
    }

    fn update_accessibility_features(&self, features: i64) -> Result<()> {
        self.record(MockCall::UpdateAccessibility(features));
        Ok(())
    }

    fn create_aot_data(&self, _elf_path: &Path) -> Result<AotData> {
        Ok(AotData(std::ptr::null_mut()))
    }

    fn collect_aot_data(&self, _data: AotData) -> Result<()> {
        self.record(MockCall::CollectAotData);
        Ok(())
    }

    fn runs_aot_compiled_code(&self) -> bool {
        false
    }
}

/// Response sink that counts writes, for exactly-once checks.
pub struct CountingWriter {
    pub writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl crate::core::channels::ResponseWriter for CountingWriter {
    fn write(&mut self, data: &[u8]) {
        self.writes.lock().unwrap().push(data.to_vec());
    }
}

/// Minimal bundle directory an interpreted-mode engine can launch from.
pub fn fixture_bundle() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets/kernel_blob.bin"), b"snapshot").unwrap();
    std::fs::write(dir.path().join("icudtl.dat"), b"icu").unwrap();
    dir
}
