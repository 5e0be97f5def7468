//! Safe seam over the embedding ABI.
//!
//! [`RuntimeApi`] is everything the embedder calls *into* the runtime;
//! [`RuntimeHooks`] is everything the runtime calls back *out of* itself
//! (task posting, platform messages, logging, GL access). One
//! implementation exists per supported ABI version (currently only
//! [`LoadedRuntime`] for v1), so the rest of the core depends on the
//! traits, never on loading mechanics or raw tables.

use std::ffi::{c_void, CStr, CString};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{error, warn};

use crate::core::channels::{PlatformMessage, Responder, ResponseWriter};
use crate::core::engine::abi::{self, ProcTable, RawResult};
use crate::core::errors::{EmbedderError, Result};

// ============================================================================
// Safe event and task types
// ============================================================================

/// Pointer lifecycle phase, numbering shared with the ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Cancel = 0,
    Up = 1,
    Down = 2,
    Move = 3,
    Add = 4,
    Remove = 5,
    Hover = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    None = 0,
    Scroll = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Mouse = 1,
    Touch = 2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub timestamp: u64,
    pub x: f64,
    pub y: f64,
    pub device: i32,
    pub signal_kind: SignalKind,
    pub scroll_delta_x: f64,
    pub scroll_delta_y: f64,
    pub device_kind: DeviceKind,
    pub buttons: i64,
}

impl PointerEvent {
    pub(crate) fn to_raw(self) -> abi::RawPointerEvent {
        abi::RawPointerEvent {
            struct_size: std::mem::size_of::<abi::RawPointerEvent>(),
            phase: self.phase as i32,
            timestamp: self.timestamp,
            x: self.x,
            y: self.y,
            device: self.device,
            signal_kind: self.signal_kind as i32,
            scroll_delta_x: self.scroll_delta_x,
            scroll_delta_y: self.scroll_delta_y,
            device_kind: self.device_kind as i32,
            buttons: self.buttons,
        }
    }
}

/// A deferred task handed out by the runtime. Opaque except for identity;
/// execution goes back through [`RuntimeApi::run_task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeTask {
    runner: usize,
    id: u64,
}

impl RuntimeTask {
    pub(crate) fn from_raw(raw: abi::RawTask) -> Self {
        Self { runner: raw.runner as usize, id: raw.task }
    }

    pub(crate) fn to_raw(self) -> abi::RawTask {
        abi::RawTask { runner: self.runner as *mut c_void, task: self.id }
    }

    /// Test constructor; production tasks only come from the runtime.
    pub fn synthetic(id: u64) -> Self {
        Self { runner: 0, id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

// Task identity is plain data; the runner pointer is only ever handed
// back to the runtime that produced it.
unsafe impl Send for RuntimeTask {}
unsafe impl Sync for RuntimeTask {}

#[derive(Debug, Clone)]
pub struct Locale {
    pub language: String,
    pub country: Option<String>,
    pub script: Option<String>,
}

impl Locale {
    pub fn new(language: &str) -> Self {
        Self { language: language.to_string(), country: None, script: None }
    }
}

/// Opaque AOT data blob handle, owned until collected.
#[derive(Debug)]
pub struct AotData(pub(crate) abi::RawAotData);

unsafe impl Send for AotData {}
unsafe impl Sync for AotData {}

/// Everything `initialize` needs besides callbacks.
#[derive(Debug)]
pub struct RuntimeLaunchArgs {
    pub assets_path: PathBuf,
    pub icu_data_path: PathBuf,
    pub persistent_cache_path: PathBuf,
    pub command_line_args: Vec<String>,
    pub aot_data: Option<AotData>,
}

// ============================================================================
// Traits
// ============================================================================

/// Callbacks the runtime makes into the embedder.
///
/// `post_task` and `on_platform_message` may be invoked from
/// runtime-owned worker threads; implementations must lock accordingly.
pub trait RuntimeHooks: Send + Sync {
    fn on_platform_message(&self, message: PlatformMessage, responder: Responder);
    fn post_task(&self, task: RuntimeTask, target_time_nanos: u64);
    fn log_message(&self, tag: &str, message: &str);

    /// Whether the caller is on the embedder thread. The embedder runs a
    /// single platform task runner, so the default answers yes.
    fn runs_on_embedder_thread(&self) -> bool {
        true
    }

    // GL bracket, delegated to the render backend.
    fn gl_make_current(&self) -> bool;
    fn gl_clear_current(&self) -> bool;
    fn gl_present(&self) -> bool;
    fn gl_fbo(&self) -> u32 {
        0
    }
    fn gl_make_resource_current(&self) -> bool;
    fn gl_proc_resolve(&self, name: &str) -> *mut c_void;

    /// Resolve an external texture frame for the runtime compositor.
    /// `None` aborts the texture paint for this frame.
    fn external_texture_frame(&self, texture_id: i64, width: usize, height: usize)
        -> Option<ExternalTextureFrame>;
}

#[derive(Debug, Clone, Copy)]
pub struct ExternalTextureFrame {
    pub target: u32,
    pub name: u32,
    pub format: u32,
}

/// Calls the embedder makes into the runtime.
pub trait RuntimeApi: Send + Sync {
    fn initialize(&self, args: RuntimeLaunchArgs, hooks: Arc<dyn RuntimeHooks>) -> Result<()>;
    fn run_initialized(&self) -> Result<()>;
    fn shutdown(&self) -> Result<()>;

    fn send_window_metrics(&self, width: usize, height: usize, pixel_ratio: f64) -> Result<()>;
    fn send_pointer_events(&self, events: &[PointerEvent]) -> Result<()>;
    fn send_platform_message(&self, channel: &str, payload: &[u8]) -> Result<()>;

    fn register_external_texture(&self, texture_id: i64) -> Result<()>;
    fn unregister_external_texture(&self, texture_id: i64) -> Result<()>;
    fn mark_texture_frame_available(&self, texture_id: i64) -> Result<()>;

    fn run_task(&self, task: &RuntimeTask) -> Result<()>;
    fn current_time(&self) -> u64;

    fn update_locales(&self, locales: &[Locale]) -> Result<()>;
    fn update_accessibility_features(&self, features: i64) -> Result<()>;

    fn create_aot_data(&self, elf_path: &Path) -> Result<AotData>;
    fn collect_aot_data(&self, data: AotData) -> Result<()>;
    fn runs_aot_compiled_code(&self) -> bool;
}

// ============================================================================
// Loaded implementation (ABI v1)
// ============================================================================

/// Shared state reachable from C trampolines. The `user_data` pointer
/// handed to the runtime is `Arc::as_ptr` of this struct; [`LoadedRuntime`]
/// keeps the Arc alive for as long as callbacks can fire.
pub(crate) struct RuntimeShared {
    pub(crate) table: ProcTable,
    handle: AtomicPtr<c_void>,
    hooks: RwLock<Option<Arc<dyn RuntimeHooks>>>,
}

impl RuntimeShared {
    fn handle(&self) -> abi::RawEngineHandle {
        self.handle.load(Ordering::Acquire)
    }

    fn hooks(&self) -> Option<Arc<dyn RuntimeHooks>> {
        self.hooks.read().unwrap().clone()
    }
}

/// The v1 embedding ABI behind [`RuntimeApi`].
pub struct LoadedRuntime {
    shared: Arc<RuntimeShared>,
    // Keeps the shared library mapped for the lifetime of the table.
    _library: libloading::Library,
}

impl LoadedRuntime {
    pub(crate) fn new(table: ProcTable, library: libloading::Library) -> Self {
        Self {
            shared: Arc::new(RuntimeShared {
                table,
                handle: AtomicPtr::new(std::ptr::null_mut()),
                hooks: RwLock::new(None),
            }),
            _library: library,
        }
    }

    fn user_data(&self) -> *mut c_void {
        Arc::as_ptr(&self.shared) as *mut c_void
    }

    fn check(result: RawResult, what: &'static str) -> Result<()> {
        if result == RawResult::Success {
            Ok(())
        } else {
            Err(EmbedderError::RuntimeCall(what))
        }
    }
}

/// Answers one platform message through the ABI. Sendable because the
/// response handle stays owned by the runtime until answered.
struct RawResponseWriter {
    shared: Arc<RuntimeShared>,
    response_handle: *const abi::RawResponseHandle,
}

unsafe impl Send for RawResponseWriter {}

impl ResponseWriter for RawResponseWriter {
    fn write(&mut self, data: &[u8]) {
        let result = unsafe {
            (self.shared.table.send_platform_message_response)(
                self.shared.handle(),
                self.response_handle,
                data.as_ptr(),
                data.len(),
            )
        };
        if result != RawResult::Success {
            error!("platform message response rejected by runtime");
        }
    }
}

unsafe extern "C" fn platform_message_trampoline(
    message: *const abi::RawPlatformMessage,
    user_data: *mut c_void,
) {
    let shared_ptr = user_data as *const RuntimeShared;
    let shared = &*shared_ptr;
    let Some(hooks) = shared.hooks() else { return };

    let raw = &*message;
    let channel = CStr::from_ptr(raw.channel).to_string_lossy().into_owned();
    let payload = if raw.message.is_null() {
        Vec::new()
    } else {
        std::slice::from_raw_parts(raw.message, raw.message_size).to_vec()
    };

    // The Arc clone here must not drop shared: resurrect one reference
    // without touching the count owned by LoadedRuntime.
    Arc::increment_strong_count(shared_ptr);
    let shared = Arc::from_raw(shared_ptr);

    let responder = Responder::new(Box::new(RawResponseWriter {
        shared,
        response_handle: raw.response_handle,
    }));
    hooks.on_platform_message(PlatformMessage { channel, payload }, responder);
}

unsafe extern "C" fn post_task_trampoline(task: abi::RawTask, target_time: u64, user_data: *mut c_void) {
    let shared = &*(user_data as *const RuntimeShared);
    match shared.hooks() {
        Some(hooks) => hooks.post_task(RuntimeTask::from_raw(task), target_time),
        None => warn!("task posted before hooks were installed; dropped"),
    }
}

unsafe extern "C" fn runs_on_thread_trampoline(user_data: *mut c_void) -> bool {
    let shared = &*(user_data as *const RuntimeShared);
    shared.hooks().map_or(true, |h| h.runs_on_embedder_thread())
}

unsafe extern "C" fn log_message_trampoline(
    tag: *const std::os::raw::c_char,
    message: *const std::os::raw::c_char,
    user_data: *mut c_void,
) {
    let shared = &*(user_data as *const RuntimeShared);
    let tag = CStr::from_ptr(tag).to_string_lossy();
    let message = CStr::from_ptr(message).to_string_lossy();
    match shared.hooks() {
        Some(hooks) => hooks.log_message(&tag, &message),
        None => tracing::info!("[{tag}] {message}"),
    }
}

macro_rules! gl_bool_trampoline {
    ($name:ident, $method:ident) => {
        unsafe extern "C" fn $name(user_data: *mut c_void) -> bool {
            let shared = &*(user_data as *const RuntimeShared);
            shared.hooks().map_or(false, |h| h.$method())
        }
    };
}

gl_bool_trampoline!(gl_make_current_trampoline, gl_make_current);
gl_bool_trampoline!(gl_clear_current_trampoline, gl_clear_current);
gl_bool_trampoline!(gl_present_trampoline, gl_present);
gl_bool_trampoline!(gl_make_resource_current_trampoline, gl_make_resource_current);

unsafe extern "C" fn gl_fbo_trampoline(user_data: *mut c_void) -> u32 {
    let shared = &*(user_data as *const RuntimeShared);
    shared.hooks().map_or(0, |h| h.gl_fbo())
}

unsafe extern "C" fn gl_proc_resolver_trampoline(
    user_data: *mut c_void,
    name: *const std::os::raw::c_char,
) -> *mut c_void {
    let shared = &*(user_data as *const RuntimeShared);
    let name = CStr::from_ptr(name).to_string_lossy();
    shared.hooks().map_or(std::ptr::null_mut(), |h| h.gl_proc_resolve(&name))
}

unsafe extern "C" fn external_texture_trampoline(
    user_data: *mut c_void,
    texture_id: i64,
    width: usize,
    height: usize,
    texture_out: *mut abi::RawOpenGLTexture,
) -> bool {
    let shared = &*(user_data as *const RuntimeShared);
    let Some(hooks) = shared.hooks() else { return false };
    match hooks.external_texture_frame(texture_id, width, height) {
        Some(frame) => {
            (*texture_out).target = frame.target;
            (*texture_out).name = frame.name;
            (*texture_out).format = frame.format;
            true
        }
        None => false,
    }
}

fn path_cstring(path: &Path) -> Result<CString> {
    CString::new(path.to_string_lossy().as_bytes())
        .map_err(|_| EmbedderError::runtime_boot(format!("path not representable: {}", path.display())))
}

impl RuntimeApi for LoadedRuntime {
    fn initialize(&self, args: RuntimeLaunchArgs, hooks: Arc<dyn RuntimeHooks>) -> Result<()> {
        *self.shared.hooks.write().unwrap() = Some(hooks);

        let assets = path_cstring(&args.assets_path)?;
        let icu = path_cstring(&args.icu_data_path)?;
        let cache = path_cstring(&args.persistent_cache_path)?;
        let argv_owned: Vec<CString> = args
            .command_line_args
            .iter()
            .map(|a| CString::new(a.as_str()).unwrap_or_default())
            .collect();
        let argv: Vec<*const std::os::raw::c_char> = argv_owned.iter().map(|a| a.as_ptr()).collect();

        let task_runner = abi::RawTaskRunnerDescription {
            struct_size: std::mem::size_of::<abi::RawTaskRunnerDescription>(),
            user_data: self.user_data(),
            runs_task_on_current_thread_callback: Some(runs_on_thread_trampoline),
            post_task_callback: Some(post_task_trampoline),
        };
        let custom_task_runners = abi::RawCustomTaskRunners {
            struct_size: std::mem::size_of::<abi::RawCustomTaskRunners>(),
            platform_task_runner: &task_runner,
        };

        let renderer_config = abi::RawRendererConfig {
            renderer_type: abi::RENDERER_TYPE_OPENGL,
            open_gl: abi::RawOpenGLRendererConfig {
                struct_size: std::mem::size_of::<abi::RawOpenGLRendererConfig>(),
                make_current: Some(gl_make_current_trampoline),
                clear_current: Some(gl_clear_current_trampoline),
                present: Some(gl_present_trampoline),
                fbo_callback: Some(gl_fbo_trampoline),
                make_resource_current: Some(gl_make_resource_current_trampoline),
                gl_proc_resolver: Some(gl_proc_resolver_trampoline),
                gl_external_texture_frame_callback: Some(external_texture_trampoline),
            },
        };

        let project_args = abi::RawProjectArgs {
            struct_size: std::mem::size_of::<abi::RawProjectArgs>(),
            assets_path: assets.as_ptr(),
            icu_data_path: icu.as_ptr(),
            command_line_argc: argv.len() as std::os::raw::c_int,
            command_line_argv: if argv.is_empty() { std::ptr::null() } else { argv.as_ptr() },
            platform_message_callback: Some(platform_message_trampoline),
            log_message_callback: Some(log_message_trampoline),
            custom_task_runners: &custom_task_runners,
            aot_data: args.aot_data.map_or(std::ptr::null_mut(), |d| d.0),
            persistent_cache_path: cache.as_ptr(),
        };

        let mut handle: abi::RawEngineHandle = std::ptr::null_mut();
        let result = unsafe {
            (self.shared.table.initialize)(
                abi::ABI_VERSION,
                &renderer_config,
                &project_args,
                self.user_data(),
                &mut handle,
            )
        };
        Self::check(result, "Initialize")?;
        if handle.is_null() {
            return Err(EmbedderError::runtime_boot("Initialize returned a null handle"));
        }
        self.shared.handle.store(handle, Ordering::Release);
        Ok(())
    }

    fn run_initialized(&self) -> Result<()> {
        Self::check(unsafe { (self.shared.table.run_initialized)(self.shared.handle()) }, "RunInitialized")
    }

    fn shutdown(&self) -> Result<()> {
        let handle = self.shared.handle.swap(std::ptr::null_mut(), Ordering::AcqRel);
        if handle.is_null() {
            return Ok(());
        }
        Self::check(unsafe { (self.shared.table.shutdown)(handle) }, "Shutdown")
    }

    fn send_window_metrics(&self, width: usize, height: usize, pixel_ratio: f64) -> Result<()> {
        let event = abi::RawWindowMetricsEvent {
            struct_size: std::mem::size_of::<abi::RawWindowMetricsEvent>(),
            width,
            height,
            pixel_ratio,
        };
        Self::check(
            unsafe { (self.shared.table.send_window_metrics_event)(self.shared.handle(), &event) },
            "SendWindowMetricsEvent",
        )
    }

    fn send_pointer_events(&self, events: &[PointerEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        let raw: Vec<abi::RawPointerEvent> = events.iter().map(|e| e.to_raw()).collect();
        Self::check(
            unsafe {
                (self.shared.table.send_pointer_event)(self.shared.handle(), raw.as_ptr(), raw.len())
            },
            "SendPointerEvent",
        )
    }

    fn send_platform_message(&self, channel: &str, payload: &[u8]) -> Result<()> {
        let channel = CString::new(channel)
            .map_err(|_| EmbedderError::RuntimeCall("SendPlatformMessage: bad channel name"))?;
        let message = abi::RawPlatformMessage {
            struct_size: std::mem::size_of::<abi::RawPlatformMessage>(),
            channel: channel.as_ptr(),
            message: payload.as_ptr(),
            message_size: payload.len(),
            response_handle: std::ptr::null(),
        };
        Self::check(
            unsafe { (self.shared.table.send_platform_message)(self.shared.handle(), &message) },
            "SendPlatformMessage",
        )
    }

    fn register_external_texture(&self, texture_id: i64) -> Result<()> {
        Self::check(
            unsafe { (self.shared.table.register_external_texture)(self.shared.handle(), texture_id) },
            "RegisterExternalTexture",
        )
    }

    fn unregister_external_texture(&self, texture_id: i64) -> Result<()> {
        Self::check(
            unsafe { (self.shared.table.unregister_external_texture)(self.shared.handle(), texture_id) },
            "UnregisterExternalTexture",
        )
    }

    fn mark_texture_frame_available(&self, texture_id: i64) -> Result<()> {
        Self::check(
            unsafe {
                (self.shared.table.mark_external_texture_frame_available)(self.shared.handle(), texture_id)
            },
            "MarkExternalTextureFrameAvailable",
        )
    }

    fn run_task(&self, task: &RuntimeTask) -> Result<()> {
        let raw = task.to_raw();
        Self::check(unsafe { (self.shared.table.run_task)(self.shared.handle(), &raw) }, "RunTask")
    }

    fn current_time(&self) -> u64 {
        unsafe { (self.shared.table.get_current_time)() }
    }

    fn update_locales(&self, locales: &[Locale]) -> Result<()> {
        let owned: Vec<(CString, Option<CString>, Option<CString>)> = locales
            .iter()
            .map(|l| {
                (
                    CString::new(l.language.as_str()).unwrap_or_default(),
                    l.country.as_deref().map(|c| CString::new(c).unwrap_or_default()),
                    l.script.as_deref().map(|s| CString::new(s).unwrap_or_default()),
                )
            })
            .collect();
        let raw: Vec<abi::RawLocale> = owned
            .iter()
            .map(|(lang, country, script)| abi::RawLocale {
                struct_size: std::mem::size_of::<abi::RawLocale>(),
                language_code: lang.as_ptr(),
                country_code: country.as_ref().map_or(std::ptr::null(), |c| c.as_ptr()),
                script_code: script.as_ref().map_or(std::ptr::null(), |s| s.as_ptr()),
                variant_code: std::ptr::null(),
            })
            .collect();
        let pointers: Vec<*const abi::RawLocale> = raw.iter().map(|l| l as *const _).collect();
        Self::check(
            unsafe {
                (self.shared.table.update_locales)(self.shared.handle(), pointers.as_ptr(), pointers.len())
            },
            "UpdateLocales",
        )
    }

    fn update_accessibility_features(&self, features: i64) -> Result<()> {
        Self::check(
            unsafe { (self.shared.table.update_accessibility_features)(self.shared.handle(), features) },
            "UpdateAccessibilityFeatures",
        )
    }

    fn create_aot_data(&self, elf_path: &Path) -> Result<AotData> {
        let path = path_cstring(elf_path)?;
        let source = abi::RawAotDataSource {
            source_type: abi::AOT_DATA_SOURCE_ELF_PATH,
            elf_path: path.as_ptr(),
        };
        let mut data: abi::RawAotData = std::ptr::null_mut();
        Self::check(unsafe { (self.shared.table.create_aot_data)(&source, &mut data) }, "CreateAOTData")?;
        Ok(AotData(data))
    }

    fn collect_aot_data(&self, data: AotData) -> Result<()> {
        Self::check(unsafe { (self.shared.table.collect_aot_data)(data.0) }, "CollectAOTData")
    }

    fn runs_aot_compiled_code(&self) -> bool {
        unsafe { (self.shared.table.runs_aot_compiled_code)() }
    }
}
