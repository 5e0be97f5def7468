//! Embedding ABI, version 1.
//!
//! `#[repr(C)]` mirror of the runtime's embedder header. Nothing in this
//! module talks to a library; it only defines the shapes the loader
//! resolves and the trampolines marshal. The rest of the crate never
//! sees these types; it goes through [`RuntimeApi`](super::api::RuntimeApi).

#![allow(clippy::missing_safety_doc)]

use std::os::raw::{c_char, c_int, c_void};

/// ABI version passed to `RuntimeInitialize`.
pub const ABI_VERSION: usize = 1;

/// Opaque handle to a running runtime instance.
pub type RawEngineHandle = *mut c_void;

/// Opaque AOT data handle.
pub type RawAotData = *mut c_void;

/// Opaque response handle owned by the runtime.
#[repr(C)]
pub struct RawResponseHandle {
    _private: [u8; 0],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawResult {
    Success = 0,
    InvalidLibraryVersion = 1,
    InvalidArguments = 2,
    InternalInconsistency = 3,
}

/// A deferred task posted by the runtime. Opaque except for identity.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawTask {
    pub runner: *mut c_void,
    pub task: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawWindowMetricsEvent {
    pub struct_size: usize,
    pub width: usize,
    pub height: usize,
    pub pixel_ratio: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawPointerEvent {
    pub struct_size: usize,
    pub phase: i32,
    pub timestamp: u64,
    pub x: f64,
    pub y: f64,
    pub device: i32,
    pub signal_kind: i32,
    pub scroll_delta_x: f64,
    pub scroll_delta_y: f64,
    pub device_kind: i32,
    pub buttons: i64,
}

#[repr(C)]
pub struct RawPlatformMessage {
    pub struct_size: usize,
    pub channel: *const c_char,
    pub message: *const u8,
    pub message_size: usize,
    pub response_handle: *const RawResponseHandle,
}

#[repr(C)]
pub struct RawLocale {
    pub struct_size: usize,
    pub language_code: *const c_char,
    pub country_code: *const c_char,
    pub script_code: *const c_char,
    pub variant_code: *const c_char,
}

pub type RunsTaskOnCurrentThreadCallback = unsafe extern "C" fn(user_data: *mut c_void) -> bool;
pub type PostTaskCallback =
    unsafe extern "C" fn(task: RawTask, target_time_nanos: u64, user_data: *mut c_void);
pub type PlatformMessageCallback =
    unsafe extern "C" fn(message: *const RawPlatformMessage, user_data: *mut c_void);
pub type LogMessageCallback =
    unsafe extern "C" fn(tag: *const c_char, message: *const c_char, user_data: *mut c_void);

#[repr(C)]
pub struct RawTaskRunnerDescription {
    pub struct_size: usize,
    pub user_data: *mut c_void,
    pub runs_task_on_current_thread_callback: Option<RunsTaskOnCurrentThreadCallback>,
    pub post_task_callback: Option<PostTaskCallback>,
}

#[repr(C)]
pub struct RawCustomTaskRunners {
    pub struct_size: usize,
    pub platform_task_runner: *const RawTaskRunnerDescription,
}

pub type BoolCallback = unsafe extern "C" fn(user_data: *mut c_void) -> bool;
pub type UIntCallback = unsafe extern "C" fn(user_data: *mut c_void) -> u32;
pub type ProcResolver =
    unsafe extern "C" fn(user_data: *mut c_void, name: *const c_char) -> *mut c_void;

#[repr(C)]
pub struct RawOpenGLTexture {
    pub target: u32,
    pub name: u32,
    pub format: u32,
}

pub type ExternalTextureFrameCallback = unsafe extern "C" fn(
    user_data: *mut c_void,
    texture_id: i64,
    width: usize,
    height: usize,
    texture_out: *mut RawOpenGLTexture,
) -> bool;

#[repr(C)]
pub struct RawOpenGLRendererConfig {
    pub struct_size: usize,
    pub make_current: Option<BoolCallback>,
    pub clear_current: Option<BoolCallback>,
    pub present: Option<BoolCallback>,
    pub fbo_callback: Option<UIntCallback>,
    pub make_resource_current: Option<BoolCallback>,
    pub gl_proc_resolver: Option<ProcResolver>,
    pub gl_external_texture_frame_callback: Option<ExternalTextureFrameCallback>,
}

/// Renderer selection. Only the OpenGL arm exists in ABI v1.
#[repr(C)]
pub struct RawRendererConfig {
    pub renderer_type: i32,
    pub open_gl: RawOpenGLRendererConfig,
}

pub const RENDERER_TYPE_OPENGL: i32 = 0;

#[repr(C)]
pub struct RawProjectArgs {
    pub struct_size: usize,
    pub assets_path: *const c_char,
    pub icu_data_path: *const c_char,
    pub command_line_argc: c_int,
    pub command_line_argv: *const *const c_char,
    pub platform_message_callback: Option<PlatformMessageCallback>,
    pub log_message_callback: Option<LogMessageCallback>,
    pub custom_task_runners: *const RawCustomTaskRunners,
    pub aot_data: RawAotData,
    pub persistent_cache_path: *const c_char,
}

pub const AOT_DATA_SOURCE_ELF_PATH: i32 = 0;

#[repr(C)]
pub struct RawAotDataSource {
    pub source_type: i32,
    pub elf_path: *const c_char,
}

/// The resolved function table. One field per exported symbol; resolution
/// of every field is mandatory at boot.
pub struct ProcTable {
    pub initialize: unsafe extern "C" fn(
        version: usize,
        config: *const RawRendererConfig,
        args: *const RawProjectArgs,
        user_data: *mut c_void,
        engine_out: *mut RawEngineHandle,
    ) -> RawResult,
    pub run_initialized: unsafe extern "C" fn(engine: RawEngineHandle) -> RawResult,
    pub shutdown: unsafe extern "C" fn(engine: RawEngineHandle) -> RawResult,
    pub send_window_metrics_event:
        unsafe extern "C" fn(engine: RawEngineHandle, event: *const RawWindowMetricsEvent) -> RawResult,
    pub send_pointer_event: unsafe extern "C" fn(
        engine: RawEngineHandle,
        events: *const RawPointerEvent,
        events_count: usize,
    ) -> RawResult,
    pub send_platform_message:
        unsafe extern "C" fn(engine: RawEngineHandle, message: *const RawPlatformMessage) -> RawResult,
    pub send_platform_message_response: unsafe extern "C" fn(
        engine: RawEngineHandle,
        handle: *const RawResponseHandle,
        data: *const u8,
        data_length: usize,
    ) -> RawResult,
    pub register_external_texture:
        unsafe extern "C" fn(engine: RawEngineHandle, texture_id: i64) -> RawResult,
    pub unregister_external_texture:
        unsafe extern "C" fn(engine: RawEngineHandle, texture_id: i64) -> RawResult,
    pub mark_external_texture_frame_available:
        unsafe extern "C" fn(engine: RawEngineHandle, texture_id: i64) -> RawResult,
    pub run_task: unsafe extern "C" fn(engine: RawEngineHandle, task: *const RawTask) -> RawResult,
    pub get_current_time: unsafe extern "C" fn() -> u64,
    pub update_locales: unsafe extern "C" fn(
        engine: RawEngineHandle,
        locales: *const *const RawLocale,
        locales_count: usize,
    ) -> RawResult,
    pub update_accessibility_features:
        unsafe extern "C" fn(engine: RawEngineHandle, features: i64) -> RawResult,
    pub create_aot_data:
        unsafe extern "C" fn(source: *const RawAotDataSource, data_out: *mut RawAotData) -> RawResult,
    pub collect_aot_data: unsafe extern "C" fn(data: RawAotData) -> RawResult,
    pub runs_aot_compiled_code: unsafe extern "C" fn() -> bool,
}
