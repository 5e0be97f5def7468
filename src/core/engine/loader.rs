//! Runtime library resolution.
//!
//! The only place in the crate that touches `libloading`. A bundle may
//! carry its own runtime under `<bundle>/lib/`; that copy wins over
//! whatever the dynamic linker finds on the system search path. Symbol
//! resolution is all-or-nothing: any missing export is a boot failure.

use std::path::Path;

use tracing::{debug, info};

use crate::core::engine::abi::ProcTable;
use crate::core::engine::api::LoadedRuntime;
use crate::core::errors::{EmbedderError, Result};

/// File name of the runtime shared library, bundled or system.
pub const RUNTIME_LIBRARY_NAME: &str = "libtanoak_runtime.so";

/// Loads the runtime library for `bundle` and resolves the full proc table.
pub fn load(bundle: &Path) -> Result<LoadedRuntime> {
    let bundled = bundle.join("lib").join(RUNTIME_LIBRARY_NAME);
    let library = if bundled.is_file() {
        info!("loading bundled runtime: {}", bundled.display());
        unsafe { libloading::Library::new(&bundled) }.map_err(|e| {
            EmbedderError::runtime_boot(format!("cannot load {}: {e}", bundled.display()))
        })?
    } else {
        info!("no bundled runtime, loading system {RUNTIME_LIBRARY_NAME}");
        unsafe { libloading::Library::new(RUNTIME_LIBRARY_NAME) }.map_err(|e| {
            EmbedderError::runtime_boot(format!("cannot load {RUNTIME_LIBRARY_NAME}: {e}"))
        })?
    };

    let table = resolve_table(&library)?;
    debug!("runtime proc table resolved");
    Ok(LoadedRuntime::new(table, library))
}

/// Resolves one export, with the symbol name in the failure.
fn symbol<T: Copy>(library: &libloading::Library, name: &'static str) -> Result<T> {
    // libloading requires a NUL-terminated byte pattern for lookup.
    let mut bytes = name.as_bytes().to_vec();
    bytes.push(0);
    let sym: libloading::Symbol<T> = unsafe { library.get(&bytes) }
        .map_err(|_| EmbedderError::MissingSymbol(name.to_string()))?;
    Ok(*sym)
}

fn resolve_table(library: &libloading::Library) -> Result<ProcTable> {
    Ok(ProcTable {
        initialize: symbol(library, "RuntimeInitialize")?,
        run_initialized: symbol(library, "RuntimeRunInitialized")?,
        shutdown: symbol(library, "RuntimeShutdown")?,
        send_window_metrics_event: symbol(library, "RuntimeSendWindowMetricsEvent")?,
        send_pointer_event: symbol(library, "RuntimeSendPointerEvent")?,
        send_platform_message: symbol(library, "RuntimeSendPlatformMessage")?,
        send_platform_message_response: symbol(library, "RuntimeSendPlatformMessageResponse")?,
        register_external_texture: symbol(library, "RuntimeRegisterExternalTexture")?,
        unregister_external_texture: symbol(library, "RuntimeUnregisterExternalTexture")?,
        mark_external_texture_frame_available: symbol(
            library,
            "RuntimeMarkExternalTextureFrameAvailable",
        )?,
        run_task: symbol(library, "RuntimeRunTask")?,
        get_current_time: symbol(library, "RuntimeGetCurrentTime")?,
        update_locales: symbol(library, "RuntimeUpdateLocales")?,
        update_accessibility_features: symbol(library, "RuntimeUpdateAccessibilityFeatures")?,
        create_aot_data: symbol(library, "RuntimeCreateAOTData")?,
        collect_aot_data: symbol(library, "RuntimeCollectAOTData")?,
        runs_aot_compiled_code: symbol(library, "RuntimeRunsAOTCompiledCode")?,
    })
}
