//! Render backend seam.
//!
//! The engine's GL bracket (make current, present, proc resolution) and
//! surface lifecycle go through [`RenderBackend`] so the window and
//! engine layers never depend on a concrete window-system integration.
//! Surfaces are addressed by window index; native handles are passed as
//! raw pointers at creation so the trait stays free of protocol types.

use std::ffi::c_void;
use std::sync::Mutex;

use tracing::debug;

use crate::core::errors::Result;

/// Native handles a window-system backend needs to bind a surface.
#[derive(Debug, Clone, Copy)]
pub struct NativeSurface {
    pub display: *mut c_void,
    pub surface: *mut c_void,
}

impl NativeSurface {
    pub fn headless() -> Self {
        Self { display: std::ptr::null_mut(), surface: std::ptr::null_mut() }
    }
}

pub trait RenderBackend: Send + Sync {
    /// Binds a drawable for the window at `index`. Called exactly once per
    /// window, after the first configure has been acknowledged.
    fn create_surface(&self, index: usize, native: NativeSurface, width: u32, height: u32)
        -> Result<()>;

    /// Applies a committed geometry change.
    fn resize(&self, index: usize, width: u32, height: u32) -> Result<()>;

    fn make_current(&self, index: usize) -> bool;
    fn clear_current(&self) -> bool;
    fn present(&self, index: usize) -> bool;
    fn make_resource_current(&self) -> bool;

    /// Resolves a GL entry point for the runtime. Null means unresolved.
    fn gl_proc_resolve(&self, name: &str) -> *mut c_void;
}

// ============================================================================
// Headless backend
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCall {
    CreateSurface { index: usize, width: u32, height: u32 },
    Resize { index: usize, width: u32, height: u32 },
}

/// Backend that tracks geometry but renders nothing. Used when no GPU
/// surface is wanted and as the recording double in tests.
#[derive(Default)]
pub struct HeadlessBackend {
    calls: Mutex<Vec<BackendCall>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_surface(
        &self,
        index: usize,
        _native: NativeSurface,
        width: u32,
        height: u32,
    ) -> Result<()> {
        debug!("headless surface for window {index}: {width}x{height}");
        self.calls.lock().unwrap().push(BackendCall::CreateSurface { index, width, height });
        Ok(())
    }

    fn resize(&self, index: usize, width: u32, height: u32) -> Result<()> {
        self.calls.lock().unwrap().push(BackendCall::Resize { index, width, height });
        Ok(())
    }

    fn make_current(&self, _index: usize) -> bool {
        true
    }

    fn clear_current(&self) -> bool {
        true
    }

    fn present(&self, _index: usize) -> bool {
        true
    }

    fn make_resource_current(&self) -> bool {
        true
    }

    fn gl_proc_resolve(&self, _name: &str) -> *mut c_void {
        std::ptr::null_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_backend_records_surface_lifecycle() {
        let backend = HeadlessBackend::new();
        backend.create_surface(0, NativeSurface::headless(), 640, 480).unwrap();
        backend.resize(0, 800, 600).unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                BackendCall::CreateSurface { index: 0, width: 640, height: 480 },
                BackendCall::Resize { index: 0, width: 800, height: 600 },
            ]
        );
    }
}
