//! External texture bridge.
//!
//! Plugins that produce pixels outside the runtime (video frames, camera
//! previews) publish them as external GL textures. A [`Texture`] pairs a
//! GL name with a registry id; the runtime compositor samples it through
//! the engine's frame callback whenever a frame has been marked
//! available.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::engine::api::ExternalTextureFrame;
use crate::core::engine::Engine;
use crate::core::errors::Result;

/// Plugin callback run inside the backend's GL bracket.
pub type TextureCallback = Box<dyn Fn(&Texture) + Send + Sync>;

pub struct Texture {
    id: i64,
    target: u32,
    format: u32,
    /// GL texture name, set by the producer once allocated.
    name: AtomicU32,
    width: u32,
    height: u32,
    enabled: AtomicBool,
    /// Set by the producer when a new frame is ready; cleared by the
    /// once-per-loop draw pass.
    draw_next: AtomicBool,
    on_create: Option<TextureCallback>,
    on_draw: Option<TextureCallback>,
    on_dispose: Option<TextureCallback>,
}

impl Texture {
    pub fn new(
        id: i64,
        width: u32,
        height: u32,
        on_create: Option<TextureCallback>,
        on_draw: Option<TextureCallback>,
        on_dispose: Option<TextureCallback>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            target: gl::TEXTURE_2D,
            format: gl::RGBA8,
            name: AtomicU32::new(0),
            width,
            height,
            enabled: AtomicBool::new(false),
            draw_next: AtomicBool::new(false),
            on_create,
            on_draw,
            on_dispose,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Records the allocated GL name. Called by the producer after it has
    /// created the texture object.
    pub fn set_gl_name(&self, name: u32) {
        self.name.store(name, Ordering::Release);
    }

    /// Runs the producer's create callback. Called by the engine during
    /// registration, inside the backend's GL bracket.
    pub(crate) fn run_create(&self) {
        if let Some(on_create) = &self.on_create {
            on_create(self);
        }
        debug!("texture {} created ({}x{})", self.id, self.width, self.height);
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Withdraws the texture from the compositor but keeps the entry.
    pub fn disable(&self, engine: &Engine) -> Result<()> {
        self.enabled.store(false, Ordering::Release);
        engine.texture_disable(self.id)
    }

    /// Flags a new frame for the next draw pass. Callable from producer
    /// threads.
    pub fn frame_ready(&self) {
        self.draw_next.store(true, Ordering::Release);
    }

    /// Once-per-loop draw opportunity: runs the producer callback and
    /// signals frame availability, only when a frame was flagged.
    pub fn draw(&self, engine: &Engine) {
        if !self.draw_next.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(on_draw) = &self.on_draw {
            on_draw(self);
        }
        if let Err(e) = engine.mark_texture_frame_available(self.id) {
            warn!("texture {} frame signal failed: {e}", self.id);
        }
    }

    /// Runs the dispose callback and removes the registry entry. A second
    /// dispose finds the entry already gone and does nothing further.
    pub fn dispose(&self, engine: &Engine) {
        if self.enabled.swap(false, Ordering::AcqRel) {
            if let Err(e) = engine.texture_disable(self.id) {
                warn!("texture {} disable on dispose failed: {e}", self.id);
            }
        }
        if let Some(on_dispose) = &self.on_dispose {
            on_dispose(self);
        }
        engine.texture_registry_remove(self.id);
    }

    /// Frame description for the runtime compositor. `None` while the
    /// texture is disabled or has no GL name yet.
    pub fn frame(&self) -> Option<ExternalTextureFrame> {
        if !self.enabled.load(Ordering::Acquire) {
            return None;
        }
        let name = self.name.load(Ordering::Acquire);
        if name == 0 {
            return None;
        }
        Some(ExternalTextureFrame { target: self.target, name, format: self.format })
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("size", &(self.width, self.height))
            .field("enabled", &self.enabled.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_is_absent_until_enabled_and_named() {
        let texture = Texture::new(7, 64, 64, None, None, None);
        assert!(texture.frame().is_none());

        texture.enabled.store(true, Ordering::Release);
        assert!(texture.frame().is_none());

        texture.set_gl_name(42);
        let frame = texture.frame().unwrap();
        assert_eq!(frame.name, 42);
        assert_eq!(frame.target, gl::TEXTURE_2D);
        assert_eq!(frame.format, gl::RGBA8);
    }

    #[test]
    fn frame_ready_is_consumed_by_one_draw() {
        let texture = Texture::new(1, 8, 8, None, None, None);
        texture.frame_ready();
        assert!(texture.draw_next.swap(false, Ordering::AcqRel));
        assert!(!texture.draw_next.load(Ordering::Acquire));
    }
}
