//! Central dispatch state.
//!
//! One `EmbedderState` implements every protocol `Dispatch` and owns the
//! globals, outputs, windows and per-window engine references. Windows
//! and engines are addressed by index; protocol object user data carries
//! the index, never a pointer.

use wayland_client::backend::ObjectId;
use wayland_client::delegate_noop;
use wayland_client::protocol::wl_compositor::WlCompositor;
use wayland_client::protocol::wl_keyboard::WlKeyboard;
use wayland_client::protocol::wl_pointer::WlPointer;
use wayland_client::protocol::wl_seat::WlSeat;
use wayland_client::protocol::wl_shm::WlShm;
use wayland_client::protocol::wl_subcompositor::WlSubcompositor;
use wayland_client::protocol::wl_subsurface::WlSubsurface;
use wayland_client::protocol::wl_surface::{self, WlSurface};
use wayland_client::protocol::wl_touch::WlTouch;
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle};
use wayland_protocols::xdg::shell::client::xdg_wm_base::XdgWmBase;

use tracing::{debug, info, warn};

use crate::core::backend::RenderBackend;
use crate::core::engine::api::PointerEvent;
use crate::core::engine::Engine;
use crate::core::errors::{EmbedderError, Result};
use crate::core::wayland::cursor::CursorState;
use crate::core::wayland::keyboard::{KeyboardState, KEY_EVENT_CHANNEL};
use crate::core::wayland::output::OutputInfo;
use crate::core::wayland::protocol::embed_shell::embed_shell::EmbedShell;
use crate::core::window::{decode_states, Window, WindowPhase, WindowType};
use crate::prelude::{Arc, HashMap};

/// Globals the embedder cannot run without; absence of any of them
/// after the initial roundtrip is protocol-fatal.
pub const MANDATORY_GLOBALS: [&str; 4] =
    ["wl_compositor", "wl_subcompositor", "wl_shm", "xdg_wm_base"];

/// Seat-wide input state shared by the pointer, keyboard and touch
/// handlers.
#[derive(Default)]
pub struct InputState {
    pub pointer_position: (f64, f64),
    pub buttons: i64,
    pub pointer_serial: u32,
    pub pointer_focus: Option<usize>,
    pub keyboard_focus: Option<usize>,
    pub touch_focus: Option<usize>,
    pub touch_down_count: u32,
    pub touch_points: HashMap<i32, (f64, f64)>,
}

pub struct EmbedderState {
    // Globals, bound by the registry handler.
    pub compositor: Option<WlCompositor>,
    pub subcompositor: Option<WlSubcompositor>,
    pub shm: Option<WlShm>,
    pub wm_base: Option<XdgWmBase>,
    pub seat: Option<WlSeat>,
    pub embed_shell: Option<EmbedShell>,
    pub embed_shell_bound: bool,
    pub(crate) pending_shell_roles: Vec<usize>,
    pub(crate) shell_ready_sent: bool,

    pub outputs: Vec<OutputInfo>,
    pub windows: Vec<Window>,
    engines: Vec<Option<Arc<Engine>>>,
    surface_to_window: HashMap<ObjectId, usize>,

    pub backend: Arc<dyn RenderBackend>,

    pub pointer: Option<WlPointer>,
    pub keyboard: Option<WlKeyboard>,
    pub touch: Option<WlTouch>,
    pub input: InputState,
    pub keyboard_state: KeyboardState,
    pub cursor: CursorState,
}

impl EmbedderState {
    pub fn new(backend: Arc<dyn RenderBackend>, cursor_theme_name: Option<String>) -> Self {
        Self {
            compositor: None,
            subcompositor: None,
            shm: None,
            wm_base: None,
            seat: None,
            embed_shell: None,
            embed_shell_bound: false,
            pending_shell_roles: Vec::new(),
            shell_ready_sent: false,
            outputs: Vec::new(),
            windows: Vec::new(),
            engines: Vec::new(),
            surface_to_window: HashMap::new(),
            backend,
            pointer: None,
            keyboard: None,
            touch: None,
            input: InputState::default(),
            keyboard_state: KeyboardState::default(),
            cursor: CursorState::with_theme_name(cursor_theme_name),
        }
    }

    /// Verifies the compositor offered everything the embedder cannot
    /// run without. Called once after the initial roundtrip.
    pub fn check_mandatory_globals(&self) -> Result<()> {
        let present = [
            self.compositor.is_some(),
            self.subcompositor.is_some(),
            self.shm.is_some(),
            self.wm_base.is_some(),
        ];
        for (name, present) in MANDATORY_GLOBALS.into_iter().zip(present) {
            if !present {
                return Err(EmbedderError::MissingGlobal(name));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Windows
    // ------------------------------------------------------------------

    /// Creates the surface pair and xdg role for a new window and commits
    /// the initial (buffer-less) state. The window is `WaitingConfigure`
    /// until the compositor answers.
    pub fn create_window(
        &mut self,
        qh: &QueueHandle<Self>,
        window_type: WindowType,
        app_id: &str,
        title: &str,
        width: u32,
        height: u32,
        fullscreen: bool,
    ) -> Result<usize> {
        let compositor =
            self.compositor.as_ref().ok_or(EmbedderError::MissingGlobal("wl_compositor"))?;
        let subcompositor = self
            .subcompositor
            .as_ref()
            .ok_or(EmbedderError::MissingGlobal("wl_subcompositor"))?;
        let wm_base = self.wm_base.as_ref().ok_or(EmbedderError::MissingGlobal("xdg_wm_base"))?;

        let index = self.windows.len();

        let base_surface = compositor.create_surface(qh, ());
        let runtime_surface = compositor.create_surface(qh, ());
        let subsurface = subcompositor.get_subsurface(&runtime_surface, &base_surface, qh, ());
        subsurface.set_position(0, 0);
        // The runtime surface commits on its own cadence.
        subsurface.set_desync();

        let xdg_surface = wm_base.get_xdg_surface(&base_surface, qh, index);
        let toplevel = xdg_surface.get_toplevel(qh, index);
        toplevel.set_app_id(app_id.to_string());
        toplevel.set_title(title.to_string());
        if fullscreen {
            toplevel.set_fullscreen(None);
        }
        let scale = self.buffer_scale(0);
        if scale > 1 {
            base_surface.set_buffer_scale(scale);
            runtime_surface.set_buffer_scale(scale);
        }
        base_surface.commit();

        self.surface_to_window.insert(base_surface.id(), index);
        self.surface_to_window.insert(runtime_surface.id(), index);

        let mut window = Window::new(
            index,
            window_type,
            app_id.to_string(),
            width,
            height,
            base_surface,
            runtime_surface,
            subsurface,
            xdg_surface,
            toplevel,
        );
        window.phase = WindowPhase::WaitingConfigure;
        window.buffer_scale = scale;
        self.windows.push(window);
        self.engines.push(None);

        self.apply_shell_role(index);
        info!("window {index} created ({window_type:?}, {width}x{height})");
        Ok(index)
    }

    pub fn window_index_for_surface(&self, surface: &WlSurface) -> Option<usize> {
        self.surface_to_window.get(&surface.id()).copied()
    }

    /// Committed integer scale of the output at `index`, or 1 while the
    /// output has not completed its first event burst.
    pub fn buffer_scale(&self, index: usize) -> i32 {
        self.outputs
            .get(index)
            .filter(|o| o.is_ready())
            .map_or(1, |o| o.description().scale.max(1))
    }

    pub fn attach_engine(&mut self, index: usize, engine: Arc<Engine>) -> Result<()> {
        let slot = self
            .engines
            .get_mut(index)
            .ok_or(EmbedderError::InvalidWindowIndex(index))?;
        *slot = Some(engine);
        Ok(())
    }

    pub fn engine_at(&self, index: usize) -> Option<&Arc<Engine>> {
        self.engines.get(index).and_then(|e| e.as_ref())
    }

    pub fn engines(&self) -> impl Iterator<Item = &Arc<Engine>> {
        self.engines.iter().flatten()
    }

    /// Tears down the window at `index`: engine first, then protocol
    /// objects, child surface before base.
    pub fn destroy_window(&mut self, index: usize) -> Result<()> {
        let window =
            self.windows.get_mut(index).ok_or(EmbedderError::InvalidWindowIndex(index))?;
        if let Some(engine) = self.engines.get_mut(index).and_then(Option::take) {
            engine.shutdown()?;
        }
        self.surface_to_window.remove(&window.base_surface.id());
        self.surface_to_window.remove(&window.runtime_surface.id());
        window.destroy();
        info!("window {index} destroyed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Configure pipeline
    // ------------------------------------------------------------------

    /// First ack flips the window into `Configured`; the owner blocked on
    /// this transition may now create the drawable.
    pub(crate) fn on_surface_configured(&mut self, index: usize) {
        let Some(window) = self.windows.get_mut(index) else { return };
        if window.phase == WindowPhase::WaitingConfigure {
            window.phase = WindowPhase::Configured;
            debug!("window {index} configured");
            self.notify_shell_ready();
        }
    }

    pub(crate) fn on_toplevel_configure(
        &mut self,
        index: usize,
        mut width: i32,
        mut height: i32,
        states: &[u8],
    ) {
        let flags = decode_states(states);
        // Fullscreen with no size supplied: take the output's native mode.
        if flags.fullscreen && (width <= 0 || height <= 0) {
            if let Some(output) = self.outputs.iter().find(|o| o.is_ready()) {
                width = output.description().width;
                height = output.description().height;
            }
        }

        let Some(window) = self.windows.get_mut(index) else { return };
        let was_configured = window.is_configured();
        let outcome = window.apply_configure(width, height, states);

        if outcome.size_changed && was_configured {
            if let Err(e) = self.backend.resize(index, outcome.width, outcome.height) {
                warn!("window {index} resize failed: {e}");
                return;
            }
            if let Some(engine) = self.engine_at(index) {
                let scale = self.windows[index].buffer_scale.max(1) as usize;
                if let Err(e) = engine.send_window_metrics(
                    outcome.width as usize * scale,
                    outcome.height as usize * scale,
                    f64::from(self.windows[index].buffer_scale.max(1)),
                ) {
                    warn!("window {index} metrics update failed: {e}");
                }
            }
        }
    }

    pub(crate) fn on_window_close(&mut self, index: usize) {
        if let Some(window) = self.windows.get_mut(index) {
            window.phase = WindowPhase::Closing;
        }
    }

    /// Whether any window is still alive.
    pub fn has_open_windows(&self) -> bool {
        self.windows.iter().any(|w| !w.is_closing())
    }

    // ------------------------------------------------------------------
    // Input routing
    // ------------------------------------------------------------------

    pub(crate) fn queue_pointer_event(&self, event: PointerEvent) {
        match self.input.pointer_focus.and_then(|i| self.engine_at(i)) {
            Some(engine) => engine.queue_pointer_event(event),
            None => debug!("pointer event without engine focus, dropped"),
        }
    }

    pub(crate) fn queue_touch_event(&self, event: PointerEvent) {
        match self.input.touch_focus.and_then(|i| self.engine_at(i)) {
            Some(engine) => engine.queue_pointer_event(event),
            None => debug!("touch event without engine focus, dropped"),
        }
    }

    pub(crate) fn send_key_event(&self, payload: Vec<u8>) {
        let Some(engine) = self.input.keyboard_focus.and_then(|i| self.engine_at(i)) else {
            return;
        };
        if let Err(e) = engine.send_platform_message(KEY_EVENT_CHANNEL, &payload) {
            warn!("key event delivery failed: {e}");
        }
    }
}

// A surface entering an output with a different scale re-scales the
// window's buffers and pushes fresh metrics to its engine.
impl Dispatch<WlSurface, ()> for EmbedderState {
    fn event(
        state: &mut Self,
        surface: &WlSurface,
        event: wl_surface::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_surface::Event::Enter { output } = event {
            let scale = state
                .outputs
                .iter()
                .position(|o| o.output.id() == output.id())
                .map_or(1, |i| state.buffer_scale(i));
            let Some(index) = state.window_index_for_surface(surface) else { return };
            let Some(window) = state.windows.get_mut(index) else { return };
            if scale == window.buffer_scale {
                return;
            }
            window.buffer_scale = scale;
            window.base_surface.set_buffer_scale(scale);
            window.runtime_surface.set_buffer_scale(scale);
            let (width, height) = window.window_size;
            debug!("window {index} entered output at scale {scale}");
            if let Some(engine) = state.engine_at(index) {
                if let Err(e) = engine.send_window_metrics(
                    width as usize * scale as usize,
                    height as usize * scale as usize,
                    f64::from(scale),
                ) {
                    warn!("window {index} metrics update failed: {e}");
                }
            }
        }
    }
}

// Eventless (or ignorable) globals.
delegate_noop!(EmbedderState: ignore WlCompositor);
delegate_noop!(EmbedderState: ignore WlSubcompositor);
delegate_noop!(EmbedderState: ignore WlShm);
delegate_noop!(EmbedderState: ignore WlSubsurface);
delegate_noop!(EmbedderState: ignore wayland_client::protocol::wl_buffer::WlBuffer);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::HeadlessBackend;

    #[test]
    fn missing_globals_are_protocol_fatal() {
        let state = EmbedderState::new(Arc::new(HeadlessBackend::new()), None);
        // Nothing bound yet: the check must fail, and the failure must
        // be fatal rather than retried.
        let err = state.check_mandatory_globals().unwrap_err();
        assert!(matches!(err, EmbedderError::MissingGlobal(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn shm_belongs_to_the_mandatory_global_set() {
        assert!(MANDATORY_GLOBALS.contains(&"wl_shm"));
    }
}
