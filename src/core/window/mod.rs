//! Toplevel window lifecycle.
//!
//! Each window is a base `wl_surface` with an `xdg_toplevel` role plus a
//! child surface the runtime renders into, mounted as a subsurface. The
//! window walks `Unconfigured → WaitingConfigure → Configured → Closing`;
//! no drawable exists and no metrics are sent until the first configure
//! has been acknowledged. The xdg shell dispatch impls live here; they
//! delegate geometry decisions to `EmbedderState`.

use wayland_client::protocol::{wl_callback, wl_subsurface::WlSubsurface, wl_surface::WlSurface};
use wayland_client::{Connection, Dispatch, QueueHandle};
use wayland_protocols::xdg::shell::client::{xdg_surface, xdg_toplevel, xdg_wm_base};

use tracing::{debug, info, warn};

use crate::core::state::EmbedderState;

// ============================================================================
// Window role
// ============================================================================

/// Shell role a window is created with. Panels and backgrounds go through
/// the vendor shell extension when the compositor offers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    Normal,
    Background,
    PanelTop,
    PanelBottom,
    PanelLeft,
    PanelRight,
}

impl WindowType {
    /// Parses the configuration value. Unknown values fall back to a
    /// normal toplevel.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "NORMAL" => Self::Normal,
            "BG" => Self::Background,
            "PANEL_TOP" => Self::PanelTop,
            "PANEL_BOTTOM" => Self::PanelBottom,
            "PANEL_LEFT" => Self::PanelLeft,
            "PANEL_RIGHT" => Self::PanelRight,
            other => {
                warn!("unknown window type \"{other}\", using NORMAL");
                Self::Normal
            }
        }
    }

    pub fn is_panel(&self) -> bool {
        matches!(self, Self::PanelTop | Self::PanelBottom | Self::PanelLeft | Self::PanelRight)
    }
}

/// Lifecycle phase. Strictly forward; `Closing` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    Unconfigured,
    WaitingConfigure,
    Configured,
    Closing,
}

/// Flags carried by a toplevel configure state array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateFlags {
    pub fullscreen: bool,
    pub maximized: bool,
    pub resizing: bool,
    pub activated: bool,
}

/// Decodes the packed u32 state array. Unknown entries are skipped.
pub fn decode_states(states: &[u8]) -> StateFlags {
    let mut flags = StateFlags::default();
    for raw in states.chunks_exact(4) {
        let value = u32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]);
        match xdg_toplevel::State::try_from(value) {
            Ok(xdg_toplevel::State::Fullscreen) => flags.fullscreen = true,
            Ok(xdg_toplevel::State::Maximized) => flags.maximized = true,
            Ok(xdg_toplevel::State::Resizing) => flags.resizing = true,
            Ok(xdg_toplevel::State::Activated) => flags.activated = true,
            _ => {}
        }
    }
    flags
}

/// Outcome of decoding one toplevel configure.
#[derive(Debug, Clone, Copy)]
pub struct ConfigureOutcome {
    pub size_changed: bool,
    pub width: u32,
    pub height: u32,
}

pub struct Window {
    pub index: usize,
    pub window_type: WindowType,
    pub app_id: String,

    pub base_surface: WlSurface,
    pub runtime_surface: WlSurface,
    pub subsurface: WlSubsurface,
    pub xdg_surface: xdg_surface::XdgSurface,
    pub toplevel: xdg_toplevel::XdgToplevel,

    pub phase: WindowPhase,
    pub fullscreen: bool,
    pub maximized: bool,
    pub resizing: bool,
    pub activated: bool,

    /// Committed geometry in surface coordinates.
    pub window_size: (u32, u32),
    /// Last floating geometry, restored when leaving fullscreen/maximized.
    pub floating_size: (u32, u32),
    pub buffer_scale: i32,

    frame_pending: bool,
    fps_counter: u32,
}

impl Window {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: usize,
        window_type: WindowType,
        app_id: String,
        width: u32,
        height: u32,
        base_surface: WlSurface,
        runtime_surface: WlSurface,
        subsurface: WlSubsurface,
        xdg_surface: xdg_surface::XdgSurface,
        toplevel: xdg_toplevel::XdgToplevel,
    ) -> Self {
        Self {
            index,
            window_type,
            app_id,
            base_surface,
            runtime_surface,
            subsurface,
            xdg_surface,
            toplevel,
            phase: WindowPhase::Unconfigured,
            fullscreen: false,
            maximized: false,
            resizing: false,
            activated: false,
            window_size: (width, height),
            floating_size: (width, height),
            buffer_scale: 1,
            frame_pending: false,
            fps_counter: 0,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.phase == WindowPhase::Configured
    }

    pub fn is_closing(&self) -> bool {
        self.phase == WindowPhase::Closing
    }

    /// Decodes a toplevel configure: state flags, then geometry. A zero
    /// dimension keeps the previous committed size. The floating size is
    /// only tracked while neither fullscreen nor maximized.
    pub fn apply_configure(&mut self, width: i32, height: i32, states: &[u8]) -> ConfigureOutcome {
        let previous = self.window_size;

        let flags = decode_states(states);
        self.fullscreen = flags.fullscreen;
        self.maximized = flags.maximized;
        self.resizing = flags.resizing;
        self.activated = flags.activated;

        if width > 0 && height > 0 {
            self.window_size = (width as u32, height as u32);
        } else {
            // Compositor left the size to us.
            self.window_size = previous;
        }
        if !self.fullscreen && !self.maximized {
            self.floating_size = self.window_size;
        }

        ConfigureOutcome {
            size_changed: self.window_size != previous,
            width: self.window_size.0,
            height: self.window_size.1,
        }
    }

    /// Registers the next frame callback. At most one is outstanding per
    /// surface; a second request while one is pending is a no-op.
    pub fn request_frame(&mut self, qh: &QueueHandle<EmbedderState>) {
        if self.frame_pending {
            return;
        }
        self.base_surface.frame(qh, self.index);
        self.frame_pending = true;
        self.base_surface.commit();
    }

    /// One frame callback fired: count it, commit, re-register.
    pub fn on_frame(&mut self, qh: &QueueHandle<EmbedderState>) {
        self.frame_pending = false;
        self.fps_counter += 1;
        if self.phase == WindowPhase::Closing {
            return;
        }
        self.base_surface.frame(qh, self.index);
        self.frame_pending = true;
        self.base_surface.commit();
    }

    /// Drains the frame counter for FPS reporting.
    pub fn take_fps_counter(&mut self) -> u32 {
        std::mem::take(&mut self.fps_counter)
    }

    /// Releases protocol objects, child surface first.
    pub fn destroy(&mut self) {
        self.phase = WindowPhase::Closing;
        self.subsurface.destroy();
        self.runtime_surface.destroy();
        self.toplevel.destroy();
        self.xdg_surface.destroy();
        self.base_surface.destroy();
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("index", &self.index)
            .field("type", &self.window_type)
            .field("phase", &self.phase)
            .field("size", &self.window_size)
            .finish()
    }
}

// ============================================================================
// xdg shell dispatch
// ============================================================================

impl Dispatch<xdg_wm_base::XdgWmBase, ()> for EmbedderState {
    fn event(
        _state: &mut Self,
        wm_base: &xdg_wm_base::XdgWmBase,
        event: xdg_wm_base::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            wm_base.pong(serial);
        }
    }
}

impl Dispatch<xdg_surface::XdgSurface, usize> for EmbedderState {
    fn event(
        state: &mut Self,
        xdg_surface: &xdg_surface::XdgSurface,
        event: xdg_surface::Event,
        data: &usize,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let xdg_surface::Event::Configure { serial } = event {
            xdg_surface.ack_configure(serial);
            state.on_surface_configured(*data);
        }
    }
}

impl Dispatch<xdg_toplevel::XdgToplevel, usize> for EmbedderState {
    fn event(
        state: &mut Self,
        _toplevel: &xdg_toplevel::XdgToplevel,
        event: xdg_toplevel::Event,
        data: &usize,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure { width, height, states } => {
                state.on_toplevel_configure(*data, width, height, &states);
            }
            xdg_toplevel::Event::Close => {
                info!("window {} close requested", data);
                state.on_window_close(*data);
            }
            _ => {}
        }
    }
}

impl Dispatch<wl_callback::WlCallback, usize> for EmbedderState {
    fn event(
        state: &mut Self,
        _callback: &wl_callback::WlCallback,
        event: wl_callback::Event,
        data: &usize,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let wl_callback::Event::Done { .. } = event {
            if let Some(window) = state.windows.get_mut(*data) {
                window.on_frame(qh);
            } else {
                debug!("frame callback for vanished window {data}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_type_parses_known_roles() {
        assert_eq!(WindowType::parse("NORMAL"), WindowType::Normal);
        assert_eq!(WindowType::parse("bg"), WindowType::Background);
        assert_eq!(WindowType::parse("PANEL_TOP"), WindowType::PanelTop);
        assert_eq!(WindowType::parse("panel_left"), WindowType::PanelLeft);
    }

    #[test]
    fn unknown_window_type_falls_back_to_normal() {
        assert_eq!(WindowType::parse("SIDEBAR"), WindowType::Normal);
    }

    #[test]
    fn panel_roles_report_as_panels() {
        assert!(WindowType::PanelBottom.is_panel());
        assert!(!WindowType::Normal.is_panel());
        assert!(!WindowType::Background.is_panel());
    }

    fn pack(states: &[xdg_toplevel::State]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for state in states {
            bytes.extend_from_slice(&(*state as u32).to_ne_bytes());
        }
        bytes
    }

    #[test]
    fn state_array_decodes_all_tracked_flags() {
        let bytes = pack(&[xdg_toplevel::State::Fullscreen, xdg_toplevel::State::Activated]);
        let flags = decode_states(&bytes);
        assert!(flags.fullscreen);
        assert!(flags.activated);
        assert!(!flags.maximized);
        assert!(!flags.resizing);
    }

    #[test]
    fn empty_state_array_clears_all_flags() {
        assert_eq!(decode_states(&[]), StateFlags::default());
    }

    #[test]
    fn unknown_state_values_are_skipped() {
        let mut bytes = pack(&[xdg_toplevel::State::Maximized]);
        bytes.extend_from_slice(&0xdead_u32.to_ne_bytes());
        let flags = decode_states(&bytes);
        assert!(flags.maximized);
        assert!(!flags.fullscreen);
    }
}
