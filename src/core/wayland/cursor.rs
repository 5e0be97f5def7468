//! Pointer cursor handling.
//!
//! The theme is loaded from the configured name (or the XCURSOR
//! environment) on first use. Cursor kinds follow the names the runtime
//! sends over the mouse-cursor channel; unknown kinds fall back to the
//! default arrow.

use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::{Connection, QueueHandle};
use wayland_cursor::CursorTheme;

use tracing::{debug, warn};

use crate::core::state::EmbedderState;

const CURSOR_SIZE: u32 = 24;

/// Maps a runtime cursor kind to an XCursor name.
pub fn cursor_name_for_kind(kind: &str) -> Option<&'static str> {
    match kind {
        "none" => None,
        "click" => Some("hand1"),
        "text" => Some("xterm"),
        "forbidden" => Some("crossed_circle"),
        _ => Some("left_ptr"),
    }
}

#[derive(Default)]
pub struct CursorState {
    pub theme_name: Option<String>,
    theme: Option<CursorTheme>,
    surface: Option<WlSurface>,
}

impl CursorState {
    pub fn with_theme_name(theme_name: Option<String>) -> Self {
        Self { theme_name, theme: None, surface: None }
    }
}

impl EmbedderState {
    fn ensure_cursor_theme(&mut self, conn: &Connection, qh: &QueueHandle<Self>) -> bool {
        if self.cursor.theme.is_some() {
            return true;
        }
        let Some(shm) = self.shm.clone() else { return false };
        let Some(compositor) = self.compositor.clone() else { return false };

        let theme = match &self.cursor.theme_name {
            Some(name) => CursorTheme::load_from_name(conn, shm, name, CURSOR_SIZE),
            None => CursorTheme::load(conn, shm, CURSOR_SIZE),
        };
        match theme {
            Ok(theme) => {
                self.cursor.theme = Some(theme);
                self.cursor.surface = Some(compositor.create_surface(qh, ()));
                true
            }
            Err(e) => {
                warn!("cursor theme unavailable: {e}");
                false
            }
        }
    }

    /// Shows the named system cursor. `kind == "none"` hides it.
    pub fn activate_system_cursor(
        &mut self,
        conn: &Connection,
        qh: &QueueHandle<Self>,
        kind: &str,
    ) -> bool {
        let serial = self.input.pointer_serial;
        let Some(pointer) = self.pointer.clone() else { return false };

        let Some(name) = cursor_name_for_kind(kind) else {
            pointer.set_cursor(serial, None, 0, 0);
            return true;
        };

        if !self.ensure_cursor_theme(conn, qh) {
            return false;
        }
        let Some(surface) = self.cursor.surface.clone() else { return false };
        let Some(theme) = self.cursor.theme.as_mut() else { return false };
        let Some(cursor) = theme.get_cursor(name) else {
            debug!("cursor \"{name}\" not in theme");
            return false;
        };
        let buffer: &wayland_client::protocol::wl_buffer::WlBuffer = &cursor[0];
        let (hotspot_x, hotspot_y) = cursor[0].hotspot();
        surface.attach(Some(buffer), 0, 0);
        surface.commit();
        pointer.set_cursor(serial, Some(&surface), hotspot_x as i32, hotspot_y as i32);
        true
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_kinds_resolve_to_theme_names() {
        assert_eq!(cursor_name_for_kind("basic"), Some("left_ptr"));
        assert_eq!(cursor_name_for_kind("click"), Some("hand1"));
        assert_eq!(cursor_name_for_kind("text"), Some("xterm"));
        assert_eq!(cursor_name_for_kind("forbidden"), Some("crossed_circle"));
    }

    #[test]
    fn hidden_cursor_has_no_name() {
        assert_eq!(cursor_name_for_kind("none"), None);
    }

    #[test]
    fn unknown_kind_falls_back_to_arrow() {
        assert_eq!(cursor_name_for_kind("weird"), Some("left_ptr"));
    }
}
