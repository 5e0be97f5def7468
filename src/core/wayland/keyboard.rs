//! Keyboard input translation.
//!
//! The compositor ships its keymap as an fd; xkbcommon compiles it and
//! resolves keycodes to keysyms and text. Key events are forwarded to
//! the focused window's engine as JSON platform messages on the
//! `runtime/keyevent` channel.

use std::fs::File;
use std::io::Read;

use wayland_client::protocol::wl_keyboard::{self, KeymapFormat, WlKeyboard};
use wayland_client::{Connection, Dispatch, QueueHandle, WEnum};
use xkbcommon::xkb;

use serde_json::json;
use tracing::{debug, warn};

use crate::core::state::EmbedderState;

pub const KEY_EVENT_CHANNEL: &str = "runtime/keyevent";

/// Offset between evdev keycodes and xkb keycodes.
const EVDEV_OFFSET: u32 = 8;

pub struct KeyboardState {
    context: xkb::Context,
    state: Option<xkb::State>,
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self { context: xkb::Context::new(xkb::CONTEXT_NO_FLAGS), state: None }
    }
}

impl KeyboardState {
    fn load_keymap(&mut self, fd: std::os::fd::OwnedFd, size: u32) {
        let mut raw = String::with_capacity(size as usize);
        let mut file = File::from(fd);
        if let Err(e) = file.read_to_string(&mut raw) {
            warn!("cannot read keymap fd: {e}");
            return;
        }
        let raw = raw.trim_end_matches('\0').to_string();
        match xkb::Keymap::new_from_string(
            &self.context,
            raw,
            xkb::KEYMAP_FORMAT_TEXT_V1,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        ) {
            Some(keymap) => {
                self.state = Some(xkb::State::new(&keymap));
                debug!("keymap compiled");
            }
            None => warn!("keymap failed to compile"),
        }
    }

    fn update_modifiers(&mut self, depressed: u32, latched: u32, locked: u32, group: u32) {
        if let Some(state) = &mut self.state {
            state.update_mask(depressed, latched, locked, 0, 0, group);
        }
    }

    /// Resolves one evdev keycode: (keysym, utf8, modifier mask).
    fn resolve(&self, key: u32) -> Option<(xkb::Keysym, String, u32)> {
        let state = self.state.as_ref()?;
        let keycode: xkb::Keycode = (key + EVDEV_OFFSET).into();
        let keysym = state.key_get_one_sym(keycode);
        let utf8 = state.key_get_utf8(keycode);
        let modifiers = state.serialize_mods(xkb::STATE_MODS_EFFECTIVE);
        Some((keysym, utf8, modifiers))
    }
}

impl Dispatch<WlKeyboard, ()> for EmbedderState {
    fn event(
        state: &mut Self,
        _keyboard: &WlKeyboard,
        event: wl_keyboard::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_keyboard::Event::Keymap { format, fd, size } => {
                if format == WEnum::Value(KeymapFormat::XkbV1) {
                    state.keyboard_state.load_keymap(fd, size);
                } else {
                    warn!("unsupported keymap format {format:?}");
                }
            }
            wl_keyboard::Event::Enter { surface, .. } => {
                state.input.keyboard_focus = state.window_index_for_surface(&surface);
            }
            wl_keyboard::Event::Leave { .. } => {
                state.input.keyboard_focus = None;
            }
            wl_keyboard::Event::Modifiers {
                mods_depressed, mods_latched, mods_locked, group, ..
            } => {
                state.keyboard_state.update_modifiers(
                    mods_depressed,
                    mods_latched,
                    mods_locked,
                    group,
                );
            }
            wl_keyboard::Event::Key { key, state: key_state, .. } => {
                let Some((keysym, utf8, modifiers)) = state.keyboard_state.resolve(key) else {
                    return;
                };
                let kind = match key_state {
                    WEnum::Value(wl_keyboard::KeyState::Pressed) => "keydown",
                    WEnum::Value(wl_keyboard::KeyState::Released) => "keyup",
                    _ => return,
                };
                let mut payload = json!({
                    "type": kind,
                    "keymap": "linux",
                    "toolkit": "xkb",
                    "keyCode": u32::from(keysym),
                    "scanCode": key + EVDEV_OFFSET,
                    "modifiers": modifiers,
                });
                if let Some(scalar) = utf8.chars().next() {
                    payload["unicodeScalarValues"] = json!(u32::from(scalar));
                }
                state.send_key_event(payload.to_string().into_bytes());
            }
            _ => {}
        }
    }
}
