//! Pointer input translation.
//!
//! Protocol pointer events become runtime pointer events and are queued
//! on the focused window's engine; the engine flushes the batch once per
//! loop turn. Button state is tracked here so motion can distinguish
//! hover from drag.

use wayland_client::protocol::wl_pointer::{self, WlPointer};
use wayland_client::{Connection, Dispatch, QueueHandle, WEnum};

use tracing::trace;

use crate::core::engine::api::{DeviceKind, PointerEvent, PointerPhase, SignalKind};
use crate::core::state::EmbedderState;

// Linux input event codes.
const BTN_LEFT: u32 = 0x110;
const BTN_RIGHT: u32 = 0x111;
const BTN_MIDDLE: u32 = 0x112;

pub const POINTER_BUTTON_PRIMARY: i64 = 1 << 0;
pub const POINTER_BUTTON_SECONDARY: i64 = 1 << 1;
pub const POINTER_BUTTON_MIDDLE: i64 = 1 << 2;

/// Maps a kernel button code to the runtime's button bitmask.
pub fn button_bit(code: u32) -> i64 {
    match code {
        BTN_LEFT => POINTER_BUTTON_PRIMARY,
        BTN_RIGHT => POINTER_BUTTON_SECONDARY,
        BTN_MIDDLE => POINTER_BUTTON_MIDDLE,
        _ => 0,
    }
}

impl EmbedderState {
    fn mouse_event(&self, phase: PointerPhase, time_ms: u32) -> PointerEvent {
        PointerEvent {
            phase,
            timestamp: u64::from(time_ms) * 1000,
            x: self.input.pointer_position.0,
            y: self.input.pointer_position.1,
            device: 0,
            signal_kind: SignalKind::None,
            scroll_delta_x: 0.0,
            scroll_delta_y: 0.0,
            device_kind: DeviceKind::Mouse,
            buttons: self.input.buttons,
        }
    }

    fn motion_phase(&self) -> PointerPhase {
        if self.input.buttons != 0 {
            PointerPhase::Move
        } else {
            PointerPhase::Hover
        }
    }
}

impl Dispatch<WlPointer, ()> for EmbedderState {
    fn event(
        state: &mut Self,
        _pointer: &WlPointer,
        event: wl_pointer::Event,
        _data: &(),
        conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_pointer::Event::Enter { serial, surface, surface_x, surface_y } => {
                state.input.pointer_serial = serial;
                state.input.pointer_position = (surface_x, surface_y);
                state.input.pointer_focus = state.window_index_for_surface(&surface);
                state.activate_system_cursor(conn, qh, "basic");
                let event = state.mouse_event(PointerPhase::Add, 0);
                state.queue_pointer_event(event);
            }
            wl_pointer::Event::Leave { serial, .. } => {
                state.input.pointer_serial = serial;
                let event = state.mouse_event(PointerPhase::Remove, 0);
                state.queue_pointer_event(event);
                state.input.pointer_focus = None;
            }
            wl_pointer::Event::Motion { time, surface_x, surface_y } => {
                state.input.pointer_position = (surface_x, surface_y);
                let event = state.mouse_event(state.motion_phase(), time);
                state.queue_pointer_event(event);
            }
            wl_pointer::Event::Button { serial, time, button, state: button_state } => {
                state.input.pointer_serial = serial;
                let bit = button_bit(button);
                if bit == 0 {
                    trace!("unmapped button code {button:#x}");
                    return;
                }
                let previous = state.input.buttons;
                let phase = match button_state {
                    WEnum::Value(wl_pointer::ButtonState::Pressed) => {
                        state.input.buttons |= bit;
                        if previous == 0 {
                            PointerPhase::Down
                        } else {
                            PointerPhase::Move
                        }
                    }
                    WEnum::Value(wl_pointer::ButtonState::Released) => {
                        state.input.buttons &= !bit;
                        if state.input.buttons == 0 {
                            PointerPhase::Up
                        } else {
                            PointerPhase::Move
                        }
                    }
                    _ => return,
                };
                let event = state.mouse_event(phase, time);
                state.queue_pointer_event(event);
            }
            wl_pointer::Event::Axis { time, axis, value } => {
                let mut event = state.mouse_event(state.motion_phase(), time);
                event.signal_kind = SignalKind::Scroll;
                match axis {
                    WEnum::Value(wl_pointer::Axis::VerticalScroll) => {
                        event.scroll_delta_y = value;
                    }
                    WEnum::Value(wl_pointer::Axis::HorizontalScroll) => {
                        event.scroll_delta_x = value;
                    }
                    _ => return,
                }
                state.queue_pointer_event(event);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_button_codes_map_to_runtime_bits() {
        assert_eq!(button_bit(BTN_LEFT), POINTER_BUTTON_PRIMARY);
        assert_eq!(button_bit(BTN_RIGHT), POINTER_BUTTON_SECONDARY);
        assert_eq!(button_bit(BTN_MIDDLE), POINTER_BUTTON_MIDDLE);
    }

    #[test]
    fn unknown_button_codes_map_to_nothing() {
        assert_eq!(button_bit(0x116), 0);
    }
}
