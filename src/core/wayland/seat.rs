//! Seat capability handling.
//!
//! Input devices are created when the seat announces the capability and
//! released when it withdraws it, so hotplugging a mouse or keyboard
//! mid-session works in both directions.

use wayland_client::protocol::wl_seat::{self, Capability, WlSeat};
use wayland_client::{Connection, Dispatch, QueueHandle, WEnum};

use tracing::{debug, info};

use crate::core::state::EmbedderState;

impl Dispatch<WlSeat, ()> for EmbedderState {
    fn event(
        state: &mut Self,
        seat: &WlSeat,
        event: wl_seat::Event,
        _data: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_seat::Event::Capabilities { capabilities: WEnum::Value(capabilities) } => {
                if capabilities.contains(Capability::Pointer) && state.pointer.is_none() {
                    state.pointer = Some(seat.get_pointer(qh, ()));
                    info!("pointer capability added");
                } else if !capabilities.contains(Capability::Pointer) {
                    if let Some(pointer) = state.pointer.take() {
                        pointer.release();
                        info!("pointer capability removed");
                    }
                }

                if capabilities.contains(Capability::Keyboard) && state.keyboard.is_none() {
                    state.keyboard = Some(seat.get_keyboard(qh, ()));
                    info!("keyboard capability added");
                } else if !capabilities.contains(Capability::Keyboard) {
                    if let Some(keyboard) = state.keyboard.take() {
                        keyboard.release();
                        info!("keyboard capability removed");
                    }
                }

                if capabilities.contains(Capability::Touch) && state.touch.is_none() {
                    state.touch = Some(seat.get_touch(qh, ()));
                    info!("touch capability added");
                } else if !capabilities.contains(Capability::Touch) {
                    if let Some(touch) = state.touch.take() {
                        touch.release();
                        info!("touch capability removed");
                    }
                }
            }
            wl_seat::Event::Name { name } => {
                debug!("seat name: {name}");
            }
            _ => {}
        }
    }
}
