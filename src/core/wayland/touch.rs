//! Touch input translation.
//!
//! Touch points are independent devices to the runtime; each gets its
//! own down/move/up sequence with the protocol touch id as device id.
//! Positions are remembered per point because `up` carries none.

use wayland_client::protocol::wl_touch::{self, WlTouch};
use wayland_client::{Connection, Dispatch, QueueHandle};

use crate::core::engine::api::{DeviceKind, PointerEvent, PointerPhase, SignalKind};
use crate::core::state::EmbedderState;

fn touch_event(phase: PointerPhase, time_ms: u32, id: i32, x: f64, y: f64) -> PointerEvent {
    PointerEvent {
        phase,
        timestamp: u64::from(time_ms) * 1000,
        x,
        y,
        device: id,
        signal_kind: SignalKind::None,
        scroll_delta_x: 0.0,
        scroll_delta_y: 0.0,
        device_kind: DeviceKind::Touch,
        buttons: 0,
    }
}

impl Dispatch<WlTouch, ()> for EmbedderState {
    fn event(
        state: &mut Self,
        _touch: &WlTouch,
        event: wl_touch::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_touch::Event::Down { serial, time, surface, id, x, y } => {
                state.input.pointer_serial = serial;
                if state.input.touch_down_count == 0 {
                    // First contact decides which window receives the
                    // whole gesture.
                    state.input.touch_focus = state.window_index_for_surface(&surface);
                }
                state.input.touch_down_count += 1;
                state.input.touch_points.insert(id, (x, y));
                state.queue_touch_event(touch_event(PointerPhase::Down, time, id, x, y));
            }
            wl_touch::Event::Up { serial, time, id } => {
                state.input.pointer_serial = serial;
                state.input.touch_down_count = state.input.touch_down_count.saturating_sub(1);
                let (x, y) = state.input.touch_points.remove(&id).unwrap_or_default();
                state.queue_touch_event(touch_event(PointerPhase::Up, time, id, x, y));
                if state.input.touch_down_count == 0 {
                    state.input.touch_focus = None;
                }
            }
            wl_touch::Event::Motion { time, id, x, y } => {
                state.input.touch_points.insert(id, (x, y));
                state.queue_touch_event(touch_event(PointerPhase::Move, time, id, x, y));
            }
            wl_touch::Event::Cancel => {
                let points: Vec<(i32, (f64, f64))> =
                    state.input.touch_points.drain().collect();
                for (id, (x, y)) in points {
                    state.queue_touch_event(touch_event(PointerPhase::Cancel, 0, id, x, y));
                }
                state.input.touch_down_count = 0;
                state.input.touch_focus = None;
            }
            _ => {}
        }
    }
}
