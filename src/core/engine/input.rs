//! Pointer event coalescing.
//!
//! Wayland delivers pointer and touch events one at a time; the runtime
//! prefers them batched. Events accumulate here as they arrive and the
//! engine flushes the whole batch once per loop turn, arrival order
//! preserved.

use std::sync::Mutex;

use crate::core::engine::api::PointerEvent;

#[derive(Default)]
pub struct PointerBuffer {
    events: Mutex<Vec<PointerEvent>>,
}

impl PointerBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: PointerEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// Takes the whole pending batch, leaving the buffer empty.
    pub fn take_all(&self) -> Vec<PointerEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::api::{DeviceKind, PointerPhase, SignalKind};

    fn event(x: f64, phase: PointerPhase) -> PointerEvent {
        PointerEvent {
            phase,
            timestamp: 0,
            x,
            y: 0.0,
            device: 0,
            signal_kind: SignalKind::None,
            scroll_delta_x: 0.0,
            scroll_delta_y: 0.0,
            device_kind: DeviceKind::Mouse,
            buttons: 0,
        }
    }

    #[test]
    fn batch_preserves_arrival_order() {
        let buffer = PointerBuffer::new();
        buffer.push(event(1.0, PointerPhase::Down));
        buffer.push(event(2.0, PointerPhase::Move));
        buffer.push(event(3.0, PointerPhase::Up));

        let batch = buffer.take_all();
        let xs: Vec<f64> = batch.iter().map(|e| e.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn take_all_clears_the_buffer() {
        let buffer = PointerBuffer::new();
        buffer.push(event(1.0, PointerPhase::Hover));
        assert_eq!(buffer.take_all().len(), 1);
        assert!(buffer.is_empty());
        assert!(buffer.take_all().is_empty());
    }

    #[test]
    fn events_after_a_flush_start_a_fresh_batch() {
        let buffer = PointerBuffer::new();
        buffer.push(event(1.0, PointerPhase::Down));
        buffer.take_all();
        buffer.push(event(9.0, PointerPhase::Up));

        let batch = buffer.take_all();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].x, 9.0);
    }
}
