//! Output tracking.
//!
//! Per-output state arrives as a burst of events terminated by `done`.
//! Pending values accumulate and only become visible to the rest of the
//! crate on `done`, so a half-updated output is never observed.

use wayland_client::protocol::wl_output::{self, WlOutput};
use wayland_client::{Connection, Dispatch, QueueHandle, WEnum};

use tracing::debug;

use crate::core::state::EmbedderState;

/// Committed state of one output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputDescription {
    pub x: i32,
    pub y: i32,
    pub physical_width: i32,
    pub physical_height: i32,
    pub make: String,
    pub model: String,
    /// Native mode in pixels.
    pub width: i32,
    pub height: i32,
    pub refresh_mhz: i32,
    pub scale: i32,
}

pub struct OutputInfo {
    pub output: WlOutput,
    pending: OutputDescription,
    committed: OutputDescription,
    ever_committed: bool,
}

impl OutputInfo {
    pub fn new(output: WlOutput) -> Self {
        let mut pending = OutputDescription::default();
        pending.scale = 1;
        Self { output, pending: pending.clone(), committed: pending, ever_committed: false }
    }

    /// Last committed description. Meaningful once `is_ready`.
    pub fn description(&self) -> &OutputDescription {
        &self.committed
    }

    pub fn is_ready(&self) -> bool {
        self.ever_committed
    }

    fn commit(&mut self) {
        self.committed = self.pending.clone();
        self.ever_committed = true;
    }
}

impl Dispatch<WlOutput, usize> for EmbedderState {
    fn event(
        state: &mut Self,
        _output: &WlOutput,
        event: wl_output::Event,
        data: &usize,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let Some(info) = state.outputs.get_mut(*data) else { return };
        match event {
            wl_output::Event::Geometry {
                x, y, physical_width, physical_height, make, model, ..
            } => {
                info.pending.x = x;
                info.pending.y = y;
                info.pending.physical_width = physical_width;
                info.pending.physical_height = physical_height;
                info.pending.make = make;
                info.pending.model = model;
            }
            wl_output::Event::Mode { flags, width, height, refresh } => {
                // Only the current mode matters for fullscreen geometry.
                if let WEnum::Value(flags) = flags {
                    if flags.contains(wl_output::Mode::Current) {
                        info.pending.width = width;
                        info.pending.height = height;
                        info.pending.refresh_mhz = refresh;
                    }
                }
            }
            wl_output::Event::Scale { factor } => {
                info.pending.scale = factor;
            }
            wl_output::Event::Done => {
                info.commit();
                let d = info.description();
                debug!(
                    "output {} committed: {}x{}@{}mHz scale {} ({} {})",
                    data, d.width, d.height, d.refresh_mhz, d.scale, d.make, d.model
                );
            }
            _ => {}
        }
    }
}
