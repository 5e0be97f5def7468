//! Display connection and event pump.
//!
//! Connects to the compositor named by the environment, drives global
//! discovery, and provides the non-blocking pump the main loop calls
//! once per turn. A dead socket surfaces as `DisplayLost`, which is
//! fatal.

use wayland_client::backend::WaylandError;
use wayland_client::{Connection, EventQueue};

use tracing::{debug, info};

use crate::core::errors::{EmbedderError, Result};
use crate::core::state::EmbedderState;

pub struct Display {
    pub conn: Connection,
    event_queue: EventQueue<EmbedderState>,
}

impl Display {
    /// Connects and starts global discovery. The caller must run
    /// [`Display::roundtrip`] before relying on any global.
    pub fn connect() -> Result<Self> {
        let conn = Connection::connect_to_env()
            .map_err(|e| EmbedderError::display_connect(e.to_string()))?;
        let event_queue = conn.new_event_queue();
        let display = conn.display();
        display.get_registry(&event_queue.handle(), ());
        info!("connected to Wayland display");
        Ok(Self { conn, event_queue })
    }

    pub fn handle(&self) -> wayland_client::QueueHandle<EmbedderState> {
        self.event_queue.handle()
    }

    /// Blocks until every request so far has been answered.
    pub fn roundtrip(&mut self, state: &mut EmbedderState) -> Result<usize> {
        self.event_queue
            .roundtrip(state)
            .map_err(|e| EmbedderError::display_lost(e.to_string()))
    }

    /// Blocks until at least one event has been dispatched. Used while
    /// waiting out the first configure.
    pub fn blocking_dispatch(&mut self, state: &mut EmbedderState) -> Result<usize> {
        self.event_queue
            .blocking_dispatch(state)
            .map_err(|e| EmbedderError::display_lost(e.to_string()))
    }

    /// One non-blocking pump: flush outgoing requests, read whatever the
    /// socket holds, dispatch it. Returns the number of events handled.
    pub fn pump(&mut self, state: &mut EmbedderState) -> Result<usize> {
        if let Err(e) = self.conn.flush() {
            if !is_would_block(&e) {
                return Err(EmbedderError::display_lost(e.to_string()));
            }
        }

        if let Some(guard) = self.event_queue.prepare_read() {
            match guard.read() {
                Ok(n) => debug!("read {n} events"),
                Err(e) if is_would_block(&e) => {}
                Err(e) => return Err(EmbedderError::display_lost(e.to_string())),
            }
        }

        self.event_queue
            .dispatch_pending(state)
            .map_err(|e| EmbedderError::display_lost(e.to_string()))
    }
}

fn is_would_block(err: &WaylandError) -> bool {
    matches!(err, WaylandError::Io(io) if io.kind() == std::io::ErrorKind::WouldBlock)
}
