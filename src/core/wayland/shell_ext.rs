//! embed-shell role assignment.
//!
//! When the compositor exposes the vendor shell, background and panel
//! windows get their role assigned through it instead of staying plain
//! toplevels. On protocol v2 the bind is a handshake: requests wait for
//! `bound_ok`, and `bound_fail` permanently disables the extension.

use wayland_client::{Connection, Dispatch, QueueHandle};

use tracing::{info, warn};

use crate::core::state::EmbedderState;
use crate::core::wayland::protocol::embed_shell::embed_shell::{self, EmbedShell};
use crate::core::window::WindowType;

impl Dispatch<EmbedShell, ()> for EmbedderState {
    fn event(
        state: &mut Self,
        _shell: &EmbedShell,
        event: embed_shell::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            embed_shell::Event::BoundOk => {
                info!("embed_shell bind confirmed");
                state.embed_shell_bound = true;
                // Roles requested before the handshake resolved.
                state.apply_pending_shell_roles();
            }
            embed_shell::Event::BoundFail => {
                warn!("embed_shell bind rejected, panel/background roles unavailable");
                state.embed_shell_bound = false;
                state.embed_shell = None;
            }
        }
    }
}

impl EmbedderState {
    /// Assigns the embed-shell role for `index`, or queues it while the
    /// bind handshake is still in flight. Normal toplevels skip this.
    pub fn apply_shell_role(&mut self, index: usize) {
        let Some(window) = self.windows.get(index) else { return };
        if window.window_type == WindowType::Normal {
            return;
        }
        if self.embed_shell.is_none() {
            warn!(
                "window {index} wants {:?} but compositor lacks embed_shell",
                window.window_type
            );
            return;
        }
        if !self.embed_shell_bound {
            self.pending_shell_roles.push(index);
            return;
        }
        self.apply_shell_role_now(index);
    }

    pub(crate) fn apply_pending_shell_roles(&mut self) {
        let pending = std::mem::take(&mut self.pending_shell_roles);
        for index in pending {
            self.apply_shell_role_now(index);
        }
    }

    fn apply_shell_role_now(&mut self, index: usize) {
        let Some(shell) = &self.embed_shell else { return };
        let Some(window) = self.windows.get(index) else { return };
        let Some(output) = self.outputs.first() else {
            warn!("no output to anchor window {index} to");
            return;
        };

        let edge = match window.window_type {
            WindowType::Normal => return,
            WindowType::Background => {
                shell.set_background(&window.base_surface, &output.output);
                info!("window {index} assigned background role");
                return;
            }
            WindowType::PanelTop => embed_shell::Edge::Top,
            WindowType::PanelBottom => embed_shell::Edge::Bottom,
            WindowType::PanelLeft => embed_shell::Edge::Left,
            WindowType::PanelRight => embed_shell::Edge::Right,
        };
        shell.set_panel(&window.base_surface, &output.output, edge);
        info!("window {index} assigned panel role ({:?})", window.window_type);
    }

    /// Announces that every role surface is mapped. Sent once, after the
    /// first window reaches its configured state.
    pub fn notify_shell_ready(&mut self) {
        if self.shell_ready_sent {
            return;
        }
        if let Some(shell) = &self.embed_shell {
            if self.embed_shell_bound {
                shell.ready();
                self.shell_ready_sent = true;
                info!("embed_shell ready sent");
            }
        }
    }
}
