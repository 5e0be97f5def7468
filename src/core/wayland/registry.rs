//! Global discovery.
//!
//! Known globals are bound as they are announced; unknown ones are
//! ignored. Whether the mandatory set actually arrived is checked once
//! after the initial roundtrip, not here.

use wayland_client::protocol::wl_compositor::WlCompositor;
use wayland_client::protocol::wl_output::WlOutput;
use wayland_client::protocol::wl_registry::{self, WlRegistry};
use wayland_client::protocol::wl_seat::WlSeat;
use wayland_client::protocol::wl_shm::WlShm;
use wayland_client::protocol::wl_subcompositor::WlSubcompositor;
use wayland_client::{Connection, Dispatch, QueueHandle};
use wayland_protocols::xdg::shell::client::xdg_wm_base::XdgWmBase;

use tracing::{debug, info};

use crate::core::state::EmbedderState;
use crate::core::wayland::output::OutputInfo;
use crate::core::wayland::protocol::embed_shell::embed_shell::EmbedShell;

impl Dispatch<WlRegistry, ()> for EmbedderState {
    fn event(
        state: &mut Self,
        registry: &WlRegistry,
        event: wl_registry::Event,
        _data: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global { name, interface, version } => match interface.as_str() {
                "wl_compositor" => {
                    let compositor: WlCompositor =
                        registry.bind(name, version.min(4), qh, ());
                    state.compositor = Some(compositor);
                }
                "wl_subcompositor" => {
                    let subcompositor: WlSubcompositor = registry.bind(name, 1, qh, ());
                    state.subcompositor = Some(subcompositor);
                }
                "wl_shm" => {
                    let shm: WlShm = registry.bind(name, 1, qh, ());
                    state.shm = Some(shm);
                }
                "xdg_wm_base" => {
                    let wm_base: XdgWmBase = registry.bind(name, version.min(3), qh, ());
                    state.wm_base = Some(wm_base);
                }
                "wl_seat" => {
                    let seat: WlSeat = registry.bind(name, version.min(5), qh, ());
                    state.seat = Some(seat);
                }
                "wl_output" => {
                    let index = state.outputs.len();
                    let output: WlOutput = registry.bind(name, version.min(2), qh, index);
                    state.outputs.push(OutputInfo::new(output));
                    info!("output {index} announced");
                }
                "embed_shell" => {
                    let version = version.min(2);
                    let shell: EmbedShell = registry.bind(name, version, qh, ());
                    // Before the handshake event existed, a successful
                    // bind was the confirmation.
                    state.embed_shell_bound = version < 2;
                    state.embed_shell = Some(shell);
                    info!("embed_shell v{version} bound");
                }
                _ => {
                    debug!("ignoring global {interface} v{version}");
                }
            },
            wl_registry::Event::GlobalRemove { name } => {
                debug!("global {name} removed");
            }
            _ => {}
        }
    }
}
