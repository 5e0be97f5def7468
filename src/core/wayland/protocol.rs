//! embed-shell vendor protocol
//!
//! Compositor extension for assigning background and panel roles to
//! surfaces. Generated from `protocols/embed-shell.xml`.

#![allow(missing_docs, clippy::all)]

pub mod embed_shell {
    use wayland_client;
    use wayland_client::protocol::*;

    pub mod __interfaces {
        use wayland_client::protocol::__interfaces::*;
        wayland_scanner::generate_interfaces!("protocols/embed-shell.xml");
    }
    use self::__interfaces::*;

    wayland_scanner::generate_client_code!("protocols/embed-shell.xml");
}
