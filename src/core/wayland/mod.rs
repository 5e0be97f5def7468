//! Wayland protocol client.
//!
//! One file per protocol concern, all dispatching on
//! [`EmbedderState`](crate::core::state::EmbedderState). Raw events are
//! translated here into window state transitions and coalesced runtime
//! pointer events; nothing below this module sees a protocol type.

pub mod cursor;
pub mod keyboard;
pub mod output;
pub mod pointer;
pub mod protocol;
pub mod registry;
pub mod seat;
pub mod shell_ext;
pub mod touch;
