// tanoak
//
// Wayland embedder shell for an externally-hosted UI runtime.
// All embedder logic lives in core/: the display-protocol client, the
// per-window surface state machine and the runtime-hosting engine.
// Feature plugins attach from the outside through the channel registry
// and the texture bridge.

pub mod config;
pub mod core;
pub mod prelude;
pub mod util;

pub use crate::core::app::App;
pub use crate::core::errors::EmbedderError;

#[cfg(test)]
mod tests;
