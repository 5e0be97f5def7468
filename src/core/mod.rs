pub mod app;
pub mod backend;
pub mod channels;
pub mod display;
pub mod engine;
pub mod errors;
pub mod state;
pub mod texture;
pub mod wayland;
pub mod window;

// Re-export key types
pub use app::App;
pub use backend::RenderBackend;
pub use channels::{BindingRegistry, PlatformMessage, Responder};
pub use engine::Engine;
pub use errors::EmbedderError;
pub use state::EmbedderState;
