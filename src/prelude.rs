//! Common imports and types used throughout tanoak.

pub use std::collections::HashMap;
pub use std::sync::{Arc, Mutex};

// Add common internal types here
pub type Result<T> = std::result::Result<T, crate::core::errors::EmbedderError>;
