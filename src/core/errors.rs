//! Core error types

use thiserror::Error;

/// Embedder errors.
///
/// Only two classes are fatal: boot errors (runtime library, ABI symbols,
/// required data files) and protocol errors that make the display or the
/// window itself unusable. Everything per-request is answered over the
/// channel that issued it and never surfaces here.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("Failed to connect to Wayland display: {0}")]
    DisplayConnect(String),

    #[error("Wayland connection lost: {0}")]
    DisplayLost(String),

    #[error("Mandatory global interface missing: {0}")]
    MissingGlobal(&'static str),

    #[error("Wayland protocol error: {0}")]
    Protocol(String),

    #[error("Runtime boot failure: {0}")]
    RuntimeBoot(String),

    #[error("Runtime ABI symbol missing: {0}")]
    MissingSymbol(String),

    #[error("Required data file missing: {0}")]
    MissingDataFile(String),

    #[error("Runtime call failed: {0}")]
    RuntimeCall(&'static str),

    #[error("Engine is not running")]
    NotRunning,

    #[error("Invalid window index: {0}")]
    InvalidWindowIndex(usize),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl EmbedderError {
    pub fn display_connect(msg: impl Into<String>) -> Self {
        Self::DisplayConnect(msg.into())
    }

    pub fn display_lost(msg: impl Into<String>) -> Self {
        Self::DisplayLost(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn runtime_boot(msg: impl Into<String>) -> Self {
        Self::RuntimeBoot(msg.into())
    }

    /// Whether the process should exit rather than retry.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::RuntimeCall(_) | Self::NotRunning | Self::Backend(_))
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, EmbedderError>;
