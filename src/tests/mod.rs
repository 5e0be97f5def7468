//! Crate-level integration tests: engine loop behavior against a mock
//! runtime, message routing, and texture registry semantics.

mod support;

mod engine_loop;
mod textures;
