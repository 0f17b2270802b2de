//! MotoDash Server Library
//!
//! Exposes server components for integration testing.

pub mod api;
pub mod cluster;
pub mod config;
pub mod manager;
pub mod sinks;
pub mod state;
