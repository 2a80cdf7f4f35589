//! Navik - streaming client for the care-resource navigator assistant.
//!
//! The crate reconstructs an assistant's answer incrementally from an SSE
//! byte stream, with cancellation, error recovery, and a non-streaming
//! fallback. UI layers observe the transcript through snapshots and a
//! revision watch channel; this crate renders nothing itself.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod models;
pub mod session;
pub mod sse;
pub mod traits;
pub mod transcript;
