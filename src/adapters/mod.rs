//! Concrete implementations of the collaborator traits.
//!
//! - `reqwest_http` - production HTTP client
//! - `mock` - scripted implementations for tests

pub mod mock;
mod reqwest_http;

pub use reqwest_http::ReqwestHttpClient;
