//! Trait abstractions for external collaborators.
//!
//! The dispatcher talks to the backend only through [`HttpClient`], so
//! tests can swap the network for a scripted mock.

mod http;

pub use http::{ByteStream, HttpClient, HttpError, Response};
