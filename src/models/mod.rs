//! Data models for the assistant client.
//!
//! # Module structure
//! - `message` - Conversation messages, roles, and feedback
//! - `request` - Request/response bodies for the ask endpoints

mod message;
mod request;

pub use message::{Feedback, Message, MessageRole};
pub use request::{AskRequest, AskResponse, ErrorBody, QueryContext};
