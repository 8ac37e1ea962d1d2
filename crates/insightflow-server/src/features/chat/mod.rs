//! Assistant chat: stateless conversation with the text-generation model
//!
//! The client keeps the conversation and sends all of it with every turn; nothing is stored.

pub mod commands;
pub mod routes;

pub use commands::{SendChatCommand, SendChatError, SendChatResponse};
pub use routes::chat_routes;
