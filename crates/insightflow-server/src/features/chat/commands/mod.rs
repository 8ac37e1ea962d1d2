pub mod send;

pub use send::{
    SendChatCommand, SendChatError, SendChatResponse, MAX_CHAT_MESSAGES, MAX_CONTEXT_CHARS,
    MAX_MESSAGE_CHARS,
};
