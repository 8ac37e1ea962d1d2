//! Send chat message command
//!
//! Validates the conversation and forwards it, with the caller's dashboard context, to the
//! assistant. Quota and upstream failures are returned as they are; there is no retry.

use serde::{Deserialize, Serialize};

use crate::insights::{ChatMessage, ChatRequest, ChatRole, InsightError, InsightGenerator};

/// Longest conversation accepted in one request
pub const MAX_CHAT_MESSAGES: usize = 50;

pub const MAX_MESSAGE_CHARS: usize = 4000;

pub const MAX_CONTEXT_CHARS: usize = 4000;

/// Request body of `POST /api/v1/chat`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendChatCommand {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub context: Option<String>,
}

/// `{"reply": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendChatResponse {
    pub reply: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SendChatError {
    #[error("Field 'messages' must contain at least one message")]
    NoMessages,

    #[error("At most {max} messages are accepted, got {count}")]
    TooManyMessages { count: usize, max: usize },

    #[error("Message {index} is empty")]
    EmptyMessage { index: usize },

    #[error("Message {index} is longer than {max} characters")]
    MessageTooLong { index: usize, max: usize },

    #[error("The last message must come from the user")]
    LastMessageNotFromUser,

    #[error("Field 'context' is longer than {max} characters")]
    ContextTooLong { max: usize },

    #[error("Assistant failed: {0}")]
    Upstream(#[from] InsightError),
}

impl SendChatCommand {
    pub fn validate(&self) -> Result<(), SendChatError> {
        let last = self.messages.last().ok_or(SendChatError::NoMessages)?;

        if self.messages.len() > MAX_CHAT_MESSAGES {
            return Err(SendChatError::TooManyMessages {
                count: self.messages.len(),
                max: MAX_CHAT_MESSAGES,
            });
        }

        for (index, message) in self.messages.iter().enumerate() {
            if message.content.trim().is_empty() {
                return Err(SendChatError::EmptyMessage { index });
            }
            if message.content.chars().count() > MAX_MESSAGE_CHARS {
                return Err(SendChatError::MessageTooLong {
                    index,
                    max: MAX_MESSAGE_CHARS,
                });
            }
        }

        if last.role != ChatRole::User {
            return Err(SendChatError::LastMessageNotFromUser);
        }

        if self
            .context
            .as_deref()
            .is_some_and(|c| c.chars().count() > MAX_CONTEXT_CHARS)
        {
            return Err(SendChatError::ContextTooLong {
                max: MAX_CONTEXT_CHARS,
            });
        }

        Ok(())
    }
}

#[tracing::instrument(skip(generator, command), fields(user_id = %user_id, turns = command.messages.len()))]
pub async fn handle(
    generator: &dyn InsightGenerator,
    user_id: &str,
    command: SendChatCommand,
) -> Result<SendChatResponse, SendChatError> {
    command.validate()?;

    let request = ChatRequest {
        messages: command.messages,
        context: command
            .context
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    };

    let reply = generator.chat(&request).await?;

    tracing::debug!(chars = reply.len(), "Assistant replied");

    Ok(SendChatResponse { reply })
}
