//! Turn assembly: conversation history to backend request.

use std::sync::Arc;

use tutur_types::chat::Conversation;
use tutur_types::llm::{CompletionRequest, Message, MessageRole, ProviderCapabilities};

/// Where the system prompt travels in an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemPromptPlacement {
    /// First entry of the message list.
    Inline,
    /// The request's dedicated system-instruction field.
    Separate,
}

impl SystemPromptPlacement {
    pub fn for_capabilities(capabilities: &ProviderCapabilities) -> Self {
        if capabilities.separate_system_instruction {
            Self::Separate
        } else {
            Self::Inline
        }
    }
}

/// Builds the bounded request sent to the backend for one turn.
#[derive(Debug, Clone)]
pub struct TurnAssembler {
    pub max_history_messages: usize,
    pub system_prompt: Arc<str>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
}

impl TurnAssembler {
    /// Build the request for `conversation`.
    ///
    /// Only the most recent `max_history_messages` user/assistant turns are
    /// sent, oldest first. The conversation itself is not modified.
    pub fn build_request(
        &self,
        conversation: &Conversation,
        placement: SystemPromptPlacement,
    ) -> CompletionRequest {
        let eligible = conversation.turns().count();
        let skip = eligible.saturating_sub(self.max_history_messages);
        let window = conversation.turns().skip(skip).map(|m| m.to_llm_message());

        let (messages, system) = match placement {
            SystemPromptPlacement::Inline => {
                let mut messages = Vec::with_capacity(eligible - skip + 1);
                messages.push(Message {
                    role: MessageRole::System,
                    content: self.system_prompt.to_string(),
                });
                messages.extend(window);
                (messages, None)
            }
            SystemPromptPlacement::Separate => {
                (window.collect(), Some(self.system_prompt.to_string()))
            }
        };

        CompletionRequest {
            model: self.model.clone(),
            messages,
            system,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}
