//! In-memory fakes for session store tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tutur_types::chat::Conversation;
use tutur_types::error::SessionLogError;
use tutur_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason, Usage,
};

use super::log::SessionLog;
use crate::llm::provider::LlmProvider;

/// Session log backed by a HashMap. Can be told to fail reads or writes.
#[derive(Debug, Default)]
pub struct MemorySessionLog {
    pub stored: Mutex<HashMap<String, Conversation>>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub writes: AtomicUsize,
}

impl MemorySessionLog {
    pub fn with(user_id: &str, conversation: Conversation) -> Self {
        let log = Self::default();
        log.stored
            .lock()
            .unwrap()
            .insert(user_id.to_string(), conversation);
        log
    }

    pub fn stored(&self, user_id: &str) -> Option<Conversation> {
        self.stored.lock().unwrap().get(user_id).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn io_error(user_id: &str) -> SessionLogError {
        SessionLogError::Io {
            path: format!("{user_id}.jsonl").into(),
            source: std::io::Error::other("simulated failure"),
        }
    }
}

impl SessionLog for MemorySessionLog {
    async fn read(&self, user_id: &str) -> Result<Option<Conversation>, SessionLogError> {
        if self.fail_reads {
            return Err(Self::io_error(user_id));
        }
        Ok(self.stored(user_id))
    }

    async fn write(
        &self,
        user_id: &str,
        conversation: &Conversation,
    ) -> Result<(), SessionLogError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(Self::io_error(user_id));
        }
        self.stored
            .lock()
            .unwrap()
            .insert(user_id.to_string(), conversation.clone());
        Ok(())
    }
}

/// One scripted backend outcome.
#[derive(Debug, Clone)]
pub enum Scripted {
    Answer(String),
    Withheld,
    Fail,
    Hang,
    Panic,
}

/// Provider that replays scripted outcomes and records every request.
#[derive(Debug)]
pub struct ScriptedProvider {
    capabilities: ProviderCapabilities,
    script: Mutex<VecDeque<Scripted>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
    pub delay: Duration,
}

impl ScriptedProvider {
    pub fn new(separate_system_instruction: bool, script: Vec<Scripted>) -> Self {
        Self {
            capabilities: ProviderCapabilities {
                separate_system_instruction,
                max_context_tokens: 32_000,
                max_output_tokens: 1024,
            },
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Scripted::Fail);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let (content, stop_reason) = match next {
            Scripted::Answer(text) => (text, StopReason::EndTurn),
            Scripted::Withheld => (String::new(), StopReason::ContentFiltered),
            Scripted::Fail => {
                return Err(LlmError::Provider {
                    message: "connection reset".to_string(),
                });
            }
            Scripted::Panic => panic!("scripted provider panic"),
            Scripted::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        };
        Ok(CompletionResponse {
            id: "resp-1".to_string(),
            content,
            model: request.model.clone(),
            stop_reason,
            usage: Usage::default(),
        })
    }
}
