use crate::api::AskBackend;
use crate::auth::AuthGate;
use crate::error::{ ChatError, Result };
use crate::history::SessionStore;
use crate::models::chat::ChatMessage;
use log::{ debug, error, warn };
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyInput,
    SendInFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing was recorded or sent.
    Skipped(SkipReason),
    Replied {
        conversation_id: i64,
        reply: String,
    },
    /// The error text was appended to the conversation as an assistant message.
    Failed {
        conversation_id: i64,
        error: String,
    },
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sends user input to the backend and records both sides of the exchange in the session store.
pub struct MessageDispatcher {
    backend: Arc<dyn AskBackend>,
    auth: AuthGate,
    store: Mutex<SessionStore>,
    in_flight: AtomicBool,
}

impl MessageDispatcher {
    pub fn new(backend: Arc<dyn AskBackend>, auth: AuthGate, store: SessionStore) -> Self {
        Self {
            backend,
            auth,
            store: Mutex::new(store),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Mutex<SessionStore> {
        &self.store
    }

    pub fn is_sending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Backend and transport failures never surface as `Err`; only local storage failures do.
    pub async fn send(&self, text: &str) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SendOutcome::Skipped(SkipReason::EmptyInput));
        }
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("Ignoring input while a send is in flight");
            return Ok(SendOutcome::Skipped(SkipReason::SendInFlight));
        };

        let conversation_id = {
            let mut store = self.store.lock().await;
            match store.active_id() {
                Some(id) => {
                    store.append_message(id, ChatMessage::user(text))?;
                    id
                }
                None => store.start_conversation(text)?,
            }
        };

        let token = self.auth.access_token();
        let (message, outcome) = match self.backend.ask(text, token.as_deref()).await {
            Ok(reply) =>
                (
                    ChatMessage::assistant(reply.clone()),
                    SendOutcome::Replied { conversation_id, reply },
                ),
            Err(e) => {
                error!("Ask request for conversation {} failed: {}", conversation_id, e);
                let content = format!("Error: {}", e);
                (
                    ChatMessage::assistant(content.clone()),
                    SendOutcome::Failed { conversation_id, error: content },
                )
            }
        };

        let mut store = self.store.lock().await;
        match store.append_message(conversation_id, message) {
            Ok(()) => Ok(outcome),
            Err(ChatError::NotFound(id)) => {
                warn!("Conversation {} was deleted before its reply arrived", id);
                Ok(outcome)
            }
            Err(e) => Err(e),
        }
    }
}
