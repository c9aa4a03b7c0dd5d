//! Relay orchestration
//!
//! Drives one inbound message through the turn state machine:
//!
//! ```text
//! RECEIVED -> AUTH_CHECKED -> MEMORY_WIPE -> REPLIED
//!                          \-> NORMAL_TURN -> REPLIED
//!            (any state after AUTH_CHECKED) -> FAILED
//! ```
//!
//! A normal turn reconciles an edited message with memory, prunes the
//! conversation, assembles context, calls the model, stores the new exchange
//! and delivers the reply. Replies to edited messages are edited in place
//! when possible; the reply binding is updated whichever way the reply went
//! out, including error replies.

use crate::command::Command;
use crate::config::ProviderConfig;
use crate::context::ContextAssembler;
use crate::llm::{ProviderRegistry, RegisteredProvider};
use crate::memory::{ConversationKey, EditReconciler, ExchangeRecord};
use chrono::{DateTime, Utc};
use sdk::{
    Authorizer, ChatId, ChatTransport, InboundMessage, MessageId, RelayError, RelayErrorExt,
    TextFormat, TransportError,
};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

pub mod session;

pub use session::SessionStore;

/// Reply to a wipe request when memory was cleared
pub const MEMORY_ERASED: &str = "Memory erased.";

/// Reply to a wipe request for a provider without memory
pub const MEMORY_NOT_ENABLED: &str = "Memory is not enabled.";

/// Source of record timestamps
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// States of one inbound message's turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Received,
    AuthChecked,
    MemoryWipe,
    NormalTurn,
    Replied,
    Failed,
}

impl TurnState {
    /// Whether `next` is a legal successor of `self`
    ///
    /// Built-in commands and empty queries reply straight from
    /// `AuthChecked`.
    pub fn can_advance_to(self, next: TurnState) -> bool {
        use TurnState::*;
        matches!(
            (self, next),
            (Received, AuthChecked)
                | (AuthChecked, MemoryWipe)
                | (AuthChecked, NormalTurn)
                | (AuthChecked, Replied)
                | (MemoryWipe, Replied)
                | (NormalTurn, Replied)
                | (AuthChecked | MemoryWipe | NormalTurn, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TurnState::Replied | TurnState::Failed)
    }
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The chat is not allowed; nothing was sent or stored
    Unauthorized,

    /// Not a command, or a command nobody handles
    Ignored,

    /// Help text was sent (on `/help` or a provider command without text)
    Help { reply_id: Option<MessageId> },

    /// Chat id was reported (`/id`)
    ChatInfo { reply_id: Option<MessageId> },

    /// Conversation memory was erased
    MemoryWiped {
        removed: usize,
        reply_id: Option<MessageId>,
    },

    /// A wipe was requested for a provider without memory
    MemoryDisabled { reply_id: Option<MessageId> },

    /// The model answered and the answer was delivered
    Replied { reply_id: MessageId },

    /// The model call or the delivery failed; `reply_id` is the error reply
    Failed {
        error: String,
        reply_id: Option<MessageId>,
    },
}

struct Turn {
    state: TurnState,
}

impl Turn {
    fn new() -> Self {
        Self {
            state: TurnState::Received,
        }
    }

    fn advance(&mut self, next: TurnState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal turn transition {:?} -> {:?}",
            self.state,
            next
        );
        trace!("Turn {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// The relay core
///
/// Owns the session state and is handed its collaborators. One `Relay` serves
/// every chat; share it behind an `Arc` and call [`Relay::handle`] for each
/// inbound message, concurrently if desired.
pub struct Relay {
    providers: ProviderRegistry,
    transport: Arc<dyn ChatTransport>,
    authorizer: Arc<dyn Authorizer>,
    sessions: SessionStore,
    clock: Clock,
    bot_username: Option<String>,
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("providers", &self.providers)
            .field("sessions", &self.sessions)
            .finish()
    }
}

impl Relay {
    pub fn new(
        providers: ProviderRegistry,
        transport: Arc<dyn ChatTransport>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            providers,
            transport,
            authorizer,
            sessions: SessionStore::new(),
            clock: Arc::new(Utc::now),
            bot_username: None,
        }
    }

    /// Only answer `/cmd@bot` commands that name this bot
    pub fn with_bot_username(mut self, username: Option<String>) -> Self {
        self.bot_username = username.filter(|u| !u.trim().is_empty());
        self
    }

    /// Replace the wall clock used to stamp and age records
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Help text listing every command
    pub fn help_text(&self) -> String {
        help_text(self.providers.iter().map(|p| &p.config))
    }

    /// Process one inbound message to completion
    pub async fn handle(&self, inbound: &InboundMessage) -> TurnOutcome {
        let mut turn = Turn::new();

        if !self.authorizer.authorize(inbound.chat_id) {
            info!("Ignoring unauthorized chat ID: {}", inbound.chat_id);
            return TurnOutcome::Unauthorized;
        }
        turn.advance(TurnState::AuthChecked);

        let Some(command) = Command::parse(&inbound.text) else {
            return TurnOutcome::Ignored;
        };

        if !command.is_addressed_to(self.bot_username.as_deref()) {
            debug!(
                "Ignoring /{} addressed to another bot in chat {}",
                command.name, inbound.chat_id
            );
            return TurnOutcome::Ignored;
        }

        match command.name.as_str() {
            "help" => {
                let reply_id = self.send_help(inbound, &mut turn).await;
                TurnOutcome::Help { reply_id }
            }
            "id" => {
                let text = format!("Chat ID: `{}`\n", inbound.chat_id);
                let reply_id = self
                    .send_fresh(inbound, &text, TextFormat::Markdown)
                    .await;
                turn.advance(TurnState::Replied);
                TurnOutcome::ChatInfo { reply_id }
            }
            name => match self.providers.get(name) {
                Some(_) if command.is_bare() => {
                    let reply_id = self.send_help(inbound, &mut turn).await;
                    TurnOutcome::Help { reply_id }
                }
                Some(provider) => self.chat(inbound, provider, &command.args, turn).await,
                None => {
                    debug!("No handler for command /{}", name);
                    TurnOutcome::Ignored
                }
            },
        }
    }

    async fn chat(
        &self,
        inbound: &InboundMessage,
        provider: &RegisteredProvider,
        query: &str,
        mut turn: Turn,
    ) -> TurnOutcome {
        let config = &provider.config;
        let chat_id = inbound.chat_id;
        let user_message_id = inbound.message_id;
        let key = ConversationKey::new(chat_id, config.command_name.clone());
        let policy = config.memory_policy();

        let _guard = self.sessions.lock_chat(chat_id).await;
        let bound_reply = self.sessions.reply_for(chat_id, user_message_id);

        info!(
            "Incoming query for {} (cmd: {}): {}",
            config.display_name, config.command_name, query
        );

        if config.is_wipe_request(query) {
            turn.advance(TurnState::MemoryWipe);

            let (text, removed) = if policy.enabled {
                let removed = self
                    .sessions
                    .with_memory(|store| store.get_or_create(&key).clear());
                info!(
                    "Memory for provider {} wiped. {} pairs removed.",
                    config.command_name, removed
                );
                (MEMORY_ERASED, Some(removed))
            } else {
                (MEMORY_NOT_ENABLED, None)
            };

            let reply_id = self
                .deliver_and_bind(inbound, bound_reply, text, TextFormat::Plain)
                .await
                .ok();
            turn.advance(TurnState::Replied);

            return match removed {
                Some(removed) => TurnOutcome::MemoryWiped { removed, reply_id },
                None => TurnOutcome::MemoryDisabled { reply_id },
            };
        }

        turn.advance(TurnState::NormalTurn);

        let system_prompt = config.system_prompt.as_deref();
        let messages = if policy.enabled {
            let now = (self.clock)();
            self.sessions.with_memory(|store| {
                let conversation = store.get_or_create(&key);

                if inbound.edited {
                    EditReconciler::reconcile(conversation, user_message_id);
                }

                let report = policy.prune(conversation, now);
                if report.expired > 0 {
                    debug!(
                        "Removed {} expired memory pairs for {}. Remaining: {}.",
                        report.expired,
                        config.command_name,
                        conversation.len()
                    );
                }
                if report.evicted > 0 {
                    debug!(
                        "Removed {} memory pairs due to max_pairs limit for {}. Remaining: {}.",
                        report.evicted,
                        config.command_name,
                        conversation.len()
                    );
                }

                ContextAssembler::build(system_prompt, conversation, query)
            })
        } else {
            ContextAssembler::build_stateless(system_prompt, query)
        };

        let reply = match provider.backend.call(&messages, config.temperature).await {
            Ok(reply) => reply,
            Err(e) => {
                return self
                    .fail(inbound, provider, bound_reply, e.into(), turn)
                    .await
            }
        };

        if policy.enabled {
            let now = (self.clock)();
            let record = ExchangeRecord::new(user_message_id, now, query, reply.as_str());
            let total = self.sessions.with_memory(|store| {
                let conversation = store.get_or_create(&key);
                conversation.append(record);
                // Keep the stored length within max_pairs between turns
                policy.prune(conversation, now);
                conversation.len()
            });
            debug!(
                "Added new memory entry for {}. Total entries: {}.",
                config.command_name, total
            );
        }

        match self
            .deliver_and_bind(inbound, bound_reply, &reply, TextFormat::Markdown)
            .await
        {
            Ok(reply_id) => {
                turn.advance(TurnState::Replied);
                info!(
                    "Response from {} (cmd: {}): {}",
                    config.display_name, config.command_name, reply
                );
                TurnOutcome::Replied { reply_id }
            }
            // The exchange stays in memory: the model did answer.
            Err(e) => {
                self.fail(inbound, provider, bound_reply, e.into(), turn)
                    .await
            }
        }
    }

    async fn fail(
        &self,
        inbound: &InboundMessage,
        provider: &RegisteredProvider,
        bound_reply: Option<MessageId>,
        cause: RelayError,
        mut turn: Turn,
    ) -> TurnOutcome {
        turn.advance(TurnState::Failed);
        let config = &provider.config;
        let error = failure_detail(&cause);

        error!(
            recoverable = cause.is_recoverable(),
            "Chat error with provider {} (cmd: {}): {}. {}",
            config.display_name,
            config.command_name,
            cause,
            cause.user_hint()
        );

        let text = format!(
            "An error occurred while chatting with {}: {}",
            config.display_name, error
        );

        let reply_id = match self
            .deliver_and_bind(inbound, bound_reply, &text, TextFormat::Plain)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                error!(
                    "Failed to deliver error reply for message {}: {}",
                    inbound.message_id, e
                );
                None
            }
        };

        TurnOutcome::Failed { error, reply_id }
    }

    /// Edit the bound reply if there is one, otherwise (or if the edit
    /// fails) send a new reply; bind whichever message carried the text
    async fn deliver_and_bind(
        &self,
        inbound: &InboundMessage,
        bound_reply: Option<MessageId>,
        text: &str,
        format: TextFormat,
    ) -> Result<MessageId, TransportError> {
        let chat_id = inbound.chat_id;

        if let Some(reply_id) = bound_reply {
            match self.transport.edit(chat_id, reply_id, text, format).await {
                Ok(edited_id) => {
                    info!(
                        "Edited bot response for user message ID {}",
                        inbound.message_id
                    );
                    self.sessions
                        .bind_reply(chat_id, inbound.message_id, edited_id);
                    return Ok(edited_id);
                }
                Err(e) => {
                    warn!(
                        "Failed to edit message {} ({}). Sending new message.",
                        reply_id, e
                    );
                }
            }
        }

        let sent_id = self
            .transport
            .send(chat_id, Some(inbound.message_id), text, format)
            .await?;
        self.sessions.bind_reply(chat_id, inbound.message_id, sent_id);
        Ok(sent_id)
    }

    async fn send_help(&self, inbound: &InboundMessage, turn: &mut Turn) -> Option<MessageId> {
        let text = self.help_text();
        let reply_id = self.send_fresh(inbound, &text, TextFormat::Plain).await;
        turn.advance(TurnState::Replied);
        reply_id
    }

    /// Unbound reply used for built-in commands
    async fn send_fresh(
        &self,
        inbound: &InboundMessage,
        text: &str,
        format: TextFormat,
    ) -> Option<MessageId> {
        match self
            .transport
            .send(inbound.chat_id, Some(inbound.message_id), text, format)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                error!("Failed to send reply to chat {}: {}", inbound.chat_id, e);
                None
            }
        }
    }
}

/// Text shown to the chat for a failed turn: the collaborator's own message
/// without the relay's category prefix
fn failure_detail(error: &RelayError) -> String {
    match error {
        RelayError::Provider(e) => e.to_string(),
        RelayError::Transport(e) => e.to_string(),
        other => other.to_string(),
    }
}

/// Render the `/help` reply for a set of providers
pub fn help_text<'a>(providers: impl IntoIterator<Item = &'a ProviderConfig>) -> String {
    let mut text = String::from("Available commands:\n/help\n");
    for config in providers {
        let wipe = match (&config.memory_wipe_token, config.memory_enabled) {
            (Some(token), true) => format!(" | {}", token),
            _ => String::new(),
        };
        text.push_str(&format!("/{} <text>{}\n", config.command_name, wipe));
    }
    text
}

/// Convenience for hosts that answer every chat
pub fn allow_all() -> Arc<dyn Authorizer> {
    Arc::new(|_: ChatId| true)
}
