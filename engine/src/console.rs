//! Console session
//!
//! An offline stand-in for the chat platform: lines typed on stdin become
//! inbound messages of a single chat and bot replies are printed to stdout.
//! Every line gets a message id, so earlier messages can be edited with
//! `:edit <id> <new text>` to exercise edit reconciliation.

use crate::memory::ConversationKey;
use crate::relay::{Relay, TurnOutcome};
use async_trait::async_trait;
use sdk::{
    ChatId, ChatTransport, InboundMessage, MessageId, RelayError, TextFormat, TransportError,
};
use std::io::Write;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Message id source shared by the user side and the bot side
#[derive(Debug, Clone, Default)]
pub struct MessageIds(Arc<AtomicI64>);

impl MessageIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> MessageId {
        MessageId(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Transport that writes bot messages to a terminal
pub struct ConsoleTransport<W: Write + Send> {
    ids: MessageIds,
    out: Mutex<W>,
}

impl<W: Write + Send> ConsoleTransport<W> {
    pub fn new(ids: MessageIds, out: W) -> Self {
        Self {
            ids,
            out: Mutex::new(out),
        }
    }

    fn print(&self, line: &str) -> Result<(), TransportError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| TransportError::SendFailed("console output poisoned".to_string()))?;
        writeln!(out, "{}", line).map_err(|e| TransportError::SendFailed(e.to_string()))
    }
}

#[async_trait]
impl<W: Write + Send> ChatTransport for ConsoleTransport<W> {
    async fn send(
        &self,
        _chat_id: ChatId,
        reply_to: Option<MessageId>,
        text: &str,
        _format: TextFormat,
    ) -> Result<MessageId, TransportError> {
        let id = self.ids.next();
        let header = match reply_to {
            Some(to) => format!("[bot #{} -> #{}]", id, to),
            None => format!("[bot #{}]", id),
        };
        self.print(&format!("{} {}", header, text.trim_end()))?;
        Ok(id)
    }

    async fn edit(
        &self,
        _chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        _format: TextFormat,
    ) -> Result<MessageId, TransportError> {
        self.print(&format!("[bot #{} edited] {}", message_id, text.trim_end()))?;
        Ok(message_id)
    }
}

/// One line of console input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// A new message
    Send(String),

    /// Replace the text of an earlier message
    Edit { message_id: MessageId, text: String },

    /// Show what every provider currently remembers
    Memory,

    Quit,

    /// Blank or malformed line
    Nothing,
}

impl ConsoleInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Nothing;
        }

        match line.split_once(char::is_whitespace).unwrap_or((line, "")) {
            (":quit", _) | (":q", _) => Self::Quit,
            (":memory", _) => Self::Memory,
            (":edit", rest) => {
                let rest = rest.trim_start();
                let (id, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                match id.parse::<i64>() {
                    Ok(id) if !text.trim().is_empty() => Self::Edit {
                        message_id: MessageId(id),
                        text: text.trim().to_string(),
                    },
                    _ => Self::Nothing,
                }
            }
            _ => Self::Send(line.to_string()),
        }
    }
}

/// Read stdin until EOF or `:quit`, relaying every line
/// Stdin read failures end the session with [`RelayError::Io`]
pub async fn run(relay: &Relay, chat_id: ChatId, ids: &MessageIds) -> Result<(), RelayError> {
    println!("{}", relay.help_text());
    println!("Console chat {}. `:edit <id> <text>` edits a message, `:memory` shows memory, `:quit` exits.", chat_id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let inbound = match ConsoleInput::parse(&line) {
            ConsoleInput::Quit => break,
            ConsoleInput::Nothing => continue,
            ConsoleInput::Memory => {
                print_memory(relay, chat_id);
                continue;
            }
            ConsoleInput::Send(text) => {
                let id = ids.next();
                println!("[you #{}] {}", id, text);
                InboundMessage::new(chat_id, id, text)
            }
            ConsoleInput::Edit { message_id, text } => {
                println!("[you #{} edited] {}", message_id, text);
                InboundMessage::edited(chat_id, message_id, text)
            }
        };

        match relay.handle(&inbound).await {
            TurnOutcome::Ignored => println!("(not a command; try /help)"),
            outcome => tracing::debug!("Turn outcome: {:?}", outcome),
        }
    }

    Ok(())
}

fn print_memory(relay: &Relay, chat_id: ChatId) {
    for provider in relay.providers().iter() {
        let key = ConversationKey::new(chat_id, provider.config.command_name.clone());
        let conversation = relay.sessions().conversation(&key).unwrap_or_default();
        println!(
            "/{}: {} stored exchange(s)",
            provider.config.command_name,
            conversation.len()
        );
        for record in conversation.records() {
            println!(
                "  #{} at {}: {}",
                record.user_message_id,
                record.timestamp.format("%H:%M:%S"),
                record.turn[0].content
            );
        }
    }
}
