//! Bot command parsing
//!
//! Inbound text of the form `/<name>[@botname] [args...]` is a command.
//! Arguments are split on whitespace and rejoined with single spaces, the
//! way the chat platform's command handlers present them.

use regex::Regex;
use std::sync::OnceLock;

static COMMAND_PATTERN: OnceLock<Regex> = OnceLock::new();

fn command_pattern() -> &'static Regex {
    COMMAND_PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^/([A-Za-z0-9_]{1,32})(?:@([A-Za-z0-9_]+))?(?:\s+(.*))?$")
            .expect("Invalid command pattern")
    })
}

/// A parsed bot command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name, lowercased, without the leading slash
    pub name: String,

    /// Arguments joined by single spaces; empty when none were given
    pub args: String,

    /// Bot named in a `/name@bot` suffix, as written
    pub addressee: Option<String>,
}

impl Command {
    /// Parse `text`, returning `None` for anything that is not a command
    pub fn parse(text: &str) -> Option<Self> {
        let captures = command_pattern().captures(text.trim_start())?;
        let name = captures.get(1)?.as_str().to_lowercase();
        let addressee = captures.get(2).map(|m| m.as_str().to_string());
        let args = captures
            .get(3)
            .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();

        Some(Self {
            name,
            args,
            addressee,
        })
    }

    /// True when the command carried no arguments
    pub fn is_bare(&self) -> bool {
        self.args.is_empty()
    }

    /// Whether this bot should answer
    ///
    /// Commands without a `@bot` suffix are for everyone. A suffix must name
    /// `bot_username` (case-insensitive, leading `@` optional); with no
    /// username configured every suffix is accepted.
    pub fn is_addressed_to(&self, bot_username: Option<&str>) -> bool {
        match (&self.addressee, bot_username) {
            (Some(addressee), Some(username)) => {
                addressee.eq_ignore_ascii_case(username.trim_start_matches('@'))
            }
            _ => true,
        }
    }
}
