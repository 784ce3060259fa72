//! Line-oriented console stand-in for a chat network.

use anyhow::Result;
use gambit_core::name_key;
use gambit_types::{InboundMessage, Reply, Sender};
use regex::Regex;

/// Platform id assigned to a console speaker known only by name.
pub(crate) fn derived_user_id(full_name: &str) -> String {
    format!("console-{}", name_key(full_name).replace(' ', "-"))
}

pub(crate) struct ConsoleTransport {
    conversation_id: String,
    default_sender: Sender,
    speaker_pattern: Regex,
}

impl ConsoleTransport {
    pub(crate) fn new(conversation_id: &str, user: &str, user_id: Option<&str>) -> Result<Self> {
        let user_id = user_id
            .map(str::to_string)
            .unwrap_or_else(|| derived_user_id(user));
        Ok(Self {
            conversation_id: conversation_id.to_string(),
            default_sender: Sender::new(user_id, user),
            speaker_pattern: Regex::new(r"^@([^:@]+):\s*(.*)$")?,
        })
    }

    /// Turns a console line into a message; `@Full Name: text` speaks as
    /// another user. Blank lines yield nothing.
    pub(crate) fn parse_line(&self, line: &str) -> Option<InboundMessage> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return None;
        }
        if let Some(captures) = self.speaker_pattern.captures(line) {
            let full_name = captures[1].trim();
            if !full_name.is_empty() {
                let sender = Sender::new(derived_user_id(full_name), full_name);
                return Some(InboundMessage::new(
                    &self.conversation_id,
                    sender,
                    &captures[2],
                ));
            }
        }
        Some(InboundMessage::new(
            &self.conversation_id,
            self.default_sender.clone(),
            line,
        ))
    }

    /// Transport payloads for `replies`, one per reply.
    pub(crate) fn render(replies: &[Reply]) -> Vec<String> {
        replies.iter().map(Reply::to_payload).collect()
    }
}
