//! Command capability: a lexical matcher producing typed arguments and an
//! executor consuming them.

use crate::state::BotState;
use anyhow::Result;
use gambit_types::{InboundMessage, Privilege, Reply};
use regex::Regex;

/// How a command's execution threshold is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegePolicy {
    /// Threshold read from the live registry cache, adjustable at runtime.
    Registry,
    /// Fixed at `Privilege::Unrestricted`.
    AdminOnly,
    /// Never gated by the dispatcher.
    Open,
}

/// Static metadata describing a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    /// Registry key.
    pub name: &'static str,
    /// Short name shown by `help`; hidden from help when `None`.
    pub help_name: Option<&'static str>,
    pub help: Option<&'static str>,
    pub syntax: Option<&'static str>,
    pub policy: PrivilegePolicy,
}

impl CommandDescriptor {
    pub const fn new(name: &'static str, policy: PrivilegePolicy) -> Self {
        Self {
            name,
            help_name: None,
            help: None,
            syntax: None,
            policy,
        }
    }

    pub const fn documented(
        mut self,
        help_name: &'static str,
        help: &'static str,
        syntax: &'static str,
    ) -> Self {
        self.help_name = Some(help_name);
        self.help = Some(help);
        self.syntax = Some(syntax);
        self
    }

    /// True when `query` names this command by registry key or help name.
    pub fn answers_to(&self, query: &str) -> bool {
        let query = query.trim();
        self.name.eq_ignore_ascii_case(query)
            || self
                .help_name
                .is_some_and(|help_name| help_name.eq_ignore_ascii_case(query))
    }
}

/// Per-message view handed to matchers and executors.
pub struct CommandContext<'a> {
    pub state: &'a BotState,
    /// Every registered command in registration order.
    pub catalog: &'a [&'static CommandDescriptor],
    /// Message with the sender already resolved.
    pub message: &'a InboundMessage,
    pub actor_privilege: Privilege,
}

impl CommandContext<'_> {
    pub fn conversation_id(&self) -> &str {
        &self.message.conversation_id
    }

    pub fn actor(&self) -> &str {
        &self.message.sender.full_name
    }

    pub fn text(&self) -> &str {
        self.message.text.trim()
    }
}

/// A chat command with typed, per-invocation arguments.
pub trait Command: Send + Sync {
    type Args: 'static;

    fn descriptor(&self) -> &'static CommandDescriptor;

    /// Lexical match; `None` means the command does not apply.
    fn matches(&self, ctx: &CommandContext<'_>) -> Option<Self::Args>;

    fn execute(&self, ctx: &CommandContext<'_>, args: Self::Args) -> Result<Vec<Reply>>;
}

/// Matched command awaiting the privilege check.
pub trait Invocation {
    fn run(self: Box<Self>, ctx: &CommandContext<'_>) -> Result<Vec<Reply>>;
}

struct BoundInvocation<'a, C: Command> {
    command: &'a C,
    args: C::Args,
}

impl<C: Command> Invocation for BoundInvocation<'_, C> {
    fn run(self: Box<Self>, ctx: &CommandContext<'_>) -> Result<Vec<Reply>> {
        let Self { command, args } = *self;
        command.execute(ctx, args)
    }
}

/// Object-safe form of [`Command`] stored by the registry.
pub trait RegisteredCommand: Send + Sync {
    fn descriptor(&self) -> &'static CommandDescriptor;
    fn prepare<'a>(&'a self, ctx: &CommandContext<'_>) -> Option<Box<dyn Invocation + 'a>>;
}

impl<C: Command> RegisteredCommand for C {
    fn descriptor(&self) -> &'static CommandDescriptor {
        Command::descriptor(self)
    }

    fn prepare<'a>(&'a self, ctx: &CommandContext<'_>) -> Option<Box<dyn Invocation + 'a>> {
        let args = self.matches(ctx)?;
        Some(Box::new(BoundInvocation {
            command: self,
            args,
        }))
    }
}

pub type CommandList = Vec<Box<dyn RegisteredCommand>>;

/// Compiles a case-insensitive pattern, substituting `{bot}` with the
/// escaped bot name.
pub fn bot_pattern(bot_name: &str, template: &str) -> Result<Regex> {
    let pattern = format!(
        "(?i){}",
        template.replace("{bot}", &regex::escape(bot_name))
    );
    Ok(Regex::new(&pattern)?)
}

/// Single word, or several words wrapped in parentheses.
pub const TARGET: &str = r"(\w+|\((?:\w+ )*\w+\))";

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: CommandDescriptor = CommandDescriptor::new("PlayHighLow", PrivilegePolicy::Registry)
        .documented("high-low", "Gamble karma on two dice.", "gambit: high-low <bet> <high|low|7>");

    #[test]
    fn unit_descriptor_answers_to_name_and_help_name() {
        assert!(SAMPLE.answers_to("playhighlow"));
        assert!(SAMPLE.answers_to(" HIGH-LOW "));
        assert!(!SAMPLE.answers_to("high"));
    }

    #[test]
    fn unit_bot_pattern_escapes_bot_name_and_ignores_case() {
        let pattern = bot_pattern("g.bot", r"^{bot}[:,]? ping$").expect("pattern");
        assert!(pattern.is_match("G.BOT: ping"));
        assert!(!pattern.is_match("gxbot: ping"));
    }

    #[test]
    fn unit_target_pattern_accepts_words_and_parenthesized_phrases() {
        let pattern = Regex::new(&format!("^{TARGET}$")).expect("pattern");
        assert!(pattern.is_match("poop"));
        assert!(pattern.is_match("(more poop)"));
        assert!(!pattern.is_match("more poop"));
        assert!(!pattern.is_match("( poop)"));
    }
}
