//! Help text and the command listing.

use crate::command::{bot_pattern, Command, CommandContext, CommandDescriptor, PrivilegePolicy};
use anyhow::Result;
use gambit_core::collapse_whitespace;
use gambit_types::Reply;
use regex::Regex;

static HELP: CommandDescriptor = CommandDescriptor::new("Help", PrivilegePolicy::Open);
static LIST_COMMANDS: CommandDescriptor =
    CommandDescriptor::new("ListCommands", PrivilegePolicy::Registry);

/// Help entries keyed by lowercased help name, first registration wins.
fn help_entries(catalog: &[&'static CommandDescriptor]) -> Vec<(String, &'static str)> {
    let mut entries: Vec<(String, &'static str)> = Vec::new();
    for descriptor in catalog {
        let (Some(help_name), Some(help)) = (descriptor.help_name, descriptor.help) else {
            continue;
        };
        let key = help_name.to_lowercase();
        if entries.iter().any(|(existing, _)| *existing == key) {
            continue;
        }
        entries.push((key, help));
    }
    entries
}

pub struct Help {
    pattern: Regex,
}

impl Help {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^(?:{bot}[:,]? )?help(?: (.+))?$")?,
        })
    }
}

impl Command for Help {
    /// Requested topic, lowercased.
    type Args = Option<String>;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &HELP
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<Option<String>> {
        let captures = self.pattern.captures(ctx.text())?;
        Some(captures.get(1).map(|topic| topic.as_str().trim().to_lowercase()))
    }

    fn execute(&self, ctx: &CommandContext<'_>, topic: Option<String>) -> Result<Vec<Reply>> {
        let entries = help_entries(ctx.catalog);
        if let Some(topic) = topic {
            if let Some((_, help)) = entries.iter().find(|(name, _)| *name == topic) {
                return Ok(vec![Reply::text(collapse_whitespace(&help.to_lowercase()))]);
            }
        }
        let options = entries
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Ok(vec![Reply::text(format!("help options: {options}"))])
    }
}

pub struct ListCommands {
    pattern: Regex,
}

impl ListCommands {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^{bot}[:,]? (?:show|list) commands$")?,
        })
    }
}

impl Command for ListCommands {
    type Args = ();

    fn descriptor(&self) -> &'static CommandDescriptor {
        &LIST_COMMANDS
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<()> {
        self.pattern.is_match(ctx.text()).then_some(())
    }

    fn execute(&self, ctx: &CommandContext<'_>, _args: ()) -> Result<Vec<Reply>> {
        let lines = ctx
            .catalog
            .iter()
            .filter_map(|descriptor| descriptor.syntax)
            .collect::<Vec<_>>();
        Ok(vec![Reply::text(lines.join("\n"))])
    }
}
