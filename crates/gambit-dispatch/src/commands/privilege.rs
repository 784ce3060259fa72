//! User and command privilege levels.

use crate::command::{bot_pattern, Command, CommandContext, CommandDescriptor, PrivilegePolicy};
use anyhow::Result;
use gambit_types::{Privilege, Reply};
use regex::Regex;

static SET_USER_PRIVILEGE: CommandDescriptor =
    CommandDescriptor::new("SetUserPrivilege", PrivilegePolicy::Open).documented(
        "set user privilege",
        "Set User Privilege Command - example 'gambit: set user privilege brad 2' change the \
         privilege of a user whose privilege is lower than yours. You can't grant more privilege \
         than you have.",
        "gambit: set user privilege <user> <level>",
    );

static GET_USER_PRIVILEGE: CommandDescriptor =
    CommandDescriptor::new("GetUserPrivilege", PrivilegePolicy::Registry).documented(
        "get user privilege",
        "Get User Privilege Command - example 'gambit: get user privilege brad' state the \
         privilege of a user in this conversation.",
        "gambit: get user privilege <user>",
    );

static SET_COMMAND_PRIVILEGE: CommandDescriptor =
    CommandDescriptor::new("SetCommandPrivilege", PrivilegePolicy::AdminOnly).documented(
        "set command privilege",
        "Set Command Privilege Command - example 'gambit: set command privilege wat 2' set the \
         privilege needed to run a command.",
        "gambit: set command privilege <command> <level>",
    );

static GET_COMMAND_PRIVILEGE: CommandDescriptor =
    CommandDescriptor::new("GetCommandPrivilege", PrivilegePolicy::Registry).documented(
        "get command privilege",
        "Get Command Privilege Command - example 'gambit: get command privilege wat' state the \
         privilege needed to run a command.",
        "gambit: get command privilege <command>",
    );

fn find_command(ctx: &CommandContext<'_>, query: &str) -> Option<&'static CommandDescriptor> {
    ctx.catalog
        .iter()
        .copied()
        .find(|descriptor| descriptor.answers_to(query))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeChange {
    pub subject: String,
    pub level: u32,
}

pub struct SetUserPrivilege {
    pattern: Regex,
}

impl SetUserPrivilege {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(
                bot_name,
                r"^{bot}[:,]? set user (?:priv|privilege) (\w+) (\d+)[.!?]?$",
            )?,
        })
    }
}

impl Command for SetUserPrivilege {
    type Args = PrivilegeChange;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &SET_USER_PRIVILEGE
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<PrivilegeChange> {
        let captures = self.pattern.captures(ctx.text())?;
        Some(PrivilegeChange {
            subject: captures[1].to_string(),
            level: captures[2].parse().ok()?,
        })
    }

    fn execute(&self, ctx: &CommandContext<'_>, change: PrivilegeChange) -> Result<Vec<Reply>> {
        let store = ctx.state.store();
        let conversation_id = ctx.conversation_id();
        let full_name = ctx.state.resolver().canonical_person(&change.subject)?;
        if store.find_user_by_name(conversation_id, &full_name)?.is_none() {
            return Ok(vec![Reply::text(format!(
                "{} is not a valid user",
                change.subject
            ))]);
        }
        let current = ctx.state.effective_privilege(&full_name, conversation_id)?;
        if !ctx.actor_privilege.dominates(current) {
            return Ok(vec![Reply::text(format!(
                "{} has a higher privilege than you can change.",
                change.subject
            ))]);
        }
        if Privilege::Level(change.level) > ctx.actor_privilege {
            return Ok(vec![Reply::text(
                "You can't give someone higher privilege than you have.",
            )]);
        }
        store.set_privilege(conversation_id, &full_name, change.level)?;
        tracing::info!(
            actor = ctx.actor(),
            subject = %full_name,
            level = change.level,
            "user privilege changed"
        );
        Ok(vec![Reply::text(format!(
            "Gave {} a privilege of {}",
            change.subject, change.level
        ))])
    }
}

pub struct GetUserPrivilege {
    pattern: Regex,
}

impl GetUserPrivilege {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^{bot}[:,]? get user (?:priv|privilege) (\w+)[.!?]?$")?,
        })
    }
}

impl Command for GetUserPrivilege {
    type Args = String;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &GET_USER_PRIVILEGE
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<String> {
        let captures = self.pattern.captures(ctx.text())?;
        Some(captures[1].to_string())
    }

    fn execute(&self, ctx: &CommandContext<'_>, subject: String) -> Result<Vec<Reply>> {
        let conversation_id = ctx.conversation_id();
        let full_name = ctx.state.resolver().canonical_person(&subject)?;
        if ctx
            .state
            .store()
            .find_user_by_name(conversation_id, &full_name)?
            .is_none()
        {
            return Ok(vec![Reply::text(format!("{subject} is not a valid user"))]);
        }
        let privilege = ctx.state.effective_privilege(&full_name, conversation_id)?;
        Ok(vec![Reply::text(format!(
            "Privilege for {subject} is {privilege}"
        ))])
    }
}

pub struct SetCommandPrivilege {
    pattern: Regex,
}

impl SetCommandPrivilege {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(
                bot_name,
                r"^{bot}[:,]? set (?:cmd|command) (?:priv|privilege) ((?:[\w-]+ )*[\w-]+) (\d+)[.!?]?$",
            )?,
        })
    }
}

impl Command for SetCommandPrivilege {
    type Args = PrivilegeChange;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &SET_COMMAND_PRIVILEGE
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<PrivilegeChange> {
        let captures = self.pattern.captures(ctx.text())?;
        Some(PrivilegeChange {
            subject: captures[1].to_string(),
            level: captures[2].parse().ok()?,
        })
    }

    fn execute(&self, ctx: &CommandContext<'_>, change: PrivilegeChange) -> Result<Vec<Reply>> {
        let Some(descriptor) = find_command(ctx, &change.subject) else {
            return Ok(vec![Reply::text(format!(
                "{} is not a valid command",
                change.subject
            ))]);
        };
        match descriptor.policy {
            PrivilegePolicy::AdminOnly => {
                return Ok(vec![Reply::text(format!(
                    "{} is reserved for admins",
                    change.subject
                ))]);
            }
            PrivilegePolicy::Open => {
                return Ok(vec![Reply::text(format!(
                    "{} is open to everyone",
                    change.subject
                ))]);
            }
            PrivilegePolicy::Registry => {}
        }
        let store = ctx.state.store();
        let previous = store.command_privilege(descriptor.name)?;
        store.set_command_privilege(descriptor.name, change.level)?;
        ctx.state.set_live_privilege(descriptor.name, change.level);
        tracing::info!(
            command = descriptor.name,
            previous = ?previous,
            level = change.level,
            "command privilege changed"
        );
        Ok(vec![Reply::text(format!(
            "Set privilege of {} to {}",
            change.subject, change.level
        ))])
    }
}

pub struct GetCommandPrivilege {
    pattern: Regex,
}

impl GetCommandPrivilege {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(
                bot_name,
                r"^{bot}[:,]? get (?:cmd|command) (?:priv|privilege) ((?:[\w-]+ )*[\w-]+)[.!?]?$",
            )?,
        })
    }
}

impl Command for GetCommandPrivilege {
    type Args = String;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &GET_COMMAND_PRIVILEGE
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<String> {
        let captures = self.pattern.captures(ctx.text())?;
        Some(captures[1].to_string())
    }

    fn execute(&self, ctx: &CommandContext<'_>, query: String) -> Result<Vec<Reply>> {
        let Some(descriptor) = find_command(ctx, &query) else {
            return Ok(vec![Reply::text(format!("{query} is not a valid command"))]);
        };
        let required = ctx.state.required_privilege(descriptor);
        Ok(vec![Reply::text(format!(
            "Privilege for {query} is {required}"
        ))])
    }
}
