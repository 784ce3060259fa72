//! Admin tools for nicknames and binding unknown speakers to a name.

use crate::command::{
    bot_pattern, Command, CommandContext, CommandDescriptor, PrivilegePolicy, TARGET,
};
use anyhow::Result;
use gambit_core::strip_target_parens;
use gambit_types::{Reply, PLACEHOLDER_USER_NAME};
use regex::Regex;

static ADD_NICKNAME: CommandDescriptor =
    CommandDescriptor::new("AddNickname", PrivilegePolicy::AdminOnly);
static RESOLVE_UNKNOWN_USER: CommandDescriptor =
    CommandDescriptor::new("ResolveUnknownUser", PrivilegePolicy::AdminOnly);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicknameAssignment {
    pub full_name: String,
    pub nickname: String,
}

pub struct AddNickname {
    pattern: Regex,
}

impl AddNickname {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(
                bot_name,
                &format!(r"^{{bot}}[:,]? nickname (\w+ \w+) {TARGET}[.!?]?$"),
            )?,
        })
    }
}

impl Command for AddNickname {
    type Args = NicknameAssignment;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &ADD_NICKNAME
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<NicknameAssignment> {
        let captures = self.pattern.captures(ctx.text())?;
        Some(NicknameAssignment {
            full_name: captures[1].to_string(),
            nickname: strip_target_parens(&captures[2]),
        })
    }

    fn execute(&self, ctx: &CommandContext<'_>, args: NicknameAssignment) -> Result<Vec<Reply>> {
        let store = ctx.state.store();
        if store
            .find_user_by_name(ctx.conversation_id(), &args.full_name)?
            .is_none()
        {
            return Ok(vec![Reply::text("No user found with that name.")]);
        }
        if ctx.state.resolver().is_known_nickname(&args.nickname)? {
            return Ok(vec![Reply::text(
                "Someone already exists with that nickname.",
            )]);
        }
        store.set_nickname(ctx.conversation_id(), &args.full_name, &args.nickname)?;
        Ok(vec![Reply::text(format!(
            "Gave {} nickname {}",
            args.full_name, args.nickname
        ))])
    }
}

pub struct ResolveUnknownUser {
    pattern: Regex,
}

impl ResolveUnknownUser {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^{bot}[:,]? resolve unknown (\w+ \w+)[.!?]?$")?,
        })
    }
}

impl Command for ResolveUnknownUser {
    type Args = String;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &RESOLVE_UNKNOWN_USER
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<String> {
        let captures = self.pattern.captures(ctx.text())?;
        Some(captures[1].to_string())
    }

    fn execute(&self, ctx: &CommandContext<'_>, name: String) -> Result<Vec<Reply>> {
        let conversation_id = ctx.conversation_id();
        let store = ctx.state.store();
        if store.find_user_by_name(conversation_id, &name)?.is_some()
            || ctx.state.known_user_id(conversation_id, &name).is_some()
        {
            return Ok(vec![Reply::text("A user with that name already exists.")]);
        }
        let Some(user_id) = ctx
            .state
            .known_user_id(conversation_id, PLACEHOLDER_USER_NAME)
        else {
            return Ok(vec![Reply::text(
                "Nobody unknown has spoken here recently.",
            )]);
        };
        store.insert_user(&user_id, conversation_id, &name)?;
        tracing::info!(conversation_id, user_id = %user_id, name = %name, "unknown user resolved");
        Ok(vec![Reply::text(format!("Resolved User {name}"))])
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;
    use gambit_store::BotStore;
    use gambit_types::{InboundMessage, Sender};

    #[test]
    fn functional_nicknames_are_unique_and_admin_only() {
        let harness = Harness::new();
        harness.say("Brad Johns", "hello");
        harness.say("Sam Hill", "hello");
        assert!(harness
            .say("Brad Johns", "gambit: nickname Brad Johns brad")
            .is_empty());
        assert_eq!(
            harness.say(Harness::ADMIN, "gambit: nickname Brad Johns brad"),
            ["Gave Brad Johns nickname brad"]
        );
        assert_eq!(
            harness.say(Harness::ADMIN, "gambit: nickname Sam Hill BRAD"),
            ["Someone already exists with that nickname."]
        );
        assert_eq!(
            harness.say(Harness::ADMIN, "gambit: nickname Dana Lee dana"),
            ["No user found with that name."]
        );
    }

    #[test]
    fn functional_unknown_speaker_is_bound_to_a_name() {
        let harness = Harness::new();
        let unknown = InboundMessage::new("c-1", Sender::new("g-42", "Unknown"), "who am i");
        assert!(harness.dispatcher.dispatch(&unknown).is_empty());
        assert!(harness
            .store
            .find_user("g-42", "c-1")
            .expect("lookup")
            .is_none());

        assert_eq!(
            harness.say(Harness::ADMIN, "gambit: resolve unknown Dana Lee"),
            ["Resolved User Dana Lee"]
        );
        assert_eq!(
            harness.say(Harness::ADMIN, "gambit: resolve unknown Dana Lee"),
            ["A user with that name already exists."]
        );

        let replies = harness.dispatcher.dispatch(&unknown);
        assert!(replies.is_empty());
        assert_eq!(
            harness.store.quotes(None).expect("quotes").len(),
            0,
            "resolution must not create quotes"
        );
        assert_eq!(
            harness.say("Sam Hill", "quote Dana Lee"),
            ["\"who am i\" - Dana Lee, ".to_string() + &chrono::Utc::now().format("%B %Y").to_string()]
        );
    }
}
