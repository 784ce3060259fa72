//! Alias management: add, remove and list name substitutions.

use crate::command::{bot_pattern, Command, CommandContext, CommandDescriptor, PrivilegePolicy, TARGET};
use anyhow::Result;
use gambit_core::strip_target_parens;
use gambit_types::Reply;
use regex::Regex;

static ADD_ALIAS: CommandDescriptor = CommandDescriptor::new("AddAlias", PrivilegePolicy::Registry)
    .documented(
        "alias",
        "Add Alias Command - example: 'gambit: alias black white' link a karma term that has no \
         karma yet to any other karma term, existing or otherwise.",
        "gambit: alias <old> <new>",
    );

static REMOVE_ALIAS: CommandDescriptor =
    CommandDescriptor::new("RemoveAlias", PrivilegePolicy::Registry).documented(
        "remove alias",
        "Remove Alias Command - example 'gambit: remove alias black' remove an alias that maps \
         the provided word to something else.",
        "gambit: remove alias <old>",
    );

static LIST_ALIASES: CommandDescriptor =
    CommandDescriptor::new("ListAliases", PrivilegePolicy::Registry).documented(
        "list aliases",
        "List Aliases Command - example 'gambit: list aliases' list every alias currently known.",
        "gambit: list aliases",
    );

pub struct AddAlias {
    pattern: Regex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasPair {
    pub old: String,
    pub new: String,
}

impl AddAlias {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, &format!(r"^.*{{bot}}[:,]? alias {TARGET} {TARGET}"))?,
        })
    }
}

impl Command for AddAlias {
    type Args = AliasPair;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &ADD_ALIAS
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<AliasPair> {
        let captures = self.pattern.captures(ctx.text())?;
        Some(AliasPair {
            old: strip_target_parens(&captures[1]),
            new: strip_target_parens(&captures[2]),
        })
    }

    fn execute(&self, ctx: &CommandContext<'_>, args: AliasPair) -> Result<Vec<Reply>> {
        let store = ctx.state.store();
        if store.karma_of(&args.old)? != 0 {
            return Ok(vec![Reply::text(format!(
                "There's already karma for {}",
                args.old
            ))]);
        }
        if store.find_alias(&args.old)?.is_some() {
            return Ok(vec![Reply::text(format!(
                "There's already an alias for {}",
                args.old
            ))]);
        }
        store.insert_alias(&args.old, &args.new)?;
        Ok(vec![Reply::text(format!(
            "Aliased {} to {}",
            args.old, args.new
        ))])
    }
}

pub struct RemoveAlias {
    pattern: Regex,
}

impl RemoveAlias {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, &format!(r"^.*{{bot}}[:,]? remove alias {TARGET}"))?,
        })
    }
}

impl Command for RemoveAlias {
    type Args = String;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &REMOVE_ALIAS
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<String> {
        let captures = self.pattern.captures(ctx.text())?;
        Some(strip_target_parens(&captures[1]))
    }

    fn execute(&self, ctx: &CommandContext<'_>, alias: String) -> Result<Vec<Reply>> {
        if !ctx.state.store().remove_alias(&alias)? {
            return Ok(vec![Reply::text("There is no alias for that name.")]);
        }
        Ok(vec![Reply::text(format!("Removed alias for {alias}"))])
    }
}

pub struct ListAliases {
    pattern: Regex,
}

impl ListAliases {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^.*{bot}[:,]? (?:show|list) aliases")?,
        })
    }
}

impl Command for ListAliases {
    type Args = ();

    fn descriptor(&self) -> &'static CommandDescriptor {
        &LIST_ALIASES
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<()> {
        self.pattern.is_match(ctx.text()).then_some(())
    }

    fn execute(&self, ctx: &CommandContext<'_>, _args: ()) -> Result<Vec<Reply>> {
        let aliases = ctx.state.store().aliases()?;
        if aliases.is_empty() {
            return Ok(vec![Reply::text("There are no aliases.")]);
        }
        let mut listing = String::from("Current aliases are:");
        for alias in aliases {
            listing.push('\n');
            listing.push_str(&format!("{} -> {}", alias.old, alias.new));
        }
        Ok(vec![Reply::text(listing)])
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;
    use gambit_store::BotStore;

    #[test]
    fn functional_alias_lifecycle() {
        let harness = Harness::new();
        assert_eq!(
            harness.say("Brad Johns", "gambit: alias (big bird) bird"),
            ["Aliased big bird to bird"]
        );
        assert_eq!(
            harness.say("Brad Johns", "gambit: alias (BIG bird) elmo"),
            ["There's already an alias for BIG bird"]
        );
        assert_eq!(
            harness.say("Brad Johns", "gambit, list aliases"),
            ["Current aliases are:\nbig bird -> bird"]
        );
        assert_eq!(
            harness.say("Brad Johns", "gambit: remove alias (big bird)"),
            ["Removed alias for big bird"]
        );
        assert_eq!(
            harness.say("Brad Johns", "gambit: remove alias (big bird)"),
            ["There is no alias for that name."]
        );
    }

    #[test]
    fn regression_alias_rejected_for_name_with_karma() {
        let harness = Harness::new();
        harness.store.change_karma("poop", 3).expect("karma");
        assert_eq!(
            harness.say("Brad Johns", "gambit: alias poop dirt"),
            ["There's already karma for poop"]
        );
        assert!(harness.store.find_alias("poop").expect("alias").is_none());
    }

    #[test]
    fn unit_alias_allowed_when_karma_is_back_to_zero() {
        let harness = Harness::new();
        harness.store.change_karma("poop", 0).expect("karma");
        assert_eq!(
            harness.say("Brad Johns", "gambit: alias poop dirt"),
            ["Aliased poop to dirt"]
        );
    }
}
