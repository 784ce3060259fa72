//! Karma scoring, lending, and the per-conversation karma switch.

use crate::command::{
    bot_pattern, Command, CommandContext, CommandDescriptor, PrivilegePolicy, TARGET,
};
use anyhow::Result;
use gambit_core::{names_match, strip_target_parens};
use gambit_types::Reply;
use rand::seq::SliceRandom;
use regex::Regex;

const THROTTLED: &str = "Be cool! Stop spamming me with karma.";

static CHANGE_KARMA: CommandDescriptor =
    CommandDescriptor::new("ChangeKarma", PrivilegePolicy::Registry).documented(
        "change karma",
        "Change Karma Command - example 'poop++' give an entity karma with <entity>++ or take it \
         away with <entity>--. Check an entity's karma with 'karma <entity>'. Wrap names of \
         several words in parentheses (example '(more poop)++'). Be careful, karma changes are \
         limited.",
        "<target>++, <target>--, (<multiword target>)++, (<multiword target>)--",
    );

static GET_KARMA: CommandDescriptor = CommandDescriptor::new("GetKarma", PrivilegePolicy::Registry)
    .documented(
        "get karma",
        "Get Karma Command - example 'karma poop' state the karma of an entity after resolving \
         its aliases.",
        "karma <target>, karma (<multiword target>)",
    );

static SPOT: CommandDescriptor = CommandDescriptor::new("Spot", PrivilegePolicy::Registry)
    .documented(
        "spot",
        "Spot Command - example: 'gambit: spot Goofy 1' lend some karma to another user. The \
         karma is taken from your total and added to the borrower, and the debt is tracked and \
         can be viewed with the 'show debts' command.",
        "gambit: spot <borrower> <amount>",
    );

static SHOW_DEBTS: CommandDescriptor = CommandDescriptor::new("ShowDebts", PrivilegePolicy::Registry)
    .documented(
        "show debts",
        "Show Debts Command - example 'gambit: show debts' list every outstanding karma debt.",
        "gambit: show debts",
    );

static TOP_KARMA: CommandDescriptor = CommandDescriptor::new("TopKarma", PrivilegePolicy::Registry)
    .documented(
        "top karma",
        "Top Karma Command - example 'gambit: top karma' state which entity has the most karma.",
        "gambit: top karma",
    );

static RANDOM_KARMA: CommandDescriptor =
    CommandDescriptor::new("RandomKarma", PrivilegePolicy::Registry).documented(
        "random karma",
        "Random Karma Command - example 'gambit: random karma' state a randomly selected karma \
         value.",
        "gambit: random karma",
    );

static ENABLE_KARMA: CommandDescriptor =
    CommandDescriptor::new("EnableKarma", PrivilegePolicy::AdminOnly);
static DISABLE_KARMA: CommandDescriptor =
    CommandDescriptor::new("DisableKarma", PrivilegePolicy::AdminOnly);

/// Display form of a karma target: honorific name for known nicknames.
fn target_display(ctx: &CommandContext<'_>, target: &str) -> Result<String> {
    let resolver = ctx.state.resolver();
    if !resolver.is_known_nickname(target)? {
        return Ok(target.to_string());
    }
    let full_name = resolver.resolve_to_full_name(target)?;
    Ok(resolver.honorific_display_name(&full_name, ctx.conversation_id())?)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KarmaChanges {
    pub increments: Vec<String>,
    pub decrements: Vec<String>,
}

pub struct ChangeKarma {
    pattern: Regex,
}

impl ChangeKarma {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(r"\(((?:\w+ )*\w+)\)(\+\+|--)|(\w+)(\+\+|--)")?,
        })
    }

    fn apply(&self, ctx: &CommandContext<'_>, target: &str, delta: i64) -> Result<Reply> {
        if !ctx.state.try_consume_karma_token(ctx.actor()) {
            tracing::debug!(actor = ctx.actor(), "karma change throttled");
            return Ok(Reply::text(THROTTLED));
        }
        let total = ctx.state.store().change_karma(target, delta)?;
        ctx.state.recompute_honorifics(ctx.conversation_id())?;
        let name = target_display(ctx, target)?;
        Ok(Reply::text(if delta > 0 {
            format!("Gave karma to {name}, total: {total}")
        } else {
            format!("Took karma from {name}, total: {total}")
        }))
    }
}

impl Command for ChangeKarma {
    type Args = KarmaChanges;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &CHANGE_KARMA
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<KarmaChanges> {
        if !ctx.state.karma_enabled(ctx.conversation_id()) {
            return None;
        }
        let mut changes = KarmaChanges::default();
        for captures in self.pattern.captures_iter(ctx.text()) {
            let (Some(target), Some(op)) = (
                captures.get(1).or_else(|| captures.get(3)),
                captures.get(2).or_else(|| captures.get(4)),
            ) else {
                continue;
            };
            let target = target.as_str().to_string();
            if op.as_str() == "++" {
                changes.increments.push(target);
            } else {
                changes.decrements.push(target);
            }
        }
        if changes.increments.is_empty() && changes.decrements.is_empty() {
            return None;
        }
        Some(changes)
    }

    fn execute(&self, ctx: &CommandContext<'_>, changes: KarmaChanges) -> Result<Vec<Reply>> {
        let resolver = ctx.state.resolver();
        let mut increments = Vec::new();
        let mut decrements = Vec::new();
        for raw in changes.increments {
            let target = resolver.resolve_alias(&raw)?;
            if names_match(&resolver.resolve_to_full_name(&target)?, ctx.actor()) {
                decrements.push(target);
            } else {
                increments.push(target);
            }
        }
        for raw in changes.decrements {
            decrements.push(resolver.resolve_alias(&raw)?);
        }

        // A failed change must not drop replies for changes already committed.
        let mut replies = Vec::with_capacity(increments.len() + decrements.len());
        let changes = increments
            .iter()
            .map(|target| (target, 1))
            .chain(decrements.iter().map(|target| (target, -1)));
        for (target, delta) in changes {
            match self.apply(ctx, target, delta) {
                Ok(reply) => replies.push(reply),
                Err(error) => tracing::warn!(
                    karma_target = %target,
                    delta,
                    error = %format!("{error:#}"),
                    "karma change failed"
                ),
            }
        }
        Ok(replies)
    }
}

pub struct GetKarma {
    pattern: Regex,
}

impl GetKarma {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, &format!(r"^(?:{{bot}}[:,]? )?karma {TARGET}$"))?,
        })
    }
}

impl Command for GetKarma {
    type Args = String;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &GET_KARMA
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<String> {
        if !ctx.state.karma_enabled(ctx.conversation_id()) {
            return None;
        }
        let captures = self.pattern.captures(ctx.text())?;
        Some(strip_target_parens(&captures[1]))
    }

    fn execute(&self, ctx: &CommandContext<'_>, target: String) -> Result<Vec<Reply>> {
        let target = ctx.state.resolver().resolve_alias(&target)?;
        let karma = ctx.state.store().karma_of(&target)?;
        Ok(vec![Reply::text(format!("Karma for {target}: {karma}."))])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    pub borrower: String,
    pub amount: i64,
}

pub struct Spot {
    pattern: Regex,
}

impl Spot {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^.*{bot}[:,]? spot (\w+) (\d+)")?,
        })
    }
}

impl Command for Spot {
    type Args = Loan;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &SPOT
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<Loan> {
        if !ctx.state.karma_enabled(ctx.conversation_id()) {
            return None;
        }
        let captures = self.pattern.captures(ctx.text())?;
        Some(Loan {
            borrower: captures[1].to_string(),
            amount: captures[2].parse().ok()?,
        })
    }

    fn execute(&self, ctx: &CommandContext<'_>, loan: Loan) -> Result<Vec<Reply>> {
        let store = ctx.state.store();
        let resolver = ctx.state.resolver();
        let lender = resolver.resolve_to_nickname(ctx.actor())?;
        let borrower = resolver.resolve_alias(&loan.borrower)?;
        let lender_account = resolver.resolve_alias(&lender)?;
        let amount = loan.amount;

        if amount < 1 {
            return Ok(vec![Reply::text("You have to lend at least 1 karma.")]);
        }
        if amount > store.karma_of(&lender_account)? {
            return Ok(vec![Reply::text(
                "You're a bit too generous, friend. Don't lend what you don't have.",
            )]);
        }
        if ctx.state.is_bot_name(&borrower) {
            return Ok(vec![Reply::text("I don't need your charity!")]);
        }
        if !resolver.is_known_nickname(&borrower)? {
            return Ok(vec![Reply::text("You can only lend to another user")]);
        }
        if names_match(&borrower, &lender) || names_match(&borrower, &lender_account) {
            return Ok(vec![Reply::text("You can't lend karma to yourself.")]);
        }

        let settlement = store.settle_spot(&lender, &lender_account, &borrower, amount)?;
        ctx.state.recompute_honorifics(ctx.conversation_id())?;
        tracing::debug!(
            lender = %lender,
            borrower = %borrower,
            amount,
            repaid = settlement.repaid,
            "karma spotted"
        );

        let borrower_name = resolver.honorific_display_name(
            &resolver.resolve_to_full_name(&borrower)?,
            ctx.conversation_id(),
        )?;
        let reply = if settlement.lent == 0 {
            format!(
                "Gave {amount} karma to {borrower_name}. You now owe them {} karma",
                settlement.still_owed
            )
        } else {
            format!(
                "Spotted {borrower_name} {amount} karma, they now owe you {}",
                settlement.receivable
            )
        };
        Ok(vec![Reply::text(reply)])
    }
}

pub struct ShowDebts {
    pattern: Regex,
}

impl ShowDebts {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^.*{bot}[:,]? (?:show|list) debts")?,
        })
    }
}

impl Command for ShowDebts {
    type Args = ();

    fn descriptor(&self) -> &'static CommandDescriptor {
        &SHOW_DEBTS
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<()> {
        (ctx.state.karma_enabled(ctx.conversation_id()) && self.pattern.is_match(ctx.text()))
            .then_some(())
    }

    fn execute(&self, ctx: &CommandContext<'_>, _args: ()) -> Result<Vec<Reply>> {
        let replies = ctx
            .state
            .store()
            .debts()?
            .into_iter()
            .filter(|debt| debt.amount > 0)
            .map(|debt| {
                Reply::text(format!(
                    "{} owes {} {} karma.",
                    debt.borrower, debt.lender, debt.amount
                ))
            })
            .collect::<Vec<_>>();
        if replies.is_empty() {
            return Ok(vec![Reply::text("Nobody owes anybody anything.")]);
        }
        Ok(replies)
    }
}

pub struct TopKarma {
    pattern: Regex,
}

impl TopKarma {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^.*{bot}[:,]? (?:top|highest) karma")?,
        })
    }
}

impl Command for TopKarma {
    type Args = ();

    fn descriptor(&self) -> &'static CommandDescriptor {
        &TOP_KARMA
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<()> {
        (ctx.state.karma_enabled(ctx.conversation_id()) && self.pattern.is_match(ctx.text()))
            .then_some(())
    }

    fn execute(&self, ctx: &CommandContext<'_>, _args: ()) -> Result<Vec<Reply>> {
        let mut best: Option<(String, i64)> = None;
        for entry in ctx.state.store().karma_entries()? {
            if best.as_ref().map_or(true, |(_, karma)| entry.karma > *karma) {
                best = Some((entry.target, entry.karma));
            }
        }
        let reply = match best {
            Some((target, karma)) => {
                format!("The current best thing ever is {target} with {karma} karma")
            }
            None => "Nothing has any karma yet.".to_string(),
        };
        Ok(vec![Reply::text(reply)])
    }
}

pub struct RandomKarma {
    pattern: Regex,
}

impl RandomKarma {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^.*{bot}[:,]? random karma")?,
        })
    }
}

impl Command for RandomKarma {
    type Args = ();

    fn descriptor(&self) -> &'static CommandDescriptor {
        &RANDOM_KARMA
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<()> {
        (ctx.state.karma_enabled(ctx.conversation_id()) && self.pattern.is_match(ctx.text()))
            .then_some(())
    }

    fn execute(&self, ctx: &CommandContext<'_>, _args: ()) -> Result<Vec<Reply>> {
        let entries = ctx.state.store().karma_entries()?;
        let picked = ctx.state.with_rng(|rng| entries.choose(rng).cloned());
        let reply = match picked {
            Some(entry) => format!("Karma for {} is {}", entry.target, entry.karma),
            None => "Nothing has any karma yet.".to_string(),
        };
        Ok(vec![Reply::text(reply)])
    }
}

/// Admin switch for karma commands in the current conversation.
pub struct KarmaSwitch {
    descriptor: &'static CommandDescriptor,
    pattern: Regex,
    enable: bool,
}

impl KarmaSwitch {
    pub fn enable(bot_name: &str) -> Result<Self> {
        Ok(Self {
            descriptor: &ENABLE_KARMA,
            pattern: bot_pattern(bot_name, r"^{bot}[:,]? yes\s?karma.?$")?,
            enable: true,
        })
    }

    pub fn disable(bot_name: &str) -> Result<Self> {
        Ok(Self {
            descriptor: &DISABLE_KARMA,
            pattern: bot_pattern(bot_name, r"^{bot}[:,]? no\s?karma.?$")?,
            enable: false,
        })
    }
}

impl Command for KarmaSwitch {
    type Args = ();

    fn descriptor(&self) -> &'static CommandDescriptor {
        self.descriptor
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<()> {
        self.pattern.is_match(ctx.text()).then_some(())
    }

    fn execute(&self, ctx: &CommandContext<'_>, _args: ()) -> Result<Vec<Reply>> {
        if !ctx
            .state
            .set_karma_enabled(ctx.conversation_id(), self.enable)
        {
            return Ok(Vec::new());
        }
        tracing::info!(
            conversation_id = ctx.conversation_id(),
            enabled = self.enable,
            "karma switch flipped"
        );
        let reply = if self.enable {
            "Enabling karma..."
        } else {
            "Disabling karma..."
        };
        Ok(vec![Reply::text(reply)])
    }
}
