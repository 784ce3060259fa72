//! High/low dice game staked with karma.

use crate::command::{bot_pattern, Command, CommandContext, CommandDescriptor, PrivilegePolicy};
use anyhow::Result;
use gambit_types::Reply;
use rand::Rng;
use regex::Regex;

static PLAY_HIGH_LOW: CommandDescriptor =
    CommandDescriptor::new("PlayHighLow", PrivilegePolicy::Registry).documented(
        "high-low",
        "High-Low Command - example: 'gambit: high-low 5 high' bet karma on the roll of two dice. \
         Call high to win on a total above seven, low to win on a total below seven, or seven to \
         win four times your bet on exactly seven. A losing call costs the bet.",
        "gambit: high-low <bet> <call>",
    );

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    High,
    Low,
    Seven,
}

impl Call {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "low" => Some(Self::Low),
            "7" | "seven" => Some(Self::Seven),
            _ => None,
        }
    }

    /// Karma delta for a dice total.
    pub fn payout(self, bet: i64, total: u32) -> i64 {
        let won = match self {
            Self::High => total > 7,
            Self::Low => total < 7,
            Self::Seven => total == 7,
        };
        match (self, won) {
            (Self::Seven, true) => bet.saturating_mul(4),
            (_, true) => bet,
            (_, false) => -bet,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wager {
    pub bet: i64,
    pub call: Call,
}

pub struct PlayHighLow {
    pattern: Regex,
}

impl PlayHighLow {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^.*{bot}[:,]? high(?:-| )low (\d+) (high|low|7|seven)")?,
        })
    }
}

impl Command for PlayHighLow {
    type Args = Wager;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &PLAY_HIGH_LOW
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<Wager> {
        let captures = self.pattern.captures(ctx.text())?;
        Some(Wager {
            bet: captures[1].parse().ok()?,
            call: Call::parse(&captures[2])?,
        })
    }

    fn execute(&self, ctx: &CommandContext<'_>, wager: Wager) -> Result<Vec<Reply>> {
        let store = ctx.state.store();
        let resolver = ctx.state.resolver();
        let player = resolver.resolve_alias(&resolver.resolve_to_nickname(ctx.actor())?)?;
        let karma = store.karma_of(&player)?;
        if karma == 0 {
            return Ok(vec![Reply::text("There's no karma for your linked name.")]);
        }
        if wager.bet > karma {
            return Ok(vec![Reply::text(
                "You can't bet more karma than you have!\nYou have a gambling addiction. Get help.",
            )]);
        }
        if wager.bet < 1 {
            return Ok(vec![Reply::text("Go big or go home. bet a natural number.")]);
        }

        let (first, second) = ctx
            .state
            .with_rng(|rng| (rng.gen_range(1..=6_u32), rng.gen_range(1..=6_u32)));
        let change = wager.call.payout(wager.bet, first + second);
        let total = store.change_karma(&player, change)?;
        ctx.state.recompute_honorifics(ctx.conversation_id())?;
        tracing::debug!(player = %player, change, total, "high-low settled");

        let name = resolver.honorific_display_name(ctx.actor(), ctx.conversation_id())?;
        let settlement = if change < 0 {
            format!("Took {} karma from {name}, total: {total}.", change.unsigned_abs())
        } else {
            format!("Gave {change} karma to {name}, total: {total}.")
        };
        Ok(vec![
            Reply::text(format!("Rolled {first} and {second}")),
            Reply::text(settlement),
        ])
    }
}
