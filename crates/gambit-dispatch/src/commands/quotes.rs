//! Quote capture from recent messages and random recall.

use crate::command::{bot_pattern, Command, CommandContext, CommandDescriptor, PrivilegePolicy};
use anyhow::Result;
use chrono::Utc;
use gambit_types::{QuoteRecord, Reply};
use rand::seq::SliceRandom;
use regex::Regex;

static CREATE_QUOTE: CommandDescriptor =
    CommandDescriptor::new("CreateQuote", PrivilegePolicy::Registry).documented(
        "quote",
        "Quote Command - example 'gambit: quote brad' save the last thing someone said as a \
         quote.",
        "gambit: quote <person>",
    );

static RANDOM_QUOTE: CommandDescriptor =
    CommandDescriptor::new("RandomQuote", PrivilegePolicy::Registry).documented(
        "random quote",
        "Random Quote Command - example 'gambit: random quote' state a random saved quote. Name \
         someone to quote only them (example: 'gambit: random brad quote').",
        "gambit: random quote, gambit: random <person> quote",
    );

fn format_quote(quote: &QuoteRecord) -> String {
    format!(
        "\"{}\" - {}, {}",
        quote.quote,
        quote.said_by,
        quote.said_at.format("%B %Y")
    )
}

pub struct CreateQuote {
    pattern: Regex,
}

impl CreateQuote {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^(?:{bot}[:,]? )?quote (.+)$")?,
        })
    }
}

impl Command for CreateQuote {
    type Args = String;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &CREATE_QUOTE
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<String> {
        let captures = self.pattern.captures(ctx.text())?;
        Some(captures[1].trim().to_string())
    }

    fn execute(&self, ctx: &CommandContext<'_>, person: String) -> Result<Vec<Reply>> {
        let full_name = ctx.state.resolver().canonical_person(&person)?;
        let Some((speaker, text)) = ctx.state.last_message(&full_name) else {
            return Ok(vec![Reply::text("I don't know what they said.")]);
        };
        let quote = ctx.state.store().insert_quote(&text, &speaker, Utc::now())?;
        Ok(vec![Reply::text(format_quote(&quote))])
    }
}

pub struct RandomQuote {
    pattern: Regex,
}

impl RandomQuote {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^{bot}[:,]? (?:rand|random) (?:(\w+) )?quote")?,
        })
    }
}

impl Command for RandomQuote {
    /// Optional speaker filter.
    type Args = Option<String>;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &RANDOM_QUOTE
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<Option<String>> {
        let captures = self.pattern.captures(ctx.text())?;
        Some(captures.get(1).map(|person| person.as_str().to_string()))
    }

    fn execute(&self, ctx: &CommandContext<'_>, person: Option<String>) -> Result<Vec<Reply>> {
        let speaker = person
            .map(|person| ctx.state.resolver().canonical_person(&person))
            .transpose()?;
        let quotes = ctx.state.store().quotes(speaker.as_deref())?;
        let picked = ctx.state.with_rng(|rng| quotes.choose(rng).cloned());
        Ok(vec![Reply::text(match picked {
            Some(quote) => format_quote(&quote),
            None => "I couldn't find a quote!".to_string(),
        })])
    }
}
