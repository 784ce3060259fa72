//! Rule-based chat command dispatcher.
//!
//! A [`Dispatcher`] receives one [`gambit_types::InboundMessage`] at a time,
//! resolves and registers the sender, then runs every command whose matcher
//! accepts the text and whose privilege requirement the sender meets.

pub mod command;
pub mod commands;
pub mod dispatcher;
pub mod honorifics;
pub mod identity;
pub mod rate_limit;
pub mod state;
pub mod vote;

#[cfg(test)]
mod test_support;

pub use command::{Command, CommandContext, CommandDescriptor, CommandList, PrivilegePolicy};
pub use commands::builtin_commands;
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use honorifics::{recompute_honorifics, TitleAssignment, DEFAULT_HONORIFIC_THRESHOLD};
pub use identity::IdentityResolver;
pub use rate_limit::{Clock, RateLimiter, SystemClock, BUCKET_CAPACITY, REFILL_INTERVAL_SECS};
pub use state::{BotConfig, BotState, TitleFetcher};
pub use vote::{Vote, VoteBox, VoteOutcome};
