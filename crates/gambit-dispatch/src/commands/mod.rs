//! Built-in chat commands.
//!
//! Registration order is observable: every matching command runs, in the
//! order listed by [`builtin_commands`], and help lists topics the same way.

pub mod alias;
pub mod exclaim;
pub mod help;
pub mod highlow;
pub mod karma;
pub mod privilege;
pub mod quotes;
pub mod user;
pub mod vote;

use crate::command::CommandList;
use anyhow::Result;

/// Every built-in command, in dispatch order, compiled for `bot_name`.
pub fn builtin_commands(bot_name: &str) -> Result<CommandList> {
    let commands: CommandList = vec![
        Box::new(alias::AddAlias::new(bot_name)?),
        Box::new(alias::RemoveAlias::new(bot_name)?),
        Box::new(alias::ListAliases::new(bot_name)?),
        Box::new(exclaim::SayHi::new(bot_name)?),
        Box::new(exclaim::SayUrl::new()?),
        Box::new(exclaim::Substitute::new()?),
        Box::new(exclaim::DadJoke::new(bot_name)?),
        Box::new(exclaim::ImageReaction::say_wat()?),
        Box::new(exclaim::ImageReaction::its_a_trap()?),
        Box::new(exclaim::ImageReaction::grails()?),
        Box::new(exclaim::ImageReaction::good_news()?),
        Box::new(exclaim::ImageReaction::spoiler_alert()?),
        Box::new(exclaim::CleaningLady::new()?),
        Box::new(exclaim::WotSwear),
        Box::new(help::Help::new(bot_name)?),
        Box::new(help::ListCommands::new(bot_name)?),
        Box::new(highlow::PlayHighLow::new(bot_name)?),
        Box::new(karma::ChangeKarma::new()?),
        Box::new(karma::GetKarma::new(bot_name)?),
        Box::new(karma::Spot::new(bot_name)?),
        Box::new(karma::ShowDebts::new(bot_name)?),
        Box::new(karma::TopKarma::new(bot_name)?),
        Box::new(karma::RandomKarma::new(bot_name)?),
        Box::new(karma::KarmaSwitch::enable(bot_name)?),
        Box::new(karma::KarmaSwitch::disable(bot_name)?),
        Box::new(privilege::SetUserPrivilege::new(bot_name)?),
        Box::new(privilege::GetUserPrivilege::new(bot_name)?),
        Box::new(privilege::SetCommandPrivilege::new(bot_name)?),
        Box::new(privilege::GetCommandPrivilege::new(bot_name)?),
        Box::new(quotes::CreateQuote::new(bot_name)?),
        Box::new(quotes::RandomQuote::new(bot_name)?),
        Box::new(user::AddNickname::new(bot_name)?),
        Box::new(user::ResolveUnknownUser::new(bot_name)?),
        Box::new(vote::StartVote::new(bot_name)?),
        Box::new(vote::AddVoteOption::new(bot_name)?),
        Box::new(vote::RemoveVoteOption::new(bot_name)?),
        Box::new(vote::CastVote::new(bot_name)?),
        Box::new(vote::EndVote::new(bot_name)?),
        Box::new(vote::ShowVoteOptions::new(bot_name)?),
        Box::new(vote::ShowVotes::new(bot_name)?),
        Box::new(vote::ShowVoteQuestion::new(bot_name)?),
    ];
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn unit_builtin_command_names_are_unique() {
        let commands = builtin_commands("gambit").expect("commands");
        let names = commands
            .iter()
            .map(|command| command.descriptor().name)
            .collect::<Vec<_>>();
        assert_eq!(names.len(), names.iter().collect::<HashSet<_>>().len());
        assert_eq!(names.first(), Some(&"AddAlias"));
        assert_eq!(names.last(), Some(&"ShowVoteQuestion"));
    }

    #[test]
    fn unit_builtin_commands_compile_for_names_with_metacharacters() {
        assert!(builtin_commands("g.bot+").is_ok());
    }
}
