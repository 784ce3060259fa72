//! Chat surface for the single live vote.

use crate::command::{bot_pattern, Command, CommandContext, CommandDescriptor, PrivilegePolicy};
use crate::vote::{RemoveOptionOutcome, VoteOutcome, INVALID_OPTION};
use anyhow::Result;
use gambit_types::Reply;
use regex::Regex;

static START_VOTE: CommandDescriptor =
    CommandDescriptor::new("StartVote", PrivilegePolicy::Registry).documented(
        "start vote",
        "Start Vote Command - example 'gambit: start vote what should we eat?' start a vote. \
         Say 'start open vote' to let anyone add or remove options. Only one vote runs at a time.",
        "gambit: start vote <question>, gambit: start open vote <question>",
    );

static ADD_VOTE_OPTION: CommandDescriptor =
    CommandDescriptor::new("AddVoteOption", PrivilegePolicy::Registry).documented(
        "add vote option",
        "Add Vote Option Command - example 'gambit: add vote option tacos' add an option to the \
         current vote.",
        "gambit: add vote option <option>",
    );

static REMOVE_VOTE_OPTION: CommandDescriptor =
    CommandDescriptor::new("RemoveVoteOption", PrivilegePolicy::Registry).documented(
        "remove vote option",
        "Remove Vote Option Command - example 'gambit: remove vote option tacos' remove an option \
         and every vote cast for it.",
        "gambit: remove vote option <option>",
    );

static CAST_VOTE: CommandDescriptor = CommandDescriptor::new("CastVote", PrivilegePolicy::Registry)
    .documented(
        "vote",
        "Vote Command - example 'gambit: vote for tacos' vote for an option. Voting again replaces \
         your earlier vote.",
        "gambit: vote for <option>",
    );

static END_VOTE: CommandDescriptor = CommandDescriptor::new("EndVote", PrivilegePolicy::Registry)
    .documented(
        "end vote",
        "End Vote Command - example 'gambit: end vote' close the vote and announce the winner. \
         Ties go to the option whose voters have the most karma.",
        "gambit: end vote",
    );

static SHOW_VOTE_OPTIONS: CommandDescriptor =
    CommandDescriptor::new("ShowVoteOptions", PrivilegePolicy::Registry).documented(
        "show vote options",
        "Show Vote Options Command - example 'gambit: show vote options' list the options of \
         the current vote.",
        "gambit: show vote options",
    );

static SHOW_VOTES: CommandDescriptor =
    CommandDescriptor::new("ShowVotes", PrivilegePolicy::Registry).documented(
        "show votes",
        "Show Votes Command - example 'gambit: show votes' list who voted for what.",
        "gambit: show votes",
    );

static SHOW_VOTE_QUESTION: CommandDescriptor =
    CommandDescriptor::new("ShowVoteQuestion", PrivilegePolicy::Registry).documented(
        "show vote question",
        "Show Vote Question Command - example 'gambit: show vote question' repeat the question \
         being voted on.",
        "gambit: show vote question",
    );

fn vote_active(ctx: &CommandContext<'_>) -> bool {
    ctx.state.with_votes(|votes| votes.active().is_some())
}

/// Captures the first group of `pattern` while a vote is running.
fn capture_during_vote(pattern: &Regex, ctx: &CommandContext<'_>) -> Option<String> {
    let captures = pattern.captures(ctx.text())?;
    let value = captures.get(1).map_or("", |m| m.as_str()).trim().to_string();
    vote_active(ctx).then_some(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRequest {
    pub question: String,
    pub open: bool,
}

pub struct StartVote {
    pattern: Regex,
}

impl StartVote {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^.*{bot}[:,]? start (open )?vote (.+)$")?,
        })
    }
}

impl Command for StartVote {
    type Args = VoteRequest;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &START_VOTE
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<VoteRequest> {
        let captures = self.pattern.captures(ctx.text())?;
        Some(VoteRequest {
            question: captures[2].trim().to_string(),
            open: captures.get(1).is_some(),
        })
    }

    fn execute(&self, ctx: &CommandContext<'_>, request: VoteRequest) -> Result<Vec<Reply>> {
        let started = ctx.state.with_votes(|votes| {
            votes.start(ctx.actor_privilege, &request.question, request.open)
        });
        if !started {
            return Ok(Vec::new());
        }
        tracing::info!(
            actor = ctx.actor(),
            open = request.open,
            owner_privilege = %ctx.actor_privilege,
            "vote started"
        );
        Ok(vec![Reply::text(format!("Vote Started: {}", request.question))])
    }
}

pub struct AddVoteOption {
    pattern: Regex,
}

impl AddVoteOption {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^{bot}[:,]? add (?:vote )?option (.+)$")?,
        })
    }
}

impl Command for AddVoteOption {
    type Args = String;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &ADD_VOTE_OPTION
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<String> {
        capture_during_vote(&self.pattern, ctx)
    }

    fn execute(&self, ctx: &CommandContext<'_>, option: String) -> Result<Vec<Reply>> {
        if option.eq_ignore_ascii_case(INVALID_OPTION) {
            return Ok(vec![Reply::text(format!(
                "{INVALID_OPTION} can't be a vote option."
            ))]);
        }
        let added = ctx.state.with_votes(|votes| {
            votes
                .active_mut()
                .map(|vote| vote.add_option(&option, ctx.actor_privilege))
        });
        Ok(match added {
            None => Vec::new(),
            Some(true) => vec![Reply::text(format!(
                "Added option: {}",
                option.to_lowercase()
            ))],
            Some(false) => vec![Reply::text("You don't have permission to add an option.")],
        })
    }
}

pub struct RemoveVoteOption {
    pattern: Regex,
}

impl RemoveVoteOption {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^{bot}[:,]? remove (?:vote )?option (.+)$")?,
        })
    }
}

impl Command for RemoveVoteOption {
    type Args = String;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &REMOVE_VOTE_OPTION
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<String> {
        capture_during_vote(&self.pattern, ctx)
    }

    fn execute(&self, ctx: &CommandContext<'_>, option: String) -> Result<Vec<Reply>> {
        let outcome = ctx.state.with_votes(|votes| {
            votes
                .active_mut()
                .map(|vote| vote.remove_option(&option, ctx.actor_privilege))
        });
        Ok(match outcome {
            None => Vec::new(),
            Some(RemoveOptionOutcome::Removed) => {
                vec![Reply::text(format!(
                    "Removed option: {option}, anyone who voted for it must vote again."
                ))]
            }
            Some(RemoveOptionOutcome::NoPermission) => {
                vec![Reply::text("You don't have permission to remove an option.")]
            }
            Some(RemoveOptionOutcome::NotFound) => {
                vec![Reply::text("Option does not exist.")]
            }
        })
    }
}

pub struct CastVote {
    pattern: Regex,
}

impl CastVote {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^{bot}[:,]? vote (?:for )?(.+)$")?,
        })
    }
}

impl Command for CastVote {
    type Args = String;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &CAST_VOTE
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<String> {
        capture_during_vote(&self.pattern, ctx)
    }

    fn execute(&self, ctx: &CommandContext<'_>, option: String) -> Result<Vec<Reply>> {
        let voter = ctx.state.resolver().resolve_to_nickname(ctx.actor())?;
        let cast = ctx
            .state
            .with_votes(|votes| votes.active_mut().map(|vote| vote.cast(&voter, &option)));
        Ok(match cast {
            None => Vec::new(),
            Some(true) => vec![Reply::text(format!(
                "{voter} voted for {}",
                option.to_lowercase()
            ))],
            Some(false) => vec![Reply::text("That's not an option!")],
        })
    }
}

pub struct EndVote {
    pattern: Regex,
}

impl EndVote {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^{bot}[:,]? end (?:the )?vote[.!?]?$")?,
        })
    }
}

impl Command for EndVote {
    type Args = ();

    fn descriptor(&self) -> &'static CommandDescriptor {
        &END_VOTE
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<()> {
        (self.pattern.is_match(ctx.text()) && vote_active(ctx)).then_some(())
    }

    fn execute(&self, ctx: &CommandContext<'_>, _: ()) -> Result<Vec<Reply>> {
        let store = ctx.state.store();
        let resolver = ctx.state.resolver();
        let outcome = ctx.state.with_votes(|votes| {
            ctx.state.with_rng(|rng| {
                votes.end(
                    ctx.actor_privilege,
                    |voter| store.karma_of(&resolver.resolve_alias(voter)?),
                    rng,
                )
            })
        })?;
        let reply = match outcome {
            None => return Ok(Vec::new()),
            Some(VoteOutcome::NoPermission) => "You don't have permission to end the vote".to_string(),
            Some(VoteOutcome::NoWinner) => "No one voted!?!? Lame, ending with no winner".to_string(),
            Some(VoteOutcome::Winner(winner)) => {
                tracing::info!(winner = %winner, "vote ended");
                format!("The votes are in! The winner is: {winner}")
            }
        };
        Ok(vec![Reply::text(reply)])
    }
}

pub struct ShowVoteOptions {
    pattern: Regex,
}

impl ShowVoteOptions {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^{bot}[:,]? (?:show|list) (?:vote )?options[.!?]?$")?,
        })
    }
}

impl Command for ShowVoteOptions {
    type Args = ();

    fn descriptor(&self) -> &'static CommandDescriptor {
        &SHOW_VOTE_OPTIONS
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<()> {
        (self.pattern.is_match(ctx.text()) && vote_active(ctx)).then_some(())
    }

    fn execute(&self, ctx: &CommandContext<'_>, _: ()) -> Result<Vec<Reply>> {
        let options = ctx
            .state
            .with_votes(|votes| votes.active().map(|vote| vote.options().join("\n")));
        Ok(match options {
            None => Vec::new(),
            Some(listing) if listing.is_empty() => vec![Reply::text("There are no options yet.")],
            Some(listing) => vec![Reply::text(listing)],
        })
    }
}

pub struct ShowVotes {
    pattern: Regex,
}

impl ShowVotes {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^{bot}[:,]? (?:show|list) votes[.!?]?$")?,
        })
    }
}

impl Command for ShowVotes {
    type Args = ();

    fn descriptor(&self) -> &'static CommandDescriptor {
        &SHOW_VOTES
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<()> {
        (self.pattern.is_match(ctx.text()) && vote_active(ctx)).then_some(())
    }

    fn execute(&self, ctx: &CommandContext<'_>, _: ()) -> Result<Vec<Reply>> {
        let ballots = ctx.state.with_votes(|votes| {
            votes.active().map(|vote| {
                vote.ballots()
                    .iter()
                    .map(|(voter, choice)| format!("{voter} voted for {choice}"))
                    .collect::<Vec<_>>()
            })
        });
        Ok(match ballots {
            None => Vec::new(),
            Some(lines) if lines.is_empty() => vec![Reply::text("No one has voted yet.")],
            Some(lines) => vec![Reply::text(lines.join("\n"))],
        })
    }
}

pub struct ShowVoteQuestion {
    pattern: Regex,
}

impl ShowVoteQuestion {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^{bot}[:,]? (?:show )?(?:vote )?question[.!?]?$")?,
        })
    }
}

impl Command for ShowVoteQuestion {
    type Args = ();

    fn descriptor(&self) -> &'static CommandDescriptor {
        &SHOW_VOTE_QUESTION
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<()> {
        (self.pattern.is_match(ctx.text()) && vote_active(ctx)).then_some(())
    }

    fn execute(&self, ctx: &CommandContext<'_>, _: ()) -> Result<Vec<Reply>> {
        let question = ctx
            .state
            .with_votes(|votes| votes.active().map(|vote| vote.question().to_string()));
        Ok(question.map(Reply::text).into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;
    use gambit_store::BotStore;

    #[test]
    fn functional_vote_commands_are_silent_without_a_vote() {
        let harness = Harness::new();
        for text in [
            "gambit: add vote option tacos",
            "gambit: vote tacos",
            "gambit: show votes",
            "gambit: show vote options",
            "gambit: end vote",
        ] {
            assert!(harness.say("Brad Johns", text).is_empty(), "{text}");
        }
    }

    #[test]
    fn functional_closed_vote_is_owned_by_its_starter() {
        let harness = Harness::new();
        harness.say("Brad Johns", "hello");
        harness
            .store
            .set_privilege("c-1", "Brad Johns", 2)
            .expect("privilege");

        assert_eq!(
            harness.say("Brad Johns", "ok gambit: start vote lunch?"),
            ["Vote Started: lunch?"]
        );
        assert!(harness.say("Sam Hill", "gambit: start vote dinner?").is_empty());
        assert_eq!(
            harness.say("Sam Hill", "gambit: add vote option tacos"),
            ["You don't have permission to add an option."]
        );
        assert_eq!(
            harness.say("Brad Johns", "gambit: add vote option Tacos"),
            ["Added option: tacos"]
        );
        assert_eq!(
            harness.say("Brad Johns", "gambit: add vote option invalid"),
            ["invalid can't be a vote option."]
        );
        assert_eq!(
            harness.say("Sam Hill", "gambit: end vote"),
            ["You don't have permission to end the vote"]
        );
        assert_eq!(
            harness.say("Sam Hill", "gambit: show vote question"),
            ["lunch?"]
        );
        assert_eq!(
            harness.say("Brad Johns", "gambit: end vote"),
            ["No one voted!?!? Lame, ending with no winner"]
        );
        assert!(harness.say("Brad Johns", "gambit: show vote question").is_empty());
    }

    #[test]
    fn functional_open_vote_tracks_ballots_and_removals() {
        let harness = Harness::new();
        harness.say("Brad Johns", "hello");
        harness
            .store
            .set_nickname("c-1", "Brad Johns", "brad")
            .expect("nick");

        assert_eq!(
            harness.say("Sam Hill", "gambit: start open vote food?"),
            ["Vote Started: food?"]
        );
        assert_eq!(
            harness.say("Brad Johns", "gambit: show vote options"),
            ["There are no options yet."]
        );
        harness.say("Brad Johns", "gambit: add vote option tacos");
        harness.say("Sam Hill", "gambit: add vote option pizza");
        assert_eq!(
            harness.say("Brad Johns", "gambit: show vote options"),
            ["tacos\npizza"]
        );
        assert_eq!(
            harness.say("Brad Johns", "gambit: vote sushi"),
            ["That's not an option!"]
        );
        assert_eq!(
            harness.say("Brad Johns", "gambit: vote for tacos"),
            ["brad voted for tacos"]
        );
        assert_eq!(
            harness.say("Sam Hill", "gambit: vote pizza"),
            ["Sam Hill voted for pizza"]
        );
        assert_eq!(
            harness.say("Sam Hill", "gambit: show votes"),
            ["Sam Hill voted for pizza\nbrad voted for tacos"]
        );
        assert_eq!(
            harness.say("Sam Hill", "gambit: remove vote option pizza"),
            ["Removed option: pizza, anyone who voted for it must vote again."]
        );
        assert_eq!(
            harness.say("Sam Hill", "gambit: remove vote option pizza"),
            ["Option does not exist."]
        );
        assert_eq!(
            harness.say("Sam Hill", "gambit: end vote"),
            ["The votes are in! The winner is: tacos"]
        );
    }

    #[test]
    fn functional_tied_vote_goes_to_richer_voters() {
        let harness = Harness::new();
        harness.seed_user("Alice Smith", "alice", 3);
        harness.seed_user("Bob Jones", "bob", 9);
        harness.store.insert_alias("bobby", "bob").expect("alias");
        harness
            .store
            .set_nickname("c-1", "Bob Jones", "bobby")
            .expect("nick");

        harness.say("Alice Smith", "gambit: start open vote pets?");
        harness.say("Alice Smith", "gambit: add option cats");
        harness.say("Alice Smith", "gambit: add option dogs");
        harness.say("Alice Smith", "gambit: vote cats");
        harness.say("Bob Jones", "gambit: vote dogs");
        assert_eq!(
            harness.say("Alice Smith", "gambit: end vote"),
            ["The votes are in! The winner is: dogs"]
        );
    }
}
