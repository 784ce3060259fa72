//! Process-lifetime poll with owner-gated mutation and karma tie-breaks.

use gambit_types::Privilege;
use rand::Rng;
use std::collections::BTreeMap;

/// Option text that can never be added to a vote.
pub const INVALID_OPTION: &str = "invalid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOptionOutcome {
    Removed,
    NoPermission,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The actor may not end this vote; it stays active.
    NoPermission,
    NoWinner,
    Winner(String),
}

/// A single live vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    owner_privilege: Privilege,
    question: String,
    options: Vec<String>,
    mutable: bool,
    ballots: BTreeMap<String, String>,
}

impl Vote {
    pub fn new(owner_privilege: Privilege, question: impl Into<String>, mutable: bool) -> Self {
        Self {
            owner_privilege,
            question: question.into(),
            options: Vec::new(),
            mutable,
            ballots: BTreeMap::new(),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// Voter key to chosen option.
    pub fn ballots(&self) -> &BTreeMap<String, String> {
        &self.ballots
    }

    fn may_edit(&self, actor_privilege: Privilege) -> bool {
        self.mutable || actor_privilege.allows(self.owner_privilege)
    }

    fn find_option(&self, option: &str) -> Option<usize> {
        self.options
            .iter()
            .position(|existing| existing.eq_ignore_ascii_case(option.trim()))
    }

    /// Adds a lowercase option; true when the option is now present.
    pub fn add_option(&mut self, option: &str, actor_privilege: Privilege) -> bool {
        let option = option.trim().to_lowercase();
        if !self.may_edit(actor_privilege) || option.is_empty() || option == INVALID_OPTION {
            return false;
        }
        if self.find_option(&option).is_none() {
            self.options.push(option);
        }
        true
    }

    pub fn remove_option(&mut self, option: &str, actor_privilege: Privilege) -> RemoveOptionOutcome {
        if !self.may_edit(actor_privilege) {
            return RemoveOptionOutcome::NoPermission;
        }
        let Some(index) = self.find_option(option) else {
            return RemoveOptionOutcome::NotFound;
        };
        let removed = self.options.remove(index);
        self.ballots.retain(|_, choice| *choice != removed);
        RemoveOptionOutcome::Removed
    }

    /// Records `voter`'s choice, replacing any earlier ballot.
    pub fn cast(&mut self, voter: &str, option: &str) -> bool {
        let Some(index) = self.find_option(option) else {
            return false;
        };
        self.ballots
            .insert(voter.to_string(), self.options[index].clone());
        true
    }

    /// Tallies ballots without consuming the vote.
    ///
    /// Ties on count are broken by the summed karma of each option's voters,
    /// then uniformly at random among whatever remains tied.
    pub fn tally<R, E>(
        &self,
        actor_privilege: Privilege,
        mut karma_of: impl FnMut(&str) -> Result<i64, E>,
        rng: &mut R,
    ) -> Result<VoteOutcome, E>
    where
        R: Rng + ?Sized,
    {
        if !actor_privilege.allows(self.owner_privilege) {
            return Ok(VoteOutcome::NoPermission);
        }
        if self.ballots.is_empty() {
            return Ok(VoteOutcome::NoWinner);
        }

        let counts = self
            .options
            .iter()
            .map(|option| {
                let count = self.ballots.values().filter(|choice| *choice == option).count();
                (option.as_str(), count)
            })
            .collect::<Vec<_>>();
        let top_count = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);
        if top_count == 0 {
            return Ok(VoteOutcome::NoWinner);
        }
        let mut tied = counts
            .into_iter()
            .filter(|(_, count)| *count == top_count)
            .map(|(option, _)| option)
            .collect::<Vec<_>>();

        if tied.len() > 1 {
            let mut weighted = Vec::with_capacity(tied.len());
            for option in tied {
                let mut total = 0_i64;
                for (voter, choice) in &self.ballots {
                    if choice == option {
                        total = total.saturating_add(karma_of(voter)?);
                    }
                }
                weighted.push((option, total));
            }
            let top_karma = weighted.iter().map(|(_, total)| *total).max().unwrap_or(0);
            tied = weighted
                .into_iter()
                .filter(|(_, total)| *total == top_karma)
                .map(|(option, _)| option)
                .collect();
        }

        let winner = if tied.len() == 1 {
            tied[0]
        } else {
            tied[rng.gen_range(0..tied.len())]
        };
        Ok(VoteOutcome::Winner(winner.to_string()))
    }
}

/// Holder enforcing at most one live vote.
#[derive(Debug, Default)]
pub struct VoteBox {
    active: Option<Vote>,
}

impl VoteBox {
    /// Starts a vote; false when one is already active.
    pub fn start(&mut self, owner_privilege: Privilege, question: &str, mutable: bool) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.active = Some(Vote::new(owner_privilege, question.trim(), mutable));
        true
    }

    pub fn active(&self) -> Option<&Vote> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut Vote> {
        self.active.as_mut()
    }

    /// Ends the active vote. `Ok(None)` when no vote is running; a
    /// `NoPermission` outcome leaves the vote in place.
    pub fn end<R, E>(
        &mut self,
        actor_privilege: Privilege,
        karma_of: impl FnMut(&str) -> Result<i64, E>,
        rng: &mut R,
    ) -> Result<Option<VoteOutcome>, E>
    where
        R: Rng + ?Sized,
    {
        let Some(vote) = self.active.as_ref() else {
            return Ok(None);
        };
        let outcome = vote.tally(actor_privilege, karma_of, rng)?;
        if outcome != VoteOutcome::NoPermission {
            self.active = None;
        }
        Ok(Some(outcome))
    }
}
