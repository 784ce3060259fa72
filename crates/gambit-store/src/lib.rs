//! Persistent store abstractions and in-memory backend.
//!
//! The dispatcher treats storage as a synchronous, transactional relational
//! store over the `users`, `karma`, `aliases`, `debt`, `quotes`, `commands`
//! and `jokes` tables. Every mutating call commits before it returns, and all
//! name-like lookups are ASCII case-insensitive.

use chrono::{DateTime, Utc};
use gambit_core::names_match;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

mod sqlite;

pub use gambit_types::{
    AliasRecord, CommandPrivilegeRecord, DebtRecord, JokeRecord, KarmaEntry, QuoteRecord,
    SpotSettlement, Title, UserRecord,
};
pub use sqlite::SqliteBotStore;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid persisted value for '{field}': {value}")]
    InvalidPersistedValue { field: &'static str, value: String },
    #[error("store lock is poisoned")]
    Poisoned,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Chrono(#[from] chrono::ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Synchronous store contract used by the dispatcher and command handlers.
pub trait BotStore: Send + Sync {
    fn find_user(&self, user_id: &str, conversation_id: &str) -> StoreResult<Option<UserRecord>>;
    fn find_user_by_name(
        &self,
        conversation_id: &str,
        full_name: &str,
    ) -> StoreResult<Option<UserRecord>>;
    /// Inserts a user at privilege 0; an existing `(user_id, conversation_id)` row is kept.
    fn insert_user(&self, user_id: &str, conversation_id: &str, full_name: &str)
        -> StoreResult<()>;
    fn users_in_conversation(&self, conversation_id: &str) -> StoreResult<Vec<UserRecord>>;
    fn all_users(&self) -> StoreResult<Vec<UserRecord>>;
    fn set_nickname(
        &self,
        conversation_id: &str,
        full_name: &str,
        nickname: &str,
    ) -> StoreResult<bool>;
    fn set_privilege(
        &self,
        conversation_id: &str,
        full_name: &str,
        privilege: u32,
    ) -> StoreResult<bool>;
    /// Clears every title in every conversation.
    fn clear_titles(&self) -> StoreResult<()>;
    fn set_title(&self, conversation_id: &str, full_name: &str, title: Title) -> StoreResult<()>;

    fn karma_entries(&self) -> StoreResult<Vec<KarmaEntry>>;
    fn find_karma(&self, target: &str) -> StoreResult<Option<KarmaEntry>>;
    /// Applies `delta` to the target's karma, creating the row at 0 first, and
    /// returns the new total.
    fn change_karma(&self, target: &str, delta: i64) -> StoreResult<i64>;

    fn aliases(&self) -> StoreResult<Vec<AliasRecord>>;
    fn find_alias(&self, old: &str) -> StoreResult<Option<AliasRecord>>;
    fn insert_alias(&self, old: &str, new: &str) -> StoreResult<()>;
    fn remove_alias(&self, old: &str) -> StoreResult<bool>;

    fn debts(&self) -> StoreResult<Vec<DebtRecord>>;
    /// Moves `amount` karma from `lender_account` to `borrower`, paying down
    /// what `lender` owes `borrower` before recording a new loan. Debts and
    /// karma commit together or not at all; settled debts persist at zero.
    fn settle_spot(
        &self,
        lender: &str,
        lender_account: &str,
        borrower: &str,
        amount: i64,
    ) -> StoreResult<SpotSettlement>;

    fn insert_quote(
        &self,
        quote: &str,
        said_by: &str,
        said_at: DateTime<Utc>,
    ) -> StoreResult<QuoteRecord>;
    fn quotes(&self, said_by: Option<&str>) -> StoreResult<Vec<QuoteRecord>>;

    /// Ensures a command row exists (level 0 when new) and returns its stored level.
    fn register_command(&self, name: &str) -> StoreResult<u32>;
    fn command_privilege(&self, name: &str) -> StoreResult<Option<u32>>;
    fn set_command_privilege(&self, name: &str, privilege: u32) -> StoreResult<bool>;

    fn jokes(&self, kind: &str) -> StoreResult<Vec<JokeRecord>>;
    fn insert_joke(&self, kind: &str, joke: &str) -> StoreResult<()>;

    fn karma_of(&self, target: &str) -> StoreResult<i64> {
        Ok(self.find_karma(target)?.map_or(0, |entry| entry.karma))
    }
}

/// In-memory implementation for tests and local experimentation.
#[derive(Debug, Default)]
pub struct InMemoryBotStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    users: Vec<UserRecord>,
    karma: Vec<KarmaEntry>,
    aliases: Vec<AliasRecord>,
    debts: Vec<DebtRecord>,
    quotes: Vec<QuoteRecord>,
    commands: Vec<CommandPrivilegeRecord>,
    jokes: Vec<JokeRecord>,
}

impl InMemoryBotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreInner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreInner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl StoreInner {
    fn debt_amount(&self, lender: &str, borrower: &str) -> i64 {
        self.debts
            .iter()
            .find(|debt| names_match(&debt.lender, lender) && names_match(&debt.borrower, borrower))
            .map_or(0, |debt| debt.amount)
    }

    fn upsert_debt(&mut self, lender: &str, borrower: &str, amount: i64) {
        if let Some(debt) = self.debts.iter_mut().find(|debt| {
            names_match(&debt.lender, lender) && names_match(&debt.borrower, borrower)
        }) {
            debt.amount = amount;
            return;
        }
        self.debts.push(DebtRecord {
            lender: lender.to_string(),
            borrower: borrower.to_string(),
            amount,
        });
    }

    fn add_karma(&mut self, target: &str, delta: i64) -> i64 {
        if let Some(entry) = self
            .karma
            .iter_mut()
            .find(|entry| names_match(&entry.target, target))
        {
            entry.karma += delta;
            return entry.karma;
        }
        self.karma.push(KarmaEntry {
            target: target.to_string(),
            karma: delta,
        });
        delta
    }

    fn users_named_mut<'a>(
        &'a mut self,
        conversation_id: &'a str,
        full_name: &'a str,
    ) -> impl Iterator<Item = &'a mut UserRecord> + 'a {
        self.users.iter_mut().filter(move |user| {
            user.conversation_id == conversation_id && names_match(&user.full_name, full_name)
        })
    }
}

impl BotStore for InMemoryBotStore {
    fn find_user(&self, user_id: &str, conversation_id: &str) -> StoreResult<Option<UserRecord>> {
        let inner = self.read()?;
        Ok(inner
            .users
            .iter()
            .find(|user| user.user_id == user_id && user.conversation_id == conversation_id)
            .cloned())
    }

    fn find_user_by_name(
        &self,
        conversation_id: &str,
        full_name: &str,
    ) -> StoreResult<Option<UserRecord>> {
        let inner = self.read()?;
        Ok(inner
            .users
            .iter()
            .find(|user| {
                user.conversation_id == conversation_id && names_match(&user.full_name, full_name)
            })
            .cloned())
    }

    fn insert_user(
        &self,
        user_id: &str,
        conversation_id: &str,
        full_name: &str,
    ) -> StoreResult<()> {
        let mut inner = self.write()?;
        let exists = inner
            .users
            .iter()
            .any(|user| user.user_id == user_id && user.conversation_id == conversation_id);
        if !exists {
            inner
                .users
                .push(UserRecord::new(user_id, conversation_id, full_name));
        }
        Ok(())
    }

    fn users_in_conversation(&self, conversation_id: &str) -> StoreResult<Vec<UserRecord>> {
        let inner = self.read()?;
        Ok(inner
            .users
            .iter()
            .filter(|user| user.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    fn all_users(&self) -> StoreResult<Vec<UserRecord>> {
        Ok(self.read()?.users.clone())
    }

    fn set_nickname(
        &self,
        conversation_id: &str,
        full_name: &str,
        nickname: &str,
    ) -> StoreResult<bool> {
        let mut inner = self.write()?;
        let mut updated = false;
        for user in inner.users_named_mut(conversation_id, full_name) {
            user.nickname = Some(nickname.to_string());
            updated = true;
        }
        Ok(updated)
    }

    fn set_privilege(
        &self,
        conversation_id: &str,
        full_name: &str,
        privilege: u32,
    ) -> StoreResult<bool> {
        let mut inner = self.write()?;
        let mut updated = false;
        for user in inner.users_named_mut(conversation_id, full_name) {
            user.privilege = privilege;
            updated = true;
        }
        Ok(updated)
    }

    fn clear_titles(&self) -> StoreResult<()> {
        let mut inner = self.write()?;
        for user in &mut inner.users {
            user.title = None;
        }
        Ok(())
    }

    fn set_title(&self, conversation_id: &str, full_name: &str, title: Title) -> StoreResult<()> {
        let mut inner = self.write()?;
        for user in inner.users_named_mut(conversation_id, full_name) {
            user.title = Some(title);
        }
        Ok(())
    }

    fn karma_entries(&self) -> StoreResult<Vec<KarmaEntry>> {
        Ok(self.read()?.karma.clone())
    }

    fn find_karma(&self, target: &str) -> StoreResult<Option<KarmaEntry>> {
        let inner = self.read()?;
        Ok(inner
            .karma
            .iter()
            .find(|entry| names_match(&entry.target, target))
            .cloned())
    }

    fn change_karma(&self, target: &str, delta: i64) -> StoreResult<i64> {
        Ok(self.write()?.add_karma(target, delta))
    }

    fn aliases(&self) -> StoreResult<Vec<AliasRecord>> {
        Ok(self.read()?.aliases.clone())
    }

    fn find_alias(&self, old: &str) -> StoreResult<Option<AliasRecord>> {
        let inner = self.read()?;
        Ok(inner
            .aliases
            .iter()
            .find(|alias| names_match(&alias.old, old))
            .cloned())
    }

    fn insert_alias(&self, old: &str, new: &str) -> StoreResult<()> {
        let mut inner = self.write()?;
        inner.aliases.retain(|alias| !names_match(&alias.old, old));
        inner.aliases.push(AliasRecord {
            old: old.to_string(),
            new: new.to_string(),
        });
        Ok(())
    }

    fn remove_alias(&self, old: &str) -> StoreResult<bool> {
        let mut inner = self.write()?;
        let before = inner.aliases.len();
        inner.aliases.retain(|alias| !names_match(&alias.old, old));
        Ok(inner.aliases.len() != before)
    }

    fn debts(&self) -> StoreResult<Vec<DebtRecord>> {
        Ok(self.read()?.debts.clone())
    }

    fn settle_spot(
        &self,
        lender: &str,
        lender_account: &str,
        borrower: &str,
        amount: i64,
    ) -> StoreResult<SpotSettlement> {
        let mut inner = self.write()?;
        let settlement = SpotSettlement::compute(
            amount,
            inner.debt_amount(borrower, lender),
            inner.debt_amount(lender, borrower),
        );
        if settlement.repaid > 0 {
            inner.upsert_debt(borrower, lender, settlement.still_owed);
        }
        inner.upsert_debt(lender, borrower, settlement.receivable);
        inner.add_karma(lender_account, -amount);
        inner.add_karma(borrower, amount);
        Ok(settlement)
    }

    fn insert_quote(
        &self,
        quote: &str,
        said_by: &str,
        said_at: DateTime<Utc>,
    ) -> StoreResult<QuoteRecord> {
        let record = QuoteRecord {
            quote: quote.to_string(),
            said_by: said_by.to_string(),
            said_at,
        };
        self.write()?.quotes.push(record.clone());
        Ok(record)
    }

    fn quotes(&self, said_by: Option<&str>) -> StoreResult<Vec<QuoteRecord>> {
        let inner = self.read()?;
        Ok(inner
            .quotes
            .iter()
            .filter(|quote| said_by.map_or(true, |name| names_match(&quote.said_by, name)))
            .cloned()
            .collect())
    }

    fn register_command(&self, name: &str) -> StoreResult<u32> {
        let mut inner = self.write()?;
        if let Some(command) = inner.commands.iter().find(|command| command.name == name) {
            return Ok(command.privilege);
        }
        inner.commands.push(CommandPrivilegeRecord {
            name: name.to_string(),
            privilege: 0,
        });
        Ok(0)
    }

    fn command_privilege(&self, name: &str) -> StoreResult<Option<u32>> {
        let inner = self.read()?;
        Ok(inner
            .commands
            .iter()
            .find(|command| command.name == name)
            .map(|command| command.privilege))
    }

    fn set_command_privilege(&self, name: &str, privilege: u32) -> StoreResult<bool> {
        let mut inner = self.write()?;
        match inner.commands.iter_mut().find(|command| command.name == name) {
            Some(command) => {
                command.privilege = privilege;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn jokes(&self, kind: &str) -> StoreResult<Vec<JokeRecord>> {
        let inner = self.read()?;
        Ok(inner
            .jokes
            .iter()
            .filter(|joke| names_match(&joke.kind, kind))
            .cloned()
            .collect())
    }

    fn insert_joke(&self, kind: &str, joke: &str) -> StoreResult<()> {
        self.write()?.jokes.push(JokeRecord {
            kind: kind.to_string(),
            joke: joke.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BotStore, InMemoryBotStore};
    use crate::Title;
    use chrono::Utc;

    #[test]
    fn unit_creates_karma_lazily_and_matches_case_insensitively() {
        let store = InMemoryBotStore::new();
        assert_eq!(store.karma_of("poop").expect("karma"), 0);
        assert_eq!(store.change_karma("Poop", 1).expect("inc"), 1);
        assert_eq!(store.change_karma("POOP", 1).expect("inc"), 2);

        let entries = store.karma_entries().expect("entries");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, "Poop");
    }

    #[test]
    fn unit_insert_user_keeps_existing_identity() {
        let store = InMemoryBotStore::new();
        store.insert_user("u-1", "c-1", "Brad Johns").expect("insert");
        store.insert_user("u-1", "c-1", "Someone Else").expect("insert");
        let user = store.find_user("u-1", "c-1").expect("find").expect("user");
        assert_eq!(user.full_name, "Brad Johns");
        assert_eq!(user.privilege, 0);
    }

    #[test]
    fn functional_clear_titles_resets_every_conversation() {
        let store = InMemoryBotStore::new();
        store.insert_user("u-1", "c-1", "Alice A").expect("insert");
        store.insert_user("u-1", "c-2", "Alice A").expect("insert");
        store.set_title("c-1", "alice a", Title::King).expect("title");
        store.set_title("c-2", "Alice A", Title::Lord).expect("title");

        store.clear_titles().expect("clear");
        let users = store.all_users().expect("users");
        assert!(users.iter().all(|user| user.title.is_none()));
    }

    fn owed(store: &InMemoryBotStore, lender: &str, borrower: &str) -> Option<i64> {
        store
            .debts()
            .expect("debts")
            .into_iter()
            .find(|debt| {
                debt.lender.eq_ignore_ascii_case(lender) && debt.borrower.eq_ignore_ascii_case(borrower)
            })
            .map(|debt| debt.amount)
    }

    #[test]
    fn unit_debts_persist_at_zero() {
        let store = InMemoryBotStore::new();
        store.settle_spot("alice", "alice", "bob", 10).expect("lend");
        store.settle_spot("Bob", "bob", "Alice", 10).expect("repay");
        assert_eq!(owed(&store, "alice", "bob"), Some(0));
        assert_eq!(owed(&store, "bob", "alice"), Some(0));
        assert_eq!(store.debts().expect("debts").len(), 2);
    }

    #[test]
    fn functional_registers_commands_once_and_updates_levels() {
        let store = InMemoryBotStore::new();
        assert_eq!(store.register_command("Spot").expect("register"), 0);
        assert!(store.set_command_privilege("Spot", 7).expect("set"));
        assert_eq!(store.register_command("Spot").expect("register"), 7);
        assert_eq!(store.command_privilege("Spot").expect("level"), Some(7));
        assert!(!store.set_command_privilege("Missing", 1).expect("set"));
        assert_eq!(store.command_privilege("Missing").expect("level"), None);
    }

    #[test]
    fn unit_filters_quotes_by_speaker() {
        let store = InMemoryBotStore::new();
        store
            .insert_quote("hello", "Brad Johns", Utc::now())
            .expect("quote");
        store.insert_quote("bye", "Alice A", Utc::now()).expect("quote");
        assert_eq!(store.quotes(None).expect("all").len(), 2);
        let brad = store.quotes(Some("brad johns")).expect("brad");
        assert_eq!(brad.len(), 1);
        assert_eq!(brad[0].quote, "hello");
    }

    #[test]
    fn unit_aliases_replace_and_remove_case_insensitively() {
        let store = InMemoryBotStore::new();
        store.insert_alias("Black", "white").expect("alias");
        assert_eq!(
            store.find_alias("black").expect("find").map(|alias| alias.new),
            Some("white".to_string())
        );
        assert!(store.remove_alias("BLACK").expect("remove"));
        assert!(!store.remove_alias("black").expect("remove"));
    }

    #[test]
    fn functional_settle_spot_repays_then_lends_in_one_step() {
        let store = InMemoryBotStore::new();
        store.change_karma("alice", 20).expect("karma");
        store.change_karma("bob", 10).expect("karma");
        store.settle_spot("Bob", "bob", "Alice", 5).expect("seed loan");

        let settlement = store
            .settle_spot("alice", "alice", "bob", 8)
            .expect("settle");
        assert_eq!(settlement.repaid, 5);
        assert_eq!(settlement.lent, 3);
        assert_eq!(owed(&store, "bob", "alice"), Some(0));
        assert_eq!(owed(&store, "alice", "bob"), Some(3));
        assert_eq!(store.karma_of("alice").expect("karma"), 17);
        assert_eq!(store.karma_of("bob").expect("karma"), 13);
    }
}
