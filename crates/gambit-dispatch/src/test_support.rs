use crate::dispatcher::Dispatcher;
use crate::rate_limit::Clock;
use crate::state::{BotConfig, TitleFetcher};
use chrono::{DateTime, Utc};
use gambit_core::name_key;
use gambit_store::{
    AliasRecord, BotStore, DebtRecord, InMemoryBotStore, JokeRecord, KarmaEntry, QuoteRecord,
    SpotSettlement, StoreError, StoreResult, Title, UserRecord,
};
use gambit_types::{InboundMessage, Reply, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

pub(crate) struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub(crate) fn starting_at(now_unix: u64) -> Self {
        Self {
            now: AtomicU64::new(now_unix),
        }
    }

    pub(crate) fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub(crate) struct FixedTitle(pub &'static str);

impl TitleFetcher for FixedTitle {
    fn fetch_title(&self, _url: &str) -> anyhow::Result<Option<String>> {
        Ok(Some(self.0.to_string()))
    }
}

/// Dispatcher over an in-memory store with a manual clock and seeded rng.
pub(crate) struct Harness {
    pub dispatcher: Dispatcher,
    pub store: Arc<InMemoryBotStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub const ADMIN: &'static str = "Admin User";

    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_title_fetcher(fetcher: impl TitleFetcher + 'static) -> Self {
        Self::build(Some(Arc::new(fetcher)))
    }

    pub fn config() -> BotConfig {
        BotConfig {
            bot_name: "gambit".to_string(),
            image_dir: PathBuf::from("/srv/gambit/images"),
            admins: vec![Self::ADMIN.to_string()],
            rng_seed: Some(42),
            ..BotConfig::default()
        }
    }

    fn build(title_fetcher: Option<Arc<dyn TitleFetcher>>) -> Self {
        let store = Arc::new(InMemoryBotStore::new());
        let clock = Arc::new(ManualClock::starting_at(1_700_000_000));
        let mut builder = Dispatcher::builder(store.clone())
            .config(Self::config())
            .clock(clock.clone());
        if let Some(fetcher) = title_fetcher {
            builder = builder.title_fetcher(fetcher);
        }
        Self {
            dispatcher: builder.build().expect("dispatcher"),
            store,
            clock,
        }
    }

    pub fn user_id(full_name: &str) -> String {
        format!("u-{}", name_key(full_name).replace(' ', "-"))
    }

    pub fn replies_in(&self, conversation_id: &str, full_name: &str, text: &str) -> Vec<Reply> {
        let sender = Sender::new(Self::user_id(full_name), full_name);
        self.dispatcher
            .dispatch(&InboundMessage::new(conversation_id, sender, text))
    }

    pub fn replies(&self, full_name: &str, text: &str) -> Vec<Reply> {
        self.replies_in("c-1", full_name, text)
    }

    pub fn say_in(&self, conversation_id: &str, full_name: &str, text: &str) -> Vec<String> {
        self.replies_in(conversation_id, full_name, text)
            .iter()
            .map(Reply::to_payload)
            .collect()
    }

    pub fn say(&self, full_name: &str, text: &str) -> Vec<String> {
        self.say_in("c-1", full_name, text)
    }

    /// Registers a user in `c-1` with a nickname holding `karma`.
    pub fn seed_user(&self, full_name: &str, nickname: &str, karma: i64) {
        self.store
            .insert_user(&Self::user_id(full_name), "c-1", full_name)
            .expect("insert user");
        self.store
            .set_nickname("c-1", full_name, nickname)
            .expect("nickname");
        if karma != 0 {
            self.store.change_karma(nickname, karma).expect("karma");
        }
    }
}

/// In-memory store whose `change_karma` starts failing after a fixed number
/// of successful calls.
pub(crate) struct FailingKarmaStore {
    pub inner: InMemoryBotStore,
    karma_changes_left: AtomicU32,
}

impl FailingKarmaStore {
    pub(crate) fn failing_after(successful_changes: u32) -> Self {
        Self {
            inner: InMemoryBotStore::new(),
            karma_changes_left: AtomicU32::new(successful_changes),
        }
    }
}

impl BotStore for FailingKarmaStore {
    fn find_user(&self, user_id: &str, conversation_id: &str) -> StoreResult<Option<UserRecord>> {
        self.inner.find_user(user_id, conversation_id)
    }

    fn find_user_by_name(
        &self,
        conversation_id: &str,
        full_name: &str,
    ) -> StoreResult<Option<UserRecord>> {
        self.inner.find_user_by_name(conversation_id, full_name)
    }

    fn insert_user(&self, user_id: &str, conversation_id: &str, full_name: &str) -> StoreResult<()> {
        self.inner.insert_user(user_id, conversation_id, full_name)
    }

    fn users_in_conversation(&self, conversation_id: &str) -> StoreResult<Vec<UserRecord>> {
        self.inner.users_in_conversation(conversation_id)
    }

    fn all_users(&self) -> StoreResult<Vec<UserRecord>> {
        self.inner.all_users()
    }

    fn set_nickname(
        &self,
        conversation_id: &str,
        full_name: &str,
        nickname: &str,
    ) -> StoreResult<bool> {
        self.inner.set_nickname(conversation_id, full_name, nickname)
    }

    fn set_privilege(
        &self,
        conversation_id: &str,
        full_name: &str,
        privilege: u32,
    ) -> StoreResult<bool> {
        self.inner.set_privilege(conversation_id, full_name, privilege)
    }

    fn clear_titles(&self) -> StoreResult<()> {
        self.inner.clear_titles()
    }

    fn set_title(&self, conversation_id: &str, full_name: &str, title: Title) -> StoreResult<()> {
        self.inner.set_title(conversation_id, full_name, title)
    }

    fn karma_entries(&self) -> StoreResult<Vec<KarmaEntry>> {
        self.inner.karma_entries()
    }

    fn find_karma(&self, target: &str) -> StoreResult<Option<KarmaEntry>> {
        self.inner.find_karma(target)
    }

    fn change_karma(&self, target: &str, delta: i64) -> StoreResult<i64> {
        let allowed = self
            .karma_changes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(StoreError::Io(std::io::Error::other("karma table is read-only")));
        }
        self.inner.change_karma(target, delta)
    }

    fn aliases(&self) -> StoreResult<Vec<AliasRecord>> {
        self.inner.aliases()
    }

    fn find_alias(&self, old: &str) -> StoreResult<Option<AliasRecord>> {
        self.inner.find_alias(old)
    }

    fn insert_alias(&self, old: &str, new: &str) -> StoreResult<()> {
        self.inner.insert_alias(old, new)
    }

    fn remove_alias(&self, old: &str) -> StoreResult<bool> {
        self.inner.remove_alias(old)
    }

    fn debts(&self) -> StoreResult<Vec<DebtRecord>> {
        self.inner.debts()
    }

    fn settle_spot(
        &self,
        lender: &str,
        lender_account: &str,
        borrower: &str,
        amount: i64,
    ) -> StoreResult<SpotSettlement> {
        self.inner.settle_spot(lender, lender_account, borrower, amount)
    }

    fn insert_quote(
        &self,
        quote: &str,
        said_by: &str,
        said_at: DateTime<Utc>,
    ) -> StoreResult<QuoteRecord> {
        self.inner.insert_quote(quote, said_by, said_at)
    }

    fn quotes(&self, said_by: Option<&str>) -> StoreResult<Vec<QuoteRecord>> {
        self.inner.quotes(said_by)
    }

    fn register_command(&self, name: &str) -> StoreResult<u32> {
        self.inner.register_command(name)
    }

    fn command_privilege(&self, name: &str) -> StoreResult<Option<u32>> {
        self.inner.command_privilege(name)
    }

    fn set_command_privilege(&self, name: &str, privilege: u32) -> StoreResult<bool> {
        self.inner.set_command_privilege(name, privilege)
    }

    fn jokes(&self, kind: &str) -> StoreResult<Vec<JokeRecord>> {
        self.inner.jokes(kind)
    }

    fn insert_joke(&self, kind: &str, joke: &str) -> StoreResult<()> {
        self.inner.insert_joke(kind, joke)
    }
}
