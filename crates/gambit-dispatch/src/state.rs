//! Shared runtime state owned by the dispatcher and lent to handlers.

use crate::command::{CommandDescriptor, PrivilegePolicy};
use crate::honorifics::{recompute_honorifics, TitleAssignment, DEFAULT_HONORIFIC_THRESHOLD};
use crate::identity::IdentityResolver;
use crate::rate_limit::{Clock, RateLimiter};
use crate::vote::VoteBox;
use gambit_core::{name_key, names_match};
use gambit_store::{BotStore, StoreResult};
use gambit_types::{Privilege, Sender};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Looks up the `<title>` of a web page for the URL responder.
pub trait TitleFetcher: Send + Sync {
    fn fetch_title(&self, url: &str) -> anyhow::Result<Option<String>>;
}

/// Static configuration handed to the core by the process shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub bot_name: String,
    pub image_dir: PathBuf,
    pub honorific_threshold: i64,
    /// Full names granted unrestricted privilege regardless of stored level.
    pub admins: Vec<String>,
    /// Fixed seed for dice, greetings, and tie-breaks; entropy when `None`.
    pub rng_seed: Option<u64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_name: "gambit".to_string(),
            image_dir: PathBuf::from(".gambit/images"),
            honorific_threshold: DEFAULT_HONORIFIC_THRESHOLD,
            admins: Vec::new(),
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LastMessage {
    full_name: String,
    text: String,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct BotState {
    store: Arc<dyn BotStore>,
    config: BotConfig,
    admins: HashSet<String>,
    clock: Arc<dyn Clock>,
    title_fetcher: Option<Arc<dyn TitleFetcher>>,
    rate_limiter: Mutex<RateLimiter>,
    votes: Mutex<VoteBox>,
    rng: Mutex<StdRng>,
    command_privileges: Mutex<HashMap<String, Privilege>>,
    last_messages: Mutex<HashMap<String, LastMessage>>,
    // conversation -> lowercased full name -> platform id
    known_ids: Mutex<HashMap<String, HashMap<String, String>>>,
    karma_disabled: Mutex<HashSet<String>>,
}

impl fmt::Debug for BotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotState")
            .field("config", &self.config)
            .field("title_fetcher", &self.title_fetcher.is_some())
            .finish_non_exhaustive()
    }
}

impl BotState {
    pub(crate) fn new(
        store: Arc<dyn BotStore>,
        config: BotConfig,
        clock: Arc<dyn Clock>,
        title_fetcher: Option<Arc<dyn TitleFetcher>>,
    ) -> Self {
        let admins = config.admins.iter().map(|admin| name_key(admin)).collect();
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            store,
            config,
            admins,
            clock,
            title_fetcher,
            rate_limiter: Mutex::new(RateLimiter::new()),
            votes: Mutex::new(VoteBox::default()),
            rng: Mutex::new(rng),
            command_privileges: Mutex::new(HashMap::new()),
            last_messages: Mutex::new(HashMap::new()),
            known_ids: Mutex::new(HashMap::new()),
            karma_disabled: Mutex::new(HashSet::new()),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_system_clock(store: Arc<dyn BotStore>, config: BotConfig) -> Self {
        Self::new(store, config, Arc::new(crate::rate_limit::SystemClock), None)
    }

    pub fn store(&self) -> &dyn BotStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn resolver(&self) -> IdentityResolver<'_> {
        IdentityResolver::new(self.store.as_ref())
    }

    pub fn is_admin(&self, full_name: &str) -> bool {
        self.admins.contains(&name_key(full_name))
    }

    pub fn is_bot_name(&self, name: &str) -> bool {
        names_match(name.trim(), &self.config.bot_name)
    }

    /// Admins are unrestricted; everyone else holds their stored level here.
    pub fn effective_privilege(&self, full_name: &str, conversation_id: &str) -> StoreResult<Privilege> {
        if self.is_admin(full_name) {
            return Ok(Privilege::Unrestricted);
        }
        Ok(Privilege::Level(
            self.resolver().privilege_of(full_name, conversation_id)?,
        ))
    }

    pub fn required_privilege(&self, descriptor: &CommandDescriptor) -> Privilege {
        match descriptor.policy {
            PrivilegePolicy::Open => Privilege::ZERO,
            PrivilegePolicy::AdminOnly => Privilege::Unrestricted,
            PrivilegePolicy::Registry => lock(&self.command_privileges)
                .get(descriptor.name)
                .copied()
                .unwrap_or(Privilege::ZERO),
        }
    }

    pub(crate) fn set_live_privilege(&self, command_name: &str, level: u32) {
        lock(&self.command_privileges).insert(command_name.to_string(), Privilege::Level(level));
    }

    /// Spends one karma-change token for `actor`.
    pub fn try_consume_karma_token(&self, actor: &str) -> bool {
        let now = self.clock.now_unix();
        lock(&self.rate_limiter).try_consume_at(actor, now)
    }

    pub fn with_votes<T>(&self, apply: impl FnOnce(&mut VoteBox) -> T) -> T {
        apply(&mut lock(&self.votes))
    }

    pub fn with_rng<T>(&self, apply: impl FnOnce(&mut StdRng) -> T) -> T {
        apply(&mut lock(&self.rng))
    }

    pub fn title_fetcher(&self) -> Option<&dyn TitleFetcher> {
        self.title_fetcher.as_deref()
    }

    pub fn image_path(&self, file_name: &str) -> PathBuf {
        self.config.image_dir.join(file_name)
    }

    pub fn recompute_honorifics(&self, conversation_id: &str) -> StoreResult<Vec<TitleAssignment>> {
        recompute_honorifics(
            self.store.as_ref(),
            conversation_id,
            self.config.honorific_threshold,
        )
    }

    /// Previous message from `full_name`, with the speaker's stored spelling.
    pub fn last_message(&self, full_name: &str) -> Option<(String, String)> {
        lock(&self.last_messages)
            .get(&name_key(full_name))
            .map(|last| (last.full_name.clone(), last.text.clone()))
    }

    pub(crate) fn remember_message(&self, conversation_id: &str, sender: &Sender, text: &str) {
        lock(&self.last_messages).insert(
            name_key(&sender.full_name),
            LastMessage {
                full_name: sender.full_name.clone(),
                text: text.to_string(),
            },
        );
        lock(&self.known_ids)
            .entry(conversation_id.to_string())
            .or_default()
            .insert(name_key(&sender.full_name), sender.user_id.clone());
    }

    /// Platform id last seen speaking as `full_name` in `conversation_id`.
    pub fn known_user_id(&self, conversation_id: &str, full_name: &str) -> Option<String> {
        lock(&self.known_ids)
            .get(conversation_id)
            .and_then(|names| names.get(&name_key(full_name)))
            .cloned()
    }

    pub fn karma_enabled(&self, conversation_id: &str) -> bool {
        !lock(&self.karma_disabled).contains(conversation_id)
    }

    /// Flips the karma switch; true when the state changed.
    pub fn set_karma_enabled(&self, conversation_id: &str, enabled: bool) -> bool {
        let mut disabled = lock(&self.karma_disabled);
        if enabled {
            disabled.remove(conversation_id)
        } else {
            disabled.insert(conversation_id.to_string())
        }
    }
}
