//! Read-only name resolution over the store.
//!
//! Two independent axes exist: alias substitution (`old -> new`) and the
//! nickname/full-name identity of a user. Callers apply alias resolution
//! first and nickname resolution second.

use gambit_core::names_match;
use gambit_store::{BotStore, StoreResult};
use std::collections::BTreeSet;

#[derive(Clone, Copy)]
pub struct IdentityResolver<'a> {
    store: &'a dyn BotStore,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(store: &'a dyn BotStore) -> Self {
        Self { store }
    }

    /// Alias target for `name`, or `name` unchanged.
    pub fn resolve_alias(&self, name: &str) -> StoreResult<String> {
        Ok(self
            .store
            .find_alias(name)?
            .map_or_else(|| name.to_string(), |alias| alias.new))
    }

    /// Full name of the user holding `nickname`, or `nickname` unchanged.
    pub fn resolve_to_full_name(&self, nickname: &str) -> StoreResult<String> {
        let users = self.store.all_users()?;
        Ok(users
            .into_iter()
            .find(|user| {
                user.nickname
                    .as_deref()
                    .is_some_and(|nick| names_match(nick, nickname))
            })
            .map_or_else(|| nickname.to_string(), |user| user.full_name))
    }

    /// Nickname assigned to `full_name`, or `full_name` unchanged.
    pub fn resolve_to_nickname(&self, full_name: &str) -> StoreResult<String> {
        let users = self.store.all_users()?;
        Ok(users
            .into_iter()
            .filter(|user| names_match(&user.full_name, full_name))
            .find_map(|user| user.nickname)
            .unwrap_or_else(|| full_name.to_string()))
    }

    /// Every assigned nickname, lowercased.
    pub fn known_nicknames(&self) -> StoreResult<BTreeSet<String>> {
        Ok(self
            .store
            .all_users()?
            .into_iter()
            .filter_map(|user| user.nickname)
            .map(|nickname| nickname.to_lowercase())
            .collect())
    }

    pub fn is_known_nickname(&self, name: &str) -> StoreResult<bool> {
        Ok(self.known_nicknames()?.contains(&name.to_lowercase()))
    }

    /// Stored privilege level of `full_name` in `conversation_id`, default 0.
    pub fn privilege_of(&self, full_name: &str, conversation_id: &str) -> StoreResult<u32> {
        Ok(self
            .store
            .find_user_by_name(conversation_id, full_name)?
            .map_or(0, |user| user.privilege))
    }

    /// `"<Title> <nickname>"` when the user holds a title here, else the nickname.
    pub fn honorific_display_name(
        &self,
        full_name: &str,
        conversation_id: &str,
    ) -> StoreResult<String> {
        let nickname = self.resolve_to_nickname(full_name)?;
        let title = self
            .store
            .find_user_by_name(conversation_id, full_name)?
            .and_then(|user| user.title);
        Ok(match title {
            Some(title) => format!("{title} {nickname}"),
            None => nickname,
        })
    }

    /// Alias-resolves `name`, then maps a nickname to its full name.
    pub fn canonical_person(&self, name: &str) -> StoreResult<String> {
        let aliased = self.resolve_alias(name)?;
        self.resolve_to_full_name(&aliased)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gambit_store::{InMemoryBotStore, Title};

    fn seeded_store() -> InMemoryBotStore {
        let store = InMemoryBotStore::new();
        store.insert_user("u-1", "c-1", "Brad Johns").expect("insert");
        store.insert_user("u-2", "c-1", "Sam Hill").expect("insert");
        assert!(store.set_nickname("c-1", "Brad Johns", "brad").expect("nick"));
        assert!(store.set_privilege("c-1", "Sam Hill", 4).expect("privilege"));
        store
    }

    #[test]
    fn unit_alias_resolution_falls_back_to_input() {
        let store = seeded_store();
        store.insert_alias("bj", "brad").expect("alias");
        let resolver = IdentityResolver::new(&store);
        assert_eq!(resolver.resolve_alias("BJ").expect("resolve"), "brad");
        assert_eq!(resolver.resolve_alias("poop").expect("resolve"), "poop");
    }

    #[test]
    fn unit_nickname_and_full_name_resolve_both_ways() {
        let store = seeded_store();
        let resolver = IdentityResolver::new(&store);
        assert_eq!(
            resolver.resolve_to_full_name("BRAD").expect("resolve"),
            "Brad Johns"
        );
        assert_eq!(
            resolver.resolve_to_nickname("brad johns").expect("resolve"),
            "brad"
        );
        assert_eq!(
            resolver.resolve_to_nickname("Sam Hill").expect("resolve"),
            "Sam Hill"
        );
        assert!(resolver.is_known_nickname("Brad").expect("known"));
    }

    #[test]
    fn unit_privilege_defaults_to_zero_for_unknown_users() {
        let store = seeded_store();
        let resolver = IdentityResolver::new(&store);
        assert_eq!(resolver.privilege_of("sam hill", "c-1").expect("level"), 4);
        assert_eq!(resolver.privilege_of("Nobody", "c-1").expect("level"), 0);
    }

    #[test]
    fn functional_honorific_display_name_prefixes_title() {
        let store = seeded_store();
        store
            .set_title("c-1", "Brad Johns", Title::King)
            .expect("title");
        let resolver = IdentityResolver::new(&store);
        assert_eq!(
            resolver
                .honorific_display_name("Brad Johns", "c-1")
                .expect("display"),
            "King brad"
        );
        assert_eq!(
            resolver
                .honorific_display_name("Brad Johns", "c-2")
                .expect("display"),
            "brad"
        );
    }

    #[test]
    fn functional_canonical_person_applies_alias_before_nickname() {
        let store = seeded_store();
        store.insert_alias("bj", "brad").expect("alias");
        let resolver = IdentityResolver::new(&store);
        assert_eq!(
            resolver.canonical_person("bj").expect("canonical"),
            "Brad Johns"
        );
    }
}
