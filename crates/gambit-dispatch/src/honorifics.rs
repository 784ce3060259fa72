//! Lord/King titles derived from karma standing.

use crate::identity::IdentityResolver;
use gambit_store::{BotStore, StoreResult, Title};

pub const DEFAULT_HONORIFIC_THRESHOLD: i64 = 75;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleAssignment {
    pub full_name: String,
    pub karma: i64,
    pub title: Title,
}

/// Recomputes titles for one conversation.
///
/// Titles are cleared in every conversation first. Users whose resolved karma
/// exceeds `threshold` become Lords when at least two qualify; the leader is
/// crowned King only with a strict lead over second place.
#[tracing::instrument(name = "gambit.honorifics", skip(store))]
pub fn recompute_honorifics(
    store: &dyn BotStore,
    conversation_id: &str,
    threshold: i64,
) -> StoreResult<Vec<TitleAssignment>> {
    store.clear_titles()?;

    let resolver = IdentityResolver::new(store);
    let mut standings = Vec::new();
    for user in store.users_in_conversation(conversation_id)? {
        let target = resolver.resolve_alias(user.display_nickname())?;
        let karma = store.karma_of(&target)?;
        if karma > threshold {
            standings.push((user.full_name, karma));
        }
    }
    if standings.len() < 2 {
        return Ok(Vec::new());
    }
    standings.sort_by(|left, right| right.1.cmp(&left.1));

    let undisputed = standings[0].1 > standings[1].1;
    let mut assignments = Vec::with_capacity(standings.len());
    for (rank, (full_name, karma)) in standings.into_iter().enumerate() {
        let title = if rank == 0 && undisputed {
            Title::King
        } else {
            Title::Lord
        };
        store.set_title(conversation_id, &full_name, title)?;
        assignments.push(TitleAssignment {
            full_name,
            karma,
            title,
        });
    }
    tracing::debug!(
        conversation_id,
        titled = assignments.len(),
        "honorifics recomputed"
    );
    Ok(assignments)
}
