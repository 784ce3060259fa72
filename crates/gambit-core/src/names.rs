//! Name normalization shared by karma, alias, and quote lookups.
//!
//! Targets may be written either as a single word (`poop`) or wrapped in
//! parentheses when they span several words (`(more poop)`). Every
//! comparison between stored names is ASCII case-insensitive.

/// Removes every parenthesis from a raw target token.
pub fn strip_target_parens(raw: &str) -> String {
    raw.chars().filter(|ch| *ch != '(' && *ch != ')').collect()
}

/// Case-insensitive name equality used for every name-like column.
pub fn names_match(left: &str, right: &str) -> bool {
    left.eq_ignore_ascii_case(right)
}

/// Lowercased lookup key for in-memory maps keyed by name.
pub fn name_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Collapses runs of whitespace into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
