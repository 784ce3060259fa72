use std::path::Path;

use anyhow::{Context, Result};
use gambit_core::name_key;

/// Merges `--admin` names with an optional newline-separated admin file.
///
/// Blank lines and `#` comments in the file are skipped; names are
/// deduplicated case-insensitively, keeping the first spelling.
pub(crate) fn load_admins(flag_admins: &[String], admins_file: Option<&Path>) -> Result<Vec<String>> {
    let mut candidates = flag_admins.to_vec();
    if let Some(path) = admins_file {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read admins file {}", path.display()))?;
        candidates.extend(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }

    let mut seen = std::collections::HashSet::new();
    let admins = candidates
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && seen.insert(name_key(name)))
        .collect::<Vec<_>>();
    tracing::debug!(count = admins.len(), "loaded admin list");
    Ok(admins)
}
