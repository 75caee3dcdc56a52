//! Tag fallback resolution across incompatible version schemes
//!
//! When sources are merged, a tag present in one source may be missing in
//! another (a package that skipped a patch release, or used a different
//! pre-release naming scheme). Resolution walks a fallback chain: decrement
//! the numeric patch component, or substitute the pre-release stage through
//! an alias table, until a tag the source knows is found or the chain is
//! exhausted.
//!
//! The alias table is a product convention, not derivable from the version
//! strings themselves, so it is configurable; the built-in default covers
//! an RC/beta pre-release ladder.

use crate::artifacts::objects::object_id::ObjectId;
use std::collections::{BTreeMap, HashSet};

const DEFAULT_ALIASES: [(&str, &str); 10] = [
    ("0-RC5", "0-RC4"),
    ("0-RC4", "0-RC3"),
    ("0-RC3", "0-RC2"),
    ("0-RC2", "0-RC1"),
    ("0-RC1", "0-beta5"),
    ("0-beta5", "0-beta4"),
    ("0-beta4", "0-beta3"),
    ("0-beta3", "0-beta2"),
    ("0-beta2", "0-beta1"),
    ("0-beta1", "0"),
];

/// The built-in pre-release alias ladder.
pub fn default_aliases() -> BTreeMap<String, String> {
    DEFAULT_ALIASES
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

/// Resolve `tag` against the tags a source actually has.
///
/// Returns the commit of the first tag along the fallback chain the source
/// knows, or `None` when the chain is exhausted. A repeated candidate
/// (possible with a cyclic user-supplied alias table) also ends the chain.
pub fn resolve(
    tag: &str,
    available: &BTreeMap<String, ObjectId>,
    aliases: &BTreeMap<String, String>,
) -> Option<ObjectId> {
    let mut candidate = tag.to_string();
    let mut seen = HashSet::new();

    loop {
        if let Some(hash) = available.get(&candidate) {
            return Some(hash.clone());
        }
        if !seen.insert(candidate.clone()) {
            return None;
        }

        let mut parts: Vec<String> = candidate.split('.').map(str::to_string).collect();
        let Some(patch) = parts.get(2) else {
            return None;
        };

        if let Ok(number) = patch.parse::<u64>()
            && number > 0
        {
            parts[2] = (number - 1).to_string();
        } else if let Some(alias) = aliases.get(patch) {
            parts[2] = alias.clone();
        } else {
            return None;
        }

        candidate = parts.join(".");
    }
}
