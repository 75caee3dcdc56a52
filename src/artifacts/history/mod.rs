//! Commit DAG traversal
//!
//! Loads the full set of commits reachable from a set of starting hashes by
//! following parent edges. Commit graphs can be very deep (years of linear
//! history), so the traversal is an iterative worklist with a visit-once
//! guard, never recursion.

use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use std::collections::{HashMap, HashSet, VecDeque};

/// Boundaries for a traversal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions<'a> {
    /// Commits that are loaded but whose parents are not followed. Used to
    /// bound re-traversal to only the history that is new since a previous
    /// run (the operator-supplied prior mapping).
    pub stop_at: Option<&'a HashSet<ObjectId>>,
    /// Commits excluded entirely, as if they did not exist. Used to cut off
    /// unwanted prehistory when relocating source repositories.
    pub ignore: Option<&'a HashSet<ObjectId>>,
}

impl ReadOptions<'_> {
    fn stops_at(&self, hash: &ObjectId) -> bool {
        self.stop_at.is_some_and(|stop| stop.contains(hash))
    }

    fn ignores(&self, hash: &ObjectId) -> bool {
        self.ignore.is_some_and(|ignore| ignore.contains(hash))
    }
}

/// Load every commit reachable from `starts`, calling `load` at most once
/// per hash. Commits form an immutable hash-linked DAG, so the worklist is
/// guaranteed to drain.
pub fn read_commits<L>(
    starts: &[ObjectId],
    options: ReadOptions<'_>,
    mut load: L,
) -> anyhow::Result<HashMap<ObjectId, Commit>>
where
    L: FnMut(&ObjectId) -> anyhow::Result<Commit>,
{
    let mut commits = HashMap::new();
    let mut pending: VecDeque<ObjectId> = starts.iter().cloned().collect();

    while let Some(current) = pending.pop_front() {
        if commits.contains_key(&current) {
            continue;
        }

        let commit = load(&current)?;

        if !options.stops_at(&current) {
            for parent in commit.parent_hashes() {
                if !options.ignores(parent) {
                    pending.push_back(parent.clone());
                }
            }
        }

        commits.insert(current, commit);
    }

    Ok(commits)
}
