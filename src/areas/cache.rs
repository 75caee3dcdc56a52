//! Persisted object cache
//!
//! Holds the hash → commit and hash → tree maps a run accumulates, so a
//! follow-up run does not re-fetch and re-parse unchanged history. The maps
//! are loaded once at the start of a run, mutated only in memory, and
//! written back atomically at the end. Concurrent runs sharing a cache file
//! are not supported.
//!
//! The on-disk format is bincode over the raw object payloads; it only has
//! to round-trip within this implementation.

use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use anyhow::Context;
use fake::rand;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const CACHE_FILE_NAME: &str = "objects-v1.cache";

#[derive(Default)]
pub struct ObjectsCache {
    path: Option<PathBuf>,
    commits: HashMap<ObjectId, Commit>,
    trees: HashMap<ObjectId, Tree>,
}

impl ObjectsCache {
    /// A cache that lives for one run only and is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache file from `cache_dir` if one exists; otherwise start
    /// empty but remember where to store.
    pub fn load(cache_dir: &Path) -> anyhow::Result<Self> {
        let path = cache_dir.join(CACHE_FILE_NAME);

        let (commits, trees) = if path.exists() {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Unable to read cache file {}", path.display()))?;
            bincode::deserialize(&bytes)
                .with_context(|| format!("Unable to parse cache file {}", path.display()))?
        } else {
            Default::default()
        };

        Ok(ObjectsCache {
            path: Some(path),
            commits,
            trees,
        })
    }

    /// Write the cache back to disk through a temp file and rename, so a
    /// crashed run never leaves a truncated cache behind.
    pub fn store(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let bytes = bincode::serialize(&(&self.commits, &self.trees))
            .context("Unable to serialize object cache")?;

        let dir = path
            .parent()
            .with_context(|| format!("Invalid cache path {}", path.display()))?;
        let temp_path = dir.join(format!("tmp-cache-{}", rand::random::<u32>()));
        std::fs::write(&temp_path, bytes)
            .with_context(|| format!("Unable to write cache file {}", temp_path.display()))?;
        std::fs::rename(&temp_path, path)
            .with_context(|| format!("Unable to rename cache file to {}", path.display()))?;

        Ok(())
    }

    pub fn commit(&self, hash: &ObjectId) -> Option<&Commit> {
        self.commits.get(hash)
    }

    pub fn insert_commit(&mut self, hash: ObjectId, commit: Commit) {
        self.commits.insert(hash, commit);
    }

    pub fn tree(&self, hash: &ObjectId) -> Option<&Tree> {
        self.trees.get(hash)
    }

    pub fn insert_tree(&mut self, hash: ObjectId, tree: Tree) {
        self.trees.insert(hash, tree);
    }

    pub fn len(&self) -> usize {
        self.commits.len() + self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty() && self.trees.is_empty()
    }
}
