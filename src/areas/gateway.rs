//! The narrow interface between the rewriting algorithms and the
//! underlying version-control tool.
//!
//! All interaction with git goes through this trait so the core algorithms
//! can be tested against an in-memory implementation without spawning
//! processes. The network operations (`fetch*`, `add_remote`) are only used
//! during setup; the rewrite itself reads and writes objects and refs.

use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::GitObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use std::collections::BTreeMap;

/// A local branch or tag to push: `(local_ref, remote, remote_ref)`.
pub type PushRef = (String, String, String);

pub trait Gateway {
    /// Create the underlying bare repository.
    fn init(&self) -> anyhow::Result<()>;

    fn add_remote(&self, name: &str, url: &str) -> anyhow::Result<()>;

    fn remove_remote(&self, name: &str) -> anyhow::Result<()>;

    fn fetch(&self, remote: &str) -> anyhow::Result<()>;

    /// Fetch several remotes as one batch of concurrent processes. All
    /// fetches run to completion before failures are reported.
    fn fetch_concurrent(&self, remotes: &[String]) -> anyhow::Result<()>;

    /// Fetch all tags of a remote, stored locally under `prefix` to avoid
    /// collisions with tags from other remotes.
    fn fetch_tags(&self, remote: &str, prefix: &str) -> anyhow::Result<()>;

    /// Fetch a single tag of a remote, stored locally under `prefix`.
    fn fetch_tag(&self, tag: &str, remote: &str, prefix: &str) -> anyhow::Result<()>;

    /// Branch name → tip commit hash for every branch of a remote.
    fn get_remote_branches(&self, remote: &str) -> anyhow::Result<BTreeMap<String, ObjectId>>;

    /// Tag name (with `prefix` stripped) → peeled commit hash for every
    /// local tag starting with `prefix`.
    fn get_tags(&self, prefix: &str) -> anyhow::Result<BTreeMap<String, ObjectId>>;

    /// Peeled commit hash of one tag. Unresolvable tags are an error.
    fn get_tag(&self, tag: &str) -> anyhow::Result<ObjectId>;

    fn get_commit(&self, hash: &ObjectId) -> anyhow::Result<Commit>;

    fn get_tree(&self, hash: &ObjectId) -> anyhow::Result<Tree>;

    /// Write a loose object. Writing an object that already exists is a
    /// no-op, which makes re-runs idempotent.
    fn add_object(&self, object: &dyn GitObject) -> anyhow::Result<()>;

    /// Create a commit for the given tree via the underlying tool, using
    /// its configured identity. With `copy_date_from_parents`, the author
    /// and committer dates are taken from the latest parent instead of the
    /// current time, so release commits are reproducible.
    fn commit_tree(
        &self,
        tree: &ObjectId,
        message: &str,
        parents: &[ObjectId],
        copy_date_from_parents: bool,
    ) -> anyhow::Result<ObjectId>;

    fn add_branch(&self, name: &str, hash: &ObjectId) -> anyhow::Result<()>;

    fn add_tag(&self, name: &str, hash: &ObjectId) -> anyhow::Result<()>;

    fn remove_tag(&self, name: &str) -> anyhow::Result<()>;

    fn push_branch(
        &self,
        local_branch: &str,
        remote: &str,
        remote_branch: &str,
        force: bool,
    ) -> anyhow::Result<()>;

    /// Push several branches as one batch of concurrent processes.
    fn push_branches(&self, branches: &[PushRef], force: bool) -> anyhow::Result<()>;

    fn push_tag(
        &self,
        local_tag: &str,
        remote: &str,
        remote_tag: &str,
        force: bool,
    ) -> anyhow::Result<()>;

    /// Push several tags as one batch of concurrent processes.
    fn push_tags(&self, tags: &[PushRef], force: bool) -> anyhow::Result<()>;
}
