//! In-memory gateway for exercising the rewriting algorithms without
//! spawning git processes.
//!
//! Clones share state, so a test can hold on to the gateway while a
//! splitter or merger consumes another handle to it.

use crate::areas::gateway::{Gateway, PushRef};
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::GitObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use anyhow::{Context, bail};
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

const TEST_IDENTITY: &str = "Mono Tools <monotools@example.com>";
const TEST_TIMESTAMP: i64 = 1700000000;

#[derive(Clone)]
enum StoredObject {
    Commit(Commit),
    Tree(Tree),
}

#[derive(Default)]
struct Inner {
    objects: RefCell<HashMap<ObjectId, StoredObject>>,
    new_objects: Cell<usize>,
    branches: RefCell<BTreeMap<String, ObjectId>>,
    tags: RefCell<BTreeMap<String, ObjectId>>,
    remote_branches: RefCell<BTreeMap<String, BTreeMap<String, ObjectId>>>,
    remote_tags: RefCell<BTreeMap<String, BTreeMap<String, ObjectId>>>,
    removed_remotes: RefCell<Vec<String>>,
    pushed_branches: RefCell<Vec<(PushRef, bool)>>,
    pushed_tags: RefCell<Vec<(PushRef, bool)>>,
}

#[derive(Clone, Default)]
pub struct MemoryGateway {
    inner: Rc<Inner>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_commit_object(&self, commit: Commit) -> ObjectId {
        let hash = commit.hash();
        self.inner
            .objects
            .borrow_mut()
            .insert(hash.clone(), StoredObject::Commit(commit));
        hash
    }

    pub fn add_tree_object(&self, tree: Tree) -> ObjectId {
        let hash = tree.hash();
        self.inner
            .objects
            .borrow_mut()
            .insert(hash.clone(), StoredObject::Tree(tree));
        hash
    }

    pub fn set_remote_branch(&self, remote: &str, branch: &str, hash: ObjectId) {
        self.inner
            .remote_branches
            .borrow_mut()
            .entry(remote.to_string())
            .or_default()
            .insert(branch.to_string(), hash);
    }

    pub fn set_remote_tag(&self, remote: &str, tag: &str, hash: ObjectId) {
        self.inner
            .remote_tags
            .borrow_mut()
            .entry(remote.to_string())
            .or_default()
            .insert(tag.to_string(), hash);
    }

    pub fn branch(&self, name: &str) -> Option<ObjectId> {
        self.inner.branches.borrow().get(name).cloned()
    }

    pub fn branches(&self) -> BTreeMap<String, ObjectId> {
        self.inner.branches.borrow().clone()
    }

    pub fn tag(&self, name: &str) -> Option<ObjectId> {
        self.inner.tags.borrow().get(name).cloned()
    }

    pub fn pushed_branches(&self) -> Vec<(PushRef, bool)> {
        self.inner.pushed_branches.borrow().clone()
    }

    pub fn pushed_tags(&self) -> Vec<(PushRef, bool)> {
        self.inner.pushed_tags.borrow().clone()
    }

    pub fn removed_remotes(&self) -> Vec<String> {
        self.inner.removed_remotes.borrow().clone()
    }

    /// Number of objects added since the last call. Lets idempotence tests
    /// assert that a re-run writes nothing new.
    pub fn take_new_object_count(&self) -> usize {
        self.inner.new_objects.replace(0)
    }
}

impl Gateway for MemoryGateway {
    fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn add_remote(&self, _name: &str, _url: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn remove_remote(&self, name: &str) -> anyhow::Result<()> {
        self.inner.removed_remotes.borrow_mut().push(name.to_string());
        self.inner.remote_branches.borrow_mut().remove(name);
        self.inner.remote_tags.borrow_mut().remove(name);
        Ok(())
    }

    fn fetch(&self, _remote: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn fetch_concurrent(&self, _remotes: &[String]) -> anyhow::Result<()> {
        Ok(())
    }

    fn fetch_tags(&self, remote: &str, prefix: &str) -> anyhow::Result<()> {
        let remote_tags = self.inner.remote_tags.borrow();
        let Some(tags) = remote_tags.get(remote) else {
            return Ok(());
        };

        let mut local = self.inner.tags.borrow_mut();
        for (tag, hash) in tags {
            local.insert(format!("{prefix}{tag}"), hash.clone());
        }

        Ok(())
    }

    fn fetch_tag(&self, tag: &str, remote: &str, prefix: &str) -> anyhow::Result<()> {
        let remote_tags = self.inner.remote_tags.borrow();
        let hash = remote_tags
            .get(remote)
            .and_then(|tags| tags.get(tag))
            .with_context(|| format!("Command failed: fetch tag {tag} from {remote}"))?
            .clone();
        drop(remote_tags);

        self.inner
            .tags
            .borrow_mut()
            .insert(format!("{prefix}{tag}"), hash);

        Ok(())
    }

    fn get_remote_branches(&self, remote: &str) -> anyhow::Result<BTreeMap<String, ObjectId>> {
        Ok(self
            .inner
            .remote_branches
            .borrow()
            .get(remote)
            .cloned()
            .unwrap_or_default())
    }

    fn get_tags(&self, prefix: &str) -> anyhow::Result<BTreeMap<String, ObjectId>> {
        Ok(self
            .inner
            .tags
            .borrow()
            .iter()
            .filter_map(|(tag, hash)| {
                tag.strip_prefix(prefix)
                    .map(|name| (name.to_string(), hash.clone()))
            })
            .collect())
    }

    fn get_tag(&self, tag: &str) -> anyhow::Result<ObjectId> {
        self.inner
            .tags
            .borrow()
            .get(tag)
            .cloned()
            .with_context(|| format!("Tag {tag} not found."))
    }

    fn get_commit(&self, hash: &ObjectId) -> anyhow::Result<Commit> {
        match self.inner.objects.borrow().get(hash) {
            Some(StoredObject::Commit(commit)) => Ok(commit.clone()),
            _ => bail!("Unknown commit {hash}"),
        }
    }

    fn get_tree(&self, hash: &ObjectId) -> anyhow::Result<Tree> {
        match self.inner.objects.borrow().get(hash) {
            Some(StoredObject::Tree(tree)) => Ok(tree.clone()),
            _ if hash.as_ref() == Tree::EMPTY_HASH => Tree::new(Bytes::new()),
            _ => bail!("Unknown tree {hash}"),
        }
    }

    fn add_object(&self, object: &dyn GitObject) -> anyhow::Result<()> {
        let hash = object.hash();
        let mut objects = self.inner.objects.borrow_mut();
        if objects.contains_key(&hash) {
            return Ok(());
        }

        let stored = match object.object_type() {
            ObjectType::Commit => StoredObject::Commit(Commit::new(object.raw().clone())?),
            ObjectType::Tree => StoredObject::Tree(Tree::new(object.raw().clone())?),
        };
        objects.insert(hash, stored);
        self.inner.new_objects.set(self.inner.new_objects.get() + 1);

        Ok(())
    }

    fn commit_tree(
        &self,
        tree: &ObjectId,
        message: &str,
        parents: &[ObjectId],
        copy_date_from_parents: bool,
    ) -> anyhow::Result<ObjectId> {
        let date = if copy_date_from_parents {
            let mut date: Option<DateTime<FixedOffset>> = None;
            for parent in parents {
                let parent_date = self.get_commit(parent)?.committer_date()?;
                if date.is_none_or(|date| parent_date > date) {
                    date = Some(parent_date);
                }
            }
            date
        } else {
            None
        };
        let date = match date {
            Some(date) => date,
            None => DateTime::from_timestamp(TEST_TIMESTAMP, 0)
                .context("invalid test timestamp")?
                .fixed_offset(),
        };

        let mut raw = format!("tree {tree}\n");
        for parent in parents {
            raw.push_str(&format!("parent {parent}\n"));
        }
        let identity = format!(
            "{TEST_IDENTITY} {} {}",
            date.timestamp(),
            date.format("%z")
        );
        raw.push_str(&format!("author {identity}\ncommitter {identity}\n\n{message}"));

        let commit = Commit::new(Bytes::from(raw))?;
        let hash = commit.hash();
        self.add_object(&commit)?;

        Ok(hash)
    }

    fn add_branch(&self, name: &str, hash: &ObjectId) -> anyhow::Result<()> {
        self.inner
            .branches
            .borrow_mut()
            .insert(name.to_string(), hash.clone());
        Ok(())
    }

    fn add_tag(&self, name: &str, hash: &ObjectId) -> anyhow::Result<()> {
        self.inner
            .tags
            .borrow_mut()
            .insert(name.to_string(), hash.clone());
        Ok(())
    }

    fn remove_tag(&self, name: &str) -> anyhow::Result<()> {
        self.inner
            .tags
            .borrow_mut()
            .remove(name)
            .with_context(|| format!("Tag {name} not found."))?;
        Ok(())
    }

    fn push_branch(
        &self,
        local_branch: &str,
        remote: &str,
        remote_branch: &str,
        force: bool,
    ) -> anyhow::Result<()> {
        self.inner.pushed_branches.borrow_mut().push((
            (
                local_branch.to_string(),
                remote.to_string(),
                remote_branch.to_string(),
            ),
            force,
        ));
        Ok(())
    }

    fn push_branches(&self, branches: &[PushRef], force: bool) -> anyhow::Result<()> {
        for (local, remote, remote_branch) in branches {
            self.push_branch(local, remote, remote_branch, force)?;
        }
        Ok(())
    }

    fn push_tag(
        &self,
        local_tag: &str,
        remote: &str,
        remote_tag: &str,
        force: bool,
    ) -> anyhow::Result<()> {
        self.inner.pushed_tags.borrow_mut().push((
            (
                local_tag.to_string(),
                remote.to_string(),
                remote_tag.to_string(),
            ),
            force,
        ));
        Ok(())
    }

    fn push_tags(&self, tags: &[PushRef], force: bool) -> anyhow::Result<()> {
        for (local, remote, remote_tag) in tags {
            self.push_tag(local, remote, remote_tag, force)?;
        }
        Ok(())
    }
}
