//! Splitter: project a monorepo commit DAG into per-folder DAGs
//!
//! For every configured folder, each monorepo commit that contains that
//! folder is rewritten into a new commit whose tree is exactly the folder's
//! subtree and whose parents are the already-rewritten parents for the same
//! folder. Commits are processed in topological order via an explicit
//! worklist; a commit whose folder subtree equals a rewritten parent's tree
//! collapses onto that parent instead of producing a no-op commit.
//!
//! The per-folder hash mappings are seeded from the operator-supplied
//! configuration, which bridges pre-existing split history and bounds
//! re-traversal on incremental runs.

use crate::areas::cache::ObjectsCache;
use crate::areas::gateway::{Gateway, PushRef};
use crate::artifacts::history::{self, ReadOptions};
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::GitObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use anyhow::{Context, bail};
use derive_new::new;
use regex::Regex;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;

/// Remote name the monorepo is fetched under.
const MONO_REMOTE: &str = "mono";

/// Local namespace for tags fetched from the monorepo, so they cannot
/// collide with tags fetched from the split destinations.
const MONO_TAG_PREFIX: &str = "remote/mono/";

/// One configured split destination.
#[derive(Debug, Clone, new)]
pub struct SplitRepository {
    pub url: String,
    /// Known monorepo commit → split commit equivalences from previous
    /// split history.
    pub mapping: BTreeMap<ObjectId, ObjectId>,
}

type HashMapping = HashMap<String, HashMap<ObjectId, ObjectId>>;

pub struct Splitter<G: Gateway> {
    monorepo_url: String,
    branch_filter: Regex,
    repositories: BTreeMap<String, SplitRepository>,
    branch_or_tag: Option<String>,
    force_push: bool,
    repository: G,
    cache: ObjectsCache,
    writer: RefCell<Box<dyn Write>>,
}

impl<G: Gateway> Splitter<G> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        monorepo_url: String,
        branch_filter: Regex,
        repositories: BTreeMap<String, SplitRepository>,
        branch_or_tag: Option<String>,
        force_push: bool,
        repository: G,
        cache: ObjectsCache,
        writer: Box<dyn Write>,
    ) -> Self {
        Splitter {
            monorepo_url,
            branch_filter,
            repositories,
            branch_or_tag,
            force_push,
            repository,
            cache,
            writer: RefCell::new(writer),
        }
    }

    pub fn split(mut self) -> anyhow::Result<()> {
        self.banner("Load monorepo...")?;

        self.repository.init()?;
        self.repository.add_remote(MONO_REMOTE, &self.monorepo_url)?;
        self.repository.fetch(MONO_REMOTE)?;

        let folders: Vec<String> = self.repositories.keys().cloned().collect();
        for folder in &folders {
            let url = self.repositories[folder].url.clone();
            self.repository.add_remote(folder, &url)?;
        }
        self.repository.fetch_concurrent(&folders)?;

        self.verify_mappings()?;

        let all_branches = self.repository.get_remote_branches(MONO_REMOTE)?;
        let mut branch_commits: BTreeMap<String, ObjectId> = all_branches
            .iter()
            .filter(|(branch, _)| self.branch_filter.is_match(branch))
            .map(|(branch, hash)| (branch.clone(), hash.clone()))
            .collect();
        let mut tag_commits = BTreeMap::new();

        match self.branch_or_tag.clone() {
            Some(name) if branch_commits.contains_key(&name) => {
                branch_commits.retain(|branch, _| *branch == name);
            }
            Some(name) if all_branches.contains_key(&name) => {
                self.banner(&format!(
                    "Branch {name} does not match the configured branch filter, skipping."
                ))?;
                return Ok(());
            }
            Some(name) => {
                self.repository
                    .fetch_tag(&name, MONO_REMOTE, MONO_TAG_PREFIX)
                    .with_context(|| {
                        format!(
                            "Branch or tag {name} not found. Valid branches: {:?}",
                            all_branches.keys().collect::<Vec<_>>()
                        )
                    })?;
                let hash = self.repository.get_tag(&format!("{MONO_TAG_PREFIX}{name}"))?;
                branch_commits.clear();
                tag_commits.insert(name, hash);
            }
            None => {
                self.repository.fetch_tags(MONO_REMOTE, MONO_TAG_PREFIX)?;
                tag_commits = self.repository.get_tags(MONO_TAG_PREFIX)?;
            }
        }

        self.banner("Read commits...")?;
        let starts: Vec<ObjectId> = branch_commits
            .values()
            .chain(tag_commits.values())
            .cloned()
            .collect();
        let stop: HashSet<ObjectId> = self
            .repositories
            .values()
            .flat_map(|repository| repository.mapping.keys().cloned())
            .collect();
        let commits = history::read_commits(
            &starts,
            ReadOptions {
                stop_at: Some(&stop),
                ignore: None,
            },
            |hash| self.commit_object(hash),
        )?;

        if commits.is_empty() {
            bail!("No commits found for: {branch_commits:#?}");
        }

        self.banner("Split commits...")?;
        let hash_mapping = self.split_commits(&folders, &commits)?;

        if hash_mapping.values().all(HashMap::is_empty) {
            bail!(
                "No hash mapping for commits: {:#?}",
                commits.keys().collect::<Vec<_>>()
            );
        }

        self.banner("Create branches...")?;
        let mut added_branches: Vec<PushRef> = Vec::new();
        for (branch, commit) in &branch_commits {
            for folder in &folders {
                if let Some(mapped) = hash_mapping[folder].get(commit) {
                    let local = format!("{folder}/{branch}");
                    self.repository.add_branch(&local, mapped)?;
                    added_branches.push((local, folder.clone(), branch.clone()));
                }
            }
        }

        self.banner("Create tags...")?;
        let mut added_tags: Vec<PushRef> = Vec::new();
        for (tag, commit) in &tag_commits {
            for folder in &folders {
                if let Some(mapped) = hash_mapping[folder].get(commit) {
                    let local = format!("remote/{folder}/{tag}");
                    self.repository.add_tag(&local, mapped)?;
                    added_tags.push((local, folder.clone(), tag.clone()));
                }
            }
        }

        self.banner("Update cache...")?;
        self.cache.store()?;

        self.banner("Push to remotes...")?;
        self.repository.push_branches(&added_branches, self.force_push)?;
        self.repository.push_tags(&added_tags, false)?;

        self.banner("Done.")?;

        Ok(())
    }

    /// Every operator-supplied (mono hash → split hash) pair must agree on
    /// tree content: the folder's subtree inside the mono commit has to be
    /// the entire tree of the split commit. A mismatch means the bridge
    /// mapping is stale and continuing would corrupt the split history.
    fn verify_mappings(&mut self) -> anyhow::Result<()> {
        let pairs: Vec<(String, ObjectId, ObjectId)> = self
            .repositories
            .iter()
            .flat_map(|(folder, repository)| {
                repository
                    .mapping
                    .iter()
                    .map(move |(mono, split)| (folder.clone(), mono.clone(), split.clone()))
            })
            .collect();

        for (folder, mono, split) in pairs {
            let mono_tree = self.commit_object(&mono)?.tree_hash().clone();
            let mono_subtree = self.tree_object(&mono_tree)?.subtree_hash(&folder).cloned();
            let split_tree = self.commit_object(&split)?.tree_hash().clone();

            if mono_subtree.as_ref() != Some(&split_tree) {
                bail!(
                    "Invalid mapping from {mono} to {split}. Tree for folder {folder} does not match."
                );
            }
        }

        Ok(())
    }

    /// Topological worklist over the read commits: a commit is split only
    /// once every parent has either been split for some folder or been
    /// memoized as empty. Blocked candidates are re-pushed together with
    /// their unresolved parents.
    fn split_commits(
        &mut self,
        folders: &[String],
        commits: &HashMap<ObjectId, Commit>,
    ) -> anyhow::Result<HashMapping> {
        let mut mapping: HashMapping = self
            .repositories
            .iter()
            .map(|(folder, repository)| {
                (
                    folder.clone(),
                    repository
                        .mapping
                        .iter()
                        .map(|(mono, split)| (mono.clone(), split.clone()))
                        .collect(),
                )
            })
            .collect();
        let mut empty_commits: HashSet<ObjectId> = HashSet::new();
        let mut pending: Vec<ObjectId> = commits.keys().cloned().collect();

        while let Some(current) = pending.pop() {
            if empty_commits.contains(&current)
                || mapping.values().any(|mapped| mapped.contains_key(&current))
            {
                continue;
            }

            let commit = commits
                .get(&current)
                .with_context(|| format!("Commit {current} missing from the read set"))?;

            let missing: Vec<ObjectId> = commit
                .parent_hashes()
                .iter()
                .filter(|parent| {
                    !empty_commits.contains(parent)
                        && !mapping.values().any(|mapped| mapped.contains_key(*parent))
                })
                .cloned()
                .collect();

            if !missing.is_empty() {
                pending.push(current);
                pending.extend(missing);
                continue;
            }

            self.split_commit(&current, commit, folders, &mut mapping, &mut empty_commits)?;
        }

        Ok(mapping)
    }

    /// Split one commit across every folder it contains. A commit whose
    /// tree is the well-known empty tree counts as containing every folder
    /// (with empty content); a commit containing no folder at all is
    /// memoized as empty so dependents stop waiting for it.
    fn split_commit(
        &mut self,
        commit_hash: &ObjectId,
        commit: &Commit,
        folders: &[String],
        mapping: &mut HashMapping,
        empty_commits: &mut HashSet<ObjectId>,
    ) -> anyhow::Result<()> {
        let tree_hash = commit.tree_hash().clone();
        let tree = self.tree_object(&tree_hash)?;

        let mut matched = false;
        for folder in folders {
            let subtree = match tree.subtree_hash(folder) {
                Some(subtree) => Some(subtree.clone()),
                None if tree_hash.as_ref() == Tree::EMPTY_HASH => Some(tree_hash.clone()),
                None => None,
            };
            let Some(subtree) = subtree else {
                continue;
            };

            let new_hash = self.create_new_commit(commit, &subtree, &mapping[folder])?;
            mapping
                .get_mut(folder)
                .with_context(|| format!("Unknown folder {folder}"))?
                .insert(commit_hash.clone(), new_hash);
            matched = true;
        }

        if !matched {
            empty_commits.insert(commit_hash.clone());
        }

        Ok(())
    }

    /// Rewrite one commit for one folder. Parents are the mapped parent
    /// hashes, deduplicated in order of first occurrence; parents the
    /// folder has no mapping for are skipped. If a mapped parent already
    /// carries the identical tree, that parent is reused instead of
    /// creating a new commit.
    fn create_new_commit(
        &mut self,
        commit: &Commit,
        tree_hash: &ObjectId,
        folder_mapping: &HashMap<ObjectId, ObjectId>,
    ) -> anyhow::Result<ObjectId> {
        let mut new_parents: Vec<ObjectId> = Vec::new();
        for parent in commit.parent_hashes() {
            if let Some(mapped) = folder_mapping.get(parent)
                && !new_parents.contains(mapped)
            {
                new_parents.push(mapped.clone());
            }
        }

        for parent in &new_parents {
            if self.commit_object(parent)?.tree_hash() == tree_hash {
                return Ok(parent.clone());
            }
        }

        let new_commit = commit.with_tree(tree_hash)?.with_parents(&new_parents)?;
        self.repository.add_object(&new_commit)?;

        let new_hash = new_commit.hash();
        self.cache.insert_commit(new_hash.clone(), new_commit);

        Ok(new_hash)
    }

    fn commit_object(&mut self, hash: &ObjectId) -> anyhow::Result<Commit> {
        if let Some(commit) = self.cache.commit(hash) {
            return Ok(commit.clone());
        }

        let commit = self.repository.get_commit(hash)?;
        self.cache.insert_commit(hash.clone(), commit.clone());

        Ok(commit)
    }

    fn tree_object(&mut self, hash: &ObjectId) -> anyhow::Result<Tree> {
        if let Some(tree) = self.cache.tree(hash) {
            return Ok(tree.clone());
        }

        let tree = self.repository.get_tree(hash)?;
        self.cache.insert_tree(hash.clone(), tree.clone());

        Ok(tree)
    }

    fn banner(&self, text: &str) -> anyhow::Result<()> {
        writeln!(self.writer.borrow_mut(), "\n{text}")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::areas::memory::MemoryGateway;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    fn oid(n: u32) -> ObjectId {
        ObjectId::try_parse(format!("{n:040x}")).unwrap()
    }

    fn commit(tree: &ObjectId, parents: &[&ObjectId], message: &str) -> Commit {
        let mut raw = format!("tree {tree}\n");
        for parent in parents {
            raw.push_str(&format!("parent {parent}\n"));
        }
        raw.push_str(
            "author Jane Doe <jane@example.com> 1600000000 +0000\n\
             committer Jane Doe <jane@example.com> 1600000000 +0000\n\n",
        );
        raw.push_str(message);

        Commit::new(Bytes::from(raw)).unwrap()
    }

    /// Entries must be given sorted by name, as in a canonical git tree.
    fn root_tree(entries: &[(&str, &ObjectId)]) -> Tree {
        let trees: Vec<Tree> = entries
            .iter()
            .map(|(name, hash)| Tree::wrap(name, hash).unwrap())
            .collect();

        Tree::from_trees(&trees).unwrap()
    }

    fn repositories(folders: &[&str]) -> BTreeMap<String, SplitRepository> {
        folders
            .iter()
            .map(|folder| {
                (
                    folder.to_string(),
                    SplitRepository {
                        url: format!("https://example.com/{folder}.git"),
                        mapping: BTreeMap::new(),
                    },
                )
            })
            .collect()
    }

    fn splitter(
        gateway: MemoryGateway,
        repositories: BTreeMap<String, SplitRepository>,
        branch_or_tag: Option<String>,
    ) -> Splitter<MemoryGateway> {
        Splitter::new(
            "https://example.com/mono.git".to_string(),
            Regex::new("^main$").unwrap(),
            repositories,
            branch_or_tag,
            false,
            gateway,
            ObjectsCache::in_memory(),
            Box::new(std::io::sink()),
        )
    }

    /// Two folders over two commits; the second commit only changes
    /// `bundle-foo`.
    fn two_folder_fixture(gateway: &MemoryGateway) -> (ObjectId, ObjectId) {
        let (foo_one, foo_two, bar_one) = (oid(0xf1), oid(0xf2), oid(0xb1));

        let root_one = root_tree(&[("bundle-bar", &bar_one), ("bundle-foo", &foo_one)]);
        let root_two = root_tree(&[("bundle-bar", &bar_one), ("bundle-foo", &foo_two)]);
        let root_one_hash = gateway.add_tree_object(root_one);
        let root_two_hash = gateway.add_tree_object(root_two);

        let one = gateway.add_commit_object(commit(&root_one_hash, &[], "one"));
        let two = gateway.add_commit_object(commit(&root_two_hash, &[&one], "two"));

        gateway.set_remote_branch("mono", "main", two.clone());
        gateway.set_remote_branch("mono", "skip-me", two.clone());

        (one, two)
    }

    #[test]
    fn splits_folders_and_collapses_unchanged_subtrees() {
        let gateway = MemoryGateway::new();
        two_folder_fixture(&gateway);

        splitter(
            gateway.clone(),
            repositories(&["bundle-bar", "bundle-foo"]),
            None,
        )
        .split()
        .unwrap();

        let foo_tip = gateway.branch("bundle-foo/main").unwrap();
        let foo_commit = gateway.get_commit(&foo_tip).unwrap();
        assert_eq!(foo_commit.tree_hash(), &oid(0xf2));
        assert_eq!(foo_commit.parent_hashes().len(), 1);

        let foo_parent = gateway.get_commit(&foo_commit.parent_hashes()[0]).unwrap();
        assert_eq!(foo_parent.tree_hash(), &oid(0xf1));
        assert!(foo_parent.parent_hashes().is_empty());

        // bundle-bar is unchanged in the second commit: its branch collapses
        // onto the rewrite of the first commit instead of a no-op commit
        let bar_tip = gateway.branch("bundle-bar/main").unwrap();
        let bar_commit = gateway.get_commit(&bar_tip).unwrap();
        assert_eq!(bar_commit.tree_hash(), &oid(0xb1));
        assert!(bar_commit.parent_hashes().is_empty());

        // The filtered-out branch never reaches any destination
        assert_eq!(gateway.branch("bundle-foo/skip-me"), None);
        assert_eq!(gateway.branch("bundle-bar/skip-me"), None);

        let pushed = gateway.pushed_branches();
        assert_eq!(pushed.len(), 2);
        assert!(pushed.contains(&(
            (
                "bundle-foo/main".to_string(),
                "bundle-foo".to_string(),
                "main".to_string()
            ),
            false
        )));
    }

    #[test]
    fn rewritten_commits_carry_no_author_changes() {
        let gateway = MemoryGateway::new();
        two_folder_fixture(&gateway);

        splitter(gateway.clone(), repositories(&["bundle-foo"]), None)
            .split()
            .unwrap();

        let tip = gateway.branch("bundle-foo/main").unwrap();
        let commit = gateway.get_commit(&tip).unwrap();
        assert_eq!(commit.message(), "two");
        assert_eq!(commit.committer_date().unwrap().timestamp(), 1600000000);
    }

    #[test]
    fn commits_without_any_folder_are_memoized_and_skipped() {
        let gateway = MemoryGateway::new();
        let (foo_one, foo_two, other) = (oid(0xf1), oid(0xf2), oid(0xee));

        let root_one = gateway.add_tree_object(root_tree(&[("bundle-foo", &foo_one)]));
        let root_two = gateway.add_tree_object(root_tree(&[("other", &other)]));
        let root_three = gateway.add_tree_object(root_tree(&[("bundle-foo", &foo_two)]));

        let one = gateway.add_commit_object(commit(&root_one, &[], "one"));
        let two = gateway.add_commit_object(commit(&root_two, &[&one], "two"));
        let three = gateway.add_commit_object(commit(&root_three, &[&two], "three"));

        gateway.set_remote_branch("mono", "main", three);

        splitter(gateway.clone(), repositories(&["bundle-foo"]), None)
            .split()
            .unwrap();

        // The folder vanished in the middle commit, so the rewritten tip
        // restarts the folder history rather than waiting forever
        let tip = gateway.branch("bundle-foo/main").unwrap();
        let tip_commit = gateway.get_commit(&tip).unwrap();
        assert_eq!(tip_commit.tree_hash(), &foo_two);
        assert!(tip_commit.parent_hashes().is_empty());
    }

    #[test]
    fn parents_mapping_to_the_same_split_commit_are_deduplicated() {
        let gateway = MemoryGateway::new();
        let (foo_one, foo_two, pad_a, pad_b) = (oid(0xf1), oid(0xf2), oid(0xa1), oid(0xa2));

        let base = gateway.add_tree_object(root_tree(&[("bundle-foo", &foo_one)]));
        let left = gateway.add_tree_object(root_tree(&[("bundle-foo", &foo_one), ("pad", &pad_a)]));
        let right =
            gateway.add_tree_object(root_tree(&[("bundle-foo", &foo_one), ("pad", &pad_b)]));
        let tip = gateway.add_tree_object(root_tree(&[("bundle-foo", &foo_two)]));

        let one = gateway.add_commit_object(commit(&base, &[], "one"));
        let two_a = gateway.add_commit_object(commit(&left, &[&one], "two a"));
        let two_b = gateway.add_commit_object(commit(&right, &[&one], "two b"));
        let three = gateway.add_commit_object(commit(&tip, &[&two_a, &two_b], "three"));

        gateway.set_remote_branch("mono", "main", three);

        splitter(gateway.clone(), repositories(&["bundle-foo"]), None)
            .split()
            .unwrap();

        // Both merge parents collapse onto the same split commit and must
        // appear once in the rewritten parent list
        let tip = gateway.branch("bundle-foo/main").unwrap();
        let tip_commit = gateway.get_commit(&tip).unwrap();
        assert_eq!(tip_commit.parent_hashes().len(), 1);
        assert_eq!(
            gateway
                .get_commit(&tip_commit.parent_hashes()[0])
                .unwrap()
                .tree_hash(),
            &foo_one
        );
    }

    #[test]
    fn second_run_over_unchanged_history_writes_nothing() {
        let gateway = MemoryGateway::new();
        two_folder_fixture(&gateway);

        splitter(
            gateway.clone(),
            repositories(&["bundle-bar", "bundle-foo"]),
            None,
        )
        .split()
        .unwrap();

        assert!(gateway.take_new_object_count() > 0);
        let branches = gateway.branches();

        splitter(
            gateway.clone(),
            repositories(&["bundle-bar", "bundle-foo"]),
            None,
        )
        .split()
        .unwrap();

        assert_eq!(gateway.take_new_object_count(), 0);
        assert_eq!(gateway.branches(), branches);
    }

    #[test]
    fn seeded_mapping_bridges_previous_split_history() {
        let gateway = MemoryGateway::new();
        let (one, _) = two_folder_fixture(&gateway);

        // The first commit was already split in a previous run
        let split_one = gateway.add_commit_object(commit(&oid(0xf1), &[], "one"));
        let mut config = repositories(&["bundle-foo"]);
        config
            .get_mut("bundle-foo")
            .unwrap()
            .mapping
            .insert(one.clone(), split_one.clone());

        splitter(gateway.clone(), config, None).split().unwrap();

        let tip = gateway.branch("bundle-foo/main").unwrap();
        let tip_commit = gateway.get_commit(&tip).unwrap();
        assert_eq!(tip_commit.parent_hashes(), &[split_one][..]);
    }

    #[test]
    fn stale_seeded_mapping_is_fatal() {
        let gateway = MemoryGateway::new();
        let (one, _) = two_folder_fixture(&gateway);

        // Claims the split side has the bar tree, which cannot match foo
        let bogus = gateway.add_commit_object(commit(&oid(0xb1), &[], "bogus"));
        let mut config = repositories(&["bundle-foo"]);
        config
            .get_mut("bundle-foo")
            .unwrap()
            .mapping
            .insert(one, bogus);

        let error = splitter(gateway, config, None).split().unwrap_err();
        assert!(error.to_string().contains("Invalid mapping"));
    }

    #[test]
    fn empty_tree_root_commit_counts_as_present_in_every_folder() {
        let gateway = MemoryGateway::new();
        let empty = ObjectId::try_parse(Tree::EMPTY_HASH).unwrap();

        let zero = gateway.add_commit_object(commit(&empty, &[], "empty root"));
        gateway.set_remote_branch("mono", "main", zero);

        splitter(gateway.clone(), repositories(&["bundle-foo"]), None)
            .split()
            .unwrap();

        let tip = gateway.branch("bundle-foo/main").unwrap();
        assert_eq!(gateway.get_commit(&tip).unwrap().tree_hash(), &empty);
    }

    #[test]
    fn single_branch_mode_failing_the_filter_is_a_clean_skip() {
        let gateway = MemoryGateway::new();
        two_folder_fixture(&gateway);

        splitter(
            gateway.clone(),
            repositories(&["bundle-foo"]),
            Some("skip-me".to_string()),
        )
        .split()
        .unwrap();

        assert!(gateway.branches().is_empty());
        assert!(gateway.pushed_branches().is_empty());
    }

    #[test]
    fn single_tag_mode_processes_only_that_tag() {
        let gateway = MemoryGateway::new();
        let (_, two) = two_folder_fixture(&gateway);
        gateway.set_remote_tag("mono", "1.0.0", two);

        splitter(
            gateway.clone(),
            repositories(&["bundle-foo"]),
            Some("1.0.0".to_string()),
        )
        .split()
        .unwrap();

        let tag = gateway.tag("remote/bundle-foo/1.0.0").unwrap();
        assert_eq!(gateway.get_commit(&tag).unwrap().tree_hash(), &oid(0xf2));

        assert!(gateway.pushed_branches().is_empty());
        assert_eq!(
            gateway.pushed_tags(),
            vec![(
                (
                    "remote/bundle-foo/1.0.0".to_string(),
                    "bundle-foo".to_string(),
                    "1.0.0".to_string()
                ),
                false
            )]
        );
    }

    #[test]
    fn unknown_branch_or_tag_is_fatal_with_alternatives() {
        let gateway = MemoryGateway::new();
        two_folder_fixture(&gateway);

        let error = splitter(
            gateway,
            repositories(&["bundle-foo"]),
            Some("9.9.9".to_string()),
        )
        .split()
        .unwrap_err();

        let message = format!("{error:#}");
        assert!(message.contains("Branch or tag 9.9.9 not found"));
        assert!(message.contains("main"));
    }

    #[test]
    fn no_matching_branches_is_fatal() {
        let gateway = MemoryGateway::new();
        let root = gateway.add_tree_object(root_tree(&[("bundle-foo", &oid(0xf1))]));
        let one = gateway.add_commit_object(commit(&root, &[], "one"));
        gateway.set_remote_branch("mono", "dev", one);

        let error = splitter(gateway, repositories(&["bundle-foo"]), None)
            .split()
            .unwrap_err();
        assert!(error.to_string().contains("No commits found"));
    }
}
