//! Merger: fold per-folder repository histories into one monorepo DAG
//!
//! The inverse of the splitter. Every source repository's history is first
//! relocated under its folder name (each commit's tree wrapped in a
//! single-entry directory tree, parents remapped); then, per branch and per
//! tag name appearing in any source, one merge commit is created whose tree
//! is the sorted combination of the sources' relocated trees and whose
//! parents are the contributing relocated tips.
//!
//! Relocation always creates a new commit: nesting a tree under a folder
//! prefix is never a no-op, so the splitter's collapse rule does not apply
//! here.

pub mod version_chain;

use crate::areas::cache::ObjectsCache;
use crate::areas::gateway::Gateway;
use crate::artifacts::history::{self, ReadOptions};
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::GitObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use anyhow::{Context, bail};
use colored::Colorize;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;

/// Per-folder mapping of relocated (monorepo-side) hash → original split
/// hash, dumped at the end of a merge to seed a future split configuration.
pub type ExportMapping = BTreeMap<String, BTreeMap<ObjectId, ObjectId>>;

/// Relocated branch and tag tips of one source repository.
#[derive(Debug, Default)]
struct FolderHeads {
    branches: BTreeMap<String, ObjectId>,
    tags: BTreeMap<String, ObjectId>,
}

pub struct Merger<G: Gateway> {
    repositories: BTreeMap<String, String>,
    ignore_commits: HashSet<ObjectId>,
    version_aliases: BTreeMap<String, String>,
    repository: G,
    cache: ObjectsCache,
    writer: RefCell<Box<dyn Write>>,
    export_mapping: ExportMapping,
}

impl<G: Gateway> Merger<G> {
    pub fn new(
        repositories: BTreeMap<String, String>,
        ignore_commits: HashSet<ObjectId>,
        version_aliases: BTreeMap<String, String>,
        repository: G,
        cache: ObjectsCache,
        writer: Box<dyn Write>,
    ) -> Self {
        Merger {
            repositories,
            ignore_commits,
            version_aliases,
            repository,
            cache,
            writer: RefCell::new(writer),
            export_mapping: ExportMapping::new(),
        }
    }

    /// Run the merge. Returns the export mapping for the operator to seed
    /// a future split configuration with.
    pub fn merge(mut self) -> anyhow::Result<ExportMapping> {
        self.banner("Load repositories...")?;

        self.repository.init()?;

        let folders: Vec<String> = self.repositories.keys().cloned().collect();
        for folder in &folders {
            let url = self.repositories[folder].clone();
            self.repository.add_remote(folder, &url)?;
        }
        self.repository.fetch_concurrent(&folders)?;
        for folder in &folders {
            self.repository
                .fetch_tags(folder, &format!("remote/{folder}/"))?;
        }

        self.banner("Merge repositories...")?;
        let mut heads_by_folder: BTreeMap<String, FolderHeads> = BTreeMap::new();
        for folder in &folders {
            let heads = self.merge_repo(folder)?;
            heads_by_folder.insert(folder.clone(), heads);
        }

        self.banner("Create branches and tags...")?;

        let mut branch_trees: BTreeMap<String, BTreeMap<String, ObjectId>> = BTreeMap::new();
        let mut tag_trees: BTreeMap<String, BTreeMap<String, ObjectId>> = BTreeMap::new();
        for (folder, heads) in &heads_by_folder {
            for (branch, commit) in &heads.branches {
                let tree = self.commit_object(commit)?.tree_hash().clone();
                branch_trees
                    .entry(branch.clone())
                    .or_default()
                    .insert(folder.clone(), tree);
            }
            for (tag, commit) in &heads.tags {
                let tree = self.commit_object(commit)?.tree_hash().clone();
                tag_trees
                    .entry(tag.clone())
                    .or_default()
                    .insert(folder.clone(), tree);
            }
        }

        for (branch, trees_by_folder) in &branch_trees {
            let combined = self.combine_trees(trees_by_folder)?;
            let parents: Vec<ObjectId> = heads_by_folder
                .values()
                .filter_map(|heads| heads.branches.get(branch).cloned())
                .collect();

            let merge_commit =
                self.repository
                    .commit_tree(&combined, "Merge split repositories", &parents, false)?;
            self.repository.add_branch(branch, &merge_commit)?;
        }

        for (tag, trees_by_folder) in &tag_trees {
            let combined = self.combine_trees(trees_by_folder)?;

            let mut parents = Vec::new();
            for (folder, heads) in &heads_by_folder {
                match version_chain::resolve(tag, &heads.tags, &self.version_aliases) {
                    Some(commit) => parents.push(commit),
                    None => {
                        writeln!(
                            self.writer.borrow_mut(),
                            "{}",
                            format!("  Missing {tag} in {folder}").on_red()
                        )?;
                    }
                }
            }

            let tag_commit = self.repository.commit_tree(
                &combined,
                &format!("Version {tag}"),
                &parents,
                true,
            )?;
            self.repository.add_tag(tag, &tag_commit)?;
        }

        self.banner("Done.")?;
        self.banner("Use this mapping for the split configuration:")?;
        let dump = self.render_export_mapping();
        writeln!(self.writer.borrow_mut(), "{dump}")?;

        Ok(self.export_mapping)
    }

    /// Relocate one source repository under its folder: read its reachable
    /// commits, rewrite each one topologically, re-create its tags under
    /// `<folder>-<tag>`, and return the relocated branch/tag tips.
    fn merge_repo(&mut self, folder: &str) -> anyhow::Result<FolderHeads> {
        let branch_commits = self.repository.get_remote_branches(folder)?;

        let starts: Vec<ObjectId> = branch_commits.values().cloned().collect();
        let ignore = self.ignore_commits.clone();
        let commits = history::read_commits(
            &starts,
            ReadOptions {
                stop_at: None,
                ignore: Some(&ignore),
            },
            |hash| self.commit_object(hash),
        )?;

        if commits.is_empty() {
            bail!("No commits found for: {branch_commits:#?}");
        }

        let hash_mapping = self.move_commits_to_subfolder(&commits, folder)?;

        if hash_mapping.is_empty() {
            bail!(
                "No hash mapping for commits: {:#?}",
                commits.keys().collect::<Vec<_>>()
            );
        }

        let tags = self.repository.get_tags(&format!("remote/{folder}/"))?;

        let mut heads = FolderHeads::default();

        for (branch, commit) in &branch_commits {
            let mapped = hash_mapping
                .get(commit)
                .with_context(|| format!("Missing commit hash {commit} for branch {branch}"))?;
            heads.branches.insert(branch.clone(), mapped.clone());
            self.export_mapping
                .entry(folder.to_string())
                .or_default()
                .insert(mapped.clone(), commit.clone());
        }

        for (tag, commit) in &tags {
            let mapped = hash_mapping.get(commit).with_context(|| {
                format!("Missing commit hash {commit} for tag {tag}. {hash_mapping:#?}")
            })?;
            self.repository.add_tag(&format!("{folder}-{tag}"), mapped)?;
            heads.tags.insert(tag.clone(), mapped.clone());
            self.repository.remove_tag(&format!("remote/{folder}/{tag}"))?;
        }

        self.repository.remove_remote(folder)?;

        Ok(heads)
    }

    /// Topological worklist over one source's commits; every commit is
    /// rewritten exactly once, after all of its (non-ignored) parents.
    fn move_commits_to_subfolder(
        &mut self,
        commits: &HashMap<ObjectId, Commit>,
        folder: &str,
    ) -> anyhow::Result<HashMap<ObjectId, ObjectId>> {
        let mut mapping: HashMap<ObjectId, ObjectId> = HashMap::new();
        let mut pending: Vec<ObjectId> = commits.keys().cloned().collect();

        while let Some(current) = pending.pop() {
            if mapping.contains_key(&current) {
                continue;
            }

            let commit = commits
                .get(&current)
                .with_context(|| format!("Commit {current} missing from the read set"))?;

            let missing: Vec<ObjectId> = commit
                .parent_hashes()
                .iter()
                .filter(|parent| {
                    !mapping.contains_key(*parent) && !self.ignore_commits.contains(*parent)
                })
                .cloned()
                .collect();

            if !missing.is_empty() {
                pending.push(current);
                pending.extend(missing);
                continue;
            }

            let new_hash = self.move_commit_to_subfolder(commit, folder, &mapping)?;
            mapping.insert(current, new_hash);
        }

        Ok(mapping)
    }

    /// Rewrite one commit to live under `folder`: wrap its root tree in a
    /// directory entry (the empty tree passes through unchanged), remap its
    /// parents, and tag the message with the folder for traceability.
    fn move_commit_to_subfolder(
        &mut self,
        commit: &Commit,
        folder: &str,
        mapping: &HashMap<ObjectId, ObjectId>,
    ) -> anyhow::Result<ObjectId> {
        let tree_hash = commit.tree_hash();
        let new_tree = if tree_hash.as_ref() == Tree::EMPTY_HASH {
            tree_hash.clone()
        } else {
            let tree = Tree::wrap(folder, tree_hash)?;
            self.repository.add_object(&tree)?;
            let hash = tree.hash();
            self.cache.insert_tree(hash.clone(), tree);
            hash
        };

        let mut new_parents = Vec::new();
        for parent in commit.parent_hashes() {
            if self.ignore_commits.contains(parent) {
                continue;
            }
            let mapped = mapping
                .get(parent)
                .with_context(|| format!("Parent {parent} has not been relocated yet"))?;
            new_parents.push(mapped.clone());
        }

        let new_commit = commit
            .with_tree(&new_tree)?
            .with_parents(&new_parents)?
            .with_message(&format!("[{folder}] {}", commit.message()))?;
        self.repository.add_object(&new_commit)?;

        let new_hash = new_commit.hash();
        self.cache.insert_commit(new_hash.clone(), new_commit);

        Ok(new_hash)
    }

    /// Combine per-folder subtrees into one root tree. The map iterates in
    /// folder-name order, which is exactly the entry order the combined
    /// tree needs, since each relocated tree carries its folder name as its
    /// single entry.
    fn combine_trees(
        &mut self,
        trees_by_folder: &BTreeMap<String, ObjectId>,
    ) -> anyhow::Result<ObjectId> {
        let mut parts = Vec::new();
        for hash in trees_by_folder.values() {
            parts.push(self.tree_object(hash)?);
        }

        let combined = Tree::from_trees(&parts)?;
        self.repository.add_object(&combined)?;

        let hash = combined.hash();
        self.cache.insert_tree(hash.clone(), combined);

        Ok(hash)
    }

    fn render_export_mapping(&self) -> String {
        let mut dump = String::new();
        for (folder, mapping) in &self.export_mapping {
            dump.push_str(&format!("[repositories.\"{folder}\".mapping]\n"));
            for (mono, split) in mapping {
                dump.push_str(&format!("\"{mono}\" = \"{split}\"\n"));
            }
        }

        dump
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

    fn commit(tree: &ObjectId, parents: &[&ObjectId], timestamp: i64, message: &str) -> Commit {
        let mut raw = format!("tree {tree}\n");
        for parent in parents {
            raw.push_str(&format!("parent {parent}\n"));
        }
        raw.push_str(&format!(
            "author Jane Doe <jane@example.com> {timestamp} +0000\n\
             committer Jane Doe <jane@example.com> {timestamp} +0000\n\n{message}"
        ));

        Commit::new(Bytes::from(raw)).unwrap()
    }

    fn merger(
        gateway: MemoryGateway,
        repositories: &[&str],
        ignore_commits: HashSet<ObjectId>,
    ) -> Merger<MemoryGateway> {
        Merger::new(
            repositories
                .iter()
                .map(|folder| {
                    (
                        folder.to_string(),
                        format!("https://example.com/{folder}.git"),
                    )
                })
                .collect(),
            ignore_commits,
            version_chain::default_aliases(),
            gateway,
            ObjectsCache::in_memory(),
            Box::new(std::io::sink()),
        )
    }

    /// Two sources: pkg-a with two commits and tag 1.0.0, pkg-b with one
    /// commit and tags 1.0.0 and 1.0.1.
    fn two_source_fixture(gateway: &MemoryGateway) -> (ObjectId, ObjectId) {
        let a_one = gateway.add_commit_object(commit(&oid(0xa1), &[], 1600000000, "a one"));
        let a_two =
            gateway.add_commit_object(commit(&oid(0xa2), &[&a_one], 1600000500, "a two"));
        let b_one = gateway.add_commit_object(commit(&oid(0xb1), &[], 1600001000, "b one"));

        gateway.set_remote_branch("pkg-a", "main", a_two.clone());
        gateway.set_remote_branch("pkg-b", "main", b_one.clone());
        gateway.set_remote_tag("pkg-a", "1.0.0", a_two.clone());
        gateway.set_remote_tag("pkg-b", "1.0.0", b_one.clone());
        gateway.set_remote_tag("pkg-b", "1.0.1", b_one.clone());

        (a_two, b_one)
    }

    #[test]
    fn merges_branches_across_sources() {
        let gateway = MemoryGateway::new();
        two_source_fixture(&gateway);

        merger(gateway.clone(), &["pkg-a", "pkg-b"], HashSet::new())
            .merge()
            .unwrap();

        let tip = gateway.branch("main").unwrap();
        let merge_commit = gateway.get_commit(&tip).unwrap();
        assert_eq!(merge_commit.parent_hashes().len(), 2);

        // The combined root tree nests each source under its folder name
        let tree = gateway.get_tree(merge_commit.tree_hash()).unwrap();
        assert_eq!(tree.subtree_hash("pkg-a"), Some(&oid(0xa2)));
        assert_eq!(tree.subtree_hash("pkg-b"), Some(&oid(0xb1)));

        // Parents are the relocated tips, in folder order
        let parent_a = gateway.get_commit(&merge_commit.parent_hashes()[0]).unwrap();
        assert_eq!(parent_a.message(), "[pkg-a] a two");
        let parent_b = gateway.get_commit(&merge_commit.parent_hashes()[1]).unwrap();
        assert_eq!(parent_b.message(), "[pkg-b] b one");

        // Relocation preserved the source ancestry
        assert_eq!(parent_a.parent_hashes().len(), 1);
        let grandparent = gateway.get_commit(&parent_a.parent_hashes()[0]).unwrap();
        assert_eq!(grandparent.message(), "[pkg-a] a one");
        assert!(grandparent.parent_hashes().is_empty());

        // Relocated trees wrap the original roots
        let relocated_tree = gateway.get_tree(parent_a.tree_hash()).unwrap();
        assert_eq!(relocated_tree.subtree_hash("pkg-a"), Some(&oid(0xa2)));

        assert_eq!(
            gateway.removed_remotes(),
            vec!["pkg-a".to_string(), "pkg-b".to_string()]
        );
    }

    #[test]
    fn tags_combine_with_dates_copied_from_the_latest_parent() {
        let gateway = MemoryGateway::new();
        two_source_fixture(&gateway);

        merger(gateway.clone(), &["pkg-a", "pkg-b"], HashSet::new())
            .merge()
            .unwrap();

        let tag = gateway.tag("1.0.0").unwrap();
        let tag_commit = gateway.get_commit(&tag).unwrap();
        assert_eq!(tag_commit.parent_hashes().len(), 2);
        assert_eq!(tag_commit.committer_date().unwrap().timestamp(), 1600001000);
        assert_eq!(tag_commit.message(), "Version 1.0.0");
    }

    #[test]
    fn missing_tags_resolve_through_the_fallback_chain() {
        let gateway = MemoryGateway::new();
        two_source_fixture(&gateway);

        merger(gateway.clone(), &["pkg-a", "pkg-b"], HashSet::new())
            .merge()
            .unwrap();

        // pkg-a has no 1.0.1; its 1.0.0 stands in as the parent, while the
        // combined tree only carries the folders that have the exact tag
        let tag = gateway.tag("1.0.1").unwrap();
        let tag_commit = gateway.get_commit(&tag).unwrap();
        assert_eq!(tag_commit.parent_hashes().len(), 2);

        let tree = gateway.get_tree(tag_commit.tree_hash()).unwrap();
        assert_eq!(tree.subtree_hash("pkg-a"), None);
        assert_eq!(tree.subtree_hash("pkg-b"), Some(&oid(0xb1)));

        let fallback_parent = gateway.get_commit(&tag_commit.parent_hashes()[0]).unwrap();
        assert_eq!(fallback_parent.message(), "[pkg-a] a two");
    }

    #[test]
    fn relocated_tags_are_renamed_per_folder() {
        let gateway = MemoryGateway::new();
        two_source_fixture(&gateway);

        merger(gateway.clone(), &["pkg-a", "pkg-b"], HashSet::new())
            .merge()
            .unwrap();

        let folder_tag = gateway.tag("pkg-a-1.0.0").unwrap();
        assert_eq!(
            gateway.get_commit(&folder_tag).unwrap().message(),
            "[pkg-a] a two"
        );

        // The fetched per-folder aliases are cleaned up afterwards
        assert_eq!(gateway.tag("remote/pkg-a/1.0.0"), None);
        assert_eq!(gateway.tag("remote/pkg-b/1.0.1"), None);
    }

    #[test]
    fn export_mapping_links_relocated_tips_to_source_commits() {
        let gateway = MemoryGateway::new();
        let (a_two, b_one) = two_source_fixture(&gateway);

        let export = merger(gateway.clone(), &["pkg-a", "pkg-b"], HashSet::new())
            .merge()
            .unwrap();

        let tip = gateway.branch("main").unwrap();
        let merge_commit = gateway.get_commit(&tip).unwrap();

        let relocated_a = &merge_commit.parent_hashes()[0];
        let relocated_b = &merge_commit.parent_hashes()[1];
        assert_eq!(export["pkg-a"].get(relocated_a), Some(&a_two));
        assert_eq!(export["pkg-b"].get(relocated_b), Some(&b_one));
    }

    #[test]
    fn ignored_commits_are_treated_as_roots() {
        let gateway = MemoryGateway::new();
        let one = gateway.add_commit_object(commit(&oid(0xc1), &[], 1600000000, "pre"));
        let two = gateway.add_commit_object(commit(&oid(0xc2), &[&one], 1600000100, "post"));
        gateway.set_remote_branch("pkg-a", "main", two);

        let mut ignore = HashSet::new();
        ignore.insert(one);

        merger(gateway.clone(), &["pkg-a"], ignore).merge().unwrap();

        let tip = gateway.branch("main").unwrap();
        let merge_commit = gateway.get_commit(&tip).unwrap();
        let relocated = gateway.get_commit(&merge_commit.parent_hashes()[0]).unwrap();
        assert_eq!(relocated.message(), "[pkg-a] post");
        assert!(relocated.parent_hashes().is_empty());
    }

    #[test]
    fn empty_source_trees_pass_through_unwrapped() {
        let gateway = MemoryGateway::new();
        let empty = ObjectId::try_parse(Tree::EMPTY_HASH).unwrap();
        let one = gateway.add_commit_object(commit(&empty, &[], 1600000000, "nothing"));
        gateway.set_remote_branch("pkg-a", "main", one);

        merger(gateway.clone(), &["pkg-a"], HashSet::new())
            .merge()
            .unwrap();

        let tip = gateway.branch("main").unwrap();
        let merge_commit = gateway.get_commit(&tip).unwrap();
        let relocated = gateway.get_commit(&merge_commit.parent_hashes()[0]).unwrap();
        assert_eq!(relocated.tree_hash(), &empty);
    }

    #[test]
    fn tags_pointing_outside_the_relocated_set_are_fatal() {
        let gateway = MemoryGateway::new();
        let one = gateway.add_commit_object(commit(&oid(0xc1), &[], 1600000000, "one"));
        let stray = gateway.add_commit_object(commit(&oid(0xc9), &[], 1600000000, "stray"));
        gateway.set_remote_branch("pkg-a", "main", one);
        gateway.set_remote_tag("pkg-a", "2.0.0", stray);

        let error = merger(gateway, &["pkg-a"], HashSet::new())
            .merge()
            .unwrap_err();
        assert!(error.to_string().contains("Missing commit hash"));
    }

    #[test]
    fn sources_without_commits_are_fatal() {
        let gateway = MemoryGateway::new();

        let error = merger(gateway, &["pkg-a"], HashSet::new())
            .merge()
            .unwrap_err();
        assert!(error.to_string().contains("No commits found"));
    }
}
