use crate::areas::cache::ObjectsCache;
use crate::areas::repository::Repository;
use crate::artifacts::merge::Merger;
use crate::config::MonorepoConfig;
use anyhow::Context;
use std::path::Path;

const MERGE_CACHE_DIR: &str = ".monorepo-merge-cache";

/// Merge the configured per-folder repositories into one monorepo, built
/// in the local merge cache directory. The resulting branch and tag refs
/// are left there for the operator to inspect and push.
pub fn run(root: &Path) -> anyhow::Result<()> {
    let config = MonorepoConfig::load(root)?;

    let repo_dir = root.join(MERGE_CACHE_DIR).join("repo");
    if repo_dir.exists() {
        std::fs::remove_dir_all(&repo_dir)
            .with_context(|| format!("Unable to remove {}", repo_dir.display()))?;
    }
    std::fs::create_dir_all(&repo_dir)
        .with_context(|| format!("Unable to create directory {}", repo_dir.display()))?;

    let repository = Repository::new(&repo_dir, Box::new(std::io::stdout()));

    let repositories = config
        .repositories
        .into_iter()
        .map(|(folder, repository)| (folder, repository.url))
        .collect();

    Merger::new(
        repositories,
        config.ignore_commits,
        config.version_aliases,
        repository,
        ObjectsCache::in_memory(),
        Box::new(std::io::stdout()),
    )
    .merge()?;

    Ok(())
}
