use crate::areas::cache::ObjectsCache;
use crate::areas::repository::Repository;
use crate::artifacts::split::Splitter;
use crate::config::MonorepoConfig;
use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};

const DEFAULT_CACHE_DIR: &str = ".monorepo-split-cache";

/// Split the monorepo described by the configuration in `root` into its
/// per-folder repositories.
///
/// `branch_or_tag` restricts the run to a single ref; `cache_dir` overrides
/// the cache location; `force_push` force-pushes branches (never tags).
pub fn run(
    root: &Path,
    branch_or_tag: Option<String>,
    cache_dir: Option<PathBuf>,
    force_push: bool,
) -> anyhow::Result<()> {
    let config = MonorepoConfig::load(root)?;

    let cache_dir = cache_dir.unwrap_or_else(|| root.join(DEFAULT_CACHE_DIR));
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Unable to create directory {}", cache_dir.display()))?;

    let mut writer: Box<dyn Write> = Box::new(std::io::stdout());
    let cache = ObjectsCache::load(&cache_dir)?;
    if !cache.is_empty() {
        writeln!(writer, "\nLoaded {} objects from cache", cache.len())?;
    }

    // The working repository is rebuilt from scratch on every run; all
    // continuity lives in the cache and the configured mapping
    let repo_dir = cache_dir.join("repo");
    if repo_dir.exists() {
        std::fs::remove_dir_all(&repo_dir)
            .with_context(|| format!("Unable to remove {}", repo_dir.display()))?;
    }
    std::fs::create_dir_all(&repo_dir)
        .with_context(|| format!("Unable to create directory {}", repo_dir.display()))?;

    let repository = Repository::new(&repo_dir, Box::new(std::io::stdout()));

    Splitter::new(
        config.monorepo_url,
        config.branch_filter,
        config.repositories,
        branch_or_tag,
        force_push,
        repository,
        cache,
        writer,
    )
    .split()
}
