//! Declarative configuration loading
//!
//! A monorepo is described by a `monorepo.toml` (or `.monorepo.json`) in the
//! project directory:
//!
//! ```toml
//! monorepo_url = "https://github.com/example/monorepo.git"
//! branch_filter = "^(main|\\d+\\.\\d+)$"
//!
//! [repositories.bundle-foo]
//! url = "https://github.com/example/foo.git"
//!
//! [repositories.bundle-foo.mapping]
//! "<monorepo commit>" = "<split commit>"
//!
//! [merge]
//! ignore_commits = []
//! ```
//!
//! Raw values are validated into typed form at load time: the branch filter
//! is compiled, every mapping hash is parsed, and repository URLs get the
//! `GITHUB_TOKEN` environment credential substituted in.

use crate::artifacts::merge::version_chain;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::split::SplitRepository;
use anyhow::{Context, bail};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

const TOML_FILE_NAME: &str = "monorepo.toml";
const JSON_FILE_NAME: &str = ".monorepo.json";

#[derive(Debug, Deserialize)]
struct RawConfig {
    monorepo_url: String,
    branch_filter: String,
    repositories: BTreeMap<String, RawRepository>,
    #[serde(default)]
    merge: RawMerge,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    url: String,
    #[serde(default)]
    mapping: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMerge {
    #[serde(default)]
    ignore_commits: Vec<String>,
    #[serde(default)]
    version_aliases: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct MonorepoConfig {
    pub monorepo_url: String,
    pub branch_filter: Regex,
    pub repositories: BTreeMap<String, SplitRepository>,
    pub ignore_commits: HashSet<ObjectId>,
    pub version_aliases: BTreeMap<String, String>,
}

impl MonorepoConfig {
    /// Load and validate the configuration from the project directory.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let toml_path = root.join(TOML_FILE_NAME);
        if toml_path.exists() {
            let content = std::fs::read_to_string(&toml_path)
                .with_context(|| format!("Unable to read {}", toml_path.display()))?;
            let raw = toml::from_str(&content)
                .with_context(|| format!("Unable to parse {}", toml_path.display()))?;
            return Self::validate(raw);
        }

        let json_path = root.join(JSON_FILE_NAME);
        if json_path.exists() {
            let content = std::fs::read_to_string(&json_path)
                .with_context(|| format!("Unable to read {}", json_path.display()))?;
            let raw = serde_json::from_str(&content)
                .with_context(|| format!("Unable to parse {}", json_path.display()))?;
            return Self::validate(raw);
        }

        bail!(
            "No {TOML_FILE_NAME} or {JSON_FILE_NAME} found in {}",
            root.display()
        );
    }

    fn validate(raw: RawConfig) -> anyhow::Result<Self> {
        let branch_filter = Regex::new(&raw.branch_filter)
            .with_context(|| format!("Invalid branch filter {:?}", raw.branch_filter))?;

        let mut repositories = BTreeMap::new();
        for (folder, repository) in raw.repositories {
            let mut mapping = BTreeMap::new();
            for (mono, split) in repository.mapping {
                mapping.insert(
                    ObjectId::try_parse(mono).with_context(|| {
                        format!("Invalid mapping hash in repository {folder}")
                    })?,
                    ObjectId::try_parse(split).with_context(|| {
                        format!("Invalid mapping hash in repository {folder}")
                    })?,
                );
            }

            repositories.insert(
                folder,
                SplitRepository::new(with_auth_token(&repository.url), mapping),
            );
        }

        let mut ignore_commits = HashSet::new();
        for hash in raw.merge.ignore_commits {
            ignore_commits.insert(ObjectId::try_parse(hash).context("Invalid ignored commit")?);
        }

        let version_aliases = if raw.merge.version_aliases.is_empty() {
            version_chain::default_aliases()
        } else {
            raw.merge.version_aliases
        };

        Ok(MonorepoConfig {
            monorepo_url: with_auth_token(&raw.monorepo_url),
            branch_filter,
            repositories,
            ignore_commits,
            version_aliases,
        })
    }
}

/// Substitute the `GITHUB_TOKEN` credential into github.com URLs, so CI
/// runs can push without an interactive credential helper.
fn with_auth_token(url: &str) -> String {
    if let Ok(token) = std::env::var("GITHUB_TOKEN")
        && !token.is_empty()
        && let Some(rest) = url.strip_prefix("https://github.com/")
    {
        return format!("https://{token}@github.com/{rest}");
    }

    url.to_string()
}
