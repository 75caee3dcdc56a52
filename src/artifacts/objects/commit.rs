//! Git commit object
//!
//! A commit is a raw byte body of the form:
//!
//! ```text
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```
//!
//! The raw bytes stay authoritative: the parsed view only indexes into them,
//! and every edit (`with_tree`, `with_parents`, `with_message`) produces a
//! new commit with a rebuilt body, leaving untouched header lines
//! byte-for-byte intact. Identity-changing edits strip any GPG signature
//! first, since the signed payload is no longer the one that was signed.

use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object::GitObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::{Context, bail};
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;

/// Git commit object: raw body plus the parsed tree and parent hashes.
#[derive(Debug, Clone)]
pub struct Commit {
    raw: Bytes,
    tree: ObjectId,
    parents: Vec<ObjectId>,
}

impl Commit {
    /// Parse a commit from its raw body.
    pub fn new(raw: impl Into<Bytes>) -> anyhow::Result<Self> {
        let raw = raw.into();
        let separator = find_separator(&raw)
            .context("Invalid commit object: missing message separator")?;

        let mut tree = None;
        let mut parents = Vec::new();

        for line in raw[..separator].split(|&b| b == b'\n') {
            if let Some(rest) = line.strip_prefix(b"tree ") {
                tree = Some(parse_hash(rest).context("Invalid commit object: invalid tree line")?);
            } else if let Some(rest) = line.strip_prefix(b"parent ") {
                parents
                    .push(parse_hash(rest).context("Invalid commit object: invalid parent line")?);
            }
        }

        let tree = tree.context("Invalid commit object: missing tree line")?;

        Ok(Commit { raw, tree, parents })
    }

    pub fn tree_hash(&self) -> &ObjectId {
        &self.tree
    }

    pub fn parent_hashes(&self) -> &[ObjectId] {
        &self.parents
    }

    /// The free-text message after the header block. Empty if the commit
    /// has no message.
    pub fn message(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.body())
    }

    /// The committer timestamp with its timezone.
    ///
    /// Errors when the commit carries no committer line; callers that need
    /// a date (deterministic release timestamps) treat that as corrupt input.
    pub fn committer_date(&self) -> anyhow::Result<DateTime<FixedOffset>> {
        let line = self
            .header_lines()
            .find_map(|line| line.strip_prefix(b"committer "))
            .context("Invalid commit object: missing committer line")?;

        let line = String::from_utf8_lossy(line);
        let mut parts = line.rsplitn(3, ' ');
        let zone = parts
            .next()
            .context("Invalid commit object: invalid committer line")?;
        let timestamp = parts
            .next()
            .context("Invalid commit object: invalid committer line")?
            .parse::<i64>()
            .context("Invalid commit object: invalid committer timestamp")?;

        let offset = parse_zone(zone)?;
        let date = DateTime::from_timestamp(timestamp, 0)
            .context("Invalid commit object: committer timestamp out of range")?;

        Ok(date.with_timezone(&offset))
    }

    pub fn has_gpg_signature(&self) -> bool {
        self.header_lines().any(|line| line.starts_with(b"gpgsig "))
    }

    /// A copy of this commit pointing at a different tree.
    pub fn with_tree(&self, tree: &ObjectId) -> anyhow::Result<Self> {
        let unsigned = self.without_gpg_signature()?;
        let lines = unsigned
            .header_lines()
            .map(|line| {
                if line.starts_with(b"tree ") {
                    format!("tree {tree}").into_bytes()
                } else {
                    line.to_vec()
                }
            })
            .collect();

        Self::rebuild(lines, unsigned.body())
    }

    /// A copy of this commit with the given parent list, replacing any
    /// existing parent lines. The new parent lines follow the tree line,
    /// in the order given.
    pub fn with_parents(&self, parents: &[ObjectId]) -> anyhow::Result<Self> {
        let unsigned = self.without_gpg_signature()?;
        let mut lines = Vec::new();

        for line in unsigned.header_lines() {
            if line.starts_with(b"parent ") {
                continue;
            }
            lines.push(line.to_vec());
            if line.starts_with(b"tree ") {
                for parent in parents {
                    lines.push(format!("parent {parent}").into_bytes());
                }
            }
        }

        Self::rebuild(lines, unsigned.body())
    }

    /// A copy of this commit with a different message.
    pub fn with_message(&self, message: &str) -> anyhow::Result<Self> {
        let unsigned = self.without_gpg_signature()?;
        let lines = unsigned.header_lines().map(<[u8]>::to_vec).collect();

        Self::rebuild(lines, message.as_bytes())
    }

    /// A copy of this commit with the `gpgsig ` header and all of its
    /// continuation lines (leading space) removed.
    pub fn without_gpg_signature(&self) -> anyhow::Result<Self> {
        if !self.has_gpg_signature() {
            return Ok(self.clone());
        }

        let mut lines = Vec::new();
        let mut in_signature = false;

        for line in self.header_lines() {
            if line.starts_with(b"gpgsig ") {
                in_signature = true;
                continue;
            }
            if in_signature && line.starts_with(b" ") {
                continue;
            }
            in_signature = false;
            lines.push(line.to_vec());
        }

        Self::rebuild(lines, self.body())
    }

    fn rebuild(lines: Vec<Vec<u8>>, body: &[u8]) -> anyhow::Result<Self> {
        let mut raw = lines.join(&b'\n');
        raw.extend_from_slice(b"\n\n");
        raw.extend_from_slice(body);

        Self::new(raw)
    }

    fn header_lines(&self) -> impl Iterator<Item = &[u8]> {
        // new() guarantees the separator exists
        let separator = find_separator(&self.raw).unwrap_or(self.raw.len());
        self.raw[..separator].split(|&b| b == b'\n')
    }

    fn body(&self) -> &[u8] {
        match find_separator(&self.raw) {
            Some(separator) => &self.raw[separator + 2..],
            None => &[],
        }
    }
}

impl GitObject for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }

    fn raw(&self) -> &Bytes {
        &self.raw
    }
}

impl Serialize for Commit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Commit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<u8>::deserialize(deserializer)?;
        Commit::new(raw).map_err(D::Error::custom)
    }
}

fn find_separator(raw: &[u8]) -> Option<usize> {
    raw.windows(2).position(|window| window == b"\n\n")
}

fn parse_hash(bytes: &[u8]) -> anyhow::Result<ObjectId> {
    let hex = bytes
        .get(..OBJECT_ID_LENGTH)
        .context("truncated object hash")?;

    ObjectId::try_parse(std::str::from_utf8(hex)?)
}

fn parse_zone(zone: &str) -> anyhow::Result<FixedOffset> {
    if zone.len() != 5 || !zone.is_ascii() {
        bail!("Invalid commit object: invalid timezone {zone}");
    }

    let sign = match &zone[..1] {
        "+" => 1,
        "-" => -1,
        _ => bail!("Invalid commit object: invalid timezone {zone}"),
    };
    let hours = zone[1..3]
        .parse::<i32>()
        .with_context(|| format!("Invalid commit object: invalid timezone {zone}"))?;
    let minutes = zone[3..5]
        .parse::<i32>()
        .with_context(|| format!("Invalid commit object: invalid timezone {zone}"))?;

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .with_context(|| format!("Invalid commit object: invalid timezone {zone}"))
}
