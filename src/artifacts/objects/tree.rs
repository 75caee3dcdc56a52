//! Git tree object
//!
//! Trees represent directory snapshots. The raw body is a sequence of
//! entries in the binary format `<mode> <name>\0<20-byte-sha1>`. The hash
//! is raw bytes, not hex text, so parsing walks the buffer by locating the
//! next space and the next NUL from the current offset.
//!
//! Trees can be:
//! - parsed from raw bytes (`new`)
//! - synthesized as a single directory entry wrapping a subtree (`wrap`)
//! - combined from already-encoded trees (`from_trees`)

use crate::artifacts::objects::object::GitObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::bail;
use bytes::Bytes;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Git tree object: raw binary body plus a parsed name → hash index.
///
/// The raw bytes stay authoritative: hashing and encoding always use them,
/// so re-encoding a parsed tree is byte-identical to its source.
#[derive(Debug, Clone)]
pub struct Tree {
    raw: Bytes,
    entries: BTreeMap<String, ObjectId>,
}

impl Tree {
    /// Hash of the canonical empty tree (zero entries).
    ///
    /// Used as a sentinel for "this folder has no content at this commit";
    /// it must be special-cased rather than treated as a lookup failure,
    /// since the object usually does not exist on disk.
    pub const EMPTY_HASH: &'static str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

    /// Mode of a directory entry inside a tree.
    const DIRECTORY_MODE: &'static str = "40000";

    /// Parse a tree from its raw binary body.
    pub fn new(raw: impl Into<Bytes>) -> anyhow::Result<Self> {
        let raw = raw.into();
        let mut entries = BTreeMap::new();

        let mut offset = 0;
        while offset < raw.len() {
            let space = raw[offset..].iter().position(|&b| b == b' ');
            let nul = raw[offset..].iter().position(|&b| b == b'\0');

            let (space, nul) = match (space, nul) {
                (Some(space), Some(nul)) if space < nul => (offset + space, offset + nul),
                _ => bail!("Invalid tree object."),
            };

            if raw.len() < nul + 21 {
                bail!("Invalid tree object.");
            }

            let Ok(name) = std::str::from_utf8(&raw[space + 1..nul]) else {
                bail!("Invalid tree object.");
            };
            let hash = ObjectId::read_binary_from(&raw[nul + 1..nul + 21])?;

            entries.insert(name.to_string(), hash);
            offset = nul + 21;
        }

        Ok(Tree { raw, entries })
    }

    /// Synthesize a single-entry tree wrapping one subfolder.
    pub fn wrap(folder: &str, subtree: &ObjectId) -> anyhow::Result<Self> {
        let mut raw = Vec::new();
        raw.extend_from_slice(Self::DIRECTORY_MODE.as_bytes());
        raw.push(b' ');
        raw.extend_from_slice(folder.as_bytes());
        raw.push(0);
        subtree.write_binary_to(&mut raw)?;

        Self::new(raw)
    }

    /// Combine already-encoded trees into one by concatenating their raw
    /// bodies. The inputs must be presorted by entry name; git requires
    /// canonical entry ordering, and this function does not re-sort.
    pub fn from_trees(trees: &[Tree]) -> anyhow::Result<Self> {
        let mut raw = Vec::new();
        for tree in trees {
            raw.extend_from_slice(tree.raw());
        }

        Self::new(raw)
    }

    /// Hash of the entry with the given name, if present.
    pub fn subtree_hash(&self, name: &str) -> Option<&ObjectId> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &ObjectId)> {
        self.entries.iter()
    }
}

impl GitObject for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn raw(&self) -> &Bytes {
        &self.raw
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Tree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<u8>::deserialize(deserializer)?;
        Tree::new(raw).map_err(D::Error::custom)
    }
}
