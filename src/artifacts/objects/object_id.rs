//! Git object identifier (SHA-1 hash)
//!
//! Object IDs are 40-character lowercase hexadecimal strings. They uniquely
//! identify all objects in Git (blobs, trees, commits).
//!
//! ## Storage
//!
//! Loose objects are stored in `objects/<first-2-chars>/<remaining-38-chars>`.

use crate::artifacts::objects::OBJECT_ID_LENGTH;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::io;
use std::path::PathBuf;

/// Git object identifier (SHA-1 hash)
///
/// A validated 40-character hexadecimal string. Inside tree objects the hash
/// is stored as 20 raw bytes; `write_binary_to` and `read_binary_from`
/// convert between the two encodings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object ID from a string
    pub fn try_parse(id: impl Into<String>) -> anyhow::Result<Self> {
        let id = id.into();
        if id.len() != OBJECT_ID_LENGTH {
            return Err(anyhow::anyhow!("Invalid object ID length: {}", id.len()));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        {
            return Err(anyhow::anyhow!("Invalid object ID characters: {}", id));
        }
        Ok(Self(id))
    }

    /// Wrap a string that is known to be a valid lowercase hex digest,
    /// e.g. the output of a SHA-1 hasher.
    pub(crate) fn new_unchecked(id: String) -> Self {
        Self(id)
    }

    /// Write the object ID in binary format (20 bytes)
    ///
    /// Used when serializing tree entries, which store raw hash bytes
    /// rather than hex text.
    pub fn write_binary_to<W: io::Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        for i in (0..OBJECT_ID_LENGTH).step_by(2) {
            let byte = u8::from_str_radix(&self.0[i..i + 2], 16)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Invalid hex digit"))?;
            writer.write_all(&[byte])?;
        }

        Ok(())
    }

    /// Read an object ID from binary format (20 bytes)
    pub fn read_binary_from(bytes: &[u8]) -> anyhow::Result<Self> {
        if bytes.len() != OBJECT_ID_LENGTH / 2 {
            return Err(anyhow::anyhow!(
                "Invalid binary object ID length: {}",
                bytes.len()
            ));
        }

        let mut hex40 = String::with_capacity(OBJECT_ID_LENGTH);
        for byte in bytes {
            hex40.push_str(&format!("{byte:02x}"));
        }

        Ok(Self(hex40))
    }

    /// Convert to the loose-object path `XX/YYYY...` where XX is the first
    /// two characters of the hash.
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        ObjectId::try_parse(id).map_err(D::Error::custom)
    }
}
