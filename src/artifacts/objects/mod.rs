//! Git object types and operations
//!
//! Git stores all content as objects identified by SHA-1 hashes. This crate
//! manipulates two of them directly:
//!
//! - **Tree**: Directory listing (modes, names, and object IDs)
//! - **Commit**: Snapshot with metadata (tree, parent commits, message)
//!
//! Blobs are opaque: they are addressed by hash inside trees but never parsed.
//!
//! All objects serialize to the Git object format `<type> <size>\0<content>`,
//! hashed with SHA-1 and compressed with zlib for loose-object storage.

pub mod commit;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;
