//! Git data structures and history rewriting algorithms
//!
//! This module contains the core types and algorithms:
//!
//! - `objects`: Git object types (commit, tree) with content-addressed hashing
//! - `history`: Commit DAG traversal
//! - `split`: Project a monorepo DAG into per-folder DAGs
//! - `merge`: Fold per-folder DAGs into one monorepo DAG

pub mod history;
pub mod merge;
pub mod objects;
pub mod split;
