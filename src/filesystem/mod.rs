//! In-memory filesystem tree.
//!
//! Nodes live in an arena ([`Tree`]) and are linked in first-child/next-sibling
//! form. [`FileSystem`] owns one tree plus the working-directory cursor and
//! exposes the operations the shell and the snapshot codecs build on.

mod file_system;
mod node;
mod tree;

pub use file_system::FileSystem;
pub(crate) use file_system::is_valid_name;
pub use node::{Node, NodeId, NodeKind};
pub use tree::Tree;
