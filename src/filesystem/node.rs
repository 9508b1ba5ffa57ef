use derive_more::Display;

use crate::ext::now_epoch_seconds;

/// Stable index of a node inside its [`Tree`](super::Tree) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("#{_0}")]
pub struct NodeId(pub(super) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum NodeKind {
    #[display("directory")]
    Directory,
    #[display("file")]
    File,
}

/// A single directory or file.
///
/// The links encode the tree in first-child/next-sibling form: the children of
/// a node are the chain starting at `first_child` and following
/// `next_sibling`. `parent` is a back-reference used for navigation only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    kind: NodeKind,
    content: String,
    created_at: u64,
    modified_at: u64,
    pub(super) parent: Option<NodeId>,
    pub(super) first_child: Option<NodeId>,
    pub(super) next_sibling: Option<NodeId>,
}

impl Node {
    pub fn directory(name: impl Into<String>) -> Self {
        Self::detached(name.into(), NodeKind::Directory, String::new())
    }

    pub fn file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::detached(name.into(), NodeKind::File, content.into())
    }

    /// Rebuilds a node from persisted fields, keeping its original timestamps.
    pub fn restored(
        name: impl Into<String>,
        kind: NodeKind,
        content: impl Into<String>,
        created_at: u64,
        modified_at: u64,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            content: content.into(),
            created_at,
            modified_at,
            parent: None,
            first_child: None,
            next_sibling: None,
        }
    }

    fn detached(name: String, kind: NodeKind, content: String) -> Self {
        let now = now_epoch_seconds();
        Self::restored(name, kind, content, now, now)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn modified_at(&self) -> u64 {
        self.modified_at
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }

    /// Compares the entry itself, ignoring links.
    pub fn same_entry(&self, other: &Node) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.content == other.content
            && self.created_at == other.created_at
            && self.modified_at == other.modified_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_nodes_are_detached_with_equal_timestamps() {
        let node = Node::file("notes.txt", "Hello");
        assert_eq!(node.parent(), None);
        assert_eq!(node.first_child(), None);
        assert_eq!(node.next_sibling(), None);
        assert_eq!(node.created_at(), node.modified_at());
        assert!(!node.is_directory());
    }

    #[test]
    fn directories_have_no_content() {
        let node = Node::directory("home");
        assert!(node.is_directory());
        assert_eq!(node.content(), "");
    }

    #[test]
    fn restored_keeps_timestamps() {
        let node = Node::restored("a", NodeKind::File, "x", 10, 20);
        assert_eq!(node.created_at(), 10);
        assert_eq!(node.modified_at(), 20);
    }

    #[test]
    fn kind_display() {
        assert_eq!(NodeKind::Directory.to_string(), "directory");
        assert_eq!(NodeKind::File.to_string(), "file");
    }
}
