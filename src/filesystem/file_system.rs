use snafu::{Snafu, ensure};
use tracing::debug;

use super::{Node, NodeId, NodeKind, Tree};

/// Navigation verb that moves the cursor one level up.
pub const PARENT_DIRECTORY: &str = "..";

/// A filesystem tree together with its working-directory cursor.
#[derive(Debug, Clone)]
pub struct FileSystem {
    tree: Tree,
    current: NodeId,
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem {
    pub fn new() -> Self {
        Self::from_tree(Tree::new())
    }

    pub fn from_tree(tree: Tree) -> Self {
        let current = tree.root();
        Self { tree, current }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn create_directory(&mut self, name: &str) -> Result<NodeId, FilesystemError> {
        self.create(Node::directory(name))
    }

    pub fn create_file(
        &mut self,
        name: &str,
        content: impl Into<String>,
    ) -> Result<NodeId, FilesystemError> {
        self.create(Node::file(name, content))
    }

    fn create(&mut self, node: Node) -> Result<NodeId, FilesystemError> {
        let name = node.name();
        ensure!(
            is_valid_name(name),
            InvalidNameSnafu {
                name: name.to_string()
            }
        );
        ensure!(
            self.lookup_child(self.current, name).is_none(),
            DuplicateNameSnafu {
                name: name.to_string()
            }
        );

        let kind = node.kind();
        let id = self.tree.prepend_child(self.current, node);
        debug!(
            "Created {} '{}' under {}",
            kind,
            self.tree.node(id).name(),
            self.working_directory()
        );
        Ok(id)
    }

    /// `None` when `node` has no child called `name`, or when `node` does not
    /// belong to the current tree.
    pub fn lookup_child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.tree.get(node)?;
        self.tree.find_child(node, name)
    }

    /// Moves the cursor one level: `..` goes to the parent (staying put at the
    /// root), any other name must be a directory directly under the cursor.
    pub fn change_directory(&mut self, name: &str) -> Result<(), FilesystemError> {
        if name == PARENT_DIRECTORY {
            if let Some(parent) = self.tree.node(self.current).parent() {
                self.current = parent;
            }
            debug!("Changed directory to {}", self.working_directory());
            return Ok(());
        }

        let target = self.expect_child(name, NodeKind::Directory)?;
        self.current = target;
        debug!("Changed directory to {}", self.working_directory());
        Ok(())
    }

    /// Node ids are only meaningful for the tree that issued them; after
    /// [`FileSystem::replace_tree`] an old id may be out of range and yields
    /// `None`.
    pub fn render_path(&self, node: NodeId) -> Option<String> {
        self.tree.get(node)?;
        Some(self.tree.path_of(node))
    }

    pub fn working_directory(&self) -> String {
        // the cursor always belongs to the installed tree
        self.render_path(self.current)
            .unwrap_or_else(|| String::from("/"))
    }

    /// Child names of `node` in chain order, directories suffixed with `/`.
    pub fn list_children(&self, node: NodeId) -> Option<Vec<String>> {
        self.tree.get(node)?;
        let names = self
            .tree
            .children(node)
            .map(|child| {
                let child = self.tree.node(child);
                if child.is_directory() {
                    format!("{}/", child.name())
                } else {
                    child.name().to_string()
                }
            })
            .collect();
        Some(names)
    }

    pub fn read_file(&self, name: &str) -> Result<&str, FilesystemError> {
        let file = self.expect_child(name, NodeKind::File)?;
        Ok(self.tree.node(file).content())
    }

    /// Discards the whole current tree and installs `tree`, moving the cursor
    /// to the new root. Returns how many nodes were discarded.
    pub fn replace_tree(&mut self, tree: Tree) -> usize {
        let previous = std::mem::replace(&mut self.tree, tree);
        self.current = self.tree.root();
        let discarded = previous.teardown();
        debug!(
            "Discarded {} nodes, installed tree of {} nodes",
            discarded,
            self.tree.len()
        );
        discarded
    }

    fn expect_child(&self, name: &str, expected: NodeKind) -> Result<NodeId, FilesystemError> {
        let id = self
            .lookup_child(self.current, name)
            .ok_or_else(|| FilesystemError::NotFoundError {
                name: name.to_string(),
            })?;
        let found = self.tree.node(id).kind();
        ensure!(
            found == expected,
            TypeMismatchSnafu {
                name: name.to_string(),
                expected,
                found
            }
        );
        Ok(id)
    }
}

/// Rejects names that could not be addressed by a single `cd` step.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != PARENT_DIRECTORY && !name.contains('/')
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum FilesystemError {
    #[snafu(display("'{}' already exists", name))]
    DuplicateNameError { name: String },
    #[snafu(display("'{}' not found", name))]
    NotFoundError { name: String },
    #[snafu(display("'{}' is a {}, expected a {}", name, found, expected))]
    TypeMismatchError {
        name: String,
        expected: NodeKind,
        found: NodeKind,
    },
    #[snafu(display("'{}' is not a valid entry name", name))]
    InvalidNameError { name: String },
}
