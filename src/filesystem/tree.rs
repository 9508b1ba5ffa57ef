use tracing::debug;

use super::{Node, NodeId};

/// Name given to the root directory of a fresh tree.
pub const ROOT_NAME: &str = "/";

/// Arena holding every node of one filesystem tree.
///
/// The root always lives at index 0. Nodes are never removed individually;
/// the arena is discarded as a whole through [`Tree::teardown`].
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self::with_root(Node::directory(ROOT_NAME))
    }

    /// Starts a tree from an already built root node. Any links the node
    /// carries are cleared.
    pub fn with_root(mut root: Node) -> Self {
        root.parent = None;
        root.first_child = None;
        root.next_sibling = None;
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Panics when `id` was not issued by this tree. Use [`Tree::get`] for
    /// ids that may have outlived a tree replacement.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.node(id).first_child,
        }
    }

    /// Linear scan of the child chain of `parent` for an exact name match.
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .find(|&child| self.node(child).name() == name)
    }

    /// Makes `node` the new first child of `parent`, pushing the existing
    /// chain behind it.
    pub fn prepend_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.first_child = None;
        node.next_sibling = self.nodes[parent.0].first_child;
        self.nodes.push(node);
        self.nodes[parent.0].first_child = Some(id);
        id
    }

    /// Links `node` under `parent` directly behind `previous`, or as the
    /// first child when `previous` is `None`. Used by decoders that rebuild
    /// chains front to back.
    pub(crate) fn attach_after(
        &mut self,
        parent: NodeId,
        previous: Option<NodeId>,
        mut node: Node,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.first_child = None;
        node.next_sibling = None;
        self.nodes.push(node);
        match previous {
            Some(previous) => self.nodes[previous.0].next_sibling = Some(id),
            None => self.nodes[parent.0].first_child = Some(id),
        }
        id
    }

    /// Renders the path from the root to `id`, one `name/` segment per level.
    /// The root itself renders as `/`.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut cursor = id;
        while let Some(parent) = self.node(cursor).parent {
            segments.push(self.node(cursor).name());
            cursor = parent;
        }

        let mut path = String::from("/");
        for segment in segments.iter().rev() {
            path.push_str(segment);
            path.push('/');
        }
        path
    }

    /// Destroys the whole tree, releasing each node's first-child chain, then
    /// its next-sibling chain, then the node itself. Only the owning links are
    /// followed; `parent` is never consulted. Returns the number of nodes
    /// released.
    pub fn teardown(self) -> usize {
        let mut slots: Vec<Option<Node>> = self.nodes.into_iter().map(Some).collect();
        let mut pending = vec![NodeId(0)];
        let mut released = 0;

        while let Some(id) = pending.pop() {
            let Some(node) = slots[id.0].take() else {
                continue;
            };
            if let Some(sibling) = node.next_sibling {
                pending.push(sibling);
            }
            // Pushed last so the child chain is released before the siblings
            if let Some(child) = node.first_child {
                pending.push(child);
            }
            drop(node);
            released += 1;
        }

        let orphans = slots.iter().filter(|slot| slot.is_some()).count();
        if orphans > 0 {
            debug!("Released {orphans} nodes unreachable from the root");
        }
        released
    }

    /// Checks the topology invariants: the root has neither parent nor
    /// siblings, every node reachable through a chain names the chain's owner
    /// as its parent, only directories have children, and every arena slot is
    /// reachable exactly once.
    pub fn links_consistent(&self) -> bool {
        let root = self.node(self.root());
        if root.parent.is_some() || root.next_sibling.is_some() {
            return false;
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut pending = vec![self.root()];
        visited[0] = true;

        while let Some(id) = pending.pop() {
            let node = self.node(id);
            if node.first_child.is_some() && !node.is_directory() {
                return false;
            }
            for child in self.children(id) {
                if visited[child.0] || self.node(child).parent != Some(id) {
                    return false;
                }
                visited[child.0] = true;
                pending.push(child);
            }
        }

        visited.into_iter().all(|seen| seen)
    }
}

/// Two trees are equal when they hold the same entries in the same
/// topology, regardless of how their arenas are laid out.
impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(Some(self.root()), Some(other.root()))];

        while let Some(pair) = pending.pop() {
            match pair {
                (None, None) => {}
                (Some(left), Some(right)) => {
                    let (left, right) = (self.node(left), other.node(right));
                    if !left.same_entry(right) {
                        return false;
                    }
                    pending.push((left.next_sibling, right.next_sibling));
                    pending.push((left.first_child, right.first_child));
                }
                _ => return false,
            }
        }

        true
    }
}

impl Eq for Tree {}

/// Iterator over a child chain.
pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.node(current).next_sibling;
        Some(current)
    }
}
