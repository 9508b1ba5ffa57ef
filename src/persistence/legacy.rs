use std::collections::HashSet;

use snafu::{OptionExt, ensure};
use tracing::debug;

use super::SnapshotCodec;
use super::codec::{
    EmptySnapshotSnafu, InvalidRootSnafu, MalformedLineSnafu, SnapshotError,
    UnencodableFieldSnafu,
};
use crate::filesystem::{Node, NodeId, NodeKind, Tree, is_valid_name};

const FIELD_SEPARATOR: char = '|';
const FIELD_COUNT: usize = 5;

/// The first-generation line format: `name|isDirectory|content|createdAt|modifiedAt`.
///
/// Nodes are written in pre-order: a node's own line, then its first-child
/// chain, then its next-sibling chain. A missing child or sibling is written
/// as an empty line, which is also how the decoder recognises the end of a
/// chain. Fields are not escaped, so entries containing `|` or line breaks are
/// refused by the encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyCodec;

impl SnapshotCodec for LegacyCodec {
    fn encode(&self, tree: &Tree) -> Result<String, SnapshotError> {
        let mut out = String::new();
        // `None` marks an absent chain and is written as an empty line
        let mut pending = vec![Some(tree.root())];

        while let Some(slot) = pending.pop() {
            let Some(id) = slot else {
                out.push('\n');
                continue;
            };
            let node = tree.node(id);
            ensure!(
                is_storable(node.name()) && is_storable(node.content()),
                UnencodableFieldSnafu {
                    entry: tree.path_of(id)
                }
            );
            out.push_str(&format!(
                "{}|{}|{}|{}|{}\n",
                node.name(),
                u8::from(node.is_directory()),
                node.content(),
                node.created_at(),
                node.modified_at()
            ));
            pending.push(node.next_sibling());
            pending.push(node.first_child());
        }

        debug!("Encoded {} nodes in legacy format", tree.len());
        Ok(out)
    }

    fn decode(&self, input: &str) -> Result<Tree, SnapshotError> {
        let mut lines = input.lines().enumerate().map(|(index, line)| (index + 1, line));

        let (line_number, first) = lines
            .next()
            .filter(|(_, line)| !line.is_empty())
            .context(EmptySnapshotSnafu)?;
        let root = parse_line(line_number, first)?;
        ensure!(
            root.is_directory(),
            InvalidRootSnafu {
                reason: format!("'{}' is not a directory", root.name())
            }
        );

        let mut tree = Tree::with_root(root);
        let mut chains = vec![Chain::root_level(), Chain::children_of(tree.root())];

        while let Some(chain) = chains.last_mut() {
            let Some((line_number, line)) = lines.next().filter(|(_, line)| !line.is_empty())
            else {
                chains.pop();
                continue;
            };
            let Some(parent) = chain.parent else {
                return InvalidRootSnafu {
                    reason: format!("line {line_number} gives the root a sibling"),
                }
                .fail();
            };
            ensure!(
                tree.node(parent).is_directory(),
                MalformedLineSnafu {
                    line_number,
                    reason: format!("file '{}' cannot have children", tree.node(parent).name())
                }
            );

            let node = parse_line(line_number, line)?;
            ensure!(
                is_valid_name(node.name()),
                MalformedLineSnafu {
                    line_number,
                    reason: format!("invalid entry name '{}'", node.name())
                }
            );
            ensure!(
                chain.names.insert(node.name().to_string()),
                MalformedLineSnafu {
                    line_number,
                    reason: format!("duplicate entry '{}'", node.name())
                }
            );
            let id = tree.attach_after(parent, chain.previous, node);
            chain.previous = Some(id);
            chains.push(Chain::children_of(id));
        }

        if let Some((line_number, _)) = lines.find(|(_, line)| !line.is_empty()) {
            return MalformedLineSnafu {
                line_number,
                reason: "unexpected data after the end of the tree",
            }
            .fail();
        }

        debug_assert!(tree.links_consistent());
        debug!("Decoded {} nodes from legacy format", tree.len());
        Ok(tree)
    }
}

/// A chain being rebuilt: its owner, the last node linked into it so far
/// and the names already used in it. The root level has no owner and may
/// hold nothing but the root.
struct Chain {
    parent: Option<NodeId>,
    previous: Option<NodeId>,
    names: HashSet<String>,
}

impl Chain {
    fn root_level() -> Self {
        Self {
            parent: None,
            previous: None,
            names: HashSet::new(),
        }
    }

    fn children_of(parent: NodeId) -> Self {
        Self {
            parent: Some(parent),
            previous: None,
            names: HashSet::new(),
        }
    }
}

fn is_storable(field: &str) -> bool {
    !field.contains([FIELD_SEPARATOR, '\n', '\r'])
}

fn parse_line(line_number: usize, line: &str) -> Result<Node, SnapshotError> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    let &[name, kind, content, created_at, modified_at] = fields.as_slice() else {
        return MalformedLineSnafu {
            line_number,
            reason: format!("expected {FIELD_COUNT} fields, found {}", fields.len()),
        }
        .fail();
    };
    ensure!(
        !name.is_empty(),
        MalformedLineSnafu {
            line_number,
            reason: "entry name is empty"
        }
    );

    let kind = match kind {
        "1" => NodeKind::Directory,
        "0" => NodeKind::File,
        other => {
            return MalformedLineSnafu {
                line_number,
                reason: format!("unknown entry kind '{other}'"),
            }
            .fail();
        }
    };

    Ok(Node::restored(
        name,
        kind,
        content,
        parse_timestamp(line_number, created_at)?,
        parse_timestamp(line_number, modified_at)?,
    ))
}

fn parse_timestamp(line_number: usize, field: &str) -> Result<u64, SnapshotError> {
    field.trim().parse().ok().context(MalformedLineSnafu {
        line_number,
        reason: format!("invalid timestamp '{field}'"),
    })
}
