use std::collections::HashSet;

use snafu::{OptionExt, ensure};
use tracing::debug;

use super::SnapshotCodec;
use super::codec::{
    EmptySnapshotSnafu, InvalidRootSnafu, MalformedLineSnafu, SnapshotError,
    TruncatedSnapshotSnafu,
};
use crate::filesystem::{Node, NodeId, NodeKind, Tree, is_valid_name};

/// First line of every framed snapshot.
pub const FRAMED_HEADER: &str = "#memfs-snapshot v2";

const FIELD_SEPARATOR: char = '|';
const ESCAPE: char = '\\';

/// Escaped line format with explicit structure:
/// `kind|childCount|createdAt|modifiedAt|name|content`, nodes in pre-order
/// with children in chain order. Any name or content can be stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct FramedCodec;

impl SnapshotCodec for FramedCodec {
    fn encode(&self, tree: &Tree) -> Result<String, SnapshotError> {
        let mut out = String::from(FRAMED_HEADER);
        out.push('\n');
        let mut pending = vec![tree.root()];

        while let Some(id) = pending.pop() {
            let node = tree.node(id);
            let children: Vec<NodeId> = tree.children(id).collect();

            let kind = match node.kind() {
                NodeKind::Directory => 'd',
                NodeKind::File => 'f',
            };
            out.push_str(&format!(
                "{kind}|{}|{}|{}|",
                children.len(),
                node.created_at(),
                node.modified_at()
            ));
            escape_into(node.name(), &mut out);
            out.push(FIELD_SEPARATOR);
            escape_into(node.content(), &mut out);
            out.push('\n');

            pending.extend(children.into_iter().rev());
        }

        debug!("Encoded {} nodes in framed format", tree.len());
        Ok(out)
    }

    fn decode(&self, input: &str) -> Result<Tree, SnapshotError> {
        let mut lines = input.lines().enumerate().map(|(index, line)| (index + 1, line));

        let (_, header) = lines.next().context(EmptySnapshotSnafu)?;
        ensure!(
            header == FRAMED_HEADER,
            MalformedLineSnafu {
                line_number: 1usize,
                reason: format!("expected header '{FRAMED_HEADER}'")
            }
        );

        let (line_number, line) = lines
            .next()
            .context(TruncatedSnapshotSnafu { missing: 1usize })?;
        let (root, root_children) = parse_line(line_number, line)?;
        ensure!(
            root.is_directory(),
            InvalidRootSnafu {
                reason: format!("'{}' is not a directory", root.name())
            }
        );

        let mut tree = Tree::with_root(root);
        let mut frames = vec![Frame::new(tree.root(), root_children)];

        while let Some(remaining) = frames.last().map(|frame| frame.remaining) {
            if remaining == 0 {
                frames.pop();
                continue;
            }

            let Some((line_number, line)) = lines.next() else {
                // counts come from the file and may be absurdly large
                let missing = frames
                    .iter()
                    .map(|frame| frame.remaining)
                    .fold(0usize, usize::saturating_add);
                return TruncatedSnapshotSnafu { missing }.fail();
            };

            let (node, child_count) = parse_line(line_number, line)?;
            ensure!(
                is_valid_name(node.name()),
                MalformedLineSnafu {
                    line_number,
                    reason: format!("invalid entry name '{}'", node.name())
                }
            );
            let top = frames.len() - 1;
            let frame = &mut frames[top];
            ensure!(
                frame.names.insert(node.name().to_string()),
                MalformedLineSnafu {
                    line_number,
                    reason: format!("duplicate entry '{}'", node.name())
                }
            );

            frame.remaining -= 1;
            let id = tree.attach_after(frame.parent, frame.previous, node);
            frame.previous = Some(id);
            if child_count > 0 {
                frames.push(Frame::new(id, child_count));
            }
        }

        if let Some((line_number, _)) = lines.find(|(_, line)| !line.is_empty()) {
            return MalformedLineSnafu {
                line_number,
                reason: "unexpected data after the end of the tree",
            }
            .fail();
        }

        debug_assert!(tree.links_consistent());
        debug!("Decoded {} nodes from framed format", tree.len());
        Ok(tree)
    }
}

/// Children still to be read for one directory, and the names already
/// taken among the ones read so far.
struct Frame {
    parent: NodeId,
    remaining: usize,
    previous: Option<NodeId>,
    names: HashSet<String>,
}

impl Frame {
    fn new(parent: NodeId, remaining: usize) -> Self {
        Self {
            parent,
            remaining,
            previous: None,
            names: HashSet::new(),
        }
    }
}

fn escape_into(field: &str, out: &mut String) {
    for c in field.chars() {
        match c {
            ESCAPE => out.push_str("\\\\"),
            FIELD_SEPARATOR => out.push_str("\\|"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
}

/// Splits a line on unescaped separators, resolving escapes as it goes.
fn split_fields(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            FIELD_SEPARATOR => fields.push(std::mem::take(&mut field)),
            ESCAPE => match chars.next() {
                Some(ESCAPE) => field.push(ESCAPE),
                Some(FIELD_SEPARATOR) => field.push(FIELD_SEPARATOR),
                Some('n') => field.push('\n'),
                Some('r') => field.push('\r'),
                Some(other) => return Err(format!("unknown escape sequence '\\{other}'")),
                None => return Err("line ends inside an escape sequence".to_string()),
            },
            c => field.push(c),
        }
    }
    fields.push(field);

    Ok(fields)
}

fn parse_line(line_number: usize, line: &str) -> Result<(Node, usize), SnapshotError> {
    let malformed = |reason: String| MalformedLineSnafu {
        line_number,
        reason,
    };

    let fields = split_fields(line).map_err(|reason| malformed(reason).build())?;
    let [kind, child_count, created_at, modified_at, name, content] = fields.as_slice() else {
        return malformed(format!("expected 6 fields, found {}", fields.len())).fail();
    };

    let kind = match kind.as_str() {
        "d" => NodeKind::Directory,
        "f" => NodeKind::File,
        other => return malformed(format!("unknown entry kind '{other}'")).fail(),
    };
    ensure!(!name.is_empty(), malformed("entry name is empty".to_string()));

    let parse_number = |field: &str| -> Result<u64, SnapshotError> {
        field
            .parse::<u64>()
            .ok()
            .context(malformed(format!("invalid number '{field}'")))
    };
    let child_count = usize::try_from(parse_number(child_count.as_str())?)
        .ok()
        .context(malformed(format!("child count {child_count} is too large")))?;
    ensure!(
        child_count == 0 || kind == NodeKind::Directory,
        malformed(format!("file '{name}' cannot have children"))
    );

    let node = Node::restored(
        name.as_str(),
        kind,
        content.as_str(),
        parse_number(created_at.as_str())?,
        parse_number(modified_at.as_str())?,
    );
    Ok((node, child_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::test_trees;
    use proptest::prelude::*;
    use rstest::*;

    fn restored_root() -> Tree {
        Tree::with_root(Node::restored("/", NodeKind::Directory, "", 100, 100))
    }

    #[test]
    fn root_only_tree() {
        let encoded = FramedCodec.encode(&restored_root()).unwrap();
        assert_eq!(encoded, "#memfs-snapshot v2\nd|0|100|100|/|\n");
    }

    #[test]
    fn children_are_written_in_chain_order_with_counts() {
        let mut tree = restored_root();
        let root = tree.root();
        let home = tree.attach_after(root, None, Node::restored("home", NodeKind::Directory, "", 1, 2));
        tree.attach_after(root, Some(home), Node::restored("a.txt", NodeKind::File, "hi", 3, 4));
        tree.attach_after(home, None, Node::restored("b.txt", NodeKind::File, "", 5, 6));

        let encoded = FramedCodec.encode(&tree).unwrap();

        assert_eq!(
            encoded,
            "#memfs-snapshot v2\n\
             d|2|100|100|/|\n\
             d|1|1|2|home|\n\
             f|0|5|6|b.txt|\n\
             f|0|3|4|a.txt|hi\n"
        );
    }

    #[test]
    fn arbitrary_trees_round_trip() {
        let mut runner = proptest::test_runner::TestRunner::default();

        runner
            .run(
                &test_trees::trees(test_trees::any_name(), test_trees::any_content()),
                |tree| {
                    let encoded = FramedCodec.encode(&tree).unwrap();
                    let decoded = FramedCodec.decode(&encoded).unwrap();

                    prop_assert_eq!(&decoded, &tree);
                    prop_assert_eq!(decoded.len(), tree.len());
                    prop_assert!(decoded.links_consistent());
                    Ok(())
                },
            )
            .unwrap();
    }

    #[test]
    fn sample_tree_round_trips() {
        let fs = test_trees::sample();

        let decoded = FramedCodec.decode(&FramedCodec.encode(fs.tree()).unwrap()).unwrap();

        assert_eq!(&decoded, fs.tree());
        assert!(decoded.links_consistent());
    }

    #[test]
    fn wide_directory_decodes() {
        let mut tree = restored_root();
        let root = tree.root();
        let mut previous = None;
        for i in 0..20_000 {
            previous = Some(tree.attach_after(root, previous, Node::file(format!("f{i}"), "")));
        }

        let decoded = FramedCodec.decode(&FramedCodec.encode(&tree).unwrap()).unwrap();

        assert_eq!(decoded.children(decoded.root()).count(), 20_000);
        assert_eq!(decoded, tree);
    }

    #[rstest]
    #[case::separator("pipe|name", "a|b|c")]
    #[case::line_breaks("multi\nline", "first\r\nsecond\n")]
    #[case::backslashes("back\\slash", "\\n is not a newline")]
    #[case::empty_content("empty", "")]
    #[case::unicode("тест🚀", "äöü")]
    fn special_text_is_preserved(#[case] name: &str, #[case] content: &str) {
        let mut tree = restored_root();
        let root = tree.root();
        let dir = tree.attach_after(root, None, Node::restored(name, NodeKind::Directory, "", 1, 1));
        tree.attach_after(dir, None, Node::restored(name, NodeKind::File, content, 2, 2));

        let decoded = FramedCodec.decode(&FramedCodec.encode(&tree).unwrap()).unwrap();

        assert_eq!(decoded, tree);
        let dir = decoded.find_child(decoded.root(), name).unwrap();
        let file = decoded.find_child(dir, name).unwrap();
        assert_eq!(decoded.node(file).content(), content);
    }

    #[test]
    fn truncated_snapshot_reports_missing_entries() {
        let input = "#memfs-snapshot v2\nd|2|1|1|/|\nd|3|1|1|a|\nf|0|1|1|x|\n";
        assert!(matches!(
            FramedCodec.decode(input),
            Err(SnapshotError::TruncatedSnapshotError { missing: 3 })
        ));
    }

    #[test]
    fn oversized_child_counts_are_truncation_not_overflow() {
        let max = usize::MAX;
        let input = format!("#memfs-snapshot v2\nd|{max}|1|1|/|\nd|{max}|1|1|a|\n");

        assert!(matches!(
            FramedCodec.decode(&input),
            Err(SnapshotError::TruncatedSnapshotError { missing }) if missing == usize::MAX
        ));
    }

    #[test]
    fn header_without_root_is_truncated() {
        assert!(matches!(
            FramedCodec.decode("#memfs-snapshot v2\n"),
            Err(SnapshotError::TruncatedSnapshotError { missing: 1 })
        ));
    }

    #[rstest]
    #[case::missing_header("d|0|1|1|/|\n", 1)]
    #[case::too_few_fields("#memfs-snapshot v2\nd|0|1|1|/\n", 2)]
    #[case::bad_kind("#memfs-snapshot v2\nd|1|1|1|/|\nx|0|1|1|a|\n", 3)]
    #[case::bad_count("#memfs-snapshot v2\nd|many|1|1|/|\n", 2)]
    #[case::bad_escape("#memfs-snapshot v2\nd|0|1|1|/\\q|\n", 2)]
    #[case::dangling_escape("#memfs-snapshot v2\nd|0|1|1|/|\\\n", 2)]
    #[case::file_with_children("#memfs-snapshot v2\nd|1|1|1|/|\nf|1|1|1|a|\nf|0|1|1|b|\n", 3)]
    #[case::duplicate("#memfs-snapshot v2\nd|2|1|1|/|\nf|0|1|1|a|\nf|0|1|1|a|\n", 4)]
    #[case::trailing("#memfs-snapshot v2\nd|0|1|1|/|\n\nf|0|1|1|a|\n", 4)]
    #[case::current_directory_name("#memfs-snapshot v2\nd|1|1|1|/|\nd|0|1|1|.|\n", 3)]
    #[case::parent_directory_name("#memfs-snapshot v2\nd|1|1|1|/|\nd|0|1|1|..|\n", 3)]
    #[case::slash_in_name("#memfs-snapshot v2\nd|1|1|1|/|\nf|0|1|1|a/b|\n", 3)]
    #[case::count_overflow("#memfs-snapshot v2\nd|99999999999999999999|1|1|/|\n", 2)]
    fn malformed_lines_are_reported(#[case] input: &str, #[case] expected_line: usize) {
        match FramedCodec.decode(input) {
            Err(SnapshotError::MalformedLineError { line_number, .. }) => {
                assert_eq!(line_number, expected_line)
            }
            other => panic!("Expected MalformedLineError, got {other:?}"),
        }
    }

    #[test]
    fn file_root_is_rejected() {
        assert!(matches!(
            FramedCodec.decode("#memfs-snapshot v2\nf|0|1|1|/|x\n"),
            Err(SnapshotError::InvalidRootError { .. })
        ));
    }
}
