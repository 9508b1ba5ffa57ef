use std::path::PathBuf;
use std::string::FromUtf8Error;

use clap::ValueEnum;
use derive_more::Display;
use snafu::Snafu;

use super::{FRAMED_HEADER, FramedCodec, LegacyCodec};
use crate::ext::BestEffortPathExt;
use crate::filesystem::Tree;

/// Converts a whole tree to and from its textual snapshot.
pub trait SnapshotCodec {
    fn encode(&self, tree: &Tree) -> Result<String, SnapshotError>;
    fn decode(&self, input: &str) -> Result<Tree, SnapshotError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Display)]
pub enum SnapshotFormat {
    #[default]
    #[display("legacy")]
    Legacy,
    #[display("framed")]
    Framed,
}

impl SnapshotFormat {
    /// Framed snapshots announce themselves with a header line; anything
    /// else is read as legacy.
    pub fn detect(input: &str) -> Self {
        match input.lines().next() {
            Some(FRAMED_HEADER) => SnapshotFormat::Framed,
            _ => SnapshotFormat::Legacy,
        }
    }
}

impl SnapshotCodec for SnapshotFormat {
    fn encode(&self, tree: &Tree) -> Result<String, SnapshotError> {
        match self {
            SnapshotFormat::Legacy => LegacyCodec.encode(tree),
            SnapshotFormat::Framed => FramedCodec.encode(tree),
        }
    }

    fn decode(&self, input: &str) -> Result<Tree, SnapshotError> {
        match self {
            SnapshotFormat::Legacy => LegacyCodec.decode(input),
            SnapshotFormat::Framed => FramedCodec.decode(input),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum SnapshotError {
    #[snafu(display("Could not access snapshot file {}", path.best_effort_path_display()))]
    IoUnavailableError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Snapshot file {} is not valid UTF-8", path.best_effort_path_display()))]
    InvalidEncodingError {
        path: PathBuf,
        source: FromUtf8Error,
    },
    #[snafu(display(
        "'{}' contains '|' or a line break and cannot be stored in the legacy format",
        entry
    ))]
    UnencodableFieldError { entry: String },
    #[snafu(display("Malformed snapshot line {}: {}", line_number, reason))]
    MalformedLineError { line_number: usize, reason: String },
    #[snafu(display("Invalid snapshot root: {}", reason))]
    InvalidRootError { reason: String },
    #[snafu(display("Snapshot is empty"))]
    EmptySnapshotError,
    #[snafu(display("Snapshot ended while {} more entries were expected", missing))]
    TruncatedSnapshotError { missing: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::FileSystem;
    use rstest::*;

    #[rstest]
    #[case::legacy("/|1||1|1\n\n\n", SnapshotFormat::Legacy)]
    #[case::framed("#memfs-snapshot v2\nd|0|1|1|/|\n", SnapshotFormat::Framed)]
    #[case::empty("", SnapshotFormat::Legacy)]
    #[case::header_not_first("/|1||1|1\n#memfs-snapshot v2\n", SnapshotFormat::Legacy)]
    fn detect_by_header(#[case] input: &str, #[case] expected: SnapshotFormat) {
        assert_eq!(SnapshotFormat::detect(input), expected);
    }

    #[rstest]
    fn encoded_output_is_detected_as_its_format(
        #[values(SnapshotFormat::Legacy, SnapshotFormat::Framed)] format: SnapshotFormat,
    ) {
        let mut fs = FileSystem::new();
        fs.create_file("a", "b").unwrap();

        let encoded = format.encode(fs.tree()).unwrap();

        assert_eq!(SnapshotFormat::detect(&encoded), format);
        assert_eq!(&format.decode(&encoded).unwrap(), fs.tree());
    }

    #[test]
    fn format_names_match_cli_values() {
        assert_eq!(SnapshotFormat::Legacy.to_string(), "legacy");
        assert_eq!(
            SnapshotFormat::from_str("FRAMED", true),
            Ok(SnapshotFormat::Framed)
        );
    }
}
