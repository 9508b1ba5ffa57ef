use std::path::PathBuf;

use crate::cli::{Cli, Mode};
use crate::persistence::SnapshotFormat;

/// Settings taken from the command line for one run.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub mode: Mode,
    pub root: PathBuf,
    pub snapshot: Option<PathBuf>,
    pub format: Option<SnapshotFormat>,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            mode: cli.mode,
            root: cli.root,
            snapshot: cli.snapshot,
            format: cli.format,
        }
    }
}
