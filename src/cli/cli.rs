use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::application::data::LogLevel;
use crate::persistence::SnapshotFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Mode {
    /// Interactive shell reading commands from stdin
    #[default]
    Shell,
    /// Replays the fixed demonstration script
    Demo,
}

#[derive(Parser, Debug, Clone)]
#[command(version, about = "In-memory hierarchical filesystem shell")]
pub struct Cli {
    #[clap(default_value = "shell", value_enum)]
    pub mode: Mode,
    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// Directory containing memfs.yaml
    #[clap(long, short, default_value = ".")]
    pub root: PathBuf,

    /// Snapshot file used by save/load, overriding the config file
    #[clap(long, short)]
    pub snapshot: Option<PathBuf>,

    /// Snapshot format used by save, overriding the config file
    #[clap(long, short, value_enum)]
    pub format: Option<SnapshotFormat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_interactive_shell() {
        let cli = Cli::try_parse_from(["memfs"]).expect("parse failed");
        assert_eq!(cli.mode, Mode::Shell);
        assert_eq!(cli.root, PathBuf::from("."));
        assert!(cli.snapshot.is_none());
        assert!(cli.format.is_none());
    }

    #[test]
    fn parses_demo_mode_and_overrides() {
        let cli = Cli::try_parse_from([
            "memfs",
            "demo",
            "--log-level",
            "debug",
            "--snapshot",
            "/tmp/fs.snapshot",
            "--format",
            "framed",
        ])
        .expect("parse failed");

        assert_eq!(cli.mode, Mode::Demo);
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert_eq!(cli.snapshot, Some(PathBuf::from("/tmp/fs.snapshot")));
        assert_eq!(cli.format, Some(SnapshotFormat::Framed));
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["memfs", "serve"]).is_err());
    }
}
