use std::io::{BufRead, Write};

use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::application::RuntimeConfig;
use crate::cli::Mode;
use crate::config::{Config, ConfigError};
use crate::ext::BestEffortPathExt;
use crate::filesystem::FileSystem;
use crate::shell::{DEMO_SCRIPT, Shell, ShellError, ShellSettings};

pub struct Application;

impl Application {
    pub async fn run(runtime_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        Self::run_with(runtime_config, stdin.lock(), stdout.lock()).await
    }

    /// Runs the selected mode against the given terminal streams.
    pub async fn run_with<R: BufRead, W: Write>(
        runtime_config: impl Into<RuntimeConfig>,
        input: R,
        output: W,
    ) -> Result<(), ApplicationError> {
        let runtime_config: RuntimeConfig = runtime_config.into();
        let config = Self::resolve_config(&runtime_config).await?;
        debug!("Resolved config: {:?}", config);

        match runtime_config.mode {
            Mode::Demo => Self::run_demo(&config, input, output).await,
            Mode::Shell => Self::run_shell(&config, input, output).await,
        }
    }

    async fn resolve_config(runtime_config: &RuntimeConfig) -> Result<Config, ApplicationError> {
        let mut config = Config::read(&runtime_config.root)
            .await
            .context(ConfigurationSnafu)?;

        if let Some(snapshot) = &runtime_config.snapshot {
            config.snapshot.path = snapshot.clone();
        }
        if let Some(format) = runtime_config.format {
            config.snapshot.format = format;
        }
        Ok(config)
    }

    fn settings(config: &Config) -> ShellSettings {
        ShellSettings {
            prompt: config.shell.prompt,
            color: config.shell.color.enabled(),
            snapshot_path: config.snapshot.path.clone(),
            snapshot_format: config.snapshot.format,
        }
    }

    /// The demonstration always starts from an empty tree and never touches
    /// the snapshot file.
    async fn run_demo<R: BufRead, W: Write>(
        config: &Config,
        input: R,
        output: W,
    ) -> Result<(), ApplicationError> {
        let settings = ShellSettings {
            prompt: false,
            ..Self::settings(config)
        };
        let mut shell = Shell::new(FileSystem::new(), input, output, settings);

        info!("Running demo script");
        shell
            .run_script(DEMO_SCRIPT)
            .await
            .context(ShellExecutionSnafu)?;
        Ok(())
    }

    async fn run_shell<R: BufRead, W: Write>(
        config: &Config,
        input: R,
        mut output: W,
    ) -> Result<(), ApplicationError> {
        let snapshot = &config.snapshot;
        let mut fs = FileSystem::new();

        if snapshot.autoload && snapshot.path.exists() {
            if let Err(error) = fs.load_from_path(&snapshot.path).await {
                warn!("Autoload failed, starting with an empty tree: {}", error);
                writeln!(output, "autoload: {error}").context(OutputSnafu)?;
            }
        } else if snapshot.autoload {
            info!(
                "No snapshot at {}, starting with an empty tree",
                snapshot.path.best_effort_path_display()
            );
        }

        let mut shell = Shell::new(fs, input, output, Self::settings(config));
        shell.run().await.context(ShellExecutionSnafu)?;
        let fs = shell.into_file_system();

        if snapshot.autosave {
            if let Err(error) = fs.save_to_path(&snapshot.path, snapshot.format).await {
                warn!("Autosave to {} failed: {}", snapshot.path.best_effort_path_display(), error);
            }
        }

        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigurationError { source: ConfigError },
    #[snafu(display("Critical failure encountered while running the shell"))]
    ShellExecutionError { source: ShellError },
    #[snafu(display("Failed to write to the terminal"))]
    OutputError { source: std::io::Error },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::SnapshotFormat;
    use std::io::{self, Cursor};
    use std::path::Path;
    use tempfile::TempDir;

    fn runtime(mode: Mode, root: &Path) -> RuntimeConfig {
        RuntimeConfig {
            mode,
            root: root.to_path_buf(),
            snapshot: None,
            format: None,
        }
    }

    fn write_config(root: &Path, yaml: &str) {
        std::fs::write(root.join("memfs.yaml"), yaml).expect("Failed to write config");
    }

    #[compio::test]
    async fn demo_prints_expected_output() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut output = Vec::new();

        Application::run_with(runtime(Mode::Demo, temp_dir.path()), io::empty(), &mut output)
            .await
            .expect("demo failed");

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "notes.txt\nHello World!\n/home/user/\n"
        );
    }

    #[compio::test]
    async fn autosave_then_autoload_carries_tree_across_runs() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        write_config(
            temp_dir.path(),
            "snapshot:\n  format: framed\n  autoload: true\n  autosave: true\nshell:\n  prompt: false\n  color: never\n",
        );

        let first = Cursor::new("mkdir projects\ncd projects\ntouch todo.txt ship it\nexit\n");
        Application::run_with(runtime(Mode::Shell, temp_dir.path()), first, io::sink())
            .await
            .expect("first run failed");
        let snapshot = std::fs::read_to_string(temp_dir.path().join("memfs.snapshot"))
            .expect("snapshot was not written");
        assert_eq!(SnapshotFormat::detect(&snapshot), SnapshotFormat::Framed);

        let second = Cursor::new("cd projects\ncat todo.txt\npwd\n");
        let mut output = Vec::new();
        Application::run_with(runtime(Mode::Shell, temp_dir.path()), second, &mut output)
            .await
            .expect("second run failed");

        assert_eq!(String::from_utf8(output).unwrap(), "ship it\n/projects/\n");
    }

    #[compio::test]
    async fn corrupt_autoload_snapshot_is_reported_and_shell_continues() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        write_config(
            temp_dir.path(),
            "snapshot:\n  autoload: true\nshell:\n  prompt: false\n",
        );
        std::fs::write(temp_dir.path().join("memfs.snapshot"), "not a snapshot\n")
            .expect("Failed to write snapshot");

        let mut output = Vec::new();
        Application::run_with(
            runtime(Mode::Shell, temp_dir.path()),
            Cursor::new("pwd\n"),
            &mut output,
        )
        .await
        .expect("shell failed");

        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("autoload: Malformed snapshot line 1"));
        assert!(output.ends_with("/\n"));
    }

    #[compio::test]
    async fn cli_snapshot_override_wins_over_config() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        write_config(temp_dir.path(), "shell:\n  prompt: false\n");
        let override_path = temp_dir.path().join("override.snapshot");
        let runtime_config = RuntimeConfig {
            snapshot: Some(override_path.clone()),
            format: Some(SnapshotFormat::Framed),
            ..runtime(Mode::Shell, temp_dir.path())
        };

        Application::run_with(runtime_config, Cursor::new("mkdir a\nsave\n"), io::sink())
            .await
            .expect("shell failed");

        let written = std::fs::read_to_string(&override_path).expect("snapshot was not written");
        assert_eq!(SnapshotFormat::detect(&written), SnapshotFormat::Framed);
        assert!(!temp_dir.path().join("memfs.snapshot").exists());
    }

    #[compio::test]
    async fn invalid_config_is_critical() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        write_config(temp_dir.path(), "- not\n- a map\n");

        let result =
            Application::run_with(runtime(Mode::Shell, temp_dir.path()), io::empty(), io::sink())
                .await;

        assert!(matches!(
            result,
            Err(ApplicationError::ConfigurationError { .. })
        ));
    }
}
