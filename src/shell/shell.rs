use std::fmt::Display;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use colored::Colorize;
use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};

use crate::filesystem::FileSystem;
use crate::persistence::SnapshotFormat;
use crate::shell::Command;

/// Commands replayed by `memfs demo`.
pub const DEMO_SCRIPT: &[&str] = &[
    "mkdir home",
    "cd home",
    "mkdir user",
    "cd user",
    "touch notes.txt Hello World!",
    "ls",
    "cat notes.txt",
    "pwd",
];

/// Whether the dispatcher should keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSettings {
    pub prompt: bool,
    pub color: bool,
    pub snapshot_path: PathBuf,
    pub snapshot_format: SnapshotFormat,
}

/// Line-oriented command dispatcher over a [`FileSystem`].
pub struct Shell<R, W> {
    fs: FileSystem,
    input: R,
    output: W,
    settings: ShellSettings,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub fn new(fs: FileSystem, input: R, output: W, settings: ShellSettings) -> Self {
        Self {
            fs,
            input,
            output,
            settings,
        }
    }

    #[cfg(test)]
    pub fn file_system(&self) -> &FileSystem {
        &self.fs
    }

    pub fn into_file_system(self) -> FileSystem {
        self.fs
    }

    /// Reads and executes commands until `exit` or end of input.
    pub async fn run(&mut self) -> Result<(), ShellError> {
        let mut line = String::new();
        loop {
            if self.settings.prompt {
                write!(
                    self.output,
                    "Current directory: {}> ",
                    self.fs.working_directory()
                )
                .context(OutputSnafu)?;
                self.output.flush().context(OutputSnafu)?;
            }

            line.clear();
            if self.input.read_line(&mut line).context(InputSnafu)? == 0 {
                debug!("End of input reached");
                if self.settings.prompt {
                    writeln!(self.output).context(OutputSnafu)?;
                }
                return Ok(());
            }

            if self.execute(&line).await? == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Executes each line in order, stopping early at `exit`.
    pub async fn run_script(&mut self, lines: &[&str]) -> Result<Flow, ShellError> {
        for line in lines {
            if self.execute(line).await? == Flow::Exit {
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Parses and executes one line. Filesystem and snapshot failures are
    /// reported on the output and never end the shell.
    pub async fn execute(&mut self, line: &str) -> Result<Flow, ShellError> {
        let command = match Command::try_from(line) {
            Ok(command) => command,
            Err(error) => {
                self.report(&error)?;
                return Ok(Flow::Continue);
            }
        };
        debug!("Executing {:?}", command);

        match command {
            Command::Blank => {}
            Command::Mkdir { ref name } => {
                if let Err(error) = self.fs.create_directory(name) {
                    self.report_failure(&command, &error)?;
                }
            }
            Command::Touch {
                ref name,
                ref content,
            } => {
                if let Err(error) = self.fs.create_file(name, content.as_str()) {
                    self.report_failure(&command, &error)?;
                }
            }
            Command::Cd { ref name } => {
                if let Err(error) = self.fs.change_directory(name) {
                    self.report_failure(&command, &error)?;
                }
            }
            Command::Pwd => {
                writeln!(self.output, "{}", self.fs.working_directory()).context(OutputSnafu)?;
            }
            Command::Ls => self.list()?,
            Command::Cat { ref name } => match self.fs.read_file(name) {
                Ok(content) => writeln!(self.output, "{content}").context(OutputSnafu)?,
                Err(error) => self.report_failure(&command, &error)?,
            },
            Command::Save { ref path } => {
                let path = self.snapshot_path(path.as_deref());
                match self
                    .fs
                    .save_to_path(&path, self.settings.snapshot_format)
                    .await
                {
                    Ok(()) => writeln!(self.output, "Saved to {}", path.display())
                        .context(OutputSnafu)?,
                    Err(error) => self.report_failure(&command, &error)?,
                }
            }
            Command::Load { ref path } => {
                let path = self.snapshot_path(path.as_deref());
                match self.fs.load_from_path(&path).await {
                    Ok(format) => writeln!(
                        self.output,
                        "Loaded {} ({} format)",
                        path.display(),
                        format
                    )
                    .context(OutputSnafu)?,
                    Err(error) => self.report_failure(&command, &error)?,
                }
            }
            Command::Exit => return Ok(Flow::Exit),
            Command::Unknown { ref verb } => {
                writeln!(self.output, "Unknown command: {verb}").context(OutputSnafu)?;
            }
        }

        Ok(Flow::Continue)
    }

    fn list(&mut self) -> Result<(), ShellError> {
        let entries: Vec<String> = self
            .fs
            .list_children(self.fs.current())
            .unwrap_or_default()
            .into_iter()
            .map(|entry| {
                if self.settings.color && entry.ends_with('/') {
                    format!("{}/", entry.trim_end_matches('/').blue().bold())
                } else {
                    entry
                }
            })
            .collect();

        writeln!(self.output, "{}", entries.join(" ")).context(OutputSnafu)
    }

    fn snapshot_path(&self, requested: Option<&Path>) -> PathBuf {
        requested
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.settings.snapshot_path.clone())
    }

    fn report_failure(&mut self, command: &Command, error: &impl Display) -> Result<(), ShellError> {
        warn!("{} failed: {}", command.verb(), error);
        writeln!(self.output, "{}: {}", command.verb(), error).context(OutputSnafu)
    }

    fn report(&mut self, error: &impl Display) -> Result<(), ShellError> {
        warn!("{}", error);
        writeln!(self.output, "{error}").context(OutputSnafu)
    }
}

#[derive(Debug, Snafu)]
pub enum ShellError {
    #[snafu(display("Failed to write shell output"))]
    OutputError { source: std::io::Error },
    #[snafu(display("Failed to read shell input"))]
    InputError { source: std::io::Error },
}
