//! Line-oriented command dispatcher for the in-memory filesystem.

mod command;
#[allow(clippy::module_inception)]
mod shell;

pub use command::Command;
pub use shell::{DEMO_SCRIPT, Shell, ShellError, ShellSettings};
