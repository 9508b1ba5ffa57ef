use std::path::PathBuf;

use snafu::{OptionExt, Snafu};

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mkdir { name: String },
    Touch { name: String, content: String },
    Cd { name: String },
    Pwd,
    Ls,
    Cat { name: String },
    Save { path: Option<PathBuf> },
    Load { path: Option<PathBuf> },
    Exit,
    Blank,
    Unknown { verb: String },
}

impl Command {
    pub fn verb(&self) -> &str {
        match self {
            Command::Mkdir { .. } => "mkdir",
            Command::Touch { .. } => "touch",
            Command::Cd { .. } => "cd",
            Command::Pwd => "pwd",
            Command::Ls => "ls",
            Command::Cat { .. } => "cat",
            Command::Save { .. } => "save",
            Command::Load { .. } => "load",
            Command::Exit => "exit",
            Command::Blank => "",
            Command::Unknown { verb } => verb,
        }
    }
}

impl TryFrom<&str> for Command {
    type Error = CommandParseError;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let (verb, rest) = split_word(line.trim_start());

        let command = match verb {
            "" => Command::Blank,
            "mkdir" => Command::Mkdir {
                name: required_word(rest, "mkdir", "mkdir <name>")?,
            },
            "touch" => {
                let name = required_word(rest, "touch", "touch <name> [content]")?;
                let (_, content) = split_word(rest);
                Command::Touch {
                    name,
                    content: unquote(content.trim_end_matches(['\r', '\n'])).to_string(),
                }
            }
            "cd" => Command::Cd {
                name: required_word(rest, "cd", "cd <name|..>")?,
            },
            "pwd" => Command::Pwd,
            "ls" => Command::Ls,
            "cat" => Command::Cat {
                name: required_word(rest, "cat", "cat <name>")?,
            },
            "save" => Command::Save {
                path: optional_word(rest).map(PathBuf::from),
            },
            "load" => Command::Load {
                path: optional_word(rest).map(PathBuf::from),
            },
            "exit" => Command::Exit,
            other => Command::Unknown {
                verb: other.to_string(),
            },
        };

        Ok(command)
    }
}

/// Splits off the first whitespace-delimited word; the remainder keeps its
/// inner spacing but loses the separating whitespace.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (text, ""),
    }
}

fn optional_word(rest: &str) -> Option<&str> {
    Some(split_word(rest).0).filter(|word| !word.is_empty())
}

fn required_word(
    rest: &str,
    command: &'static str,
    usage: &'static str,
) -> Result<String, CommandParseError> {
    optional_word(rest)
        .map(str::to_string)
        .context(MissingArgumentSnafu { command, usage })
}

/// Strips one pair of surrounding double quotes.
fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(text)
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum CommandParseError {
    #[snafu(display("{}: missing argument (usage: {})", command, usage))]
    MissingArgumentError {
        command: &'static str,
        usage: &'static str,
    },
}
