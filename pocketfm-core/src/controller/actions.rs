//! src/controller/actions.rs
//! ============================================================================
//! # Actions: user intents understood by the event loop
//!
//! The driver reads one command line at a time and parses it into an
//! `Action`. Arguments are whitespace separated; double quotes group a name
//! containing spaces (`rename "My File.txt" notes`).

use crate::error::AppError;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Re-list the current directory.
    List,

    /// Enter a child directory by name, or an absolute path.
    Enter(String),

    /// Go up one level.
    Up,

    /// Jump back to the home directory, clearing history.
    Home,

    /// Print the current directory.
    Pwd,

    Copy { source: String, dest_dir: String },

    Move { source: String, dest_dir: String },

    /// Hold an entry for a later copy-paste.
    Yank(String),

    /// Hold an entry for a later cut-paste.
    Cut(String),

    /// Paste the held entry into the current directory.
    Paste,

    /// Forget the held entry.
    ClearClipboard,

    Delete(String),

    Rename { target: String, new_name: String },

    /// Request the thumbnail of an image in the current directory.
    Thumbnail(String),

    /// Show metadata of one entry.
    Info(String),

    ShowHidden(bool),

    ShowThumbnails(bool),

    /// Filesystem capacity of the current directory.
    Storage,

    /// Re-list on the blocking pool.
    Refresh,

    Help,

    Quit,
}

impl Action {
    pub const HELP: &'static str = "\
ls                      list current directory
cd <name|path>          enter directory (also: open)
up | ..                 go up one level
home                    back to home directory
pwd                     print current directory
cp <src> <dir>          copy into directory
mv <src> <dir>          move into directory
yank <name>             hold for copy
cut <name>              hold for move
paste                   paste held entry here
clear                   forget held entry
rm <name>               delete (recursive)
rename <name> <new>     rename, keeping the extension
thumb <name>            thumbnail of an image
info <name>             entry details
hidden on|off           show dot files
thumbs on|off           enable thumbnails
df                      storage usage
refresh                 re-list in background
help                    this text
quit                    save location and exit";
}

/// Splits a command line, honouring double quotes.
fn tokenize(line: &str) -> Result<Vec<String>, AppError> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(AppError::invalid_input("command", "unterminated quote"));
    }
    if has_token {
        tokens.push(current);
    }

    Ok(tokens)
}

fn parse_switch(command: &str, value: Option<&str>) -> Result<bool, AppError> {
    match value {
        Some("on" | "true" | "yes" | "1") => Ok(true),
        Some("off" | "false" | "no" | "0") => Ok(false),
        _ => Err(AppError::invalid_input(
            "command",
            format!("usage: {command} on|off"),
        )),
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(line)?;
        let mut args = tokens.into_iter();

        let Some(command) = args.next() else {
            return Err(AppError::invalid_input("command", "empty command"));
        };

        let rest: Vec<String> = args.collect();
        let arg = |index: usize, usage: &str| -> Result<String, AppError> {
            rest.get(index).cloned().ok_or_else(|| {
                AppError::invalid_input("command", format!("usage: {usage}"))
            })
        };

        let action = match command.as_str() {
            "ls" | "list" => Self::List,
            "cd" | "open" => Self::Enter(arg(0, "cd <name|path>")?),
            "up" | ".." => Self::Up,
            "home" => Self::Home,
            "pwd" => Self::Pwd,
            "cp" | "copy" => Self::Copy {
                source: arg(0, "cp <src> <dir>")?,
                dest_dir: arg(1, "cp <src> <dir>")?,
            },
            "mv" | "move" => Self::Move {
                source: arg(0, "mv <src> <dir>")?,
                dest_dir: arg(1, "mv <src> <dir>")?,
            },
            "yank" => Self::Yank(arg(0, "yank <name>")?),
            "cut" => Self::Cut(arg(0, "cut <name>")?),
            "paste" => Self::Paste,
            "clear" => Self::ClearClipboard,
            "rm" | "delete" => Self::Delete(arg(0, "rm <name>")?),
            "rename" => Self::Rename {
                target: arg(0, "rename <name> <new>")?,
                new_name: arg(1, "rename <name> <new>")?,
            },
            "thumb" => Self::Thumbnail(arg(0, "thumb <name>")?),
            "info" => Self::Info(arg(0, "info <name>")?),
            "hidden" => Self::ShowHidden(parse_switch("hidden", rest.first().map(String::as_str))?),
            "thumbs" => {
                Self::ShowThumbnails(parse_switch("thumbs", rest.first().map(String::as_str))?)
            }
            "df" => Self::Storage,
            "refresh" => Self::Refresh,
            "help" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            other => {
                return Err(AppError::invalid_input(
                    "command",
                    format!("unknown command '{other}', try 'help'"),
                ));
            }
        };

        Ok(action)
    }
}
