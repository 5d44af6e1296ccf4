use crate::AppError;

use std::{panic::Location, path::PathBuf, str::FromStr};

use error_location::ErrorLocation;
use uuid::Uuid;

/// How a console command names a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingRef {
    /// 1-based position in the most recently printed list.
    Index(usize),
    /// Catalog identifier.
    Id(Uuid),
}

impl FromStr for RecordingRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = s.parse::<usize>() {
            return match index {
                0 => Err("List positions start at 1".to_string()),
                n => Ok(RecordingRef::Index(n)),
            };
        }
        Uuid::parse_str(s)
            .map(RecordingRef::Id)
            .map_err(|_| format!("{:?} is neither a list position nor an id", s))
    }
}

/// Commands typed on the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Start a new recording.
    Record,
    /// Stop the recording, or the playback if nothing is recording.
    Stop,
    /// Play a recording, or stop it if it is already playing.
    Play(RecordingRef),
    /// Delete a recording and its file.
    Delete(RecordingRef),
    /// Copy a recording's file to a path or directory.
    Export(RecordingRef, PathBuf),
    /// Print every recording.
    List,
    /// Print recordings whose name contains the text.
    Search(String),
    /// Print the current state.
    Status,
    /// Clear the last error.
    Dismiss,
    /// Ask for microphone access.
    Permission,
    /// Print the command summary.
    Help,
    /// Request application shutdown.
    Shutdown,
}

impl FromStr for AppCommand {
    type Err = AppError;

    #[track_caller]
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let parse_error = |reason: String| AppError::CommandParse {
            input: line.to_string(),
            reason,
            location: ErrorLocation::from(Location::caller()),
        };

        let reference = |arg: &str| -> Result<RecordingRef, AppError> {
            if arg.is_empty() {
                return Err(parse_error(format!("Usage: {} <number|id>", verb)));
            }
            arg.parse::<RecordingRef>().map_err(&parse_error)
        };

        let command = match verb.to_lowercase().as_str() {
            "record" | "rec" | "r" => AppCommand::Record,
            "stop" | "s" => AppCommand::Stop,
            "play" | "p" => AppCommand::Play(reference(rest)?),
            "delete" | "del" | "rm" => AppCommand::Delete(reference(rest)?),
            "export" => {
                let Some((target, destination)) = rest.split_once(char::is_whitespace) else {
                    return Err(parse_error("Usage: export <number|id> <path>".to_string()));
                };
                AppCommand::Export(reference(target)?, PathBuf::from(destination.trim()))
            }
            "list" | "ls" | "l" => AppCommand::List,
            "search" | "find" => AppCommand::Search(rest.to_string()),
            "status" => AppCommand::Status,
            "dismiss" => AppCommand::Dismiss,
            "permission" => AppCommand::Permission,
            "help" | "?" => AppCommand::Help,
            "quit" | "exit" | "q" => AppCommand::Shutdown,
            "" => return Err(parse_error("Type 'help' for commands".to_string())),
            other => return Err(parse_error(format!("Unknown command {:?}", other))),
        };

        Ok(command)
    }
}
