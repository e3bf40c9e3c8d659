//! Special commands parser for interactive chat mode
//!
//! Special commands manage the session instead of being sent to the
//! assistant: start a new conversation, browse or restore stored ones,
//! attach an image, show help, or leave.
//!
//! Commands are prefixed with `/` and their names are case-insensitive.
//! Arguments keep their case, since conversation ids and paths are
//! case-sensitive.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Archive the current conversation and start a fresh one
    New,

    /// List stored conversations
    History,

    /// Archive the current conversation and restore a stored one
    Load(String),

    /// Attach an image to the next message
    Image(PathBuf),

    /// Display help information
    Help,

    /// Archive the current conversation and leave
    Exit,

    /// Not a special command; send the input to the assistant
    None,
}

/// Parse a user input string into a special command
///
/// Input that does not start with `/` is a regular message, except the
/// bare words `exit` and `quit`.
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` for unrecognized `/` commands and
/// `CommandError::MissingArgument` when `/load` or `/image` lack their argument.
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    match name.as_str() {
        "/new" | "/clear" => Ok(SpecialCommand::New),
        "/history" | "/list" => Ok(SpecialCommand::History),
        "/load" | "/resume" => {
            if arg.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/load".to_string(),
                    usage: "/load <conversation id>".to_string(),
                })
            } else {
                Ok(SpecialCommand::Load(arg.to_string()))
            }
        }
        "/image" => {
            if arg.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/image".to_string(),
                    usage: "/image <path>".to_string(),
                })
            } else {
                Ok(SpecialCommand::Image(PathBuf::from(arg)))
            }
        }
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" | "exit" | "quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Display help for the special commands
pub fn print_help() {
    println!(
        r#"
Special Commands
================

CONVERSATIONS:
  /new            - Save this conversation and start a new one
  /clear          - Same as /new
  /history        - List saved conversations
  /load <id>      - Save this conversation and open a saved one
  /resume <id>    - Same as /load

ATTACHMENTS:
  /image <path>   - Attach an image to your next message

SESSION:
  /help           - Show this help message
  /?              - Same as /help
  /exit           - Save this conversation and exit
  exit, quit      - Same as /exit

NOTES:
  - Command names are case-insensitive; ids and paths are not
  - Conversations without any message from you are not saved
"#
    );
}
