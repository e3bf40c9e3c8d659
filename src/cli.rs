//! Command-line interface definition for Chatkeep
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for chatting, browsing history, and settings.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chatkeep - personal assistant chat with local history
///
/// Talk to your assistant backend and keep finished conversations
/// in a local store you can browse, restore, and repair.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatkeep")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Directory of the history database
    #[arg(long, env = "CHATKEEP_STORAGE_PATH")]
    pub storage_path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Chatkeep
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat
    Chat {
        /// Continue a stored conversation
        #[arg(short, long)]
        resume: Option<String>,

        /// Attach an image file to the first message
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Check whether the backend is reachable
    Health,

    /// Browse and maintain conversation history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Show or change stored settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

/// History subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List stored conversations, newest first
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one conversation
    Show {
        /// Conversation id
        id: String,

        /// Print the full record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a conversation
    Delete {
        /// Conversation id
        id: String,
    },

    /// Compare the index against the stored records
    Check,

    /// Rebuild the index from the stored records
    Rebuild,
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Print the effective settings
    Show,

    /// Save the backend base URL
    SetUrl {
        /// Base URL, e.g. http://192.168.1.10:8000
        url: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_chat_command() {
        let cli = Cli::try_parse_from(["chatkeep", "chat"]).unwrap();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        if let Commands::Chat { resume, image } = cli.command {
            assert!(resume.is_none());
            assert!(image.is_none());
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_cli_parse_chat_with_resume_and_image() {
        let cli = Cli::try_parse_from([
            "chatkeep",
            "chat",
            "--resume",
            "CONV_1700000000000",
            "--image",
            "photo.png",
        ])
        .unwrap();
        if let Commands::Chat { resume, image } = cli.command {
            assert_eq!(resume.as_deref(), Some("CONV_1700000000000"));
            assert_eq!(image, Some(PathBuf::from("photo.png")));
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_cli_parse_health() {
        let cli = Cli::try_parse_from(["chatkeep", "-v", "health"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Health));
    }

    #[test]
    fn test_cli_parse_history_list_json() {
        let cli = Cli::try_parse_from(["chatkeep", "history", "list", "--json"]).unwrap();
        match cli.command {
            Commands::History {
                command: HistoryCommand::List { json },
            } => assert!(json),
            other => panic!("Expected history list, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_history_show_and_delete() {
        let cli = Cli::try_parse_from(["chatkeep", "history", "show", "CONV_1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::History {
                command: HistoryCommand::Show { ref id, json: false }
            } if id == "CONV_1"
        ));

        let cli = Cli::try_parse_from(["chatkeep", "history", "delete", "CONV_2"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::History {
                command: HistoryCommand::Delete { ref id }
            } if id == "CONV_2"
        ));
    }

    #[test]
    fn test_cli_history_delete_requires_id() {
        assert!(Cli::try_parse_from(["chatkeep", "history", "delete"]).is_err());
    }

    #[test]
    fn test_cli_parse_settings_set_url() {
        let cli = Cli::try_parse_from([
            "chatkeep",
            "--storage-path",
            "/tmp/ck",
            "settings",
            "set-url",
            "http://localhost:8000",
        ])
        .unwrap();
        assert_eq!(cli.storage_path, Some(PathBuf::from("/tmp/ck")));
        match cli.command {
            Commands::Settings {
                command: SettingsCommand::SetUrl { url },
            } => assert_eq!(url, "http://localhost:8000"),
            other => panic!("Expected settings set-url, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_custom_config_path() {
        let cli = Cli::try_parse_from(["chatkeep", "--config", "alt.yaml", "history", "check"])
            .unwrap();
        assert_eq!(cli.config.as_deref(), Some("alt.yaml"));
        assert!(matches!(
            cli.command,
            Commands::History {
                command: HistoryCommand::Check
            }
        ));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["chatkeep"]).is_err());
    }
}
