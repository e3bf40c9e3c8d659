/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`: Interactive chat with the assistant backend
- `history`: List, show, delete, check and rebuild stored conversations
- `health`: Backend reachability check
- `settings`: Show and change the saved backend URL

All handlers open the same on-disk database through [`AppContext`].
*/

use crate::config::Config;
use crate::error::{ChatkeepError, Result};
use crate::kv::{KeyValueStore, SledStore};
use crate::settings::{normalize_backend_url, Settings};
use crate::storage::{ChatMessage, ConversationStore, Role};
use colored::Colorize;
use std::sync::Arc;

pub mod health;
pub mod history;
pub mod settings;
pub mod special_commands;

/// Everything a command needs, opened once per invocation
///
/// sled locks its directory, so the conversation store and the settings
/// share one handle.
pub struct AppContext {
    pub config: Config,
    pub store: ConversationStore<SledStore>,
    pub settings: Settings<SledStore>,
}

impl AppContext {
    /// Open the database configured in `config`
    ///
    /// Repairs the conversation index first when `storage.repair_on_open` is set.
    pub async fn open(config: Config) -> Result<Self> {
        let dir = config.storage_dir()?;
        tracing::debug!("Opening history database at {}", dir.display());
        let kv = Arc::new(SledStore::open(&dir)?);

        let store = ConversationStore::new(kv.clone())
            .with_preview_chars(config.history.preview_chars);
        let settings = Settings::new(kv);

        if config.storage.repair_on_open && store.repair().await? {
            tracing::warn!("Conversation index was repaired on open");
        }

        Ok(Self {
            config,
            store,
            settings,
        })
    }
}

/// Backend URL to use: the saved setting, else the configured fallback
pub async fn resolve_backend_url<S: KeyValueStore>(
    settings: &Settings<S>,
    config: &Config,
) -> Result<Option<String>> {
    if let Some(url) = settings.backend_url().await? {
        return Ok(Some(url));
    }
    match &config.backend.base_url {
        Some(url) => Ok(Some(normalize_backend_url(url)?)),
        None => Ok(None),
    }
}

/// Like [`resolve_backend_url`], but a missing URL is an error
pub async fn require_backend_url<S: KeyValueStore>(
    settings: &Settings<S>,
    config: &Config,
) -> Result<String> {
    resolve_backend_url(settings, config).await?.ok_or_else(|| {
        ChatkeepError::Config(
            "No backend URL configured. Run `chatkeep settings set-url <url>` first.".to_string(),
        )
        .into()
    })
}

/// Print one chat message the way the interactive loop shows it
pub fn print_message(message: &ChatMessage) {
    let label = match message.role {
        Role::User => "You".cyan().bold(),
        Role::Assistant => "Assistant".green().bold(),
    };
    println!("{}: {}", label, message.content);
    if let Some(uri) = &message.image_uri {
        println!("  {} {}", "[image]".dimmed(), uri);
    }
    println!();
}

// Chat command handler
pub mod chat {
    //! Interactive chat handler.
    //!
    //! Runs a readline loop over a [`ChatSession`]. The conversation is
    //! archived into the store on `/new`, `/load` and exit.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::client::{ChatClient, ImageAttachment};
    use crate::session::{ArchiveOutcome, ChatSession};
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::path::PathBuf;

    /// Start interactive chat
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `resume` - Stored conversation to continue
    /// * `image` - Image file attached to the first message
    pub async fn run_chat(
        config: Config,
        resume: Option<String>,
        image: Option<PathBuf>,
    ) -> Result<()> {
        let ctx = AppContext::open(config).await?;
        let url = require_backend_url(&ctx.settings, &ctx.config).await?;
        let client = ChatClient::new(&url, ctx.config.timeout())?;

        let mut session = ChatSession::new().with_title_chars(ctx.config.history.title_chars);
        let mut pending_image = match image {
            Some(path) => Some(ImageAttachment::from_path(&path).await?),
            None => None,
        };

        println!(
            "{} {}  {}",
            "chatkeep".bold(),
            url.dimmed(),
            "(/help for commands)".dimmed()
        );
        println!();

        let resumed = match &resume {
            Some(id) => match session.restore(&ctx.store, id).await {
                Ok(true) => true,
                Ok(false) => {
                    println!("{}\n", format!("Conversation {} not found", id).yellow());
                    false
                }
                Err(e) => {
                    println!("{}\n", format!("Cannot resume {}: {}", id, e).red());
                    false
                }
            },
            None => false,
        };
        if resumed {
            println!("{} {}\n", "Resumed".green(), resume.unwrap_or_default());
            session.messages().iter().for_each(print_message);
        } else {
            start_fresh(&mut session);
        }

        let mut rl = DefaultEditor::new()?;

        loop {
            let prompt = if pending_image.is_some() {
                format!("{} ", "you [+image]>".cyan())
            } else {
                format!("{} ", "you>".cyan())
            };

            let line = match rl.readline(&prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    tracing::error!("Readline error: {}", e);
                    break;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let _ = rl.add_history_entry(trimmed);

            match parse_special_command(trimmed) {
                Ok(SpecialCommand::None) => {}
                Ok(SpecialCommand::New) => {
                    archive(&mut session, &ctx).await;
                    start_fresh(&mut session);
                    continue;
                }
                Ok(SpecialCommand::History) => {
                    match ctx.store.list().await {
                        Ok(summaries) => history::print_summaries(&summaries),
                        Err(e) => println!("{}\n", format!("Cannot list history: {}", e).red()),
                    }
                    continue;
                }
                Ok(SpecialCommand::Load(id)) => {
                    match session.switch_to(&ctx.store, &id).await {
                        Ok(Some(archived)) => {
                            report_archive(&archived);
                            println!("{} {}\n", "Loaded".green(), id);
                            session.messages().iter().for_each(print_message);
                        }
                        Ok(None) => {
                            println!("{}\n", format!("Conversation {} not found", id).yellow())
                        }
                        Err(e) => {
                            tracing::error!("Failed to load conversation {}: {}", id, e);
                            println!("{}\n", format!("Cannot load {}: {}", id, e).red());
                        }
                    }
                    continue;
                }
                Ok(SpecialCommand::Image(path)) => {
                    match ImageAttachment::from_path(&path).await {
                        Ok(attachment) => {
                            println!("{} {}\n", "Attached".green(), path.display());
                            pending_image = Some(attachment);
                        }
                        Err(e) => println!("{}\n", format!("Cannot attach image: {}", e).red()),
                    }
                    continue;
                }
                Ok(SpecialCommand::Help) => {
                    print_help();
                    continue;
                }
                Ok(SpecialCommand::Exit) => break,
                Err(e) => {
                    println!("{}\n", e.to_string().yellow());
                    continue;
                }
            }

            let attachment = pending_image.take();
            if let Err(e) = session.send(&client, trimmed, attachment.as_ref()).await {
                tracing::debug!("Turn failed: {}", e);
            }
            if let Some(last) = session.messages().last() {
                print_message(last);
            }
        }

        archive(&mut session, &ctx).await;
        Ok(())
    }

    fn start_fresh(session: &mut ChatSession) {
        session.greet();
        session.messages().iter().for_each(print_message);
    }

    /// Archive the session and report the outcome
    async fn archive(session: &mut ChatSession, ctx: &AppContext) {
        match session.archive(&ctx.store).await {
            Ok(outcome) => report_archive(&outcome),
            Err(e) => {
                tracing::error!("Failed to save conversation: {}", e);
                println!("{}\n", format!("Failed to save conversation: {}", e).red());
            }
        }
    }

    fn report_archive(outcome: &ArchiveOutcome) {
        match outcome {
            ArchiveOutcome::Saved(id) => println!("{} {}\n", "Saved conversation".green(), id),
            ArchiveOutcome::Appended(id) => {
                println!("{} {}\n", "Updated conversation".green(), id)
            }
            ArchiveOutcome::Unchanged(_) | ArchiveOutcome::Discarded => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    #[tokio::test]
    async fn test_saved_url_wins_over_config() {
        let settings = Settings::new(Arc::new(MemoryStore::new()));
        let mut config = Config::default();
        config.backend.base_url = Some("http://fallback:8000/".to_string());

        assert_eq!(
            resolve_backend_url(&settings, &config).await.unwrap(),
            Some("http://fallback:8000".to_string())
        );

        settings.set_backend_url("http://saved:9000").await.unwrap();
        assert_eq!(
            resolve_backend_url(&settings, &config).await.unwrap(),
            Some("http://saved:9000".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_url_is_config_error() {
        let settings = Settings::new(Arc::new(MemoryStore::new()));
        let err = require_backend_url(&settings, &Config::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChatkeepError>(),
            Some(ChatkeepError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_open_repairs_index_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.path = Some(dir.path().join("db"));

        {
            let ctx = AppContext::open(config.clone()).await.unwrap();
            let messages = vec![ChatMessage::new("msg_1_1", Role::User, "hi", 1)];
            let id = ctx.store.save("hi", &messages, &[]).await.unwrap();
            ctx.store.kv().remove(crate::storage::INDEX_KEY).await.unwrap();
            assert!(ctx.store.list().await.unwrap().is_empty());
            assert!(!id.is_empty());
        }

        config.storage.repair_on_open = true;
        let ctx = AppContext::open(config).await.unwrap();
        assert_eq!(ctx.store.list().await.unwrap().len(), 1);
    }
}
