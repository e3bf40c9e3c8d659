use super::{print_message, AppContext};
use crate::cli::HistoryCommand;
use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::storage::{is_record_key, ConversationSummary};
use chrono::{DateTime, Local};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle history commands
pub async fn handle_history(ctx: &AppContext, command: HistoryCommand) -> Result<()> {
    let store = &ctx.store;

    match command {
        HistoryCommand::List { json } => {
            let summaries = store.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                print_summaries(&summaries);
            }
        }
        HistoryCommand::Show { id, json } => {
            let Some(record) = store.get(&id).await? else {
                println!("{}", format!("Conversation {} not found", id).yellow());
                return Ok(());
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!(
                    "\n{}  {}  ({} messages, {})\n",
                    record.title.bold(),
                    record.id.cyan(),
                    record.message_count,
                    format_timestamp(record.created_at)
                );
                record.messages.iter().for_each(print_message);
            }
        }
        HistoryCommand::Delete { id } => {
            // Dangling index entries and unreadable records are deletable too
            let indexed = store.list().await?.iter().any(|s| s.id == id);
            let stored = is_record_key(&id) && store.kv().get(&id).await?.is_some();
            store.delete(&id).await?;

            if indexed || stored {
                println!("{}", format!("Deleted conversation {}", id).green());
            } else {
                println!("{}", format!("Conversation {} not found", id).yellow());
            }
        }
        HistoryCommand::Check => {
            let report = store.check_consistency().await?;
            if report.is_consistent() {
                println!("{}", "Index is consistent with stored conversations.".green());
            } else {
                println!("{}", "Index is out of sync:".yellow());
                for (label, ids) in [
                    ("indexed but missing", &report.dangling),
                    ("stored but not indexed", &report.orphaned),
                    ("summary out of date", &report.stale),
                ] {
                    for id in ids {
                        println!("  {:<24} {}", label, id.cyan());
                    }
                }
                println!(
                    "\nRun {} to fix it.",
                    "chatkeep history rebuild".cyan()
                );
            }
        }
        HistoryCommand::Rebuild => {
            let count = store.rebuild_index().await?;
            println!(
                "{}",
                format!("Rebuilt index with {} conversations", count).green()
            );
        }
    }

    Ok(())
}

/// Print summaries as a table, newest first
pub fn print_summaries(summaries: &[ConversationSummary]) {
    if summaries.is_empty() {
        println!("{}", "No conversation history found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Title".bold(),
        "Preview".bold(),
        "Messages".bold(),
        "Created".bold()
    ]);

    for summary in summaries {
        table.add_row(prettytable::row![
            summary.id.cyan(),
            truncate(&summary.title, 40),
            truncate(&summary.preview, 40),
            summary.message_count,
            format_timestamp(summary.created_at)
        ]);
    }

    println!("\nConversation History:");
    table.printstd();
    println!();
    println!(
        "Use {} to resume a conversation.",
        "chatkeep chat --resume <ID>".cyan()
    );
    println!();
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn format_timestamp(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}
