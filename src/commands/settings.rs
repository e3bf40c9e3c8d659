//! Stored settings commands

use super::{resolve_backend_url, AppContext};
use crate::cli::SettingsCommand;
use crate::error::Result;
use colored::Colorize;

/// Handle settings commands
pub async fn handle_settings(ctx: &AppContext, command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            let saved = ctx.settings.backend_url().await?;
            let effective = resolve_backend_url(&ctx.settings, &ctx.config).await?;

            let source = match (&saved, &effective) {
                (Some(_), _) => "saved",
                (None, Some(_)) => "config",
                (None, None) => "unset",
            };
            println!(
                "{:<14} {} ({})",
                "backend_url".bold(),
                effective.as_deref().unwrap_or("-"),
                source
            );
            println!(
                "{:<14} {}",
                "storage_path".bold(),
                ctx.config.storage_dir()?.display()
            );
            println!(
                "{:<14} {}s",
                "timeout".bold(),
                ctx.config.backend.timeout_seconds
            );
        }
        SettingsCommand::SetUrl { url } => {
            let saved = ctx.settings.set_backend_url(&url).await?;
            println!("{} {}", "Saved backend URL:".green(), saved);
        }
    }
    Ok(())
}
