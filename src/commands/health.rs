//! Backend reachability check

use super::{require_backend_url, AppContext};
use crate::client::ChatClient;
use crate::error::{ChatkeepError, Result};
use colored::Colorize;

/// Probe `GET /health` on the configured backend
///
/// # Errors
///
/// Returns `ChatkeepError::Client` when the backend is unreachable or unhealthy,
/// so the process exits non-zero.
pub async fn run_health(ctx: &AppContext) -> Result<()> {
    let url = require_backend_url(&ctx.settings, &ctx.config).await?;
    let client = ChatClient::new(&url, ctx.config.timeout())?;

    if client.check_health().await {
        println!("{} {}", "Backend is reachable:".green(), url);
        Ok(())
    } else {
        Err(ChatkeepError::Client(format!("Backend at {} is not reachable", url)).into())
    }
}
