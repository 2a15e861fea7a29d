//! Start the bot: connect both identities, then serve updates until Ctrl+C.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use crate::app::App;
use crate::cmd::auth;
use crate::config::Config;
use crate::error::TgErrorContext;
use crate::health;
use crate::tg::TgClient;
use crate::Cli;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Liveness endpoint port (takes precedence over $PORT)
    #[arg(long)]
    pub port: Option<u16>,
}

pub async fn run(cli: &Cli, args: &RunArgs) -> Result<()> {
    let config = Config::from_env()?;
    let data_dir = cli.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // The user session must already exist; it can only be created
    // interactively.
    let user = TgClient::connect(&auth::user_session_path(&data_dir), config.api_id)?;
    if !user.client.is_authorized().await.context_auth_check()? {
        anyhow::bail!("User session not signed in. Run `tgsaver auth` first.");
    }

    // The bot identity signs itself in with the token on first run.
    let (bot, updates_rx) =
        TgClient::connect_with_updates(&auth::bot_session_path(&data_dir), config.api_id)?;
    if !bot.client.is_authorized().await.context_auth_check()? {
        bot.client
            .bot_sign_in(&config.bot_token, &config.api_hash)
            .await
            .context_bot_sign_in()?;
        log::info!("Bot signed in.");
    }

    if let Some(port) = args.port.or(config.port) {
        tokio::spawn(async move {
            if let Err(e) = health::serve(port).await {
                log::error!("Liveness endpoint failed: {e:#}");
            }
        });
    }

    log::info!("Starting bot...");
    let app = Arc::new(App::new(bot, user, &config, data_dir).await?);
    let result = app.run(updates_rx).await;
    log::info!("Bot stopped.");
    result
}
