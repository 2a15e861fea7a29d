pub mod batch;
pub mod fetch;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use grammers_client::types::Peer;
use grammers_client::{InputMessage, Update, UpdatesConfiguration};
use grammers_session::defs::PeerRef;
use grammers_session::updates::UpdatesLike;
use grammers_tl_types as tl;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::TgErrorContext;
use crate::limits::SizeGuard;
use crate::tasks::TaskRegistry;
use crate::tg::TgClient;

/// The running bot: both Telegram identities plus the shared fetch machinery.
pub struct App {
    pub bot: TgClient,
    pub user: TgClient,
    pub guard: SizeGuard,
    pub registry: TaskRegistry,
    pub data_dir: String,
    /// Premium user sessions are exempt from the transfer size ceiling.
    pub premium: bool,
    pub started: Instant,
}

impl App {
    pub async fn new(bot: TgClient, user: TgClient, config: &Config, data_dir: String) -> Result<Self> {
        let me = user
            .client
            .get_me()
            .await
            .context("Failed to load the user session account")?;
        let premium = match &me.raw {
            tl::enums::User::User(u) => u.premium,
            tl::enums::User::Empty(_) => false,
        };

        Ok(App {
            bot,
            user,
            guard: SizeGuard::new(config.max_file_size),
            registry: TaskRegistry::new(),
            data_dir,
            premium,
            started: Instant::now(),
        })
    }

    /// Main update loop: every incoming private-chat message is handled in
    /// its own task so a long download never blocks the next command.
    pub async fn run(
        self: Arc<Self>,
        updates_rx: mpsc::UnboundedReceiver<UpdatesLike>,
    ) -> Result<()> {
        let mut stream = self.bot.client.stream_updates(
            updates_rx,
            UpdatesConfiguration {
                catch_up: false,
                ..Default::default()
            },
        );

        log::info!("Bot ready. Press Ctrl+C to stop.");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received Ctrl+C, shutting down...");
                    if !self.registry.is_empty() {
                        let cancelled = self.registry.cancel_all();
                        log::info!("Cancelled {cancelled} running task(s)");
                    }
                    break;
                }
                update = stream.next() => {
                    match update {
                        Ok(Update::NewMessage(msg)) => {
                            if msg.outgoing() {
                                continue;
                            }
                            let peer = match msg.peer() {
                                Ok(p) => p.clone(),
                                Err(_) => {
                                    log::warn!("Could not resolve peer for message {}", msg.id());
                                    continue;
                                }
                            };
                            // Commands are accepted from private chats only.
                            if !matches!(peer, Peer::User(_)) {
                                continue;
                            }

                            let app = Arc::clone(&self);
                            tokio::spawn(async move {
                                let text = msg.text().to_string();
                                let request_id = msg.id();
                                if let Err(e) = app
                                    .handle_message(PeerRef::from(&peer), request_id, &text)
                                    .await
                                {
                                    log::error!("Error handling message {request_id}: {e:#}");
                                }
                            });
                        }
                        Ok(_) => {
                            // Edits, deletions, callback queries: not relevant here.
                        }
                        Err(e) => {
                            log::error!("Update stream error: {e:#}");
                            if e.to_string().contains("Dropped") {
                                break;
                            }
                        }
                    }
                }
            }
        }

        stream.sync_update_state();
        Ok(())
    }

    /// Reply in the requesting chat, quoting the request message.
    pub(crate) async fn reply(
        &self,
        chat: PeerRef,
        reply_to: i32,
        text: &str,
    ) -> Result<grammers_client::types::Message> {
        self.bot
            .client
            .send_message(
                chat,
                InputMessage::new().text(text).reply_to(Some(reply_to)),
            )
            .await
            .context_reply()
    }

    /// Best-effort edit of a transient status message.
    pub(crate) async fn edit_status(&self, chat: PeerRef, status_id: i32, text: &str) {
        if let Err(e) = self
            .bot
            .client
            .edit_message(chat, status_id, InputMessage::new().text(text))
            .await
        {
            log::debug!("Status edit failed (ignored): {e}");
        }
    }

    /// Best-effort removal of a transient status message.
    pub(crate) async fn delete_status(&self, chat: PeerRef, status_id: i32) {
        if let Err(e) = self.bot.client.delete_messages(chat, &[status_id]).await {
            log::debug!("Status delete failed (ignored): {e}");
        }
    }
}
