//! The command surface: /start, /help, /dl, /bdl, /stats, /logs, /killall,
//! plus bare post links treated as an implicit /dl.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use grammers_client::InputMessage;
use grammers_session::defs::PeerRef;

use super::App;
use crate::config;
use crate::error::TgErrorContext;
use crate::link;
use crate::stats;

const WELCOME_TEXT: &str = "Welcome to the media saver bot!\n\n\
I can download media from Telegram posts, including restricted channels.\n\
Send a post link directly or use /dl <link>.\n\
Use /bdl for batch downloads.\n\n\
Use /help for more details.\n\
Make sure the user session has access to the channel.";

const HELP_TEXT: &str = "Media saver bot help\n\n\
Download media:\n\
  /dl <post_url>, or just paste a Telegram post link.\n\n\
Batch download:\n\
  /bdl <start_link> <end_link> downloads a range of posts.\n\
  Example: /bdl https://t.me/channel/100 https://t.me/channel/120\n\n\
Other commands:\n\
  /killall  cancel all running downloads\n\
  /logs     download the bot log file\n\
  /stats    show bot status\n\n\
The user session must have access to the channel.\n\
Example: /dl https://t.me/somechannel/547";

impl App {
    pub(crate) async fn handle_message(
        self: &Arc<Self>,
        chat: PeerRef,
        request_id: i32,
        text: &str,
    ) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let (command, rest) = split_command(text);
        match command {
            "/start" => {
                self.reply(chat, request_id, WELCOME_TEXT).await?;
                Ok(())
            }
            "/help" => {
                self.reply(chat, request_id, HELP_TEXT).await?;
                Ok(())
            }
            "/dl" => self.cmd_dl(chat, request_id, rest).await,
            "/bdl" => self.cmd_bdl(chat, request_id, rest).await,
            "/stats" => self.cmd_stats(chat, request_id).await,
            "/logs" => self.cmd_logs(chat, request_id).await,
            "/killall" => self.cmd_killall(chat, request_id).await,
            _ if !text.starts_with('/') => {
                // Bare text in a private chat is treated as a post link.
                self.cmd_dl(chat, request_id, text).await
            }
            _ => Ok(()),
        }
    }

    async fn cmd_dl(self: &Arc<Self>, chat: PeerRef, request_id: i32, url: &str) -> Result<()> {
        if url.is_empty() {
            self.reply(chat, request_id, "Provide a post URL after /dl.")
                .await?;
            return Ok(());
        }

        let app = Arc::clone(self);
        let url = url.to_string();
        let guard = self.registry.register();
        tokio::spawn(async move {
            app.fetch_post(chat, request_id, &url, guard).await;
        });
        Ok(())
    }

    async fn cmd_bdl(self: &Arc<Self>, chat: PeerRef, request_id: i32, rest: &str) -> Result<()> {
        let args: Vec<&str> = rest.split_whitespace().collect();
        let usage = "Batch download\n\
             Use: /bdl <start_link> <end_link>\n\
             Example: /bdl https://t.me/channel/100 https://t.me/channel/120";

        let [start_url, end_url] = args.as_slice() else {
            self.reply(chat, request_id, usage).await?;
            return Ok(());
        };

        let (start, end) = match (link::parse_post_url(start_url), link::parse_post_url(end_url)) {
            (Ok(start), Ok(end)) => (start, end),
            _ => {
                self.reply(chat, request_id, usage).await?;
                return Ok(());
            }
        };

        if start.channel != end.channel {
            self.reply(chat, request_id, "Links must be from the same channel.")
                .await?;
            return Ok(());
        }
        if start.msg_id > end.msg_id {
            self.reply(chat, request_id, "Start ID cannot exceed end ID.")
                .await?;
            return Ok(());
        }

        let app = Arc::clone(self);
        let guard = self.registry.register();
        tokio::spawn(async move {
            app.run_batch(chat, request_id, start.channel, start.msg_id, end.msg_id, guard)
                .await;
        });
        Ok(())
    }

    async fn cmd_stats(&self, chat: PeerRef, request_id: i32) -> Result<()> {
        let mut report = stats::render(self.started.elapsed()).await;
        report.push_str(&format!("\nActive tasks: {}", self.registry.len()));
        self.reply(chat, request_id, &report).await?;
        Ok(())
    }

    async fn cmd_logs(&self, chat: PeerRef, request_id: i32) -> Result<()> {
        let path = Path::new(&self.data_dir).join(config::LOG_FILE);
        if !path.exists() {
            self.reply(chat, request_id, "No logs available.").await?;
            return Ok(());
        }

        let uploaded = self
            .bot
            .client
            .upload_file(&path)
            .await
            .context_upload(&path.display().to_string())?;
        self.bot
            .client
            .send_message(
                chat,
                InputMessage::new()
                    .text("Bot logs")
                    .document(uploaded)
                    .reply_to(Some(request_id)),
            )
            .await
            .context_reply()?;
        Ok(())
    }

    async fn cmd_killall(&self, chat: PeerRef, request_id: i32) -> Result<()> {
        let cancelled = self.registry.cancel_all();
        log::info!("killall cancelled {cancelled} task(s)");
        self.reply(chat, request_id, &format!("Cancelled {cancelled} task(s)."))
            .await?;
        Ok(())
    }
}

/// Split a message into its command head and the argument tail. A "@botname"
/// suffix on the command is stripped so `/dl@mybot url` works too.
fn split_command(text: &str) -> (&str, &str) {
    let mut parts = text.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();
    let head = head.split('@').next().unwrap_or(head);
    (head, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command() {
        assert_eq!(split_command("/dl https://t.me/a/1"), ("/dl", "https://t.me/a/1"));
        assert_eq!(split_command("/start"), ("/start", ""));
        assert_eq!(split_command("/dl@mybot  url "), ("/dl", "url"));
        assert_eq!(
            split_command("/bdl a b"),
            ("/bdl", "a b")
        );
        assert_eq!(split_command("plain text"), ("plain", "text"));
    }
}
