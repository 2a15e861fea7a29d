use std::sync::Arc;

use anyhow::Result;
use grammers_client::Client;
use grammers_mtsender::SenderPool;
use grammers_session::storages::SqliteSession;
use grammers_session::updates::UpdatesLike;
use tokio::sync::mpsc;

/// A connected Telegram client with its pool runner handle.
///
/// The bot runs two of these: the bot identity (replies and uploads) and the
/// user session (resolving and downloading restricted posts).
pub struct TgClient {
    pub client: Client,
    pool_handle: tokio::task::JoinHandle<()>,
}

impl TgClient {
    /// Connect using a SQLite session file. No updates receiver; used for
    /// the user session, which never handles incoming messages.
    pub fn connect(session_path: &str, api_id: i32) -> Result<Self> {
        let session = Arc::new(
            SqliteSession::open(session_path)
                .map_err(|e| anyhow::anyhow!("Failed to open session {session_path}: {e}"))?,
        );

        let pool = SenderPool::new(Arc::clone(&session) as Arc<SqliteSession>, api_id);
        let client = Client::new(&pool);

        let SenderPool {
            runner, updates: _, ..
        } = pool;

        let pool_handle = tokio::spawn(async move {
            runner.run().await;
        });

        Ok(TgClient {
            client,
            pool_handle,
        })
    }

    /// Connect with updates support; used for the bot identity.
    pub fn connect_with_updates(
        session_path: &str,
        api_id: i32,
    ) -> Result<(Self, mpsc::UnboundedReceiver<UpdatesLike>)> {
        let session = Arc::new(
            SqliteSession::open(session_path)
                .map_err(|e| anyhow::anyhow!("Failed to open session {session_path}: {e}"))?,
        );

        let pool = SenderPool::new(Arc::clone(&session) as Arc<SqliteSession>, api_id);
        let client = Client::new(&pool);

        let SenderPool {
            runner, updates, ..
        } = pool;

        let pool_handle = tokio::spawn(async move {
            runner.run().await;
        });

        Ok((
            TgClient {
                client,
                pool_handle,
            },
            updates,
        ))
    }
}

impl Drop for TgClient {
    fn drop(&mut self) {
        self.client.disconnect();
        self.pool_handle.abort();
    }
}
