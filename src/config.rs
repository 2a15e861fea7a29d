//! Runtime configuration from the environment.

use anyhow::{Context, Result};

/// Log file name inside the data directory, served back by /logs.
pub const LOG_FILE: &str = "tgsaver.log";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_id: i32,
    pub api_hash: String,
    pub bot_token: String,
    /// Transfer ceiling in bytes for non-premium user sessions.
    pub max_file_size: u64,
    /// When set, serve a liveness HTTP endpoint on this port.
    pub port: Option<u16>,
}

/// API credentials alone, enough for the auth subcommand.
pub fn api_credentials_from_env() -> Result<(i32, String)> {
    let api_id = std::env::var("API_ID")
        .context("`API_ID` environment variable is required")?
        .parse()
        .context("`API_ID` must be a 32-bit integer")?;
    let api_hash =
        std::env::var("API_HASH").context("`API_HASH` environment variable is required")?;
    Ok((api_id, api_hash))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let (api_id, api_hash) = api_credentials_from_env()?;

        let bot_token =
            std::env::var("BOT_TOKEN").context("`BOT_TOKEN` environment variable is required")?;

        let max_file_size = match std::env::var("MAX_FILE_SIZE") {
            Ok(v) => v
                .parse()
                .context("`MAX_FILE_SIZE` must be a byte count")?,
            Err(_) => crate::limits::DEFAULT_SIZE_LIMIT,
        };

        let port = match std::env::var("PORT") {
            Ok(v) => Some(v.parse().context("`PORT` must be a port number")?),
            Err(_) => None,
        };

        Ok(Config {
            api_id,
            api_hash,
            bot_token,
            max_file_size,
            port,
        })
    }
}
