//! Interactive login for the user session.
//!
//! The bot identity signs in with a token at startup; the user session needs
//! a one-time phone/code (and possibly 2FA) login before `tgsaver run` can
//! read restricted channels.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;

use crate::config;
use crate::tg::TgClient;
use crate::Cli;

#[derive(Args, Debug, Clone)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub cmd: Option<AuthCommand>,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum AuthCommand {
    /// Check whether the user session is signed in
    Status,
    /// Sign out and remove the user session
    Logout,
}

pub fn user_session_path(data_dir: &str) -> String {
    format!("{}/user.session", data_dir)
}

pub fn bot_session_path(data_dir: &str) -> String {
    format!("{}/bot.session", data_dir)
}

pub async fn run(cli: &Cli, args: &AuthArgs) -> Result<()> {
    match &args.cmd {
        Some(AuthCommand::Status) => status(cli).await,
        Some(AuthCommand::Logout) => logout(cli).await,
        None => interactive_auth(cli).await,
    }
}

async fn interactive_auth(cli: &Cli) -> Result<()> {
    let (api_id, api_hash) = config::api_credentials_from_env()?;
    let data_dir = cli.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let tg = TgClient::connect(&user_session_path(&data_dir), api_id)?;
    let client = &tg.client;

    if client.is_authorized().await? {
        eprintln!("User session already signed in.");
        return Ok(());
    }

    eprintln!("Signing in the user session used to read restricted channels.");
    eprint!("Phone number (international format, e.g. +34612345678): ");
    io::stderr().flush()?;
    let mut phone = String::new();
    io::stdin().read_line(&mut phone)?;
    let phone = phone.trim().to_string();

    if phone.is_empty() {
        anyhow::bail!("Phone number is required");
    }

    let token = client
        .request_login_code(&phone, &api_hash)
        .await
        .with_context(|| format!("Failed to request login code for {}", phone))?;
    eprintln!("Login code sent via Telegram.");

    eprint!("Enter the code: ");
    io::stderr().flush()?;
    let mut code = String::new();
    io::stdin().read_line(&mut code)?;
    let code = code.trim().to_string();

    use grammers_client::SignInError;
    let user = match client.sign_in(&token, &code).await {
        Ok(user) => user,
        Err(SignInError::PasswordRequired(password_token)) => {
            eprintln!("Two-factor authentication required.");
            let hint = password_token
                .hint()
                .map(|s| s.to_string())
                .unwrap_or_default();
            if !hint.is_empty() {
                eprintln!("Password hint: {}", hint);
            }
            let password = rpassword::prompt_password("Enter 2FA password: ")?;
            client
                .check_password(password_token, password.as_bytes().to_vec())
                .await
                .context("Failed to verify 2FA password")?
        }
        Err(e) => {
            anyhow::bail!("Sign in failed: {}", e);
        }
    };

    let name = user.first_name().map(|s| s.to_string()).unwrap_or_default();
    eprintln!("Signed in as {}. Posts this account can read can now be saved.", name);
    Ok(())
}

async fn status(cli: &Cli) -> Result<()> {
    let (api_id, _) = config::api_credentials_from_env()?;
    let session_path = user_session_path(&cli.data_dir());

    if !std::path::Path::new(&session_path).exists() {
        println!("Not authenticated. Run `tgsaver auth`.");
        return Ok(());
    }

    match TgClient::connect(&session_path, api_id) {
        Ok(tg) => {
            if tg.client.is_authorized().await? {
                println!("Authenticated.");
            } else {
                println!("Session exists but not signed in. Run `tgsaver auth`.");
            }
        }
        Err(_) => {
            println!("Session exists but failed to connect. Try `tgsaver auth`.");
        }
    }

    Ok(())
}

async fn logout(cli: &Cli) -> Result<()> {
    let (api_id, _) = config::api_credentials_from_env()?;
    let session_path = user_session_path(&cli.data_dir());

    if !std::path::Path::new(&session_path).exists() {
        anyhow::bail!("No user session found. Nothing to log out from.");
    }

    let tg = TgClient::connect(&session_path, api_id)?;
    tg.client
        .sign_out()
        .await
        .context("Failed to sign out from Telegram")?;
    let _ = std::fs::remove_file(&session_path);

    println!("Logged out.");
    Ok(())
}
