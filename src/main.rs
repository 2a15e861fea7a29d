mod app;
mod classify;
mod cmd;
mod config;
mod error;
mod health;
mod limits;
mod link;
mod progress;
mod stats;
mod tasks;
mod tg;

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "tgsaver", version, about = "Telegram media saver bot (pure Rust, no TDLib)")]
pub struct Cli {
    /// Data directory for sessions, downloads and logs (default: ~/.tgsaver)
    #[arg(long, global = true, default_value = "~/.tgsaver")]
    pub data: String,

    #[command(subcommand)]
    pub command: cmd::Command,
}

impl Cli {
    pub fn data_dir(&self) -> String {
        let s = &self.data;
        if s.starts_with("~/") {
            if let Some(home) = dirs_home() {
                return format!("{}{}", home, &s[1..]);
            }
        }
        s.clone()
    }
}

fn dirs_home() -> Option<String> {
    std::env::var("HOME").ok()
}

/// Writes log records both to stderr and to the file that /logs serves.
struct Tee {
    file: std::fs::File,
}

impl io::Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let _ = self.file.write_all(buf);
        io::stderr().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = self.file.flush();
        io::stderr().flush()
    }
}

fn init_logging(data_dir: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let path = Path::new(data_dir).join(config::LOG_FILE);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(Tee { file })))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.data_dir()) {
        eprintln!("Failed to set up logging: {e:#}");
        std::process::exit(1);
    }

    if let Err(e) = cmd::run(cli).await {
        let msg = format!("{e:#}");
        log::error!("{msg}");
        eprintln!("Error: {msg}");
        std::process::exit(1);
    }
}
