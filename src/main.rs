mod config;
mod conversation;
mod events;
mod gemini;
mod markdown;
mod ui;

use std::fs::OpenOptions;
use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::ui::ChatApp;

#[derive(Parser)]
#[command(name = "flashchat")]
#[command(version)]
#[command(about = "Terminal chat client for Google Gemini", long_about = None)]
struct Cli {
    /// Override the configured model identifier.
    #[arg(long)]
    model: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(model) = cli.model {
        config.model = model;
    }

    init_logging(&config, cli.verbose)?;

    if config.api_key.is_none() {
        // Not fatal here; the first send reports it in the chat.
        tracing::warn!("no Gemini API key configured; sends will fail until one is set");
    }

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let app = ChatApp::new(&config);
    let result = app.run(&mut terminal).await;

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to restore cursor")?;

    result
}

/// Log to a file under the config directory so the TUI stays clean.
fn init_logging(config: &Config, verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.home.join("flashchat.log"))
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .init();

    Ok(())
}
