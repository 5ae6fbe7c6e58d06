use anyhow::{anyhow, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::{self, OpenOptions},
    io,
    sync::{Arc, Mutex},
};
use tokio::sync::mpsc::unbounded_channel;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod app;
mod config;
mod controller;
mod error;
mod export;
mod extract;
mod form;
mod pcm;
mod playback;
mod progress;
mod prompt;
mod types;
mod ui;

use app::{AppEvent, AppState};
use config::AppConfig;
use controller::Controller;
use error::ClientError;
use playback::AudioContext;

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing()?;
    info!("starting surkar");

    let config = AppConfig::load()?;
    let client = Arc::new(api::Client::new(
        config.api_url(),
        config.api_key().map(String::from),
        config.generation_model(),
        config.speech_model(),
    )?);
    let audio = Arc::new(AudioContext::new());

    let (event_tx, mut event_rx) = unbounded_channel();
    let (command_tx, command_rx) = unbounded_channel();

    let controller = Controller::new(
        client.clone(),
        client.clone(),
        audio.clone(),
        event_tx,
        config.export_dir().clone(),
    );
    let controller_task = controller.spawn(command_rx);

    let mut app_state = AppState::new(&config);
    seed_model_status(&client, &mut app_state).await;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    enable_raw_mode()?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;

    let ui_result = ui::run(&mut terminal, &mut app_state, &mut event_rx, command_tx);

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;

    controller_task.abort();
    audio.shutdown();
    info!("surkar stopped");
    ui_result
}

async fn seed_model_status(client: &api::Client, app: &mut AppState) {
    match client.probe_model().await {
        Ok(body) => {
            let name = body
                .get("displayName")
                .and_then(|v| v.as_str())
                .unwrap_or_else(|| client.generation_model());
            let version = body.get("version").and_then(|v| v.as_str()).unwrap_or("-");
            app.handle_event(AppEvent::Info(format!(
                "মডেল প্রস্তুত: {name} (সংস্করণ {version}) @ {}",
                client.base_url()
            )));
        }
        Err(ClientError::MissingApiKey) => {
            app.handle_event(AppEvent::Error(
                "API কী পাওয়া যায়নি; SURKAR_API_KEY বা কনফিগ ফাইলে api_key দিন"
                    .to_string(),
            ));
        }
        Err(err) => {
            warn!("model probe failed: {err}");
            app.handle_event(AppEvent::Error(format!("মডেল যাচাই ব্যর্থ: {err}")));
        }
    }
}

/// Logs go to a file while the UI owns the terminal, falling back to stderr.
fn setup_tracing() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("surkar=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    let log_file = AppConfig::log_path().ok().and_then(|path| {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok()?;
        }
        OpenOptions::new().create(true).append(true).open(path).ok()
    });

    let result = match log_file {
        Some(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).try_init(),
        None => builder.with_writer(io::stderr).try_init(),
    };
    result.map_err(|err: Box<dyn std::error::Error + Send + Sync>| {
        anyhow!("failed to initialise tracing: {err}")
    })
}
