//! Terminal dashboard for ridemap that mounts map consumers and shows how the shared SDK
//! bootstrap settles, falls back, and switches providers.

mod app;
mod input;
mod ui;

use std::{env, fs::File, io, sync::Arc, sync::Mutex, time::Duration as StdDuration};

use anyhow::{Result, anyhow};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use reqwest::Client;
use ridemap_core::{
    coordinator::MapBootstrap,
    document::Document,
    global,
    loader::ReadinessPolicy,
    plugin::LoaderRegistry,
    ports::{ResourceHost, SettingsSource},
    settings::HttpSettingsSource,
};
use ridemap_provider_google as google;
use ridemap_provider_mapbox as mapbox;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::input::Action;

const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_LOG_FILE: &str = "ridemap.log";

#[tokio::main]
async fn main() -> Result<()> {
    let api_url = env::var("RIDEMAP_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_owned());
    let log_file = env::var("RIDEMAP_LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_owned());
    init_tracing(&log_file)?;
    info!(%api_url, "starting ridemap dashboard");

    // HTTP + bootstrap setup
    let client = Client::builder().user_agent("ridemap/0.1").build()?;
    let document: Arc<dyn ResourceHost> = Arc::new(Document::new(client.clone()));
    let settings: Arc<dyn SettingsSource> = Arc::new(HttpSettingsSource::new(client, api_url));

    let bootstrap = global::get_or_init(|| {
        let policy = ReadinessPolicy::default();
        let registry = LoaderRegistry::new(vec![
            google::plugin(Arc::clone(&document), policy),
            mapbox::plugin(Arc::clone(&document), policy),
        ]);
        MapBootstrap::new(settings, registry)
    });

    // App state
    let app = App::new(bootstrap);

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn init_tracing(path: &str) -> Result<()> {
    // The terminal belongs to the UI, so logs go to a file.
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| anyhow!(err))
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    loop {
        app.drain_updates();

        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if event::poll(StdDuration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
        {
            match input::handle_key_event(key, &mut app) {
                Action::Quit => break,
                Action::None => {}
                Action::TogglePanel => app.toggle_selected(),
                Action::SwitchProvider => app.request_switch(),
                Action::RefreshConfig => app.request_refresh(),
            }
        }
    }

    Ok(())
}
