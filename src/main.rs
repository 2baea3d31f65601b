use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use crossterm::event::KeyEventKind;

use process_gopher::app::info::InfoApp;
use process_gopher::app::monitor::MonitorApp;
use process_gopher::app::{AppContext, ResolvedKeybinds, Screen, request_refresh};
use process_gopher::config::{Config, load_config, load_config_from_path};
use process_gopher::error::SampleError;
use process_gopher::event::{Event, EventHandler};
use process_gopher::logging::{self, LogTarget};
use process_gopher::runtime::marshaller::{self, UiQueue};
use process_gopher::runtime::pool::{Task, WorkerPool};
use process_gopher::system::cache::CachedProvider;
use process_gopher::system::collector::{Collector, Section};
use process_gopher::system::platform;
use process_gopher::system::provider::Provider;
use process_gopher::system::snapshot::Snapshot;

/// Redraw cadence while idle, so transient notices expire on screen.
const TICK_RATE: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(
    name = "process-gopher",
    version,
    about = "System information viewer and process monitor"
)]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Auto-refresh interval in seconds
    #[arg(long, global = true)]
    interval: Option<u64>,

    /// Start with auto-refresh off
    #[arg(long, global = true, default_value_t = false)]
    no_auto_refresh: bool,

    /// Platform provider: auto, linux, darwin
    #[arg(long, global = true)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// System-information viewer
    Info,
    /// Process monitor with end-process support
    Monitor,
    /// Print one full snapshot as JSON and exit
    Snapshot {
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);
    let command = cli.command.unwrap_or(Command::Monitor);

    let target = match command {
        Command::Snapshot { .. } => LogTarget::Stderr,
        _ => match logging::log_path() {
            Some(path) => LogTarget::File(path),
            None => LogTarget::Stderr,
        },
    };
    logging::init(&config.general.log_level, target)?;

    let pool = Arc::new(
        WorkerPool::new(config.runtime.pool())
            .map_err(|e| eyre!("failed to start worker pool: {e}"))?,
    );
    let native: Arc<dyn Provider> = platform::provider_for(platform::resolve(&config.general.provider));
    tracing::info!(provider = native.name(), "provider selected");
    let provider: Arc<dyn Provider> =
        Arc::new(CachedProvider::new(native, config.runtime.cache_ttl()));

    let result = match command {
        Command::Snapshot { pretty } => print_snapshot(&pool, provider, pretty).await,
        Command::Info => {
            let (ui, queue) = marshaller::channel::<InfoApp>();
            let ctx = AppContext::new(
                ui,
                pool.clone(),
                provider,
                &Section::ALL,
                interval(config.info.refresh_interval_secs),
                config.info.auto_refresh,
            );
            let keybinds = ResolvedKeybinds::from_config(&config.keybinds);
            let app = InfoApp::new(&config.info, keybinds, ctx);
            run_terminal(app, queue).await
        }
        Command::Monitor => {
            let (ui, queue) = marshaller::channel::<MonitorApp>();
            let ctx = AppContext::new(
                ui,
                pool.clone(),
                provider,
                &Section::MONITOR,
                interval(config.monitor.refresh_interval_secs),
                config.monitor.auto_refresh,
            );
            let keybinds = ResolvedKeybinds::from_config(&config.keybinds);
            let app = MonitorApp::new(&config.monitor, keybinds, ctx);
            run_terminal(app, queue).await
        }
    };

    if let Err(err) = pool.shutdown() {
        tracing::warn!(%err, "worker pool did not stop cleanly");
    }
    result
}

fn interval(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

async fn run_terminal<S: Screen>(app: S, queue: UiQueue<S>) -> Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let result = run(&mut terminal, app, queue).await;
    ratatui::restore();
    result
}

async fn run<S: Screen>(
    terminal: &mut ratatui::DefaultTerminal,
    mut app: S,
    mut queue: UiQueue<S>,
) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    app.context().scheduler.start();
    request_refresh(&mut app);
    terminal.draw(|frame| app.render(frame))?;

    while app.is_running() {
        tokio::select! {
            event = events.next() => match event {
                Some(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    let action = app.map_key(key);
                    app.dispatch(action);
                }
                Some(_) => {}
                None => break,
            },
            task = queue.next() => match task {
                Some(task) => task(&mut app),
                None => break,
            },
        }
        queue.drain(&mut app);
        terminal.draw(|frame| app.render(frame))?;
    }

    app.context().scheduler.close();
    Ok(())
}

/// One collector pass over every section, run on the pool like any refresh.
async fn print_snapshot(pool: &Arc<WorkerPool>, provider: Arc<dyn Provider>, pretty: bool) -> Result<()> {
    type Slot = Option<Result<Snapshot, SampleError>>;

    let collector = Collector::new(provider, &Section::ALL);
    let (ui, mut queue) = marshaller::channel::<Slot>();
    let task = Task::new("snapshot", move |cx| collector.collect(cx))
        .on_complete(|slot: &mut Slot, result| *slot = Some(result));
    pool.submit(&ui, task);
    drop(ui);

    let mut slot: Slot = None;
    while let Some(task) = queue.next().await {
        task(&mut slot);
    }

    let snapshot = slot.ok_or_else(|| eyre!("snapshot was cancelled"))??;
    let json = if pretty {
        serde_json::to_string_pretty(&snapshot)?
    } else {
        serde_json::to_string(&snapshot)?
    };
    println!("{json}");
    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(secs) = cli.interval {
        config.info.refresh_interval_secs = secs;
        config.monitor.refresh_interval_secs = secs;
    }
    if cli.no_auto_refresh {
        config.info.auto_refresh = false;
        config.monitor.auto_refresh = false;
    }
    if let Some(ref provider) = cli.provider {
        config.general.provider = provider.clone();
    }

    config
}
