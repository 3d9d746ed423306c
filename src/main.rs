use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use docmost_shell::catalog::{Catalog, CatalogProfile};
use docmost_shell::config::{ConfigStore, ShellConfig, normalize_base_url};
use docmost_shell::control::{self, BridgeState};
use docmost_shell::dispatcher::{self, Dispatcher, HostCommand};
use docmost_shell::logging;
use docmost_shell::surface::SurfaceFactory;
use docmost_shell::surface::chrome::{ChromeHost, ChromeOptions, discover_debugger};
use docmost_shell::ui::{self, ShellApp};

#[derive(Parser, Debug)]
#[command(name = "docmost-shell", version, about = "Native shell for a Docmost workspace")]
struct Cli {
    /// Workspace base URL (overrides config and DOCMOST_URL)
    #[arg(long)]
    url: Option<String>,

    /// Built-in selector catalog to use
    #[arg(long, value_enum)]
    profile: Option<CatalogProfile>,

    /// JSON catalog replacing the built-in one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Config file (default: platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Chrome executable
    #[arg(long)]
    chrome: Option<PathBuf>,

    #[arg(long)]
    debug_port: Option<u16>,

    #[arg(long, conflicts_with = "no_control")]
    control_port: Option<u16>,

    /// Don't start the local control bridge
    #[arg(long)]
    no_control: bool,

    /// Register menu accelerators system-wide, not just in the shell window
    #[arg(long, conflicts_with = "no_hotkeys")]
    global_hotkeys: bool,

    /// Keep accelerators inside the shell window
    #[arg(long)]
    no_hotkeys: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn apply(&self, config: &mut ShellConfig) -> Result<()> {
        if let Some(url) = &self.url {
            config.base_url = normalize_base_url(url)?;
        }
        if let Some(profile) = self.profile {
            config.catalog_profile = profile;
        }
        if let Some(path) = &self.catalog {
            config.catalog_path = Some(path.clone());
        }
        if let Some(path) = &self.chrome {
            config.chrome_path = Some(path.clone());
        }
        if let Some(port) = self.debug_port {
            config.debug_port = port;
        }
        if let Some(port) = self.control_port {
            config.control_port = Some(port);
        }
        if self.no_control {
            config.control_port = None;
        }
        if self.global_hotkeys {
            config.hotkeys = true;
        }
        if self.no_hotkeys {
            config.hotkeys = false;
        }
        Ok(())
    }
}

fn load_catalog(config: &ShellConfig) -> Result<Catalog> {
    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => Catalog::for_profile(config.catalog_profile),
    };
    if catalog.profile() != config.catalog_profile {
        warn!(
            configured = %config.catalog_profile,
            loaded = %catalog.profile(),
            "catalog file overrides configured profile"
        );
    }
    Ok(catalog)
}

fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let _log_guard = logging::init(&cli.log_level, logging::default_log_dir().as_deref())?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting docmost-shell");

    let store = match &cli.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::default_location()?,
    };
    let mut config = store.load()?;
    config.apply_env()?;
    cli.apply(&mut config)?;
    info!(base_url = %config.base_url, config = %store.path().display(), "configuration loaded");

    let catalog = Arc::new(load_catalog(&config)?);
    info!(profile = %catalog.profile(), entries = catalog.len(), "catalog ready");

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<HostCommand>();
    let mut dispatcher = Dispatcher::new(catalog.clone(), config.base_url.clone());

    // The window still comes up without a browser; actions then report
    // that no surface is attached.
    let debugger = runtime.block_on(discover_debugger(config.debug_port));
    let options = ChromeOptions::from_config(&config)?;
    match ChromeHost::start(&options, debugger, runtime.handle().clone()) {
        Ok(mut host) => {
            match host.open(&config.base_url) {
                Ok(surface) => dispatcher.attach(surface),
                Err(err) => error!(%err, "failed to open the workspace"),
            }
            dispatcher = dispatcher.with_factory(Box::new(host));
        }
        Err(err) => error!("Chrome unavailable: {err:#}"),
    }

    let events = dispatcher.event_sender();
    let ui_events = dispatcher.subscribe();
    let dispatch_thread = std::thread::Builder::new()
        .name("dispatcher".into())
        .spawn(move || dispatcher::run(dispatcher, cmd_rx))
        .context("Failed to spawn dispatcher thread")?;

    if let Some(port) = config.control_port {
        let state = Arc::new(BridgeState {
            commands: cmd_tx.clone(),
            events,
            catalog: catalog.clone(),
        });
        match runtime.block_on(control::bind(port)) {
            Ok((listener, bound)) => {
                if bound != port {
                    warn!(preferred = port, bound, "control port taken, using fallback");
                }
                runtime.spawn(async move {
                    if let Err(err) = control::serve(listener, state).await {
                        error!(%err, "control bridge stopped");
                    }
                });
            }
            Err(err) => warn!(%err, "control bridge disabled, no port available"),
        }
    }

    let profile = catalog.profile();
    let ui_tx = cmd_tx.clone();
    let result = eframe::run_native(
        "Docmost",
        ui::native_options(),
        Box::new(move |cc| Ok(Box::new(ShellApp::new(cc, ui_tx, ui_events, profile, store, config)))),
    );

    info!("shutting down");
    let _ = cmd_tx.send(HostCommand::Shutdown);
    if dispatch_thread.join().is_err() {
        error!("dispatcher thread panicked");
    }
    runtime.shutdown_timeout(Duration::from_secs(1));

    result.map_err(|e| anyhow::anyhow!("Window failed: {e}"))
}
