//! Chrome-backed target surface.
//!
//! The editor runs in a regular (non-headless) Chrome window driven over
//! the DevTools protocol. Each surface is one tab; replacing the surface
//! opens a fresh tab and closes the old one.

#![deny(deprecated)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use headless_chrome::protocol::cdp::{Emulation, Page};
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::Deserialize;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::{APP_DIR, ShellConfig};
use crate::error::SurfaceError;
use crate::probe::script::{PageEvaluator, ScriptedPage};
use crate::probe::{ExecutionRequest, Probe, ProbeFault};
use crate::surface::{DEFAULT_ZOOM, SurfaceFactory, SurfaceState, TargetSurface};

/// Chrome closes the connection after this long without protocol traffic.
const IDLE_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub chrome_path: Option<PathBuf>,
    pub debug_port: u16,
    pub window_size: (u32, u32),
    pub profile_dir: PathBuf,
}

impl ChromeOptions {
    pub fn from_config(config: &ShellConfig) -> Result<Self> {
        let profile_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("No local data directory"))?
            .join(APP_DIR)
            .join("chrome-profile");
        Ok(Self {
            chrome_path: config.chrome_path.clone().or_else(find_chrome),
            debug_port: config.debug_port,
            window_size: (config.window_width, config.window_height),
            profile_dir,
        })
    }
}

#[derive(Deserialize)]
struct VersionInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: String,
}

/// Ask an already running Chrome on `port` for its browser websocket URL.
pub async fn discover_debugger(port: u16) -> Option<String> {
    let endpoint = format!("http://127.0.0.1:{port}/json/version");
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .ok()?;
    let info: VersionInfo = client.get(&endpoint).send().await.ok()?.json().await.ok()?;
    Some(info.web_socket_debugger_url)
}

/// One Chrome instance, shared by every surface the window opens.
pub struct ChromeHost {
    browser: Arc<Browser>,
    initial_tab: Option<Arc<Tab>>,
    debug_port: u16,
    runtime: Handle,
}

impl ChromeHost {
    /// Attach to the Chrome at `debugger_url` if given, otherwise launch one
    /// with its own profile directory. Blocking.
    pub fn start(
        options: &ChromeOptions,
        debugger_url: Option<String>,
        runtime: Handle,
    ) -> Result<Self> {
        if let Some(url) = debugger_url {
            info!(target: "surface", %url, "attaching to running Chrome");
            match Browser::connect(url) {
                Ok(browser) => {
                    return Ok(Self {
                        browser: Arc::new(browser),
                        initial_tab: None,
                        debug_port: options.debug_port,
                        runtime,
                    });
                }
                Err(err) => warn!(target: "surface", %err, "attach failed, launching instead"),
            }
        }

        std::fs::create_dir_all(&options.profile_dir)?;
        let launch = LaunchOptions {
            headless: false,
            path: options.chrome_path.clone(),
            user_data_dir: Some(options.profile_dir.clone()),
            port: Some(options.debug_port),
            window_size: Some(options.window_size),
            args: vec![
                std::ffi::OsStr::new("--no-first-run"),
                std::ffi::OsStr::new("--no-default-browser-check"),
                std::ffi::OsStr::new("--disable-infobars"),
                std::ffi::OsStr::new("--password-store=basic"),
            ],
            idle_browser_timeout: IDLE_TIMEOUT,
            ..Default::default()
        };

        info!(
            target: "surface",
            port = options.debug_port,
            profile = %options.profile_dir.display(),
            "launching Chrome"
        );
        let browser = Browser::new(launch)
            .map_err(|e| anyhow::anyhow!("Browser launch failed: {}", e))?;
        let initial_tab = browser
            .get_tabs()
            .lock()
            .ok()
            .and_then(|tabs| tabs.first().cloned());

        Ok(Self {
            browser: Arc::new(browser),
            initial_tab,
            debug_port: options.debug_port,
            runtime,
        })
    }
}

impl SurfaceFactory for ChromeHost {
    fn open(&mut self, url: &str) -> Result<Box<dyn TargetSurface>, SurfaceError> {
        let tab = match self.initial_tab.take() {
            Some(tab) => tab,
            None => self
                .browser
                .new_tab()
                .map_err(|e| SurfaceError::backend("open tab", e))?,
        };
        let mut surface = ChromeSurface {
            browser: self.browser.clone(),
            tab,
            devtools: None,
            debug_port: self.debug_port,
            loads: LoadTracker::new(),
            runtime: self.runtime.clone(),
        };
        surface.navigate(url, SurfaceState::Loading)?;
        info!(target: "surface", %url, "surface opened");
        Ok(Box::new(surface))
    }
}

pub struct ChromeSurface {
    browser: Arc<Browser>,
    tab: Arc<Tab>,
    devtools: Option<Arc<Tab>>,
    debug_port: u16,
    loads: LoadTracker,
    runtime: Handle,
}

/// Load state and zoom shared between a surface and its watcher threads.
#[derive(Debug, Clone)]
struct LoadTracker {
    state: Arc<AtomicU8>,
    /// Bumped on every navigation so a stale watcher cannot mark a newer
    /// load as ready.
    navigation: Arc<AtomicU64>,
    /// `f64` bits. Survives navigation; the page's own scale does not.
    zoom: Arc<AtomicU64>,
}

impl LoadTracker {
    fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(encode(SurfaceState::Loading))),
            navigation: Arc::new(AtomicU64::new(0)),
            zoom: Arc::new(AtomicU64::new(DEFAULT_ZOOM.to_bits())),
        }
    }

    fn state(&self) -> SurfaceState {
        decode(self.state.load(Ordering::SeqCst))
    }

    fn begin(&self, state: SurfaceState) -> u64 {
        self.state.store(encode(state), Ordering::SeqCst);
        self.navigation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Mark load `ticket` ready if no other navigation started since.
    /// Returns the zoom the fresh page has to be brought back to.
    fn settled(&self, ticket: u64) -> Option<f64> {
        if self.navigation.load(Ordering::SeqCst) != ticket {
            return None;
        }
        self.state.store(encode(SurfaceState::Ready), Ordering::SeqCst);
        Some(self.zoom())
    }

    /// Invalidate every outstanding watcher.
    fn retire(&self) {
        self.navigation.fetch_add(1, Ordering::SeqCst);
    }

    fn zoom(&self) -> f64 {
        f64::from_bits(self.zoom.load(Ordering::SeqCst))
    }

    fn set_zoom(&self, factor: f64) {
        self.zoom.store(factor.to_bits(), Ordering::SeqCst);
    }
}

fn apply_zoom(tab: &Tab, factor: f64) -> Result<(), SurfaceError> {
    tab.call_method(Emulation::SetPageScaleFactor {
        page_scale_factor: factor,
    })
    .map_err(|e| SurfaceError::backend("zoom", e))?;
    Ok(())
}

/// Evaluates probe steps in a tab.
struct TabEvaluator(Arc<Tab>);

impl PageEvaluator for TabEvaluator {
    fn evaluate(&mut self, source: &str) -> Result<serde_json::Value, ProbeFault> {
        let remote = self
            .0
            .evaluate(source, false)
            .map_err(|e| ProbeFault(e.to_string()))?;
        Ok(remote.value.unwrap_or(serde_json::Value::Null))
    }
}

fn encode(state: SurfaceState) -> u8 {
    match state {
        SurfaceState::Absent => 0,
        SurfaceState::Loading => 1,
        SurfaceState::Ready => 2,
        SurfaceState::Navigating => 3,
    }
}

fn decode(raw: u8) -> SurfaceState {
    match raw {
        1 => SurfaceState::Loading,
        2 => SurfaceState::Ready,
        3 => SurfaceState::Navigating,
        _ => SurfaceState::Absent,
    }
}

impl ChromeSurface {
    fn begin(&self, state: SurfaceState) -> u64 {
        self.loads.begin(state)
    }

    /// Mark ready once the tab settles, unless another navigation started,
    /// and restore the zoom the new page lost.
    fn watch(&self, ticket: u64) {
        let tab = self.tab.clone();
        let loads = self.loads.clone();
        self.runtime.spawn_blocking(move || match tab.wait_until_navigated() {
            Ok(_) => {
                if let Some(zoom) = loads.settled(ticket) {
                    if (zoom - DEFAULT_ZOOM).abs() > f64::EPSILON {
                        if let Err(err) = apply_zoom(&tab, zoom) {
                            warn!(target: "surface", %err, "could not restore zoom");
                        }
                    }
                    debug!(target: "surface", url = %tab.get_url(), zoom, "surface ready");
                }
            }
            Err(err) => warn!(target: "surface", %err, "page did not finish loading"),
        });
    }

    fn navigate(&mut self, url: &str, state: SurfaceState) -> Result<(), SurfaceError> {
        let ticket = self.begin(state);
        self.tab
            .navigate_to(url)
            .map_err(|e| SurfaceError::backend("navigate", e))?;
        self.watch(ticket);
        Ok(())
    }

    fn history(&self) -> Result<(u32, Vec<Page::NavigationEntry>), SurfaceError> {
        let history = self
            .tab
            .call_method(Page::GetNavigationHistory(None))
            .map_err(|e| SurfaceError::backend("read history", e))?;
        Ok((history.current_index, history.entries))
    }

    fn go_to_offset(&mut self, offset: i64) -> Result<(), SurfaceError> {
        let (current, entries) = self.history()?;
        let target = i64::from(current) + offset;
        let Some(entry) = usize::try_from(target).ok().and_then(|i| entries.get(i)) else {
            return Ok(());
        };
        let ticket = self.begin(SurfaceState::Navigating);
        self.tab
            .call_method(Page::NavigateToHistoryEntry { entry_id: entry.id })
            .map_err(|e| SurfaceError::backend("history navigation", e))?;
        self.watch(ticket);
        Ok(())
    }

    fn devtools_url(&self) -> String {
        let port = self.debug_port;
        format!(
            "http://127.0.0.1:{port}/devtools/inspector.html?ws=127.0.0.1:{port}/devtools/page/{}",
            self.tab.get_target_id()
        )
    }
}

impl TargetSurface for ChromeSurface {
    fn state(&self) -> SurfaceState {
        self.loads.state()
    }

    fn reload(&mut self) -> Result<(), SurfaceError> {
        let ticket = self.begin(SurfaceState::Loading);
        self.tab
            .reload(false, None)
            .map_err(|e| SurfaceError::backend("reload", e))?;
        self.watch(ticket);
        Ok(())
    }

    fn reload_bypassing_cache(&mut self) -> Result<(), SurfaceError> {
        let ticket = self.begin(SurfaceState::Loading);
        self.tab
            .reload(true, None)
            .map_err(|e| SurfaceError::backend("reload", e))?;
        self.watch(ticket);
        Ok(())
    }

    fn zoom_factor(&self) -> Result<f64, SurfaceError> {
        Ok(self.loads.zoom())
    }

    fn set_zoom_factor(&mut self, factor: f64) -> Result<(), SurfaceError> {
        apply_zoom(&self.tab, factor)?;
        self.loads.set_zoom(factor);
        debug!(target: "surface", factor, "zoom set");
        Ok(())
    }

    fn can_go_back(&self) -> Result<bool, SurfaceError> {
        let (current, _) = self.history()?;
        Ok(current > 0)
    }

    fn go_back(&mut self) -> Result<(), SurfaceError> {
        self.go_to_offset(-1)
    }

    fn can_go_forward(&self) -> Result<bool, SurfaceError> {
        let (current, entries) = self.history()?;
        Ok((current as usize) + 1 < entries.len())
    }

    fn go_forward(&mut self) -> Result<(), SurfaceError> {
        self.go_to_offset(1)
    }

    fn load_url(&mut self, url: &str) -> Result<(), SurfaceError> {
        self.navigate(url, SurfaceState::Navigating)
    }

    fn is_devtools_open(&self) -> Result<bool, SurfaceError> {
        let Some(devtools) = &self.devtools else {
            return Ok(false);
        };
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| SurfaceError::backend("list tabs", e))?;
        Ok(tabs
            .iter()
            .any(|t| t.get_target_id() == devtools.get_target_id()))
    }

    fn open_devtools(&mut self) -> Result<(), SurfaceError> {
        let url = self.devtools_url();
        let devtools = self
            .browser
            .new_tab()
            .map_err(|e| SurfaceError::backend("open devtools", e))?;
        devtools
            .navigate_to(&url)
            .map_err(|e| SurfaceError::backend("open devtools", e))?;
        self.devtools = Some(devtools);
        Ok(())
    }

    fn close_devtools(&mut self) -> Result<(), SurfaceError> {
        if let Some(devtools) = self.devtools.take() {
            devtools
                .close(false)
                .map_err(|e| SurfaceError::backend("close devtools", e))?;
        }
        Ok(())
    }

    fn run_in_context(&mut self, request: ExecutionRequest) -> Result<(), SurfaceError> {
        let tab = self.tab.clone();
        self.runtime.spawn_blocking(move || {
            let mut page = ScriptedPage::new(TabEvaluator(tab));
            let outcome = Probe::run(&request, &mut page);
            debug!(target: "surface", action = %request.action, ?outcome, "probe finished");
        });
        Ok(())
    }
}

impl Drop for ChromeSurface {
    fn drop(&mut self) {
        self.loads.retire();
        if let Some(devtools) = self.devtools.take() {
            let _ = devtools.close(false);
        }
        if let Err(err) = self.tab.close(false) {
            debug!(target: "surface", %err, "failed to close replaced tab");
        }
    }
}

/// Well-known Chrome install locations for the current platform. `None`
/// lets the launcher search on its own.
fn find_chrome() -> Option<PathBuf> {
    let candidates: Vec<PathBuf> = if cfg!(target_os = "windows") {
        let mut paths = vec![
            PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        ];
        if let Some(local) = dirs::data_local_dir() {
            paths.push(local.join(r"Google\Chrome\Application\chrome.exe"));
        }
        paths
    } else if cfg!(target_os = "macos") {
        vec![PathBuf::from(
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        )]
    } else {
        ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"]
            .iter()
            .map(|name| PathBuf::from("/usr/bin").join(name))
            .collect()
    };

    candidates.into_iter().find(|p| p.exists())
}
