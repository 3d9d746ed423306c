//! The action dispatcher: the host-side half of command dispatch.
//!
//! One dispatcher per window. It exclusively owns the current surface and is
//! driven by a single loop ([`run`]) that handles one [`HostCommand`] at a
//! time, so surface access needs no locking. Dispatch never fails from the
//! caller's side: every problem ends up as a log line and a
//! [`DispatchEvent`].

use std::ops::ControlFlow;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::catalog::Catalog;
use crate::error::SurfaceError;
use crate::probe::ExecutionRequest;
use crate::surface::{self, DEFAULT_ZOOM, SurfaceFactory, SurfaceState, TargetSurface};

const EVENT_CAPACITY: usize = 64;

/// Messages delivered to the dispatcher loop.
#[derive(Debug, Clone)]
pub enum HostCommand {
    /// From menus and accelerators.
    Dispatch(Action),
    /// From the control bridge, by wire name; may be unknown.
    DispatchNamed(String),
    /// The configured base URL changed; replace the surface.
    SetBaseUrl(String),
    Shutdown,
}

/// What happened to a command. Published for the window and the control
/// bridge; nobody is required to listen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DispatchEvent {
    Direct {
        action: Action,
        state: SurfaceState,
    },
    ProbeSent {
        action: Action,
        state: SurfaceState,
    },
    Unknown {
        name: String,
    },
    NotInCatalog {
        action: Action,
    },
    NoSurface {
        action: Action,
    },
    SurfaceFailed {
        action: Option<Action>,
        message: String,
    },
    SurfaceReplaced {
        url: String,
    },
}

impl DispatchEvent {
    /// Same string as the serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchEvent::Direct { .. } => "direct",
            DispatchEvent::ProbeSent { .. } => "probeSent",
            DispatchEvent::Unknown { .. } => "unknown",
            DispatchEvent::NotInCatalog { .. } => "notInCatalog",
            DispatchEvent::NoSurface { .. } => "noSurface",
            DispatchEvent::SurfaceFailed { .. } => "surfaceFailed",
            DispatchEvent::SurfaceReplaced { .. } => "surfaceReplaced",
        }
    }
}

/// Surface controls that bypass the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectControl {
    Reload,
    ForceReload,
    ToggleDevTools,
    ZoomIn,
    ZoomOut,
    ZoomReset,
    GoBack,
    GoForward,
    GoHome,
}

impl DirectControl {
    fn from_action(action: Action) -> Option<Self> {
        Some(match action {
            Action::Reload => DirectControl::Reload,
            Action::ForceReload => DirectControl::ForceReload,
            Action::ToggleDevTools => DirectControl::ToggleDevTools,
            Action::ZoomIn => DirectControl::ZoomIn,
            Action::ZoomOut => DirectControl::ZoomOut,
            Action::ZoomReset => DirectControl::ZoomReset,
            Action::GoBack => DirectControl::GoBack,
            Action::GoForward => DirectControl::GoForward,
            Action::GoHome => DirectControl::GoHome,
            _ => return None,
        })
    }

    fn apply(self, surface: &mut dyn TargetSurface, base_url: &str) -> Result<(), SurfaceError> {
        match self {
            DirectControl::Reload => surface.reload(),
            DirectControl::ForceReload => surface.reload_bypassing_cache(),
            DirectControl::ToggleDevTools => {
                if surface.is_devtools_open()? {
                    surface.close_devtools()
                } else {
                    surface.open_devtools()
                }
            }
            DirectControl::ZoomIn => {
                let factor = surface::zoom_in(surface.zoom_factor()?);
                surface.set_zoom_factor(factor)
            }
            DirectControl::ZoomOut => {
                let factor = surface::zoom_out(surface.zoom_factor()?);
                surface.set_zoom_factor(factor)
            }
            DirectControl::ZoomReset => surface.set_zoom_factor(DEFAULT_ZOOM),
            DirectControl::GoBack => {
                if surface.can_go_back()? {
                    surface.go_back()
                } else {
                    Ok(())
                }
            }
            DirectControl::GoForward => {
                if surface.can_go_forward()? {
                    surface.go_forward()
                } else {
                    Ok(())
                }
            }
            DirectControl::GoHome => surface.load_url(base_url),
        }
    }
}

pub struct Dispatcher {
    catalog: Arc<Catalog>,
    base_url: String,
    surface: Option<Box<dyn TargetSurface>>,
    factory: Option<Box<dyn SurfaceFactory>>,
    events: broadcast::Sender<DispatchEvent>,
}

impl Dispatcher {
    pub fn new(catalog: Arc<Catalog>, base_url: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            catalog,
            base_url: base_url.into(),
            surface: None,
            factory: None,
            events,
        }
    }

    pub fn with_factory(mut self, factory: Box<dyn SurfaceFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Install a surface, dropping any previous one.
    pub fn attach(&mut self, surface: Box<dyn TargetSurface>) {
        self.surface = Some(surface);
    }

    pub fn detach(&mut self) -> Option<Box<dyn TargetSurface>> {
        self.surface.take()
    }

    pub fn surface_state(&self) -> SurfaceState {
        self.surface
            .as_ref()
            .map(|s| s.state())
            .unwrap_or(SurfaceState::Absent)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }

    pub fn event_sender(&self) -> broadcast::Sender<DispatchEvent> {
        self.events.clone()
    }

    /// Dispatch by wire name. Unknown names are logged and ignored.
    pub fn dispatch(&mut self, name: &str) {
        match name.parse::<Action>() {
            Ok(action) => self.dispatch_action(action),
            Err(err) => {
                info!(target: "dispatch", %err, "ignoring action");
                self.emit(DispatchEvent::Unknown {
                    name: name.to_string(),
                });
            }
        }
    }

    pub fn dispatch_action(&mut self, action: Action) {
        let Some(surface) = self.surface.as_deref_mut() else {
            debug!(target: "dispatch", %action, "no surface, dropping action");
            self.emit(DispatchEvent::NoSurface { action });
            return;
        };

        let state = surface.state();
        if state != SurfaceState::Ready {
            debug!(target: "dispatch", %action, %state, "surface not ready, attempting anyway");
        }

        let outcome = if let Some(control) = DirectControl::from_action(action) {
            debug!(target: "dispatch", %action, ?control, "surface control");
            control
                .apply(surface, &self.base_url)
                .map(|()| DispatchEvent::Direct { action, state })
        } else {
            let Some(entry) = self.catalog.entry_for(action) else {
                info!(
                    target: "dispatch",
                    %action,
                    profile = %self.catalog.profile(),
                    "no catalog entry, ignoring"
                );
                self.emit(DispatchEvent::NotInCatalog { action });
                return;
            };
            debug!(
                target: "dispatch",
                %action,
                candidates = entry.candidates.len(),
                fallback = entry.fallback.is_some(),
                "sending probe"
            );
            surface
                .run_in_context(ExecutionRequest::new(action, entry))
                .map(|()| DispatchEvent::ProbeSent { action, state })
        };

        match outcome {
            Ok(event) => self.emit(event),
            Err(err) => {
                warn!(target: "dispatch", %action, %err, "surface call failed");
                self.emit(DispatchEvent::SurfaceFailed {
                    action: Some(action),
                    message: err.to_string(),
                });
            }
        }
    }

    /// Point the window at a new base URL. With a factory the current surface
    /// is dropped and a fresh one opened; without one the current surface
    /// just navigates.
    pub fn set_base_url(&mut self, url: String) {
        info!(target: "dispatch", %url, "base URL changed");
        self.base_url = url;

        let result = match self.factory.as_mut() {
            Some(factory) => {
                self.surface = None;
                factory.open(&self.base_url).map(|fresh| {
                    self.surface = Some(fresh);
                })
            }
            None => match self.surface.as_deref_mut() {
                Some(surface) => surface.load_url(&self.base_url),
                None => Ok(()),
            },
        };

        match result {
            Ok(()) => self.emit(DispatchEvent::SurfaceReplaced {
                url: self.base_url.clone(),
            }),
            Err(err) => {
                warn!(target: "dispatch", %err, "failed to open surface for new base URL");
                self.emit(DispatchEvent::SurfaceFailed {
                    action: None,
                    message: err.to_string(),
                });
            }
        }
    }

    pub fn handle(&mut self, command: HostCommand) -> ControlFlow<()> {
        match command {
            HostCommand::Dispatch(action) => self.dispatch_action(action),
            HostCommand::DispatchNamed(name) => self.dispatch(&name),
            HostCommand::SetBaseUrl(url) => self.set_base_url(url),
            HostCommand::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn emit(&self, event: DispatchEvent) {
        let _ = self.events.send(event);
    }
}

/// The dispatcher loop. Blocks the calling thread until the channel closes
/// or a [`HostCommand::Shutdown`] arrives; run it on its own thread.
pub fn run(mut dispatcher: Dispatcher, mut commands: mpsc::UnboundedReceiver<HostCommand>) {
    info!(target: "dispatch", base_url = %dispatcher.base_url, "dispatcher loop started");
    while let Some(command) = commands.blocking_recv() {
        if dispatcher.handle(command).is_break() {
            break;
        }
    }
    info!(target: "dispatch", "dispatcher loop stopped");
}
