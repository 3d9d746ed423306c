//! Native shell around a hosted Docmost workspace.
//!
//! The window owns menus and accelerators; the editor itself lives in a
//! browser surface the shell cannot see into. Actions reach the editor
//! either as direct surface controls or as a catalog entry handed to the
//! in-page probe.

pub mod action;
pub mod catalog;
pub mod config;
pub mod control;
pub mod dispatcher;
pub mod error;
pub mod hotkeys;
pub mod logging;
pub mod menu;
pub mod probe;
pub mod surface;
pub mod ui;

pub use action::Action;
pub use catalog::{Catalog, CatalogEntry, CatalogProfile};
pub use dispatcher::{DispatchEvent, Dispatcher, HostCommand};
pub use surface::{SurfaceFactory, SurfaceState, TargetSurface};
