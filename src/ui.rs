//! The native window: menu bar, accelerators, status and base-URL settings.
//!
//! The window never touches the editor surface. Everything it wants done is
//! sent to the dispatcher loop as a [`HostCommand`]; what happened comes back
//! as [`DispatchEvent`]s.

use std::time::Duration;

use eframe::egui;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::action::Action;
use crate::catalog::CatalogProfile;
use crate::config::{ConfigStore, ShellConfig};
use crate::dispatcher::{DispatchEvent, HostCommand};
use crate::hotkeys::{HotkeyBindings, WindowShortcuts};
use crate::menu::{MenuItem, MenuModel};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const ACCENT: egui::Color32 = egui::Color32::from_rgb(100, 149, 237);

pub struct ShellApp {
    commands: mpsc::UnboundedSender<HostCommand>,
    events: broadcast::Receiver<DispatchEvent>,
    menu: MenuModel,
    profile: CatalogProfile,
    hotkeys: Option<HotkeyBindings>,
    shortcuts: WindowShortcuts,
    store: ConfigStore,
    config: ShellConfig,
    url_input: String,
    url_error: Option<String>,
    last_event: Option<DispatchEvent>,
}

impl ShellApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        commands: mpsc::UnboundedSender<HostCommand>,
        events: broadcast::Receiver<DispatchEvent>,
        profile: CatalogProfile,
        store: ConfigStore,
        config: ShellConfig,
    ) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        // Cmd+=/-/0 belong to the editor surface, not to the window's own scale.
        cc.egui_ctx.options_mut(|o| o.zoom_with_keyboard = false);

        let menu = MenuModel::for_profile(profile);
        let shortcuts = WindowShortcuts::new(&menu);
        // Accelerators must be registered from the thread running the event loop.
        let hotkeys = if config.hotkeys {
            match HotkeyBindings::register(&menu) {
                Ok(bindings) => Some(bindings),
                Err(err) => {
                    warn!(target: "ui", %err, "global accelerators unavailable");
                    None
                }
            }
        } else {
            info!(target: "ui", "accelerators limited to the shell window");
            None
        };

        Self {
            commands,
            events,
            menu,
            profile,
            hotkeys,
            shortcuts,
            store,
            url_input: config.base_url.clone(),
            config,
            url_error: None,
            last_event: None,
        }
    }

    fn send(&self, action: Action) {
        if self.commands.send(HostCommand::Dispatch(action)).is_err() {
            warn!(target: "ui", %action, "dispatcher is gone");
        }
    }

    /// System-wide registrations already see the window's own key presses,
    /// so in-window matching only runs without them.
    fn poll_hotkeys(&self, ctx: &egui::Context) {
        let actions = match &self.hotkeys {
            Some(hotkeys) => hotkeys.poll(),
            None => self.shortcuts.poll(ctx),
        };
        for action in actions {
            self.send(action);
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.last_event = Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(target: "ui", skipped, "status fell behind");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    fn render_menu_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                for menu in &self.menu.menus {
                    ui.menu_button(menu.title, |ui| {
                        for item in &menu.items {
                            match item {
                                MenuItem::Action {
                                    label,
                                    action,
                                    accelerator,
                                } => {
                                    let mut button = egui::Button::new(*label);
                                    if let Some(accelerator) = accelerator {
                                        button = button.shortcut_text(accelerator.label());
                                    }
                                    if ui.add(button).clicked() {
                                        self.send(*action);
                                        ui.close();
                                    }
                                }
                                MenuItem::Link { label, url } => {
                                    if ui.button(*label).clicked() {
                                        ui.ctx().open_url(egui::OpenUrl::new_tab(*url));
                                        ui.close();
                                    }
                                }
                                MenuItem::Separator => {
                                    ui.separator();
                                }
                            }
                        }
                    });
                }
            });
        });
    }

    fn render_status(&self, ui: &mut egui::Ui) {
        egui::Frame::new()
            .fill(egui::Color32::from_rgb(25, 25, 25))
            .corner_radius(8.0)
            .inner_margin(12.0)
            .show(ui, |ui| {
                egui::Grid::new("status")
                    .num_columns(2)
                    .spacing([16.0, 6.0])
                    .show(ui, |ui| {
                        ui.label("Workspace");
                        ui.label(egui::RichText::new(&self.config.base_url).color(ACCENT));
                        ui.end_row();

                        ui.label("Catalog");
                        ui.label(self.profile.to_string());
                        ui.end_row();

                        ui.label("Accelerators");
                        ui.label(if self.hotkeys.is_some() { "system-wide" } else { "in window" });
                        ui.end_row();

                        ui.label("Last action");
                        ui.label(describe(self.last_event.as_ref()));
                        ui.end_row();
                    });
            });
    }

    fn render_settings(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Workspace URL").strong());
        ui.horizontal(|ui| {
            let available_width = ui.available_width() - 70.0;
            let edit = ui.add(
                egui::TextEdit::singleline(&mut self.url_input)
                    .hint_text("https://docs.example.com")
                    .desired_width(available_width),
            );
            let save = ui.button("Save");

            if save.clicked() || (edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)))
            {
                self.apply_base_url();
            }
        });
        if let Some(err) = &self.url_error {
            ui.label(egui::RichText::new(err).color(egui::Color32::LIGHT_RED));
        }
    }

    fn apply_base_url(&mut self) {
        match self.store.set_base_url(&mut self.config, &self.url_input) {
            Ok(url) => {
                self.url_error = None;
                self.url_input = url.clone();
                if self.commands.send(HostCommand::SetBaseUrl(url)).is_err() {
                    warn!(target: "ui", "dispatcher is gone");
                }
            }
            Err(err) => self.url_error = Some(err.to_string()),
        }
    }
}

fn describe(event: Option<&DispatchEvent>) -> String {
    match event {
        None => "none yet".to_string(),
        Some(DispatchEvent::Direct { action, state }) => format!("{action} ({state})"),
        Some(DispatchEvent::ProbeSent { action, state }) => format!("{action} sent ({state})"),
        Some(DispatchEvent::Unknown { name }) => format!("unknown action {name:?}"),
        Some(DispatchEvent::NotInCatalog { action }) => format!("{action}: not in catalog"),
        Some(DispatchEvent::NoSurface { action }) => format!("{action}: editor not open"),
        Some(DispatchEvent::SurfaceFailed { action, message }) => match action {
            Some(action) => format!("{action} failed: {message}"),
            None => format!("failed: {message}"),
        },
        Some(DispatchEvent::SurfaceReplaced { url }) => format!("opened {url}"),
    }
}

impl eframe::App for ShellApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_hotkeys(ctx);
        self.drain_events();

        self.render_menu_bar(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(8.0);
            ui.heading(egui::RichText::new("Docmost").size(24.0).strong().color(ACCENT));
            ui.add_space(8.0);
            self.render_status(ui);
            ui.add_space(16.0);
            self.render_settings(ui);
        });

        // Accelerators and dispatcher events arrive outside egui's input.
        ctx.request_repaint_after(POLL_INTERVAL);
    }
}

pub fn native_options() -> eframe::NativeOptions {
    eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Docmost")
            .with_inner_size([520.0, 340.0])
            .with_min_inner_size([400.0, 260.0]),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceState;

    #[test]
    fn status_lines_name_the_action() {
        assert_eq!(describe(None), "none yet");
        assert_eq!(
            describe(Some(&DispatchEvent::ProbeSent {
                action: Action::Bold,
                state: SurfaceState::Ready,
            })),
            "bold sent (ready)"
        );
        assert_eq!(
            describe(Some(&DispatchEvent::SurfaceFailed {
                action: None,
                message: "tab crashed".into(),
            })),
            "failed: tab crashed"
        );
    }
}
