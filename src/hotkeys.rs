//! Accelerators, two ways.
//!
//! [`WindowShortcuts`] matches menu chords against egui input, so they only
//! fire while the shell window has focus. [`HotkeyBindings`] registers them
//! system-wide through `global-hotkey`, taking the chords from every other
//! application too; it is opt-in.

use std::collections::HashMap;

use eframe::egui;
use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::menu::MenuModel;

/// Hotkey id → action.
#[derive(Debug, Default, Clone)]
pub struct BindingTable {
    actions: HashMap<u32, Action>,
}

impl BindingTable {
    pub fn insert(&mut self, hotkey: &HotKey, action: Action) {
        self.actions.insert(hotkey.id(), action);
    }

    pub fn action_for(&self, id: u32) -> Option<Action> {
        self.actions.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Menu chords handled by the window itself.
#[derive(Debug, Clone)]
pub struct WindowShortcuts {
    /// Most modifiers first: egui matches Cmd+E against Cmd+Shift+E too.
    shortcuts: Vec<(egui::KeyboardShortcut, Action)>,
}

impl WindowShortcuts {
    pub fn new(menu: &MenuModel) -> Self {
        let mut shortcuts: Vec<_> = menu
            .bindings()
            .into_iter()
            .filter_map(|(accelerator, action)| {
                let shortcut = accelerator.to_shortcut();
                if shortcut.is_none() {
                    debug!(target: "hotkeys", chord = %accelerator.label(), "no in-window key");
                }
                shortcut.map(|s| (s, action))
            })
            .collect();
        shortcuts.sort_by_key(|(s, _)| {
            std::cmp::Reverse(u8::from(s.modifiers.shift) + u8::from(s.modifiers.alt))
        });
        Self { shortcuts }
    }

    pub fn len(&self) -> usize {
        self.shortcuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shortcuts.is_empty()
    }

    /// Consume this frame's matching key presses.
    pub fn poll(&self, ctx: &egui::Context) -> Vec<Action> {
        ctx.input_mut(|input| {
            self.shortcuts
                .iter()
                .filter(|(shortcut, _)| input.consume_shortcut(shortcut))
                .map(|(_, action)| *action)
                .collect()
        })
    }
}

/// Registered accelerators for one window. Must stay on the thread that
/// created it (the UI thread).
pub struct HotkeyBindings {
    manager: GlobalHotKeyManager,
    registered: Vec<HotKey>,
    table: BindingTable,
}

impl HotkeyBindings {
    pub fn register(menu: &MenuModel) -> Result<Self, global_hotkey::Error> {
        let manager = GlobalHotKeyManager::new()?;
        let mut registered = Vec::new();
        let mut table = BindingTable::default();

        for (accelerator, action) in menu.bindings() {
            let hotkey = accelerator.to_hotkey();
            match manager.register(hotkey) {
                Ok(()) => {
                    table.insert(&hotkey, action);
                    registered.push(hotkey);
                }
                Err(err) => warn!(
                    target: "hotkeys",
                    chord = %accelerator.label(),
                    %action,
                    %err,
                    "could not register accelerator"
                ),
            }
        }

        info!(target: "hotkeys", count = table.len(), "accelerators registered");
        Ok(Self {
            manager,
            registered,
            table,
        })
    }

    /// Drain pending hotkey events into the actions they stand for.
    pub fn poll(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        while let Ok(event) = GlobalHotKeyEvent::receiver().try_recv() {
            if event.state != HotKeyState::Pressed {
                continue;
            }
            match self.table.action_for(event.id) {
                Some(action) => actions.push(action),
                None => debug!(target: "hotkeys", id = event.id, "unbound hotkey"),
            }
        }
        actions
    }
}

impl Drop for HotkeyBindings {
    fn drop(&mut self) {
        if let Err(err) = self.manager.unregister_all(&self.registered) {
            debug!(target: "hotkeys", %err, "failed to unregister accelerators");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogProfile;

    fn press(ctx: &egui::Context, key: egui::Key, modifiers: egui::Modifiers) -> Vec<Action> {
        let shortcuts = WindowShortcuts::new(&MenuModel::for_profile(CatalogProfile::Classic));
        let input = egui::RawInput {
            events: vec![egui::Event::Key {
                key,
                physical_key: None,
                pressed: true,
                repeat: false,
                modifiers,
            }],
            ..Default::default()
        };
        let mut actions = Vec::new();
        let _ = ctx.run(input, |ctx| actions = shortcuts.poll(ctx));
        actions
    }

    #[test]
    fn window_shortcuts_fire_on_their_chord() {
        let ctx = egui::Context::default();
        assert_eq!(
            press(&ctx, egui::Key::K, egui::Modifiers::COMMAND),
            vec![Action::QuickSearch]
        );
        assert_eq!(
            press(&ctx, egui::Key::R, egui::Modifiers::COMMAND | egui::Modifiers::SHIFT),
            vec![Action::ForceReload]
        );
        assert_eq!(
            press(&ctx, egui::Key::R, egui::Modifiers::COMMAND),
            vec![Action::Reload]
        );
        assert!(press(&ctx, egui::Key::K, egui::Modifiers::NONE).is_empty());
    }

    #[test]
    fn global_registration_is_opt_in() {
        assert!(!crate::config::ShellConfig::default().hotkeys);
    }

    #[test]
    fn table_maps_hotkey_ids_back_to_actions() {
        let menu = MenuModel::for_profile(CatalogProfile::Classic);
        let mut table = BindingTable::default();
        for (accelerator, action) in menu.bindings() {
            table.insert(&accelerator.to_hotkey(), action);
        }
        assert_eq!(table.len(), menu.bindings().len());

        let (search, action) = menu
            .bindings()
            .into_iter()
            .find(|(_, a)| *a == Action::QuickSearch)
            .unwrap();
        assert_eq!(action, Action::QuickSearch);
        assert_eq!(
            table.action_for(search.to_hotkey().id()),
            Some(Action::QuickSearch)
        );
        assert_eq!(table.action_for(0), None);
    }
}
