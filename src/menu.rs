//! Native menu model: which actions the window offers, under which labels
//! and accelerators. One model per catalog profile.

use std::collections::HashSet;

use eframe::egui;
use global_hotkey::hotkey::{Code, HotKey, Modifiers as HotKeyModifiers};
use tracing::warn;

use crate::action::Action;
use crate::catalog::CatalogProfile;

pub const DOCS_URL: &str = "https://docmost.com/docs";
pub const ISSUES_URL: &str = "https://github.com/docmost/docmost/issues";

/// A key chord. "Primary" is Command on macOS and Control elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Accelerator {
    pub primary: bool,
    pub shift: bool,
    pub alt: bool,
    pub key: Code,
}

impl Accelerator {
    pub const fn cmd(key: Code) -> Self {
        Self {
            primary: true,
            shift: false,
            alt: false,
            key,
        }
    }

    pub const fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub const fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn modifiers(&self) -> HotKeyModifiers {
        let mut mods = HotKeyModifiers::empty();
        if self.primary {
            mods |= primary_modifier();
        }
        if self.shift {
            mods |= HotKeyModifiers::SHIFT;
        }
        if self.alt {
            mods |= HotKeyModifiers::ALT;
        }
        mods
    }

    pub fn to_hotkey(&self) -> HotKey {
        HotKey::new(Some(self.modifiers()), self.key)
    }

    /// The same chord as an in-window egui shortcut, if egui has the key.
    pub fn to_shortcut(&self) -> Option<egui::KeyboardShortcut> {
        let mut mods = egui::Modifiers::NONE;
        if self.primary {
            mods = mods | egui::Modifiers::COMMAND;
        }
        if self.shift {
            mods = mods | egui::Modifiers::SHIFT;
        }
        if self.alt {
            mods = mods | egui::Modifiers::ALT;
        }
        egui_key(self.key).map(|key| egui::KeyboardShortcut::new(mods, key))
    }

    /// Human-readable chord, e.g. `⌘⇧N` on macOS and `Ctrl+Shift+N` elsewhere.
    pub fn label(&self) -> String {
        let key = key_label(self.key);
        if cfg!(target_os = "macos") {
            let mut out = String::new();
            if self.alt {
                out.push('⌥');
            }
            if self.shift {
                out.push('⇧');
            }
            if self.primary {
                out.push('⌘');
            }
            out.push_str(&key);
            out
        } else {
            let mut parts: Vec<&str> = Vec::new();
            if self.primary {
                parts.push("Ctrl");
            }
            if self.alt {
                parts.push("Alt");
            }
            if self.shift {
                parts.push("Shift");
            }
            parts.push(&key);
            parts.join("+")
        }
    }
}

#[cfg(target_os = "macos")]
fn primary_modifier() -> HotKeyModifiers {
    HotKeyModifiers::SUPER
}

#[cfg(not(target_os = "macos"))]
fn primary_modifier() -> HotKeyModifiers {
    HotKeyModifiers::CONTROL
}

fn egui_key(code: Code) -> Option<egui::Key> {
    use egui::Key;
    Some(match code {
        Code::KeyA => Key::A,
        Code::KeyB => Key::B,
        Code::KeyC => Key::C,
        Code::KeyD => Key::D,
        Code::KeyE => Key::E,
        Code::KeyF => Key::F,
        Code::KeyG => Key::G,
        Code::KeyH => Key::H,
        Code::KeyI => Key::I,
        Code::KeyJ => Key::J,
        Code::KeyK => Key::K,
        Code::KeyL => Key::L,
        Code::KeyM => Key::M,
        Code::KeyN => Key::N,
        Code::KeyO => Key::O,
        Code::KeyP => Key::P,
        Code::KeyQ => Key::Q,
        Code::KeyR => Key::R,
        Code::KeyS => Key::S,
        Code::KeyT => Key::T,
        Code::KeyU => Key::U,
        Code::KeyV => Key::V,
        Code::KeyW => Key::W,
        Code::KeyX => Key::X,
        Code::KeyY => Key::Y,
        Code::KeyZ => Key::Z,
        Code::Digit0 => Key::Num0,
        Code::Digit1 => Key::Num1,
        Code::Digit2 => Key::Num2,
        Code::Digit3 => Key::Num3,
        Code::Digit4 => Key::Num4,
        Code::Digit5 => Key::Num5,
        Code::Digit6 => Key::Num6,
        Code::Digit7 => Key::Num7,
        Code::Digit8 => Key::Num8,
        Code::Digit9 => Key::Num9,
        Code::Equal => Key::Equals,
        Code::Minus => Key::Minus,
        Code::BracketLeft => Key::OpenBracket,
        Code::BracketRight => Key::CloseBracket,
        Code::Backslash => Key::Backslash,
        _ => return None,
    })
}

fn key_label(code: Code) -> String {
    match code {
        Code::Equal => "+".to_string(),
        Code::Minus => "-".to_string(),
        Code::BracketLeft => "[".to_string(),
        Code::BracketRight => "]".to_string(),
        Code::Backslash => "\\".to_string(),
        other => {
            let name = format!("{other:?}");
            name.strip_prefix("Key")
                .or_else(|| name.strip_prefix("Digit"))
                .unwrap_or(&name)
                .to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuItem {
    Action {
        label: &'static str,
        action: Action,
        accelerator: Option<Accelerator>,
    },
    /// Opens in the system browser, outside the editor surface.
    Link {
        label: &'static str,
        url: &'static str,
    },
    Separator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Menu {
    pub title: &'static str,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuModel {
    pub menus: Vec<Menu>,
}

fn item(label: &'static str, action: Action, accelerator: Accelerator) -> MenuItem {
    MenuItem::Action {
        label,
        action,
        accelerator: Some(accelerator),
    }
}

fn plain(label: &'static str, action: Action) -> MenuItem {
    MenuItem::Action {
        label,
        action,
        accelerator: None,
    }
}

fn cmd(key: Code) -> Accelerator {
    Accelerator::cmd(key)
}

impl MenuModel {
    pub fn for_profile(profile: CatalogProfile) -> Self {
        let mut menus = vec![view_menu()];
        match profile {
            CatalogProfile::Classic => {
                menus.push(navigate_menu());
                menus.push(Menu {
                    title: "Actions",
                    items: vec![
                        item("New Page", Action::NewPage, cmd(Code::KeyN)),
                        item("Toggle Sidebar", Action::ToggleSidebar, cmd(Code::Backslash)),
                        item(
                            "Toggle Comments",
                            Action::ToggleComments,
                            cmd(Code::KeyC).shift(),
                        ),
                        MenuItem::Separator,
                        item("Focus Mode", Action::FocusMode, cmd(Code::KeyF).shift()),
                    ],
                });
                menus.push(insert_menu());
                menus.push(share_menu());
                menus.push(Menu {
                    title: "Export",
                    items: vec![
                        // Collides with Insert > Excalidraw; the insert binding wins.
                        item(
                            "Export as Markdown",
                            Action::ExportMarkdown,
                            cmd(Code::KeyE).shift(),
                        ),
                        plain("Export as HTML", Action::ExportHtml),
                    ],
                });
                menus.push(help_menu(true));
            }
            CatalogProfile::Editor => {
                menus.push(navigate_menu());
                menus.push(Menu {
                    title: "Format",
                    items: vec![
                        item("Bold", Action::Bold, cmd(Code::KeyB)),
                        item("Italic", Action::Italic, cmd(Code::KeyI)),
                        item("Underline", Action::Underline, cmd(Code::KeyU)),
                        item(
                            "Strikethrough",
                            Action::Strikethrough,
                            cmd(Code::KeyS).shift(),
                        ),
                        item("Inline Code", Action::InlineCode, cmd(Code::KeyE)),
                        MenuItem::Separator,
                        item("Heading 1", Action::Heading1, cmd(Code::Digit1).alt()),
                        item("Heading 2", Action::Heading2, cmd(Code::Digit2).alt()),
                        item("Heading 3", Action::Heading3, cmd(Code::Digit3).alt()),
                        MenuItem::Separator,
                        item("Bullet List", Action::BulletList, cmd(Code::Digit8).shift()),
                        item(
                            "Numbered List",
                            Action::NumberedList,
                            cmd(Code::Digit7).shift(),
                        ),
                        item("Task List", Action::TaskList, cmd(Code::Digit9).shift()),
                        item("Quote", Action::Blockquote, cmd(Code::KeyB).shift()),
                        MenuItem::Separator,
                        item(
                            "Toggle Comments",
                            Action::ToggleComments,
                            cmd(Code::KeyC).shift(),
                        ),
                    ],
                });
                menus.push(insert_menu());
                menus.push(share_menu());
                menus.push(Menu {
                    title: "Export",
                    items: vec![
                        plain("Export as Markdown", Action::ExportMarkdown),
                        plain("Export as HTML", Action::ExportHtml),
                    ],
                });
                menus.push(help_menu(false));
            }
        }
        Self { menus }
    }

    pub fn actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.menus.iter().flat_map(|m| &m.items).filter_map(|i| match i {
            MenuItem::Action { action, .. } => Some(*action),
            _ => None,
        })
    }

    /// Accelerator → action pairs in menu order. When two items share a chord
    /// the first one keeps it.
    pub fn bindings(&self) -> Vec<(Accelerator, Action)> {
        let mut seen = HashSet::new();
        let mut bindings = Vec::new();
        for menu in &self.menus {
            for entry in &menu.items {
                let MenuItem::Action {
                    label,
                    action,
                    accelerator: Some(accelerator),
                } = entry
                else {
                    continue;
                };
                if seen.insert(*accelerator) {
                    bindings.push((*accelerator, *action));
                } else {
                    warn!(
                        target: "menu",
                        menu = menu.title,
                        item = *label,
                        chord = %accelerator.label(),
                        "accelerator already taken, item stays menu-only"
                    );
                }
            }
        }
        bindings
    }
}

fn view_menu() -> Menu {
    Menu {
        title: "View",
        items: vec![
            item("Reload", Action::Reload, cmd(Code::KeyR)),
            item("Force Reload", Action::ForceReload, cmd(Code::KeyR).shift()),
            MenuItem::Separator,
            item(
                "Toggle DevTools",
                Action::ToggleDevTools,
                cmd(Code::KeyI).alt(),
            ),
            MenuItem::Separator,
            item("Zoom In", Action::ZoomIn, cmd(Code::Equal)),
            item("Zoom Out", Action::ZoomOut, cmd(Code::Minus)),
            item("Actual Size", Action::ZoomReset, cmd(Code::Digit0)),
        ],
    }
}

fn navigate_menu() -> Menu {
    Menu {
        title: "Navigate",
        items: vec![
            item("Back", Action::GoBack, cmd(Code::BracketLeft)),
            item("Forward", Action::GoForward, cmd(Code::BracketRight)),
            MenuItem::Separator,
            item("Quick Search", Action::QuickSearch, cmd(Code::KeyK)),
            item("Go to Home", Action::GoHome, cmd(Code::KeyH).shift()),
        ],
    }
}

fn insert_menu() -> Menu {
    Menu {
        title: "Insert",
        items: vec![
            item(
                "Mermaid Diagram",
                Action::InsertMermaid,
                cmd(Code::KeyM).shift(),
            ),
            item(
                "Draw.io Diagram",
                Action::InsertDrawio,
                cmd(Code::KeyD).shift(),
            ),
            item(
                "Excalidraw Diagram",
                Action::InsertExcalidraw,
                cmd(Code::KeyE).shift(),
            ),
            MenuItem::Separator,
            item("Table", Action::InsertTable, cmd(Code::KeyT).shift()),
            item("Code Block", Action::InsertCodeBlock, cmd(Code::KeyC).alt()),
            item("Callout", Action::InsertCallout, cmd(Code::KeyA).alt()),
        ],
    }
}

fn share_menu() -> Menu {
    Menu {
        title: "Share",
        items: vec![
            plain("Share Page Publicly", Action::SharePage),
            item("Copy Page Link", Action::CopyLink, cmd(Code::KeyL)),
        ],
    }
}

fn help_menu(with_about: bool) -> Menu {
    let mut items = vec![
        MenuItem::Link {
            label: "Docmost Documentation",
            url: DOCS_URL,
        },
        plain("Keyboard Shortcuts", Action::ShowShortcuts),
        MenuItem::Separator,
        MenuItem::Link {
            label: "Report an Issue",
            url: ISSUES_URL,
        },
    ];
    if with_about {
        items.push(MenuItem::Separator);
        items.push(plain("About Docmost", Action::ShowAbout));
    }
    Menu {
        title: "Help",
        items,
    }
}
