//! Selector catalog: for every probe-driven action, the ordered list of
//! element locators to try inside the editor page and the keyboard shortcut
//! to synthesize when none of them matches.
//!
//! The catalog is plain data. It is built once (from a built-in profile or a
//! JSON file), validated, and then shared read-only behind an `Arc`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::CatalogError;

/// Delay between opening a container menu and retrying the candidates.
pub const DEFAULT_SETTLE_MS: u64 = 100;

/// How specific a locator is. Ordered from most to least specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Specificity {
    TestId,
    AriaLabel,
    Title,
    ClassName,
    Structural,
}

/// A CSS-selector query for one interactive element in the editor page.
///
/// Purely advisory: nothing guarantees the element exists or keeps its
/// attributes between releases of the editor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementLocator(String);

impl ElementLocator {
    pub fn new(css: impl Into<String>) -> Self {
        Self(css.into())
    }

    pub fn test_id(value: &str) -> Self {
        Self(format!("[data-testid=\"{value}\"]"))
    }

    pub fn aria_label(value: &str) -> Self {
        Self(format!("[aria-label=\"{value}\"]"))
    }

    pub fn button_title(value: &str) -> Self {
        Self(format!("button[title=\"{value}\"]"))
    }

    pub fn class_contains(fragment: &str) -> Self {
        Self(format!("[class*=\"{fragment}\"]"))
    }

    pub fn css(&self) -> &str {
        &self.0
    }

    pub fn specificity(&self) -> Specificity {
        let css = self.0.trim();
        if css.starts_with("[data-testid") {
            Specificity::TestId
        } else if css.contains("[aria-label") {
            Specificity::AriaLabel
        } else if css.contains("[title") {
            Specificity::Title
        } else if css.contains("[class") || css.starts_with('.') {
            Specificity::ClassName
        } else {
            Specificity::Structural
        }
    }
}

impl fmt::Display for ElementLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Modifier keys held during a synthetic key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        meta: false,
        shift: false,
        alt: false,
    };

    pub const fn meta() -> Self {
        Modifiers {
            meta: true,
            ..Modifiers::NONE
        }
    }

    pub const fn meta_shift() -> Self {
        Modifiers {
            meta: true,
            shift: true,
            ..Modifiers::NONE
        }
    }

    pub const fn meta_alt() -> Self {
        Modifiers {
            meta: true,
            alt: true,
            ..Modifiers::NONE
        }
    }
}

/// Keyboard shortcut reproduced when no element can be located.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticInput {
    pub key: String,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl SyntheticInput {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }
}

/// A container (usually an overflow menu) that must be opened before the
/// candidates become visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reveal {
    pub opener: Vec<ElementLocator>,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_settle_ms() -> u64 {
    DEFAULT_SETTLE_MS
}

/// Page-native behavior that needs no locator at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageBuiltin {
    /// Write the page's current location to the clipboard.
    CopyLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub candidates: Vec<ElementLocator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<SyntheticInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal: Option<Reveal>,
    /// Extra locator lists activated independently, without fallback.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also: Vec<Vec<ElementLocator>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builtin: Option<PageBuiltin>,
}

impl CatalogEntry {
    pub fn new(candidates: Vec<ElementLocator>) -> Self {
        Self {
            candidates,
            fallback: None,
            reveal: None,
            also: Vec::new(),
            builtin: None,
        }
    }

    pub fn builtin(builtin: PageBuiltin) -> Self {
        Self {
            builtin: Some(builtin),
            ..Self::new(Vec::new())
        }
    }

    pub fn with_fallback(mut self, key: &str, modifiers: Modifiers) -> Self {
        self.fallback = Some(SyntheticInput::new(key, modifiers));
        self
    }

    pub fn reveal_via(mut self, opener: Vec<ElementLocator>) -> Self {
        self.reveal = Some(Reveal {
            opener,
            settle_ms: DEFAULT_SETTLE_MS,
        });
        self
    }

    pub fn also(mut self, locators: Vec<ElementLocator>) -> Self {
        self.also.push(locators);
        self
    }

    /// Whether running this entry can do anything at all.
    pub fn is_actionable(&self) -> bool {
        !self.candidates.is_empty() || self.fallback.is_some() || self.builtin.is_some()
    }

    fn validate(&self, action: Action) -> Result<(), CatalogError> {
        if action.is_direct_control() {
            return Err(CatalogError::DirectControlEntry { action });
        }
        if !self.is_actionable() {
            return Err(CatalogError::EmptyEntry { action });
        }
        check_order(action, &self.candidates)?;
        if let Some(reveal) = &self.reveal {
            check_order(action, &reveal.opener)?;
        }
        for list in &self.also {
            check_order(action, list)?;
        }
        Ok(())
    }
}

fn check_order(action: Action, locators: &[ElementLocator]) -> Result<(), CatalogError> {
    let mut previous = Specificity::TestId;
    for (index, locator) in locators.iter().enumerate() {
        if locator.css().trim().is_empty() {
            return Err(CatalogError::EmptyLocator { action, index });
        }
        let current = locator.specificity();
        if current < previous {
            return Err(CatalogError::SpecificityOrder {
                action,
                index,
                locator: locator.css().to_string(),
            });
        }
        previous = current;
    }
    Ok(())
}

/// Which generation of the action set a catalog (and its menus) belongs to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CatalogProfile {
    /// Page and workspace actions: search, new page, sidebar, focus mode.
    #[default]
    Classic,
    /// Text formatting actions; no page creation or sidebar control.
    Editor,
}

impl fmt::Display for CatalogProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogProfile::Classic => f.write_str("classic"),
            CatalogProfile::Editor => f.write_str("editor"),
        }
    }
}

/// Read-only action → entry table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    profile: CatalogProfile,
    entries: BTreeMap<Action, CatalogEntry>,
}

impl Catalog {
    pub fn from_entries(
        profile: CatalogProfile,
        entries: BTreeMap<Action, CatalogEntry>,
    ) -> Result<Self, CatalogError> {
        let catalog = Self { profile, entries };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn for_profile(profile: CatalogProfile) -> Self {
        match profile {
            CatalogProfile::Classic => Self::classic(),
            CatalogProfile::Editor => Self::editor(),
        }
    }

    /// Load a catalog from a JSON file of the form
    /// `{"profile": "editor", "entries": {"bold": {...}}}`.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog: Catalog =
            serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        for (action, entry) in &self.entries {
            entry.validate(*action)?;
        }
        Ok(())
    }

    pub fn entry_for(&self, action: Action) -> Option<&CatalogEntry> {
        self.entries.get(&action)
    }

    pub fn profile(&self) -> CatalogProfile {
        self.profile
    }

    pub fn actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The page and workspace action set.
    pub fn classic() -> Self {
        let mut entries = shared_entries();

        entries.insert(Action::QuickSearch, quick_search());
        entries.insert(
            Action::NewPage,
            CatalogEntry::new(vec![
                tid("new-page-button"),
                aria("New page"),
                aria("Create page"),
                title("New page"),
                class("new-page"),
                class("create-page"),
                ElementLocator::new(".sidebar-action-add"),
            ])
            .with_fallback("n", Modifiers::meta()),
        );
        entries.insert(
            Action::ToggleSidebar,
            CatalogEntry::new(vec![
                tid("sidebar-toggle"),
                aria("Toggle sidebar"),
                aria("Hide sidebar"),
                aria("Show sidebar"),
                title("Toggle sidebar"),
                class("sidebar-toggle"),
                class("collapse-sidebar"),
            ])
            .with_fallback("\\", Modifiers::meta()),
        );
        entries.insert(
            Action::FocusMode,
            CatalogEntry::new(vec![
                tid("sidebar-toggle"),
                aria("Toggle sidebar"),
                aria("Hide sidebar"),
                title("Toggle sidebar"),
                class("sidebar-toggle"),
            ])
            .also(vec![
                tid("comments-toggle"),
                aria("Comments"),
                class("comment-toggle"),
            ]),
        );
        entries.insert(
            Action::ShowAbout,
            CatalogEntry::new(vec![tid("about"), aria("About"), class("about")]),
        );

        Self {
            profile: CatalogProfile::Classic,
            entries,
        }
    }

    /// The text formatting action set.
    pub fn editor() -> Self {
        let mut entries = shared_entries();

        entries.insert(Action::QuickSearch, quick_search());
        let formatting = [
            (Action::Bold, "bold", "Bold", "b", Modifiers::meta()),
            (Action::Italic, "italic", "Italic", "i", Modifiers::meta()),
            (Action::Underline, "underline", "Underline", "u", Modifiers::meta()),
            (
                Action::Strikethrough,
                "strike",
                "Strikethrough",
                "s",
                Modifiers::meta_shift(),
            ),
            (Action::InlineCode, "code", "Code", "e", Modifiers::meta()),
            (Action::Heading1, "heading-1", "Heading 1", "1", Modifiers::meta_alt()),
            (Action::Heading2, "heading-2", "Heading 2", "2", Modifiers::meta_alt()),
            (Action::Heading3, "heading-3", "Heading 3", "3", Modifiers::meta_alt()),
            (
                Action::BulletList,
                "bullet-list",
                "Bullet list",
                "8",
                Modifiers::meta_shift(),
            ),
            (
                Action::NumberedList,
                "ordered-list",
                "Numbered list",
                "7",
                Modifiers::meta_shift(),
            ),
            (
                Action::TaskList,
                "task-list",
                "To-do list",
                "9",
                Modifiers::meta_shift(),
            ),
            (
                Action::Blockquote,
                "blockquote",
                "Quote",
                "b",
                Modifiers::meta_shift(),
            ),
        ];
        for (action, slug, label, key, modifiers) in formatting {
            entries.insert(
                action,
                CatalogEntry::new(vec![
                    tid(&format!("format-{slug}")),
                    aria(label),
                    title(label),
                    class(&format!("{slug}-button")),
                ])
                .with_fallback(key, modifiers),
            );
        }

        Self {
            profile: CatalogProfile::Editor,
            entries,
        }
    }
}

fn tid(value: &str) -> ElementLocator {
    ElementLocator::test_id(value)
}

fn aria(value: &str) -> ElementLocator {
    ElementLocator::aria_label(value)
}

fn title(value: &str) -> ElementLocator {
    ElementLocator::button_title(value)
}

fn class(fragment: &str) -> ElementLocator {
    ElementLocator::class_contains(fragment)
}

fn page_menu() -> Vec<ElementLocator> {
    vec![
        tid("page-menu"),
        aria("Page options"),
        aria("Page menu"),
        title("More options"),
        class("page-menu"),
    ]
}

fn quick_search() -> CatalogEntry {
    CatalogEntry::new(vec![
        tid("search-trigger"),
        aria("Search"),
        title("Search"),
        ElementLocator::new(".search-trigger"),
        ElementLocator::new("[class*=\"search\"] button"),
        ElementLocator::new("input[type=\"search\"]"),
    ])
    .with_fallback("k", Modifiers::meta())
}

/// Entries both generations carry.
fn shared_entries() -> BTreeMap<Action, CatalogEntry> {
    let mut entries = BTreeMap::new();

    entries.insert(
        Action::ToggleComments,
        CatalogEntry::new(vec![
            tid("comments-toggle"),
            aria("Comments"),
            aria("Toggle comments"),
            title("Comments"),
            class("comment-toggle"),
            class("comments-button"),
        ])
        .with_fallback("c", Modifiers::meta_shift()),
    );

    let inserts = [
        (
            Action::InsertMermaid,
            "insert-mermaid",
            "Insert Mermaid",
            "Mermaid diagram",
            "mermaid",
            "m",
            Modifiers::meta_shift(),
        ),
        (
            Action::InsertDrawio,
            "insert-drawio",
            "Insert Draw.io",
            "Draw.io diagram",
            "drawio",
            "d",
            Modifiers::meta_shift(),
        ),
        (
            Action::InsertExcalidraw,
            "insert-excalidraw",
            "Insert Excalidraw",
            "Excalidraw diagram",
            "excalidraw",
            "e",
            Modifiers::meta_shift(),
        ),
        (
            Action::InsertTable,
            "insert-table",
            "Insert table",
            "Insert table",
            "table-insert",
            "t",
            Modifiers::meta_shift(),
        ),
        (
            Action::InsertCodeBlock,
            "insert-code",
            "Insert code block",
            "Code block",
            "code-block",
            "c",
            Modifiers::meta_alt(),
        ),
        (
            Action::InsertCallout,
            "insert-callout",
            "Insert callout",
            "Callout",
            "callout",
            "a",
            Modifiers::meta_alt(),
        ),
    ];
    for (action, test_id, label, button, fragment, key, modifiers) in inserts {
        entries.insert(
            action,
            CatalogEntry::new(vec![tid(test_id), aria(label), title(button), class(fragment)])
                .with_fallback(key, modifiers),
        );
    }

    entries.insert(
        Action::SharePage,
        CatalogEntry::new(vec![
            tid("share-button"),
            aria("Share"),
            aria("Share page"),
            title("Share"),
            class("share-button"),
            class("share-trigger"),
        ]),
    );
    entries.insert(
        Action::CopyLink,
        CatalogEntry::builtin(PageBuiltin::CopyLocation),
    );
    entries.insert(
        Action::ExportMarkdown,
        CatalogEntry::new(vec![
            tid("export-markdown"),
            aria("Export as Markdown"),
            title("Export Markdown"),
            class("export-markdown"),
        ])
        .reveal_via(page_menu()),
    );
    entries.insert(
        Action::ExportHtml,
        CatalogEntry::new(vec![
            tid("export-html"),
            aria("Export as HTML"),
            title("Export HTML"),
            class("export-html"),
        ])
        .reveal_via(page_menu()),
    );
    entries.insert(
        Action::ShowShortcuts,
        CatalogEntry::new(vec![
            tid("keyboard-shortcuts"),
            aria("Keyboard shortcuts"),
            title("Shortcuts"),
            class("shortcuts"),
        ]),
    );

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both() -> [Catalog; 2] {
        [Catalog::classic(), Catalog::editor()]
    }

    #[test]
    fn builtin_catalogs_validate() {
        for catalog in both() {
            catalog.validate().unwrap();
            assert!(!catalog.is_empty());
        }
    }

    #[test]
    fn every_entry_is_actionable() {
        for catalog in both() {
            for action in catalog.actions() {
                let entry = catalog.entry_for(action).unwrap();
                assert!(entry.is_actionable(), "{action} has nothing to do");
            }
        }
    }

    #[test]
    fn surface_controls_never_have_entries() {
        for catalog in both() {
            for action in Action::ALL.iter().filter(|a| a.is_direct_control()) {
                assert!(catalog.entry_for(*action).is_none());
            }
        }
    }

    #[test]
    fn bold_falls_back_to_lowercase_b_with_meta() {
        let catalog = Catalog::editor();
        let fallback = catalog
            .entry_for(Action::Bold)
            .and_then(|e| e.fallback.clone())
            .unwrap();
        assert_eq!(fallback.key, "b");
        assert_eq!(fallback.modifiers, Modifiers::meta());
        assert!(!fallback.modifiers.shift);
    }

    #[test]
    fn heading1_falls_back_to_meta_alt_1() {
        let entry = Catalog::editor().entry_for(Action::Heading1).cloned().unwrap();
        assert_eq!(
            entry.fallback,
            Some(SyntheticInput::new("1", Modifiers::meta_alt()))
        );
    }

    #[test]
    fn classic_drops_formatting_and_editor_drops_page_actions() {
        let classic = Catalog::classic();
        let editor = Catalog::editor();
        assert!(classic.entry_for(Action::Bold).is_none());
        assert!(classic.entry_for(Action::NewPage).is_some());
        assert!(editor.entry_for(Action::NewPage).is_none());
        assert!(editor.entry_for(Action::ToggleSidebar).is_none());
        assert!(editor.entry_for(Action::FocusMode).is_none());
    }

    #[test]
    fn specificity_is_classified_from_the_selector() {
        assert_eq!(tid("x").specificity(), Specificity::TestId);
        assert_eq!(aria("x").specificity(), Specificity::AriaLabel);
        assert_eq!(title("x").specificity(), Specificity::Title);
        assert_eq!(class("x").specificity(), Specificity::ClassName);
        assert_eq!(
            ElementLocator::new(".sidebar-action-add").specificity(),
            Specificity::ClassName
        );
        assert_eq!(
            ElementLocator::new("input[type=\"search\"]").specificity(),
            Specificity::Structural
        );
    }

    #[test]
    fn out_of_order_candidates_are_rejected() {
        let mut entries = BTreeMap::new();
        entries.insert(
            Action::SharePage,
            CatalogEntry::new(vec![class("share"), tid("share-button")]),
        );
        let err = Catalog::from_entries(CatalogProfile::Classic, entries).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::SpecificityOrder { index: 1, .. }
        ));
    }

    #[test]
    fn empty_and_direct_entries_are_rejected() {
        let mut entries = BTreeMap::new();
        entries.insert(Action::SharePage, CatalogEntry::new(Vec::new()));
        assert!(matches!(
            Catalog::from_entries(CatalogProfile::Classic, entries),
            Err(CatalogError::EmptyEntry { .. })
        ));

        let mut entries = BTreeMap::new();
        entries.insert(Action::ZoomIn, CatalogEntry::new(vec![tid("zoom")]));
        assert!(matches!(
            Catalog::from_entries(CatalogProfile::Classic, entries),
            Err(CatalogError::DirectControlEntry { .. })
        ));
    }

    #[test]
    fn loads_a_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"{
                "profile": "editor",
                "entries": {
                    "bold": {
                        "candidates": ["[data-testid=\"bold\"]", "[aria-label=\"Bold\"]"],
                        "fallback": {"key": "b", "modifiers": {"meta": true}}
                    },
                    "exportHtml": {
                        "candidates": ["[aria-label=\"Export as HTML\"]"],
                        "reveal": {"opener": ["[aria-label=\"Page menu\"]"]}
                    }
                }
            }"#,
        )
        .unwrap();

        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.profile(), CatalogProfile::Editor);
        assert_eq!(catalog.len(), 2);
        let bold = catalog.entry_for(Action::Bold).unwrap();
        assert_eq!(bold.candidates.len(), 2);
        assert_eq!(bold.fallback.as_ref().unwrap().modifiers, Modifiers::meta());
        let export = catalog.entry_for(Action::ExportHtml).unwrap();
        assert_eq!(export.reveal.as_ref().unwrap().settle_ms, DEFAULT_SETTLE_MS);
    }

    #[test]
    fn catalog_file_with_unknown_action_fails_to_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r##"{"profile": "classic", "entries": {"brewCoffee": {"candidates": ["#x"]}}}"##,
        )
        .unwrap();
        assert!(matches!(
            Catalog::load(&path),
            Err(CatalogError::Parse { .. })
        ));
    }
}
