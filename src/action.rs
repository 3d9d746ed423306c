use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named user command, independent of how it is eventually carried out.
///
/// The wire name (camelCase) is what menus, the control bridge and catalog
/// files use to refer to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    // Surface controls
    Reload,
    ForceReload,
    ToggleDevTools,
    ZoomIn,
    ZoomOut,
    ZoomReset,
    GoBack,
    GoForward,
    GoHome,

    // Navigation and workspace
    QuickSearch,
    NewPage,
    ToggleSidebar,
    ToggleComments,
    FocusMode,

    // Formatting
    Bold,
    Italic,
    Underline,
    Strikethrough,
    InlineCode,
    Heading1,
    Heading2,
    Heading3,
    BulletList,
    NumberedList,
    TaskList,
    Blockquote,

    // Insertion
    InsertMermaid,
    InsertDrawio,
    InsertExcalidraw,
    InsertTable,
    InsertCodeBlock,
    InsertCallout,

    // Sharing and export
    SharePage,
    CopyLink,
    ExportMarkdown,
    ExportHtml,

    // Help
    ShowShortcuts,
    ShowAbout,
}

impl Action {
    pub const ALL: [Action; 38] = [
        Action::Reload,
        Action::ForceReload,
        Action::ToggleDevTools,
        Action::ZoomIn,
        Action::ZoomOut,
        Action::ZoomReset,
        Action::GoBack,
        Action::GoForward,
        Action::GoHome,
        Action::QuickSearch,
        Action::NewPage,
        Action::ToggleSidebar,
        Action::ToggleComments,
        Action::FocusMode,
        Action::Bold,
        Action::Italic,
        Action::Underline,
        Action::Strikethrough,
        Action::InlineCode,
        Action::Heading1,
        Action::Heading2,
        Action::Heading3,
        Action::BulletList,
        Action::NumberedList,
        Action::TaskList,
        Action::Blockquote,
        Action::InsertMermaid,
        Action::InsertDrawio,
        Action::InsertExcalidraw,
        Action::InsertTable,
        Action::InsertCodeBlock,
        Action::InsertCallout,
        Action::SharePage,
        Action::CopyLink,
        Action::ExportMarkdown,
        Action::ExportHtml,
        Action::ShowShortcuts,
        Action::ShowAbout,
    ];

    /// Wire name, e.g. `"insertTable"`.
    pub fn name(self) -> &'static str {
        match self {
            Action::Reload => "reload",
            Action::ForceReload => "forceReload",
            Action::ToggleDevTools => "toggleDevTools",
            Action::ZoomIn => "zoomIn",
            Action::ZoomOut => "zoomOut",
            Action::ZoomReset => "zoomReset",
            Action::GoBack => "goBack",
            Action::GoForward => "goForward",
            Action::GoHome => "goHome",
            Action::QuickSearch => "quickSearch",
            Action::NewPage => "newPage",
            Action::ToggleSidebar => "toggleSidebar",
            Action::ToggleComments => "toggleComments",
            Action::FocusMode => "focusMode",
            Action::Bold => "bold",
            Action::Italic => "italic",
            Action::Underline => "underline",
            Action::Strikethrough => "strikethrough",
            Action::InlineCode => "inlineCode",
            Action::Heading1 => "heading1",
            Action::Heading2 => "heading2",
            Action::Heading3 => "heading3",
            Action::BulletList => "bulletList",
            Action::NumberedList => "numberedList",
            Action::TaskList => "taskList",
            Action::Blockquote => "blockquote",
            Action::InsertMermaid => "insertMermaid",
            Action::InsertDrawio => "insertDrawio",
            Action::InsertExcalidraw => "insertExcalidraw",
            Action::InsertTable => "insertTable",
            Action::InsertCodeBlock => "insertCodeBlock",
            Action::InsertCallout => "insertCallout",
            Action::SharePage => "sharePage",
            Action::CopyLink => "copyLink",
            Action::ExportMarkdown => "exportMarkdown",
            Action::ExportHtml => "exportHtml",
            Action::ShowShortcuts => "showShortcuts",
            Action::ShowAbout => "showAbout",
        }
    }

    /// Actions served by the embedding surface itself rather than by probing
    /// the embedded page.
    pub fn is_direct_control(self) -> bool {
        matches!(
            self,
            Action::Reload
                | Action::ForceReload
                | Action::ToggleDevTools
                | Action::ZoomIn
                | Action::ZoomOut
                | Action::ZoomReset
                | Action::GoBack
                | Action::GoForward
                | Action::GoHome
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a name is not part of the closed action set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown action '{}'", self.0)
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .find(|a| a.name() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}
