//! Tab/view state machine and pane rendering
//!
//! Two tabs. `Preview` is reachable only while something can be shown there:
//! a live artifact or a compile in flight. Leaving `Preview` is always
//! allowed. Selecting a tab never starts a compile.

use crate::error::TabError;
use lai_compile::ArtifactPreview;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shown while the first artifact is being built
pub const GENERATING_PREVIEW: &str = "Generating preview...";

/// Shown on the preview tab when there is nothing to display
pub const NO_PREVIEW: &str = "No PDF to preview. Compile your LaTeX code from the Editor tab.";

/// Compile button label at rest
pub const COMPILE_LABEL: &str = "Compile";

/// Compile button label while a request is in flight
pub const COMPILING_LABEL: &str = "Compiling...";

/// Visible tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewTab {
    /// Source editor
    #[default]
    Editing,
    /// Compiled document
    Preview,
}

impl fmt::Display for ViewTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Editing => write!(f, "editor"),
            Self::Preview => write!(f, "preview"),
        }
    }
}

/// Whether a control can be activated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Affordance {
    /// Drawn active
    Enabled,
    /// Drawn unavailable
    Disabled,
}

impl Affordance {
    #[inline]
    fn from_bool(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }

    /// Whether the control is active
    #[inline]
    #[must_use]
    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}

/// Compile-side facts the tab machine depends on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreviewAvailability {
    /// A live artifact exists
    pub has_artifact: bool,
    /// A compile request is in flight
    pub compiling: bool,
}

impl PreviewAvailability {
    /// Whether `Preview` may be entered
    #[inline]
    #[must_use]
    pub fn allows_preview(self) -> bool {
        self.has_artifact || self.compiling
    }
}

/// Current tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabState {
    current: ViewTab,
}

impl TabState {
    /// Start on the editor
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Visible tab
    #[inline]
    #[must_use]
    pub fn current(&self) -> ViewTab {
        self.current
    }

    /// Switch tabs on user request
    ///
    /// # Errors
    /// `TabError::PreviewUnavailable` when entering `Preview` is not
    /// permitted; the state is left untouched.
    pub fn select(
        &mut self,
        tab: ViewTab,
        availability: PreviewAvailability,
    ) -> Result<ViewTab, TabError> {
        if tab == ViewTab::Preview
            && self.current != ViewTab::Preview
            && !availability.allows_preview()
        {
            return Err(TabError::PreviewUnavailable);
        }
        if self.current != tab {
            tracing::debug!(from = %self.current, to = %tab, "tab changed");
            self.current = tab;
        }
        Ok(tab)
    }

    /// Switch to `Preview` after a successful compile
    pub fn force_preview(&mut self) {
        if self.current != ViewTab::Preview {
            tracing::debug!(from = %self.current, "compile succeeded, showing preview");
            self.current = ViewTab::Preview;
        }
    }

    /// Affordance of the preview tab control
    #[must_use]
    pub fn preview_affordance(&self, availability: PreviewAvailability) -> Affordance {
        Affordance::from_bool(self.current == ViewTab::Preview || availability.allows_preview())
    }
}

/// Preview tab content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewPane {
    /// First artifact is being built
    Loading,
    /// Live artifact to display
    Document(ArtifactPreview),
    /// Nothing to display, with the last error if any
    Empty {
        /// Last compile error
        error: Option<String>,
    },
}

impl PreviewPane {
    /// Pick the pane for the current compile state
    #[must_use]
    pub fn render(compiling: bool, artifact: Option<ArtifactPreview>, error: Option<String>) -> Self {
        match (artifact, compiling) {
            (Some(artifact), _) => Self::Document(artifact),
            (None, true) => Self::Loading,
            (None, false) => Self::Empty { error },
        }
    }

    /// Placeholder text, `None` when a document is shown
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Loading => Some(GENERATING_PREVIEW.to_string()),
            Self::Document(_) => None,
            Self::Empty { error: Some(err) } => Some(format!("Failed to generate preview: {err}")),
            Self::Empty { error: None } => Some(NO_PREVIEW.to_string()),
        }
    }
}

/// Editor tab content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorPane {
    /// Document text
    pub text: String,
    /// Inline compile error banner
    pub error: Option<String>,
}

impl EditorPane {
    /// Build the pane; the error banner only appears on the editor tab
    #[must_use]
    pub fn render(tab: ViewTab, text: String, error: Option<String>) -> Self {
        Self {
            text,
            error: error.filter(|_| tab == ViewTab::Editing),
        }
    }

    /// Banner text
    #[must_use]
    pub fn banner(&self) -> Option<String> {
        self.error
            .as_ref()
            .map(|err| format!("Compilation Error: {err}"))
    }
}

/// Compile button state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileButton {
    /// Label text
    pub label: &'static str,
    /// Whether a click would trigger
    pub enabled: bool,
    /// Document changed since the last compile
    pub highlighted: bool,
}

impl CompileButton {
    /// Button for the current compile state
    #[must_use]
    pub fn render(compiling: bool, stale: bool) -> Self {
        Self {
            label: if compiling { COMPILING_LABEL } else { COMPILE_LABEL },
            enabled: !compiling,
            highlighted: stale && !compiling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NOTHING: PreviewAvailability = PreviewAvailability {
        has_artifact: false,
        compiling: false,
    };

    #[test]
    fn starts_on_editor() {
        assert_eq!(TabState::new().current(), ViewTab::Editing);
    }

    #[test]
    fn preview_refused_without_artifact_or_compile() {
        let mut tabs = TabState::new();
        assert_eq!(
            tabs.select(ViewTab::Preview, NOTHING),
            Err(TabError::PreviewUnavailable)
        );
        assert_eq!(tabs.current(), ViewTab::Editing);
        assert_eq!(tabs.preview_affordance(NOTHING), Affordance::Disabled);
    }

    #[test]
    fn preview_allowed_while_compiling() {
        let mut tabs = TabState::new();
        let compiling = PreviewAvailability {
            has_artifact: false,
            compiling: true,
        };
        assert_eq!(tabs.preview_affordance(compiling), Affordance::Enabled);
        assert_eq!(tabs.select(ViewTab::Preview, compiling), Ok(ViewTab::Preview));
    }

    #[test]
    fn editing_always_reachable() {
        let mut tabs = TabState::new();
        tabs.force_preview();
        assert_eq!(tabs.select(ViewTab::Editing, NOTHING), Ok(ViewTab::Editing));
    }

    #[test]
    fn staying_on_preview_is_allowed() {
        let mut tabs = TabState::new();
        tabs.force_preview();
        assert_eq!(tabs.select(ViewTab::Preview, NOTHING), Ok(ViewTab::Preview));
        assert!(tabs.preview_affordance(NOTHING).is_enabled());
    }

    #[test]
    fn preview_pane_messages() {
        assert_eq!(
            PreviewPane::render(true, None, None).message().as_deref(),
            Some(GENERATING_PREVIEW)
        );
        assert_eq!(
            PreviewPane::render(false, None, Some("syntax error".to_string()))
                .message()
                .as_deref(),
            Some("Failed to generate preview: syntax error")
        );
        assert_eq!(
            PreviewPane::render(false, None, None).message().as_deref(),
            Some(NO_PREVIEW)
        );
    }

    #[test]
    fn editor_banner_only_on_editor_tab() {
        let err = Some("syntax error".to_string());
        let editing = EditorPane::render(ViewTab::Editing, "x".to_string(), err.clone());
        assert_eq!(editing.banner().as_deref(), Some("Compilation Error: syntax error"));

        let preview = EditorPane::render(ViewTab::Preview, "x".to_string(), err);
        assert_eq!(preview.banner(), None);
    }

    #[test]
    fn compile_button_states() {
        assert_eq!(
            CompileButton::render(true, true),
            CompileButton {
                label: COMPILING_LABEL,
                enabled: false,
                highlighted: false
            }
        );
        assert_eq!(
            CompileButton::render(false, true),
            CompileButton {
                label: COMPILE_LABEL,
                enabled: true,
                highlighted: true
            }
        );
    }
}
