//! Headless UI state: side panels, tooltips and copy feedback
//!
//! These types hold the presentation state a client renders. Timed
//! transitions (delayed tooltips, the "copied" flash) run on tokio tasks, so
//! `Tooltip::show` and `CopyFeedback::copy` must be called inside a runtime.
//!
//! `tolk-web` serves panel views from `SidePanel`. Its browser page draws
//! tooltips and the copy flash itself, since the clipboard lives in the
//! browser. `Tooltip` and the hover methods are for embedders that render
//! their own UI. The `tolk --copy` CLI copies through `CopyFeedback`.

use crate::record::TranslationRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Delay before the tooltip of a collapsed panel header shows up
pub const PANEL_LABEL_TOOLTIP_DELAY: Duration = Duration::from_millis(400);

/// How long the copy button reports "copied"
pub const COPIED_FOR: Duration = Duration::from_secs(1);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ========== Tooltip ==========

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TooltipSize {
    Sm,
    #[default]
    Md,
    Lg,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TooltipState {
    pub visible: bool,
    pub size: TooltipSize,
    pub text: String,
}

/// A single shared tooltip
///
/// Clones share state. `show` makes the tooltip visible after a delay and
/// `hide` cancels a show that is still pending.
#[derive(Clone)]
pub struct Tooltip {
    inner: Arc<TooltipInner>,
}

struct TooltipInner {
    state: watch::Sender<TooltipState>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Tooltip {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Tooltip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Tooltip").field(&self.state()).finish()
    }
}

impl Tooltip {
    pub fn new() -> Self {
        let (state, _) = watch::channel(TooltipState::default());
        Self {
            inner: Arc::new(TooltipInner {
                state,
                pending: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> TooltipState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TooltipState> {
        self.inner.state.subscribe()
    }

    fn cancel_pending(&self) {
        if let Some(handle) = lock(&self.inner.pending).take() {
            handle.abort();
        }
    }

    pub fn show(&self, delay: Duration, size: TooltipSize, text: impl Into<String>) {
        self.cancel_pending();
        let text = text.into();
        let immediate = delay.is_zero();
        self.inner.state.send_modify(|s| {
            s.size = size;
            s.text = text;
            s.visible = immediate;
        });
        if immediate {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.state.send_modify(|s| s.visible = true);
        });
        *lock(&self.inner.pending) = Some(handle);
    }

    pub fn hide(&self) {
        self.cancel_pending();
        self.inner.state.send_if_modified(|s| {
            let was_visible = s.visible;
            s.visible = false;
            was_visible
        });
    }

    pub fn change_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.inner.state.send_modify(|s| s.text = text);
    }
}

// ========== Side Panel ==========

/// One row of a side panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelItem {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_text: Option<String>,
}

impl From<&TranslationRecord> for PanelItem {
    fn from(record: &TranslationRecord) -> Self {
        PanelItem {
            id: record.id.clone(),
            text: record.source_text.clone(),
            additional_text: Some(record.language_pair()),
        }
    }
}

/// What a side panel renders right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelView {
    pub label: String,
    pub collapsed: bool,
    pub items: Vec<PanelItem>,
    /// Shown instead of the items for a private panel while signed out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_access_text: Option<String>,
}

/// Collapsible list of translations (history or saved)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidePanel {
    label: String,
    private_access: bool,
    not_access_text: Option<String>,
    collapsed: bool,
}

impl SidePanel {
    /// A public panel, initially collapsed
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            private_access: false,
            not_access_text: None,
            collapsed: true,
        }
    }

    /// Only show items to signed-in users, `text` otherwise
    pub fn private(mut self, text: impl Into<String>) -> Self {
        self.private_access = true;
        self.not_access_text = Some(text.into());
        self
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn toggle(&mut self) {
        self.collapsed = !self.collapsed;
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
    }

    pub fn view(&self, records: &[TranslationRecord], signed_in: bool) -> PanelView {
        let accessible = !self.private_access || signed_in;
        PanelView {
            label: self.label.clone(),
            collapsed: self.collapsed,
            items: if accessible {
                records.iter().map(PanelItem::from).collect()
            } else {
                Vec::new()
            },
            not_access_text: if accessible || self.collapsed {
                None
            } else {
                self.not_access_text.clone()
            },
        }
    }

    /// Pointer entered the panel header
    ///
    /// A collapsed panel has no visible label, so it shows it as a tooltip.
    pub fn hover_label(&self, tooltip: &Tooltip) {
        if self.collapsed {
            tooltip.show(PANEL_LABEL_TOOLTIP_DELAY, TooltipSize::Md, &self.label);
        }
    }

    /// Pointer entered an item row
    pub fn hover_item(&self, tooltip: &Tooltip, item: &PanelItem) {
        if self.collapsed {
            tooltip.show(Duration::ZERO, TooltipSize::Md, &item.text);
        }
    }
}

// ========== Copy Feedback ==========

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("clipboard unavailable: {0}")]
pub struct ClipboardError(pub String);

/// Somewhere text can be copied to
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard that keeps the last copied text
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        lock(&self.contents).clone()
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        *lock(&self.contents) = Some(text.to_string());
        Ok(())
    }
}

/// State of a copy button
///
/// After a successful copy the button reports `copied` for `COPIED_FOR`, and
/// the tooltip text reads `copied_label` for that time.
#[derive(Clone)]
pub struct CopyFeedback {
    inner: Arc<CopyInner>,
}

struct CopyInner {
    clipboard: Arc<dyn Clipboard>,
    tooltip: Tooltip,
    copy_label: String,
    copied_label: String,
    copied: watch::Sender<bool>,
    reset: Mutex<Option<JoinHandle<()>>>,
}

impl CopyFeedback {
    pub fn new(
        clipboard: Arc<dyn Clipboard>,
        tooltip: Tooltip,
        copy_label: impl Into<String>,
        copied_label: impl Into<String>,
    ) -> Self {
        let (copied, _) = watch::channel(false);
        Self {
            inner: Arc::new(CopyInner {
                clipboard,
                tooltip,
                copy_label: copy_label.into(),
                copied_label: copied_label.into(),
                copied,
                reset: Mutex::new(None),
            }),
        }
    }

    pub fn is_copied(&self) -> bool {
        *self.inner.copied.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.copied.subscribe()
    }

    /// Label for the tooltip and accessibility text
    pub fn label(&self) -> &str {
        if self.is_copied() {
            &self.inner.copied_label
        } else {
            &self.inner.copy_label
        }
    }

    /// Copy `text` if there is any
    ///
    /// Returns whether the clipboard accepted it. A clipboard failure is
    /// logged and otherwise ignored.
    pub async fn copy(&self, text: Option<&str>) -> bool {
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return false;
        };
        if let Err(e) = self.inner.clipboard.write_text(text).await {
            warn!(error = %e, "copy failed");
            return false;
        }

        self.inner.copied.send_replace(true);
        self.inner.tooltip.change_text(&self.inner.copied_label);

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(COPIED_FOR).await;
            inner.copied.send_replace(false);
            inner.tooltip.hide();
            inner.tooltip.change_text(&inner.copy_label);
        });
        if let Some(previous) = lock(&self.inner.reset).replace(handle) {
            previous.abort();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(text: &str) -> TranslationRecord {
        TranslationRecord {
            id: format!("id-{text}"),
            source_text: text.to_string(),
            translated_text: format!("{text}!"),
            source_language: "Hebrew".to_string(),
            target_language: "English".to_string(),
            created_at: Utc::now(),
        }
    }

    struct BrokenClipboard;

    #[async_trait]
    impl Clipboard for BrokenClipboard {
        async fn write_text(&self, _: &str) -> Result<(), ClipboardError> {
            Err(ClipboardError("permission denied".to_string()))
        }
    }

    // ========== Side Panel Tests ==========

    #[test]
    fn test_panel_starts_collapsed_and_toggles() {
        let mut panel = SidePanel::new("History");
        assert!(panel.is_collapsed());
        panel.toggle();
        assert!(!panel.is_collapsed());
        panel.toggle();
        assert!(panel.is_collapsed());
    }

    #[test]
    fn test_panel_items_carry_language_pair() {
        let panel = SidePanel::new("History");
        let view = panel.view(&[record("שלום")], true);
        assert_eq!(
            view.items,
            vec![PanelItem {
                id: "id-שלום".to_string(),
                text: "שלום".to_string(),
                additional_text: Some("Hebrew → English".to_string()),
            }]
        );
        assert_eq!(view.not_access_text, None);
    }

    #[test]
    fn test_private_panel_signed_out() {
        let mut panel = SidePanel::new("Saved").private("Log in to see saved translations");
        let records = [record("שלום")];

        // Collapsed: neither items nor the explanation
        let view = panel.view(&records, false);
        assert!(view.items.is_empty());
        assert_eq!(view.not_access_text, None);

        panel.toggle();
        let view = panel.view(&records, false);
        assert!(view.items.is_empty());
        assert_eq!(
            view.not_access_text.as_deref(),
            Some("Log in to see saved translations")
        );

        let view = panel.view(&records, true);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.not_access_text, None);
    }

    // ========== Tooltip Tests ==========

    #[tokio::test(start_paused = true)]
    async fn test_tooltip_shows_after_delay() {
        let tooltip = Tooltip::new();
        tooltip.show(Duration::from_millis(400), TooltipSize::Sm, "Copy");
        assert!(!tooltip.state().visible);
        assert_eq!(tooltip.state().text, "Copy");

        tokio::time::sleep(Duration::from_millis(399)).await;
        assert!(!tooltip.state().visible);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(tooltip.state().visible);
        assert_eq!(tooltip.state().size, TooltipSize::Sm);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tooltip_hide_cancels_pending_show() {
        let tooltip = Tooltip::new();
        tooltip.show(Duration::from_millis(400), TooltipSize::Md, "History");
        tokio::time::sleep(Duration::from_millis(100)).await;
        tooltip.hide();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!tooltip.state().visible);
    }

    #[tokio::test]
    async fn test_panel_hover_only_when_collapsed() {
        let mut panel = SidePanel::new("History");
        let tooltip = Tooltip::new();
        let item = PanelItem::from(&record("שלום"));

        panel.hover_item(&tooltip, &item);
        assert!(tooltip.state().visible);
        assert_eq!(tooltip.state().text, "שלום");

        tooltip.hide();
        panel.toggle();
        panel.hover_item(&tooltip, &item);
        assert!(!tooltip.state().visible);
    }

    // ========== Copy Tests ==========

    #[tokio::test(start_paused = true)]
    async fn test_copy_flags_copied_for_a_second() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let tooltip = Tooltip::new();
        let feedback = CopyFeedback::new(clipboard.clone(), tooltip.clone(), "Copy", "Copied!");

        assert!(feedback.copy(Some("Hello")).await);
        assert_eq!(clipboard.contents().as_deref(), Some("Hello"));
        assert!(feedback.is_copied());
        assert_eq!(feedback.label(), "Copied!");
        assert_eq!(tooltip.state().text, "Copied!");

        tokio::time::sleep(COPIED_FOR + Duration::from_millis(10)).await;
        assert!(!feedback.is_copied());
        assert_eq!(feedback.label(), "Copy");
        assert_eq!(tooltip.state().text, "Copy");
    }

    #[tokio::test]
    async fn test_copy_nothing() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let feedback = CopyFeedback::new(clipboard.clone(), Tooltip::new(), "Copy", "Copied!");
        assert!(!feedback.copy(None).await);
        assert!(!feedback.copy(Some("")).await);
        assert_eq!(clipboard.contents(), None);
    }

    #[tokio::test]
    async fn test_copy_failure_is_not_surfaced() {
        let feedback = CopyFeedback::new(Arc::new(BrokenClipboard), Tooltip::new(), "Copy", "Copied!");
        assert!(!feedback.copy(Some("Hello")).await);
        assert!(!feedback.is_copied());
    }
}
