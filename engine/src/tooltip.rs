//! Hover lifecycle of the suggestion panel.
//!
//! The panel is shown when the pointer enters a highlighted word and sits right below it. Since
//! the word and the panel are adjacent but distinct, leaving either one only arms a grace timer;
//! entering the word or the panel again before it fires keeps the panel up without flicker.
//!
//! Timers are plain deadlines. The owner polls [`TooltipStateMachine::next_deadline`] and calls
//! [`TooltipStateMachine::on_tick`] once it has passed.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Grace period after the pointer leaves a highlighted word.
pub const WORD_LEAVE_GRACE: Duration = Duration::from_millis(1000);
/// Grace period after the pointer leaves the panel itself.
pub const PANEL_LEAVE_GRACE: Duration = Duration::from_millis(300);
/// Vertical gap between the bottom of the word and the top of the panel.
pub const PANEL_OFFSET: f64 = 10.0;

/// Bounding box of a highlighted word, relative to the input container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AnchorRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl AnchorRect {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TooltipPlacement {
    pub left: f64,
    pub top: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipContent {
    pub word: String,
    pub alternatives: Vec<String>,
    pub anchor: AnchorRect,
}

impl TooltipContent {
    pub fn placement(&self) -> TooltipPlacement {
        TooltipPlacement {
            left: self.anchor.left,
            top: self.anchor.bottom() + PANEL_OFFSET,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HideCause {
    LeftWord,
    LeftPanel,
}

impl HideCause {
    fn grace(self) -> Duration {
        match self {
            HideCause::LeftWord => WORD_LEAVE_GRACE,
            HideCause::LeftPanel => PANEL_LEAVE_GRACE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum TooltipState {
    #[default]
    Hidden,
    Showing(TooltipContent),
    /// Still visible, but hides at `hide_at` unless the pointer comes back.
    PendingHide {
        content: TooltipContent,
        hide_at: Instant,
        cause: HideCause,
    },
}

impl TooltipState {
    pub fn content(&self) -> Option<&TooltipContent> {
        match self {
            TooltipState::Hidden => None,
            TooltipState::Showing(content) | TooltipState::PendingHide { content, .. } => {
                Some(content)
            }
        }
    }
}

/// Show/hide state of the suggestion panel.
///
/// Every transition method returns `true` when the visible panel changed (shown, hidden, or
/// repopulated) and the renderer has work to do.
#[derive(Debug, Default)]
pub struct TooltipStateMachine {
    state: TooltipState,
    pointer_over_panel: bool,
}

impl TooltipStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TooltipState {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self.state, TooltipState::Hidden)
    }

    pub fn content(&self) -> Option<&TooltipContent> {
        self.state.content()
    }

    pub fn pointer_over_panel(&self) -> bool {
        self.pointer_over_panel
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.state {
            TooltipState::PendingHide { hide_at, .. } => Some(*hide_at),
            TooltipState::Hidden | TooltipState::Showing(_) => None,
        }
    }

    /// Pointer entered a highlighted word: cancel any pending hide and show its alternatives.
    pub fn word_enter(
        &mut self,
        word: impl Into<String>,
        alternatives: Vec<String>,
        anchor: AnchorRect,
    ) -> bool {
        let content = TooltipContent {
            word: word.into(),
            alternatives,
            anchor,
        };
        let unchanged = self.state.content() == Some(&content);
        tracing::trace!(word = %content.word, unchanged, "tooltip: word entered");
        self.state = TooltipState::Showing(content);
        !unchanged
    }

    pub fn word_leave(&mut self, now: Instant) {
        self.arm_hide(HideCause::LeftWord, now);
    }

    pub fn panel_enter(&mut self) {
        if !self.is_visible() {
            return;
        }
        self.pointer_over_panel = true;
        self.cancel_pending_hide();
    }

    pub fn panel_leave(&mut self, now: Instant) {
        self.pointer_over_panel = false;
        self.arm_hide(HideCause::LeftPanel, now);
    }

    /// Immediate hide: Escape, a click outside the panel, the close button, or a selection.
    pub fn hide(&mut self) -> bool {
        self.pointer_over_panel = false;
        let was_visible = self.is_visible();
        if was_visible {
            tracing::trace!("tooltip: hidden");
        }
        self.state = TooltipState::Hidden;
        was_visible
    }

    /// Fires the grace timer if it is due. The panel stays up if the pointer is over it.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        let TooltipState::PendingHide { hide_at, .. } = &self.state else {
            return false;
        };
        if now < *hide_at {
            return false;
        }
        if self.pointer_over_panel {
            self.cancel_pending_hide();
            return false;
        }
        self.hide()
    }

    fn arm_hide(&mut self, cause: HideCause, now: Instant) {
        let state = std::mem::take(&mut self.state);
        self.state = match state {
            TooltipState::Hidden => TooltipState::Hidden,
            TooltipState::Showing(content) | TooltipState::PendingHide { content, .. } => {
                tracing::trace!(?cause, "tooltip: hide pending");
                TooltipState::PendingHide {
                    content,
                    hide_at: now + cause.grace(),
                    cause,
                }
            }
        };
    }

    fn cancel_pending_hide(&mut self) {
        let state = std::mem::take(&mut self.state);
        self.state = match state {
            TooltipState::PendingHide { content, .. } => TooltipState::Showing(content),
            other => other,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn anchor() -> AnchorRect {
        AnchorRect {
            left: 12.0,
            top: 4.0,
            width: 30.0,
            height: 18.0,
        }
    }

    fn showing_cat() -> TooltipStateMachine {
        let mut tooltip = TooltipStateMachine::new();
        assert!(tooltip.word_enter(
            "cat",
            vec!["feline".to_string(), "kitten".to_string()],
            anchor()
        ));
        tooltip
    }

    #[test]
    fn word_enter_shows_panel_below_word() {
        let tooltip = showing_cat();
        let content = tooltip.content().expect("visible");
        assert_eq!(content.alternatives, vec!["feline", "kitten"]);
        assert_eq!(
            content.placement(),
            TooltipPlacement {
                left: 12.0,
                top: 32.0,
            }
        );
    }

    #[test]
    fn reentering_word_within_grace_keeps_panel() {
        let now = Instant::now();
        let mut tooltip = showing_cat();

        tooltip.word_leave(now);
        assert_eq!(tooltip.next_deadline(), Some(now + WORD_LEAVE_GRACE));

        assert!(!tooltip.on_tick(now + Duration::from_millis(500)));
        assert!(tooltip.is_visible());

        let changed = tooltip.word_enter(
            "cat",
            vec!["feline".to_string(), "kitten".to_string()],
            anchor(),
        );
        assert!(!changed);
        assert_eq!(tooltip.next_deadline(), None);
        assert!(!tooltip.on_tick(now + Duration::from_secs(5)));
        assert!(tooltip.is_visible());
    }

    #[test]
    fn leaving_word_beyond_grace_hides_panel() {
        let now = Instant::now();
        let mut tooltip = showing_cat();

        tooltip.word_leave(now);
        assert!(tooltip.on_tick(now + WORD_LEAVE_GRACE));
        assert_eq!(tooltip.state(), &TooltipState::Hidden);
    }

    #[test]
    fn entering_panel_cancels_word_timer() {
        let now = Instant::now();
        let mut tooltip = showing_cat();

        tooltip.word_leave(now);
        tooltip.panel_enter();
        assert!(tooltip.pointer_over_panel());
        assert_eq!(tooltip.next_deadline(), None);
        assert!(!tooltip.on_tick(now + WORD_LEAVE_GRACE));
        assert!(tooltip.is_visible());
    }

    #[test]
    fn late_word_leave_does_not_hide_while_over_panel() {
        let now = Instant::now();
        let mut tooltip = showing_cat();

        tooltip.panel_enter();
        tooltip.word_leave(now);
        assert!(!tooltip.on_tick(now + WORD_LEAVE_GRACE));
        assert!(tooltip.is_visible());
        assert_eq!(tooltip.next_deadline(), None);
    }

    #[test]
    fn leaving_panel_uses_short_grace() {
        let now = Instant::now();
        let mut tooltip = showing_cat();

        tooltip.panel_enter();
        tooltip.panel_leave(now);
        assert!(!tooltip.pointer_over_panel());
        assert_eq!(tooltip.next_deadline(), Some(now + PANEL_LEAVE_GRACE));
        assert!(!tooltip.on_tick(now + Duration::from_millis(299)));
        assert!(tooltip.on_tick(now + PANEL_LEAVE_GRACE));
        assert!(!tooltip.is_visible());
    }

    #[test]
    fn newer_leave_replaces_pending_timer() {
        let now = Instant::now();
        let mut tooltip = showing_cat();

        tooltip.word_leave(now);
        tooltip.panel_enter();
        tooltip.panel_leave(now + Duration::from_millis(100));
        assert_eq!(
            tooltip.next_deadline(),
            Some(now + Duration::from_millis(100) + PANEL_LEAVE_GRACE)
        );
    }

    #[test]
    fn hovering_another_word_repopulates() {
        let mut tooltip = showing_cat();
        assert!(tooltip.word_enter("playing", vec!["frolicking".to_string()], anchor()));
        assert_eq!(
            tooltip.content().map(|content| content.word.as_str()),
            Some("playing")
        );
    }

    #[test]
    fn hide_is_immediate_and_resets_panel_flag() {
        let mut tooltip = showing_cat();
        tooltip.panel_enter();

        assert!(tooltip.hide());
        assert!(!tooltip.pointer_over_panel());
        assert!(!tooltip.hide());
    }

    #[test]
    fn events_while_hidden_are_ignored() {
        let now = Instant::now();
        let mut tooltip = TooltipStateMachine::new();

        tooltip.word_leave(now);
        tooltip.panel_enter();
        tooltip.panel_leave(now);
        assert_eq!(tooltip.state(), &TooltipState::Hidden);
        assert!(!tooltip.pointer_over_panel());
        assert_eq!(tooltip.next_deadline(), None);
    }
}
