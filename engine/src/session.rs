//! Single editing session: owns the prompt text and drives every component from one event loop.
//!
//! All state lives in [`SessionState`] and is only touched from the loop turn handling an inbound
//! event, a timer deadline, or a fetch completion, so nothing needs locking. Fetches run as
//! spawned tasks that race the fetcher against their cancellation token and report back over a
//! channel; the loop re-validates the token before touching the suggestion set.

use std::future::pending;
use std::sync::Arc;

use better_prompt_protocol::FetchError;
use better_prompt_protocol::TextDirection;
use better_prompt_protocol::WordSuggestion;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio::time::sleep_until;

use crate::client::SuggestionFetcher;
use crate::coordinator::Completion;
use crate::coordinator::CoordinatorConfig;
use crate::coordinator::FetchTicket;
use crate::coordinator::RequestCoordinator;
use crate::coordinator::SettleOutcome;
use crate::direction::detect_direction;
use crate::overlay::Highlight;
use crate::overlay::HighlightOverlay;
use crate::overlay::ScrollOffset;
use crate::staleness::RequestToken;
use crate::status::Status;
use crate::suggestion_model::SuggestionModel;
use crate::tooltip::AnchorRect;
use crate::tooltip::TooltipPlacement;
use crate::tooltip::TooltipStateMachine;

/// Inbound events from the editing surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Raw input mutation; carries the full new text.
    TextChanged(String),
    /// The input scrolled to these offsets.
    Scroll(ScrollOffset),
    WordHover {
        word: String,
        anchor: AnchorRect,
    },
    WordUnhover {
        word: String,
    },
    PanelHover,
    PanelUnhover,
    AlternativeSelected {
        word: String,
        alternative: String,
    },
    Escape,
    ClickOutside,
    /// The panel's close button.
    CloseTooltip,
    Shutdown,
}

/// Visible suggestion panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipView {
    pub word: String,
    pub alternatives: Vec<String>,
    pub placement: TooltipPlacement,
    /// A grace timer is running and the panel will close unless the pointer comes back.
    pub hide_pending: bool,
}

/// Snapshot of everything the rendering side needs, emitted after each visible change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionUpdate {
    pub text: String,
    pub direction: TextDirection,
    pub status: Status,
    /// Escaped overlay HTML; empty when nothing is highlighted.
    pub overlay_html: String,
    pub highlights: Vec<Highlight>,
    pub scroll: ScrollOffset,
    pub tooltip: Option<TooltipView>,
    pub requests_issued: u64,
}

impl SessionUpdate {
    pub fn has_highlights(&self) -> bool {
        !self.highlights.is_empty()
    }
}

/// The prompt being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSession {
    pub text: String,
    pub direction: TextDirection,
    pub suggestions: SuggestionModel,
}

#[derive(Debug)]
pub struct FetchCompletion {
    pub token: RequestToken,
    pub result: Result<Vec<WordSuggestion>, FetchError>,
}

/// Session state plus the handles needed to start fetches.
pub struct SessionState<F> {
    fetcher: Arc<F>,
    completion_tx: UnboundedSender<FetchCompletion>,
    edit: EditSession,
    coordinator: RequestCoordinator,
    overlay: HighlightOverlay,
    tooltip: TooltipStateMachine,
    status: Status,
}

impl<F: SuggestionFetcher> SessionState<F> {
    pub fn new(
        fetcher: Arc<F>,
        config: CoordinatorConfig,
        completion_tx: UnboundedSender<FetchCompletion>,
    ) -> Self {
        Self {
            fetcher,
            completion_tx,
            edit: EditSession::default(),
            coordinator: RequestCoordinator::new(config),
            overlay: HighlightOverlay::new(),
            tooltip: TooltipStateMachine::new(),
            status: Status::Ready,
        }
    }

    pub fn edit(&self) -> &EditSession {
        &self.edit
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn coordinator(&self) -> &RequestCoordinator {
        &self.coordinator
    }

    pub fn tooltip(&self) -> &TooltipStateMachine {
        &self.tooltip
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.coordinator.next_deadline(), self.tooltip.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Applies one inbound event. Returns `true` when observable state changed.
    pub fn handle_event(&mut self, event: SessionEvent, now: Instant) -> bool {
        match event {
            SessionEvent::TextChanged(text) => {
                self.on_text_changed(text, now);
                true
            }
            SessionEvent::Scroll(offset) => {
                self.overlay.sync_scroll(offset);
                true
            }
            SessionEvent::WordHover { word, anchor } => {
                // Highlights may have been re-rendered since the pointer event was produced.
                let Some(highlight) = self.overlay.markup().highlight_for(&word) else {
                    return false;
                };
                let alternatives = highlight.alternatives.clone();
                let mut repopulated = false;
                let timer_changed = self.update_tooltip(|tooltip| {
                    repopulated = tooltip.word_enter(word, alternatives, anchor);
                });
                repopulated || timer_changed
            }
            SessionEvent::WordUnhover { .. } => {
                self.update_tooltip(|tooltip| tooltip.word_leave(now))
            }
            SessionEvent::PanelHover => self.update_tooltip(TooltipStateMachine::panel_enter),
            SessionEvent::PanelUnhover => {
                self.update_tooltip(|tooltip| tooltip.panel_leave(now))
            }
            SessionEvent::AlternativeSelected { word, alternative } => {
                self.replace_word(&word, &alternative)
            }
            SessionEvent::Escape | SessionEvent::ClickOutside | SessionEvent::CloseTooltip => {
                self.tooltip.hide()
            }
            SessionEvent::Shutdown => {
                self.shutdown();
                false
            }
        }
    }

    /// Fires whichever timers are due at `now`.
    pub fn on_deadline(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if let Some(outcome) = self.coordinator.poll_debounce(now) {
            changed |= self.on_settled(outcome);
        }
        changed |= self.tooltip.on_tick(now);
        changed
    }

    pub fn on_completion(&mut self, completion: FetchCompletion) -> bool {
        let FetchCompletion { token, result } = completion;
        match self.coordinator.complete(token, result) {
            Completion::Applied(suggestions) => {
                self.edit.suggestions.set(&self.edit.text, suggestions);
                self.overlay
                    .update(&self.edit.text, self.edit.suggestions.entries());
                self.status = if self.edit.suggestions.is_empty() {
                    Status::NoSuggestions
                } else {
                    Status::Found(self.edit.suggestions.len())
                };
                true
            }
            Completion::Stale | Completion::Cancelled => false,
            Completion::Failed(err) => {
                tracing::warn!("suggestion request failed: {err}");
                self.status = Status::Error(err.to_string());
                self.clear_suggestions();
                self.tooltip.hide();
                true
            }
        }
    }

    /// Abandons pending work; used when the session is torn down.
    pub fn shutdown(&mut self) {
        self.coordinator.cancel_all();
        self.tooltip.hide();
    }

    pub fn snapshot(&self) -> SessionUpdate {
        let markup = self.overlay.markup();
        SessionUpdate {
            text: self.edit.text.clone(),
            direction: self.edit.direction,
            status: self.status.clone(),
            overlay_html: markup.to_html(),
            highlights: markup.highlights().cloned().collect(),
            scroll: self.overlay.scroll(),
            tooltip: self.tooltip.content().map(|content| TooltipView {
                word: content.word.clone(),
                alternatives: content.alternatives.clone(),
                placement: content.placement(),
                hide_pending: self.tooltip.next_deadline().is_some(),
            }),
            requests_issued: self.coordinator.requests_issued(),
        }
    }

    fn on_text_changed(&mut self, text: String, now: Instant) {
        self.edit.direction = detect_direction(&text);
        self.coordinator.on_text_changed(&text, now);
        self.edit.text = text;
        self.clear_suggestions();
        self.tooltip.hide();
        if self.status == Status::Processing {
            self.status = Status::Ready;
        }
    }

    fn on_settled(&mut self, outcome: SettleOutcome) -> bool {
        match outcome {
            SettleOutcome::TooShort => {
                let had_suggestions = !self.edit.suggestions.is_empty();
                self.clear_suggestions();
                had_suggestions
            }
            SettleOutcome::AlreadyInFlight => false,
            SettleOutcome::Dispatch(ticket) => {
                self.status = Status::Processing;
                self.spawn_fetch(ticket);
                true
            }
        }
    }

    fn replace_word(&mut self, word: &str, alternative: &str) -> bool {
        if self.edit.suggestions.get(word).is_none() {
            tracing::debug!(word, "ignoring selection for a word without suggestions");
            return false;
        }

        let replacement = self
            .edit
            .suggestions
            .replace(&self.edit.text, word, alternative);
        tracing::debug!(
            word,
            alternative,
            occurrences = replacement.occurrences,
            "replaced word"
        );
        self.edit.text = replacement.text;
        self.edit.direction = detect_direction(&self.edit.text);
        self.overlay
            .update(&self.edit.text, self.edit.suggestions.entries());
        self.tooltip.hide();
        true
    }

    /// Runs a pointer transition. Arming, moving or cancelling a grace timer is a visible change
    /// ([`TooltipView::hide_pending`]).
    fn update_tooltip(&mut self, transition: impl FnOnce(&mut TooltipStateMachine)) -> bool {
        let before = self.tooltip.next_deadline();
        transition(&mut self.tooltip);
        self.tooltip.next_deadline() != before
    }

    fn clear_suggestions(&mut self) {
        self.edit.suggestions.clear();
        self.overlay.clear();
    }

    fn spawn_fetch(&self, ticket: FetchTicket) {
        let FetchTicket {
            token,
            prompt,
            cancel,
        } = ticket;
        let fetcher = Arc::clone(&self.fetcher);
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(FetchError::Cancelled),
                result = fetcher.fetch(&prompt) => result,
            };
            // The session may already be gone; nobody is left to care about the result.
            let _ = completion_tx.send(FetchCompletion { token, result });
        });
    }
}

/// A session together with the receiving end of its fetch completions.
pub struct SuggestionSession<F> {
    state: SessionState<F>,
    completions: UnboundedReceiver<FetchCompletion>,
}

impl<F: SuggestionFetcher> SuggestionSession<F> {
    pub fn new(fetcher: F, config: CoordinatorConfig) -> Self {
        let (completion_tx, completions) = unbounded_channel();
        Self {
            state: SessionState::new(Arc::new(fetcher), config, completion_tx),
            completions,
        }
    }

    /// Runs the session on its own task.
    pub fn spawn(
        self,
    ) -> (
        UnboundedSender<SessionEvent>,
        UnboundedReceiver<SessionUpdate>,
        JoinHandle<()>,
    ) {
        let (event_tx, event_rx) = unbounded_channel();
        let (update_tx, update_rx) = unbounded_channel();
        let handle = tokio::spawn(self.run(event_rx, update_tx));
        (event_tx, update_rx, handle)
    }

    /// Event loop. Emits an initial snapshot and then one snapshot per visible change, until
    /// [`SessionEvent::Shutdown`] arrives or either channel closes.
    pub async fn run(
        self,
        mut events: UnboundedReceiver<SessionEvent>,
        updates: UnboundedSender<SessionUpdate>,
    ) {
        let Self {
            mut state,
            mut completions,
        } = self;

        if updates.send(state.snapshot()).is_err() {
            return;
        }

        loop {
            let deadline = state.next_deadline();
            let changed = tokio::select! {
                maybe_event = events.recv() => {
                    let Some(event) = maybe_event else {
                        break;
                    };
                    if event == SessionEvent::Shutdown {
                        break;
                    }
                    state.handle_event(event, Instant::now())
                }
                Some(completion) = completions.recv() => state.on_completion(completion),
                () = wait_until(deadline) => state.on_deadline(Instant::now()),
            };

            if changed && updates.send(state.snapshot()).is_err() {
                break;
            }
        }

        state.shutdown();
        tracing::debug!("suggestion session closed");
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
