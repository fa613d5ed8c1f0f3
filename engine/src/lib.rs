//! Suggestion engine for the prompt editor.
//!
//! As the user types, the engine debounces input, asks the suggestion service for better words,
//! highlights the words it got suggestions for, and drives the hover panel that lets the user
//! swap a word for one of its alternatives.

// The library never writes to the terminal; the binary owns stdout.
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod client;
mod coordinator;
mod direction;
mod overlay;
mod session;
mod staleness;
mod status;
mod suggestion_model;
mod tooltip;

pub use client::ClientBuildError;
pub use client::DEFAULT_ENDPOINT;
pub use client::HttpSuggestionClient;
pub use client::SuggestionFetcher;
pub use coordinator::Completion;
pub use coordinator::CoordinatorConfig;
pub use coordinator::DEFAULT_DEBOUNCE;
pub use coordinator::DEFAULT_MIN_WORDS_FOR_REQUEST;
pub use coordinator::FetchTicket;
pub use coordinator::RequestCoordinator;
pub use coordinator::SettleOutcome;
pub use direction::detect_direction;
pub use overlay::Highlight;
pub use overlay::HighlightOverlay;
pub use overlay::OverlayMarkup;
pub use overlay::OverlaySegment;
pub use overlay::ScrollOffset;
pub use overlay::escape_html;
pub use session::EditSession;
pub use session::FetchCompletion;
pub use session::SessionEvent;
pub use session::SessionState;
pub use session::SessionUpdate;
pub use session::SuggestionSession;
pub use session::TooltipView;
pub use staleness::RequestToken;
pub use staleness::StalenessGuard;
pub use status::Status;
pub use suggestion_model::Replacement;
pub use suggestion_model::SuggestionModel;
pub use tooltip::AnchorRect;
pub use tooltip::HideCause;
pub use tooltip::PANEL_LEAVE_GRACE;
pub use tooltip::PANEL_OFFSET;
pub use tooltip::TooltipContent;
pub use tooltip::TooltipPlacement;
pub use tooltip::TooltipState;
pub use tooltip::TooltipStateMachine;
pub use tooltip::WORD_LEAVE_GRACE;

pub use better_prompt_protocol::FetchError;
pub use better_prompt_protocol::TextDirection;
pub use better_prompt_protocol::WordSuggestion;

#[cfg(test)]
mod test_fetcher;
