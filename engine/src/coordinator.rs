//! Decides when a suggestion request fires and whether its response may be applied.
//!
//! Every text change restarts the debounce timer, cancels the in-flight request, and bumps the
//! staleness token. Once the text has been quiet for the debounce delay the coordinator settles:
//! it either skips (too few words, or a request is somehow still in flight) or hands out a
//! [`FetchTicket`] for the caller to run. Completions are validated against the token that was
//! current when the ticket was issued; transport-level cancellation is best-effort only.
//!
//! The coordinator performs no I/O and owns no timers. Callers pass `now` in and sleep until
//! [`RequestCoordinator::next_deadline`].

use std::time::Duration;

use better_prompt_protocol::FetchError;
use better_prompt_protocol::WordSuggestion;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::staleness::RequestToken;
use crate::staleness::StalenessGuard;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);
pub const DEFAULT_MIN_WORDS_FOR_REQUEST: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub debounce: Duration,
    /// Prompts with fewer whitespace-delimited words never reach the service.
    pub min_words_for_request: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            min_words_for_request: DEFAULT_MIN_WORDS_FOR_REQUEST,
        }
    }
}

#[derive(Debug)]
struct PendingDebounce {
    text: String,
    fires_at: Instant,
}

#[derive(Debug)]
struct PendingRequest {
    token: RequestToken,
    cancel: CancellationToken,
}

/// Everything needed to run one fetch. The caller must race the fetch against `cancel` and report
/// the outcome back through [`RequestCoordinator::complete`] with `token`.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub token: RequestToken,
    pub prompt: String,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
pub enum SettleOutcome {
    /// Empty text or too few words; the previous suggestions must be cleared.
    TooShort,
    /// A request is still running; nothing new was started.
    AlreadyInFlight,
    Dispatch(FetchTicket),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Completion {
    /// The response belongs to the current text and may replace the suggestion set.
    Applied(Vec<WordSuggestion>),
    /// The response belongs to superseded text and must be dropped.
    Stale,
    /// The request was superseded and aborted; nothing to report.
    Cancelled,
    Failed(FetchError),
}

#[derive(Debug, Default)]
pub struct RequestCoordinator {
    config: CoordinatorConfig,
    tokens: StalenessGuard,
    debounce: Option<PendingDebounce>,
    in_flight: Option<PendingRequest>,
    requests_issued: u64,
}

impl RequestCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> CoordinatorConfig {
        self.config
    }

    pub fn current_token(&self) -> RequestToken {
        self.tokens.current()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_debouncing(&self) -> bool {
        self.debounce.is_some()
    }

    /// Number of requests dispatched so far.
    pub fn requests_issued(&self) -> u64 {
        self.requests_issued
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.as_ref().map(|pending| pending.fires_at)
    }

    /// Supersedes all earlier work and restarts the debounce timer for `text`.
    pub fn on_text_changed(&mut self, text: &str, now: Instant) {
        self.abort_in_flight();
        let token = self.tokens.bump();
        self.debounce = Some(PendingDebounce {
            text: text.to_string(),
            fires_at: now + self.config.debounce,
        });
        tracing::trace!(token = token.get(), "debounce restarted");
    }

    /// Settles the debounce timer if it is due.
    pub fn poll_debounce(&mut self, now: Instant) -> Option<SettleOutcome> {
        if self
            .debounce
            .as_ref()
            .is_none_or(|pending| now < pending.fires_at)
        {
            return None;
        }
        let pending = self.debounce.take()?;
        Some(self.settle(&pending.text))
    }

    pub fn settle(&mut self, text: &str) -> SettleOutcome {
        let word_count = text.split_whitespace().count();
        if word_count == 0 || word_count < self.config.min_words_for_request {
            tracing::debug!(
                word_count,
                min_words = self.config.min_words_for_request,
                "prompt too short, skipping request"
            );
            return SettleOutcome::TooShort;
        }

        if self.in_flight.is_some() {
            tracing::debug!("request already in flight, skipping");
            return SettleOutcome::AlreadyInFlight;
        }

        let token = self.tokens.current();
        let cancel = CancellationToken::new();
        self.in_flight = Some(PendingRequest {
            token,
            cancel: cancel.clone(),
        });
        self.requests_issued += 1;
        tracing::debug!(
            token = token.get(),
            request = self.requests_issued,
            word_count,
            "dispatching suggestion request"
        );
        SettleOutcome::Dispatch(FetchTicket {
            token,
            prompt: text.to_string(),
            cancel,
        })
    }

    /// Classifies the outcome of the fetch issued with `token`.
    pub fn complete(
        &mut self,
        token: RequestToken,
        result: Result<Vec<WordSuggestion>, FetchError>,
    ) -> Completion {
        if self
            .in_flight
            .as_ref()
            .is_some_and(|pending| pending.token == token)
        {
            self.in_flight = None;
        }

        if !self.tokens.is_current(token) {
            return match result {
                Err(FetchError::Cancelled) => Completion::Cancelled,
                _ => {
                    tracing::debug!(
                        token = token.get(),
                        current = self.tokens.current().get(),
                        "discarding stale response"
                    );
                    Completion::Stale
                }
            };
        }

        match result {
            Ok(suggestions) => Completion::Applied(suggestions),
            Err(FetchError::Cancelled) => Completion::Cancelled,
            Err(err) => Completion::Failed(err),
        }
    }

    /// Drops the debounce timer and aborts the in-flight request, e.g. on teardown.
    pub fn cancel_all(&mut self) {
        self.debounce = None;
        self.abort_in_flight();
        self.tokens.bump();
    }

    fn abort_in_flight(&mut self) {
        if let Some(pending) = self.in_flight.take() {
            tracing::debug!(token = pending.token.get(), "cancelling in-flight request");
            pending.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dispatched(outcome: Option<SettleOutcome>) -> FetchTicket {
        match outcome {
            Some(SettleOutcome::Dispatch(ticket)) => ticket,
            other => panic!("expected dispatch, got {other:?}"),
        }
    }

    #[test]
    fn debounce_fires_only_after_quiet_period() {
        let now = Instant::now();
        let mut coordinator = RequestCoordinator::default();

        coordinator.on_text_changed("a cat is playing", now);
        assert_eq!(coordinator.next_deadline(), Some(now + DEFAULT_DEBOUNCE));
        assert!(
            coordinator
                .poll_debounce(now + Duration::from_millis(999))
                .is_none()
        );

        let ticket = dispatched(coordinator.poll_debounce(now + DEFAULT_DEBOUNCE));
        assert_eq!(ticket.prompt, "a cat is playing");
        assert!(coordinator.is_in_flight());
        assert!(!coordinator.is_debouncing());
        assert_eq!(coordinator.requests_issued(), 1);
    }

    #[test]
    fn rapid_edits_coalesce_into_one_request_for_final_text() {
        let now = Instant::now();
        let mut coordinator = RequestCoordinator::default();

        coordinator.on_text_changed("a cat", now);
        coordinator.on_text_changed("a cat is", now + Duration::from_millis(400));
        coordinator.on_text_changed("a cat is playing", now + Duration::from_millis(800));

        assert!(
            coordinator
                .poll_debounce(now + Duration::from_millis(1000))
                .is_none()
        );
        let ticket = dispatched(coordinator.poll_debounce(now + Duration::from_millis(1800)));
        assert_eq!(ticket.prompt, "a cat is playing");
        assert!(
            coordinator
                .poll_debounce(now + Duration::from_secs(10))
                .is_none()
        );
        assert_eq!(coordinator.requests_issued(), 1);
    }

    #[test]
    fn short_prompts_never_dispatch() {
        let mut coordinator = RequestCoordinator::default();
        assert!(matches!(
            coordinator.settle("two words"),
            SettleOutcome::TooShort
        ));
        assert!(matches!(coordinator.settle("   \n\t "), SettleOutcome::TooShort));
        assert!(matches!(coordinator.settle(""), SettleOutcome::TooShort));
        assert_eq!(coordinator.requests_issued(), 0);
    }

    #[test]
    fn zero_minimum_still_skips_empty_text() {
        let mut coordinator = RequestCoordinator::new(CoordinatorConfig {
            debounce: DEFAULT_DEBOUNCE,
            min_words_for_request: 0,
        });
        assert!(matches!(coordinator.settle(" "), SettleOutcome::TooShort));
        assert!(matches!(
            coordinator.settle("hi"),
            SettleOutcome::Dispatch(_)
        ));
    }

    #[test]
    fn second_settle_while_in_flight_is_skipped() {
        let mut coordinator = RequestCoordinator::default();
        let _ticket = match coordinator.settle("a cat is playing") {
            SettleOutcome::Dispatch(ticket) => ticket,
            other => panic!("expected dispatch, got {other:?}"),
        };
        assert!(matches!(
            coordinator.settle("a cat is playing"),
            SettleOutcome::AlreadyInFlight
        ));
        assert_eq!(coordinator.requests_issued(), 1);
    }

    #[test]
    fn text_change_cancels_and_invalidates_in_flight_request() {
        let now = Instant::now();
        let mut coordinator = RequestCoordinator::default();

        coordinator.on_text_changed("a cat is playing", now);
        let first = dispatched(coordinator.poll_debounce(now + DEFAULT_DEBOUNCE));

        coordinator.on_text_changed("a dog is playing", now + Duration::from_millis(1100));
        assert!(first.cancel.is_cancelled());
        assert!(!coordinator.is_in_flight());

        // The transport resolved anyway; its result must not be applied.
        let completion =
            coordinator.complete(first.token, Ok(vec![WordSuggestion::new("cat", ["feline"])]));
        assert_eq!(completion, Completion::Stale);
    }

    #[test]
    fn late_response_of_older_request_never_applies() {
        let now = Instant::now();
        let mut coordinator = RequestCoordinator::default();

        coordinator.on_text_changed("a cat is playing", now);
        let a = dispatched(coordinator.poll_debounce(now + DEFAULT_DEBOUNCE));
        let later = now + Duration::from_millis(1500);
        coordinator.on_text_changed("a dog is playing", later);
        let b = dispatched(coordinator.poll_debounce(later + DEFAULT_DEBOUNCE));

        let b_result = vec![WordSuggestion::new("dog", ["hound"])];
        assert_eq!(
            coordinator.complete(b.token, Ok(b_result.clone())),
            Completion::Applied(b_result)
        );
        assert_eq!(
            coordinator.complete(a.token, Ok(vec![WordSuggestion::new("cat", ["feline"])])),
            Completion::Stale
        );
        assert_eq!(coordinator.requests_issued(), 2);
    }

    #[test]
    fn completion_errors_are_classified() {
        let mut coordinator = RequestCoordinator::default();

        let ticket = match coordinator.settle("a cat is playing") {
            SettleOutcome::Dispatch(ticket) => ticket,
            other => panic!("expected dispatch, got {other:?}"),
        };
        let err = FetchError::Http {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(
            coordinator.complete(ticket.token, Err(err.clone())),
            Completion::Failed(err)
        );
        assert!(!coordinator.is_in_flight());

        let ticket = match coordinator.settle("a cat is playing") {
            SettleOutcome::Dispatch(ticket) => ticket,
            other => panic!("expected dispatch, got {other:?}"),
        };
        assert_eq!(
            coordinator.complete(ticket.token, Err(FetchError::Cancelled)),
            Completion::Cancelled
        );
    }

    #[test]
    fn cancel_all_clears_timer_and_request() {
        let now = Instant::now();
        let mut coordinator = RequestCoordinator::default();

        coordinator.on_text_changed("a cat is playing", now);
        let ticket = dispatched(coordinator.poll_debounce(now + DEFAULT_DEBOUNCE));
        coordinator.on_text_changed("a cat is playing!", now + Duration::from_secs(2));

        coordinator.cancel_all();
        assert!(ticket.cancel.is_cancelled());
        assert_eq!(coordinator.next_deadline(), None);
        assert!(!coordinator.is_in_flight());
    }
}
