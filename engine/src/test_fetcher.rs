//! Scripted [`SuggestionFetcher`] for driving sessions in tests.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use better_prompt_protocol::FetchError;
use better_prompt_protocol::WordSuggestion;

use crate::client::SuggestionFetcher;

struct Step {
    delay: Duration,
    result: Result<Vec<WordSuggestion>, FetchError>,
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    prompts: Vec<String>,
}

/// Replays queued responses in order, each after its delay, and records every prompt it saw.
/// Requests beyond the script resolve immediately with no suggestions.
#[derive(Clone, Default)]
pub(crate) struct ScriptedFetcher {
    script: Arc<Mutex<Script>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_ok(&self, delay: Duration, suggestions: Vec<WordSuggestion>) {
        self.push(delay, Ok(suggestions));
    }

    pub(crate) fn push_err(&self, delay: Duration, err: FetchError) {
        self.push(delay, Err(err));
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    fn push(&self, delay: Duration, result: Result<Vec<WordSuggestion>, FetchError>) {
        self.lock().steps.push_back(Step { delay, result });
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        match self.script.lock() {
            Ok(guard) => guard,
            Err(err) => err.into_inner(),
        }
    }
}

impl SuggestionFetcher for ScriptedFetcher {
    fn fetch(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Vec<WordSuggestion>, FetchError>> + Send {
        let step = {
            let mut script = self.lock();
            script.prompts.push(prompt.to_string());
            script.steps.pop_front()
        };
        async move {
            let Some(step) = step else {
                return Ok(Vec::new());
            };
            tokio::time::sleep(step.delay).await;
            step.result
        }
    }
}
