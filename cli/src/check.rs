use std::fmt;

use better_prompt_engine::FetchError;
use better_prompt_engine::SuggestionFetcher;

/// Short Persian sentence ("a cat playing") that the service is known to have suggestions for.
pub const DEFAULT_CHECK_PROMPT: &str = "یک گربه در حال بازی کردن";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckReport {
    Connected { suggestions: usize },
    Failed(FetchError),
}

impl CheckReport {
    pub fn is_success(&self) -> bool {
        matches!(self, CheckReport::Connected { .. })
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckReport::Connected { suggestions: 0 } => {
                f.write_str("API responded but no suggestions found")
            }
            CheckReport::Connected { suggestions: 1 } => {
                f.write_str("API working! Found 1 suggestion")
            }
            CheckReport::Connected { suggestions } => {
                write!(f, "API working! Found {suggestions} suggestions")
            }
            CheckReport::Failed(err) => write!(f, "API test failed: {err}"),
        }
    }
}

/// Sends a single request for `prompt` and reports how it went.
pub async fn run_check<F: SuggestionFetcher>(fetcher: &F, prompt: &str) -> CheckReport {
    tracing::debug!(prompt, "checking suggestion service");
    match fetcher.fetch(prompt).await {
        Ok(suggestions) => CheckReport::Connected {
            suggestions: suggestions.len(),
        },
        Err(err) => CheckReport::Failed(err),
    }
}
