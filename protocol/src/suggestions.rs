use serde::Deserialize;
use serde::Serialize;

/// Improvement suggestions for a single word of the prompt.
///
/// `word` is matched literally against the prompt text; the service calls the alternatives
/// `suggestions` on the wire.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct WordSuggestion {
    pub word: String,
    #[serde(rename = "suggestions", default)]
    pub alternatives: Vec<String>,
}

impl WordSuggestion {
    pub fn new(
        word: impl Into<String>,
        alternatives: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            word: word.into(),
            alternatives: alternatives.into_iter().map(Into::into).collect(),
        }
    }
}

/// Body of `POST {endpoint}`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SuggestRequest {
    pub prompt: String,
}

/// Body returned by the suggestion service.
///
/// `total_suggestions` is informational; callers count `suggestions` themselves.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SuggestResponse {
    #[serde(default)]
    pub suggestions: Vec<WordSuggestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_suggestions: Option<usize>,
}
