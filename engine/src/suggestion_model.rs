//! Accepted word suggestions for the current prompt text.

use better_prompt_protocol::WordSuggestion;

/// Ordered set of suggestions that are known to match the current text.
///
/// Every entry's `word` is non-empty and occurs literally in the text the model was last
/// synchronized with. Mutations that could break this prune the offending entries instead of
/// keeping them around for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionModel {
    entries: Vec<WordSuggestion>,
}

/// Result of replacing a word in the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub text: String,
    /// Number of occurrences of the old word that were substituted.
    pub occurrences: usize,
}

impl SuggestionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[WordSuggestion] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, word: &str) -> Option<&WordSuggestion> {
        self.entries.iter().find(|entry| entry.word == word)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replaces the whole set with a fresh service response for `text`.
    ///
    /// Empty words, words missing from `text`, and repeated words (first one wins) are dropped.
    pub fn set(&mut self, text: &str, suggestions: Vec<WordSuggestion>) {
        self.entries.clear();
        for suggestion in suggestions {
            if suggestion.word.is_empty() || !text.contains(&suggestion.word) {
                tracing::debug!(word = %suggestion.word, "dropping suggestion not found in text");
                continue;
            }
            if self.get(&suggestion.word).is_some() {
                continue;
            }
            self.entries.push(suggestion);
        }
    }

    /// Substitutes every literal occurrence of `old_word` in `text` with `new_word`.
    ///
    /// The entry for `old_word` is removed since its alternatives no longer apply; other entries
    /// are kept unless the substitution removed their word from the text.
    pub fn replace(&mut self, text: &str, old_word: &str, new_word: &str) -> Replacement {
        if old_word.is_empty() {
            return Replacement {
                text: text.to_string(),
                occurrences: 0,
            };
        }

        let occurrences = text.matches(old_word).count();
        let text = text.replace(old_word, new_word);
        self.entries.retain(|entry| entry.word != old_word);
        self.prune(&text);
        Replacement { text, occurrences }
    }

    /// Drops entries whose word no longer occurs in `text`.
    pub fn prune(&mut self, text: &str) {
        self.entries.retain(|entry| {
            let keep = text.contains(&entry.word);
            if !keep {
                tracing::debug!(word = %entry.word, "pruning suggestion no longer in text");
            }
            keep
        });
    }
}
