//! Highlight overlay derived from the prompt text and the accepted suggestions.
//!
//! The overlay is a second layer drawn over the input that repeats the prompt text and wraps each
//! matched word in a highlight unit. Matches are plain substring hits (not word-boundary aware),
//! so a suggestion for `cat` also highlights the `cat` inside `concatenate`.
//!
//! All match spans are computed once against the original text and placed left to right; a span
//! that overlaps an already placed one is rejected. Ties at the same start prefer the longer
//! span, then the suggestion that came first in the response.

use std::cmp::Reverse;
use std::ops::Range;

use better_prompt_protocol::WordSuggestion;
use serde::Serialize;

const HIGHLIGHT_CLASS: &str = "highlighted-word";

/// A highlighted occurrence carrying everything the tooltip needs, so hovering it requires no
/// further lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub word: String,
    pub alternatives: Vec<String>,
    /// Byte range of this occurrence in the rendered text.
    pub range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlaySegment {
    Text(String),
    Highlight(Highlight),
}

/// Rendered overlay content. Empty when nothing is highlighted, in which case the raw input is
/// shown on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayMarkup {
    segments: Vec<OverlaySegment>,
}

#[derive(Debug, Clone, Copy)]
struct MatchSpan {
    start: usize,
    end: usize,
    suggestion_idx: usize,
}

impl OverlayMarkup {
    pub fn render(text: &str, suggestions: &[WordSuggestion]) -> Self {
        let spans = place_spans(text, suggestions);
        if spans.is_empty() {
            return Self::default();
        }

        let mut segments = Vec::with_capacity(spans.len() * 2 + 1);
        let mut cursor = 0usize;
        for span in spans {
            if span.start > cursor {
                segments.push(OverlaySegment::Text(text[cursor..span.start].to_string()));
            }
            let suggestion = &suggestions[span.suggestion_idx];
            segments.push(OverlaySegment::Highlight(Highlight {
                word: suggestion.word.clone(),
                alternatives: suggestion.alternatives.clone(),
                range: span.start..span.end,
            }));
            cursor = span.end;
        }
        if cursor < text.len() {
            segments.push(OverlaySegment::Text(text[cursor..].to_string()));
        }

        Self { segments }
    }

    pub fn segments(&self) -> &[OverlaySegment] {
        &self.segments
    }

    pub fn has_highlights(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn highlights(&self) -> impl Iterator<Item = &Highlight> {
        self.segments.iter().filter_map(|segment| match segment {
            OverlaySegment::Highlight(highlight) => Some(highlight),
            OverlaySegment::Text(_) => None,
        })
    }

    /// First highlight unit for `word`, if the word is currently highlighted.
    pub fn highlight_for(&self, word: &str) -> Option<&Highlight> {
        self.highlights().find(|highlight| highlight.word == word)
    }

    /// HTML rendition of the overlay. Prompt text and attribute values are escaped so the raw
    /// prompt can never be interpreted as markup.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for segment in &self.segments {
            match segment {
                OverlaySegment::Text(text) => html.push_str(&escape_html(text)),
                OverlaySegment::Highlight(highlight) => {
                    let alternatives = serde_json::to_string(&highlight.alternatives)
                        .unwrap_or_else(|_| "[]".to_string());
                    html.push_str(&format!(
                        r#"<span class="{HIGHLIGHT_CLASS}" data-word="{}" data-suggestions="{}">{}</span>"#,
                        escape_html(&highlight.word),
                        escape_html(&alternatives),
                        escape_html(&highlight.word),
                    ));
                }
            }
        }
        html
    }
}

fn place_spans(text: &str, suggestions: &[WordSuggestion]) -> Vec<MatchSpan> {
    let mut candidates: Vec<MatchSpan> = suggestions
        .iter()
        .enumerate()
        .filter(|(_, suggestion)| !suggestion.word.is_empty())
        .flat_map(|(suggestion_idx, suggestion)| {
            text.match_indices(suggestion.word.as_str())
                .map(move |(start, matched)| MatchSpan {
                    start,
                    end: start + matched.len(),
                    suggestion_idx,
                })
        })
        .collect();
    candidates.sort_by_key(|span| (span.start, Reverse(span.end), span.suggestion_idx));

    let mut placed: Vec<MatchSpan> = Vec::with_capacity(candidates.len());
    let mut placed_end = 0usize;
    for span in candidates {
        if span.start < placed_end {
            continue;
        }
        placed_end = span.end;
        placed.push(span);
    }
    placed
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Scroll position of a text layer, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScrollOffset {
    pub top: f64,
    pub left: f64,
}

/// Overlay layer state: its markup plus the scroll offsets mirrored from the live input.
#[derive(Debug, Clone, Default)]
pub struct HighlightOverlay {
    markup: OverlayMarkup,
    scroll: ScrollOffset,
}

impl HighlightOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markup(&self) -> &OverlayMarkup {
        &self.markup
    }

    pub fn scroll(&self) -> ScrollOffset {
        self.scroll
    }

    pub fn update(&mut self, text: &str, suggestions: &[WordSuggestion]) {
        self.markup = OverlayMarkup::render(text, suggestions);
    }

    pub fn clear(&mut self) {
        self.markup = OverlayMarkup::default();
    }

    /// Copies the input's scroll offsets onto the overlay. Runs on every scroll event so both
    /// layers stay pixel-aligned.
    pub fn sync_scroll(&mut self, input: ScrollOffset) -> ScrollOffset {
        self.scroll = input;
        self.scroll
    }
}
