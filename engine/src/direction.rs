use better_prompt_protocol::TextDirection;

/// Arabic-script blocks (Arabic, Arabic Supplement, Arabic Extended-A and the presentation forms)
/// that mark a prompt as right-to-left.
const RTL_RANGES: [(char, char); 5] = [
    ('\u{0600}', '\u{06FF}'),
    ('\u{0750}', '\u{077F}'),
    ('\u{08A0}', '\u{08FF}'),
    ('\u{FB50}', '\u{FDFF}'),
    ('\u{FE70}', '\u{FEFF}'),
];

/// Classifies `text` as RTL as soon as it contains a single Arabic-script character.
pub fn detect_direction(text: &str) -> TextDirection {
    let is_rtl = text
        .chars()
        .any(|ch| RTL_RANGES.iter().any(|(lo, hi)| (*lo..=*hi).contains(&ch)));
    if is_rtl {
        TextDirection::Rtl
    } else {
        TextDirection::Ltr
    }
}
