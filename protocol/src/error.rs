use thiserror::Error;

/// Failure modes of a suggestion fetch.
///
/// `Cancelled` is expected whenever a newer keystroke supersedes a request and is never shown to
/// the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: unable to reach the suggestion service ({0})")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("API error: malformed response ({0})")]
    Parse(String),

    #[error("request superseded")]
    Cancelled,
}
