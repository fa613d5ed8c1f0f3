use std::fmt;

use serde::Serialize;
use serde::Serializer;

/// User-facing status line of the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ready,
    Processing,
    Found(usize),
    NoSuggestions,
    Error(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ready => f.write_str("Ready"),
            Status::Processing => f.write_str("Processing..."),
            Status::Found(1) => f.write_str("Found 1 suggestion"),
            Status::Found(count) => write!(f, "Found {count} suggestions"),
            Status::NoSuggestions => f.write_str("No suggestions found"),
            Status::Error(message) => f.write_str(message),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
