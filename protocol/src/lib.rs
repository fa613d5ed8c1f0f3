//! Wire types shared between the suggestion engine and the remote suggestion service.

mod direction;
mod error;
mod suggestions;

pub use direction::TextDirection;
pub use error::FetchError;
pub use suggestions::SuggestRequest;
pub use suggestions::SuggestResponse;
pub use suggestions::WordSuggestion;
