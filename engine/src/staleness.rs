//! Generation counter used to discard responses of superseded requests.
//!
//! Cancelling a fetch is best-effort: the transport may still resolve after the user typed again.
//! Every request therefore captures the token that was current when it was issued, and its
//! response is applied only if that token is still current when it resolves.

/// Opaque, monotonically increasing request generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct StalenessGuard {
    current: u64,
}

impl StalenessGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The token a request issued right now would carry.
    pub fn current(&self) -> RequestToken {
        RequestToken(self.current)
    }

    /// Invalidates every token handed out so far and returns the new current token.
    pub fn bump(&mut self) -> RequestToken {
        self.current = self.current.wrapping_add(1);
        self.current()
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.current
    }
}
