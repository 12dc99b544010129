/// Failure of a single telemetry fetch.
///
/// Every variant is recoverable: pollers store it as the view's last
/// error and keep polling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Connection, DNS or timeout failure before a response arrived.
    #[error("network failure: {0}")]
    Network(String),

    /// The server answered with a non-success status code.
    #[error("server responded with HTTP {status}")]
    Protocol { status: u16 },

    /// The body was not valid JSON.
    #[error("malformed payload: {0}")]
    Decode(String),
}

/// Coarse classification of a [`FetchError`], for display and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    Network,
    Protocol,
    Decode,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Network(_) => FetchErrorKind::Network,
            Self::Protocol { .. } => FetchErrorKind::Protocol,
            Self::Decode(_) => FetchErrorKind::Decode,
        }
    }
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::Protocol => "protocol",
            Self::Decode => "decode",
        };
        write!(f, "{s}")
    }
}
