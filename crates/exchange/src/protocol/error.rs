use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("content error: {source}")]
    Content {
        #[from]
        source: ContentError,
    },

    #[error("lifecycle error: {source}")]
    Lifecycle {
        #[from]
        source: LifecycleError,
    },

    #[error("pool error: {source}")]
    Pool {
        #[from]
        source: PoolError,
    },

    #[error("invalid response head: {reason}")]
    InvalidHead { reason: String },
}

impl ExchangeError {
    pub fn invalid_head<S: ToString>(str: S) -> Self {
        Self::InvalidHead { reason: str.to_string() }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("unsupported content kind: {kind}")]
    UnsupportedContentKind { kind: &'static str },

    #[error("content type must be specified for {kind} content")]
    MissingContentType { kind: &'static str },
}

impl ContentError {
    pub fn unsupported_content_kind(kind: &'static str) -> Self {
        Self::UnsupportedContentKind { kind }
    }

    pub fn missing_content_type(kind: &'static str) -> Self {
        Self::MissingContentType { kind }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
}

impl LifecycleError {
    pub fn invalid_transition(from: &'static str, to: &'static str) -> Self {
        Self::InvalidTransition { from, to }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("pool misuse: {reason}")]
    Misuse { reason: String },

    #[error("pool exhausted, {outstanding} instances already checked out")]
    Exhausted { outstanding: usize },

    #[error("max outstanding must be within 1..={max}, got {max_outstanding}")]
    InvalidSize { max_outstanding: usize, max: usize },
}

impl PoolError {
    pub fn misuse<S: ToString>(str: S) -> Self {
        Self::Misuse { reason: str.to_string() }
    }

    pub fn exhausted(outstanding: usize) -> Self {
        Self::Exhausted { outstanding }
    }

    pub fn invalid_size(max_outstanding: usize, max: usize) -> Self {
        Self::InvalidSize { max_outstanding, max }
    }
}
