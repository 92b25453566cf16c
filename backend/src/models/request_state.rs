//! Lifecycle of an asynchronous request.
//!
//! ```text
//!  Idle ──request──▶ Pending ──receive──▶ Ready
//!   ▲                   │
//!   │                   └────fail─────▶ Error
//!   └────────────── invalidate (from any state)
//! ```
//!
//! `request` is accepted from any state. Transitions not shown leave the state unchanged.

/// State of one request, carrying its data once ready.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestState<T> {
    #[default]
    Idle,
    Pending,
    Ready(T),
    Error(String),
}

impl<T> RequestState<T> {
    pub fn request(self) -> Self {
        RequestState::Pending
    }

    pub fn receive(self, data: T) -> Self {
        match self {
            RequestState::Pending => RequestState::Ready(data),
            other => other,
        }
    }

    pub fn fail(self, error: impl Into<String>) -> Self {
        match self {
            RequestState::Pending => RequestState::Error(error.into()),
            other => other,
        }
    }

    pub fn invalidate(self) -> Self {
        RequestState::Idle
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, RequestState::Ready(_))
    }

    /// Settled means ready or failed.
    pub fn is_settled(&self) -> bool {
        matches!(self, RequestState::Ready(_) | RequestState::Error(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            RequestState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RequestState::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestState::Idle => "idle",
            RequestState::Pending => "pending",
            RequestState::Ready(_) => "ready",
            RequestState::Error(_) => "error",
        }
    }
}
