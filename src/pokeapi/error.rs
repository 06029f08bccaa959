use thiserror::Error;

/// Failure of a remote lookup, carrying a message fit to show the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  /// The request could not be completed, or the service answered with a non-success status
  #[error("{message}")]
  Transport {
    message: String,
    status: Option<u16>,
  },
  /// The service reports no matching entity
  #[error("{what} not found")]
  NotFound { what: String },
}

impl FetchError {
  pub fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
    Self::Transport {
      message: message.into(),
      status,
    }
  }

  pub fn not_found(what: impl Into<String>) -> Self {
    Self::NotFound { what: what.into() }
  }

  /// HTTP status code, where the failure carried one.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Transport { status, .. } => *status,
      Self::NotFound { .. } => Some(404),
    }
  }
}
