//! Error types
//!
//! Every fallible stream operation returns [`Result`]. None of these are
//! retried internally.

/// Error type for stream operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The stream actor has exited; its intake no longer accepts intents
    StreamClosed,
    /// The publish intake is full (only returned by non-blocking publish)
    IntakeFull,
    /// A subscriber with this ID is already registered
    DuplicateSubscriber(String),
    /// Replay was requested on a stream with auto-replay disabled
    ReplayDisabled,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::StreamClosed => write!(f, "Stream is closed"),
            Error::IntakeFull => write!(f, "Stream intake is full"),
            Error::DuplicateSubscriber(id) => {
                write!(f, "Subscriber already registered: {}", id)
            }
            Error::ReplayDisabled => write!(f, "Replay is disabled for this stream"),
        }
    }
}

impl std::error::Error for Error {}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::StreamClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Error::StreamClosed
    }
}

/// Result alias for stream operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::StreamClosed.to_string(), "Stream is closed");
        assert_eq!(
            Error::DuplicateSubscriber("alice".into()).to_string(),
            "Subscriber already registered: alice"
        );
    }

    #[tokio::test]
    async fn test_closed_channel_maps_to_stream_closed() {
        let (tx, rx) = tokio::sync::mpsc::channel::<u8>(1);
        drop(rx);
        let err: Error = tx.send(1).await.unwrap_err().into();
        assert_eq!(err, Error::StreamClosed);

        let (tx, rx) = tokio::sync::oneshot::channel::<u8>();
        drop(tx);
        let err: Error = rx.await.unwrap_err().into();
        assert_eq!(err, Error::StreamClosed);
    }
}
