use thiserror::Error;

/// Failure to deliver an outbound message.
///
/// Session bookkeeping commits before the send, so callers log these and move
/// on; there is nothing left to retry against.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("message rejected with status {status}: {body}")]
    Api { status: u16, body: String },
}
