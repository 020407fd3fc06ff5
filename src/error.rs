use thiserror::Error;

/// Fallos del núcleo de colas.
///
/// The orchestration layer never lets these escape to its caller; every
/// variant is flattened into a `{ success: false, message }` response
/// (see [`crate::processor::QueueResponse`]). Persistence failures never
/// reach here at all; the store degrades to "absent" / no-op and logs.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("No music queue found for this server.")]
    QueueNotFound,

    /// Carries the user-facing message as-is ("Invalid queue action.",
    /// missing-volume, ...).
    #[error("{0}")]
    InvalidAction(String),

    #[error("Audio backend call failed: {0}")]
    Backend(#[source] anyhow::Error),
}
