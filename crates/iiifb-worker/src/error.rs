use thiserror::Error;

/// Fatal worker errors. Stage failures are persisted on the job row and do
/// not surface here; what does surface kills the process so a supervisor can
/// restart it.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("store error: {0}")]
    Store(#[from] iiifb_store::StoreError),

    #[error("internal worker error: {0}")]
    Internal(String),
}
