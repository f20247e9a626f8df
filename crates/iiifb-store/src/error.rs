use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    JobNotFound(i32),

    #[error("internal store error: {0}")]
    Internal(String),
}
