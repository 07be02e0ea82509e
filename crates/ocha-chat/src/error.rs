use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    /// Covers both a genuinely absent thread and an ownership mismatch;
    /// callers cannot tell the two apart (existence-hiding).
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] ocha_persist::StoreError),

    #[error("Generation failed: {0}")]
    Generation(String),
}
