use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid or expired token: {0}")]
    InvalidToken(String),

    #[error("Missing required user information: {0}")]
    MissingClaim(&'static str),

    #[error("User is not permitted: {0}")]
    Forbidden(String),

    #[error("Failed to fetch signing keys: {0}")]
    Keys(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
