use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistrarError>;

#[derive(Error, Debug)]
pub enum RegistrarError {
    #[error("Invalid adapter configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Backend {operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    #[error("Backend reported no leader")]
    NoLeader,
}

impl RegistrarError {
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }
}
