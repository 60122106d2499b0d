use registrar_core::RegistrarError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsulError {
    #[error("Invalid Consul address: {0}")]
    InvalidAddress(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Consul returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl ConsulError {
    /// Convert into a backend error for the named operation
    pub fn during(self, operation: &'static str) -> RegistrarError {
        RegistrarError::backend(operation, self.to_string())
    }
}
