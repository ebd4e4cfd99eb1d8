//! Error Types for the checkout core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Order input rejected before pricing
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown package or add-on, or a price that disagrees with the catalog
    #[error("Catalog mismatch: {0}")]
    CatalogMismatch(String),

    /// Key-value store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Storage(_))
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            CoreError::InvalidInput(msg) => format!("Your order could not be processed: {msg}"),
            CoreError::CatalogMismatch(_) => {
                "The selected package or add-ons are no longer available. Please refresh and try again.".into()
            }
            CoreError::Storage(_) => "An error occurred processing your request.".into(),
        }
    }
}
