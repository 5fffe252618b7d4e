use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the billing core
#[derive(Debug, Error)]
pub enum BillingError {
    /// Catalog source could not be turned into a valid catalog
    #[error("Malformed catalog: {0}")]
    MalformedCatalog(String),

    /// A multiplier was zero, negative, non-finite or not a number at all
    #[error("Invalid multiplier: {0}")]
    InvalidMultiplier(String),

    /// Unknown model (or backup) requested by name
    #[error("Not found: {0}")]
    NotFound(String),

    /// A usage record was requested without all required fields
    #[error("Incomplete input: {0}")]
    IncompleteInput(String),

    /// Reading or writing the catalog file failed
    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serializing a catalog for write-back failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BillingError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Stable machine-readable name of the error variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedCatalog(_) => "malformed_catalog",
            Self::InvalidMultiplier(_) => "invalid_multiplier",
            Self::NotFound(_) => "not_found",
            Self::IncompleteInput(_) => "incomplete_input",
            Self::Storage { .. } => "storage_error",
            Self::Serialization(_) => "serialization_error",
        }
    }
}

pub type Result<T, E = BillingError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = BillingError::NotFound("gpt-5".to_string());
        assert_eq!(error.to_string(), "Not found: gpt-5");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            BillingError::InvalidMultiplier("0".to_string()).kind(),
            "invalid_multiplier"
        );
        assert_eq!(
            BillingError::MalformedCatalog("x".to_string()).kind(),
            "malformed_catalog"
        );
    }

    #[test]
    fn test_storage_error_keeps_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error = BillingError::storage("/tmp/model_pricing.json", io);
        assert!(error.to_string().contains("/tmp/model_pricing.json"));
        assert_eq!(error.kind(), "storage_error");
    }
}
