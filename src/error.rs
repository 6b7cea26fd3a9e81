// Error types for RIB parsing, topology building and path queries

use thiserror::Error;

use crate::vendor::VendorTag;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input {input:?}: {reason}")]
    Validation { input: String, reason: String },

    #[error("Failed to parse {vendor} output for router {router}: {reason}")]
    Parse {
        vendor: VendorTag,
        router: String,
        reason: String,
    },

    #[error("Unknown router: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(input: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Validation {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(vendor: VendorTag, router: impl ToString, reason: impl Into<String>) -> Self {
        AppError::Parse {
            vendor,
            router: router.to_string(),
            reason: reason.into(),
        }
    }

    /// Convert error to an operator-facing message
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation { input, .. } => {
                format!("'{}' is not a valid IPv4 address or prefix.", input)
            }
            AppError::Parse { vendor, router, .. } => {
                format!(
                    "Output collected from {} does not look like {} output. Check the detected vendor.",
                    router, vendor
                )
            }
            AppError::NotFound(router) => {
                format!("Router {} is not part of the topology.", router)
            }
            AppError::Config(_) | AppError::Toml(_) => {
                "Configuration error. Check your inventory file or command-line arguments.".to_string()
            }
            AppError::Io(_) => "File system error. Check paths and permissions.".to_string(),
            AppError::Serialization(_) => {
                "Stored data could not be read or written. The store file may be corrupt.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_carries_context() {
        let err = AppError::parse(VendorTag::Juniper, "10.255.0.1", "no routes recognized");
        let text = err.to_string();
        assert!(text.contains("juniper"));
        assert!(text.contains("10.255.0.1"));
        assert!(err.user_message().contains("10.255.0.1"));
    }

    #[test]
    fn test_validation_message() {
        let err = AppError::validation("300.1.1.1", "octet 300 out of range");
        assert!(err.to_string().contains("octet 300"));
        assert!(err.user_message().contains("300.1.1.1"));
    }
}
