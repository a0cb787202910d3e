/// Crate-wide Result type
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Failure taxonomy shared by every gateway adapter.
///
/// Adapters catch transport and parser failures at their boundary and re-wrap
/// them into one of these kinds; callers never observe raw reqwest or serde
/// errors.
#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    /// Malformed caller input or malformed webhook payload shape
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport failure, provider-reported rejection, or response shape
    /// mismatch. Carries the provider's own code where one exists.
    #[error("Provider error [{code}]: {message}")]
    Provider { code: String, message: String },

    /// Credential rejected by the provider
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Inbound authenticity check failed or required verification material
    /// is missing
    #[error("Signature verification error: {0}")]
    SignatureVerification(String),

    /// Encryption/decryption failure (DBS)
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Registry lookup misses
    #[error("Not found: {0}")]
    NotFound(String),
}

// Helper functions for common error scenarios
impl GatewayError {
    pub fn validation(msg: impl Into<String>) -> Self {
        GatewayError::Validation(msg.into())
    }

    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::Provider {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        GatewayError::Authentication(msg.into())
    }

    pub fn signature(msg: impl Into<String>) -> Self {
        GatewayError::SignatureVerification(msg.into())
    }

    pub fn crypto(msg: impl Into<String>) -> Self {
        GatewayError::Crypto(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        GatewayError::Configuration(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        GatewayError::NotFound(msg.into())
    }

    /// Provider code carried by this error, if any
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            GatewayError::Provider { code, .. } => Some(code),
            _ => None,
        }
    }
}
