//! Unified Error Model
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IsdError {
    #[error("INPUT/{0}")]
    InputValidation(String),

    #[error("OUTPUT/{0}")]
    OutputValidation(String),

    #[error("PROVIDER/{0}")]
    Provider(String),

    #[error("TIMEOUT/{0}")]
    Timeout(String),

    #[error("SCHEMA/{0}")]
    SchemaValidation(String),

    #[error("INTERNAL/{0}")]
    Internal(String),
}

impl IsdError {
    /// Stable non-zero exit code per error category, for programmatic callers.
    pub fn exit_code(&self) -> i32 {
        match self {
            IsdError::InputValidation(_) => 10,
            IsdError::OutputValidation(_) => 11,
            IsdError::Provider(_) => 12,
            IsdError::Timeout(_) => 13,
            IsdError::SchemaValidation(_) => 14,
            IsdError::Internal(_) => 15,
        }
    }

    /// Machine-readable category label, mirrors the exit code mapping.
    pub fn category(&self) -> &'static str {
        match self {
            IsdError::InputValidation(_) => "input_validation_error",
            IsdError::OutputValidation(_) => "output_validation_error",
            IsdError::Provider(_) => "provider_error",
            IsdError::Timeout(_) => "timeout",
            IsdError::SchemaValidation(_) => "schema_validation_error",
            IsdError::Internal(_) => "internal_error",
        }
    }
}
