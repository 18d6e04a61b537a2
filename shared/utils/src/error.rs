use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum BrandlensError {
    #[error("Unsupported file type: {filename} ({content_type})")]
    UnsupportedFileType { filename: String, content_type: String },

    #[error("Extraction error: {message}")]
    Extraction { message: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl BrandlensError {
    pub fn unsupported_file_type(filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self::UnsupportedFileType {
            filename: filename.into(),
            content_type: content_type.into(),
        }
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFileType { .. } => "UNSUPPORTED_FILE_TYPE",
            Self::Extraction { .. } => "EXTRACTION_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::UnsupportedFileType { .. } => 415,
            Self::Extraction { .. } => 422,
            Self::Validation { .. } => 400,
            Self::ExternalService { .. } => 502,
            Self::MalformedResponse { .. } => 502,
            Self::Configuration { .. } => 500,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Internal { .. } => 500,
        }
    }

    /// Failures of the completion service, which all read as "analysis failed"
    pub fn is_analysis_failure(&self) -> bool {
        matches!(self, Self::ExternalService { .. } | Self::MalformedResponse { .. })
    }
}

pub type BrandlensResult<T> = Result<T, BrandlensError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl From<BrandlensError> for ErrorResponse {
    fn from(error: BrandlensError) -> Self {
        let details = match &error {
            BrandlensError::Validation { field, .. } => Some(serde_json::json!({ "field": field })),
            BrandlensError::UnsupportedFileType { filename, content_type } => Some(serde_json::json!({
                "filename": filename,
                "content_type": content_type,
            })),
            _ => None,
        };

        Self {
            error: error.error_code().to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
            details,
        }
    }
}

// Conversion from common error types
impl From<serde_json::Error> for BrandlensError {
    fn from(error: serde_json::Error) -> Self {
        Self::malformed_response(error.to_string())
    }
}

impl From<csv::Error> for BrandlensError {
    fn from(error: csv::Error) -> Self {
        Self::extraction(format!("Failed to parse CSV: {}", error))
    }
}
