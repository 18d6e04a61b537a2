//! Upload models for the Brandlens report analyzer.
//!
//! An uploaded report is held in memory only for the duration of a single
//! analysis request. Brand names are free text supplied next to each report.

use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::{Validate, ValidationError};

/// Report formats the extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Xlsx,
    Xls,
    Csv,
}

/// MIME types accepted for upload. Browsers disagree on how to label CSV
/// files, hence the long tail.
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "text/csv",
    "application/csv",
    "text/x-csv",
    "application/x-csv",
    "text/comma-separated-values",
    "text/x-comma-separated-values",
];

/// File extensions accepted for upload (lowercase, with the leading dot).
pub const ACCEPTED_EXTENSIONS: &[&str] = &[".pdf", ".xlsx", ".xls", ".csv"];

impl FileKind {
    /// Detect kind from the filename extension (case-insensitive)
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename).extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// Detect kind from the declared content type
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => Some(Self::Xlsx),
            "application/vnd.ms-excel" => Some(Self::Xls),
            "text/csv"
            | "application/csv"
            | "text/x-csv"
            | "application/x-csv"
            | "text/comma-separated-values"
            | "text/x-comma-separated-values" => Some(Self::Csv),
            _ => None,
        }
    }

    /// Detect kind for an upload. The extension wins over the declared type
    /// because some platforms label `.csv` files as `application/vnd.ms-excel`.
    pub fn detect(filename: &str, content_type: &str) -> Option<Self> {
        Self::from_filename(filename).or_else(|| Self::from_content_type(content_type))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Csv => "csv",
        }
    }
}

/// A report file received from the user
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn kind(&self) -> Option<FileKind> {
        FileKind::detect(&self.filename, &self.content_type)
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// The user's own brand and the competitor being compared against.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, PartialEq)]
pub struct BrandPair {
    #[validate(
        length(max = 200, message = "Brand name must be at most 200 characters"),
        custom = "validate_not_blank"
    )]
    pub brand: String,
    #[validate(
        length(max = 200, message = "Competitor name must be at most 200 characters"),
        custom = "validate_not_blank"
    )]
    pub competitor: String,
}

impl BrandPair {
    pub fn new(brand: impl Into<String>, competitor: impl Into<String>) -> Self {
        Self {
            brand: brand.into().trim().to_string(),
            competitor: competitor.into().trim().to_string(),
        }
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}
