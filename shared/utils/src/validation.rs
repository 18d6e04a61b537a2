use crate::error::{BrandlensError, BrandlensResult};
use brandlens_models::{BrandPair, FileKind, UploadedFile, ACCEPTED_CONTENT_TYPES, ACCEPTED_EXTENSIONS};
use validator::{Validate, ValidationErrors};

/// Message shown next to an upload control when the file is rejected
pub const INVALID_UPLOAD_MESSAGE: &str = "Please upload a valid PDF, Excel (.xlsx, .xls) or CSV file";

/// One readable message per failed rule, ordered by field name.
fn field_messages(errors: &ValidationErrors) -> Vec<(String, String)> {
    let mut messages = Vec::new();

    let mut field_errors: Vec<_> = errors.field_errors().into_iter().collect();
    field_errors.sort_by_key(|(field, _)| *field);

    for (field, field_errors) in field_errors {
        for error in field_errors {
            let message = match &error.code {
                std::borrow::Cow::Borrowed("length") => error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Length validation failed for field '{}'", field)),
                std::borrow::Cow::Borrowed("required") => {
                    format!("Field '{}' is required", field)
                }
                _ => format!("Validation failed for field '{}': {}", field, error.code),
            };
            messages.push((field.to_string(), message));
        }
    }

    messages
}

/// Check an upload against the allow-list. A file passes when either its
/// declared content type or its extension is accepted.
pub fn validate_upload(file: &UploadedFile) -> BrandlensResult<FileKind> {
    let content_type = file
        .content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let extension = std::path::Path::new(&file.filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()));

    let type_accepted = ACCEPTED_CONTENT_TYPES.contains(&content_type.as_str());
    let extension_accepted = extension
        .as_deref()
        .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext))
        .unwrap_or(false);

    if !(type_accepted || extension_accepted) {
        return Err(BrandlensError::unsupported_file_type(&file.filename, &file.content_type));
    }

    file.kind()
        .ok_or_else(|| BrandlensError::unsupported_file_type(&file.filename, &file.content_type))
}

/// Brand validation split per input, so each message can sit next to its
/// own form control.
pub fn brand_field_errors(brands: &BrandPair) -> Vec<BrandlensError> {
    match brands.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => field_messages(&errors)
            .into_iter()
            .map(|(field, message)| BrandlensError::validation(field, message))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(filename: &str, content_type: &str) -> UploadedFile {
        UploadedFile::new(filename, content_type, b"data".to_vec())
    }

    #[test]
    fn test_validate_upload_by_content_type() {
        assert_eq!(validate_upload(&upload("report", "application/pdf")).unwrap(), FileKind::Pdf);
        assert_eq!(
            validate_upload(&upload("sheet", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")).unwrap(),
            FileKind::Xlsx
        );
        assert_eq!(validate_upload(&upload("export", "application/x-csv")).unwrap(), FileKind::Csv);
    }

    #[test]
    fn test_validate_upload_by_extension_fallback() {
        assert_eq!(
            validate_upload(&upload("audience.CSV", "application/octet-stream")).unwrap(),
            FileKind::Csv
        );
        assert_eq!(validate_upload(&upload("legacy.xls", "")).unwrap(), FileKind::Xls);
    }

    #[test]
    fn test_validate_upload_rejects_unknown_types() {
        let err = validate_upload(&upload("photo.png", "image/png")).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_FILE_TYPE");
        assert_eq!(err.http_status_code(), 415);

        assert!(validate_upload(&upload("notes.txt", "text/plain")).is_err());
    }

    #[test]
    fn test_brand_field_errors_per_input() {
        assert!(brand_field_errors(&BrandPair::new("Disney+", "Netflix")).is_empty());

        let errors = brand_field_errors(&BrandPair::new("  ", ""));
        assert_eq!(
            errors,
            vec![
                BrandlensError::validation("brand", "Field 'brand' is required"),
                BrandlensError::validation("competitor", "Field 'competitor' is required"),
            ]
        );
    }
}
