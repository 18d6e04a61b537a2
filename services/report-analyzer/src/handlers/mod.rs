pub mod analysis;
pub mod chat;
pub mod health;
pub mod pages;

pub use analysis::*;
pub use chat::*;
pub use health::*;
pub use pages::*;

use axum::{
    extract::Multipart,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use brandlens_models::{BrandPair, UploadedFile};
use brandlens_utils::{BrandlensError, ErrorResponse};

use crate::service::{AnalysisRequest, FieldError, BRAND_REPORT_FIELD, COMPETITOR_REPORT_FIELD};

/// JSON error body for API routes
#[derive(Debug)]
pub struct ApiError(pub BrandlensError);

impl From<BrandlensError> for ApiError {
    fn from(error: BrandlensError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_of(&self.0);
        (status, Json(ErrorResponse::from(self.0))).into_response()
    }
}

/// Field problems as one JSON error, status taken from the first of them
pub fn field_errors_response(errors: &[FieldError]) -> Response {
    let Some(first) = errors.first() else {
        return ApiError(BrandlensError::validation("form", "Invalid analysis request")).into_response();
    };

    let mut body = ErrorResponse::from(first.error.clone());
    body.details = Some(serde_json::json!({
        "fields": errors
            .iter()
            .map(|e| serde_json::json!({
                "field": e.field,
                "code": e.error.error_code(),
                "message": e.message(),
            }))
            .collect::<Vec<_>>(),
    }));

    (status_of(&first.error), Json(body)).into_response()
}

/// Minimal HTML error page for browser routes
#[derive(Debug)]
pub struct PageError(pub BrandlensError);

impl From<BrandlensError> for PageError {
    fn from(error: BrandlensError) -> Self {
        Self(error)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = status_of(&self.0);
        let body = format!(
            "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>{code}</title></head>\
<body><h1>{code}</h1><p>{message}</p><p><a href=\"/\">Start a new analysis</a></p></body></html>",
            code = status,
            message = handlebars::html_escape(&self.0.to_string()),
        );
        (status, Html(body)).into_response()
    }
}

fn status_of(error: &BrandlensError) -> StatusCode {
    StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// The upload form as submitted by the page or an API client
#[derive(Debug, Default)]
pub struct AnalysisForm {
    pub brand_report: Option<UploadedFile>,
    pub competitor_report: Option<UploadedFile>,
    pub brand: String,
    pub competitor: String,
}

impl AnalysisForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, BrandlensError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                BRAND_REPORT_FIELD | COMPETITOR_REPORT_FIELD => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().unwrap_or_default().to_string();
                    let data = field.bytes().await.map_err(multipart_error)?;

                    // an empty file input still sends a part
                    if filename.is_empty() && data.is_empty() {
                        continue;
                    }

                    let file = UploadedFile::new(filename, content_type, data.to_vec());
                    if name == BRAND_REPORT_FIELD {
                        form.brand_report = Some(file);
                    } else {
                        form.competitor_report = Some(file);
                    }
                }
                "brand" => form.brand = field.text().await.map_err(multipart_error)?,
                "competitor" => form.competitor = field.text().await.map_err(multipart_error)?,
                _ => {}
            }
        }

        Ok(form)
    }

    pub fn into_request(self) -> AnalysisRequest {
        AnalysisRequest {
            brand_report: self.brand_report,
            competitor_report: self.competitor_report,
            brands: BrandPair::new(self.brand, self.competitor),
        }
    }
}

fn multipart_error(error: axum::extract::multipart::MultipartError) -> BrandlensError {
    BrandlensError::validation("form", format!("Upload error: {}", error))
}
