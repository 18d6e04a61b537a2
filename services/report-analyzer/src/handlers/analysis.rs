use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use brandlens_models::{ChartData, ChatMessage, ContentType};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::{field_errors_response, AnalysisForm, ApiError};
use crate::service::{AnalysisSession, AnalyzeError};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub id: Uuid,
    pub brand: String,
    pub competitor: String,
    pub summary: String,
    pub sections: Vec<SectionResponse>,
    pub transcript: Vec<ChatMessage>,
    pub chat_in_flight: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SectionResponse {
    pub index: usize,
    pub title: String,
    pub content: String,
    pub content_type: ContentType,
    pub full_width: bool,
    pub chartable: bool,
}

impl From<AnalysisSession> for AnalysisResponse {
    fn from(session: AnalysisSession) -> Self {
        let chat_in_flight = session.chat_in_flight();
        let sections = session
            .sections
            .into_iter()
            .enumerate()
            .map(|(index, display)| SectionResponse {
                index,
                chartable: brandlens_utils::extract_for_section(&display.section).is_some(),
                title: display.section.title,
                content: display.section.content,
                content_type: display.section.content_type,
                full_width: display.full_width,
            })
            .collect();

        Self {
            id: session.id,
            brand: session.brands.brand,
            competitor: session.brands.competitor,
            summary: session.result.summary,
            sections,
            transcript: session.transcript,
            chat_in_flight,
            created_at: session.created_at,
        }
    }
}

/// Multipart `file1`, `file2`, `brand`, `competitor`
pub async fn create_analysis(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match AnalysisForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return ApiError(e).into_response(),
    };

    match state.service.analyze(form.into_request()).await {
        Ok(session) => {
            info!(analysis_id = %session.id, "Analysis created via API");
            (StatusCode::CREATED, Json(AnalysisResponse::from(session))).into_response()
        }
        Err(AnalyzeError::Invalid(errors)) => field_errors_response(&errors),
        Err(AnalyzeError::Failed(e)) => ApiError(e).into_response(),
    }
}

pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let session = state.service.session(id).await?;
    Ok(Json(AnalysisResponse::from(session)))
}

pub async fn get_section_chart(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<ChartData>, ApiError> {
    Ok(Json(state.service.chart(id, index).await?))
}
