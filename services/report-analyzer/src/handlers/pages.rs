use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::warn;
use uuid::Uuid;

use super::{AnalysisForm, PageError};
use crate::presentation::{render_chart_svg, UploadView};
use crate::service::AnalyzeError;
use crate::AppState;

const ANALYSIS_UNAVAILABLE: &str =
    "Analysis unavailable: the reports could not be analyzed right now. Please try again.";

pub async fn upload_page(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    Ok(Html(state.presenter.upload_page(&UploadView::default())?))
}

/// Form submission: redirect to the results on success, otherwise show the
/// form again with the brand names kept.
pub async fn submit_analysis(State(state): State<AppState>, multipart: Multipart) -> Result<Response, PageError> {
    let form = match AnalysisForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => {
            let view = UploadView::default().with_notice(e.to_string());
            return Ok((StatusCode::BAD_REQUEST, Html(state.presenter.upload_page(&view)?)).into_response());
        }
    };

    let view = UploadView::with_brands(form.brand.trim(), form.competitor.trim());
    match state.service.analyze(form.into_request()).await {
        Ok(session) => Ok(Redirect::to(&format!("/analyses/{}", session.id)).into_response()),
        Err(AnalyzeError::Invalid(errors)) => {
            let view = view.with_field_errors(&errors);
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(state.presenter.upload_page(&view)?)).into_response())
        }
        Err(AnalyzeError::Failed(e)) => {
            warn!(error = %e, "Showing analysis unavailable notice");
            let view = view.with_notice(ANALYSIS_UNAVAILABLE);
            Ok((StatusCode::BAD_GATEWAY, Html(state.presenter.upload_page(&view)?)).into_response())
        }
    }
}

pub async fn results_page(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Html<String>, PageError> {
    let session = state.service.session(id).await?;
    Ok(Html(state.presenter.results_page(&session)?))
}

/// Chart for one card, recomputed from the section on every request
pub async fn chart_svg(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Response, PageError> {
    let chart = state.service.chart(id, index).await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], render_chart_svg(&chart)).into_response())
}

pub async fn print_section(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Html<String>, PageError> {
    let section = state.service.section(id, index).await?;
    Ok(Html(state.presenter.print_page(&section.section)?))
}
