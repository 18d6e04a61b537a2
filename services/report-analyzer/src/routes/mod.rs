use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers::*, AppState};

/// Browser pages
pub fn create_page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(upload_page))
        .route("/analyses", post(submit_analysis))
        .route("/analyses/:id", get(results_page))
        .route("/analyses/:id/sections/:index/chart.svg", get(chart_svg))
        .route("/analyses/:id/sections/:index/print", get(print_section))
}

/// JSON API, nested under `/api/v1`
pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .route("/analyses", post(create_analysis))
        .route("/analyses/:id", get(get_analysis))
        .route("/analyses/:id/sections/:index/chart", get(get_section_chart))
        .route("/analyses/:id/chat", get(get_transcript).post(send_chat_message))
}
