//! Brandlens Report Analyzer
//!
//! Compares two audience reports with a chat-completion model and presents
//! the analysis as cards with charts and a follow-up chat.

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::get,
    serve, Router,
};
use brandlens_utils::{init_logging, AppConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

mod handlers;
mod llm_client;
mod metrics;
mod middleware;
mod presentation;
mod prompts;
mod routes;
mod service;

use handlers::{health_check, metrics_handler};
use llm_client::OpenAiClient;
use metrics::Metrics;
use middleware::request_id_middleware;
use presentation::Presenter;
use service::AnalysisService;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration ({}), using defaults", e);
        AppConfig::default()
    });

    init_logging(&config.logging)?;
    info!("Starting Brandlens Report Analyzer");

    let metrics = Metrics::new()?;
    let completion = Arc::new(OpenAiClient::new(&config.llm)?);
    info!(api_url = %config.llm.api_url, model = %config.llm.model, "Completion client ready");

    let state = AppState {
        service: AnalysisService::new(completion, &config, metrics.clone()),
        presenter: Arc::new(Presenter::new()?),
        metrics,
        config: config.clone(),
    };
    let app = create_app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Report Analyzer listening on {}", addr);

    serve(listener, app).await?;

    Ok(())
}

fn create_app(state: AppState) -> Router {
    let server = state.config.server.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .merge(routes::create_page_routes())
        .nest("/api/v1", routes::create_api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST])
                        .allow_headers([header::CONTENT_TYPE]),
                )
                .layer(TimeoutLayer::new(Duration::from_secs(server.timeout_seconds)))
                .layer(DefaultBodyLimit::max(server.max_request_size))
                .layer(axum::middleware::from_fn(request_id_middleware)),
        )
        .with_state(state)
}

#[derive(Clone)]
pub struct AppState {
    pub service: AnalysisService,
    pub presenter: Arc<Presenter>,
    pub metrics: Metrics,
    pub config: AppConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::{ScriptedCompletion, SAMPLE_ANALYSIS};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use brandlens_utils::testing::sample_pdf;
    use tower::ServiceExt;

    const BOUNDARY: &str = "brandlens-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a str, Vec<u8>),
    }

    fn multipart_body(parts: Vec<Part>) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n", name, value).as_bytes(),
                    );
                }
                Part::File(name, filename, content_type, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                            name, filename, content_type
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(&data);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn multipart_request(uri: &str, parts: Vec<Part>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn report_parts<'a>(brand: &'a str, competitor: &'a str) -> Vec<Part<'a>> {
        vec![
            Part::Text("brand", brand),
            Part::Text("competitor", competitor),
            Part::File("file1", "disney.pdf", "application/pdf", sample_pdf(&["Disney Audience Report"])),
            Part::File("file2", "netflix.pdf", "application/pdf", sample_pdf(&["Netflix Audience Report"])),
        ]
    }

    fn test_app(replies: Vec<brandlens_utils::BrandlensResult<String>>) -> Router {
        let config = AppConfig::default();
        let metrics = Metrics::new().unwrap();
        let state = AppState {
            service: AnalysisService::new(ScriptedCompletion::new(replies), &config, metrics.clone()),
            presenter: Arc::new(Presenter::new().unwrap()),
            metrics,
            config,
        };
        create_app(state)
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn get(app: &Router, uri: &str) -> axum::response::Response {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_api_analysis_then_cards_and_chart() {
        let app = test_app(vec![Ok(SAMPLE_ANALYSIS.to_string())]);

        let response = app
            .clone()
            .oneshot(multipart_request("/api/v1/analyses", report_parts("Disney+", "Netflix")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key("x-request-id"));

        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        let id = json["id"].as_str().unwrap().to_string();
        let sections = json["sections"].as_array().unwrap();
        assert_eq!(sections.len(), 3);
        let chartable: Vec<bool> = sections.iter().map(|s| s["chartable"].as_bool().unwrap()).collect();
        assert_eq!(chartable, vec![false, true, false]);
        assert_eq!(sections[2]["full_width"], true);

        let page = body_text(get(&app, &format!("/analyses/{}", id)).await).await;
        assert_eq!(page.matches("<article class=\"card").count(), 3);
        assert_eq!(page.matches("<details class=\"chart\"").count(), 1);
        assert!(page.contains(&format!("/analyses/{}/sections/1/chart.svg", id)));

        let response = get(&app, &format!("/analyses/{}/sections/1/chart.svg", id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");

        let response = get(&app, &format!("/api/v1/analyses/{}/sections/1/chart", id)).await;
        let chart: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(chart["headers"], serde_json::json!(["Size", "Share"]));

        let response = get(&app, &format!("/api/v1/analyses/{}/sections/0/chart", id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_form_rejection_keeps_brands() {
        let app = test_app(vec![]);

        let parts = vec![
            Part::Text("brand", "Disney+"),
            Part::Text("competitor", "Netflix"),
            Part::File("file1", "logo.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47]),
            Part::File("file2", "netflix.pdf", "application/pdf", sample_pdf(&["Netflix"])),
        ];
        let response = app.oneshot(multipart_request("/analyses", parts)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let page = body_text(response).await;
        assert!(page.contains("Please upload a valid PDF, Excel (.xlsx, .xls) or CSV file"));
        assert!(page.contains(r#"value="Netflix""#));
    }

    #[tokio::test]
    async fn test_form_analysis_failure_shows_notice() {
        let app = test_app(vec![Err(brandlens_utils::BrandlensError::external_service(
            "Completion API",
            "status 503: overloaded",
        ))]);

        let response = app
            .oneshot(multipart_request("/analyses", report_parts("Disney+", "Netflix")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_text(response).await.contains("Analysis unavailable"));
    }

    #[tokio::test]
    async fn test_form_success_redirects_to_results() {
        let app = test_app(vec![Ok(SAMPLE_ANALYSIS.to_string())]);

        let response = app
            .clone()
            .oneshot(multipart_request("/analyses", report_parts("Disney+", "Netflix")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
        assert!(location.starts_with("/analyses/"));

        let response = get(&app, &format!("{}/sections/2/print", location)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("<h1>Key Insights</h1>"));
    }

    #[tokio::test]
    async fn test_chat_round_trip_over_http() {
        let app = test_app(vec![Ok(SAMPLE_ANALYSIS.to_string()), Ok("**Gamers** lead".to_string())]);

        let response = app
            .clone()
            .oneshot(multipart_request("/api/v1/analyses", report_parts("Disney+", "Netflix")))
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        let id = json["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/analyses/{}/chat", id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"message":"Who leads?"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let chat: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(chat["reply"]["role"], "assistant");
        assert!(chat["reply"]["html"].as_str().unwrap().contains("<strong>Gamers</strong>"));
        assert_eq!(chat["transcript"].as_array().unwrap().len(), 2);

        let transcript = body_text(get(&app, &format!("/api/v1/analyses/{}/chat", id)).await).await;
        assert!(transcript.contains("Who leads?"));
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let app = test_app(vec![]);

        let health: serde_json::Value = serde_json::from_str(&body_text(get(&app, "/health").await).await).unwrap();
        assert_eq!(health["checks"]["completion_api"]["status"], "unconfigured");

        let response = get(&app, "/analyses/not-a-uuid").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = get(&app, &format!("/api/v1/analyses/{}", uuid::Uuid::new_v4())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(error["code"], "NOT_FOUND");

        let parts = vec![Part::Text("brand", "Disney+"), Part::Text("competitor", "Netflix")];
        let response = app.clone().oneshot(multipart_request("/api/v1/analyses", parts)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let metrics = body_text(get(&app, "/metrics").await).await;
        assert!(metrics.contains("brandlens_analyses_total{outcome=\"rejected\"} 1"));
    }
}
