pub mod config;
pub mod logging;
pub mod error;
pub mod validation;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::*;
pub use logging::*;
pub use error::*;
pub use validation::*;
pub use report::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.llm.temperature, 0.7);
        assert_eq!(config.llm.timeout_seconds, 60);
        assert_eq!(config.layout.split_strategy(), SplitStrategy::HeadingPattern);
        assert_eq!(config.server.session_ttl(), Some(std::time::Duration::from_secs(86_400)));
    }

    #[test]
    fn test_zero_session_ttl_disables_expiry() {
        let server = ServerConfig { session_ttl_seconds: 0, ..ServerConfig::default() };
        assert_eq!(server.session_ttl(), None);
    }

    #[test]
    fn test_layout_config_marker_count() {
        let layout = LayoutConfig {
            split_strategy: "marker_count".to_string(),
            heading_marker_count: 2,
            ..LayoutConfig::default()
        };
        assert_eq!(layout.split_strategy(), SplitStrategy::MarkerCount(2));
        assert_eq!(layout.layout_rules(), LayoutRules::default());
    }

    #[test]
    fn test_error_handling() {
        let error = BrandlensError::validation("brand", "test message");
        assert_eq!(error.error_code(), "VALIDATION_ERROR");
        assert_eq!(error.http_status_code(), 400);

        let response = ErrorResponse::from(BrandlensError::malformed_response("missing content"));
        assert_eq!(response.code, "MALFORMED_RESPONSE");
        assert!(BrandlensError::malformed_response("x").is_analysis_failure());
        assert!(!BrandlensError::extraction("x").is_analysis_failure());
    }
}
