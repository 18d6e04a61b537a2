//! Report Analysis Service
//!
//! Runs an analysis end to end (validate, extract, prompt, segment) and keeps
//! each result in an in-memory session together with its follow-up chat.

use brandlens_models::{
    AnalysisResult, BrandPair, ChartData, ChatMessage, DisplaySection, UploadedFile,
};
use brandlens_utils::{
    arrange, brand_field_errors, log_error, extract, extract_for_section, segment, validate_upload, AppConfig,
    BrandlensError, BrandlensResult, LayoutRules, SegmentOptions, INVALID_UPLOAD_MESSAGE,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::llm_client::CompletionService;
use crate::metrics::Metrics;
use crate::prompts::PromptBuilder;

/// Assistant reply recorded when a chat turn fails
pub const CHAT_FAILURE_MESSAGE: &str = "Sorry, there was an error processing your request.";

/// Form field names, shared with the upload page and the JSON API
pub const BRAND_REPORT_FIELD: &str = "file1";
pub const COMPETITOR_REPORT_FIELD: &str = "file2";

/// One analysis run and everything derived from it.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    pub id: Uuid,
    pub brands: BrandPair,
    pub result: AnalysisResult,
    pub sections: Vec<DisplaySection>,
    pub transcript: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    chat_in_flight: Arc<AtomicBool>,
}

impl AnalysisSession {
    pub fn section(&self, index: usize) -> BrandlensResult<&DisplaySection> {
        self.sections
            .get(index)
            .ok_or_else(|| BrandlensError::not_found(format!("section {} of analysis {}", index, self.id)))
    }

    pub fn chat_in_flight(&self) -> bool {
        self.chat_in_flight.load(Ordering::Acquire)
    }
}

/// Inputs of one analysis. Files are optional here so that a missing upload
/// is reported like any other field problem.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub brand_report: Option<UploadedFile>,
    pub competitor_report: Option<UploadedFile>,
    pub brands: BrandPair,
}

/// A problem tied to one form input
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub error: BrandlensError,
}

impl FieldError {
    pub fn new(field: impl Into<String>, error: BrandlensError) -> Self {
        Self { field: field.into(), error }
    }

    /// Message shown next to the input
    pub fn message(&self) -> String {
        match &self.error {
            BrandlensError::UnsupportedFileType { .. } => INVALID_UPLOAD_MESSAGE.to_string(),
            BrandlensError::Validation { message, .. } => message.clone(),
            BrandlensError::Extraction { message } => format!("Could not read this file: {}", message),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// Inputs were rejected before the completion service was called
    #[error("{} invalid field(s)", .0.len())]
    Invalid(Vec<FieldError>),

    /// The completion call failed; no result is available
    #[error("Analysis unavailable: {0}")]
    Failed(BrandlensError),
}

/// Outcome of one chat turn
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub reply: ChatMessage,
    pub transcript: Vec<ChatMessage>,
    pub failed: bool,
}

/// Clears the session's in-flight flag however the chat turn ends,
/// including when the request future is dropped.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct AnalysisService {
    sessions: Arc<RwLock<HashMap<Uuid, AnalysisSession>>>,
    completion: Arc<dyn CompletionService>,
    prompts: Arc<PromptBuilder>,
    segment_options: SegmentOptions,
    layout_rules: LayoutRules,
    session_ttl: Option<Duration>,
    max_sessions: usize,
    metrics: Metrics,
}

impl AnalysisService {
    pub fn new(completion: Arc<dyn CompletionService>, config: &AppConfig, metrics: Metrics) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            completion,
            prompts: Arc::new(PromptBuilder::new()),
            segment_options: config.layout.segment_options(),
            layout_rules: config.layout.layout_rules(),
            session_ttl: config.server.session_ttl(),
            max_sessions: config.server.max_sessions.max(1),
            metrics,
        }
    }

    fn is_expired(&self, session: &AnalysisSession, now: DateTime<Utc>) -> bool {
        match self.session_ttl {
            Some(ttl) => now
                .signed_duration_since(session.created_at)
                .to_std()
                .map(|age| age >= ttl)
                .unwrap_or(false),
            None => false,
        }
    }

    /// Drop expired sessions, then the oldest ones until there is room for
    /// one more.
    fn prune(&self, sessions: &mut HashMap<Uuid, AnalysisSession>, now: DateTime<Utc>) {
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_expired(session, now));

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .values()
                .min_by_key(|session| session.created_at)
                .map(|session| session.id);
            match oldest {
                Some(id) => sessions.remove(&id),
                None => break,
            };
        }

        if sessions.len() < before {
            debug!(removed = before - sessions.len(), remaining = sessions.len(), "Pruned analysis sessions");
        }
    }

    /// Validate, extract both reports, ask the model and store the result
    /// as a new session.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisSession, AnalyzeError> {
        let (brand_report, competitor_report) = match self.validate(&request) {
            Ok(files) => files,
            Err(errors) => {
                self.metrics.record_analysis("rejected");
                return Err(AnalyzeError::Invalid(errors));
            }
        };
        let brands = request.brands;

        let (brand_text, competitor_text) = tokio::join!(
            self.extract_report(BRAND_REPORT_FIELD, brand_report),
            self.extract_report(COMPETITOR_REPORT_FIELD, competitor_report),
        );
        let (brand_text, competitor_text) = match (brand_text, competitor_text) {
            (Ok(brand_text), Ok(competitor_text)) => (brand_text, competitor_text),
            (brand_text, competitor_text) => {
                self.metrics.record_analysis("rejected");
                let errors = [brand_text.err(), competitor_text.err()].into_iter().flatten().collect();
                return Err(AnalyzeError::Invalid(errors));
            }
        };

        let result = match self.request_analysis(&brands, &brand_text, &competitor_text).await {
            Ok(result) => result,
            Err(e) => {
                self.metrics.record_analysis("failure");
                log_error!(e, "Analysis failed", brand = %brands.brand, competitor = %brands.competitor);
                return Err(AnalyzeError::Failed(e));
            }
        };

        let sections = arrange(segment(&result.summary, &self.segment_options), &self.layout_rules);

        let session = AnalysisSession {
            id: Uuid::new_v4(),
            brands,
            created_at: result.created_at,
            result,
            sections,
            transcript: Vec::new(),
            chat_in_flight: Arc::new(AtomicBool::new(false)),
        };

        {
            let mut sessions = self.sessions.write().await;
            self.prune(&mut sessions, Utc::now());
            sessions.insert(session.id, session.clone());
        }
        self.metrics.record_analysis("success");
        info!(
            analysis_id = %session.id,
            sections = session.sections.len(),
            summary_chars = session.result.summary.len(),
            "Analysis completed"
        );

        Ok(session)
    }

    /// Every input problem at once, so the form can show them all.
    fn validate(&self, request: &AnalysisRequest) -> Result<(UploadedFile, UploadedFile), Vec<FieldError>> {
        let mut errors = Vec::new();

        let mut check_file = |field: &str, file: &Option<UploadedFile>| match file {
            None => {
                errors.push(FieldError::new(
                    field,
                    BrandlensError::validation(field, "Please select a report file"),
                ));
                None
            }
            Some(file) => match validate_upload(file) {
                Ok(_) => Some(file.clone()),
                Err(e) => {
                    errors.push(FieldError::new(field, e));
                    None
                }
            },
        };
        let brand_report = check_file(BRAND_REPORT_FIELD, &request.brand_report);
        let competitor_report = check_file(COMPETITOR_REPORT_FIELD, &request.competitor_report);

        for error in brand_field_errors(&request.brands) {
            if let BrandlensError::Validation { field, .. } = &error {
                errors.push(FieldError::new(field.clone(), error.clone()));
            }
        }

        match (brand_report, competitor_report) {
            (Some(brand_report), Some(competitor_report)) if errors.is_empty() => {
                Ok((brand_report, competitor_report))
            }
            _ => Err(errors),
        }
    }

    async fn extract_report(&self, field: &str, file: UploadedFile) -> Result<String, FieldError> {
        let kind = file.kind().map(|kind| kind.as_str()).unwrap_or("unknown");
        let filename = file.filename.clone();

        let result = tokio::task::spawn_blocking(move || extract(&file))
            .await
            .map_err(|e| BrandlensError::internal(format!("Extraction task failed: {}", e)))
            .and_then(|result| result);

        match result {
            Ok(text) => {
                self.metrics.record_extraction(kind, "success");
                info!(%filename, kind, chars = text.len(), "Report extracted");
                Ok(text)
            }
            Err(e) => {
                self.metrics.record_extraction(kind, "failure");
                warn!(%filename, kind, error = %e, "Report extraction failed");
                Err(FieldError::new(field, e))
            }
        }
    }

    async fn request_analysis(
        &self,
        brands: &BrandPair,
        brand_text: &str,
        competitor_text: &str,
    ) -> BrandlensResult<AnalysisResult> {
        let messages = self.prompts.analysis_messages(brands, brand_text, competitor_text)?;
        let result = AnalysisResult::new(self.completion.complete(messages).await?);

        if !result.is_available() {
            return Err(BrandlensError::malformed_response("completion returned an empty analysis"));
        }
        Ok(result)
    }

    /// Expired sessions are not found even before they are pruned.
    pub async fn session(&self, id: Uuid) -> BrandlensResult<AnalysisSession> {
        self.sessions
            .read()
            .await
            .get(&id)
            .filter(|session| !self.is_expired(session, Utc::now()))
            .cloned()
            .ok_or_else(|| BrandlensError::not_found(format!("analysis {}", id)))
    }

    pub async fn section(&self, id: Uuid, index: usize) -> BrandlensResult<DisplaySection> {
        let session = self.session(id).await?;
        session.section(index).cloned()
    }

    /// Chart series for one card, computed fresh on every call.
    pub async fn chart(&self, id: Uuid, index: usize) -> BrandlensResult<ChartData> {
        let section = self.section(id, index).await?;
        extract_for_section(&section.section)
            .ok_or_else(|| BrandlensError::not_found(format!("chart for section {} of analysis {}", index, id)))
    }

    pub async fn transcript(&self, id: Uuid) -> BrandlensResult<Vec<ChatMessage>> {
        Ok(self.session(id).await?.transcript)
    }

    /// One follow-up question. Turns are serialized per session: a second
    /// send while one is in flight is a `Conflict`. A failed completion is
    /// recorded as the fixed failure reply and the session stays usable.
    /// The question and its reply are appended together once the reply is
    /// known, so an abandoned turn leaves the transcript untouched.
    pub async fn chat(&self, id: Uuid, message: &str) -> BrandlensResult<ChatTurn> {
        let message = message.trim();
        if message.is_empty() {
            return Err(BrandlensError::validation("message", "Message must not be empty"));
        }

        let (_guard, brands, context) = {
            let now = Utc::now();
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&id)
                .filter(|session| !self.is_expired(session, now))
                .ok_or_else(|| BrandlensError::not_found(format!("analysis {}", id)))?;

            if session.chat_in_flight.swap(true, Ordering::AcqRel) {
                return Err(BrandlensError::conflict("A chat message is already being processed"));
            }
            let guard = InFlightGuard(session.chat_in_flight.clone());

            (guard, session.brands.clone(), session.result.summary.clone())
        };

        let reply = match self.prompts.chat_messages(&brands, &context, message) {
            Ok(messages) => self.completion.complete(messages).await,
            Err(e) => Err(e),
        };

        let failed = reply.is_err();
        let reply = match reply {
            Ok(content) => {
                self.metrics.record_chat_turn("success");
                ChatMessage::assistant(content)
            }
            Err(e) => {
                self.metrics.record_chat_turn("failure");
                log_error!(e, "Chat turn failed", analysis_id = %id);
                ChatMessage::assistant(CHAT_FAILURE_MESSAGE)
            }
        };

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| BrandlensError::not_found(format!("analysis {}", id)))?;
        session.transcript.push(ChatMessage::user(message));
        session.transcript.push(reply.clone());

        Ok(ChatTurn {
            reply,
            transcript: session.transcript.clone(),
            failed,
        })
    }
}
