//! Prometheus counters for the analyzer, kept in a per-process registry.

use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    analyses: IntCounterVec,
    chat_turns: IntCounterVec,
    extractions: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let analyses = IntCounterVec::new(
            Opts::new("brandlens_analyses_total", "Analysis requests by outcome"),
            &["outcome"],
        )?;
        let chat_turns = IntCounterVec::new(
            Opts::new("brandlens_chat_turns_total", "Follow-up chat turns by outcome"),
            &["outcome"],
        )?;
        let extractions = IntCounterVec::new(
            Opts::new("brandlens_extractions_total", "Report extractions by file kind and outcome"),
            &["kind", "outcome"],
        )?;

        registry.register(Box::new(analyses.clone()))?;
        registry.register(Box::new(chat_turns.clone()))?;
        registry.register(Box::new(extractions.clone()))?;

        Ok(Self {
            registry,
            analyses,
            chat_turns,
            extractions,
        })
    }

    pub fn record_analysis(&self, outcome: &str) {
        self.analyses.with_label_values(&[outcome]).inc();
    }

    pub fn record_chat_turn(&self, outcome: &str) {
        self.chat_turns.with_label_values(&[outcome]).inc();
    }

    pub fn record_extraction(&self, kind: &str, outcome: &str) {
        self.extractions.with_label_values(&[kind, outcome]).inc();
    }

    /// Text exposition format for `/metrics`
    pub fn render(&self) -> String {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .unwrap_or_else(|_| "Error encoding metrics".to_string())
    }
}
