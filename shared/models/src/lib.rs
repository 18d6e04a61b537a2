//! # Brandlens Domain Models
//!
//! Transient domain types for the Brandlens competitive report analyzer.
//! Nothing here is persisted: every value lives for one analysis session.
//!
//! ## Key Models
//!
//! - **UploadedFile** / **FileKind**: a report received from the user and its detected format
//! - **BrandPair**: the user's brand and the competitor, both required
//! - **AnalysisResult**: raw markdown returned by the completion service
//! - **Section** / **DisplaySection**: a titled card derived from the analysis
//! - **ChatMessage**: one turn of the follow-up chat
//! - **ChartData**: numeric series extracted from a markdown table

pub mod analysis;
pub mod chart;
pub mod chat;
pub mod upload;

pub use analysis::*;
pub use chart::*;
pub use chat::*;
pub use upload::*;
