//! Report Processing Module
//!
//! Text extraction from uploaded reports, segmentation of the model's
//! markdown analysis into sections, and chart extraction from section tables.

pub mod chart;
pub mod extractor;
pub mod segmenter;

pub use chart::{extract_chartable, extract_for_section, parse_cell, SIMILAR_SEGMENTS_PHRASE};
pub use extractor::extract;
pub use segmenter::{arrange, classify_content, segment, LayoutRules, SegmentOptions, SplitStrategy};
