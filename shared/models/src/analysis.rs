use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw markdown returned by the completion service for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            created_at: Utc::now(),
        }
    }

    /// An empty or blank summary means "no analysis available"
    pub fn is_available(&self) -> bool {
        !self.summary.trim().is_empty()
    }
}

/// How a section body is shaped, judged from its markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Table,
    NumberedList,
    BulletList,
    Text,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::NumberedList => "numbered_list",
            Self::BulletList => "bullet_list",
            Self::Text => "text",
        }
    }
}

/// One titled portion of the analysis, rendered as a card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    pub title: String,
    pub content: String,
    pub content_type: ContentType,
}

impl Section {
    /// Text placed on the clipboard by the card's copy action
    pub fn clipboard_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.content)
    }
}

/// A section after layout arrangement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplaySection {
    #[serde(flatten)]
    pub section: Section,
    pub full_width: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_summary_is_unavailable() {
        assert!(!AnalysisResult::new("").is_available());
        assert!(!AnalysisResult::new(" \n\t").is_available());
        assert!(AnalysisResult::new("### Key Insights\nGrowth").is_available());
    }

    #[test]
    fn test_clipboard_text() {
        let section = Section {
            title: "Key Insights".to_string(),
            content: "1. Growth".to_string(),
            content_type: ContentType::NumberedList,
        };
        assert_eq!(section.clipboard_text(), "Key Insights\n\n1. Growth");
    }

    #[test]
    fn test_display_section_serializes_flat() {
        let display = DisplaySection {
            section: Section {
                title: "Overlap".to_string(),
                content: "text".to_string(),
                content_type: ContentType::Text,
            },
            full_width: true,
        };
        let value = serde_json::to_value(&display).unwrap();
        assert_eq!(value["title"], "Overlap");
        assert_eq!(value["content_type"], "text");
        assert_eq!(value["full_width"], true);
    }
}
