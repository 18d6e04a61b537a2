//! Markdown Section Segmenter
//!
//! Splits a markdown analysis into titled sections and arranges them for a
//! two-column card grid. Model output only loosely follows the instructed
//! format, so every rule here is a best-effort heuristic: unexpected, missing
//! or reordered sections are all tolerated.

use brandlens_models::{ContentType, DisplaySection, Section};
use regex::Regex;
use std::sync::OnceLock;

/// Title used when a heading line carries no text
pub const DEFAULT_SECTION_TITLE: &str = "Analysis Section";

/// Placeholder body the model sometimes emits for an empty section
const NO_CONTENT_SENTINEL: &str = "no content available";

/// How heading lines are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Only headings with exactly this many `#` markers start a section
    MarkerCount(usize),
    /// Any 1-6 marker heading whose title does not start lowercase
    HeadingPattern,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentOptions {
    pub strategy: SplitStrategy,
    /// Titles starting with one of these name the whole report, not a section
    pub document_title_prefixes: Vec<String>,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            strategy: SplitStrategy::HeadingPattern,
            document_title_prefixes: vec!["Strategic Market Analysis".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRules {
    /// Case-insensitive title keywords that promote a section to full width
    pub full_width_keywords: Vec<String>,
}

impl Default for LayoutRules {
    fn default() -> Self {
        Self {
            full_width_keywords: vec!["overlap".to_string(), "affinity".to_string()],
        }
    }
}

fn heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s{0,3}(#{1,6})\s+([^\s\p{Ll}].*)$").expect("valid heading regex"))
}

fn table_separator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\|\s*:?-{3,}").expect("valid separator regex"))
}

fn numbered_item_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+\.").expect("valid numbered list regex"))
}

/// A recognised heading line: marker count and raw title text.
fn parse_heading(line: &str, strategy: SplitStrategy) -> Option<(usize, &str)> {
    match strategy {
        SplitStrategy::MarkerCount(count) => {
            let trimmed = line.trim_start();
            let markers = trimmed.chars().take_while(|c| *c == '#').count();
            if markers != count {
                return None;
            }
            let rest = &trimmed[markers..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                Some((markers, rest.trim()))
            } else {
                None
            }
        }
        SplitStrategy::HeadingPattern => {
            let caps = heading_pattern().captures(line)?;
            let markers = caps.get(1)?.as_str().len();
            let title = caps.get(2)?.as_str().trim();
            Some((markers, title))
        }
    }
}

/// Classify a section body by first match: table, numbered list, bullet list, text.
pub fn classify_content(content: &str) -> ContentType {
    if table_separator_pattern().is_match(content) {
        return ContentType::Table;
    }

    let first_line = content.lines().next().unwrap_or_default().trim_start();
    if numbered_item_pattern().is_match(first_line) {
        ContentType::NumberedList
    } else if first_line.starts_with('-') || first_line.starts_with('*') {
        ContentType::BulletList
    } else {
        ContentType::Text
    }
}

/// Split a markdown analysis into ordered sections.
///
/// Text before the first heading is not a section. Sections with an empty or
/// placeholder body are dropped, as is the document's own title heading.
pub fn segment(markdown: &str, options: &SegmentOptions) -> Vec<Section> {
    struct Chunk<'a> {
        markers: usize,
        title: &'a str,
        body: Vec<&'a str>,
    }

    let mut chunks: Vec<Chunk> = Vec::new();
    for line in markdown.lines() {
        if let Some((markers, title)) = parse_heading(line, options.strategy) {
            chunks.push(Chunk { markers, title, body: Vec::new() });
        } else if let Some(chunk) = chunks.last_mut() {
            chunk.body.push(line);
        }
    }

    let document_title = chunks
        .iter()
        .find(|chunk| chunk.markers == 1)
        .map(|chunk| chunk.title.to_lowercase());

    chunks
        .into_iter()
        .filter_map(|chunk| {
            let title = chunk.title.trim_end_matches('#').trim();
            let title = if title.is_empty() { DEFAULT_SECTION_TITLE } else { title };
            let content = chunk.body.join("\n").trim().to_string();

            if content.is_empty() || content.eq_ignore_ascii_case(NO_CONTENT_SENTINEL) {
                return None;
            }
            if is_document_title(title, document_title.as_deref(), &options.document_title_prefixes) {
                return None;
            }

            Some(Section {
                title: title.to_string(),
                content_type: classify_content(&content),
                content,
            })
        })
        .collect()
}

fn is_document_title(title: &str, document_title: Option<&str>, prefixes: &[String]) -> bool {
    let lowered = title.to_lowercase();
    if document_title == Some(lowered.as_str()) {
        return true;
    }
    prefixes
        .iter()
        .filter(|prefix| !prefix.trim().is_empty())
        .any(|prefix| lowered.starts_with(&prefix.trim().to_lowercase()))
}

/// Arrange sections for a two-column grid.
///
/// Sections whose title contains a full-width keyword move to the end and
/// span both columns. If an odd number of regular sections remains, the last
/// one spans both columns too, so no card sits alone in a row.
pub fn arrange(sections: Vec<Section>, rules: &LayoutRules) -> Vec<DisplaySection> {
    let keywords: Vec<String> = rules
        .full_width_keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    let (promoted, regular): (Vec<Section>, Vec<Section>) = sections.into_iter().partition(|section| {
        let title = section.title.to_lowercase();
        keywords.iter().any(|k| title.contains(k.as_str()))
    });

    let odd_regular = regular.len() % 2 == 1;
    let last_regular = regular.len().saturating_sub(1);

    let mut arranged: Vec<DisplaySection> = regular
        .into_iter()
        .enumerate()
        .map(|(i, section)| DisplaySection {
            section,
            full_width: odd_regular && i == last_regular,
        })
        .collect();

    arranged.extend(promoted.into_iter().map(|section| DisplaySection { section, full_width: true }));
    arranged
}
