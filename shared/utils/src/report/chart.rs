//! Table-to-Chart Extractor
//!
//! Pulls numeric series out of the first markdown table in a section so it
//! can be drawn as a bar chart. Pure functions of their input; nothing is
//! cached between calls.

use brandlens_models::{ChartData, ChartRow, Section};
use regex::Regex;
use std::sync::OnceLock;

/// Sections mentioning this phrase carry the side-by-side segment table,
/// which has its own fixed column layout.
pub const SIMILAR_SEGMENTS_PHRASE: &str = "Similar Segments Across Both Platforms";

/// Chart data for a section. The title is included so that the similar
/// segments layout is recognised from the card heading as well as the body.
pub fn extract_for_section(section: &Section) -> Option<ChartData> {
    extract_chartable(&format!("{}\n{}", section.title, section.content))
}

/// Extract chart-ready series from a markdown table, or `None` when the
/// content holds no table with usable numbers.
pub fn extract_chartable(content: &str) -> Option<ChartData> {
    let table_lines = first_table(content);
    // header + separator + at least one data row
    if table_lines.len() < 3 {
        return None;
    }

    if content.contains(SIMILAR_SEGMENTS_PHRASE) {
        return extract_similar_segments(&table_lines);
    }

    let headers = split_row(table_lines[0]);
    let rows: Vec<(String, Vec<f64>)> = table_lines[2..]
        .iter()
        .map(|line| split_row(line))
        .filter(|cells| !cells.is_empty())
        .map(|cells| {
            let label = cells[0].clone();
            let values = cells[1..].iter().map(|cell| parse_cell(cell)).collect();
            (label, values)
        })
        .collect();

    if rows.iter().all(|(_, values)| values.iter().all(|v| *v == 0.0)) {
        return None;
    }

    let column_count = rows.iter().map(|(_, values)| values.len()).max().unwrap_or(0);
    let retained: Vec<usize> = (0..column_count)
        .filter(|&column| rows.iter().any(|(_, values)| values.get(column).is_some_and(|v| *v != 0.0)))
        .collect();

    if retained.is_empty() {
        return None;
    }

    Some(ChartData {
        headers: retained
            .iter()
            .map(|&column| {
                headers
                    .get(column + 1)
                    .filter(|h| !h.is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("Column {}", column + 2))
            })
            .collect(),
        rows: rows
            .into_iter()
            .map(|(label, values)| ChartRow {
                label,
                values: retained
                    .iter()
                    .map(|&column| values.get(column).copied().unwrap_or(0.0))
                    .collect(),
            })
            .collect(),
    })
}

/// `| A Segment | A Size | B Segment | B Size | Share % |` rows, charted as
/// both sizes plus the share column.
fn extract_similar_segments(table_lines: &[&str]) -> Option<ChartData> {
    const SERIES_COLUMNS: [usize; 3] = [1, 3, 4];

    let headers = split_row(table_lines[0]);
    let rows: Vec<ChartRow> = table_lines[2..]
        .iter()
        .map(|line| split_row(line))
        .filter(|cells| cells.len() >= 5)
        .map(|cells| ChartRow {
            label: format!("{} / {}", cells[0], cells[2]),
            values: SERIES_COLUMNS.iter().map(|&column| parse_cell(&cells[column])).collect(),
        })
        .collect();

    if rows.is_empty() || rows.iter().all(|row| row.values.iter().all(|v| *v == 0.0)) {
        return None;
    }

    Some(ChartData {
        headers: SERIES_COLUMNS
            .iter()
            .map(|&column| {
                headers
                    .get(column)
                    .filter(|h| !h.is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("Column {}", column + 1))
            })
            .collect(),
        rows,
    })
}

/// Lines of the first table: the first run of consecutive lines containing
/// `|`. A blank or pipe-free line ends it, so later tables are ignored.
fn first_table(content: &str) -> Vec<&str> {
    content
        .lines()
        .skip_while(|line| !line.contains('|'))
        .take_while(|line| line.contains('|'))
        .collect()
}

/// Split a table row on `|`, dropping the empty fragments produced by the
/// outer pipes. Interior empty cells are kept so columns stay aligned.
fn split_row(line: &str) -> Vec<String> {
    let mut cells: Vec<String> = line.split('|').map(|cell| cell.trim().to_string()).collect();

    while cells.first().is_some_and(|cell| cell.is_empty()) {
        cells.remove(0);
    }
    while cells.last().is_some_and(|cell| cell.is_empty()) {
        cells.pop();
    }

    cells
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid number regex"))
}

/// Numeric value of a table cell.
///
/// `N/A` and `-` are placeholders meaning "no data" and read as zero.
/// Otherwise thousands separators are dropped and the first number in the
/// cell is used, so `(12,400)` is 12400 and a range such as `10-15%` reads as
/// its lower bound. A cell with no number reads as zero.
pub fn parse_cell(cell: &str) -> f64 {
    let cell = cell.trim();
    if cell.eq_ignore_ascii_case("n/a") || cell == "-" {
        return 0.0;
    }

    let cell = cell.replace(',', "");
    number_pattern()
        .find(&cell)
        .and_then(|number| number.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandlens_models::ContentType;
    use proptest::prelude::*;

    #[test]
    fn test_percentages_and_placeholders() {
        let chart = extract_chartable("| A | B |\n|---|---|\n| x | 10% |\n| y | N/A |").unwrap();

        assert_eq!(chart.headers, vec!["B".to_string()]);
        assert_eq!(
            chart.rows,
            vec![
                ChartRow { label: "x".to_string(), values: vec![10.0] },
                ChartRow { label: "y".to_string(), values: vec![0.0] },
            ]
        );
    }

    #[test]
    fn test_all_placeholder_table_is_not_chartable() {
        let content = "| Segment | Size | Share |\n|---|---|---|\n| Gamers | N/A | - |\n| Foodies | - | n/a |";
        assert_eq!(extract_chartable(content), None);
    }

    #[test]
    fn test_too_few_table_lines() {
        assert_eq!(extract_chartable("| A | B |\n|---|---|"), None);
        assert_eq!(extract_chartable("No table here, just 42 words"), None);
    }

    #[test]
    fn test_zero_columns_are_dropped() {
        let content = "Intro text\n\n| Segment | Size | Notes | Share |\n|---|---|---|---|\n| Gamers \u{1F3AE} | (12,400) | Loyal fans | 14% |\n| Foodies | (8,000) | Weekend viewers | 9.5% |";
        let chart = extract_chartable(content).unwrap();

        assert_eq!(chart.headers, vec!["Size".to_string(), "Share".to_string()]);
        assert_eq!(chart.rows[0].label, "Gamers \u{1F3AE}");
        assert_eq!(chart.rows[0].values, vec![12400.0, 14.0]);
        assert_eq!(chart.rows[1].values, vec![8000.0, 9.5]);
    }

    #[test]
    fn test_text_only_table_is_not_chartable() {
        let content = "| Segment | Notes |\n|---|---|\n| Gamers | Loyal |\n| Foodies | Casual |";
        assert_eq!(extract_chartable(content), None);
    }

    #[test]
    fn test_similar_segments_layout() {
        let section = Section {
            title: SIMILAR_SEGMENTS_PHRASE.to_string(),
            content: "| Netflix Segment | Netflix Size | Disney+ Segment | Disney+ Size | Overlap % |\n\
|---|---|---|---|---|\n\
| Gamers \u{1F3AE} | (12K) | Players \u{1F579} | (9K) | 40% |\n\
| Foodies | (3K) | Chefs | (5K) | 22% |\n\
| Short | row |"
                .to_string(),
            content_type: ContentType::Table,
        };

        let chart = extract_for_section(&section).unwrap();

        assert_eq!(
            chart.headers,
            vec!["Netflix Size".to_string(), "Disney+ Size".to_string(), "Overlap %".to_string()]
        );
        assert_eq!(chart.rows.len(), 2);
        assert_eq!(chart.rows[0].label, "Gamers \u{1F3AE} / Players \u{1F579}");
        assert_eq!(chart.rows[0].values, vec![12.0, 9.0, 40.0]);
        assert_eq!(chart.rows[1].values, vec![3.0, 5.0, 22.0]);
    }

    #[test]
    fn test_similar_segments_without_wide_rows() {
        let content = format!("{}\n| A | B |\n|---|---|\n| x | 1 |", SIMILAR_SEGMENTS_PHRASE);
        assert_eq!(extract_chartable(&content), None);
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("10%"), 10.0);
        assert_eq!(parse_cell("1,234.5"), 1234.5);
        assert_eq!(parse_cell("-3.2"), -3.2);
        assert_eq!(parse_cell("N/A"), 0.0);
        assert_eq!(parse_cell("-"), 0.0);
        assert_eq!(parse_cell("High"), 0.0);
        assert_eq!(parse_cell("(12K)"), 12.0);
    }

    #[test]
    fn test_ranges_read_as_lower_bound() {
        assert_eq!(parse_cell("12-15"), 12.0);
        assert_eq!(parse_cell("10-15%"), 10.0);
        assert_eq!(parse_cell("2.5 - 4 hrs"), 2.5);

        let chart = extract_chartable("| Segment | Weekly Hours |\n|---|---|\n| Gamers | 10-15 |\n| Foodies | 3-5 |").unwrap();
        assert_eq!(chart.rows[0].values, vec![10.0]);
        assert_eq!(chart.rows[1].values, vec![3.0]);
    }

    #[test]
    fn test_only_first_table_is_charted() {
        let content = "| Segment | Size |\n|---|---|\n| Gamers | 12 |\n| Foodies | 8 |\n\n\
Second breakdown:\n\n\
| Region | Share |\n|---|---|\n| North | 40% |";

        let chart = extract_chartable(content).unwrap();

        assert_eq!(chart.headers, vec!["Size".to_string()]);
        let labels: Vec<&str> = chart.rows.iter().map(|row| row.label.as_str()).collect();
        assert_eq!(labels, vec!["Gamers", "Foodies"]);
    }

    #[test]
    fn test_back_to_back_tables_stop_at_blank_line() {
        let content = "| A | B |\n|---|---|\n| x | 1 |\n\n| C | D |\n|---|---|\n| y | 2 |";
        let chart = extract_chartable(content).unwrap();
        assert_eq!(chart.rows.len(), 1);
        assert_eq!(chart.rows[0].label, "x");
    }

    #[test]
    fn test_short_header_row_gets_generated_names() {
        let chart = extract_chartable("| Segment |\n|---|\n| Gamers | 5 | 7 |").unwrap();
        assert_eq!(chart.headers, vec!["Column 2".to_string(), "Column 3".to_string()]);
    }

    proptest! {
        /// Extraction is a pure function of its input
        #[test]
        fn prop_extraction_is_deterministic(
            labels in proptest::collection::vec("[A-Za-z]{1,8}", 1..6),
            values in proptest::collection::vec(prop_oneof![
                Just("N/A".to_string()),
                Just("-".to_string()),
                "[0-9]{1,4}%?",
            ], 1..6),
        ) {
            let mut content = String::from("| Segment | Value |\n|---|---|\n");
            for (label, value) in labels.iter().zip(values.iter().cycle()) {
                content.push_str(&format!("| {} | {} |\n", label, value));
            }

            prop_assert_eq!(extract_chartable(&content), extract_chartable(&content));
        }
    }
}
