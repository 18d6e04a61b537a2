//! Presentation Layer
//!
//! Server-rendered pages for the upload form, the analysis cards with their
//! chat panel, and the single-section print view. Markdown from the model is
//! rendered with pulldown-cmark; charts are drawn as inline SVG.

use brandlens_models::{ChartData, ChatMessage, ChatRole, Section};
use brandlens_utils::{extract_for_section, BrandlensError, BrandlensResult};
use handlebars::{html_escape, Handlebars};
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::service::{AnalysisSession, FieldError, CHAT_FAILURE_MESSAGE};

const UPLOAD_TEMPLATE: &str = "upload";
const RESULTS_TEMPLATE: &str = "results";
const PRINT_TEMPLATE: &str = "print";

/// Upload form state: retained brand names plus inline messages keyed by
/// form field name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadView {
    pub brand: String,
    pub competitor: String,
    pub errors: BTreeMap<String, String>,
    pub notice: Option<String>,
}

impl UploadView {
    pub fn with_brands(brand: impl Into<String>, competitor: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
            competitor: competitor.into(),
            ..Self::default()
        }
    }

    /// First message per field wins
    pub fn with_field_errors(mut self, errors: &[FieldError]) -> Self {
        for error in errors {
            self.errors.entry(error.field.clone()).or_insert_with(|| error.message());
        }
        self
    }

    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }
}

#[derive(Debug, Serialize)]
struct CardView {
    index: usize,
    title: String,
    body_html: String,
    content_type: &'static str,
    full_width: bool,
    copy_text: String,
    print_url: String,
    chart_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessageView {
    role: &'static str,
    html: String,
}

#[derive(Debug, Serialize)]
struct ResultsView {
    brand: String,
    competitor: String,
    cards: Vec<CardView>,
    raw_html: Option<String>,
    transcript: Vec<MessageView>,
    chat_url: String,
    chat_failure_message: &'static str,
}

#[derive(Debug, Serialize)]
struct PrintView {
    title: String,
    body_html: String,
}

pub struct Presenter {
    handlebars: Handlebars<'static>,
}

impl Presenter {
    pub fn new() -> BrandlensResult<Self> {
        let mut handlebars = Handlebars::new();

        handlebars
            .register_partial("styles", include_str!("../templates/styles.hbs"))
            .map_err(template_error)?;
        for (name, source) in [
            (UPLOAD_TEMPLATE, include_str!("../templates/upload.hbs")),
            (RESULTS_TEMPLATE, include_str!("../templates/results.hbs")),
            (PRINT_TEMPLATE, include_str!("../templates/print.hbs")),
        ] {
            handlebars.register_template_string(name, source).map_err(template_error)?;
        }

        Ok(Self { handlebars })
    }

    pub fn upload_page(&self, view: &UploadView) -> BrandlensResult<String> {
        self.render(UPLOAD_TEMPLATE, view)
    }

    /// One card per arranged section, or the whole summary as a single
    /// block when segmenting found nothing.
    pub fn results_page(&self, session: &AnalysisSession) -> BrandlensResult<String> {
        let cards: Vec<CardView> = session
            .sections
            .iter()
            .enumerate()
            .map(|(index, display)| {
                let section = &display.section;
                CardView {
                    index,
                    title: section.title.clone(),
                    body_html: render_markdown(&section.content),
                    content_type: section.content_type.as_str(),
                    full_width: display.full_width,
                    copy_text: section.clipboard_text(),
                    print_url: format!("/analyses/{}/sections/{}/print", session.id, index),
                    chart_url: extract_for_section(section)
                        .map(|_| format!("/analyses/{}/sections/{}/chart.svg", session.id, index)),
                }
            })
            .collect();

        let raw_html = cards
            .is_empty()
            .then(|| render_markdown(&session.result.summary));

        let view = ResultsView {
            brand: session.brands.brand.clone(),
            competitor: session.brands.competitor.clone(),
            cards,
            raw_html,
            transcript: session.transcript.iter().map(message_view).collect(),
            chat_url: format!("/api/v1/analyses/{}/chat", session.id),
            chat_failure_message: CHAT_FAILURE_MESSAGE,
        };

        self.render(RESULTS_TEMPLATE, &view)
    }

    /// Standalone document holding one section, which prints itself on load
    pub fn print_page(&self, section: &Section) -> BrandlensResult<String> {
        let view = PrintView {
            title: section.title.clone(),
            body_html: render_markdown(&section.content),
        };
        self.render(PRINT_TEMPLATE, &view)
    }

    fn render<T: Serialize>(&self, template: &str, data: &T) -> BrandlensResult<String> {
        self.handlebars
            .render(template, data)
            .map_err(|e| BrandlensError::internal(format!("Failed to render {} page: {}", template, e)))
    }
}

fn template_error(error: handlebars::TemplateError) -> BrandlensError {
    BrandlensError::configuration(format!("Invalid page template: {}", error))
}

fn message_view(message: &ChatMessage) -> MessageView {
    MessageView {
        role: match message.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        },
        html: render_markdown(&message.content),
    }
}

/// Markdown to HTML with tables and strikethrough. Raw HTML in the input is
/// shown as text rather than passed through, and link or image targets with
/// a scheme other than http, https or mailto are replaced by `#`.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        Event::Start(Tag::Link(kind, dest, title)) => Event::Start(Tag::Link(kind, safe_destination(dest), title)),
        Event::Start(Tag::Image(kind, dest, title)) => Event::Start(Tag::Image(kind, safe_destination(dest), title)),
        other => other,
    });

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

const ALLOWED_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

fn safe_destination(dest: CowStr<'_>) -> CowStr<'_> {
    if is_safe_destination(&dest) {
        dest
    } else {
        CowStr::Borrowed("#")
    }
}

/// Relative URLs pass; absolute ones only with an allowed scheme. Browsers
/// ignore whitespace and control characters inside a scheme, so those are
/// dropped before looking for it.
fn is_safe_destination(dest: &str) -> bool {
    let compact: String = dest.chars().filter(|c| !c.is_whitespace() && !c.is_control()).collect();
    let scheme_end = compact.find(|c| matches!(c, ':' | '/' | '?' | '#'));

    match scheme_end {
        Some(end) if compact[end..].starts_with(':') => {
            let scheme = compact[..end].to_ascii_lowercase();
            ALLOWED_SCHEMES.contains(&scheme.as_str())
        }
        _ => true,
    }
}

const CHART_WIDTH: f64 = 720.0;
const CHART_HEIGHT: f64 = 360.0;
const MARGIN_LEFT: f64 = 64.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 64.0;
const LABEL_CHARS: usize = 18;
const PALETTE: [&str; 6] = ["#2563eb", "#f59e0b", "#10b981", "#ef4444", "#8b5cf6", "#0ea5e9"];

/// Grouped bar chart: one group per row, one bar per series.
pub fn render_chart_svg(chart: &ChartData) -> String {
    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let max = chart.max_value();
    let min = chart.min_value();
    let span = if max - min > 0.0 { max - min } else { 1.0 };
    let y_of = |value: f64| MARGIN_TOP + (max - value) / span * plot_height;
    let baseline = y_of(0.0);

    let group_width = plot_width / chart.rows.len().max(1) as f64;
    let bar_width = group_width * 0.8 / chart.series_count().max(1) as f64;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}" font-family="Arial, sans-serif" font-size="11">"#,
        w = CHART_WIDTH,
        h = CHART_HEIGHT
    );
    svg.push_str(&format!(r##"<rect width="{}" height="{}" fill="#ffffff"/>"##, CHART_WIDTH, CHART_HEIGHT));

    // legend
    for (series, header) in chart.headers.iter().enumerate() {
        let x = MARGIN_LEFT + series as f64 * 140.0;
        svg.push_str(&format!(
            r#"<rect x="{:.1}" y="12" width="12" height="12" fill="{}"/><text x="{:.1}" y="22">{}</text>"#,
            x,
            PALETTE[series % PALETTE.len()],
            x + 16.0,
            html_escape(&truncate(header, LABEL_CHARS))
        ));
    }

    // value axis
    svg.push_str(&format!(
        r##"<line x1="{l:.1}" y1="{t:.1}" x2="{l:.1}" y2="{b:.1}" stroke="#9ca3af"/><text x="{lx:.1}" y="{t:.1}" text-anchor="end" dominant-baseline="middle">{max}</text>"##,
        l = MARGIN_LEFT,
        t = MARGIN_TOP,
        b = MARGIN_TOP + plot_height,
        lx = MARGIN_LEFT - 6.0,
        max = format_value(max)
    ));
    if min < 0.0 {
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" dominant-baseline="middle">{}</text>"#,
            MARGIN_LEFT - 6.0,
            MARGIN_TOP + plot_height,
            format_value(min)
        ));
    }

    for (group, row) in chart.rows.iter().enumerate() {
        let group_x = MARGIN_LEFT + group as f64 * group_width;
        let label = html_escape(&row.label);

        for (series, value) in row.values.iter().enumerate() {
            let top = y_of(value.max(0.0));
            let height = (y_of(*value) - baseline).abs();
            svg.push_str(&format!(
                r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}: {} {}</title></rect>"#,
                group_x + group_width * 0.1 + series as f64 * bar_width,
                top,
                bar_width,
                height,
                PALETTE[series % PALETTE.len()],
                label,
                html_escape(chart.headers.get(series).map(String::as_str).unwrap_or_default()),
                format_value(*value)
            ));
        }

        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            group_x + group_width / 2.0,
            CHART_HEIGHT - MARGIN_BOTTOM + 18.0,
            html_escape(&truncate(&row.label, LABEL_CHARS))
        ));
    }

    svg.push_str(&format!(
        r##"<line x1="{:.1}" y1="{b:.1}" x2="{:.1}" y2="{b:.1}" stroke="#9ca3af"/>"##,
        MARGIN_LEFT,
        CHART_WIDTH - MARGIN_RIGHT,
        b = baseline
    ));
    svg.push_str("</svg>");
    svg
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars - 1).collect();
    truncated.push('…');
    truncated
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandlens_models::ChartRow;

    #[test]
    fn test_markdown_tables_render() {
        let html = render_markdown("| Segment | Size |\n|---|---|\n| Gamers \u{1F3AE} | (12,400) |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>Gamers \u{1F3AE}</td>"));
    }

    #[test]
    fn test_raw_html_is_shown_as_text() {
        let html = render_markdown("<script>alert(1)</script>\n\nplain **bold**");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_script_links_are_neutralized() {
        for markdown in [
            "[Open report](javascript:alert(document.cookie))",
            "[Open report](JavaScript:alert(1))",
            "[Open report]( javascript:alert(1) )",
            "<javascript:alert(1)>",
            "![chart](data:text/html;base64,PHNjcmlwdD4=)",
            "[Open report][r]\n\n[r]: vbscript:msgbox(1)",
        ] {
            let html = render_markdown(markdown).to_ascii_lowercase();
            for unsafe_attr in ["href=\"javascript:", "href=\"vbscript:", "src=\"data:"] {
                assert!(!html.contains(unsafe_attr), "{markdown} -> {html}");
            }
        }

        let html = render_markdown("[Open report](javascript:alert(1))");
        assert!(html.contains(r##"<a href="#">Open report</a>"##));
    }

    #[test]
    fn test_ordinary_links_are_kept() {
        let html = render_markdown(
            "[site](https://example.com/a?b=1) [mail](mailto:team@example.com) [page](/analyses/1) [anchor](#top) [file](notes:2024.pdf)",
        );
        assert!(html.contains(r#"href="https://example.com/a?b=1""#));
        assert!(html.contains(r#"href="mailto:team@example.com""#));
        assert!(html.contains(r#"href="/analyses/1""#));
        assert!(html.contains(r##"href="#top""##));
        assert!(!html.contains("notes:2024"));
    }

    #[test]
    fn test_upload_page_shows_inline_errors_and_keeps_brands() {
        let presenter = Presenter::new().unwrap();
        let view = UploadView::with_brands("Disney+", "Netflix <HQ>").with_field_errors(&[FieldError::new(
            "file2",
            BrandlensError::unsupported_file_type("logo.png", "image/png"),
        )]);

        let page = presenter.upload_page(&view).unwrap();

        assert!(page.contains(r#"value="Disney+""#));
        assert!(page.contains("Netflix &lt;HQ&gt;"));
        assert!(page.contains("Please upload a valid PDF, Excel (.xlsx, .xls) or CSV file"));
        assert!(page.contains(r#"accept=".pdf,.xlsx,.xls,.csv""#));
        assert!(!page.contains("role=\"alert\""));
    }

    #[test]
    fn test_upload_page_notice() {
        let presenter = Presenter::new().unwrap();
        let page = presenter
            .upload_page(&UploadView::default().with_notice("Analysis unavailable"))
            .unwrap();
        assert!(page.contains(r#"<div class="notice" role="alert">Analysis unavailable</div>"#));
    }

    #[test]
    fn test_print_page_is_standalone() {
        let presenter = Presenter::new().unwrap();
        let section = Section {
            title: "Key Insights".to_string(),
            content: "1. **Growth**: families".to_string(),
            content_type: brandlens_models::ContentType::NumberedList,
        };

        let page = presenter.print_page(&section).unwrap();

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<h1>Key Insights</h1>"));
        assert!(page.contains("<strong>Growth</strong>"));
        assert!(page.contains("window.print()"));
    }

    #[test]
    fn test_chart_svg_draws_one_bar_per_value() {
        let chart = ChartData {
            headers: vec!["Size".to_string(), "Share".to_string()],
            rows: vec![
                ChartRow { label: "Gamers & Co".to_string(), values: vec![12400.0, 14.0] },
                ChartRow { label: "Foodies".to_string(), values: vec![8000.0, 0.0] },
            ],
        };

        let svg = render_chart_svg(&chart);

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<title>").count(), 4);
        assert!(svg.contains("Gamers &amp; Co"));
        assert!(svg.contains(">12400<"));
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("Gamers \u{1F3AE}", 18), "Gamers \u{1F3AE}");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
