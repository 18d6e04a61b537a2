//! Prompt Builder
//!
//! Handlebars templates for the analysis request and the follow-up chat.
//! Output is plain text for the model, so HTML escaping is switched off.

use brandlens_models::BrandPair;
use brandlens_utils::{BrandlensError, BrandlensResult};
use handlebars::Handlebars;
use serde_json::json;

use crate::llm_client::Message;

pub struct PromptBuilder {
    handlebars: Handlebars<'static>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// System instruction plus a user payload carrying both report texts,
    /// each labelled by its brand.
    pub fn analysis_messages(
        &self,
        brands: &BrandPair,
        brand_report: &str,
        competitor_report: &str,
    ) -> BrandlensResult<Vec<Message>> {
        let data = json!({
            "brand": brands.brand,
            "competitor": brands.competitor,
            "brand_report": brand_report,
            "competitor_report": competitor_report,
        });

        Ok(vec![
            Message::system(self.render(ANALYSIS_SYSTEM_TEMPLATE, &data)?),
            Message::user(self.render(ANALYSIS_USER_TEMPLATE, &data)?),
        ])
    }

    /// Follow-up question with the original analysis appended as context
    pub fn chat_messages(&self, brands: &BrandPair, context: &str, message: &str) -> BrandlensResult<Vec<Message>> {
        let data = json!({
            "brand": brands.brand,
            "competitor": brands.competitor,
            "context": context,
        });

        Ok(vec![
            Message::system(self.render(CHAT_SYSTEM_TEMPLATE, &data)?),
            Message::user(message),
        ])
    }

    fn render(&self, template: &str, data: &serde_json::Value) -> BrandlensResult<String> {
        self.handlebars
            .render_template(template, data)
            .map_err(|e| BrandlensError::internal(format!("Failed to render prompt: {}", e)))
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

const ANALYSIS_SYSTEM_TEMPLATE: &str = r#"You are a senior market strategist specializing in customer acquisition and brand transitions.
Your task is to analyze the provided reports for {{brand}} and {{competitor}} and provide two complementary analyses in markdown, using exactly the headings below in this order.

# Strategic Market Analysis

### Customer Loyalty Analysis
- Deep dive into emotional and practical factors driving customer loyalty to {{competitor}}
- Identify specific customer segments and their key loyalty drivers
- Analyze price sensitivity, brand perception and switching barriers

### Conversion Opportunities
- Map customer pain points with {{competitor}}
- Identify unmet needs and service gaps
- Highlight demographic and behavioral patterns of customers most likely to switch

### Targeted Strategies
- Develop segment-specific conversion strategies
- Outline marketing messages that address emotional and practical switching barriers
- Create timeline and touchpoint recommendations for the customer journey

### Differentiated Value Proposition
- Craft compelling reasons to switch that go beyond price
- Position {{brand}} advantages against {{competitor}} weaknesses
- Define unique selling propositions for each major customer segment

# {{competitor}} vs {{brand}} Audience Segment Comparison

### Similar Segments Across Both Platforms
| {{competitor}} Segment | {{competitor}} Size | {{brand}} Segment | {{brand}} Size | Audience Overlap % |
|---|---|---|---|---|
| [Segment with emoji] | ([Size]) | [Segment with emoji] | ([Size]) | [Overlap]% |

### Unique {{competitor}} Segments
| Segment | Size | Uniqueness Notes |
|---|---|---|
| [Segment with emoji] | ([Size]) | [What makes it unique] |

### Unique {{brand}} Segments
| Segment | Size | Uniqueness Notes |
|---|---|---|
| [Segment with emoji] | ([Size]) | [What makes it unique] |

### Audience Overlap & Affinity
| Segment | {{competitor}} Affinity | {{brand}} Affinity | Notes |
|---|---|---|---|
| [Segment with emoji] | [Affinity]% | [Affinity]% | [Description] |

### Key Insights
1. **Content Diversity vs. Niche Interests**: [First insight about content and audience differences]
2. **Platform Strengths**: [Second insight about platform strengths]
3. **Composition Differences**: [Third insight about audience composition]
4. **Growth Opportunities**: [Fourth insight about potential growth]
5. **Potential Strategies**: [Fifth insight about strategic approaches]
6. **Audience Migration Potential**: [Sixth insight about audience movement]
7. **Market Positioning**: [Final insight about market position]

Remember:
- Keep all emojis in segment names
- Include audience sizes in parentheses
- Keep every table's columns in exactly the order shown
- Start every section with a `###` heading
- Write N/A where a figure is not in the reports
- Keep segment names exactly as they appear
- Ensure both analyses complement each other"#;

const ANALYSIS_USER_TEMPLATE: &str = r#"Please analyze these two reports and provide both the strategic market analysis and the audience segment comparison:

{{brand}} Report:
{{brand_report}}

{{competitor}} Report:
{{competitor_report}}

Follow the exact structure provided and ensure proper formatting for both analyses."#;

const CHAT_SYSTEM_TEMPLATE: &str = r#"You are an audience insights expert analyzing {{brand}} and {{competitor}} segments.

When responding, always structure your answers using proper markdown:

- Use tables when comparing segments:
  | Segment | Metric | Notes |
  |---------|--------|-------|
  | Data    | Data   | Data  |

- Use headers for sections:
  # Main points
  ## Sub-points

- Use bullet points for lists
- Include emojis when mentioning segments
- Keep segment names exactly as they appear

Focus your analysis on:
1. Identifying similar audiences between platforms
2. Understanding unique segment characteristics
3. Suggesting ways {{brand}} can attract {{competitor}}'s audiences
4. Explaining audience size and composition differences
5. Highlighting opportunities for audience growth

Remember that audience cluster names are AI-generated and don't follow a fixed taxonomy.

Context: {{context}}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::Role;

    #[test]
    fn test_analysis_prompt_names_required_sections() {
        let builder = PromptBuilder::new();
        let brands = BrandPair::new("Disney+", "Netflix");

        let messages = builder.analysis_messages(&brands, "disney text", "netflix text").unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);

        let system = &messages[0].content;
        for title in [
            "### Customer Loyalty Analysis",
            "### Conversion Opportunities",
            "### Targeted Strategies",
            "### Differentiated Value Proposition",
            "### Similar Segments Across Both Platforms",
            "### Unique Netflix Segments",
            "### Unique Disney+ Segments",
            "### Audience Overlap & Affinity",
            "### Key Insights",
        ] {
            assert!(system.contains(title), "missing {title}");
        }
        assert!(system.contains("| Netflix Segment | Netflix Size | Disney+ Segment | Disney+ Size |"));
    }

    #[test]
    fn test_report_text_embedded_verbatim() {
        let builder = PromptBuilder::new();
        let brands = BrandPair::new("Hulu & Co", "<Max>");
        let report = "Gamers \u{1F3AE}\t12,400\n\"quoted\" & <tagged>";

        let messages = builder.analysis_messages(&brands, report, "other").unwrap();
        let user = &messages[1].content;

        assert_eq!(messages[1].role, Role::User);
        assert!(user.contains("Hulu & Co Report:\nGamers \u{1F3AE}\t12,400\n\"quoted\" & <tagged>"));
        assert!(user.contains("<Max> Report:\nother"));
    }

    #[test]
    fn test_chat_prompt_carries_context() {
        let builder = PromptBuilder::new();
        let brands = BrandPair::new("Disney+", "Netflix");

        let messages = builder
            .chat_messages(&brands, "### Key Insights\n1. Gamers", "Which segment is largest?")
            .unwrap();

        assert!(messages[0].content.contains("analyzing Disney+ and Netflix segments"));
        assert!(messages[0].content.ends_with("Context: ### Key Insights\n1. Gamers"));
        assert_eq!(messages[1], Message::user("Which segment is largest?"));
    }
}
