//! Prompt templates for the synthesis pipeline's generation calls.
//!
//! Domain logic for rendering prompts. Provider-agnostic; every call site
//! pairs one of these with a fallback construction path in its own module.

use crate::gateway::Message;
use crate::model::{Insight, ThemeCluster};

/// Rendered prompt ready for the gateway.
#[derive(Debug, Clone)]
pub struct PromptInstance {
    pub template_slug: &'static str,
    pub system: String,
    pub user: String,
}

impl PromptInstance {
    pub fn to_messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }
}

// =============================================================================
// Insight extraction
// =============================================================================

const EXTRACTION_SYSTEM: &str = "\
You are an expert UX researcher analyzing interview and survey transcripts. \
You extract quote-level insights focusing on:
1. User pain points and frustrations
2. User goals and motivations
3. Behavioral patterns
4. Feature requests or suggestions
5. Emotional reactions

For each insight provide:
- quote: an EXACT quote from the transcript, verbatim
- speaker: speaker identifier if identifiable, else null
- theme: a short theme category (e.g. \"Navigation Issues\", \"Feature Request\")
- sentiment: \"Positive\", \"Negative\", or \"Neutral\"
- confidence: a score between 0 and 1
- context: a brief description of the surrounding discussion
- timestamp: if present in the transcript, else null

Respond with a JSON array of insight objects. If no significant insights are \
found, return an empty array.";

/// Render the per-chunk extraction prompt.
pub fn extraction_prompt(chunk_text: &str) -> PromptInstance {
    PromptInstance {
        template_slug: "extract_insights_v1",
        system: EXTRACTION_SYSTEM.to_string(),
        user: format!(
            "Transcript chunk:\n\n<transcript>\n{}\n</transcript>\n\nReturn the JSON array only.",
            chunk_text.trim()
        ),
    }
}

// =============================================================================
// Theme summary
// =============================================================================

const THEME_SYSTEM: &str = "\
You are a senior UX researcher. You receive a set of related insights and \
produce a comprehensive theme summary.

Respond with JSON only:
{
  \"theme_name\": \"Clear Theme Name\",
  \"summary\": \"Detailed summary of the theme and its implications\"
}";

/// Render the per-cluster theme summary prompt.
pub fn theme_prompt(raw_label: &str, insights: &[Insight]) -> PromptInstance {
    let mut lines = String::new();
    for insight in insights {
        lines.push_str(&format!(
            "- \"{}\" (Sentiment: {}, Confidence: {:.2})\n",
            insight.quote,
            insight.sentiment.as_str(),
            insight.confidence
        ));
    }

    PromptInstance {
        template_slug: "theme_summary_v1",
        system: THEME_SYSTEM.to_string(),
        user: format!(
            "Theme label: {raw_label}\n\nInsights:\n{lines}\nReturn the JSON object only."
        ),
    }
}

// =============================================================================
// Key insight cards
// =============================================================================

const CARD_SYSTEM: &str = "\
You are an expert UX researcher creating Key Insight cards for a research \
presentation. Each card should:
1. Have a clear, compelling title (e.g. \"Control & Transparency\")
2. Include ONE main finding statement (what users want/feel/do)
3. Specify finding_type: \"positive\" (users like), \"negative\" (users \
dislike), \"critical\" (must-have), or \"neutral\"
4. Optionally include a problem_statement explaining the issue
5. Include 2-4 supporting_quotes with speaker attribution
6. Optionally include behavioral_pattern, expected_journey, impact_metric

Focus on insights that are actionable, supported by strong quotes, relevant \
to product decisions, and clearly differentiated from each other.

Respond with a JSON array of 3-5 cards:
[
  {
    \"insight_number\": 1,
    \"title\": \"Control & Transparency\",
    \"main_finding\": \"Users want visible choice upfront\",
    \"finding_type\": \"positive\",
    \"problem_statement\": \"...\",
    \"supporting_quotes\": [{\"quote\": \"...\", \"speaker\": \"...\"}],
    \"behavioral_pattern\": \"...\",
    \"expected_journey\": [\"...\"],
    \"impact_metric\": \"9 out of 11 participants\"
  }
]";

/// Render the key-insight card synthesis prompt from prepared quote and
/// theme-summary blocks.
pub fn card_prompt(all_quotes: &str, theme_summaries: &str) -> PromptInstance {
    PromptInstance {
        template_slug: "key_insight_cards_v1",
        system: CARD_SYSTEM.to_string(),
        user: format!(
            "USER QUOTES AND FEEDBACK:\n{all_quotes}\n\nTHEME SUMMARIES:\n{theme_summaries}\n\nReturn the JSON array only."
        ),
    }
}

// =============================================================================
// Executive summary
// =============================================================================

const SUMMARY_SYSTEM: &str = "\
You are a senior UX researcher writing an Executive Summary for a research \
presentation. Be specific, quantitative when possible, and action-oriented.

Respond with JSON only:
{
  \"research_question\": \"The main research question...\",
  \"key_finding\": \"X out of Y participants preferred/did/said...\",
  \"key_insight\": \"This means that users...\",
  \"recommendation\": \"Implement/Change/Prioritize X to achieve Y.\",
  \"context\": \"Optional additional context paragraph\"
}";

/// Render the executive summary prompt from the card digest and a bounded
/// slice of the research data.
pub fn summary_prompt(key_insights: &str, all_data: &str) -> PromptInstance {
    PromptInstance {
        template_slug: "executive_summary_v1",
        system: SUMMARY_SYSTEM.to_string(),
        user: format!(
            "KEY INSIGHTS:\n{key_insights}\n\nRESEARCH DATA:\n{all_data}\n\nReturn the JSON object only."
        ),
    }
}

/// Prepare theme summaries for the synthesis prompts.
pub fn render_theme_summaries(themes: &[ThemeCluster]) -> String {
    let mut out = String::new();
    for theme in themes {
        out.push_str(&format!(
            "- {} ({} priority, {} mentions): {}\n",
            theme.theme_name,
            theme.priority.as_str(),
            theme.frequency,
            theme.summary
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sentiment;

    fn insight(quote: &str) -> Insight {
        Insight {
            quote: quote.into(),
            speaker: None,
            theme: "Nav".into(),
            sentiment: Sentiment::Negative,
            confidence: 0.9,
            context: String::new(),
            timestamp: None,
        }
    }

    #[test]
    fn extraction_prompt_embeds_chunk() {
        let p = extraction_prompt("I could not find the settings.");
        assert!(p.system.contains("UX researcher"));
        assert!(p.user.contains("I could not find the settings."));
        assert!(p.user.contains("<transcript>"));
    }

    #[test]
    fn theme_prompt_lists_quotes() {
        let p = theme_prompt("Nav", &[insight("Q1"), insight("Q2")]);
        assert!(p.user.contains("\"Q1\""));
        assert!(p.user.contains("\"Q2\""));
        assert!(p.user.contains("Theme label: Nav"));
    }

    #[test]
    fn messages_have_system_then_user() {
        let msgs = extraction_prompt("x").to_messages();
        assert_eq!(msgs.len(), 2);
    }
}
