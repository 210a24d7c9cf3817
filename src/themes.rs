//! Theme clustering and prioritization.
//!
//! Insights are grouped by their exact theme label, each group gets one
//! generation call to produce a polished theme name and summary, and the
//! resulting clusters are ranked by priority then frequency. A failed
//! generation keeps the raw label and a canned summary at Medium priority.

use std::cmp::Reverse;
use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use crate::decode::extract_json;
use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest};
use crate::model::{Insight, Priority, Sentiment, ThemeCluster};
use crate::prompts::theme_prompt;

const THEME_MAX_OUTPUT_TOKENS: u32 = 1024;

/// Options for the clustering stage.
#[derive(Debug, Clone)]
pub struct ThemeOptions {
    pub model: String,
    pub temperature: f32,
}

impl Default for ThemeOptions {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4o-mini".into(),
            temperature: 0.1,
        }
    }
}

/// Group insights by exact theme label, preserving the order in which
/// labels were first observed. Matching is case-sensitive; "Navigation"
/// and "navigation" are distinct clusters.
pub fn group_by_theme(insights: &[Insight]) -> Vec<(String, Vec<Insight>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Insight>> = HashMap::new();

    for insight in insights {
        if !groups.contains_key(&insight.theme) {
            order.push(insight.theme.clone());
        }
        groups
            .entry(insight.theme.clone())
            .or_default()
            .push(insight.clone());
    }

    order
        .into_iter()
        .map(|label| {
            let members = groups.remove(&label).unwrap_or_default();
            (label, members)
        })
        .collect()
}

/// Priority from cluster shape: five or more mentions, or repeated
/// negative sentiment in a cluster of at least three, is High.
pub fn priority_for(frequency: usize, negative_count: usize) -> Priority {
    if frequency >= 5 {
        Priority::High
    } else if negative_count >= 2 && frequency >= 3 {
        Priority::High
    } else if frequency >= 3 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Report order: two tiers only. High clusters first, everything else in
/// one bucket; frequency descending within each tier, stable for ties.
/// Medium does not outrank Low.
fn sort_clusters(clusters: &mut [ThemeCluster]) {
    clusters.sort_by_key(|c| (c.priority != Priority::High, Reverse(c.frequency)));
}

#[derive(Debug, Deserialize)]
struct RawTheme {
    theme_name: String,
    summary: String,
}

fn decode_theme(raw: &str) -> Option<RawTheme> {
    let parsed: RawTheme = serde_json::from_str(extract_json(raw)).ok()?;
    if parsed.theme_name.trim().is_empty() || parsed.summary.trim().is_empty() {
        return None;
    }
    Some(parsed)
}

async fn synthesize_cluster(
    gateway: &dyn ChatGateway,
    options: &ThemeOptions,
    raw_label: &str,
    members: Vec<Insight>,
) -> ThemeCluster {
    let frequency = members.len();
    let negative_count = members
        .iter()
        .filter(|i| i.sentiment == Sentiment::Negative)
        .count();

    let prompt = theme_prompt(raw_label, &members);
    let req = ChatRequest::new(
        ChatModel::openrouter(&options.model),
        prompt.to_messages(),
        Attribution::new("themes::cluster"),
    )
    .temperature(options.temperature)
    .max_tokens(THEME_MAX_OUTPUT_TOKENS)
    .json();

    let decoded = match gateway.chat(req).await {
        Ok(resp) => decode_theme(&resp.content),
        Err(err) => {
            warn!(theme = raw_label, error = %err, "theme synthesis call failed");
            None
        }
    };

    match decoded {
        Some(theme) => ThemeCluster {
            theme_name: theme.theme_name,
            insights: members,
            frequency,
            priority: priority_for(frequency, negative_count),
            summary: theme.summary,
        },
        None => {
            warn!(theme = raw_label, "using raw label for cluster; summary unavailable");
            ThemeCluster {
                theme_name: raw_label.to_string(),
                insights: members,
                frequency,
                priority: Priority::Medium,
                summary: format!("Theme identified from {frequency} user insights"),
            }
        }
    }
}

/// Cluster insights into themes and rank them.
///
/// Clusters are sorted High priority first, then by descending frequency
/// across the rest regardless of Medium/Low; ties keep first-observed
/// theme order.
pub async fn cluster_themes(
    gateway: &dyn ChatGateway,
    options: &ThemeOptions,
    insights: &[Insight],
) -> Vec<ThemeCluster> {
    let mut clusters = Vec::new();
    for (label, members) in group_by_theme(insights) {
        clusters.push(synthesize_cluster(gateway, options, &label, members).await);
    }

    sort_clusters(&mut clusters);
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insight(theme: &str, sentiment: Sentiment) -> Insight {
        Insight {
            quote: format!("quote about {theme}"),
            speaker: None,
            theme: theme.to_string(),
            sentiment,
            confidence: 0.7,
            context: String::new(),
            timestamp: None,
        }
    }

    #[test]
    fn grouping_is_case_sensitive_and_order_preserving() {
        let insights = vec![
            insight("Navigation", Sentiment::Negative),
            insight("Pricing", Sentiment::Neutral),
            insight("navigation", Sentiment::Negative),
            insight("Navigation", Sentiment::Neutral),
        ];
        let groups = group_by_theme(&insights);
        let labels: Vec<&str> = groups.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["Navigation", "Pricing", "navigation"]);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[2].1.len(), 1);
    }

    #[test]
    fn priority_rules() {
        assert_eq!(priority_for(5, 0), Priority::High);
        assert_eq!(priority_for(3, 2), Priority::High);
        assert_eq!(priority_for(4, 1), Priority::Medium);
        assert_eq!(priority_for(3, 0), Priority::Medium);
        assert_eq!(priority_for(2, 2), Priority::Low);
        assert_eq!(priority_for(1, 0), Priority::Low);
    }

    #[test]
    fn theme_decode_requires_both_fields() {
        assert!(decode_theme(r#"{"theme_name": "Nav", "summary": "users struggle"}"#).is_some());
        assert!(decode_theme(r#"{"theme_name": "", "summary": "x"}"#).is_none());
        assert!(decode_theme(r#"{"summary": "x"}"#).is_none());
        assert!(decode_theme("not json at all").is_none());
    }

    #[test]
    fn clusters_sort_by_priority_then_frequency() {
        let mk = |priority, frequency| ThemeCluster {
            theme_name: format!("{priority:?}-{frequency}"),
            insights: Vec::new(),
            frequency,
            priority,
            summary: String::new(),
        };
        let mut clusters = vec![
            mk(Priority::High, 2),
            mk(Priority::Medium, 10),
            mk(Priority::High, 9),
            mk(Priority::Medium, 1),
            mk(Priority::Low, 5),
        ];
        sort_clusters(&mut clusters);
        let names: Vec<&str> = clusters.iter().map(|c| c.theme_name.as_str()).collect();
        // Below High, frequency alone decides: Low-5 outranks Medium-1.
        assert_eq!(
            names,
            vec!["High-9", "High-2", "Medium-10", "Low-5", "Medium-1"]
        );
    }

    struct SelectiveGateway;

    #[async_trait::async_trait]
    impl ChatGateway for SelectiveGateway {
        async fn chat(
            &self,
            req: crate::gateway::ChatRequest,
        ) -> Result<crate::gateway::ChatResponse, crate::gateway::ProviderError> {
            let user = req.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            if user.contains("Pricing") {
                Ok(crate::gateway::ChatResponse {
                    content: r#"{"theme_name": "Pricing", "summary": "price feels fair"}"#.into(),
                    input_tokens: 1,
                    output_tokens: 1,
                    cost_nanodollars: 0,
                    latency: std::time::Duration::from_millis(1),
                    finish_reason: crate::gateway::FinishReason::Stop,
                })
            } else {
                Err(crate::gateway::ProviderError::provider(
                    "openrouter",
                    "unreachable",
                    true,
                ))
            }
        }
    }

    #[tokio::test]
    async fn fallback_medium_does_not_outrank_busier_low_cluster() {
        // Pricing decodes cleanly (freq 2 -> Low); Onboarding falls back
        // (forced Medium, freq 1). Frequency decides below High, so
        // Pricing must come first.
        let insights = vec![
            insight("Pricing", Sentiment::Neutral),
            insight("Pricing", Sentiment::Neutral),
            insight("Onboarding", Sentiment::Neutral),
        ];
        let clusters =
            cluster_themes(&SelectiveGateway, &ThemeOptions::default(), &insights).await;
        let order: Vec<(&str, usize)> = clusters
            .iter()
            .map(|c| (c.theme_name.as_str(), c.frequency))
            .collect();
        assert_eq!(order, vec![("Pricing", 2), ("Onboarding", 1)]);
        assert_eq!(clusters[0].priority, Priority::Low);
        assert_eq!(clusters[1].priority, Priority::Medium);
    }
}
