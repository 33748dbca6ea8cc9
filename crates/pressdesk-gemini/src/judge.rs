// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relevance judging of digest items with Gemini.

use std::time::Duration;

use async_trait::async_trait;
use pressdesk_config::model::{FilterConfig, GeminiConfig};
use pressdesk_core::error::PressdeskError;
use pressdesk_core::traits::{PluginAdapter, RelevanceJudge};
use pressdesk_core::types::{AdapterType, HealthStatus, RawMessage, RelevanceVerdict};
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::GeminiClient;

/// A subject area the judge matches queries against.
#[derive(Debug, Clone, Copy)]
pub struct Topic {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const TOPICS: &[Topic] = &[
    Topic {
        key: "artificial_intelligence",
        name: "Artificial Intelligence & Machine Learning",
        description: "AI, machine learning, automation, chatbots, generative AI, predictive analytics, robotics",
    },
    Topic {
        key: "web_development",
        name: "Web Development & Design",
        description: "websites, front-end and back-end development, UX/UI design, web applications, APIs, CMS, e-commerce, accessibility",
    },
    Topic {
        key: "digital_marketing",
        name: "Digital Marketing & SEO",
        description: "social media, SEO, content and email marketing, PPC, brand strategy, marketing automation and analytics",
    },
    Topic {
        key: "business_technology",
        name: "Business Technology & Software",
        description: "SaaS, cloud computing, business software, data analytics, workflow automation, integration, digital transformation",
    },
    Topic {
        key: "mobile_technology",
        name: "Mobile Technology & Apps",
        description: "mobile app development, iOS, Android, app store optimization, mobile user experience",
    },
];

/// The model's assessment of one query.
#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceAnalysis {
    pub relevant: bool,
    pub relevance_score: f64,
    #[serde(default)]
    pub matching_topics: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
    pub confidence: f64,
}

impl RelevanceAnalysis {
    /// Relevant, above both thresholds, and matching at least one topic.
    pub fn passes(&self, relevance_threshold: f64, confidence_threshold: f64) -> bool {
        self.relevant
            && self.relevance_score >= relevance_threshold
            && self.confidence >= confidence_threshold
            && !self.matching_topics.is_empty()
    }
}

pub fn relevance_prompt(message: &RawMessage) -> String {
    let topics: Vec<String> = TOPICS
        .iter()
        .map(|t| format!("- {} ({}): {}", t.name, t.key, t.description))
        .collect();
    format!(
        "You decide whether a media query is relevant to specific business and technology topics.\n\
         \n\
         QUERY:\n\
         Summary: {summary}\n\
         Category: {category}\n\
         Query text: {query}\n\
         \n\
         TOPICS:\n\
         {topics}\n\
         \n\
         Be strict: prefer precision over recall and set relevant=false when unsure. \
         Do not infer relevance from generic business language; require a direct mention \
         or two strong implicit signals. Scores of 0.85 and above are clearly relevant. \
         Confidence must reflect the evidence. List only topic keys that genuinely match.\n\
         \n\
         Respond with JSON only: {{\"relevant\": bool, \"relevance_score\": 0.0-1.0, \
         \"matching_topics\": [\"topic_key\"], \"reasoning\": \"...\", \"confidence\": 0.0-1.0}}",
        summary = message.summary.as_deref().unwrap_or(""),
        category = message.category.as_deref().unwrap_or(""),
        query = message.body_text,
        topics = topics.join("\n"),
    )
}

/// [`RelevanceJudge`] backed by Gemini.
pub struct GeminiRelevanceJudge {
    client: GeminiClient,
    relevance_threshold: f64,
    confidence_threshold: f64,
}

impl GeminiRelevanceJudge {
    pub fn new(gemini: &GeminiConfig, filter: &FilterConfig) -> Result<Self, PressdeskError> {
        let api_key = crate::resolve_api_key(&gemini.api_key)?;
        let client = GeminiClient::new(
            &api_key,
            &gemini.api_base,
            crate::model_chain(gemini),
            Duration::from_secs(gemini.timeout_secs),
        )?;
        Ok(Self::with_client(client, filter))
    }

    pub fn with_client(client: GeminiClient, filter: &FilterConfig) -> Self {
        Self {
            client,
            relevance_threshold: filter.relevance_threshold,
            confidence_threshold: filter.confidence_threshold,
        }
    }
}

#[async_trait]
impl PluginAdapter for GeminiRelevanceJudge {
    fn name(&self) -> &str {
        "gemini-relevance"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generator
    }

    async fn health_check(&self) -> Result<HealthStatus, PressdeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PressdeskError> {
        Ok(())
    }
}

#[async_trait]
impl RelevanceJudge for GeminiRelevanceJudge {
    async fn judge(&self, message: &RawMessage) -> Result<RelevanceVerdict, PressdeskError> {
        let prompt = relevance_prompt(message);
        let (model, analysis): (String, RelevanceAnalysis) =
            self.client.generate_json(&prompt).await?;
        let relevant = analysis.passes(self.relevance_threshold, self.confidence_threshold);
        info!(
            source_id = %message.source_id,
            model = %model,
            relevant,
            score = analysis.relevance_score,
            confidence = analysis.confidence,
            "relevance judged"
        );
        debug!(reasoning = %analysis.reasoning, topics = ?analysis.matching_topics);
        Ok(RelevanceVerdict {
            relevant,
            reason: format!(
                "score {:.2}, confidence {:.2}, topics [{}]: {}",
                analysis.relevance_score,
                analysis.confidence,
                analysis.matching_topics.join(", "),
                analysis.reasoning
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use pressdesk_core::Provider;

    use super::*;

    fn analysis(relevant: bool, score: f64, confidence: f64, topics: &[&str]) -> RelevanceAnalysis {
        RelevanceAnalysis {
            relevant,
            relevance_score: score,
            matching_topics: topics.iter().map(|s| s.to_string()).collect(),
            reasoning: String::new(),
            confidence,
        }
    }

    #[test]
    fn decision_requires_every_condition() {
        assert!(analysis(true, 0.9, 0.8, &["seo"]).passes(0.85, 0.75));
        assert!(!analysis(false, 0.9, 0.8, &["seo"]).passes(0.85, 0.75));
        assert!(!analysis(true, 0.8, 0.8, &["seo"]).passes(0.85, 0.75));
        assert!(!analysis(true, 0.9, 0.7, &["seo"]).passes(0.85, 0.75));
        assert!(!analysis(true, 0.9, 0.8, &[]).passes(0.85, 0.75));
    }

    #[test]
    fn prompt_includes_query_and_topics() {
        let message = RawMessage {
            source_id: "m::q1".into(),
            mailbox_message_id: "m".into(),
            sender_name: "HARO".into(),
            sender_email: "haro@helpareporter.com".into(),
            reply_to: "q@helpareporter.com".into(),
            subject: "HARO: Chatbots".into(),
            deadline: None,
            requirements: None,
            body_text: "How are small firms using chatbots?".into(),
            thread_id: "t".into(),
            message_id: None,
            received_at: "2026-03-01T00:00:00.000Z".into(),
            provider: Provider::Haro,
            requester_name: None,
            summary: Some("Chatbots for SMBs".into()),
            category: Some("Technology".into()),
            media_outlet: None,
        };
        let prompt = relevance_prompt(&message);
        assert!(prompt.contains("Summary: Chatbots for SMBs"));
        assert!(prompt.contains("Query text: How are small firms using chatbots?"));
        assert!(prompt.contains("(web_development)"));
        assert!(prompt.contains("\"matching_topics\""));
    }
}
