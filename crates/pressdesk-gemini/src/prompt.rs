// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt templates with `{{placeholder}}` interpolation.

use pressdesk_core::Request;
use tracing::{info, warn};

/// Built-in drafting prompt, used when no template file is configured.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/draft_prompt.md");

/// Loads the drafting template: the configured file if readable and
/// non-empty, otherwise the built-in one.
pub async fn load_template(path: Option<&str>) -> String {
    if let Some(path) = path {
        match tokio::fs::read_to_string(path).await {
            Ok(content) if !content.trim().is_empty() => {
                info!(path, "loaded prompt template from file");
                return content;
            }
            Ok(_) => warn!(path, "prompt template file is empty, using built-in template"),
            Err(e) => warn!(
                path,
                error = %e,
                "failed to read prompt template file, using built-in template"
            ),
        }
    }
    DEFAULT_TEMPLATE.to_string()
}

/// Replace every `{{key}}` with its value. Unknown placeholders are left as is.
pub fn interpolate(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in variables {
        result = result.replace(&format!("{{{{{key}}}}}"), value);
    }
    result
}

/// Render the drafting prompt for one request.
pub fn render_for(template: &str, request: &Request) -> String {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    let requester = opt(&request.requester_name);
    let outlet = opt(&request.media_outlet);
    let category = opt(&request.category);
    let deadline = opt(&request.deadline);
    let requirements = opt(&request.requirements);
    interpolate(
        template,
        &[
            ("provider", request.provider.label()),
            ("subject", request.subject.as_str()),
            ("requester", requester.as_str()),
            ("outlet", outlet.as_str()),
            ("category", category.as_str()),
            ("sender", request.sender_name.as_str()),
            ("sender_email", request.sender_email.as_str()),
            ("deadline", deadline.as_str()),
            ("requirements", requirements.as_str()),
            ("query_text", request.body_text.as_str()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use pressdesk_core::{Provider, RequestId, RequestStatus};

    use super::*;

    fn request() -> Request {
        Request {
            id: RequestId("m1".into()),
            mailbox_message_id: "m1".into(),
            sender_name: "Jo Editor".into(),
            sender_email: "jo@outlet.example".into(),
            reply_to: String::new(),
            subject: "Remote hiring".into(),
            deadline: Some("Friday".into()),
            requirements: None,
            body_text: "How do you hire remotely?".into(),
            thread_id: "t1".into(),
            message_id: None,
            received_at: "2026-03-01T00:00:00.000Z".into(),
            provider: Provider::Generic,
            requester_name: None,
            summary: None,
            category: None,
            media_outlet: Some("Work Weekly".into()),
            status: RequestStatus::New,
            created_at: "2026-03-01T00:00:00.000Z".into(),
            updated_at: "2026-03-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn interpolates_known_keys_only() {
        let out = interpolate("{{a}} and {{b}} and {{c}}", &[("a", "1"), ("b", "")]);
        assert_eq!(out, "1 and  and {{c}}");
    }

    #[test]
    fn default_template_renders_request_fields() {
        let prompt = render_for(DEFAULT_TEMPLATE, &request());
        assert!(prompt.contains("Request subject: Remote hiring"));
        assert!(prompt.contains("Jo Editor <jo@outlet.example>"));
        assert!(prompt.contains("Deadline (if any): Friday"));
        assert!(prompt.contains("Outlet: Work Weekly"));
        assert!(prompt.contains("How do you hire remotely?"));
        assert!(!prompt.contains("{{"));
    }

    #[tokio::test]
    async fn template_file_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        std::fs::write(&path, "Answer {{subject}}").unwrap();
        let template = load_template(path.to_str()).await;
        assert_eq!(render_for(&template, &request()), "Answer Remote hiring");
    }

    #[tokio::test]
    async fn missing_template_file_falls_back() {
        let template = load_template(Some("/nonexistent/prompt.md")).await;
        assert_eq!(template, DEFAULT_TEMPLATE);
    }
}
