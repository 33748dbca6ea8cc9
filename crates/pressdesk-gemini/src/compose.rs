// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns raw model output into a sendable reply.
//!
//! The model is asked for `{"subject", "body"}` JSON without salutation or
//! signature, but does not always comply. The body is normalised here: any
//! greeting and sign-off the model added are removed, markdown is flattened,
//! the text is capped at two paragraphs, and the greeting, closing and
//! signature are attached.

use std::sync::LazyLock;

use pressdesk_config::model::ReplyConfig;
use pressdesk_core::GeneratedDraft;
use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::Deserialize;

use crate::client::strip_code_fence;

static LEADING_GREETING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:hi|hello|hey|dear|greetings)\b[^\n]*\n+").expect("static regex")
});
static SIGNOFF_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:best regards|kind regards|warm regards|regards|sincerely|cheers|best|thanks|thank you)\b[^a-z]*$")
        .expect("static regex")
});
static CONTACT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@|\+\d").expect("static regex"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").expect("static regex"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\n]+?)\*").expect("static regex"));
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:[-*•]|\d+\.)[ \t]+").expect("static regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+").expect("static regex"));
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n\s*").expect("static regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// How many trailing lines are searched for a sign-off or contact block.
const SIGNATURE_WINDOW: usize = 6;

#[derive(Debug, Deserialize)]
struct DraftJson {
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

/// Read the model's answer as `{"subject", "body"}` JSON, optionally fenced.
/// Anything else is taken as the body under `fallback_subject`.
pub fn parse_model_output(text: &str, fallback_subject: &str) -> GeneratedDraft {
    let parsed = serde_json::from_str::<DraftJson>(strip_code_fence(text)).ok();
    let subject = parsed
        .as_ref()
        .and_then(|d| d.subject.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback_subject)
        .to_string();
    let body = parsed
        .and_then(|d| d.body)
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| text.trim().to_string());
    GeneratedDraft { subject, body }
}

pub fn strip_greeting(text: &str) -> String {
    let mut t = text.trim_start();
    for _ in 0..2 {
        match LEADING_GREETING.find(t) {
            Some(m) => t = t[m.end()..].trim_start(),
            None => break,
        }
    }
    t.to_string()
}

/// Remove a trailing sign-off and any contact block after or instead of it.
pub fn strip_signoff(text: &str) -> String {
    let mut lines: Vec<&str> = text.trim_end().lines().collect();
    let window_start = lines.len().saturating_sub(SIGNATURE_WINDOW);

    if let Some(pos) = (window_start..lines.len())
        .rev()
        .find(|&i| lines[i].trim().len() <= 30 && SIGNOFF_LINE.is_match(lines[i]))
    {
        lines.truncate(pos);
    }

    let window_start = lines.len().saturating_sub(SIGNATURE_WINDOW - 1);
    if let Some(pos) = (window_start..lines.len()).find(|&i| CONTACT_LINE.is_match(lines[i])) {
        lines.truncate(pos);
    }
    lines.join("\n").trim_end().to_string()
}

pub fn strip_markdown(text: &str) -> String {
    let t = BOLD.replace_all(text, "$1$2");
    let t = ITALIC.replace_all(&t, "$1");
    let t = LIST_MARKER.replace_all(&t, "");
    let t = HEADING.replace_all(&t, "");
    t.trim().to_string()
}

/// Keep the first paragraph and fold everything after it into a second one.
pub fn limit_paragraphs(text: &str) -> String {
    let paragraphs: Vec<&str> = PARAGRAPH_BREAK
        .split(text.trim())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    match paragraphs.as_slice() {
        [] => String::new(),
        [one] => one.to_string(),
        [first, rest @ ..] => {
            let merged = WHITESPACE.replace_all(&rest.join(" "), " ").trim().to_string();
            format!("{first}\n\n{merged}")
        }
    }
}

/// Salutation, addressed by first name when the requester is known.
pub fn greeting<R: Rng + ?Sized>(requester: Option<&str>, rng: &mut R) -> String {
    let options = match requester.and_then(|name| name.split_whitespace().next()) {
        Some(first) => vec![format!("Hello {first}!"), format!("Hi {first},")],
        None => vec!["Hello!".to_string(), "Hi there!".to_string()],
    };
    options
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| "Hello!".to_string())
}

/// Build the final reply body from what the model wrote.
pub fn compose_body<R: Rng + ?Sized>(
    model_body: &str,
    requester: Option<&str>,
    reply: &ReplyConfig,
    rng: &mut R,
) -> String {
    let body = strip_greeting(model_body);
    let body = strip_signoff(&body);
    let body = strip_markdown(&body);
    let body = limit_paragraphs(&body);

    let mut out = format!("{}\n\n{}", greeting(requester, rng), body);
    let closing = reply.closing.trim();
    if !closing.is_empty() {
        out.push_str("\n\n");
        out.push_str(closing);
    }
    let signature = reply.signature.trim();
    if !signature.is_empty() {
        out.push('\n');
        out.push_str(signature);
    }
    out
}
