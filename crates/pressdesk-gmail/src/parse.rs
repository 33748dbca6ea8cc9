// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns fetched Gmail messages into [`RawMessage`]s.
//!
//! Three formats are recognised. A HARO digest yields one request per query
//! item, keyed `"<gmail-id>::q<n>"` and addressed to the per-query reply
//! address. A Help a B2B Writer notification yields a single request for the
//! writer's brief. Anything else is taken whole, with `Deadline:` and
//! `Requirements:` lines lifted out when present.

use std::sync::LazyLock;

use chrono::{DateTime, TimeZone, Utc};
use pressdesk_core::clock;
use pressdesk_core::{Provider, RawMessage};
use regex::Regex;
use tracing::debug;

use crate::decode::{body_text, header, normalize_blank_lines, parse_address};
use crate::filter::KeywordFilter;
use crate::types::GmailMessage;

static ZERO_WIDTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\u{200B}-\u{200D}\u{FEFF}]").expect("static regex"));
static LONG_HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9A-Fa-f]{40,}\b").expect("static regex"));
static LONG_BASE64: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z0-9+/=]{60,}\b").expect("static regex"));

static HARO_ITEM_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\d+\)[ \t]*Summary:").expect("static regex"));
static HARO_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?is)^\s*(?P<idx>\d+)\)\s*Summary:\s*(?P<summary>.*?)\n+",
        r"Name:\s*(?P<name>.*?)\n+",
        r"Category:\s*(?P<category>.*?)\n+",
        r"Email:\s*(?P<email>.*?)\n+",
        r"(?:Muck Rack URL:.*?\n+)?",
        r"Media Outlet:\s*(?P<media>.*?)\n+",
        r"Deadline:\s*(?P<deadline>.*?)\n+",
        r"Query:\s*\n+(?P<query>.*?)(?:\n+\s*Back to Top.*)?\s*\z",
    ))
    .expect("static regex")
});
static HARO_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*\d+\)[ \t]*Summary:[ \t]*(.+)$").expect("static regex")
});
static HARO_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Query\s*:\s*\n+(.*?)(?:\n+\s*Back to Top.*)?\s*\z").expect("static regex")
});

static B2B_REQUEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Writer's Request:\s*(.+?)(?:\n\nDeadline:|\z)").expect("static regex")
});
static B2B_REPLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)email the writer\s*:\s*(\S+@helpab2bwriter\.com)").expect("static regex")
});

static DEADLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*deadline\s*:\s*(.+)$").expect("static regex"));
static REQUIREMENTS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(?im)^\s*requirements?\s*:\s*(.+)$").expect("static regex"),
        Regex::new(r"(?im)^\s*what we need\s*:\s*(.+)$").expect("static regex"),
    ]
});

/// Header fields shared by every request parsed from one message.
#[derive(Debug, Clone)]
struct Envelope {
    mailbox_id: String,
    thread_id: String,
    subject: String,
    sender_name: String,
    sender_email: String,
    reply_to: String,
    message_id: Option<String>,
    received_at: String,
    body: String,
}

/// One query of a HARO digest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HaroItem {
    pub summary: String,
    pub name: String,
    pub category: String,
    pub email: String,
    pub media_outlet: String,
    pub deadline: String,
    pub query: String,
}

impl HaroItem {
    /// Text the keyword filter looks at.
    fn filter_blob(&self) -> String {
        [
            self.summary.as_str(),
            self.category.as_str(),
            self.media_outlet.as_str(),
            self.query.as_str(),
        ]
        .join(" ")
    }
}

/// Which service produced a message.
pub fn detect_provider(subject: &str, from: &str, list_id: &str, body: &str) -> Provider {
    let subject = subject.to_lowercase();
    if from.to_lowercase().contains("helpareporter.com")
        || subject.contains("haro")
        || list_id.to_lowercase().contains("helpareporter")
    {
        return Provider::Haro;
    }
    let body = body.to_lowercase();
    if body.contains("helpab2bwriter.com")
        || body.contains("help a b2b writer")
        || subject.contains("help a b2b writer")
    {
        return Provider::HelpAB2BWriter;
    }
    Provider::Generic
}

fn strip_noise(text: &str) -> String {
    let text = ZERO_WIDTH.replace_all(text, "");
    let text = LONG_HEX.replace_all(&text, "");
    let text = LONG_BASE64.replace_all(&text, "");
    normalize_blank_lines(&text)
}

fn labeled_line(text: &str, label: &str) -> Option<String> {
    let pattern = format!(r"(?im)^\s*{}\s*:\s*(.+)$", regex::escape(label));
    let re = Regex::new(&pattern).ok()?;
    re.captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Split a HARO digest body into its query items.
pub fn parse_haro_items(body: &str) -> Vec<HaroItem> {
    let text = normalize_blank_lines(&ZERO_WIDTH.replace_all(body, ""));
    let starts: Vec<usize> = HARO_ITEM_START.find_iter(&text).map(|m| m.start()).collect();

    let mut items = Vec::new();
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        let block = &text[start..end];

        let item = match HARO_ITEM.captures(block) {
            Some(c) => HaroItem {
                summary: c["summary"].trim().to_string(),
                name: c["name"].trim().to_string(),
                category: c["category"].trim().to_string(),
                email: c["email"].trim().to_string(),
                media_outlet: c["media"].trim().to_string(),
                deadline: c["deadline"].trim().to_string(),
                query: strip_noise(&c["query"]),
            },
            None => {
                // Fields out of order or missing: pick them out one by one,
                // but only keep items that still have a query.
                let Some(query) = HARO_QUERY.captures(block).map(|c| strip_noise(&c[1])) else {
                    continue;
                };
                if query.is_empty() {
                    continue;
                }
                let field = |label: &str| labeled_line(block, label).unwrap_or_default();
                HaroItem {
                    summary: HARO_SUMMARY
                        .captures(block)
                        .map(|c| c[1].trim().to_string())
                        .unwrap_or_default(),
                    name: field("Name"),
                    category: field("Category"),
                    email: field("Email"),
                    media_outlet: field("Media Outlet"),
                    deadline: field("Deadline"),
                    query,
                }
            }
        };
        items.push(item);
    }
    items
}

/// Fields of a Help a B2B Writer notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct B2bBrief {
    pub title: Option<String>,
    pub writer: Option<String>,
    pub publication: Option<String>,
    pub industries: Option<String>,
    pub deadline: Option<String>,
    pub request: String,
    pub reply_email: Option<String>,
}

pub fn parse_b2b_brief(body: &str) -> B2bBrief {
    let request = B2B_REQUEST
        .captures(body)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| body.trim().to_string());
    B2bBrief {
        title: labeled_line(body, "Title"),
        writer: labeled_line(body, "Writer"),
        publication: labeled_line(body, "Publication"),
        industries: labeled_line(body, "Industries"),
        deadline: labeled_line(body, "Deadline"),
        request,
        reply_email: B2B_REPLY.captures(body).map(|c| c[1].trim().to_string()),
    }
}

fn received_at(date: Option<&str>, internal_date: Option<&str>) -> String {
    if let Some(parsed) = date.and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok()) {
        return clock::format_timestamp(parsed.with_timezone(&Utc));
    }
    internal_date
        .and_then(|ms| ms.parse::<i64>().ok())
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(clock::format_timestamp)
        .unwrap_or_else(clock::now)
}

fn envelope(msg: &GmailMessage) -> Envelope {
    let headers = &msg.payload.headers;
    let from = header(headers, "From").unwrap_or_default();
    let (sender_name, sender_email) = parse_address(from);
    let reply_to = header(headers, "Reply-To")
        .map(|v| parse_address(v).1)
        .unwrap_or_default();
    Envelope {
        mailbox_id: msg.id.clone(),
        thread_id: msg.thread_id.clone(),
        subject: header(headers, "Subject")
            .and_then(non_empty)
            .unwrap_or_else(|| "(no subject)".to_string()),
        sender_name,
        sender_email,
        reply_to,
        message_id: header(headers, "Message-ID").and_then(non_empty),
        received_at: received_at(header(headers, "Date"), msg.internal_date.as_deref()),
        body: body_text(&msg.payload),
    }
}

impl Envelope {
    fn raw(&self, source_id: String, provider: Provider) -> RawMessage {
        RawMessage {
            source_id,
            mailbox_message_id: self.mailbox_id.clone(),
            sender_name: self.sender_name.clone(),
            sender_email: self.sender_email.clone(),
            reply_to: self.reply_to.clone(),
            subject: self.subject.clone(),
            deadline: None,
            requirements: None,
            body_text: self.body.clone(),
            thread_id: self.thread_id.clone(),
            message_id: self.message_id.clone(),
            received_at: self.received_at.clone(),
            provider,
            requester_name: None,
            summary: None,
            category: None,
            media_outlet: None,
        }
    }
}

/// Parse one fetched message. HARO items rejected by `filter` are dropped;
/// a digest with no surviving items yields nothing.
pub fn parse_message(msg: &GmailMessage, filter: &KeywordFilter) -> Vec<RawMessage> {
    let env = envelope(msg);
    let headers = &msg.payload.headers;
    let provider = detect_provider(
        &env.subject,
        header(headers, "From").unwrap_or_default(),
        header(headers, "List-Id").unwrap_or_default(),
        &env.body,
    );

    match provider {
        Provider::Haro => {
            let items = parse_haro_items(&env.body);
            let total = items.len();
            let requests: Vec<RawMessage> = items
                .into_iter()
                .enumerate()
                .filter(|(_, item)| filter.accepts(&item.filter_blob()))
                .map(|(i, item)| {
                    let mut raw = env.raw(format!("{}::q{}", env.mailbox_id, i + 1), Provider::Haro);
                    raw.subject = format!(
                        "HARO: {}",
                        non_empty(&item.summary).unwrap_or_else(|| env.subject.clone())
                    );
                    if let Some(email) = non_empty(&item.email) {
                        raw.reply_to = email;
                    }
                    raw.deadline = non_empty(&item.deadline).or_else(|| {
                        DEADLINE.captures(&env.body).map(|c| c[1].trim().to_string())
                    });
                    if let Some(query) = non_empty(&item.query) {
                        raw.body_text = query;
                    }
                    raw.requester_name = non_empty(&item.name);
                    raw.summary = non_empty(&item.summary);
                    raw.category = non_empty(&item.category);
                    raw.media_outlet = non_empty(&item.media_outlet);
                    raw
                })
                .collect();
            debug!(
                message_id = %env.mailbox_id,
                items = total,
                kept = requests.len(),
                "parsed HARO digest"
            );
            requests
        }
        Provider::HelpAB2BWriter => {
            let brief = parse_b2b_brief(&env.body);
            let mut raw = env.raw(env.mailbox_id.clone(), Provider::HelpAB2BWriter);
            raw.subject = format!(
                "Help A B2B Writer: {}",
                brief.title.clone().unwrap_or_else(|| env.subject.clone())
            );
            if let Some(email) = brief.reply_email {
                raw.reply_to = email;
            }
            raw.deadline = brief.deadline;
            if !brief.request.is_empty() {
                raw.body_text = brief.request;
            }
            raw.requester_name = brief.writer;
            raw.summary = brief.title;
            raw.category = brief.industries;
            raw.media_outlet = brief.publication;
            vec![raw]
        }
        Provider::Generic => {
            let mut raw = env.raw(env.mailbox_id.clone(), Provider::Generic);
            raw.deadline = DEADLINE.captures(&env.body).map(|c| c[1].trim().to_string());
            raw.requirements = REQUIREMENTS
                .iter()
                .find_map(|re| re.captures(&env.body).map(|c| c[1].trim().to_string()));
            vec![raw]
        }
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;
    use crate::types::{Header, MessagePart, PartBody};

    const DIGEST: &str = "\
Today's queries\n\
\n\
1) Summary: Fintech founders on cash flow\n\
Name: Dana Reporter\n\
Category: Business and Finance\n\
Email: query-abc@helpareporter.com\n\
Muck Rack URL: muckrack.com/dana\n\
Media Outlet: Money Weekly\n\
Deadline: 5:00 PM EST - 3 March\n\
\n\
Query:\n\
\n\
Looking for founders who fixed\u{200B} cash flow problems.\n\
\n\
Back to Top\n\
\n\
2) Summary: Dog grooming tips\n\
Name: Lee Writer\n\
Category: Lifestyle and Fitness\n\
Email: query-def@helpareporter.com\n\
Media Outlet: Pet Life\n\
Deadline: 7:00 PM EST - 4 March\n\
\n\
Query:\n\
\n\
What is your best grooming tip?\n";

    fn message(id: &str, headers: &[(&str, &str)], body: &str) -> GmailMessage {
        GmailMessage {
            id: id.to_string(),
            thread_id: format!("t-{id}"),
            internal_date: Some("1767225600000".to_string()),
            payload: MessagePart {
                mime_type: "text/plain".to_string(),
                headers: headers
                    .iter()
                    .map(|(n, v)| Header {
                        name: n.to_string(),
                        value: v.to_string(),
                    })
                    .collect(),
                body: Some(PartBody {
                    data: Some(URL_SAFE_NO_PAD.encode(body)),
                }),
                parts: Vec::new(),
            },
        }
    }

    #[test]
    fn detects_providers() {
        assert_eq!(
            detect_provider("Today", "HARO <haro@helpareporter.com>", "", ""),
            Provider::Haro
        );
        assert_eq!(detect_provider("[HARO] Wednesday", "", "", ""), Provider::Haro);
        assert_eq!(
            detect_provider("New request", "x@y", "", "Sent via helpab2bwriter.com"),
            Provider::HelpAB2BWriter
        );
        assert_eq!(detect_provider("Hello", "x@y", "", "hi"), Provider::Generic);
    }

    #[test]
    fn splits_digest_into_items() {
        let items = parse_haro_items(DIGEST);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].summary, "Fintech founders on cash flow");
        assert_eq!(items[0].email, "query-abc@helpareporter.com");
        assert_eq!(items[0].media_outlet, "Money Weekly");
        assert_eq!(items[0].query, "Looking for founders who fixed cash flow problems.");
        assert_eq!(items[1].name, "Lee Writer");
        assert_eq!(items[1].query, "What is your best grooming tip?");
    }

    #[test]
    fn digest_items_become_separate_requests() {
        let msg = message(
            "18c",
            &[
                ("From", "HARO <haro@helpareporter.com>"),
                ("Subject", "[HARO] Monday"),
                ("Message-ID", "<digest@helpareporter.com>"),
                ("Date", "Mon, 2 Mar 2026 10:00:00 +0000"),
            ],
            DIGEST,
        );
        let requests = parse_message(&msg, &KeywordFilter::default());
        assert_eq!(requests.len(), 2);
        let first = &requests[0];
        assert_eq!(first.source_id, "18c::q1");
        assert_eq!(first.mailbox_message_id, "18c");
        assert_eq!(first.subject, "HARO: Fintech founders on cash flow");
        assert_eq!(first.reply_to, "query-abc@helpareporter.com");
        assert_eq!(first.requester_name.as_deref(), Some("Dana Reporter"));
        assert_eq!(first.deadline.as_deref(), Some("5:00 PM EST - 3 March"));
        assert_eq!(first.received_at, "2026-03-02T10:00:00.000Z");
        assert_eq!(requests[1].source_id, "18c::q2");
    }

    #[test]
    fn keyword_filter_keeps_item_numbering() {
        let msg = message("18c", &[("Subject", "[HARO] Monday")], DIGEST);
        let filter = KeywordFilter::new(&["grooming".to_string()], &[]);
        let requests = parse_message(&msg, &filter);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].source_id, "18c::q2");
    }

    #[test]
    fn b2b_brief_is_one_request() {
        let body = "\
A new request from Help a B2B Writer\n\
Title: Scaling customer success teams\n\
Writer: Sam Author\n\
Publication: SaaS Monthly\n\
Industries: Software, SaaS\n\
Writer's Request: How did you scale CS past 20 people?\n\
\n\
Deadline: March 9\n\
To respond, email the writer: reply-77@helpab2bwriter.com\n";
        let msg = message("b2b1", &[("From", "HB2BW <no-reply@helpab2bwriter.com>")], body);
        let requests = parse_message(&msg, &KeywordFilter::default());
        assert_eq!(requests.len(), 1);
        let raw = &requests[0];
        assert_eq!(raw.provider, Provider::HelpAB2BWriter);
        assert_eq!(raw.source_id, "b2b1");
        assert_eq!(raw.subject, "Help A B2B Writer: Scaling customer success teams");
        assert_eq!(raw.reply_to, "reply-77@helpab2bwriter.com");
        assert_eq!(raw.body_text, "How did you scale CS past 20 people?");
        assert_eq!(raw.deadline.as_deref(), Some("March 9"));
        assert_eq!(raw.media_outlet.as_deref(), Some("SaaS Monthly"));
        assert_eq!(raw.requester_name.as_deref(), Some("Sam Author"));
    }

    #[test]
    fn generic_message_extracts_deadline_and_requirements() {
        let body = "Hi,\nWe're writing about remote work.\nDeadline: Friday noon\nWhat we need: two sentences and a headshot\n";
        let msg = message(
            "g1",
            &[
                ("From", "\"Jo Editor\" <jo@outlet.example>"),
                ("Reply-To", "desk@outlet.example"),
                ("Subject", "Quote request"),
            ],
            body,
        );
        let requests = parse_message(&msg, &KeywordFilter::default());
        assert_eq!(requests.len(), 1);
        let raw = &requests[0];
        assert_eq!(raw.provider, Provider::Generic);
        assert_eq!(raw.sender_name, "Jo Editor");
        assert_eq!(raw.sender_email, "jo@outlet.example");
        assert_eq!(raw.reply_to, "desk@outlet.example");
        assert_eq!(raw.deadline.as_deref(), Some("Friday noon"));
        assert_eq!(raw.requirements.as_deref(), Some("two sentences and a headshot"));
        assert_eq!(raw.thread_id, "t-g1");
        // No Date header: falls back to the internal date.
        assert_eq!(raw.received_at, "2026-01-01T00:00:00.000Z");
    }

    #[test]
    fn noise_runs_are_removed_from_queries() {
        let hex = "a".repeat(48);
        let cleaned = strip_noise(&format!("Real question {hex}\u{FEFF} here"));
        assert_eq!(cleaned, "Real question  here");
    }
}
