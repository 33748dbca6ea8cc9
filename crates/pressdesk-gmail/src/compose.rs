// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds threaded RFC 5322 replies for `messages.send`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use lettre::Message;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use pressdesk_core::{OutboundEmail, PressdeskError};

use crate::types::SendRequest;

/// `subject` with a single `Re:` prefix.
pub fn reply_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    if trimmed.to_lowercase().starts_with("re:") {
        trimmed.to_string()
    } else {
        format!("Re: {trimmed}")
    }
}

fn mailbox(value: &str, role: &str) -> Result<Mailbox, PressdeskError> {
    value.trim().parse::<Mailbox>().map_err(|e| PressdeskError::Rejected {
        message: format!("invalid {role} address {value:?}: {e}"),
    })
}

/// Render `email` as a base64url-encoded message sent from `from`.
///
/// Address problems are `Rejected`: retrying the same draft cannot fix them.
pub fn compose_reply(from: &str, email: &OutboundEmail) -> Result<SendRequest, PressdeskError> {
    let mut builder = Message::builder()
        .from(mailbox(from, "sender")?)
        .to(mailbox(&email.to, "recipient")?)
        .subject(reply_subject(&email.subject))
        .header(ContentType::TEXT_PLAIN);
    if let Some(parent) = email.in_reply_to.as_deref().filter(|id| !id.trim().is_empty()) {
        builder = builder
            .in_reply_to(parent.to_string())
            .references(parent.to_string());
    }
    let message = builder
        .body(email.body.clone())
        .map_err(|e| PressdeskError::Rejected {
            message: format!("could not build reply: {e}"),
        })?;

    Ok(SendRequest {
        raw: URL_SAFE.encode(message.formatted()),
        thread_id: email.thread_id.clone().filter(|t| !t.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> OutboundEmail {
        OutboundEmail {
            to: "query-abc@helpareporter.com".into(),
            subject: "HARO: Fintech founders".into(),
            body: "Happy to help with this one.".into(),
            thread_id: Some("t-1".into()),
            in_reply_to: Some("<digest@helpareporter.com>".into()),
        }
    }

    fn decoded(request: &SendRequest) -> String {
        String::from_utf8(URL_SAFE.decode(&request.raw).unwrap()).unwrap()
    }

    #[test]
    fn subject_gets_one_prefix() {
        assert_eq!(reply_subject("Quote request"), "Re: Quote request");
        assert_eq!(reply_subject("RE: Quote request"), "RE: Quote request");
        assert_eq!(reply_subject("  re: x "), "re: x");
    }

    #[test]
    fn reply_is_threaded() {
        let request = compose_reply("me@company.example", &email()).unwrap();
        assert_eq!(request.thread_id.as_deref(), Some("t-1"));
        let raw = decoded(&request);
        assert!(raw.contains("To: query-abc@helpareporter.com"), "{raw}");
        assert!(raw.contains("Subject: Re: HARO: Fintech founders"), "{raw}");
        assert!(raw.contains("In-Reply-To: <digest@helpareporter.com>"), "{raw}");
        assert!(raw.contains("References: <digest@helpareporter.com>"), "{raw}");
        assert!(raw.contains("Happy to help with this one."), "{raw}");
    }

    #[test]
    fn unthreaded_reply_has_no_parent_headers() {
        let mut plain = email();
        plain.thread_id = Some(String::new());
        plain.in_reply_to = None;
        let request = compose_reply("me@company.example", &plain).unwrap();
        assert!(request.thread_id.is_none());
        assert!(!decoded(&request).contains("In-Reply-To"));
    }

    #[test]
    fn bad_recipient_is_rejected() {
        let mut bad = email();
        bad.to = "not an address".into();
        assert!(matches!(
            compose_reply("me@company.example", &bad),
            Err(PressdeskError::Rejected { .. })
        ));
    }
}
