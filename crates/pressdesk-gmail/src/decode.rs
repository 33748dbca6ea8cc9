// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MIME body decoding and header helpers.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::alphabet;
use regex::Regex;

use crate::types::{Header, MessagePart};

/// Gmail emits base64url both with and without padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Text wrapping width for HTML conversion; wide enough to keep lines intact.
const HTML_WIDTH: usize = 1_000;

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("static regex"));

/// Decode one base64url body; invalid UTF-8 is replaced.
pub fn decode_data(data: &str) -> String {
    match URL_SAFE_LENIENT.decode(data.trim()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

/// Concatenated `text/plain` and `text/html` content of a MIME tree.
pub fn collect_bodies(part: &MessagePart) -> (String, String) {
    let mut text = String::new();
    let mut html = String::new();
    walk(part, &mut text, &mut html);
    (text, html)
}

fn walk(part: &MessagePart, text: &mut String, html: &mut String) {
    let data = part
        .body
        .as_ref()
        .and_then(|b| b.data.as_deref())
        .map(decode_data)
        .unwrap_or_default();
    match part.mime_type.as_str() {
        "text/plain" => text.push_str(&data),
        "text/html" => html.push_str(&data),
        _ => {}
    }
    for child in &part.parts {
        walk(child, text, html);
    }
}

/// Convert HTML to plain text with blank-line runs collapsed.
pub fn html_to_text(html: &str) -> String {
    let text = html2text::from_read(html.as_bytes(), HTML_WIDTH).unwrap_or_default();
    normalize_blank_lines(&text)
}

pub fn normalize_blank_lines(text: &str) -> String {
    BLANK_RUNS
        .replace_all(&text.replace("\r\n", "\n"), "\n\n")
        .trim()
        .to_string()
}

/// Plain-text body of a message: `text/plain` when present, else converted HTML.
pub fn body_text(payload: &MessagePart) -> String {
    let (text, html) = collect_bodies(payload);
    if text.trim().is_empty() {
        html_to_text(&html)
    } else {
        normalize_blank_lines(&text)
    }
}

/// First header named `name`, case-insensitively.
pub fn header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Split `"Name <addr@host>"` into display name and address. A bare address is
/// its own display name.
pub fn parse_address(value: &str) -> (String, String) {
    let value = value.trim();
    if let (Some(open), Some(close)) = (value.rfind('<'), value.rfind('>'))
        && open < close
    {
        let address = value[open + 1..close].trim().to_string();
        let name = value[..open].trim().trim_matches('"').trim().to_string();
        let name = if name.is_empty() { address.clone() } else { name };
        return (name, address);
    }
    (value.to_string(), value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PartBody;

    fn part(mime: &str, data: Option<&str>, parts: Vec<MessagePart>) -> MessagePart {
        MessagePart {
            mime_type: mime.to_string(),
            headers: Vec::new(),
            body: data.map(|d| PartBody {
                data: Some(d.to_string()),
            }),
            parts,
        }
    }

    fn encode(s: &str) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(s)
    }

    #[test]
    fn decodes_padded_and_unpadded() {
        assert_eq!(decode_data("SGk"), "Hi");
        assert_eq!(decode_data("SGk="), "Hi");
        assert_eq!(decode_data("!!!"), "");
    }

    #[test]
    fn prefers_plain_text_in_nested_multipart() {
        let tree = part(
            "multipart/mixed",
            None,
            vec![part(
                "multipart/alternative",
                None,
                vec![
                    part("text/plain", Some(&encode("Deadline: Friday\n\n\n\nThanks")), vec![]),
                    part("text/html", Some(&encode("<p>ignored</p>")), vec![]),
                ],
            )],
        );
        assert_eq!(body_text(&tree), "Deadline: Friday\n\nThanks");
    }

    #[test]
    fn falls_back_to_html() {
        let tree = part(
            "text/html",
            Some(&encode("<html><body><p>Need a CFO quote</p></body></html>")),
            vec![],
        );
        assert!(body_text(&tree).contains("Need a CFO quote"));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let headers = vec![Header {
            name: "Message-ID".into(),
            value: "<a@b>".into(),
        }];
        assert_eq!(header(&headers, "message-id"), Some("<a@b>"));
        assert_eq!(header(&headers, "Reply-To"), None);
    }

    #[test]
    fn parses_addresses() {
        assert_eq!(
            parse_address("\"Jo Writer\" <jo@outlet.example>"),
            ("Jo Writer".to_string(), "jo@outlet.example".to_string())
        );
        assert_eq!(
            parse_address("<jo@outlet.example>"),
            ("jo@outlet.example".to_string(), "jo@outlet.example".to_string())
        );
        assert_eq!(
            parse_address("jo@outlet.example"),
            ("jo@outlet.example".to_string(), "jo@outlet.example".to_string())
        );
    }
}
