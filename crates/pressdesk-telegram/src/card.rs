// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Review card layout and the callback data carried by its buttons.
//!
//! A card shows the request context followed by the proposed reply. Its
//! inline keyboard offers Approve, Edit and Reject; each button's callback
//! data names the action, the draft id and the draft version, e.g.
//! `approve:17:2`.

use pressdesk_core::types::{ActionKind, Draft, DraftId, NotificationId, Request};
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId};

/// Reserved at the end of an oversized card for the truncation marker.
const TRUNCATION_MARGIN: usize = 100;
const TRUNCATION_MARKER: &str = "\n\n…[truncated]";

/// Render the review card text for one draft version.
pub fn card_text(request: &Request, draft: &Draft, max_chars: usize) -> String {
    let mut header = format!(
        "Source request (draft v{})\nProvider: {}\n",
        draft.version,
        request.provider.label()
    );
    let optional = [
        ("Name", request.requester_name.as_deref()),
        ("Category", request.category.as_deref()),
        ("Media Outlet", request.media_outlet.as_deref()),
    ];
    for (label, value) in optional {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            header.push_str(&format!("{label}: {value}\n"));
        }
    }
    header.push_str(&format!(
        "From: {} <{}>\nReply-to: {}\nDeadline: {}\n",
        request.sender_name,
        request.sender_email,
        request.reply_address(),
        request.deadline.as_deref().unwrap_or("n/a"),
    ));

    let text = format!(
        "{header}\nQuery:\n{}\n\nProposed Subject:\n{}\n\nProposed Body:\n{}",
        request.body_text.trim(),
        draft.subject,
        draft.body
    );
    truncate(text, max_chars)
}

fn truncate(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }
    let keep = max_chars.saturating_sub(TRUNCATION_MARGIN);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// A button press decoded from callback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonPress {
    pub kind: ButtonKind,
    pub draft_id: DraftId,
    pub version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    Approve,
    Edit,
    Reject,
}

impl ButtonKind {
    fn tag(self) -> &'static str {
        match self {
            ButtonKind::Approve => "approve",
            ButtonKind::Edit => "edit",
            ButtonKind::Reject => "reject",
        }
    }

    pub fn action(self) -> ActionKind {
        match self {
            ButtonKind::Approve => ActionKind::Approve,
            ButtonKind::Edit => ActionKind::EditRequest,
            ButtonKind::Reject => ActionKind::Reject,
        }
    }
}

pub fn callback_data(kind: ButtonKind, draft: &Draft) -> String {
    format!("{}:{}:{}", kind.tag(), draft.id.0, draft.version)
}

/// Decode `<action>:<draft_id>:<version>`. Anything else is `None`.
pub fn parse_callback_data(data: &str) -> Option<ButtonPress> {
    let mut parts = data.split(':');
    let kind = match parts.next()? {
        "approve" => ButtonKind::Approve,
        "edit" => ButtonKind::Edit,
        "reject" => ButtonKind::Reject,
        _ => return None,
    };
    let draft_id = parts.next()?.parse::<i64>().ok()?;
    let version = parts.next()?.parse::<u32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(ButtonPress {
        kind,
        draft_id: DraftId(draft_id),
        version,
    })
}

pub fn review_keyboard(draft: &Draft) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "Approve & Send",
            callback_data(ButtonKind::Approve, draft),
        )],
        vec![InlineKeyboardButton::callback(
            "Edit Draft",
            callback_data(ButtonKind::Edit, draft),
        )],
        vec![InlineKeyboardButton::callback(
            "Reject",
            callback_data(ButtonKind::Reject, draft),
        )],
    ])
}

/// Cards are identified by `<chat id>:<message id>`.
pub fn notification_id(chat: ChatId, message: MessageId) -> NotificationId {
    NotificationId(format!("{}:{}", chat.0, message.0))
}
