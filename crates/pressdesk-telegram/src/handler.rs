// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authorization filtering and translation of Telegram updates into
//! reviewer actions.
//!
//! Only updates from the configured review chat are considered. Within that
//! chat, `allowed_users` narrows who may act; an empty list lets any member
//! of the chat act.

use std::sync::LazyLock;

use pressdesk_core::types::{ActionKind, InboundAction};
use regex::Regex;
use teloxide::types::{ChatId, Message, MessageId, User};

use crate::card::{self, parse_callback_data};

static SUBJECT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*Subject\s*:[ \t]*(.+)$").expect("static regex"));
static BODY_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?ims)^\s*Body\s*:\s*(.+)").expect("static regex"));

/// Who may act on review cards.
#[derive(Debug, Clone)]
pub struct ReviewGate {
    pub chat: ChatId,
    pub allowed_users: Vec<String>,
}

impl ReviewGate {
    pub fn new(chat: ChatId, allowed_users: Vec<String>) -> Self {
        Self {
            chat,
            allowed_users,
        }
    }

    /// The update came from the review chat and from a permitted human.
    pub fn allows(&self, chat: ChatId, user: Option<&User>) -> bool {
        chat == self.chat && is_authorized(user, &self.allowed_users)
    }
}

/// Checks whether a user may act.
///
/// Passes when `allowed_users` is empty or when the user's id or username
/// (with or without `@`, case-insensitive) is listed. Bots and updates
/// without a sender never pass.
pub fn is_authorized(user: Option<&User>, allowed_users: &[String]) -> bool {
    let Some(user) = user else {
        return false;
    };
    if user.is_bot {
        return false;
    }
    if allowed_users.is_empty() {
        return true;
    }

    let user_id = user.id.0.to_string();
    allowed_users.iter().any(|allowed| {
        if *allowed == user_id {
            return true;
        }
        let allowed_clean = allowed.strip_prefix('@').unwrap_or(allowed);
        user.username
            .as_deref()
            .is_some_and(|username| username.eq_ignore_ascii_case(allowed_clean))
    })
}

/// Recorded as the acting reviewer: `@username` when set, the numeric id otherwise.
pub fn actor(user: &User) -> String {
    match &user.username {
        Some(username) => format!("@{username}"),
        None => user.id.0.to_string(),
    }
}

/// Translate a button press on the card `(chat, message)`.
pub fn action_from_button(
    chat: ChatId,
    message: MessageId,
    user: &User,
    data: &str,
) -> Option<InboundAction> {
    let press = parse_callback_data(data)?;
    Some(InboundAction {
        conversation_id: chat.0.to_string(),
        notification_id: Some(card::notification_id(chat, message)),
        actor: actor(user),
        kind: press.kind.action(),
    })
}

/// What a text message in the review chat amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditText {
    /// Both sections present.
    Complete { subject: String, body: String },
    /// Looks like an edit but one section is missing or empty.
    Incomplete,
    /// Ordinary conversation.
    Chatter,
}

pub fn parse_edit_text(text: &str) -> EditText {
    let subject = SUBJECT_LINE
        .captures(text)
        .map(|c| c[1].trim().to_string());
    let body = BODY_SECTION.captures(text).map(|c| c[1].trim().to_string());
    match (subject, body) {
        (None, None) => EditText::Chatter,
        (Some(subject), Some(body)) if !subject.is_empty() && !body.is_empty() => {
            EditText::Complete { subject, body }
        }
        _ => EditText::Incomplete,
    }
}

/// Translate edited text. A reply to a review card targets that card;
/// anything else is resolved through the conversation's open edit.
pub fn action_from_edit(msg: &Message, subject: String, body: String) -> Option<InboundAction> {
    let user = msg.from.as_ref()?;
    Some(InboundAction {
        conversation_id: msg.chat.id.0.to_string(),
        notification_id: msg
            .reply_to_message()
            .map(|card| card::notification_id(card.chat.id, card.id)),
        actor: actor(user),
        kind: ActionKind::EditSubmit { subject, body },
    })
}
