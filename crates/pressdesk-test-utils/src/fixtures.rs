// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for test messages and reviewer actions.

use pressdesk_core::clock;
use pressdesk_core::types::{
    ActionKind, InboundAction, NotificationId, Provider, RawMessage, Request, RequestId,
    RequestStatus,
};

use crate::mock_review::REVIEW_CONVERSATION;

/// A generic inbound request whose source id and mailbox id are both `source_id`.
pub fn raw_message(source_id: &str) -> RawMessage {
    RawMessage {
        source_id: source_id.to_string(),
        mailbox_message_id: source_id.to_string(),
        sender_name: "Jordan Writer".to_string(),
        sender_email: "jordan@outlet.example".to_string(),
        reply_to: String::new(),
        subject: format!("Looking for fintech founders ({source_id})"),
        deadline: Some("Friday 5pm ET".to_string()),
        requirements: Some("Founders of seed-stage fintech startups".to_string()),
        body_text: "Share one lesson from your first fundraise.".to_string(),
        thread_id: format!("thread-{source_id}"),
        message_id: Some(format!("<{source_id}@mail.example>")),
        received_at: clock::now(),
        provider: Provider::Generic,
        requester_name: Some("Jordan".to_string()),
        summary: None,
        category: None,
        media_outlet: Some("Outlet Weekly".to_string()),
    }
}

/// One item of a HARO digest: source id `<mailbox_id>::q<n>`.
pub fn haro_item(mailbox_id: &str, n: u32) -> RawMessage {
    RawMessage {
        source_id: format!("{mailbox_id}::q{n}"),
        mailbox_message_id: mailbox_id.to_string(),
        reply_to: format!("query-{n}@helpareporter.example"),
        provider: Provider::Haro,
        category: Some("Business and Finance".to_string()),
        ..raw_message(mailbox_id)
    }
}

/// The request a store would create for `raw`, in status `new`.
pub fn request_from(raw: &RawMessage) -> Request {
    let now = clock::now();
    Request {
        id: RequestId(raw.source_id.clone()),
        mailbox_message_id: raw.mailbox_message_id.clone(),
        sender_name: raw.sender_name.clone(),
        sender_email: raw.sender_email.clone(),
        reply_to: raw.reply_to.clone(),
        subject: raw.subject.clone(),
        deadline: raw.deadline.clone(),
        requirements: raw.requirements.clone(),
        body_text: raw.body_text.clone(),
        thread_id: raw.thread_id.clone(),
        message_id: raw.message_id.clone(),
        received_at: raw.received_at.clone(),
        provider: raw.provider,
        requester_name: raw.requester_name.clone(),
        summary: raw.summary.clone(),
        category: raw.category.clone(),
        media_outlet: raw.media_outlet.clone(),
        status: RequestStatus::New,
        created_at: now.clone(),
        updated_at: now,
    }
}

/// A reviewer action pressed on review card `card`.
pub fn action_on(card: &NotificationId, kind: ActionKind) -> InboundAction {
    InboundAction {
        conversation_id: REVIEW_CONVERSATION.to_string(),
        notification_id: Some(card.clone()),
        actor: "editor".to_string(),
        kind,
    }
}

/// Edited text sent as a plain message, not as a reply to a card.
pub fn edit_text(subject: &str, body: &str) -> InboundAction {
    InboundAction {
        conversation_id: REVIEW_CONVERSATION.to_string(),
        notification_id: None,
        actor: "editor".to_string(),
        kind: ActionKind::EditSubmit {
            subject: subject.to_string(),
            body: body.to_string(),
        },
    }
}
