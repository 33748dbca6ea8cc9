// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the store, the triage pipeline and every adapter.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a Request. Derived verbatim from the source message
/// identifier, so it is stable across re-polls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a single draft version. Every version is its own row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DraftId(pub i64);

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a reviewer-facing message, unique across conversations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

impl NotificationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Mailbox,
    Generator,
    ReviewChannel,
    Storage,
}

/// The service that produced an inbound source request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Haro,
    #[strum(to_string = "help_a_b2b_writer")]
    #[serde(rename = "help_a_b2b_writer")]
    HelpAB2BWriter,
    Generic,
}

impl Provider {
    /// Human-readable label used on review cards.
    pub fn label(&self) -> &'static str {
        match self {
            Provider::Haro => "HARO",
            Provider::HelpAB2BWriter => "Help a B2B Writer",
            Provider::Generic => "Email",
        }
    }
}

/// Lifecycle of a Request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    New,
    Drafted,
    Closed,
}

/// Lifecycle of a single draft version.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    PendingReview,
    Approved,
    Rejected,
    EditedPendingResend,
    Sent,
    SendFailed,
}

impl DraftStatus {
    /// Statuses that count towards the one-active-draft-per-request rule.
    pub const ACTIVE: [DraftStatus; 3] = [
        DraftStatus::PendingReview,
        DraftStatus::Approved,
        DraftStatus::SendFailed,
    ];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    /// No further transition is possible from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DraftStatus::Sent | DraftStatus::Rejected | DraftStatus::EditedPendingResend
        )
    }
}

/// A message pulled from the mailbox, already parsed into request fields.
///
/// Digest emails may yield several of these, each with its own `source_id`
/// but sharing one `mailbox_message_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Idempotency key. Becomes the Request id.
    pub source_id: String,
    /// Mailbox-level id used for acknowledgement.
    pub mailbox_message_id: String,
    pub sender_name: String,
    pub sender_email: String,
    pub reply_to: String,
    pub subject: String,
    pub deadline: Option<String>,
    pub requirements: Option<String>,
    pub body_text: String,
    pub thread_id: String,
    /// RFC 5322 `Message-ID` header of the inbound message.
    pub message_id: Option<String>,
    pub received_at: String,
    pub provider: Provider,
    pub requester_name: Option<String>,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub media_outlet: Option<String>,
}

/// A persisted, deduplicated source request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub mailbox_message_id: String,
    pub sender_name: String,
    pub sender_email: String,
    pub reply_to: String,
    pub subject: String,
    pub deadline: Option<String>,
    pub requirements: Option<String>,
    pub body_text: String,
    pub thread_id: String,
    pub message_id: Option<String>,
    pub received_at: String,
    pub provider: Provider,
    pub requester_name: Option<String>,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub media_outlet: Option<String>,
    pub status: RequestStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Request {
    /// Address a reply should go to: the explicit reply-to when present,
    /// otherwise the sender.
    pub fn reply_address(&self) -> &str {
        if self.reply_to.trim().is_empty() {
            &self.sender_email
        } else {
            &self.reply_to
        }
    }
}

/// One version of a reply to a Request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    pub request_id: RequestId,
    pub version: u32,
    pub subject: String,
    pub body: String,
    pub status: DraftStatus,
    pub outbound_message_id: Option<String>,
    pub outbound_thread_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Maps a reviewer-facing message to the draft version it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub draft_id: DraftId,
    pub conversation_id: String,
    pub created_at: String,
}

/// A reviewer that asked to edit a draft and has not yet sent the new text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub conversation_id: String,
    pub draft_id: DraftId,
    pub notification_id: NotificationId,
    pub created_at: String,
    pub expires_at: String,
    /// When the edit was consumed or its draft moved on. A closed edit stays
    /// stored so late text can still be traced to its draft.
    pub closed_at: Option<String>,
}

impl PendingEdit {
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

/// State of the send protocol for one draft version.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    /// A send attempt started and its outcome is not yet recorded.
    InFlight,
    /// The last attempt failed definitively.
    Failed,
    /// The mailbox accepted the message.
    Confirmed,
}

/// Durable record written around every send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryMarker {
    pub draft_id: DraftId,
    pub state: DeliveryState,
    pub attempts: u32,
    pub outbound_message_id: Option<String>,
    pub thread_id: Option<String>,
    pub last_error: Option<String>,
    pub updated_at: String,
}

/// An append-only audit entry describing one state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLogEntry {
    pub request_id: RequestId,
    pub draft_id: Option<DraftId>,
    pub actor: String,
    pub action: String,
    pub old_state: Option<String>,
    pub new_state: Option<String>,
    pub details: Option<String>,
}

impl ActionLogEntry {
    pub fn new(request_id: RequestId, actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            request_id,
            draft_id: None,
            actor: actor.into(),
            action: action.into(),
            old_state: None,
            new_state: None,
            details: None,
        }
    }

    pub fn draft(mut self, draft_id: DraftId) -> Self {
        self.draft_id = Some(draft_id);
        self
    }

    pub fn transition(mut self, old: impl ToString, new: impl ToString) -> Self {
        self.old_state = Some(old.to_string());
        self.new_state = Some(new.to_string());
        self
    }

    /// Set only the resulting state, for entries that create something.
    pub fn created(mut self, state: impl ToString) -> Self {
        self.new_state = Some(state.to_string());
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// A persisted action log row, as read back for status reporting and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLogRecord {
    pub id: i64,
    pub entry: ActionLogEntry,
    pub created_at: String,
}

/// Output of the draft generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDraft {
    pub subject: String,
    pub body: String,
}

/// Verdict from a relevance judge on a parsed request.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceVerdict {
    pub relevant: bool,
    pub reason: String,
}

/// An email to be sent through the mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub thread_id: Option<String>,
    /// `Message-ID` of the message being replied to.
    pub in_reply_to: Option<String>,
}

/// What the mailbox reports after accepting an outbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub outbound_message_id: String,
    pub thread_id: String,
}

/// Returned by the review channel after posting a review card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRef {
    pub id: NotificationId,
    pub conversation_id: String,
}

/// What the reviewer asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Approve,
    Reject,
    EditRequest,
    EditSubmit { subject: String, body: String },
}

impl ActionKind {
    /// Short name used in logs and the action log.
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Approve => "approve",
            ActionKind::Reject => "reject",
            ActionKind::EditRequest => "edit_request",
            ActionKind::EditSubmit { .. } => "edit_submit",
        }
    }
}

/// A reviewer action as received from the review channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundAction {
    pub conversation_id: String,
    /// The review card this action refers to. `None` for free text that is
    /// resolved through the conversation's pending edit.
    pub notification_id: Option<NotificationId>,
    /// Who performed the action (user id or handle).
    pub actor: String,
    pub kind: ActionKind,
}

/// Per-status counts for operator reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub requests: Vec<(RequestStatus, u64)>,
    pub drafts: Vec<(DraftStatus, u64)>,
}
