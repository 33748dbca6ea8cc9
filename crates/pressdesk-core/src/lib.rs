// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Pressdesk source-request responder.
//!
//! This crate provides the domain types, the shared error type and the
//! adapter traits implemented by the mailbox, generator, review channel and
//! storage crates.

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

pub use error::PressdeskError;
pub use types::{
    ActionKind, ActionLogEntry, ActionLogRecord, AdapterType, DeliveryMarker, DeliveryState,
    Draft, DraftId, DraftStatus, GeneratedDraft, HealthStatus, InboundAction, NotificationId,
    NotificationRecord, NotificationRef, OutboundEmail, PendingEdit, Provider, RawMessage,
    RelevanceVerdict, Request, RequestId, RequestStatus, SentEmail, StatusCounts,
};

pub use traits::{
    DraftGenerator, MailboxAdapter, PluginAdapter, RecordStore, RelevanceJudge, ReviewChannel,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        let variants = [
            AdapterType::Mailbox,
            AdapterType::Generator,
            AdapterType::ReviewChannel,
            AdapterType::Storage,
        ];
        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn traits_are_object_safe() {
        fn _mailbox(_: &dyn MailboxAdapter) {}
        fn _generator(_: &dyn DraftGenerator) {}
        fn _judge(_: &dyn RelevanceJudge) {}
        fn _review(_: &dyn ReviewChannel) {}
        fn _store(_: &dyn RecordStore) {}
    }
}
