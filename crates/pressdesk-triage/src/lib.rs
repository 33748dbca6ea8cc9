// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Triage pipeline for the Pressdesk source-request responder.
//!
//! Polls the mailbox for labeled requests, ingests each source message once,
//! drafts a reply, routes it through human review and sends approved replies
//! exactly once. Components share a [`TriageContext`] and talk to each other
//! only through the record store.

pub mod context;
pub mod coordinator;
pub mod delivery;
pub mod ingest;
pub mod lifecycle;
pub mod poller;
pub mod retry;
pub mod service;

pub use context::{TriageContext, TriageSettings};
pub use coordinator::{AppliedAction, HandleOutcome, ReviewCoordinator};
pub use delivery::{DeliveryExecutor, DeliveryOutcome, RecoveryReport};
pub use ingest::IngestOutcome;
pub use poller::TickReport;
pub use retry::RetryPolicy;
