// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the collaborators of the triage pipeline.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod generator;
pub mod mailbox;
pub mod review;
pub mod storage;

pub use adapter::PluginAdapter;
pub use generator::{DraftGenerator, RelevanceJudge};
pub use mailbox::MailboxAdapter;
pub use review::ReviewChannel;
pub use storage::RecordStore;
