// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Every function takes `&Database` and runs on the
//! single writer thread.

pub mod action_log;
pub mod deliveries;
pub mod drafts;
pub mod notifications;
pub mod pending_edits;
pub mod requests;
pub mod stats;
