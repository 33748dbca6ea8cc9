// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Pressdesk integration tests.
//!
//! Provides mock collaborators and a harness for fast, deterministic tests
//! without a mailbox, a model API or a chat service.
//!
//! # Components
//!
//! - [`MockMailbox`] - inbox injection, scripted send failures, send capture
//! - [`MockGenerator`] - queued draft results with a canned fallback
//! - [`MockReviewChannel`] - action injection and card/reply capture
//! - [`TestHarness`] - the triage pipeline over a temp SQLite database

pub mod fixtures;
pub mod harness;
pub mod mock_generator;
pub mod mock_mailbox;
pub mod mock_review;

pub use harness::TestHarness;
pub use mock_generator::{MockGenerator, MockRelevanceJudge};
pub use mock_mailbox::MockMailbox;
pub use mock_review::{MockReviewChannel, PostedCard, REVIEW_CONVERSATION};
