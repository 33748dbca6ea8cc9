// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram review channel for the Pressdesk responder.
//!
//! Implements [`ReviewChannel`] for the Telegram Bot API via teloxide. Review
//! cards are posted to one configured chat with Approve / Edit / Reject
//! buttons; button presses and edited text from that chat are translated
//! into [`InboundAction`]s and queued for the review loop.

pub mod card;
pub mod handler;

use std::sync::Arc;

use async_trait::async_trait;
use pressdesk_config::model::TelegramConfig;
use pressdesk_core::error::PressdeskError;
use pressdesk_core::traits::{PluginAdapter, ReviewChannel};
use pressdesk_core::types::{
    AdapterType, Draft, HealthStatus, InboundAction, NotificationRef, Request,
};
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::handler::{EditText, ReviewGate};

const EDIT_FORMAT_HINT: &str = "Please include both 'Subject:' and 'Body:' sections.";

/// Telegram review channel implementing [`ReviewChannel`].
///
/// Connects via long polling and accepts actions only from the configured
/// chat and, when `allowed_users` is set, only from the listed users.
pub struct TelegramReviewChannel {
    bot: Bot,
    gate: Arc<ReviewGate>,
    max_message_chars: usize,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundAction>>,
    inbound_tx: mpsc::Sender<InboundAction>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramReviewChannel {
    /// Creates the channel. Requires `bot_token` and `chat_id`; reviewer
    /// actions queue up to `queue_capacity` before handlers wait.
    pub fn new(config: &TelegramConfig, queue_capacity: usize) -> Result<Self, PressdeskError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            PressdeskError::Config("telegram.bot_token is required for the review channel".into())
        })?;
        if token.is_empty() {
            return Err(PressdeskError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }
        let chat = config.chat_id.map(ChatId).ok_or_else(|| {
            PressdeskError::Config("telegram.chat_id is required for the review channel".into())
        })?;

        let (inbound_tx, inbound_rx) = mpsc::channel(queue_capacity.max(1));
        Ok(Self {
            bot: Bot::new(token),
            gate: Arc::new(ReviewGate::new(chat, config.allowed_users.clone())),
            max_message_chars: config.max_message_chars,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    pub fn chat(&self) -> ChatId {
        self.gate.chat
    }

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), PressdeskError> {
        self.bot
            .send_message(chat, text)
            .await
            .map_err(|e| PressdeskError::Channel {
                message: format!("failed to send message: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }
}

async fn enqueue(tx: &mpsc::Sender<InboundAction>, action: InboundAction) {
    debug!(
        conversation_id = %action.conversation_id,
        actor = %action.actor,
        action = action.kind.name(),
        "reviewer action queued"
    );
    if tx.send(action).await.is_err() {
        warn!("inbound action queue closed, dropping reviewer action");
    }
}

#[async_trait]
impl PluginAdapter for TelegramReviewChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ReviewChannel
    }

    async fn health_check(&self) -> Result<HealthStatus, PressdeskError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), PressdeskError> {
        debug!("Telegram review channel shutting down");
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewChannel for TelegramReviewChannel {
    async fn connect(&mut self) -> Result<(), PressdeskError> {
        if self.polling_handle.is_some() {
            return Ok(());
        }

        let bot = self.bot.clone();
        let callback_tx = self.inbound_tx.clone();
        let message_tx = self.inbound_tx.clone();
        let callback_gate = self.gate.clone();
        let message_gate = self.gate.clone();

        info!(chat_id = self.gate.chat.0, "starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let on_callback = move |bot: Bot, q: CallbackQuery| {
                let tx = callback_tx.clone();
                let gate = callback_gate.clone();
                async move {
                    // Stops the button's loading indicator whatever happens next.
                    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
                        debug!(error = %e, "failed to answer callback query");
                    }
                    let Some(card) = q.message.as_ref() else {
                        return respond(());
                    };
                    let chat = card.chat().id;
                    if !gate.allows(chat, Some(&q.from)) {
                        debug!(chat_id = chat.0, user_id = q.from.id.0, "ignoring unauthorized button press");
                        return respond(());
                    }
                    let data = q.data.as_deref().unwrap_or_default();
                    match handler::action_from_button(chat, card.id(), &q.from, data) {
                        Some(action) => enqueue(&tx, action).await,
                        None => debug!(data, "ignoring unknown callback data"),
                    }
                    respond(())
                }
            };

            let on_message = move |bot: Bot, msg: Message| {
                let tx = message_tx.clone();
                let gate = message_gate.clone();
                async move {
                    if !gate.allows(msg.chat.id, msg.from.as_ref()) {
                        debug!(chat_id = msg.chat.id.0, "ignoring message outside the review chat");
                        return respond(());
                    }
                    let Some(text) = msg.text() else {
                        return respond(());
                    };
                    match handler::parse_edit_text(text) {
                        EditText::Complete { subject, body } => {
                            if let Some(action) = handler::action_from_edit(&msg, subject, body) {
                                enqueue(&tx, action).await;
                            }
                        }
                        EditText::Incomplete => {
                            if let Err(e) = bot.send_message(msg.chat.id, EDIT_FORMAT_HINT).await {
                                warn!(error = %e, "failed to send edit format hint");
                            }
                        }
                        EditText::Chatter => {
                            debug!(msg_id = msg.id.0, "ignoring non-edit message");
                        }
                    }
                    respond(())
                }
            };

            let handler = dptree::entry()
                .branch(Update::filter_callback_query().endpoint(on_callback))
                .branch(Update::filter_message().endpoint(on_message));

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {})
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn notify(
        &self,
        request: &Request,
        draft: &Draft,
    ) -> Result<NotificationRef, PressdeskError> {
        let text = card::card_text(request, draft, self.max_message_chars);
        let sent = self
            .bot
            .send_message(self.gate.chat, text)
            .reply_markup(card::review_keyboard(draft))
            .await
            .map_err(|e| PressdeskError::Channel {
                message: format!("failed to post review card: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(NotificationRef {
            id: card::notification_id(sent.chat.id, sent.id),
            conversation_id: sent.chat.id.0.to_string(),
        })
    }

    async fn inform(&self, conversation_id: &str, text: &str) -> Result<(), PressdeskError> {
        let chat = conversation_id
            .parse::<i64>()
            .map(ChatId)
            .map_err(|e| PressdeskError::channel(format!("invalid chat_id {conversation_id:?}: {e}")))?;
        self.send_text(chat, text).await
    }

    async fn alert(&self, text: &str) -> Result<(), PressdeskError> {
        self.send_text(self.gate.chat, text).await
    }

    async fn receive(&self) -> Result<InboundAction, PressdeskError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| PressdeskError::channel("Telegram inbound action queue closed"))
    }
}
