//! Outbound Telegram notifications.
//!
//! Notifications are best-effort: a missing bot token or a failed API
//! call is logged and never propagated to the HTTP request that
//! triggered the send.

use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode, WebAppInfo};
use unicode_segmentation::UnicodeSegmentation;
use url::Url;

use crate::messages;

/// Grapheme budget for the message preview inside a notification.
const PREVIEW_GRAPHEMES: usize = 100;

/// Grapheme budget for the ad excerpt in chat-request notifications.
const AD_EXCERPT_GRAPHEMES: usize = 50;

#[derive(Clone)]
pub struct Notifier {
    bot: Option<Bot>,
    webapp_url: Option<Url>,
}

impl Notifier {
    pub fn new(bot: Option<Bot>, webapp_url: &str) -> Self {
        let webapp_url = match Url::parse(webapp_url) {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!(error = %err, webapp_url, "Invalid webapp URL, buttons disabled");
                None
            }
        };
        if bot.is_none() {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set, notifications disabled");
        }
        Self { bot, webapp_url }
    }

    /// Notify the ad owner about a new chat request.
    pub async fn chat_request(&self, receiver_tg_id: i64, ad_text: &str) {
        let excerpt = truncate_graphemes(ad_text, AD_EXCERPT_GRAPHEMES);
        self.send(
            receiver_tg_id,
            messages::chat_request_text(&excerpt),
            messages::OPEN_APP_BUTTON,
        )
        .await;
    }

    /// Confirm to the initiator that their request went out.
    pub async fn chat_requested_ack(&self, receiver_tg_id: i64, ad_text: &str) {
        let excerpt = truncate_graphemes(ad_text, AD_EXCERPT_GRAPHEMES);
        self.send(
            receiver_tg_id,
            messages::chat_created_text(&excerpt),
            messages::OPEN_APP_BUTTON,
        )
        .await;
    }

    /// Notify the receiver of a new private message.
    pub async fn new_message(
        &self,
        receiver_tg_id: i64,
        sender_nickname: Option<&str>,
        text: &str,
        ad_id: i64,
    ) {
        let preview = truncate_graphemes(text, PREVIEW_GRAPHEMES);
        self.send(
            receiver_tg_id,
            messages::new_message_text(sender_nickname, &preview, ad_id),
            messages::OPEN_CHAT_BUTTON,
        )
        .await;
    }

    async fn send(&self, receiver_tg_id: i64, text: String, button_label: &str) {
        let Some(bot) = &self.bot else {
            tracing::debug!(receiver_tg_id, "Notification skipped, no bot configured");
            return;
        };

        let mut request = bot
            .send_message(ChatId(receiver_tg_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = self.keyboard(button_label) {
            request = request.reply_markup(keyboard);
        }

        if let Err(err) = request.await {
            tracing::warn!(
                error = %err,
                receiver_tg_id,
                "Failed to send Telegram notification",
            );
        } else {
            tracing::debug!(receiver_tg_id, "Telegram notification sent");
        }
    }

    fn keyboard(&self, label: &str) -> Option<InlineKeyboardMarkup> {
        let url = self.webapp_url.clone()?;
        Some(InlineKeyboardMarkup::new(vec![vec![
            InlineKeyboardButton::web_app(label, WebAppInfo { url }),
        ]]))
    }
}

/// Truncate to at most `max` graphemes, appending an ellipsis when the
/// text was cut. Splitting on graphemes keeps emoji and combining
/// marks intact.
pub fn truncate_graphemes(text: &str, max: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(max).collect();
    if graphemes.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
