//! Shared text sent to Telegram by the notifier.
//!
//! Keep all user-facing strings in this module so they stay in one place and are
//! easy to update or translate.

pub const OPEN_CHAT_BUTTON: &str = "💬 Открыть чат";
pub const OPEN_APP_BUTTON: &str = "📱 Открыть приложение";

pub const DEFAULT_SENDER_NAME: &str = "Анонимный";

/// Sent to the ad owner when somebody opens a chat request.
pub fn chat_request_text(ad_excerpt: &str) -> String {
    format!(
        "🔔 <b>С вами хотят связаться!</b>\n\n\
         По объявлению: <i>{ad_excerpt}</i>\n\n\
         Примите запрос в приложении, чтобы начать приватный чат."
    )
}

/// Sent to the initiator once their chat request is stored.
pub fn chat_created_text(ad_excerpt: &str) -> String {
    format!(
        "✅ <b>Запрос на чат отправлен!</b>\n\n\
         По объявлению: <i>{ad_excerpt}</i>\n\n\
         Вы получите уведомление, когда собеседник примет запрос."
    )
}

/// Sent to the receiver of a new private message.
pub fn new_message_text(sender_nickname: Option<&str>, preview: &str, ad_id: i64) -> String {
    let from = match sender_nickname {
        Some(name) => format!(" от {name}"),
        None => String::new(),
    };
    format!("💬 Новое сообщение{from}!\n\n📝 \"{preview}\"\n\n🔗 Объявление #{ad_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_text_includes_sender_when_known() {
        let text = new_message_text(Some("Кот"), "привет", 7);
        assert!(text.contains("от Кот"));
        assert!(text.contains("Объявление #7"));

        let anon = new_message_text(None, "привет", 7);
        assert!(!anon.contains(" от "));
    }
}
