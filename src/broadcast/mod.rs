use std::sync::Arc;

use tracing::{info, warn};

use crate::channels::{Keyboard, Messenger};
use crate::session::SessionStore;
use crate::texts::{Text, fill, text};

/// Fan-out announcements to every known session, localized per recipient.
///
/// Best-effort delivery: an undeliverable chat (blocked bot, deleted
/// account) is logged and skipped, never aborting the fan-out.
pub struct BroadcastNotifier {
    messenger: Arc<dyn Messenger>,
    sessions: Arc<SessionStore>,
}

impl BroadcastNotifier {
    pub fn new(messenger: Arc<dyn Messenger>, sessions: Arc<SessionStore>) -> Self {
        Self {
            messenger,
            sessions,
        }
    }

    /// Send an announcement to every session. Returns the number of chats
    /// actually reached.
    pub async fn broadcast(&self, message: &str) -> usize {
        let mut delivered = 0;
        for chat_id in self.sessions.keys().await {
            let lang = match self.sessions.get(&chat_id).await {
                Some(entry) => entry.lock().await.lang(),
                None => continue,
            };
            let body = fill(text(lang, Text::AdminBroadcast), &[message]);
            match self.messenger.send(&chat_id, &body, Keyboard::None).await {
                Ok(_) => delivered += 1,
                Err(e) => warn!(chat = %chat_id, "Broadcast delivery failed, skipping: {e}"),
            }
        }
        info!(delivered, "Broadcast finished");
        delivered
    }

    /// Message a single chat verbatim, without the announcement prefix.
    pub async fn direct(&self, chat_id: &str, message: &str) -> anyhow::Result<()> {
        self.messenger.send(chat_id, message, Keyboard::None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texts::Lang;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct RecordingMessenger {
        sent: StdMutex<Vec<(String, String)>>,
        fail_for: Option<String>,
    }

    impl RecordingMessenger {
        fn new() -> Self {
            Self {
                sent: StdMutex::new(Vec::new()),
                fail_for: None,
            }
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send(
            &self,
            chat_id: &str,
            text: &str,
            _keyboard: Keyboard,
        ) -> anyhow::Result<Option<String>> {
            if self.fail_for.as_deref() == Some(chat_id) {
                anyhow::bail!("chat unreachable");
            }
            self.sent
                .lock()
                .unwrap()
                .push((chat_id.to_string(), text.to_string()));
            Ok(None)
        }

        async fn edit_text(
            &self,
            _chat_id: &str,
            _message_id: &str,
            _text: &str,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        async fn send_venue(
            &self,
            _chat_id: &str,
            _lat: f64,
            _lon: f64,
            _title: &str,
            _address: &str,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    async fn store_with_sessions() -> Arc<SessionStore> {
        let store = Arc::new(SessionStore::new());
        let en = store.get_or_create("1").await;
        en.lock().await.lang = Some(Lang::En);
        let am = store.get_or_create("2").await;
        am.lock().await.lang = Some(Lang::Am);
        store
    }

    #[tokio::test]
    async fn broadcast_localizes_per_recipient() {
        let messenger = Arc::new(RecordingMessenger::new());
        let store = store_with_sessions().await;
        let notifier = BroadcastNotifier::new(messenger.clone(), store);

        let delivered = notifier.broadcast("Closed tomorrow").await;
        assert_eq!(delivered, 2);

        let sent = messenger.sent.lock().unwrap();
        let for_en = sent.iter().find(|(chat, _)| chat == "1").unwrap();
        let for_am = sent.iter().find(|(chat, _)| chat == "2").unwrap();
        assert!(for_en.1.contains("Announcement"));
        assert!(for_am.1.contains("ማስታወቂያ"));
        assert!(for_en.1.contains("Closed tomorrow"));
    }

    #[tokio::test]
    async fn failed_deliveries_are_skipped_not_fatal() {
        let messenger = Arc::new(RecordingMessenger {
            sent: StdMutex::new(Vec::new()),
            fail_for: Some("1".to_string()),
        });
        let store = store_with_sessions().await;
        let notifier = BroadcastNotifier::new(messenger.clone(), store);

        let delivered = notifier.broadcast("hello").await;
        assert_eq!(delivered, 1);
        assert_eq!(messenger.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn direct_message_is_verbatim() {
        let messenger = Arc::new(RecordingMessenger::new());
        let notifier = BroadcastNotifier::new(messenger.clone(), Arc::new(SessionStore::new()));
        notifier.direct("42", "ping").await.unwrap();
        let sent = messenger.sent.lock().unwrap();
        assert_eq!(sent[0], ("42".to_string(), "ping".to_string()));
    }
}
