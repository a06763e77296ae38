use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::session::Session;

/// Keyed store of live sessions.
///
/// Each entry is an `Arc<Mutex<Session>>`: events for the same session are
/// serialized by locking the entry for the duration of handling, while
/// events for different sessions proceed concurrently. The outer map lock
/// is held only for lookup/insert, never across awaits on a session.
///
/// The store is passed explicitly to every consumer; there is no global.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_create(&self, chat_id: &str) -> Arc<Mutex<Session>> {
        let mut map = self.inner.lock().await;
        map.entry(chat_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(chat_id))))
            .clone()
    }

    pub async fn get(&self, chat_id: &str) -> Option<Arc<Mutex<Session>>> {
        self.inner.lock().await.get(chat_id).cloned()
    }

    /// Snapshot of all known session keys, for administrative fan-out.
    pub async fn keys(&self) -> Vec<String> {
        self.inner.lock().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
