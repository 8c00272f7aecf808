//! テスト用の送信・待機のダミー実装。

use std::{collections::HashSet, sync::Mutex};

use async_trait::async_trait;

use crate::broadcast::{Pause, Throttle};
use crate::telegram::{Transport, TransportError};

/// 送信内容を記録し、指定した宛先や本文の送信だけ失敗させる。
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, String)>>,
    failing_chats: HashSet<String>,
    failing_text: Option<String>,
}

impl RecordingTransport {
    pub fn failing_chats(ids: &[&str]) -> Self {
        Self {
            failing_chats: ids.iter().map(|id| id.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn failing_text(fragment: &str) -> Self {
        Self {
            failing_text: Some(fragment.to_string()),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: &str) -> usize {
        self.sent().iter().filter(|(id, _)| id == chat_id).count()
    }

    pub fn last_text(&self) -> Option<String> {
        self.sent().pop().map(|(_, text)| text)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));

        let text_fails = self
            .failing_text
            .as_deref()
            .is_some_and(|fragment| text.contains(fragment));
        if self.failing_chats.contains(chat_id) || text_fails {
            return Err(TransportError::Api {
                code: 403,
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        Ok(())
    }
}

/// 待たずに、要求された待機の種類だけを記録する。
#[derive(Default)]
pub struct NoDelay {
    pauses: Mutex<Vec<Pause>>,
}

impl NoDelay {
    pub fn pauses(&self) -> Vec<Pause> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Throttle for NoDelay {
    async fn pause(&self, pause: Pause) {
        self.pauses.lock().unwrap().push(pause);
    }
}
