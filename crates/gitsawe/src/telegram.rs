//! Telegram Bot API との通信を提供する。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;

use crate::version::user_agent;

/// 通常の API 呼び出しのタイムアウト。
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Telegram API error {code}: {description}")]
    Api { code: i64, description: String },
}

/// メッセージ送信の抽象。
///
/// 1 回の呼び出しで 1 セグメントを 1 つの宛先へ送る。再送はしない。
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), TransportError>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, TransportError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            (ok, _) => Err(TransportError::Api {
                code: self.error_code.unwrap_or(0),
                description: self.description.unwrap_or_else(|| {
                    if ok {
                        "response without result".to_string()
                    } else {
                        "unknown error".to_string()
                    }
                }),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: u64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Serialize)]
struct NoParams {}

/// Telegram Bot API クライアント。
pub struct TelegramClient {
    http: reqwest::Client,
    /// `{api_url}/bot{token}`
    endpoint: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent())
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    async fn call<P, T>(&self, method: &str, params: &P, timeout: Duration) -> Result<T, TransportError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response: ApiResponse<T> = self
            .http
            .post(format!("{}/{}", self.endpoint, method))
            .timeout(timeout)
            .json(params)
            .send()
            .await?
            .json()
            .await?;
        response.into_result()
    }

    /// トークンを検証し、ボット自身の情報を返す。
    pub async fn get_me(&self) -> Result<User, TransportError> {
        self.call("getMe", &NoParams {}, REQUEST_TIMEOUT).await
    }

    /// ロングポーリングと共存できないため、設定済みの webhook を解除する。
    pub async fn delete_webhook(&self) -> Result<(), TransportError> {
        let _: bool = self
            .call("deleteWebhook", &NoParams {}, REQUEST_TIMEOUT)
            .await?;
        Ok(())
    }

    /// `offset` 以降の更新をロングポーリングで取得する。
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        poll_timeout: Duration,
    ) -> Result<Vec<Update>, TransportError> {
        let params = GetUpdates {
            offset,
            timeout: poll_timeout.as_secs(),
            allowed_updates: ["message"],
        };
        self.call("getUpdates", &params, poll_timeout + REQUEST_TIMEOUT)
            .await
    }

    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<(), TransportError> {
        let params = SendMessage {
            chat_id,
            text,
            parse_mode,
        };
        let _: serde_json::Value = self.call("sendMessage", &params, REQUEST_TIMEOUT).await?;
        debug!(chat_id, len = text.chars().count(), "Message sent");
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), TransportError> {
        self.send_message(chat_id, text, Some("Markdown")).await
    }
}
