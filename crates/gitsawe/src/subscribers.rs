//! 配信先 (ユーザーとチャンネル) の購読状態を永続化するストア。

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read subscriber store")]
    Read(#[source] std::io::Error),
    #[error("Failed to parse subscriber store")]
    Parse(#[source] serde_json::Error),
    #[error("Failed to serialize subscriber store")]
    Serialize(#[source] serde_json::Error),
    #[error("Failed to write subscriber store")]
    Write(#[source] std::io::Error),
}

/// メモリ上の変更は反映済みだが、ファイルへの保存に失敗したことを表す。
#[derive(Debug, Error)]
#[error("Subscriber store was updated in memory but could not be saved")]
pub struct PersistError {
    /// 変更操作自体の結果
    pub changed: bool,
    #[source]
    pub source: StoreError,
}

/// Telegram から受け取るプロフィール情報。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// 購読者。購読解除してもレコードは削除せずフラグだけを落とす。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub chat_id: String,
    pub subscribed: bool,
    /// 古いファイルには無いため、読み込み時刻で補う
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsubscribed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub profile: Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total_users: usize,
    pub subscribed_users: usize,
    pub channels: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    users: BTreeMap<String, Subscriber>,
    #[serde(default)]
    channels: Vec<String>,
}

/// 購読者とチャンネルを管理するストア。
///
/// 変更のたびにファイル全体を書き直す。
pub struct SubscriberStore {
    /// 永続化ファイルのパス
    path: PathBuf,
    document: Document,
}

impl SubscriberStore {
    /// ストアを読み込む。ファイルが存在しない場合は空のストアを作成する。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let document = if path.exists() {
            let content = fs::read_to_string(&path).map_err(StoreError::Read)?;
            serde_json::from_str(&content).map_err(StoreError::Parse)?
        } else {
            Document::default()
        };
        Ok(Self { path, document })
    }

    /// ストアをファイルに保存する。
    ///
    /// 隣に一時ファイルを書いてから置き換えるので、途中で落ちても元の文書は壊れない。
    pub fn save(&self) -> Result<(), StoreError> {
        let content =
            serde_json::to_string_pretty(&self.document).map_err(StoreError::Serialize)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(StoreError::Write)?;
        }
        let temp = self.temp_path();
        fs::write(&temp, content).map_err(StoreError::Write)?;
        fs::rename(&temp, &self.path).map_err(StoreError::Write)?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn commit(&self, changed: bool) -> Result<bool, PersistError> {
        self.save()
            .map(|()| changed)
            .map_err(|source| PersistError { changed, source })
    }

    /// 未登録のユーザーを購読状態で登録する。登録済みなら何もせず `false`。
    pub fn add_user(&mut self, chat_id: &str, profile: Profile) -> Result<bool, PersistError> {
        if self.document.users.contains_key(chat_id) {
            return Ok(false);
        }

        let now = Utc::now();
        self.document.users.insert(
            chat_id.to_string(),
            Subscriber {
                chat_id: chat_id.to_string(),
                subscribed: true,
                created_at: now,
                subscribed_at: Some(now),
                unsubscribed_at: None,
                profile,
            },
        );
        self.commit(true)
    }

    /// 購読を有効にする。未登録なら登録する。
    pub fn subscribe(&mut self, chat_id: &str) -> Result<bool, PersistError> {
        let Some(user) = self.document.users.get_mut(chat_id) else {
            return self.add_user(chat_id, Profile::default());
        };
        user.subscribed = true;
        user.subscribed_at = Some(Utc::now());
        self.commit(true)
    }

    /// 購読を解除する。未登録のユーザーは作成せず `false` を返す。
    pub fn unsubscribe(&mut self, chat_id: &str) -> Result<bool, PersistError> {
        let Some(user) = self.document.users.get_mut(chat_id) else {
            return Ok(false);
        };
        user.subscribed = false;
        user.unsubscribed_at = Some(Utc::now());
        self.commit(true)
    }

    /// 未登録のユーザーは `false`。
    pub fn is_subscribed(&self, chat_id: &str) -> bool {
        self.get(chat_id).is_some_and(|user| user.subscribed)
    }

    pub fn get(&self, chat_id: &str) -> Option<&Subscriber> {
        self.document.users.get(chat_id)
    }

    /// 購読中のユーザー (chat ID 順)。
    pub fn subscribed_users(&self) -> impl Iterator<Item = &Subscriber> {
        self.document.users.values().filter(|user| user.subscribed)
    }

    /// 登録済みチャンネル (追加順)。
    pub fn channels(&self) -> &[String] {
        &self.document.channels
    }

    pub fn add_channel(&mut self, channel_id: &str) -> Result<bool, PersistError> {
        if self.document.channels.iter().any(|c| c == channel_id) {
            return Ok(false);
        }
        self.document.channels.push(channel_id.to_string());
        self.commit(true)
    }

    pub fn remove_channel(&mut self, channel_id: &str) -> Result<bool, PersistError> {
        let Some(index) = self.document.channels.iter().position(|c| c == channel_id) else {
            return Ok(false);
        };
        self.document.channels.remove(index);
        self.commit(true)
    }

    pub fn stats(&self) -> Stats {
        Stats {
            total_users: self.document.users.len(),
            subscribed_users: self.subscribed_users().count(),
            channels: self.document.channels.len(),
        }
    }
}
