use std::sync::{Arc, PoisonError};
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::broadcast::{BroadcastEngine, SharedSubscribers};
use crate::calendar::{DayOffset, EthiopianDate, ReadingDay};
use crate::command::Command;
use crate::config::Config;
use crate::messages;
use crate::readings::ContentRepository;
use crate::subscribers::{PersistError, Profile, SubscriberStore};
use crate::telegram::{Message, TelegramClient, Transport};

/// 更新の取得に失敗したときの再試行までの待機。
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// ボット宛てに届いたテキストメッセージ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    pub chat_id: String,
    pub sender_id: Option<u64>,
    pub text: String,
    pub profile: Profile,
}

impl Incoming {
    /// テキストを持たないメッセージ (画像やスタンプなど) は `None`。
    pub fn from_message(message: Message) -> Option<Self> {
        let text = message.text?;
        let (sender_id, profile) = match message.from {
            Some(user) => (
                Some(user.id),
                Profile {
                    first_name: Some(user.first_name),
                    last_name: user.last_name,
                    username: user.username,
                },
            ),
            None => (None, Profile::default()),
        };
        Some(Self {
            chat_id: message.chat.id.to_string(),
            sender_id,
            text,
            profile,
        })
    }
}

pub struct Bot {
    config: Config,
    transport: Arc<dyn Transport>,
    readings: Arc<ContentRepository>,
    subscribers: SharedSubscribers,
    broadcaster: Arc<BroadcastEngine>,
}

impl Bot {
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        readings: Arc<ContentRepository>,
        subscribers: SharedSubscribers,
        broadcaster: Arc<BroadcastEngine>,
    ) -> Self {
        Self {
            config,
            transport,
            readings,
            subscribers,
            broadcaster,
        }
    }

    /// 1 件のメッセージを処理する。失敗してもそのチャットに謝罪を返すだけで処理は続ける。
    pub async fn handle(&self, incoming: &Incoming) {
        let command = Command::parse(&incoming.text);
        info!(
            chat_id = %incoming.chat_id,
            command = command.name(),
            "Received command"
        );

        if let Err(e) = self.dispatch(incoming, command.clone()).await {
            let reason = format!("{e:#}");
            error!(
                chat_id = %incoming.chat_id,
                command = command.name(),
                error = %reason,
                "Command error"
            );

            if let Err(e) = self
                .transport
                .send(&incoming.chat_id, messages::apology())
                .await
            {
                error!(chat_id = %incoming.chat_id, error = %e, "Failed to send error response");
            }
        }
    }

    async fn dispatch(&self, incoming: &Incoming, command: Command) -> Result<()> {
        let chat_id = incoming.chat_id.as_str();

        if command.is_admin() && !self.config.telegram.is_admin(incoming.sender_id) {
            warn!(
                chat_id,
                sender_id = ?incoming.sender_id,
                command = command.name(),
                "Unauthorized access attempt"
            );
            return self.reply(chat_id, messages::unauthorized()).await;
        }

        match command {
            Command::Start => {
                let created =
                    self.mutate_store(|store| store.add_user(chat_id, incoming.profile.clone()));
                if created {
                    info!(chat_id, "New subscriber registered");
                }
                self.reply(chat_id, &messages::welcome(self.config.schedule.time))
                    .await
            }
            Command::Help => {
                self.reply(chat_id, &messages::help(self.config.schedule.time))
                    .await
            }
            Command::Today => self.send_reading(chat_id, DayOffset::Today).await,
            Command::Yesterday => self.send_reading(chat_id, DayOffset::Yesterday).await,
            Command::Tomorrow => self.send_reading(chat_id, DayOffset::Tomorrow).await,
            Command::Subscribe => {
                self.mutate_store(|store| store.subscribe(chat_id));
                self.reply(chat_id, messages::subscribed()).await
            }
            Command::Unsubscribe => {
                let reply = if self.mutate_store(|store| store.unsubscribe(chat_id)) {
                    messages::unsubscribed()
                } else {
                    messages::not_registered()
                };
                self.reply(chat_id, reply).await
            }
            Command::Status => {
                let subscribed = self.read_store(|store| store.is_subscribed(chat_id));
                let text = messages::subscription_status(subscribed, &self.today());
                self.reply(chat_id, &text).await
            }
            Command::Stats => {
                let stats = self.read_store(SubscriberStore::stats);
                self.reply(chat_id, &messages::stats(&stats, &self.today()))
                    .await
            }
            Command::Broadcast => {
                self.reply(chat_id, messages::broadcast_started()).await?;
                let outcome = self
                    .broadcaster
                    .broadcast_on(self.broadcaster.today())
                    .await?;
                self.reply(chat_id, &messages::broadcast_finished(&outcome))
                    .await
            }
            Command::AddChannel(channel_id) => {
                let added = self.mutate_store(|store| store.add_channel(&channel_id));
                if added {
                    info!(channel_id = %channel_id, "Channel added");
                }
                self.reply(chat_id, &messages::channel_added(&channel_id, added))
                    .await
            }
            Command::RemoveChannel(channel_id) => {
                let removed = self.mutate_store(|store| store.remove_channel(&channel_id));
                if removed {
                    info!(channel_id = %channel_id, "Channel removed");
                }
                self.reply(chat_id, &messages::channel_removed(&channel_id, removed))
                    .await
            }
            Command::Reload => {
                let reply = match self.readings.load() {
                    Ok(()) => messages::reloaded(),
                    Err(e) => {
                        warn!(error = %e, "Failed to reload readings, keeping previous data");
                        messages::reload_failed()
                    }
                };
                self.reply(chat_id, reply).await
            }
            Command::Unknown(text) => {
                self.reply(chat_id, &messages::acknowledge(&text)).await
            }
        }
    }

    async fn reply(&self, chat_id: &str, text: &str) -> Result<()> {
        self.transport.send(chat_id, text).await?;
        Ok(())
    }

    async fn send_reading(&self, chat_id: &str, offset: DayOffset) -> Result<()> {
        self.broadcaster
            .send_reading(chat_id, self.broadcaster.today(), offset)
            .await?;
        Ok(())
    }

    fn today(&self) -> EthiopianDate {
        ReadingDay::new(self.broadcaster.today()).ethiopian
    }

    /// 保存に失敗してもメモリ上の変更結果を返す。
    fn mutate_store<F>(&self, op: F) -> bool
    where
        F: FnOnce(&mut SubscriberStore) -> Result<bool, PersistError>,
    {
        let mut store = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match op(&mut store) {
            Ok(changed) => changed,
            Err(e) => {
                warn!(error = %e, cause = %e.source, "Subscriber change was not persisted");
                e.changed
            }
        }
    }

    fn read_store<T>(&self, op: impl FnOnce(&SubscriberStore) -> T) -> T {
        let store = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        op(&store)
    }
}

/// ロングポーリングで更新を受け取り、1 件ずつ順に処理し続ける。
pub async fn run_polling(client: &TelegramClient, bot: &Bot, poll_timeout: Duration) {
    info!(timeout = ?poll_timeout, "Starting long polling");

    let mut offset = None;
    loop {
        let updates = match client.get_updates(offset, poll_timeout).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "Failed to fetch updates");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            if let Some(incoming) = update.message.and_then(Incoming::from_message) {
                bot.handle(&incoming).await;
            }
        }
    }
}
