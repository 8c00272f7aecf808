//! 日々の朗読を購読ユーザーとチャンネルへ一斉配信する。
//!
//! 1 回の配信は「内容の検索 → 配信先の列挙 → 順次送信 → 集計」の順に進む。
//! 宛先ごとの送信失敗は数えるだけで、残りの宛先への配信は続ける。

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calendar::{self, DayOffset, EthiopianDate, ReadingDay};
use crate::messages;
use crate::readings::{self, ContentRepository, MAX_SEGMENT_LEN};
use crate::subscribers::SubscriberStore;
use crate::telegram::{Transport, TransportError};

pub type SharedSubscribers = Arc<Mutex<SubscriberStore>>;

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("Subscriber store is unavailable")]
    TargetsUnavailable,
}

/// 配信先。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    User(String),
    Channel(String),
}

impl Target {
    pub fn chat_id(&self) -> &str {
        match self {
            Target::User(id) | Target::Channel(id) => id,
        }
    }

    fn pause(&self) -> Pause {
        match self {
            Target::User(_) => Pause::AfterUser,
            Target::Channel(_) => Pause::AfterChannel,
        }
    }
}

/// 送信の合間に入れる待機の種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    AfterUser,
    AfterChannel,
    /// 同じ宛先への複数セグメントの間
    BetweenSegments,
}

/// 送信レートを抑えるための待機を提供する。
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self, pause: Pause);
}

/// 種類ごとに固定時間だけ待つ [`Throttle`]。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDelay {
    pub user: Duration,
    pub channel: Duration,
    pub segment: Duration,
}

#[async_trait]
impl Throttle for FixedDelay {
    async fn pause(&self, pause: Pause) {
        let delay = match pause {
            Pause::AfterUser => self.user,
            Pause::AfterChannel => self.channel,
            Pause::BetweenSegments => self.segment,
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// その日の朗読が無いため配信しなかった
    Skipped { date: EthiopianDate },
    Delivered(BroadcastResult),
}

pub struct BroadcastEngine {
    transport: Arc<dyn Transport>,
    throttle: Arc<dyn Throttle>,
    readings: Arc<ContentRepository>,
    subscribers: SharedSubscribers,
    timezone: Tz,
}

impl BroadcastEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        throttle: Arc<dyn Throttle>,
        readings: Arc<ContentRepository>,
        subscribers: SharedSubscribers,
        timezone: Tz,
    ) -> Self {
        Self {
            transport,
            throttle,
            readings,
            subscribers,
            timezone,
        }
    }

    /// 設定タイムゾーンでの今日の日付。
    pub fn today(&self) -> NaiveDate {
        calendar::today_in(self.timezone)
    }

    /// スケジューラから毎日呼ばれる配信。
    pub async fn run_scheduled_broadcast(&self) -> Result<BroadcastOutcome, BroadcastError> {
        self.broadcast_on(self.today()).await
    }

    /// 指定日の朗読を全配信先へ送る。
    pub async fn broadcast_on(&self, date: NaiveDate) -> Result<BroadcastOutcome, BroadcastError> {
        let day = ReadingDay::new(date);
        let readings = self.readings.resolve_date(&day.ethiopian);

        if !readings.found() {
            info!(date = %day.ethiopian, "No readings found, skipping broadcast");
            return Ok(BroadcastOutcome::Skipped {
                date: day.ethiopian,
            });
        }

        let targets = self.targets()?;
        info!(
            date = %day.ethiopian,
            targets = targets.len(),
            "Starting broadcast"
        );

        let message = readings::compose(&readings, &day, messages::day_label(DayOffset::Today));
        let segments: Vec<&str> = readings::split(&message, MAX_SEGMENT_LEN).collect();

        let mut result = BroadcastResult::default();
        for target in &targets {
            result.attempted += 1;
            match self.deliver(target.chat_id(), &segments).await {
                Ok(()) => {
                    result.succeeded += 1;
                    debug!(target = target.chat_id(), "Broadcast delivered");
                }
                Err(e) => {
                    result.failed += 1;
                    warn!(target = target.chat_id(), error = %e, "Failed to deliver broadcast");
                }
            }
            self.throttle.pause(target.pause()).await;
        }

        info!(
            attempted = result.attempted,
            succeeded = result.succeeded,
            failed = result.failed,
            "Broadcast complete"
        );
        Ok(BroadcastOutcome::Delivered(result))
    }

    /// `today` から `offset` だけずらした日の朗読を 1 つのチャットへ送る。
    ///
    /// 朗読が無い日も、その旨を含むメッセージを送る。
    pub async fn send_reading(
        &self,
        chat_id: &str,
        today: NaiveDate,
        offset: DayOffset,
    ) -> Result<(), TransportError> {
        let day = ReadingDay::relative_to(today, offset);
        let readings = self.readings.resolve_date(&day.ethiopian);
        let message = readings::compose(&readings, &day, messages::day_label(offset));
        let segments: Vec<&str> = readings::split(&message, MAX_SEGMENT_LEN).collect();
        self.deliver(chat_id, &segments).await
    }

    /// 購読ユーザー、チャンネルの順に並べた配信先。
    fn targets(&self) -> Result<Vec<Target>, BroadcastError> {
        let store = self
            .subscribers
            .lock()
            .map_err(|_| BroadcastError::TargetsUnavailable)?;

        let users = store
            .subscribed_users()
            .map(|user| Target::User(user.chat_id.clone()));
        let channels = store
            .channels()
            .iter()
            .map(|id| Target::Channel(id.clone()));
        Ok(users.chain(channels).collect())
    }

    async fn deliver(&self, chat_id: &str, segments: &[&str]) -> Result<(), TransportError> {
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                self.throttle.pause(Pause::BetweenSegments).await;
            }
            self.transport.send(chat_id, segment).await?;
        }
        Ok(())
    }
}
