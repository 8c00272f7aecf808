//! 指定タイムゾーンの決まった時刻に毎日処理を実行する。

use std::future::Future;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub at: NaiveTime,
    pub timezone: Tz,
}

impl DailySchedule {
    /// `now` より後で最初に訪れる実行時刻。
    ///
    /// 夏時間の切り替えで存在しない時刻は翌日以降に回す。
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_today = now.with_timezone(&self.timezone).date_naive();

        local_today
            .iter_days()
            .take(3)
            .filter_map(|date| {
                self.timezone
                    .from_local_datetime(&date.and_time(self.at))
                    .earliest()
            })
            .map(|fire| fire.with_timezone(&Utc))
            .find(|fire| *fire > now)
            .unwrap_or(now + chrono::Duration::days(1))
    }
}

/// 毎日 `schedule` の時刻に `job` を実行し続ける。
pub async fn run_daily<F, Fut>(schedule: DailySchedule, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    info!(
        at = %schedule.at,
        timezone = %schedule.timezone,
        "Starting daily scheduler"
    );

    loop {
        let now = Utc::now();
        let next = schedule.next_after(now);
        let wait = (next - now).to_std().unwrap_or_default();
        info!(
            next = %next.with_timezone(&schedule.timezone),
            wait = %humantime::format_duration(std::time::Duration::from_secs(wait.as_secs())),
            "Next scheduled run"
        );

        tokio::time::sleep(wait).await;
        job().await;
    }
}
