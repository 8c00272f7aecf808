mod bot;
mod broadcast;
mod calendar;
mod command;
mod config;
mod messages;
mod readings;
mod schedule;
mod subscribers;
mod telegram;
#[cfg(test)]
mod testing;
mod version;

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::{error, info, warn};

use crate::{
    bot::Bot,
    broadcast::{BroadcastEngine, BroadcastOutcome},
    calendar::{EthiopianDate, ReadingDay},
    config::{TOKEN_ENV, open_config, write_default_config},
    readings::ContentRepository,
    subscribers::SubscriberStore,
    telegram::TelegramClient,
    version::long_version,
};

#[derive(Parser)]
#[command(version = long_version())]
struct Args {
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    if args.init {
        write_default_config(&args.config)?;
        info!(path = ?args.config, "Created default configuration");
        return Ok(());
    }

    info!(version = long_version(), "gitsawe version");

    let config = open_config(&args.config).context("Failed to load configuration")?;
    let token = config
        .telegram
        .resolve_token(std::env::var(TOKEN_ENV).ok())?;

    let client = Arc::new(
        TelegramClient::new(&config.telegram.api_url, &token)
            .context("Failed to build Telegram client")?,
    );
    let me = client
        .get_me()
        .await
        .context("Failed to verify Telegram bot token")?;
    info!(
        username = me.username.as_deref().unwrap_or(&me.first_name),
        "Bot connected"
    );
    client
        .delete_webhook()
        .await
        .context("Failed to delete webhook")?;

    let readings = Arc::new(ContentRepository::new(config.readings.paths()));
    // 読み込めなくても起動は続け、/reload で復旧できるようにする
    if let Err(e) = readings.load() {
        error!(error = %e, "Failed to load readings, starting with empty catalogs");
    }

    let store = SubscriberStore::load(&config.subscribers.path)
        .context("Failed to load subscriber store")?;
    let stats = store.stats();
    info!(
        users = stats.total_users,
        subscribed = stats.subscribed_users,
        channels = stats.channels,
        "Subscriber store loaded"
    );
    let subscribers = Arc::new(Mutex::new(store));

    let broadcaster = Arc::new(BroadcastEngine::new(
        client.clone(),
        Arc::new(config.delivery.throttle()),
        readings.clone(),
        subscribers.clone(),
        config.schedule.timezone,
    ));

    log_calendar(&ReadingDay::new(broadcaster.today()).ethiopian);

    let scheduled = broadcaster.clone();
    tokio::spawn(schedule::run_daily(config.schedule.daily(), move || {
        let broadcaster = scheduled.clone();
        async move {
            match broadcaster.run_scheduled_broadcast().await {
                Ok(BroadcastOutcome::Delivered(result)) => {
                    info!(
                        succeeded = result.succeeded,
                        failed = result.failed,
                        "Scheduled broadcast finished"
                    );
                }
                Ok(BroadcastOutcome::Skipped { date }) => {
                    warn!(date = %date, "Scheduled broadcast skipped, no readings");
                }
                Err(e) => error!(error = %e, "Scheduled broadcast failed"),
            }
        }
    }));

    let poll_timeout = config.telegram.poll_timeout;
    let bot = Bot::new(
        config,
        client.clone(),
        readings,
        subscribers,
        broadcaster,
    );

    tokio::select! {
        _ = bot::run_polling(&client, &bot, poll_timeout) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Shutting down");
        }
    }

    Ok(())
}

/// 今日のエチオピア暦の日付と次の新年 (መስከረም 1) を記録する。
fn log_calendar(today: &EthiopianDate) {
    let next_year = today.year + 1;
    let new_year = calendar::ethiopian_to_gregorian(EthiopianDate {
        year: next_year,
        month: 1,
        day: 1,
    });
    match new_year.to_naive() {
        Some(date) => info!(
            today = %today,
            next_new_year = %date,
            leap_year = calendar::is_ethiopian_leap_year(today.year),
            "Ethiopian calendar"
        ),
        None => info!(today = %today, "Ethiopian calendar"),
    }
}
