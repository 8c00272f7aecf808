use anyhow::{Context, Result, bail};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::broadcast::FixedDelay;
use crate::readings::CatalogPaths;
use crate::schedule::DailySchedule;

/// 設定ファイルより優先されるトークンの環境変数。
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

const PLACEHOLDER_TOKEN: &str = "YOUR_TELEGRAM_BOT_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub readings: ReadingsConfig,
    #[serde(default)]
    pub subscribers: SubscribersConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
    /// 管理コマンドを許可するユーザー ID。空なら誰でも実行できる。
    #[serde(default)]
    pub admins: Vec<u64>,
    #[serde(default = "default_poll_timeout", with = "humantime_serde")]
    pub poll_timeout: Duration,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: PLACEHOLDER_TOKEN.to_string(),
            admins: vec![],
            poll_timeout: default_poll_timeout(),
            api_url: default_api_url(),
        }
    }
}

fn default_poll_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// 配信時刻 (現地時刻)
    #[serde_as(as = "DisplayFromStr")]
    pub time: NaiveTime,
    #[serde_as(as = "DisplayFromStr")]
    pub timezone: Tz,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default(),
            timezone: chrono_tz::Africa::Addis_Ababa,
        }
    }
}

impl ScheduleConfig {
    pub fn daily(&self) -> DailySchedule {
        DailySchedule {
            at: self.time,
            timezone: self.timezone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReadingsConfig {
    pub gitsawe: PathBuf,
    pub sinksar: PathBuf,
}

impl Default for ReadingsConfig {
    fn default() -> Self {
        Self {
            gitsawe: PathBuf::from("data/Gitsawe.json"),
            sinksar: PathBuf::from("data/Sinksar.json"),
        }
    }
}

impl ReadingsConfig {
    pub fn paths(&self) -> CatalogPaths {
        CatalogPaths {
            gitsawe: self.gitsawe.clone(),
            sinksar: self.sinksar.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SubscribersConfig {
    pub path: PathBuf,
}

impl Default for SubscribersConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/subscribers.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeliveryConfig {
    #[serde(with = "humantime_serde")]
    pub user_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub channel_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub segment_delay: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            user_delay: Duration::from_millis(150),
            channel_delay: Duration::from_millis(200),
            segment_delay: Duration::from_millis(500),
        }
    }
}

impl DeliveryConfig {
    pub fn throttle(&self) -> FixedDelay {
        FixedDelay {
            user: self.user_delay,
            channel: self.channel_delay,
            segment: self.segment_delay,
        }
    }
}

impl TelegramConfig {
    /// 環境変数を優先してトークンを決める。未設定ならエラー。
    pub fn resolve_token(&self, env_token: Option<String>) -> Result<String> {
        let token = env_token
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.token.clone());
        let token = token.trim();
        if token.is_empty() || token == PLACEHOLDER_TOKEN {
            bail!("Telegram bot token is not configured (set telegram.token or {TOKEN_ENV})");
        }
        Ok(token.to_string())
    }

    pub fn is_admin(&self, user_id: Option<u64>) -> bool {
        self.admins.is_empty() || user_id.is_some_and(|id| self.admins.contains(&id))
    }
}

pub fn open_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
    let config: Config = toml::from_str(&content).context("Failed to parse configuration file")?;
    Ok(config)
}

pub fn write_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let content =
        toml::to_string_pretty(&Config::default()).context("Failed to serialize configuration")?;
    fs::write(path.as_ref(), content).context("Failed to write configuration file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_example_config() {
        let content = include_str!("../../../config.example.toml");
        let config: Config = toml::from_str(content).expect("Failed to parse config.example.toml");

        let expected = Config {
            telegram: TelegramConfig {
                token: "YOUR_TELEGRAM_BOT_TOKEN".to_string(),
                admins: vec![123456789],
                poll_timeout: Duration::from_secs(30),
                api_url: "https://api.telegram.org".to_string(),
            },
            schedule: ScheduleConfig {
                time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
                timezone: chrono_tz::Africa::Addis_Ababa,
            },
            readings: ReadingsConfig::default(),
            subscribers: SubscribersConfig::default(),
            delivery: DeliveryConfig::default(),
        };

        assert_eq!(config, expected);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config: Config = toml::from_str("[telegram]\ntoken = \"abc\"\n").unwrap();
        assert_eq!(config.telegram.token, "abc");
        assert!(config.telegram.admins.is_empty());
        assert_eq!(config.schedule, ScheduleConfig::default());
        assert_eq!(config.delivery.segment_delay, Duration::from_millis(500));
    }

    #[test]
    fn telegram_section_is_optional() {
        let config: Config = toml::from_str("[schedule]\ntime = \"07:30:00\"\ntimezone = \"UTC\"\n").unwrap();
        assert_eq!(config.telegram, TelegramConfig::default());
        assert!(config.telegram.resolve_token(None).is_err());
        assert_eq!(
            config
                .telegram
                .resolve_token(Some("123:abc".to_string()))
                .unwrap(),
            "123:abc"
        );

        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn default_config_round_trips() {
        let content = toml::to_string_pretty(&Config::default()).unwrap();
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn rejects_unknown_timezone() {
        let content = "[telegram]\ntoken = \"abc\"\n[schedule]\ntime = \"06:00:00\"\ntimezone = \"Mars/Olympus\"\n";
        assert!(toml::from_str::<Config>(content).is_err());
    }

    #[test]
    fn token_resolution() {
        let telegram = TelegramConfig::default();
        assert!(telegram.resolve_token(None).is_err());
        assert!(telegram.resolve_token(Some("  ".to_string())).is_err());
        assert_eq!(
            telegram.resolve_token(Some("123:abc".to_string())).unwrap(),
            "123:abc"
        );

        let telegram = TelegramConfig {
            token: "456:def".to_string(),
            ..Default::default()
        };
        assert_eq!(telegram.resolve_token(None).unwrap(), "456:def");
    }

    #[test]
    fn admin_allow_list() {
        let open = TelegramConfig::default();
        assert!(open.is_admin(None));
        assert!(open.is_admin(Some(1)));

        let restricted = TelegramConfig {
            admins: vec![42],
            ..Default::default()
        };
        assert!(restricted.is_admin(Some(42)));
        assert!(!restricted.is_admin(Some(1)));
        assert!(!restricted.is_admin(None));
    }
}
