//! 受信テキストをコマンドに変換する。

/// ボットが受け付けるコマンド。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Today,
    Yesterday,
    Tomorrow,
    Subscribe,
    Unsubscribe,
    Status,
    Stats,
    Broadcast,
    AddChannel(String),
    RemoveChannel(String),
    Reload,
    /// コマンドとして解釈できなかったテキスト
    Unknown(String),
}

impl Command {
    /// テキストを解析する。`/today@BotName` のようなボット名付きの形式も受け付ける。
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let (head, args) = match text.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (text, ""),
        };

        let Some(name) = head.strip_prefix('/') else {
            return Command::Unknown(text.to_string());
        };
        let name = name.split_once('@').map_or(name, |(name, _)| name);

        match (name, args) {
            ("start", _) => Command::Start,
            ("help", _) => Command::Help,
            ("today", _) => Command::Today,
            ("yesterday", _) => Command::Yesterday,
            ("tomorrow", _) => Command::Tomorrow,
            ("subscribe", _) => Command::Subscribe,
            ("unsubscribe", _) => Command::Unsubscribe,
            ("status", _) => Command::Status,
            ("stats", _) => Command::Stats,
            ("broadcast", _) => Command::Broadcast,
            ("reload", _) => Command::Reload,
            ("addchannel", id) if !id.is_empty() => Command::AddChannel(id.to_string()),
            ("removechannel", id) if !id.is_empty() => Command::RemoveChannel(id.to_string()),
            _ => Command::Unknown(text.to_string()),
        }
    }

    /// ログ出力用の名前。
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Today => "today",
            Command::Yesterday => "yesterday",
            Command::Tomorrow => "tomorrow",
            Command::Subscribe => "subscribe",
            Command::Unsubscribe => "unsubscribe",
            Command::Status => "status",
            Command::Stats => "stats",
            Command::Broadcast => "broadcast",
            Command::AddChannel(_) => "addchannel",
            Command::RemoveChannel(_) => "removechannel",
            Command::Reload => "reload",
            Command::Unknown(_) => "unknown",
        }
    }

    /// 管理者だけが実行できるコマンドか。
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Command::Stats
                | Command::Broadcast
                | Command::AddChannel(_)
                | Command::RemoveChannel(_)
                | Command::Reload
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_commands() {
        assert_eq!(Command::parse("/start"), Command::Start);
        assert_eq!(Command::parse("/help"), Command::Help);
        assert_eq!(Command::parse("/today"), Command::Today);
        assert_eq!(Command::parse(" /yesterday "), Command::Yesterday);
        assert_eq!(Command::parse("/tomorrow"), Command::Tomorrow);
        assert_eq!(Command::parse("/subscribe"), Command::Subscribe);
        assert_eq!(Command::parse("/unsubscribe"), Command::Unsubscribe);
        assert_eq!(Command::parse("/status"), Command::Status);
        assert_eq!(Command::parse("/stats"), Command::Stats);
        assert_eq!(Command::parse("/broadcast"), Command::Broadcast);
        assert_eq!(Command::parse("/reload"), Command::Reload);
    }

    #[test]
    fn parse_bot_mention() {
        assert_eq!(Command::parse("/today@GitsaweBot"), Command::Today);
        assert_eq!(
            Command::parse("/addchannel@GitsaweBot @daily"),
            Command::AddChannel("@daily".to_string())
        );
    }

    #[test]
    fn parse_channel_arguments() {
        assert_eq!(
            Command::parse("/addchannel   -100123  "),
            Command::AddChannel("-100123".to_string())
        );
        assert_eq!(
            Command::parse("/removechannel @daily"),
            Command::RemoveChannel("@daily".to_string())
        );
        assert_eq!(
            Command::parse("/addchannel"),
            Command::Unknown("/addchannel".to_string())
        );
    }

    #[test]
    fn parse_unknown() {
        assert_eq!(
            Command::parse("ሰላም"),
            Command::Unknown("ሰላም".to_string())
        );
        assert_eq!(
            Command::parse("/todayx"),
            Command::Unknown("/todayx".to_string())
        );
        assert_eq!(Command::parse(""), Command::Unknown(String::new()));
    }

    #[test]
    fn admin_commands() {
        assert!(Command::Broadcast.is_admin());
        assert!(Command::AddChannel("x".into()).is_admin());
        assert!(!Command::Today.is_admin());
        assert!(!Command::Unknown("/stats2".into()).is_admin());
    }
}
