//! コマンドへの定型返信 (アムハラ語)。すべて Markdown 形式。

use chrono::NaiveTime;

use crate::broadcast::{BroadcastOutcome, BroadcastResult};
use crate::calendar::{DayOffset, EthiopianDate};
use crate::readings::escape_markdown;
use crate::subscribers::Stats;

pub fn day_label(offset: DayOffset) -> &'static str {
    match offset {
        DayOffset::Yesterday => "የትናንት",
        DayOffset::Today => "የዛሬ",
        DayOffset::Tomorrow => "የነገ",
    }
}

const COMMANDS: &str = "\
/today - የዛሬ ንባብ
/yesterday - የትናንት ንባብ
/tomorrow - የነገ ንባብ
/subscribe - ለዕለታዊ ንባብ ለመመዝገብ
/unsubscribe - ምዝገባን ለመሰረዝ
/status - የምዝገባ ሁኔታ
/help - ሙሉ እርዳታ";

const ADMIN_COMMANDS: &str = "\
/broadcast - ለሁሉም ተመዝጋቢዎች መላክ
/stats - የቦት ስታቲስቲክስ
/addchannel <id> - ቻናል ለመጨመር
/removechannel <id> - ቻናል ለማስወገድ
/reload - ንባቦችን እንደገና ለመጫን";

fn clock(at: NaiveTime) -> String {
    at.format("%-H:%M").to_string()
}

pub fn welcome(at: NaiveTime) -> String {
    format!(
        "🙏 *እንኳን ደህና መጡ!*\n\n\
         ይህ ቦት የኢትዮጵያ ኦርቶዶክስ ተዋሕዶ ቤተክርስቲያን የዕለት ንባብ (ግጽዌ እና ስንክሳር) ያቀርባል።\n\n\
         ✅ *አሁን ተመዝግበዋል!* በየቀኑ ጠዋት {} ሰዓት የዕለቱ ንባብ ይላክልዎታል።\n\n\
         *📱 ዋና ትዕዛዞች:*\n{COMMANDS}\n\n\
         *📖 ግጽዌ:* የዕለቱ የመጽሐፍ ቅዱስ ንባብ\n\
         *📜 ስንክሳር:* የቅዱሳን ታሪክ እና ትዝታ\n\n\
         🕊️ ሰላም ይሁንላችሁ!",
        clock(at)
    )
}

pub fn help(at: NaiveTime) -> String {
    format!(
        "📚 *የእርዳታ መረጃ*\n\n\
         ይህ ቦት የኢትዮጵያ ኦርቶዶክስ ተዋሕዶ ቤተክርስቲያን የዕለት ንባብ ያቀርባል።\n\n\
         *📖 ግጽዌ:* የዕለቱ የመጽሐፍ ቅዱስ ንባብ\n\
         *📜 ስንክሳር:* የቅዱሳን ታሪክ እና ትዝታ\n\n\
         *📱 ዋና ትዕዛዞች:*\n/start - ለመመዝገብ እና ቦቱን ለመጀመር\n{COMMANDS}\n\n\
         *⏰ የዕለታዊ ንባብ ጊዜ:*\nበየቀኑ ጠዋት {} ሰዓት\n\n\
         *👨‍💼 የአስተዳዳሪ ትዕዛዞች:*\n{ADMIN_COMMANDS}\n\n\
         ጥያቄ ካለዎት ያነጋግሩን! 🕊️",
        clock(at),
    )
}

pub fn subscription_status(subscribed: bool, today: &EthiopianDate) -> String {
    let status = if subscribed {
        "✅ *ተመዝግበዋል!*\n\nበየቀኑ ጠዋት የዕለቱ ንባብ ይላክልዎታል።"
    } else {
        "❌ *አልተመዘገቡም*\n\nለመመዝገብ /subscribe ይላኩ።"
    };
    format!("{status}\n\n📅 *የዛሬ ኢትዮጵያ ቀን:* {today}")
}

pub fn subscribed() -> &'static str {
    "✅ *ተመዝግበዋል!*\n\nበየቀኑ ጠዋት የዕለቱ ንባብ ይላክልዎታል።\n\n🕊️ _ሰላም ይሁንላችሁ!_"
}

pub fn unsubscribed() -> &'static str {
    "❌ *ምዝገባ ተሰርዟል*\n\nእንደገና ለመመዝገብ /subscribe ይላኩ።"
}

pub fn not_registered() -> &'static str {
    "ℹ️ አልተመዘገቡም። ለመመዝገብ /subscribe ይላኩ።"
}

pub fn stats(stats: &Stats, today: &EthiopianDate) -> String {
    format!(
        "📊 *ስታቲስቲክስ*\n\n\
         👥 ጠቅላላ ተጠቃሚዎች: {}\n\
         ✅ ተመዝጋቢዎች: {}\n\
         📢 ቻናሎች: {}\n\
         📅 የዛሬ ቀን: {}",
        stats.total_users, stats.subscribed_users, stats.channels, today
    )
}

pub fn channel_added(channel_id: &str, added: bool) -> String {
    let id = escape_markdown(channel_id);
    if added {
        format!("✅ ቻናል {id} ታክሏል!")
    } else {
        format!("ℹ️ ቻናል {id} ቀድሞ ተመዝግቧል።")
    }
}

pub fn channel_removed(channel_id: &str, removed: bool) -> String {
    let id = escape_markdown(channel_id);
    if removed {
        format!("❌ ቻናል {id} ተሰርዟል!")
    } else {
        format!("ℹ️ ቻናል {id} አልተገኘም።")
    }
}

pub fn broadcast_started() -> &'static str {
    "📡 *MANUAL BROADCAST:* በመላክ ላይ..."
}

pub fn broadcast_finished(outcome: &BroadcastOutcome) -> String {
    match outcome {
        BroadcastOutcome::Skipped { date } => {
            format!("⚠️ ለ{date} ንባብ ስላልተገኘ ምንም አልተላከም።")
        }
        BroadcastOutcome::Delivered(BroadcastResult {
            attempted,
            succeeded,
            failed,
        }) => format!(
            "✅ *MANUAL BROADCAST ተጠናቅቋል!*\n\n\
             🎯 ተሞክሯል: {attempted}\n\
             📊 የተላኩ: {succeeded}\n\
             ❌ ስህተቶች: {failed}"
        ),
    }
}

pub fn reloaded() -> &'static str {
    "🔄 ንባቦች እንደገና ተጭነዋል።"
}

pub fn reload_failed() -> &'static str {
    "❌ ንባቦችን መጫን አልተቻለም። የቀድሞው መረጃ ጥቅም ላይ ይውላል።"
}

pub fn unauthorized() -> &'static str {
    "⛔ ይህ ትዕዛዝ ለአስተዳዳሪዎች ብቻ ነው።"
}

pub fn acknowledge(text: &str) -> String {
    format!(
        "🙏 *እንኳን ደህና መጡ!*\n\n\
         የላኩልኝን መልእክት ተቀብያለሁ: \"{}\"\n\n\
         /help ን በመጠቀም የምችላቸውን ነገሮች ማየት ይችላሉ።",
        escape_markdown(text)
    )
}

pub fn apology() -> &'static str {
    "⚠️ ስህተት ተከስቷል። እባክዎ ዳግም ይሞክሩ።"
}
