use const_format::formatcp;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_SHA: &str = env!("VERGEN_GIT_SHA");
pub const BUILD_DATE: &str = env!("VERGEN_BUILD_DATE");

/// `--version` に表示する文字列。
pub fn long_version() -> &'static str {
    formatcp!("{VERSION} (commit {GIT_SHA}, built {BUILD_DATE})")
}

/// Telegram API へのリクエストに付ける User-Agent。
pub fn user_agent() -> &'static str {
    formatcp!("gitsawe/{VERSION}+{GIT_SHA}")
}
