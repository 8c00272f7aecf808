//! 検索結果を Telegram (Markdown) 向けのテキストに整形する。

use std::borrow::Cow;

use crate::calendar::ReadingDay;

use super::{ContentRecord, ResolvedReadings};

/// Telegram の 1 メッセージに収める最大文字数。
pub const MAX_SEGMENT_LEN: usize = 4000;

/// セクション本文の最大文字数。超えた分は省略記号に置き換える。
const MAX_BODY_LEN: usize = 800;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━";
const DOUBLE_RULE: &str = "════════════════════════";

pub const NOT_FOUND: &str = "⚠️ ለዚህ ቀን ንባብ አልተገኘም።";

fn is_reserved(c: char) -> bool {
    matches!(c, '_' | '*' | '[' | ']' | '`')
}

/// Markdown の予約文字をエスケープする。
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if is_reserved(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 太字にする。エンティティの中ではエスケープが効かないので、予約文字は太字の外に出す。
fn bold(text: &str) -> String {
    fn close(out: &mut String, run: &mut String) {
        if !run.is_empty() {
            out.push('*');
            out.push_str(run);
            out.push('*');
            run.clear();
        }
    }

    let mut out = String::with_capacity(text.len() + 2);
    let mut run = String::new();
    for c in text.chars() {
        if is_reserved(c) {
            close(&mut out, &mut run);
            out.push('\\');
            out.push(c);
        } else {
            run.push(c);
        }
    }
    close(&mut out, &mut run);
    out
}

fn truncate(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => Cow::Owned(format!("{}...", &text[..end])),
        None => Cow::Borrowed(text),
    }
}

fn non_empty(text: &Option<String>) -> Option<&str> {
    text.as_deref().filter(|t| !t.is_empty())
}

struct Block {
    heading: &'static str,
    section_marker: &'static str,
}

const GITSAWE_BLOCK: Block = Block {
    heading: "📖 *ግጽዌ - የዕለቱ ንባብ*",
    section_marker: "📌",
};

const SINKSAR_BLOCK: Block = Block {
    heading: "📜 *ስንክሳር - የቅዱሳን ታሪክ*",
    section_marker: "✝️",
};

impl Block {
    fn render(&self, record: &ContentRecord, day: &ReadingDay) -> String {
        let mut out = format!("{}\n📅 {}\n{RULE}\n\n", self.heading, day.ethiopian);

        if let Some(title) = non_empty(&record.title) {
            out.push_str(&format!("{}\n\n", bold(title)));
        }

        for section in &record.sections {
            if let Some(title) = non_empty(&section.title) {
                out.push_str(&format!("{} {}\n", self.section_marker, bold(title)));
            }
            if let Some(body) = non_empty(&section.body) {
                out.push_str(&escape_markdown(&truncate(body, MAX_BODY_LEN)));
                out.push_str("\n\n");
            }
        }

        out
    }
}

/// 1 日分のメッセージを組み立てる。
///
/// ヘッダー (ラベル・グレゴリオ暦・エチオピア暦)、見つかったカタログごとのブロック、
/// どちらも無ければ「見つからない」旨の通知の順に並ぶ。
pub fn compose(readings: &ResolvedReadings, day: &ReadingDay, label: &str) -> String {
    let header = format!(
        "🙏 *{label} መንፈሳዊ ንባብ*\n📅 ግሪጎሪያን: {}\n📅 ኢትዮጵያ: {}\n{DOUBLE_RULE}\n\n",
        day.gregorian.format("%d/%m/%Y"),
        day.ethiopian,
    );

    let mut parts = vec![header];
    if let Some(gitsawe) = &readings.gitsawe {
        parts.push(GITSAWE_BLOCK.render(gitsawe, day));
    }
    if let Some(sinksar) = &readings.sinksar {
        parts.push(SINKSAR_BLOCK.render(sinksar, day));
    }
    if !readings.found() {
        parts.push(NOT_FOUND.to_string());
    }

    parts.join("\n")
}

/// メッセージを行単位で `max_len` 文字以下のセグメントに分割する。
///
/// 行の途中では分割しない。`max_len` を超える 1 行はそのまま 1 セグメントになる。
pub fn split(message: &str, max_len: usize) -> Segments<'_> {
    Segments {
        rest: message,
        max_len,
    }
}

/// [`split`] が返すイテレータ。`clone` すれば先頭からやり直せる。
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    rest: &'a str,
    max_len: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.rest.is_empty() {
            let mut taken = 0;
            let mut width = 0;

            for line in self.rest.split_inclusive('\n') {
                // 改行 1 文字分を含めて数える
                let cost = line.trim_end_matches('\n').chars().count() + 1;
                if taken > 0 && width + cost > self.max_len {
                    break;
                }
                taken += line.len();
                width += cost;
            }

            let (segment, rest) = self.rest.split_at(taken);
            self.rest = rest;

            let segment = skip_blank_lines(segment).trim_end();
            if !segment.is_empty() {
                return Some(segment);
            }
        }
        None
    }
}

/// 先頭の空行 (空白だけの行を含む) を飛ばす。残った行の字下げはそのまま。
fn skip_blank_lines(text: &str) -> &str {
    let mut rest = text;
    while let Some((line, tail)) = rest.split_once('\n') {
        if !line.trim().is_empty() {
            break;
        }
        rest = tail;
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::EthiopianDate;
    use crate::readings::Section;
    use chrono::NaiveDate;

    fn day() -> ReadingDay {
        ReadingDay::new(NaiveDate::from_ymd_opt(2025, 1, 13).unwrap())
    }

    fn record(title: &str, sections: &[(Option<&str>, Option<&str>)]) -> ContentRecord {
        ContentRecord {
            id: 5,
            title: Some(title.to_string()),
            sections: sections
                .iter()
                .map(|(title, body)| Section {
                    title: title.map(str::to_string),
                    body: body.map(str::to_string),
                })
                .collect(),
        }
    }

    #[test]
    fn escapes_reserved_characters() {
        assert_eq!(escape_markdown("a_b*c[d]e`f"), r"a\_b\*c\[d\]e\`f");
        assert_eq!(escape_markdown("ሰላም"), "ሰላም");
    }

    #[test]
    fn header_shows_both_calendars() {
        let day = day();
        assert_eq!(
            day.ethiopian,
            EthiopianDate {
                year: 2017,
                month: 5,
                day: 5
            }
        );

        let message = compose(&ResolvedReadings::default(), &day, "የዛሬ");
        assert!(message.starts_with("🙏 *የዛሬ መንፈሳዊ ንባብ*\n"));
        assert!(message.contains("📅 ግሪጎሪያን: 13/01/2025\n"));
        assert!(message.contains("📅 ኢትዮጵያ: ጥር 5፣ 2017 ዓ.ም.\n"));
        assert!(message.ends_with(NOT_FOUND));
    }

    #[test]
    fn renders_both_blocks_in_order() {
        let readings = ResolvedReadings {
            gitsawe: Some(record("Reading_1", &[(Some("Psalm"), Some("verse *one*"))])),
            sinksar: Some(record("Saint", &[(None, Some("story"))])),
        };
        let message = compose(&readings, &day(), "የነገ");

        let gitsawe = message.find("ግጽዌ").unwrap();
        let sinksar = message.find("ስንክሳር").unwrap();
        assert!(gitsawe < sinksar);
        assert!(message.contains(r"*Reading*\_*1*"));
        assert!(message.contains("📌 *Psalm*\n"));
        assert!(message.contains(r"verse \*one\*"));
        assert!(message.contains("story\n"));
        assert!(!message.contains("✝️"));
        assert!(!message.contains(NOT_FOUND));
    }

    #[test]
    fn reserved_characters_stay_outside_bold() {
        assert_eq!(bold("Psalm"), "*Psalm*");
        assert_eq!(bold("2*2"), r"*2*\**2*");
        assert_eq!(bold("_x_"), r"\_*x*\_");
        assert_eq!(bold(""), "");

        let readings = ResolvedReadings {
            gitsawe: Some(record("2*2", &[(Some("[1]"), Some("body"))])),
            sinksar: None,
        };
        let message = compose(&readings, &day(), "የዛሬ");
        assert!(message.contains("*2*\\**2*\n"));
        assert!(message.contains("📌 \\[*1*\\]\n"));
        assert!(!message.contains(r"*2\*2*"));
    }

    #[test]
    fn skips_empty_fields() {
        let readings = ResolvedReadings {
            gitsawe: None,
            sinksar: Some(ContentRecord {
                id: 1,
                title: Some(String::new()),
                sections: vec![Section {
                    title: None,
                    body: None,
                }],
            }),
        };
        let message = compose(&readings, &day(), "የዛሬ");
        assert!(!message.contains("**"));
        assert!(!message.contains("ግጽዌ"));
    }

    #[test]
    fn truncates_long_bodies() {
        let body = "ሀ".repeat(MAX_BODY_LEN + 50);
        let readings = ResolvedReadings {
            gitsawe: Some(record("T", &[(None, Some(&body))])),
            sinksar: None,
        };
        let message = compose(&readings, &day(), "የዛሬ");

        let expected = format!("{}...\n", "ሀ".repeat(MAX_BODY_LEN));
        assert!(message.contains(&expected));
        assert!(!message.contains(&"ሀ".repeat(MAX_BODY_LEN + 1)));

        assert_eq!(truncate("short", MAX_BODY_LEN), "short");
        assert_eq!(truncate(&"a".repeat(MAX_BODY_LEN), MAX_BODY_LEN).len(), MAX_BODY_LEN);
    }

    #[test]
    fn short_message_is_one_segment() {
        let segments: Vec<_> = split("hello\nworld\n", MAX_SEGMENT_LEN).collect();
        assert_eq!(segments, vec!["hello\nworld"]);
        assert_eq!(split("", MAX_SEGMENT_LEN).count(), 0);
        assert_eq!(split("\n\n  \n", MAX_SEGMENT_LEN).count(), 0);
    }

    #[test]
    fn segments_respect_limit_and_keep_lines() {
        let text: String = (0..300)
            .map(|i| format!("line {i} {}\n", "x".repeat(i % 47)))
            .collect();

        let segments: Vec<_> = split(&text, 200).collect();
        assert!(segments.len() > 1);
        for segment in &segments {
            assert!(segment.chars().count() <= 200, "{segment:?}");
        }
        assert_eq!(segments.join("\n"), text.trim());
    }

    #[test]
    fn indentation_survives_segment_boundaries() {
        let text = "aaaa\n    indented verse\nb";
        let segments: Vec<_> = split(text, 6).collect();
        assert_eq!(segments, vec!["aaaa", "    indented verse", "b"]);
        assert_eq!(segments.join("\n"), text);

        // 境界の空行だけが落ちる
        let segments: Vec<_> = split("one\n\n  \n  two\n", 4).collect();
        assert_eq!(segments, vec!["one", "  two"]);
    }

    #[test]
    fn long_line_passes_through_whole() {
        let long = "y".repeat(50);
        let text = format!("a\n{long}\nb");
        let segments: Vec<_> = split(&text, 10).collect();
        assert_eq!(segments, vec!["a", long.as_str(), "b"]);
    }

    #[test]
    fn segments_are_restartable() {
        let text = "one\ntwo\nthree\nfour\n";
        let segments = split(text, 9);
        let first: Vec<_> = segments.clone().collect();
        let second: Vec<_> = segments.collect();
        assert_eq!(first, second);
        assert_eq!(first, vec!["one\ntwo", "three", "four"]);
    }
}
