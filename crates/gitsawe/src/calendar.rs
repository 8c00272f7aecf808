//! グレゴリオ暦とエチオピア暦の相互変換を提供する。
//!
//! 両暦ともユリウス通日 (JDN) を経由して変換する。
//! 演算はすべて整数の床除算で行い、浮動小数点は使わない。

use std::fmt;

use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;

/// エチオピア暦 1 年メスケレム 1 日のユリウス通日。
const ETHIOPIAN_EPOCH: i64 = 1_724_221;

/// カタログのキーとして使う月名 (ラテン文字表記)。
pub const MONTHS: [&str; 13] = [
    "Meskerem", "Tikimt", "Hidar", "Tahsas", "Tir", "Yekatit", "Megabit", "Miazia", "Ginbot",
    "Sene", "Hamle", "Nehasse", "Pagume",
];

/// 表示用の月名 (アムハラ語)。
pub const MONTHS_AMHARIC: [&str; 13] = [
    "መስከረም", "ጥቅምት", "ኅዳር", "ታኅሳስ", "ጥር", "የካቲት", "መጋቢት", "ሚያዝያ", "ግንቦት", "ሰኔ", "ሐምሌ",
    "ነሐሴ", "ጳጉሜ",
];

/// エチオピア暦の日付。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EthiopianDate {
    pub year: i64,
    /// 1..=13。13 月 (ጳጉሜ) は 5 日、閏年は 6 日。
    pub month: u32,
    pub day: u32,
}

/// グレゴリオ暦の日付。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GregorianDate {
    pub year: i64,
    pub month: u32,
    pub day: u32,
}

impl EthiopianDate {
    /// 表示用のアムハラ語の月名を返す。
    pub fn month_name_amharic(&self) -> Option<&'static str> {
        self.month
            .checked_sub(1)
            .and_then(|i| MONTHS_AMHARIC.get(i as usize))
            .copied()
    }
}

impl fmt::Display for EthiopianDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let month = self.month_name_amharic().unwrap_or("?");
        write!(f, "{} {}፣ {} ዓ.ም.", month, self.day, self.year)
    }
}

impl GregorianDate {
    pub fn to_naive(self) -> Option<NaiveDate> {
        let year = i32::try_from(self.year).ok()?;
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }
}

impl From<NaiveDate> for GregorianDate {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: i64::from(date.year()),
            month: date.month(),
            day: date.day(),
        }
    }
}

/// 月番号 (1..=13) からカタログ用の月名を引く。範囲外なら `None`。
pub fn month_name(month: u32) -> Option<&'static str> {
    month
        .checked_sub(1)
        .and_then(|i| MONTHS.get(i as usize))
        .copied()
}

pub fn is_ethiopian_leap_year(year: i64) -> bool {
    (year + 1).rem_euclid(4) == 0
}

pub fn gregorian_to_jdn(date: GregorianDate) -> i64 {
    let month = i64::from(date.month);
    let day = i64::from(date.day);

    let a = (14 - month).div_euclid(12);
    let y = date.year + 4800 - a;
    let m = month + 12 * a - 3;

    day + (153 * m + 2).div_euclid(5) + 365 * y + y.div_euclid(4) - y.div_euclid(100)
        + y.div_euclid(400)
        - 32045
}

pub fn jdn_to_gregorian(jdn: i64) -> GregorianDate {
    let a = jdn + 32044;
    let b = (4 * a + 3).div_euclid(146_097);
    let c = a - (146_097 * b).div_euclid(4);
    let d = (4 * c + 3).div_euclid(1461);
    let e = c - (1461 * d).div_euclid(4);
    let m = (5 * e + 2).div_euclid(153);

    let day = e - (153 * m + 2).div_euclid(5) + 1;
    let month = m + 3 - 12 * m.div_euclid(10);
    let year = 100 * b + d - 4800 + m.div_euclid(10);

    GregorianDate {
        year,
        month: month as u32,
        day: day as u32,
    }
}

pub fn ethiopian_to_jdn(date: EthiopianDate) -> i64 {
    ETHIOPIAN_EPOCH - 1
        + 365 * (date.year - 1)
        + date.year.div_euclid(4)
        + 30 * (i64::from(date.month) - 1)
        + i64::from(date.day)
}

pub fn jdn_to_ethiopian(jdn: i64) -> EthiopianDate {
    let year = (4 * (jdn - ETHIOPIAN_EPOCH) + 1463).div_euclid(1461);
    let new_year = ethiopian_to_jdn(EthiopianDate {
        year,
        month: 1,
        day: 1,
    });
    let month = (jdn - new_year).div_euclid(30) + 1;
    let day = jdn - new_year - 30 * (month - 1) + 1;

    EthiopianDate {
        year,
        month: month as u32,
        day: day as u32,
    }
}

pub fn gregorian_to_ethiopian(date: GregorianDate) -> EthiopianDate {
    jdn_to_ethiopian(gregorian_to_jdn(date))
}

pub fn ethiopian_to_gregorian(date: EthiopianDate) -> GregorianDate {
    jdn_to_gregorian(ethiopian_to_jdn(date))
}

/// 基準日からの相対的な日。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOffset {
    Yesterday,
    Today,
    Tomorrow,
}

impl DayOffset {
    /// グレゴリオ暦の上で日をずらす。月末・年末をまたいでも正しく進む。
    pub fn apply(self, date: NaiveDate) -> NaiveDate {
        let shifted = match self {
            DayOffset::Yesterday => date.pred_opt(),
            DayOffset::Today => Some(date),
            DayOffset::Tomorrow => date.succ_opt(),
        };
        shifted.unwrap_or(date)
    }
}

/// 指定タイムゾーンでの現在の日付を取得する。
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// チャット表示や検索に使う 1 日分の日付の組。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingDay {
    pub gregorian: NaiveDate,
    pub ethiopian: EthiopianDate,
}

impl ReadingDay {
    pub fn new(gregorian: NaiveDate) -> Self {
        Self {
            gregorian,
            ethiopian: gregorian_to_ethiopian(gregorian.into()),
        }
    }

    pub fn relative_to(today: NaiveDate, offset: DayOffset) -> Self {
        Self::new(offset.apply(today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greg(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn eth(year: i64, month: u32, day: u32) -> EthiopianDate {
        EthiopianDate { year, month, day }
    }

    #[test]
    fn known_dates() {
        // 新年 (閏年の翌年は 9/12 に始まる)
        assert_eq!(ReadingDay::new(greg(2024, 9, 11)).ethiopian, eth(2017, 1, 1));
        assert_eq!(ReadingDay::new(greg(2023, 9, 12)).ethiopian, eth(2016, 1, 1));
        assert_eq!(ReadingDay::new(greg(2023, 9, 11)).ethiopian, eth(2015, 13, 6));
        // ገና
        assert_eq!(ReadingDay::new(greg(2025, 1, 7)).ethiopian, eth(2017, 4, 29));
        assert_eq!(ReadingDay::new(greg(2026, 10, 19)).ethiopian, eth(2019, 2, 9));
    }

    #[test]
    fn round_trip_over_two_centuries() {
        for date in greg(1900, 1, 1).iter_days().take_while(|d| d.year() < 2100) {
            let ethiopian = gregorian_to_ethiopian(date.into());
            let back = ethiopian_to_gregorian(ethiopian).to_naive();
            assert_eq!(back, Some(date), "round trip failed for {date}");
        }
    }

    #[test]
    fn pagume_length_follows_leap_rule() {
        for year in 1890..2100 {
            let last_regular = ethiopian_to_jdn(eth(year, 13, 5));
            let after = jdn_to_ethiopian(last_regular + 1);
            if is_ethiopian_leap_year(year) {
                assert_eq!(after, eth(year, 13, 6));
                assert_eq!(jdn_to_ethiopian(last_regular + 2), eth(year + 1, 1, 1));
            } else {
                assert_eq!(after, eth(year + 1, 1, 1));
            }
        }
    }

    #[test]
    fn leap_years() {
        assert!(is_ethiopian_leap_year(2011));
        assert!(is_ethiopian_leap_year(2015));
        assert!(!is_ethiopian_leap_year(2016));
        assert!(!is_ethiopian_leap_year(2017));
        assert!(is_ethiopian_leap_year(-1));
    }

    #[test]
    fn adjacent_days_cross_new_year() {
        let pagume_last = greg(2023, 9, 11);
        let tomorrow = ReadingDay::relative_to(pagume_last, DayOffset::Tomorrow);
        assert_eq!(tomorrow.ethiopian, eth(2016, 1, 1));

        let yesterday = ReadingDay::relative_to(tomorrow.gregorian, DayOffset::Yesterday);
        assert_eq!(yesterday.ethiopian, eth(2015, 13, 6));

        for date in greg(2019, 12, 25).iter_days().take(800) {
            let there = DayOffset::Tomorrow.apply(date);
            assert_eq!(DayOffset::Yesterday.apply(there), date);
            let back = DayOffset::Yesterday.apply(date);
            assert_eq!(DayOffset::Tomorrow.apply(back), date);
        }
    }

    #[test]
    fn month_names() {
        assert_eq!(month_name(5), Some("Tir"));
        assert_eq!(month_name(13), Some("Pagume"));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(14), None);
        assert_eq!(eth(2017, 5, 5).month_name_amharic(), Some("ጥር"));
    }

    #[test]
    fn display_in_amharic() {
        assert_eq!(eth(2017, 5, 5).to_string(), "ጥር 5፣ 2017 ዓ.ም.");
    }
}
