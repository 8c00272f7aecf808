//! ግጽዌ と ስንክሳር の 2 つのカタログを読み込み、日付から該当エントリを引く。

use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use serde::Deserialize;
use serde_with::{DefaultOnNull, MapSkipError, VecSkipError, serde_as};
use thiserror::Error;
use tracing::info;

use crate::calendar::{self, EthiopianDate};

/// カタログの種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    /// 聖書朗読 (ግጽዌ)
    Gitsawe,
    /// 聖人伝 (ስንክሳር)
    Sinksar,
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogKind::Gitsawe => f.write_str("Gitsawe"),
            CatalogKind::Sinksar => f.write_str("Sinksar"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read {kind} catalog at {}", path.display())]
    Read {
        kind: CatalogKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {kind} catalog at {}", path.display())]
    Parse {
        kind: CatalogKind,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// カタログ内の 1 日分のエントリ。
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentRecord {
    /// 月内の日識別子。配列の位置や暦の日とは一致しないことがある。
    pub id: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, rename = "content")]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "main")]
    pub body: Option<String>,
}

/// 型の合わないエントリ (文字列の id など) は読み飛ばし、残りだけを使う。
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
struct MonthEntry {
    #[serde_as(deserialize_as = "DefaultOnNull<VecSkipError<_>>")]
    #[serde(default)]
    days: Vec<ContentRecord>,
}

/// 月名 -> 月のエントリ。
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
struct Catalog {
    #[serde_as(deserialize_as = "MapSkipError<_, _>")]
    months: HashMap<String, MonthEntry>,
}

impl Catalog {
    fn read(kind: CatalogKind, path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            kind,
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
            kind,
            path: path.to_path_buf(),
            source,
        })
    }

    fn find(&self, month: u32, day_id: u32) -> Option<&ContentRecord> {
        let name = calendar::month_name(month)?;
        self.months
            .get(name)?
            .days
            .iter()
            .find(|record| record.id == day_id)
    }

    fn day_count(&self) -> usize {
        self.months.values().map(|m| m.days.len()).sum()
    }
}

#[derive(Debug, Default)]
struct ReadingIndex {
    gitsawe: Catalog,
    sinksar: Catalog,
}

/// 1 日分の検索結果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedReadings {
    pub gitsawe: Option<ContentRecord>,
    pub sinksar: Option<ContentRecord>,
}

impl ResolvedReadings {
    /// どちらかのカタログにエントリがあれば `true`。
    pub fn found(&self) -> bool {
        self.gitsawe.is_some() || self.sinksar.is_some()
    }
}

/// カタログファイルの場所。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPaths {
    pub gitsawe: PathBuf,
    pub sinksar: PathBuf,
}

/// 読み込み済みカタログを保持するリポジトリ。
///
/// 読み込みは 2 つのカタログがどちらも成功した場合のみインデックスを丸ごと差し替える。
/// 失敗時は直前の状態 (未読み込みなら空) のまま残る。
pub struct ContentRepository {
    paths: CatalogPaths,
    index: RwLock<Arc<ReadingIndex>>,
}

impl ContentRepository {
    /// 空のリポジトリを作成する。検索を有効にするには [`load`](Self::load) を呼ぶ。
    pub fn new(paths: CatalogPaths) -> Self {
        Self {
            paths,
            index: RwLock::new(Arc::new(ReadingIndex::default())),
        }
    }

    /// 両カタログを読み込み直す。
    pub fn load(&self) -> Result<(), CatalogError> {
        let gitsawe = Catalog::read(CatalogKind::Gitsawe, &self.paths.gitsawe)?;
        let sinksar = Catalog::read(CatalogKind::Sinksar, &self.paths.sinksar)?;

        info!(
            gitsawe_days = gitsawe.day_count(),
            sinksar_days = sinksar.day_count(),
            "Catalogs loaded"
        );

        let index = Arc::new(ReadingIndex { gitsawe, sinksar });
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = index;
        Ok(())
    }

    /// 月番号と日識別子で両カタログを独立に検索する。
    pub fn resolve(&self, month: u32, day_id: u32) -> ResolvedReadings {
        let index = Arc::clone(&self.index.read().unwrap_or_else(PoisonError::into_inner));

        ResolvedReadings {
            gitsawe: index.gitsawe.find(month, day_id).cloned(),
            sinksar: index.sinksar.find(month, day_id).cloned(),
        }
    }

    pub fn resolve_date(&self, date: &EthiopianDate) -> ResolvedReadings {
        self.resolve(date.month, date.day)
    }
}
