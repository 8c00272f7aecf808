//! 日々の朗読 (ግጽዌ・ስንክሳር) の検索と整形を提供する。

mod catalog;
mod compose;

pub use catalog::{CatalogPaths, ContentRecord, ContentRepository, ResolvedReadings, Section};
pub use compose::{MAX_SEGMENT_LEN, NOT_FOUND, compose, escape_markdown, split};
