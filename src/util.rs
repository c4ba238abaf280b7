use anyhow::{Context, Result};
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const DISPLAY_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const FILE_STAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute][second]");
const COMPACT_STAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day][hour][minute][second]");

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

/// Local wall-clock time, or UTC when the local offset cannot be determined.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// `2025-08-14 22:30:00`
pub fn display_timestamp(at: OffsetDateTime) -> String {
    at.format(DISPLAY_TIME)
        .unwrap_or_else(|_| "1970-01-01 00:00:00".to_string())
}

/// `20250814_223000`, used in output file names.
pub fn file_stamp(at: OffsetDateTime) -> String {
    at.format(FILE_STAMP)
        .unwrap_or_else(|_| "19700101_000000".to_string())
}

/// `AI-20250814223000`
pub fn default_report_id(at: OffsetDateTime) -> String {
    let stamp = at
        .format(COMPACT_STAMP)
        .unwrap_or_else(|_| "19700101000000".to_string());
    format!("AI-{stamp}")
}
