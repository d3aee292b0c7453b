// 📋 Roster I/O - Guest list in, check-in sheet out
//
// Import accepts the header spellings desk operators actually use
// (Chinese and English). Export mirrors the sheet handed back after the event.

use crate::record::AttendeeRecord;
use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Header spellings accepted for the name column, in priority order
pub const NAME_HEADERS: &[&str] = &["姓名", "Name", "name"];

/// Header spellings accepted for the phone column, in priority order
pub const PHONE_HEADERS: &[&str] = &["手机", "手机号", "手机号码", "Phone", "phone"];

// ============================================================================
// IMPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRow {
    pub name: String,
    pub phone: String,
}

impl RosterRow {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        RosterRow {
            name: name.into(),
            phone: phone.into(),
        }
    }
}

/// Parse a roster CSV. Per row, the first alias column with a non-empty
/// value wins. Rows without both a name and a phone are skipped.
pub fn read_roster_csv<R: Read>(reader: R) -> Result<Vec<RosterRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read roster header")?.clone();
    let columns = |aliases: &[&str]| -> Vec<usize> {
        aliases
            .iter()
            .filter_map(|alias| headers.iter().position(|h| h.trim_start_matches('\u{feff}') == *alias))
            .collect()
    };
    let name_cols = columns(NAME_HEADERS);
    let phone_cols = columns(PHONE_HEADERS);

    if name_cols.is_empty() || phone_cols.is_empty() {
        anyhow::bail!(
            "Roster needs a name column ({}) and a phone column ({})",
            NAME_HEADERS.join("/"),
            PHONE_HEADERS.join("/")
        );
    }

    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse roster line {}", line + 2))?;

        let pick = |cols: &[usize]| -> Option<String> {
            cols.iter()
                .filter_map(|&i| record.get(i))
                .map(str::trim)
                .find(|v| !v.is_empty())
                .map(str::to_string)
        };

        if let (Some(name), Some(phone)) = (pick(&name_cols), pick(&phone_cols)) {
            rows.push(RosterRow { name, phone });
        }
    }

    Ok(rows)
}

/// Turn import rows into fresh pending records
pub fn rows_to_records(rows: Vec<RosterRow>) -> Vec<AttendeeRecord> {
    rows.into_iter()
        .map(|row| RosterRow {
            name: row.name.trim().to_string(),
            phone: row.phone.trim().to_string(),
        })
        .filter(|row| !row.name.is_empty() && !row.phone.is_empty())
        .map(|row| AttendeeRecord::imported(row.name, row.phone))
        .collect()
}

// ============================================================================
// EXPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "姓名")]
    pub name: String,

    #[serde(rename = "手机号")]
    pub phone: String,

    #[serde(rename = "状态")]
    pub status: String,

    #[serde(rename = "签到时间")]
    pub check_in_time: String,

    #[serde(rename = "新人标记")]
    pub new_flag: String,

    #[serde(rename = "来源")]
    pub provenance: String,
}

impl From<&AttendeeRecord> for ExportRow {
    fn from(rec: &AttendeeRecord) -> Self {
        ExportRow {
            name: rec.name.clone(),
            phone: rec.phone.clone(),
            status: rec.status.label().to_string(),
            check_in_time: rec.check_in_time.map(format_local_time).unwrap_or_default(),
            new_flag: if rec.is_new { "是".to_string() } else { String::new() },
            provenance: (if rec.is_walk_in() { "现场录入" } else { "导入" }).to_string(),
        }
    }
}

/// Export rows in store order
pub fn export_rows(records: &[AttendeeRecord]) -> Vec<ExportRow> {
    records.iter().map(ExportRow::from).collect()
}

pub fn write_export_csv<W: Write>(writer: W, rows: &[ExportRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row).context("Failed to write export row")?;
    }
    wtr.flush()?;
    Ok(())
}

/// Epoch millis rendered in the desk's local time zone
pub fn format_local_time(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => String::new(),
    }
}
