// 🎫 Attendee Record - One row of the guest list
//
// Identity for matching is the phone value, not a generated id.
// Two records may share a name; they are told apart by phone.

use serde::{Deserialize, Serialize};

// ============================================================================
// CHECK-IN STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    /// On the roster, not yet arrived
    #[default]
    Pending,

    /// Marked present (terminal state)
    CheckedIn,
}

impl CheckInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInStatus::Pending => "pending",
            CheckInStatus::CheckedIn => "checked_in",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CheckInStatus::Pending),
            "checked_in" => Some(CheckInStatus::CheckedIn),
            _ => None,
        }
    }

    /// Operator-facing label used in exports
    pub fn label(&self) -> &'static str {
        match self {
            CheckInStatus::Pending => "未签到",
            CheckInStatus::CheckedIn => "已签到",
        }
    }
}

// ============================================================================
// RECORD SOURCE (provenance)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// Loaded from a roster import. Never stored explicitly.
    Imported,

    /// Created at the desk by the resolution engine
    WebScan,

    /// Legacy walk-in tag written by older desk clients
    ScanNew,
}

impl RecordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordSource::Imported => "imported",
            RecordSource::WebScan => "web_scan",
            RecordSource::ScanNew => "scan_new",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "imported" => Some(RecordSource::Imported),
            "web_scan" => Some(RecordSource::WebScan),
            "scan_new" => Some(RecordSource::ScanNew),
            _ => None,
        }
    }
}

// ============================================================================
// ATTENDEE RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeRecord {
    #[serde(default)]
    pub name: String,

    pub phone: String,

    /// Bare imported rows may omit this; absence means pending
    #[serde(default)]
    pub status: CheckInStatus,

    /// Epoch millis, written exactly once on pending -> checked_in
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_time: Option<i64>,

    /// Absence means imported
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<RecordSource>,

    /// True only for walk-ins created by the resolution engine
    #[serde(default)]
    #[serde(skip_serializing_if = "is_false")]
    pub is_new: bool,
}

fn is_false(val: &bool) -> bool {
    !*val
}

impl AttendeeRecord {
    /// A bare roster row: pending, no source, not new
    pub fn imported(name: impl Into<String>, phone: impl Into<String>) -> Self {
        AttendeeRecord {
            name: name.into(),
            phone: phone.into(),
            status: CheckInStatus::Pending,
            check_in_time: None,
            source: None,
            is_new: false,
        }
    }

    /// A walk-in created at the desk, checked in on creation
    pub fn walk_in(name: impl Into<String>, phone: impl Into<String>, now_millis: i64) -> Self {
        AttendeeRecord {
            name: name.into(),
            phone: phone.into(),
            status: CheckInStatus::CheckedIn,
            check_in_time: Some(now_millis),
            source: Some(RecordSource::WebScan),
            is_new: true,
        }
    }

    pub fn is_checked_in(&self) -> bool {
        self.status == CheckInStatus::CheckedIn
    }

    /// Effective provenance (absent source = imported)
    pub fn provenance(&self) -> RecordSource {
        self.source.unwrap_or(RecordSource::Imported)
    }

    /// Walk-in either by flag or by legacy source tag
    pub fn is_walk_in(&self) -> bool {
        self.is_new || self.provenance() == RecordSource::ScanNew
    }

    /// The pending -> checked_in transition. Returns false (and changes nothing)
    /// when the record is already checked in.
    pub fn mark_checked_in(&mut self, now_millis: i64) -> bool {
        if self.is_checked_in() {
            return false;
        }
        self.status = CheckInStatus::CheckedIn;
        self.check_in_time = Some(now_millis);
        true
    }
}
