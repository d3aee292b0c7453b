// ✅ Check-in State Engine - Resolve identity, record arrival exactly once
//
// Decision order (first matching branch wins):
//   1. Override phone   → claim a specific existing record
//   2. Exact phone      → check in, or reject as already checked in
//   3. Disambiguation   → hand fuzzy candidates back to the operator
//   4. New record       → walk-in, checked in on creation
//
// Every operation holds the store lock for its whole load → decide → persist
// cycle. Disambiguation keeps no server-side state: the follow-up request
// carries `confirm_new` or `use_existing_phone` explicitly.

use crate::db::RecordStore;
use crate::matcher::{find_candidates, mask_phone, Candidate};
use crate::record::AttendeeRecord;
use crate::roster::{export_rows, format_local_time, rows_to_records, ExportRow, RosterRow};
use crate::stats::{compute_stats, Stats};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

// ============================================================================
// REQUEST / OUTCOME
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub phone: String,

    /// Operator confirmed this is a new person; skip disambiguation
    #[serde(default)]
    pub confirm_new: bool,

    /// Operator confirmed this is the roster entry with this phone
    #[serde(default, alias = "useExistingPhoneOverride")]
    pub use_existing_phone: Option<String>,
}

impl CheckInRequest {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        CheckInRequest {
            name: name.into(),
            phone: phone.into(),
            ..Default::default()
        }
    }

    pub fn confirm_new(mut self) -> Self {
        self.confirm_new = true;
        self
    }

    pub fn use_existing_phone(mut self, phone: impl Into<String>) -> Self {
        self.use_existing_phone = Some(phone.into());
        self
    }

    fn validate(&self) -> Option<String> {
        if self.name.trim().is_empty() || self.phone.trim().is_empty() {
            return Some("name and phone are both required".to_string());
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInOutcome {
    /// Record is now checked in
    Success { record: AttendeeRecord, is_new: bool },

    /// Idempotency conflict; nothing changed
    AlreadyCheckedIn {
        name: String,
        check_in_time: Option<i64>,
    },

    /// Ambiguous identity; nothing changed
    RequiresConfirmation { candidates: Vec<Candidate> },

    /// Missing name or phone
    ValidationError { reason: String },
}

impl CheckInOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CheckInOutcome::Success { .. })
    }

    /// One-line message for the operator
    pub fn message(&self) -> String {
        match self {
            CheckInOutcome::Success { record, is_new: true } => {
                format!("Welcome {} (walk-in), checked in", record.name)
            }
            CheckInOutcome::Success { record, .. } => {
                format!("Welcome {}, checked in", record.name)
            }
            CheckInOutcome::AlreadyCheckedIn {
                name,
                check_in_time: Some(t),
            } => format!("{} already checked in at {}", name, format_local_time(*t)),
            CheckInOutcome::AlreadyCheckedIn { name, .. } => {
                format!("{} already checked in", name)
            }
            CheckInOutcome::RequiresConfirmation { candidates } => format!(
                "{} possible match(es) on the roster, confirm identity",
                candidates.len()
            ),
            CheckInOutcome::ValidationError { reason } => reason.clone(),
        }
    }
}

// ============================================================================
// PHONE INDEX
// ============================================================================

/// Phone → position of its first occurrence in the ordered list
struct PhoneIndex<'a> {
    positions: HashMap<&'a str, usize>,
}

impl<'a> PhoneIndex<'a> {
    fn build(records: &'a [AttendeeRecord]) -> Self {
        let mut positions = HashMap::with_capacity(records.len());
        for (i, rec) in records.iter().enumerate() {
            positions.entry(rec.phone.as_str()).or_insert(i);
        }
        PhoneIndex { positions }
    }

    fn position(&self, phone: &str) -> Option<usize> {
        self.positions.get(phone).copied()
    }
}

// ============================================================================
// CHECK-IN ENGINE
// ============================================================================

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

pub struct CheckInEngine {
    store: Mutex<Box<dyn RecordStore>>,

    /// Epoch millis source (default: wall clock)
    clock: Clock,
}

impl CheckInEngine {
    pub fn new(store: Box<dyn RecordStore>) -> Self {
        CheckInEngine {
            store: Mutex::new(store),
            clock: Box::new(|| chrono::Utc::now().timestamp_millis()),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn RecordStore>>> {
        self.store
            .lock()
            .map_err(|_| anyhow!("record store lock poisoned"))
    }

    /// Resolve `req` against the roster and record the check-in.
    ///
    /// Business outcomes come back as `Ok`; only store I/O failures are `Err`,
    /// and those leave the stored list as it was.
    pub fn check_in(&self, req: &CheckInRequest) -> Result<CheckInOutcome> {
        if let Some(reason) = req.validate() {
            return Ok(CheckInOutcome::ValidationError { reason });
        }

        let mut store = self.lock()?;
        let mut records = store.load_all()?;
        let index = PhoneIndex::build(&records);

        // 1. Override: an unknown phone falls through to the exact path
        let override_pos = req
            .use_existing_phone
            .as_deref()
            .filter(|p| !p.is_empty())
            .and_then(|p| index.position(p));

        if let Some(pos) = override_pos {
            drop(index);
            let rec = &mut records[pos];
            if rec.is_checked_in() {
                debug!(phone = %mask_phone(&rec.phone), "override target already checked in");
                return Ok(CheckInOutcome::AlreadyCheckedIn {
                    name: rec.name.clone(),
                    check_in_time: rec.check_in_time,
                });
            }

            rec.mark_checked_in((self.clock)());
            let record = rec.clone();
            store.replace_all(&records)?;
            info!(phone = %mask_phone(&record.phone), "checked in via confirmed identity");
            return Ok(CheckInOutcome::Success {
                record,
                is_new: false,
            });
        }

        // 2. Exact phone
        if let Some(pos) = index.position(&req.phone) {
            drop(index);
            let rec = &mut records[pos];
            if rec.is_checked_in() {
                debug!(phone = %mask_phone(&rec.phone), "duplicate check-in rejected");
                return Ok(CheckInOutcome::AlreadyCheckedIn {
                    name: rec.name.clone(),
                    check_in_time: rec.check_in_time,
                });
            }

            rec.mark_checked_in((self.clock)());
            if rec.name.is_empty() {
                rec.name = req.name.clone();
            }
            let record = rec.clone();
            store.replace_all(&records)?;
            info!(phone = %mask_phone(&record.phone), "checked in");
            return Ok(CheckInOutcome::Success {
                record,
                is_new: false,
            });
        }
        drop(index);

        // 3. Disambiguation
        if !req.confirm_new {
            let matches = find_candidates(&records, &req.name, &req.phone);
            if !matches.fuzzy.is_empty() {
                debug!(
                    phone = %mask_phone(&req.phone),
                    candidates = matches.fuzzy.len(),
                    first_match = matches.fuzzy[0].match_type.as_str(),
                    "identity needs confirmation"
                );
                return Ok(CheckInOutcome::RequiresConfirmation {
                    candidates: matches.fuzzy,
                });
            }
        }

        // 4. Walk-in
        let record = AttendeeRecord::walk_in(req.name.clone(), req.phone.clone(), (self.clock)());
        records.push(record.clone());
        store.replace_all(&records)?;
        info!(phone = %mask_phone(&record.phone), "walk-in registered");

        Ok(CheckInOutcome::Success {
            record,
            is_new: true,
        })
    }

    /// All records, most recent check-in first; never-checked-in rows last
    pub fn list_records(&self) -> Result<Vec<AttendeeRecord>> {
        let mut records = self.lock()?.load_all()?;
        records.sort_by(|a, b| b.check_in_time.cmp(&a.check_in_time));
        Ok(records)
    }

    pub fn stats(&self) -> Result<Stats> {
        let records = self.lock()?.load_all()?;
        Ok(compute_stats(&records))
    }

    /// Replace the whole store with a fresh pending roster
    pub fn import_roster(&self, rows: Vec<RosterRow>) -> Result<usize> {
        let records = rows_to_records(rows);
        self.lock()?.replace_all(&records)?;
        info!(count = records.len(), "roster imported");
        Ok(records.len())
    }

    pub fn export_roster(&self) -> Result<Vec<ExportRow>> {
        let records = self.lock()?.load_all()?;
        Ok(export_rows(&records))
    }
}

// ============================================================================
// TESTS
// ============================================================================
