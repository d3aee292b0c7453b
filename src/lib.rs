// Check-in Desk - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod record;
pub mod db;
pub mod matcher;   // Identity Matcher - exact / similar phone / same name
pub mod checkin;   // Check-in State Engine
pub mod stats;     // Stats Projector
pub mod roster;    // Roster CSV import / export
pub mod config;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use record::{AttendeeRecord, CheckInStatus, RecordSource};
pub use db::{open_store, JsonFileStore, MemoryStore, RecordStore, SqliteStore};
pub use matcher::{find_candidates, mask_phone, phone_distance, Candidate, MatchResult, MatchType};
pub use checkin::{CheckInEngine, CheckInOutcome, CheckInRequest};
pub use stats::{compute_stats, Stats};
pub use roster::{export_rows, read_roster_csv, write_export_csv, ExportRow, RosterRow};
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
