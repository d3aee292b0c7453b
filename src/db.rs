use crate::record::{AttendeeRecord, CheckInStatus, RecordSource};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Whole-list persistence for the attendee roster.
///
/// There is no partial update primitive: every mutation loads the full list,
/// changes it in memory and writes the whole list back. A failed
/// `replace_all` must leave the previously stored list intact.
pub trait RecordStore: Send {
    fn load_all(&mut self) -> Result<Vec<AttendeeRecord>>;

    fn replace_all(&mut self, records: &[AttendeeRecord]) -> Result<()>;
}

impl<S: RecordStore + ?Sized> RecordStore for Box<S> {
    fn load_all(&mut self) -> Result<Vec<AttendeeRecord>> {
        (**self).load_all()
    }

    fn replace_all(&mut self, records: &[AttendeeRecord]) -> Result<()> {
        (**self).replace_all(records)
    }
}

/// Open a store by file extension: `.json` gets the flat JSON file,
/// anything else is treated as a SQLite database.
pub fn open_store(path: &Path) -> Result<Box<dyn RecordStore>> {
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        Ok(Box::new(JsonFileStore::open(path)?))
    } else {
        Ok(Box::new(SqliteStore::open(path)?))
    }
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM attendees", [], |row| row.get(0))?;
        Ok(count)
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // `position` is the ordering index of the flat list. Phone is indexed
    // for lookups but deliberately not UNIQUE.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendees (
            position INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            phone TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            check_in_time INTEGER,
            source TEXT,
            is_new INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendees_phone ON attendees(phone)",
        [],
    )?;

    Ok(())
}

impl RecordStore for SqliteStore {
    fn load_all(&mut self) -> Result<Vec<AttendeeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, phone, status, check_in_time, source, is_new
             FROM attendees
             ORDER BY position ASC",
        )?;

        let records = stmt
            .query_map([], |row| {
                let status: String = row.get(2)?;
                let source: Option<String> = row.get(4)?;
                let is_new: i64 = row.get(5)?;

                Ok(AttendeeRecord {
                    name: row.get(0)?,
                    phone: row.get(1)?,
                    status: CheckInStatus::parse(&status).unwrap_or_default(),
                    check_in_time: row.get(3)?,
                    source: source.as_deref().and_then(RecordSource::parse),
                    is_new: is_new != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to load attendee list")?;

        Ok(records)
    }

    fn replace_all(&mut self, records: &[AttendeeRecord]) -> Result<()> {
        // Dropping an uncommitted transaction rolls it back, so an error at any
        // row leaves the previous list in place.
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM attendees", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO attendees (position, name, phone, status, check_in_time, source, is_new)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (position, rec) in records.iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    rec.name,
                    rec.phone,
                    rec.status.as_str(),
                    rec.check_in_time,
                    rec.source.map(|s| s.as_str()),
                    rec.is_new as i64,
                ])?;
            }
        }
        tx.commit().context("Failed to write attendee list")?;
        Ok(())
    }
}

// ============================================================================
// JSON FILE STORE (flat db.json layout)
// ============================================================================

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Opens the file, creating it as an empty list when missing.
    pub fn open(path: &Path) -> Result<Self> {
        let store = JsonFileStore {
            path: path.to_path_buf(),
        };
        if !path.exists() {
            store.write_atomic(&[])?;
        }
        Ok(store)
    }

    fn write_atomic(&self, records: &[AttendeeRecord]) -> Result<()> {
        let json = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");

        let mut file = std::fs::File::create(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        file.write_all(&json)?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn load_all(&mut self) -> Result<Vec<AttendeeRecord>> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let records = serde_json::from_slice(&bytes).context("Failed to parse attendee list")?;
        Ok(records)
    }

    fn replace_all(&mut self, records: &[AttendeeRecord]) -> Result<()> {
        self.write_atomic(records)
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// In-process store. Clones share the same list, so a test can keep a
/// handle and inspect what the engine persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<AttendeeRecord>>>,
}

impl MemoryStore {
    pub fn new(records: Vec<AttendeeRecord>) -> Self {
        MemoryStore {
            records: Arc::new(Mutex::new(records)),
        }
    }

    pub fn snapshot(&self) -> Vec<AttendeeRecord> {
        self.records
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default()
    }
}

impl RecordStore for MemoryStore {
    fn load_all(&mut self) -> Result<Vec<AttendeeRecord>> {
        let list = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(list.clone())
    }

    fn replace_all(&mut self, records: &[AttendeeRecord]) -> Result<()> {
        let mut list = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        *list = records.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_roster() -> Vec<AttendeeRecord> {
        vec![
            AttendeeRecord::imported("Zhang Wei", "13800000001"),
            AttendeeRecord::walk_in("Li Na", "13900000002", 1_700_000_000_000),
            AttendeeRecord::imported("", "13700000003"),
        ]
    }

    #[test]
    fn test_sqlite_round_trip_keeps_order_and_fields() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let roster = sample_roster();

        store.replace_all(&roster).unwrap();
        let loaded = store.load_all().unwrap();

        assert_eq!(loaded, roster);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_sqlite_replace_all_discards_previous_list() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.replace_all(&sample_roster()).unwrap();

        store
            .replace_all(&[AttendeeRecord::imported("Only", "100")])
            .unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Only");
    }

    #[test]
    fn test_sqlite_allows_duplicate_phones() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let roster = vec![
            AttendeeRecord::imported("A", "111"),
            AttendeeRecord::imported("B", "111"),
        ];

        store.replace_all(&roster).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_sqlite_failed_write_keeps_previous_list() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.replace_all(&sample_roster()).unwrap();

        // Break the table so the INSERT fails after the DELETE ran
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON attendees
                 WHEN NEW.phone = 'bad' BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let result = store.replace_all(&[AttendeeRecord::imported("X", "bad")]);
        assert!(result.is_err());
        assert_eq!(store.load_all().unwrap(), sample_roster());
    }

    #[test]
    fn test_json_store_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let mut store = JsonFileStore::open(&path).unwrap();

        assert!(path.exists());
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_json_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let mut store = JsonFileStore::open(&path).unwrap();

        store.replace_all(&sample_roster()).unwrap();

        let mut reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.load_all().unwrap(), sample_roster());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_json_store_reads_legacy_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(
            &path,
            r#"[{"name":"A","phone":"1","status":"pending"},
                {"name":"B","phone":"2","status":"checked_in","checkInTime":5,"source":"scan_new"}]"#,
        )
        .unwrap();

        let loaded = JsonFileStore::open(&path).unwrap().load_all().unwrap();

        assert_eq!(loaded[0].provenance(), RecordSource::Imported);
        assert_eq!(loaded[1].source, Some(RecordSource::ScanNew));
        assert!(loaded[1].is_walk_in());
    }

    #[test]
    fn test_open_store_picks_backend_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let mut json = open_store(&dir.path().join("desk.json")).unwrap();
        let mut sqlite = open_store(&dir.path().join("desk.db")).unwrap();

        json.replace_all(&sample_roster()).unwrap();
        sqlite.replace_all(&sample_roster()).unwrap();

        assert!(dir.path().join("desk.json").exists());
        assert_eq!(sqlite.load_all().unwrap(), sample_roster());
    }

    #[test]
    fn test_memory_store_clones_share_state() {
        let store = MemoryStore::default();
        let mut handle = store.clone();

        handle.replace_all(&sample_roster()).unwrap();

        assert_eq!(store.snapshot().len(), 3);
    }
}
