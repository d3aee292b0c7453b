//! End-to-end check-in scenarios against real stores.
//!
//! Each test drives `CheckInEngine` through the public API only and checks
//! both the returned outcome and what ended up persisted.

use checkin_desk::{
    AttendeeRecord, CheckInEngine, CheckInOutcome, CheckInRequest, JsonFileStore, MatchType,
    MemoryStore, RecordStore, RosterRow, SqliteStore, Stats,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn memory_engine(records: Vec<AttendeeRecord>) -> (CheckInEngine, MemoryStore) {
    let store = MemoryStore::new(records);
    (CheckInEngine::new(Box::new(store.clone())), store)
}

fn assert_stats_invariants(stats: &Stats) {
    assert_eq!(
        stats.original_checked_in + stats.new_checked_in,
        stats.checked_in
    );
    assert!(stats.original_checked_in <= stats.total);
}

// ---------------------------------------------------------------------------
// Single-roster scenarios
// ---------------------------------------------------------------------------

#[test]
fn one_digit_typo_asks_for_confirmation() {
    let (engine, store) = memory_engine(vec![AttendeeRecord::imported("A", "111")]);

    let outcome = engine.check_in(&CheckInRequest::new("A", "112")).unwrap();

    match outcome {
        CheckInOutcome::RequiresConfirmation { candidates } => {
            assert_eq!(candidates.len(), 1);
            assert_eq!(candidates[0].name, "A");
            assert_eq!(candidates[0].phone, "111");
            // name also matches, and same-name takes priority over similar-phone
            assert_eq!(candidates[0].match_type, MatchType::SameName);
        }
        other => panic!("expected confirmation, got {:?}", other),
    }
    assert_eq!(store.snapshot(), vec![AttendeeRecord::imported("A", "111")]);
}

#[test]
fn one_digit_typo_under_other_name_is_similar_phone() {
    let (engine, _) = memory_engine(vec![AttendeeRecord::imported("A", "111")]);

    let outcome = engine.check_in(&CheckInRequest::new("B", "112")).unwrap();

    match outcome {
        CheckInOutcome::RequiresConfirmation { candidates } => {
            assert_eq!(candidates.len(), 1);
            assert_eq!(candidates[0].match_type, MatchType::SimilarPhone);
        }
        other => panic!("expected confirmation, got {:?}", other),
    }
}

#[test]
fn confirmed_walk_in_is_excluded_from_roster_total() {
    let (engine, _) = memory_engine(vec![AttendeeRecord::imported("A", "111")]);

    let outcome = engine
        .check_in(&CheckInRequest::new("A", "112").confirm_new())
        .unwrap();
    assert!(matches!(outcome, CheckInOutcome::Success { is_new: true, .. }));

    let stats = engine.stats().unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.checked_in, 1);
    assert_eq!(stats.new_checked_in, 1);
    assert_eq!(stats.original_checked_in, 0);
}

#[test]
fn confirmation_round_trip_claims_roster_entry() {
    let (engine, store) = memory_engine(vec![AttendeeRecord::imported("Ann", "13800000001")]);

    // First request hits a typo
    let first = engine
        .check_in(&CheckInRequest::new("Ann", "13800000007"))
        .unwrap();
    let claimed = match first {
        CheckInOutcome::RequiresConfirmation { candidates } => candidates[0].phone.clone(),
        other => panic!("expected confirmation, got {:?}", other),
    };

    // Operator picks the candidate
    let second = engine
        .check_in(&CheckInRequest::new("Ann", "13800000007").use_existing_phone(claimed))
        .unwrap();
    assert!(matches!(second, CheckInOutcome::Success { is_new: false, .. }));

    // Claiming again is rejected
    let third = engine
        .check_in(&CheckInRequest::new("Ann", "13800000007").use_existing_phone("13800000001"))
        .unwrap();
    assert!(matches!(third, CheckInOutcome::AlreadyCheckedIn { .. }));

    assert_eq!(store.snapshot().len(), 1);
    assert_eq!(engine.stats().unwrap().original_checked_in, 1);
}

#[test]
fn stats_invariants_hold_through_a_desk_session() {
    let (engine, _) = memory_engine(vec![]);
    engine
        .import_roster(vec![
            RosterRow::new("Ann", "13800000001"),
            RosterRow::new("Bo", "13800000002"),
            RosterRow::new("Cy", "13900000003"),
        ])
        .unwrap();

    let requests = [
        CheckInRequest::new("Ann", "13800000001"),
        CheckInRequest::new("Ann", "13800000001"),
        CheckInRequest::new("Dee", "15000000000"),
        CheckInRequest::new("Bo", "13800000009"),
        CheckInRequest::new("Bo", "13800000009").confirm_new(),
        CheckInRequest::new("Cy", "13900000003"),
    ];

    for req in &requests {
        engine.check_in(req).unwrap();
        assert_stats_invariants(&engine.stats().unwrap());
    }

    let stats = engine.stats().unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.checked_in, 4);
    assert_eq!(stats.new_checked_in, 2);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn sqlite_store_persists_check_in_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("desk.db");

    {
        let engine = CheckInEngine::new(Box::new(SqliteStore::open(&path).unwrap()));
        engine
            .import_roster(vec![RosterRow::new("Ann", "13800000001")])
            .unwrap();
        engine
            .check_in(&CheckInRequest::new("Ann", "13800000001"))
            .unwrap();
    }

    let mut reopened = SqliteStore::open(&path).unwrap();
    let records = reopened.load_all().unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_checked_in());
    assert!(records[0].check_in_time.is_some());
}

#[test]
fn json_store_keeps_check_in_time_on_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");

    let engine = CheckInEngine::new(Box::new(JsonFileStore::open(&path).unwrap()))
        .with_clock(|| 1_700_000_000_000);
    engine
        .import_roster(vec![RosterRow::new("Ann", "13800000001")])
        .unwrap();

    engine
        .check_in(&CheckInRequest::new("Ann", "13800000001"))
        .unwrap();
    let again = engine
        .check_in(&CheckInRequest::new("Ann", "13800000001"))
        .unwrap();

    assert_eq!(
        again,
        CheckInOutcome::AlreadyCheckedIn {
            name: "Ann".to_string(),
            check_in_time: Some(1_700_000_000_000),
        }
    );

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw[0]["status"], "checked_in");
    assert_eq!(raw[0]["checkInTime"], 1_700_000_000_000_i64);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn racing_check_ins_on_same_phone_record_once() {
    let (engine, store) = memory_engine(vec![AttendeeRecord::imported("Ann", "13800000001")]);
    let engine = std::sync::Arc::new(engine);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = std::sync::Arc::clone(&engine);
            std::thread::spawn(move || {
                engine
                    .check_in(&CheckInRequest::new("Ann", "13800000001"))
                    .unwrap()
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|o| o.is_success())
        .count();

    assert_eq!(successes, 1);
    assert_eq!(store.snapshot().len(), 1);
}

#[test]
fn racing_walk_ins_are_not_lost() {
    let (engine, store) = memory_engine(vec![]);
    let engine = std::sync::Arc::new(engine);

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let engine = std::sync::Arc::clone(&engine);
            std::thread::spawn(move || {
                // distinct names, phones differ in every position: no candidates
                let phone = i.to_string().repeat(8);
                engine
                    .check_in(&CheckInRequest::new(format!("Guest {}", i), phone))
                    .unwrap()
            })
        })
        .collect();

    for h in handles {
        assert!(h.join().unwrap().is_success());
    }
    assert_eq!(store.snapshot().len(), 10);
}
