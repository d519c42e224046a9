#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use eirene_kernel_contracts::ph1audit::{
    AuditEngine, AuditEventId, AuditEventInput, AuditEventType, AuditPayloadMin, AuditSeverity,
    CorrelationId, PayloadKey, PayloadValue, TurnId,
};
use eirene_kernel_contracts::ph1session::SessionKey;
use eirene_kernel_contracts::{MonotonicTimeNs, ReasonCodeId};
use eirene_storage::repo::AuditRepo;
use eirene_storage::store::{EireneStore, StorageError};

fn payload(pairs: &[(&str, &str)]) -> AuditPayloadMin {
    let mut entries = BTreeMap::new();
    for (k, v) in pairs {
        entries.insert(PayloadKey::new(*k).unwrap(), PayloadValue::new(*v).unwrap());
    }
    AuditPayloadMin::v1(entries).unwrap()
}

fn scored_turn_input(correlation: u128, turn: u64, at: u64) -> AuditEventInput {
    AuditEventInput::v1(
        MonotonicTimeNs(at),
        Some(SessionKey::new("dbw_a_session").unwrap()),
        AuditEngine::Ph1Risk,
        AuditEventType::TurnScored,
        ReasonCodeId(0x5249_0001),
        AuditSeverity::Info,
        CorrelationId(correlation),
        TurnId(turn),
        payload(&[("risk_score", "4"), ("risk_level", "MODERATE")]),
        None,
    )
    .unwrap()
}

#[test]
fn at_audit_db_01_event_ids_are_monotonic_and_rows_ordered() {
    let mut s = EireneStore::in_memory();

    let id1 = s.append_audit_entry(scored_turn_input(1, 1, 10)).unwrap();
    let id2 = s.append_audit_entry(scored_turn_input(1, 2, 11)).unwrap();
    let id3 = s.append_audit_entry(scored_turn_input(2, 1, 12)).unwrap();

    assert_eq!(id1, AuditEventId(1));
    assert_eq!(id2, AuditEventId(2));
    assert_eq!(id3, AuditEventId(3));

    let rows = s.audit_entries();
    assert_eq!(rows.len(), 3);
    assert!(rows.windows(2).all(|w| w[0].event_id < w[1].event_id));
}

#[test]
fn at_audit_db_02_rows_filter_by_correlation() {
    let mut s = EireneStore::in_memory();
    s.append_audit_entry(scored_turn_input(7, 1, 10)).unwrap();
    s.append_audit_entry(scored_turn_input(8, 1, 11)).unwrap();
    s.append_audit_entry(scored_turn_input(7, 2, 12)).unwrap();

    let hits = s.audit_entries_for_correlation(CorrelationId(7));
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|e| e.correlation_id == CorrelationId(7)));
    assert!(s.audit_entries_for_correlation(CorrelationId(9)).is_empty());
}

#[test]
fn at_audit_db_03_zero_correlation_rejected_before_append() {
    let mut s = EireneStore::in_memory();

    let mut bad = scored_turn_input(1, 1, 10);
    bad.correlation_id = CorrelationId(0);
    let err = s.append_audit_entry(bad).unwrap_err();
    assert!(matches!(err, StorageError::ContractViolation(_)));
    assert!(s.audit_entries().is_empty());
}

#[test]
fn at_audit_db_04_payload_outside_allowlist_rejected_before_append() {
    let mut s = EireneStore::in_memory();

    // PoolReset only admits pool/emotion payload keys.
    let bad = AuditEventInput {
        event_type: AuditEventType::PoolReset,
        payload_min: payload(&[("risk_score", "4")]),
        ..scored_turn_input(1, 1, 10)
    };
    let err = s.append_audit_entry(bad).unwrap_err();
    assert!(matches!(err, StorageError::ContractViolation(_)));
    assert!(s.audit_entries().is_empty());
}

#[test]
fn at_audit_db_05_audit_ledger_is_append_only() {
    let mut s = EireneStore::in_memory();
    s.append_audit_entry(scored_turn_input(1, 1, 10)).unwrap();

    let err = s.overwrite_audit_event(AuditEventId(1)).unwrap_err();
    assert_eq!(
        err,
        StorageError::AppendOnlyViolation {
            table: "audit_events",
        }
    );
    assert_eq!(s.audit_entries().len(), 1);
}

#[test]
fn at_audit_db_06_failed_append_does_not_burn_ledger_order() {
    let mut s = EireneStore::in_memory();

    s.append_audit_entry(scored_turn_input(1, 1, 10)).unwrap();
    let mut bad = scored_turn_input(1, 2, 11);
    bad.correlation_id = CorrelationId(0);
    let _ = s.append_audit_entry(bad);
    let id = s.append_audit_entry(scored_turn_input(1, 3, 12)).unwrap();

    // Validation happens before id allocation, so the sequence stays dense.
    assert_eq!(id, AuditEventId(2));
}
