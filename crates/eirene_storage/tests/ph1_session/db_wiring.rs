#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use eirene_kernel_contracts::ph1session::{
    ConversationRole, ConversationTurnId, ConversationTurnInput, PoolKind, SessionKey,
};
use eirene_kernel_contracts::{EmotionTag, MonotonicTimeNs};
use eirene_storage::repo::{ConversationRepo, SessionStateRepo};
use eirene_storage::store::{EireneStore, StorageError};

fn key(s: &str) -> SessionKey {
    SessionKey::new(s).unwrap()
}

fn turn(session: &str, role: ConversationRole, text: &str, at: u64) -> ConversationTurnInput {
    ConversationTurnInput::v1(
        key(session),
        role,
        text.to_string(),
        EmotionTag::Neutral,
        MonotonicTimeNs(at),
    )
    .unwrap()
}

#[test]
fn at_session_db_01_state_row_created_lazily_and_persists() {
    let mut s = EireneStore::in_memory();
    let k = key("dbw_s_1");

    assert!(s.session_state_row(&k).is_none());

    {
        let state = s.session_state_row_mut(&k);
        assert!(state.seen.is_empty());
        assert!(state.rotation.is_empty());
        state
            .seen
            .entry((PoolKind::Prefix, EmotionTag::Sad))
            .or_default()
            .insert(2);
    }

    let reread = s.session_state_row(&k).expect("row must persist");
    assert_eq!(
        reread.seen[&(PoolKind::Prefix, EmotionTag::Sad)],
        BTreeSet::from([2])
    );
}

#[test]
fn at_session_db_02_state_rows_isolated_per_key() {
    let mut s = EireneStore::in_memory();
    let a = key("dbw_s_a");
    let b = key("dbw_s_b");

    s.session_state_row_mut(&a)
        .seen
        .entry((PoolKind::Question, EmotionTag::Neutral))
        .or_default()
        .insert(7);
    s.session_state_row_mut(&b);

    assert!(!s.session_state_row(&a).unwrap().seen.is_empty());
    assert!(s.session_state_row(&b).unwrap().seen.is_empty());
    assert_eq!(s.session_state_rows().len(), 2);
}

#[test]
fn at_session_db_03_conversation_ids_are_monotonic() {
    let mut s = EireneStore::in_memory();

    let id1 = s
        .append_turn_row(turn("dbw_s_1", ConversationRole::User, "first", 10))
        .unwrap();
    let id2 = s
        .append_turn_row(turn("dbw_s_1", ConversationRole::Companion, "second", 11))
        .unwrap();
    let id3 = s
        .append_turn_row(turn("dbw_s_2", ConversationRole::User, "third", 12))
        .unwrap();

    assert_eq!(id1, ConversationTurnId(1));
    assert_eq!(id2, ConversationTurnId(2));
    assert_eq!(id3, ConversationTurnId(3));
    assert_eq!(s.turn_rows().len(), 3);
}

#[test]
fn at_session_db_04_text_hash_is_deterministic() {
    let mut s = EireneStore::in_memory();

    s.append_turn_row(turn("dbw_s_1", ConversationRole::User, "same words", 10))
        .unwrap();
    s.append_turn_row(turn("dbw_s_2", ConversationRole::User, "same words", 11))
        .unwrap();
    s.append_turn_row(turn("dbw_s_1", ConversationRole::User, "other words", 12))
        .unwrap();

    let rows = s.turn_rows();
    assert_eq!(rows[0].text_hash, rows[1].text_hash);
    assert_ne!(rows[0].text_hash, rows[2].text_hash);
    assert_eq!(rows[0].text_hash.len(), 16);
}

#[test]
fn at_session_db_05_rows_filter_per_session_and_history_counts_both_roles() {
    let mut s = EireneStore::in_memory();

    s.append_turn_row(turn("dbw_s_1", ConversationRole::User, "hello", 10))
        .unwrap();
    s.append_turn_row(turn("dbw_s_1", ConversationRole::Companion, "hi there", 11))
        .unwrap();
    s.append_turn_row(turn("dbw_s_1", ConversationRole::User, "rough day", 12))
        .unwrap();
    s.append_turn_row(turn("dbw_s_2", ConversationRole::User, "unrelated", 13))
        .unwrap();

    let one = key("dbw_s_1");
    let rows = s.turn_rows_for_session(&one);
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.session_key == one));
    assert_eq!(s.turn_count_for_session(&one), 3);
    assert_eq!(s.turn_count_for_session(&key("dbw_s_2")), 1);
    assert_eq!(s.turn_count_for_session(&key("dbw_s_absent")), 0);
}

#[test]
fn at_session_db_06_invalid_turn_input_rejected_as_contract_violation() {
    let mut s = EireneStore::in_memory();

    let bad = ConversationTurnInput {
        created_at: MonotonicTimeNs(0),
        ..turn("dbw_s_1", ConversationRole::User, "hello", 10)
    };
    let err = s.append_turn_row(bad).unwrap_err();
    assert!(matches!(err, StorageError::ContractViolation(_)));
    assert!(s.turn_rows().is_empty());
}

#[test]
fn at_session_db_07_conversation_ledger_is_append_only() {
    let mut s = EireneStore::in_memory();
    s.append_turn_row(turn("dbw_s_1", ConversationRole::User, "hello", 10))
        .unwrap();

    let err = s
        .overwrite_conversation_turn(ConversationTurnId(1))
        .unwrap_err();
    assert_eq!(
        err,
        StorageError::AppendOnlyViolation {
            table: "conversation_ledger",
        }
    );
}

#[test]
fn at_session_db_08_empty_text_is_a_valid_row() {
    let mut s = EireneStore::in_memory();
    s.append_turn_row(turn("dbw_s_1", ConversationRole::User, "", 10))
        .unwrap();

    let rows = s.turn_rows();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].text.is_empty());
    assert!(!rows[0].text_hash.is_empty());
}
