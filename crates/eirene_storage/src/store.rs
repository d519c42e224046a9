#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use eirene_kernel_contracts::ph1audit::{AuditEvent, AuditEventId, AuditEventInput, CorrelationId};
use eirene_kernel_contracts::ph1session::{
    ConversationTurnId, ConversationTurnInput, ConversationTurnRecord, SessionDialogueState,
    SessionKey,
};
use eirene_kernel_contracts::{ContractViolation, Validate};

/// Errors surfaced by the store. Contract failures pass through unchanged so
/// callers see the same field/reason pair the validator produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    AppendOnlyViolation { table: &'static str },
    ContractViolation(ContractViolation),
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

fn transcript_hash(text: &str) -> String {
    // First 8 bytes of SHA-256 as hex. Stable across runs and platforms.
    let digest = Sha256::digest(text.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// In-memory companion store. One mutable row per session for dialogue
/// selection state, plus two append-only ledgers: the conversation transcript
/// and the audit trail. Ledger ids are dense, monotonic, and never reused.
#[derive(Debug)]
pub struct EireneStore {
    session_states: BTreeMap<SessionKey, SessionDialogueState>,

    conversation_ledger: Vec<ConversationTurnRecord>,
    next_turn_row: u64,

    audit_log: Vec<AuditEvent>,
    next_audit_row: u64,
}

impl EireneStore {
    pub fn in_memory() -> Self {
        Self {
            session_states: BTreeMap::new(),
            conversation_ledger: Vec::new(),
            next_turn_row: 1,
            audit_log: Vec::new(),
            next_audit_row: 1,
        }
    }

    /// Dialogue selection state for one session, created fresh on first touch.
    pub fn session_state_mut(&mut self, session_key: &SessionKey) -> &mut SessionDialogueState {
        self.session_states
            .entry(session_key.clone())
            .or_insert_with(|| SessionDialogueState::fresh_v1(session_key.clone()))
    }

    pub fn session_state(&self, session_key: &SessionKey) -> Option<&SessionDialogueState> {
        self.session_states.get(session_key)
    }

    pub fn session_state_rows(&self) -> &BTreeMap<SessionKey, SessionDialogueState> {
        &self.session_states
    }

    /// Validate, assign the next row id, and append to the transcript ledger.
    /// The id counter advances only once the row is fully built, so rejected
    /// inputs leave no gap in the sequence.
    pub fn record_conversation_turn(
        &mut self,
        input: ConversationTurnInput,
    ) -> Result<ConversationTurnId, StorageError> {
        input.validate()?;

        let row_id = ConversationTurnId(self.next_turn_row);
        let text_hash = transcript_hash(&input.text);
        let record = ConversationTurnRecord::from_input_v1(row_id, text_hash, input)?;

        self.next_turn_row = self.next_turn_row.saturating_add(1);
        self.conversation_ledger.push(record);
        Ok(row_id)
    }

    pub fn conversation_ledger(&self) -> &[ConversationTurnRecord] {
        &self.conversation_ledger
    }

    /// Transcript rows for one session, in ledger order.
    pub fn conversation_turns_for_session(
        &self,
        session_key: &SessionKey,
    ) -> Vec<&ConversationTurnRecord> {
        self.conversation_ledger
            .iter()
            .filter(|row| &row.session_key == session_key)
            .collect()
    }

    /// Row count for one session across both roles. Turn parity upstream is
    /// derived from this, so companion rows count as much as user rows.
    pub fn conversation_history_len(&self, session_key: &SessionKey) -> u64 {
        self.conversation_ledger
            .iter()
            .filter(|row| &row.session_key == session_key)
            .count() as u64
    }

    /// The transcript ledger has no update path. Any caller reaching for one
    /// gets a refusal naming the table.
    pub fn overwrite_conversation_turn(
        &mut self,
        _row_id: ConversationTurnId,
    ) -> Result<(), StorageError> {
        Err(StorageError::AppendOnlyViolation {
            table: "conversation_ledger",
        })
    }

    /// Validate, assign the next event id, and append to the audit trail.
    /// Same discipline as the transcript ledger: the counter advances only on
    /// success.
    pub fn record_audit_event(
        &mut self,
        input: AuditEventInput,
    ) -> Result<AuditEventId, StorageError> {
        input.validate()?;

        let event_id = AuditEventId(self.next_audit_row);
        let event = AuditEvent::from_input_v1(event_id, input)?;

        self.next_audit_row = self.next_audit_row.saturating_add(1);
        self.audit_log.push(event);
        Ok(event_id)
    }

    pub fn audit_log(&self) -> &[AuditEvent] {
        &self.audit_log
    }

    /// Every audit row stamped with one correlation id, in ledger order.
    pub fn audit_log_for_correlation(&self, correlation_id: CorrelationId) -> Vec<&AuditEvent> {
        self.audit_log
            .iter()
            .filter(|event| event.correlation_id == correlation_id)
            .collect()
    }

    /// The audit trail has no update path either; same refusal, other table.
    pub fn overwrite_audit_event(&mut self, _event_id: AuditEventId) -> Result<(), StorageError> {
        Err(StorageError::AppendOnlyViolation {
            table: "audit_events",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_hash_is_sixteen_hex_chars() {
        let h = transcript_hash("I had a rough day");
        assert_eq!(h.len(), 16);
        assert!(h.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn transcript_hash_is_stable_and_text_sensitive() {
        assert_eq!(transcript_hash("same words"), transcript_hash("same words"));
        assert_ne!(transcript_hash("same words"), transcript_hash("same words."));
        assert_eq!(transcript_hash("").len(), 16);
    }
}
