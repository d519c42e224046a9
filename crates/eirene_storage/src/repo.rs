#![forbid(unsafe_code)]

use eirene_kernel_contracts::ph1audit::{AuditEvent, AuditEventId, AuditEventInput, CorrelationId};
use eirene_kernel_contracts::ph1session::{
    ConversationTurnId, ConversationTurnInput, ConversationTurnRecord, SessionDialogueState,
    SessionKey,
};

use crate::store::{EireneStore, StorageError};

/// Per-session dialogue selection state, one mutable row per key.
///
/// The kernel owns a concrete [`EireneStore`], but narrower consumers should
/// not see every table at once. Each trait here exposes one table family, so
/// a caller taking `&impl AuditRepo` is honest about what it touches.
pub trait SessionStateRepo {
    /// Row for `session_key`, created fresh on first touch.
    fn session_state_row_mut(&mut self, session_key: &SessionKey) -> &mut SessionDialogueState;

    /// Read-only lookup; `None` until the session has touched its state.
    fn session_state_row(&self, session_key: &SessionKey) -> Option<&SessionDialogueState>;
}

/// Append-only transcript ledger, both roles interleaved in arrival order.
pub trait ConversationRepo {
    fn append_turn_row(
        &mut self,
        input: ConversationTurnInput,
    ) -> Result<ConversationTurnId, StorageError>;

    fn turn_rows(&self) -> &[ConversationTurnRecord];

    fn turn_rows_for_session(&self, session_key: &SessionKey) -> Vec<&ConversationTurnRecord>;

    fn turn_count_for_session(&self, session_key: &SessionKey) -> u64;
}

/// Append-only audit trail keyed by correlation id.
pub trait AuditRepo {
    fn append_audit_entry(&mut self, input: AuditEventInput)
        -> Result<AuditEventId, StorageError>;

    fn audit_entries(&self) -> &[AuditEvent];

    fn audit_entries_for_correlation(&self, correlation_id: CorrelationId) -> Vec<&AuditEvent>;
}

impl SessionStateRepo for EireneStore {
    fn session_state_row_mut(&mut self, session_key: &SessionKey) -> &mut SessionDialogueState {
        self.session_state_mut(session_key)
    }

    fn session_state_row(&self, session_key: &SessionKey) -> Option<&SessionDialogueState> {
        self.session_state(session_key)
    }
}

impl ConversationRepo for EireneStore {
    fn append_turn_row(
        &mut self,
        input: ConversationTurnInput,
    ) -> Result<ConversationTurnId, StorageError> {
        self.record_conversation_turn(input)
    }

    fn turn_rows(&self) -> &[ConversationTurnRecord] {
        self.conversation_ledger()
    }

    fn turn_rows_for_session(&self, session_key: &SessionKey) -> Vec<&ConversationTurnRecord> {
        self.conversation_turns_for_session(session_key)
    }

    fn turn_count_for_session(&self, session_key: &SessionKey) -> u64 {
        self.conversation_history_len(session_key)
    }
}

impl AuditRepo for EireneStore {
    fn append_audit_entry(
        &mut self,
        input: AuditEventInput,
    ) -> Result<AuditEventId, StorageError> {
        self.record_audit_event(input)
    }

    fn audit_entries(&self) -> &[AuditEvent] {
        self.audit_log()
    }

    fn audit_entries_for_correlation(&self, correlation_id: CorrelationId) -> Vec<&AuditEvent> {
        self.audit_log_for_correlation(correlation_id)
    }
}
