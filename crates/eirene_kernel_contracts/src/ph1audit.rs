#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use crate::ph1session::{ConversationTurnId, SessionKey};
use crate::{ContractViolation, MonotonicTimeNs, ReasonCodeId, SchemaVersion, Validate};

pub const PH1AUDIT_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

const MAX_PAYLOAD_ENTRIES: usize = 16;
const MAX_PAYLOAD_BYTES: usize = 2048;
const MAX_KEY_LEN: usize = 64;
const MAX_VALUE_LEN: usize = 256;
const MAX_ENGINE_LABEL_LEN: usize = 64;

fn require_nonzero(field: &'static str, value: u128) -> Result<(), ContractViolation> {
    if value == 0 {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be > 0",
        });
    }
    Ok(())
}

fn require_schema(field: &'static str, got: SchemaVersion) -> Result<(), ContractViolation> {
    if got != PH1AUDIT_CONTRACT_VERSION {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must match PH1AUDIT_CONTRACT_VERSION",
        });
    }
    Ok(())
}

/// Groups every ledger row one kernel entry point emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CorrelationId(pub u128);

impl Validate for CorrelationId {
    fn validate(&self) -> Result<(), ContractViolation> {
        require_nonzero("correlation_id", self.0)
    }
}

/// 1-based turn counter within a session; sessionless work uses a fixed 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TurnId(pub u64);

impl Validate for TurnId {
    fn validate(&self) -> Result<(), ContractViolation> {
        require_nonzero("turn_id", u128::from(self.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuditEventId(pub u64);

impl Validate for AuditEventId {
    fn validate(&self) -> Result<(), ContractViolation> {
        require_nonzero("audit_event_id", u128::from(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuditEngine {
    Ph1Risk,
    Ph1Dialogue,
    Ph1Plan,
    Kernel,
    Other(String),
}

impl Validate for AuditEngine {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            AuditEngine::Other(label) => {
                if label.trim().is_empty() {
                    return Err(ContractViolation::InvalidValue {
                        field: "audit_engine.other",
                        reason: "must not be empty",
                    });
                }
                if label.len() > MAX_ENGINE_LABEL_LEN {
                    return Err(ContractViolation::InvalidValue {
                        field: "audit_engine.other",
                        reason: "exceeds max length",
                    });
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Ledger event vocabulary: one emission per observable kernel decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditEventType {
    TurnScored,
    EmergencyEscalated,
    ReplyComposed,
    QuestionsDrawn,
    PoolReset,
    SessionClosed,
    PackSwapped,
    Other,
}

impl AuditEventType {
    /// Approved payload keys per event type. `Other` carries no allowlist.
    pub fn allowed_payload_keys(self) -> Option<&'static [&'static str]> {
        match self {
            AuditEventType::TurnScored => {
                Some(&["risk_score", "risk_level", "risk_action", "trigger_count"])
            }
            AuditEventType::EmergencyEscalated => {
                Some(&["risk_score", "risk_action", "region", "resource_count"])
            }
            AuditEventType::ReplyComposed => Some(&["phase", "emotion", "courtesy"]),
            AuditEventType::QuestionsDrawn => Some(&["phase", "emotion", "question_count"]),
            AuditEventType::PoolReset => Some(&["pool", "emotion"]),
            AuditEventType::SessionClosed => Some(&["emotion", "risk_score", "plan_tier"]),
            AuditEventType::PackSwapped => Some(&["pack_id", "revision", "fingerprint"]),
            AuditEventType::Other => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditSeverity {
    Info,
    Warn,
    Error,
}

fn check_key_shape(key: &str) -> Result<(), ContractViolation> {
    if key.len() > MAX_KEY_LEN {
        return Err(ContractViolation::InvalidValue {
            field: "payload_key",
            reason: "must be <= 64 chars",
        });
    }
    let mut bytes = key.bytes();
    let lead_ok = matches!(bytes.next(), Some(b) if b.is_ascii_lowercase());
    let rest_ok = bytes.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if !(lead_ok && rest_ok) {
        return Err(ContractViolation::InvalidValue {
            field: "payload_key",
            reason: "must be lower_snake_case (a-z0-9_)",
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PayloadKey(String);

impl PayloadKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ContractViolation> {
        let key = key.into();
        check_key_shape(&key)?;
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for PayloadKey {
    fn validate(&self) -> Result<(), ContractViolation> {
        check_key_shape(&self.0)
    }
}

fn check_value_shape(value: &str) -> Result<(), ContractViolation> {
    if value.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field: "payload_value",
            reason: "must not be empty",
        });
    }
    if value.len() > MAX_VALUE_LEN {
        return Err(ContractViolation::InvalidValue {
            field: "payload_value",
            reason: "must be <= 256 chars",
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadValue(String);

impl PayloadValue {
    pub fn new(value: impl Into<String>) -> Result<Self, ContractViolation> {
        let value = value.into();
        check_value_shape(&value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for PayloadValue {
    fn validate(&self) -> Result<(), ContractViolation> {
        check_value_shape(&self.0)
    }
}

/// Minimal structured payload. Transcript text never lands here; labels,
/// scores, and counts only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditPayloadMin {
    pub schema_version: SchemaVersion,
    pub entries: BTreeMap<PayloadKey, PayloadValue>,
}

impl AuditPayloadMin {
    pub fn empty_v1() -> Self {
        Self {
            schema_version: PH1AUDIT_CONTRACT_VERSION,
            entries: BTreeMap::new(),
        }
    }

    pub fn v1(entries: BTreeMap<PayloadKey, PayloadValue>) -> Result<Self, ContractViolation> {
        let payload = Self {
            schema_version: PH1AUDIT_CONTRACT_VERSION,
            entries,
        };
        payload.validate()?;
        Ok(payload)
    }
}

impl Validate for AuditPayloadMin {
    fn validate(&self) -> Result<(), ContractViolation> {
        require_schema("audit_payload_min.schema_version", self.schema_version)?;
        if self.entries.len() > MAX_PAYLOAD_ENTRIES {
            return Err(ContractViolation::InvalidValue {
                field: "audit_payload_min.entries",
                reason: "must be <= 16 entries",
            });
        }
        let mut total_bytes = 0usize;
        for (key, value) in &self.entries {
            key.validate()?;
            value.validate()?;
            total_bytes += key.as_str().len() + value.as_str().len();
        }
        if total_bytes > MAX_PAYLOAD_BYTES {
            return Err(ContractViolation::InvalidRange {
                field: "audit_payload_min",
                got: total_bytes as f64,
                min: 0.0,
                max: MAX_PAYLOAD_BYTES as f64,
            });
        }
        Ok(())
    }
}

fn check_allowlist(
    field: &'static str,
    event_type: AuditEventType,
    payload: &AuditPayloadMin,
) -> Result<(), ContractViolation> {
    let Some(allowed) = event_type.allowed_payload_keys() else {
        return Ok(());
    };
    for key in payload.entries.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(ContractViolation::InvalidValue {
                field,
                reason: "key not allowed for this event_type",
            });
        }
    }
    Ok(())
}

/// Event as handed to the store; `AuditEvent` is the same row plus the
/// assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEventInput {
    pub schema_version: SchemaVersion,
    pub created_at: MonotonicTimeNs,
    /// `None` for sessionless work such as pack swaps.
    pub session_key: Option<SessionKey>,
    pub engine: AuditEngine,
    pub event_type: AuditEventType,
    /// Decision path that emitted the event; registry lives with the engine.
    pub reason_code: ReasonCodeId,
    pub severity: AuditSeverity,
    pub correlation_id: CorrelationId,
    pub turn_id: TurnId,
    pub payload_min: AuditPayloadMin,
    /// Stored conversation row the event refers to, when one exists.
    pub turn_ref: Option<ConversationTurnId>,
}

impl AuditEventInput {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        created_at: MonotonicTimeNs,
        session_key: Option<SessionKey>,
        engine: AuditEngine,
        event_type: AuditEventType,
        reason_code: ReasonCodeId,
        severity: AuditSeverity,
        correlation_id: CorrelationId,
        turn_id: TurnId,
        payload_min: AuditPayloadMin,
        turn_ref: Option<ConversationTurnId>,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            schema_version: PH1AUDIT_CONTRACT_VERSION,
            created_at,
            session_key,
            engine,
            event_type,
            reason_code,
            severity,
            correlation_id,
            turn_id,
            payload_min,
            turn_ref,
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for AuditEventInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        require_schema("audit_event_input.schema_version", self.schema_version)?;
        require_nonzero("audit_event_input.created_at", u128::from(self.created_at.0))?;
        if let Some(key) = &self.session_key {
            key.validate()?;
        }
        require_nonzero("audit_event_input.reason_code", u128::from(self.reason_code.0))?;
        self.correlation_id.validate()?;
        self.turn_id.validate()?;
        self.engine.validate()?;
        self.payload_min.validate()?;
        check_allowlist(
            "audit_event_input.payload_min.entries",
            self.event_type,
            &self.payload_min,
        )?;
        if let Some(turn) = &self.turn_ref {
            turn.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub schema_version: SchemaVersion,
    /// Ledger position, assigned by the store at append time.
    pub event_id: AuditEventId,
    pub created_at: MonotonicTimeNs,
    pub session_key: Option<SessionKey>,
    pub engine: AuditEngine,
    pub event_type: AuditEventType,
    pub reason_code: ReasonCodeId,
    pub severity: AuditSeverity,
    pub correlation_id: CorrelationId,
    pub turn_id: TurnId,
    pub payload_min: AuditPayloadMin,
    pub turn_ref: Option<ConversationTurnId>,
}

impl AuditEvent {
    pub fn from_input_v1(
        event_id: AuditEventId,
        input: AuditEventInput,
    ) -> Result<Self, ContractViolation> {
        event_id.validate()?;
        input.validate()?;
        let AuditEventInput {
            schema_version,
            created_at,
            session_key,
            engine,
            event_type,
            reason_code,
            severity,
            correlation_id,
            turn_id,
            payload_min,
            turn_ref,
        } = input;
        Ok(Self {
            schema_version,
            event_id,
            created_at,
            session_key,
            engine,
            event_type,
            reason_code,
            severity,
            correlation_id,
            turn_id,
            payload_min,
            turn_ref,
        })
    }
}

impl Validate for AuditEvent {
    fn validate(&self) -> Result<(), ContractViolation> {
        require_schema("audit_event.schema_version", self.schema_version)?;
        self.event_id.validate()?;
        require_nonzero("audit_event.created_at", u128::from(self.created_at.0))?;
        if let Some(key) = &self.session_key {
            key.validate()?;
        }
        require_nonzero("audit_event.reason_code", u128::from(self.reason_code.0))?;
        self.correlation_id.validate()?;
        self.turn_id.validate()?;
        self.engine.validate()?;
        self.payload_min.validate()?;
        check_allowlist(
            "audit_event.payload_min.entries",
            self.event_type,
            &self.payload_min,
        )?;
        if let Some(turn) = &self.turn_ref {
            turn.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(pairs: &[(&str, &str)]) -> AuditPayloadMin {
        let mut entries = BTreeMap::new();
        for (k, v) in pairs {
            entries.insert(PayloadKey::new(*k).unwrap(), PayloadValue::new(*v).unwrap());
        }
        AuditPayloadMin::v1(entries).unwrap()
    }

    #[test]
    fn payload_entry_count_is_capped_at_sixteen() {
        let entries: BTreeMap<PayloadKey, PayloadValue> = (0..17)
            .map(|i| {
                (
                    PayloadKey::new(format!("k{i}")).unwrap(),
                    PayloadValue::new("v").unwrap(),
                )
            })
            .collect();
        assert!(AuditPayloadMin::v1(entries).is_err());
    }

    #[test]
    fn payload_total_bytes_are_capped() {
        let wide = "x".repeat(250);
        let fits: BTreeMap<PayloadKey, PayloadValue> = (0..8)
            .map(|i| {
                (
                    PayloadKey::new(format!("key_{i}")).unwrap(),
                    PayloadValue::new(wide.clone()).unwrap(),
                )
            })
            .collect();
        assert!(AuditPayloadMin::v1(fits).is_ok());
        let over: BTreeMap<PayloadKey, PayloadValue> = (0..9)
            .map(|i| {
                (
                    PayloadKey::new(format!("key_{i}")).unwrap(),
                    PayloadValue::new(wide.clone()).unwrap(),
                )
            })
            .collect();
        match AuditPayloadMin::v1(over) {
            Err(ContractViolation::InvalidRange { field, got, max, .. }) => {
                assert_eq!(field, "audit_payload_min");
                assert_eq!(got, 2295.0);
                assert_eq!(max, 2048.0);
            }
            other => panic!("expected InvalidRange, got: {other:?}"),
        }
    }

    #[test]
    fn payload_keys_are_lower_snake_ascii() {
        assert!(PayloadKey::new("Phase").is_err());
        assert!(PayloadKey::new("risk score").is_err());
        assert!(PayloadKey::new("_private").is_err());
        assert!(PayloadKey::new("").is_err());
        assert!(PayloadKey::new("risk_score").is_ok());
        assert!(PayloadKey::new("q2").is_ok());
    }

    #[test]
    fn pool_reset_payload_rejects_unknown_key() {
        let err = AuditEventInput::v1(
            MonotonicTimeNs(10),
            None,
            AuditEngine::Ph1Dialogue,
            AuditEventType::PoolReset,
            ReasonCodeId(0x444C_0001),
            AuditSeverity::Info,
            CorrelationId(1),
            TurnId(1),
            payload(&[("pool", "prefix"), ("surprise", "x")]),
            None,
        )
        .unwrap_err();
        match err {
            ContractViolation::InvalidValue { field, reason } => {
                assert_eq!(field, "audit_event_input.payload_min.entries");
                assert_eq!(reason, "key not allowed for this event_type");
            }
            _ => panic!("expected InvalidValue"),
        }
    }

    #[test]
    fn turn_scored_payload_accepts_allowlist_keys() {
        let input = AuditEventInput::v1(
            MonotonicTimeNs(11),
            Some(SessionKey::new("s-1").unwrap()),
            AuditEngine::Ph1Risk,
            AuditEventType::TurnScored,
            ReasonCodeId(0x5249_0001),
            AuditSeverity::Info,
            CorrelationId(2),
            TurnId(2),
            payload(&[
                ("risk_score", "9"),
                ("risk_level", "CRITICAL"),
                ("risk_action", "IMMEDIATE_EMERGENCY"),
                ("trigger_count", "3"),
            ]),
            Some(ConversationTurnId(1)),
        )
        .expect("allowlisted payload must validate");
        let event = AuditEvent::from_input_v1(AuditEventId(1), input).unwrap();
        assert_eq!(event.event_type, AuditEventType::TurnScored);
        assert!(event.validate().is_ok());
    }

    #[test]
    fn other_events_accept_free_form_keys() {
        let input = AuditEventInput::v1(
            MonotonicTimeNs(7),
            None,
            AuditEngine::Other("backfill".to_string()),
            AuditEventType::Other,
            ReasonCodeId(1),
            AuditSeverity::Warn,
            CorrelationId(9),
            TurnId(3),
            payload(&[("anything_goes", "1")]),
            None,
        );
        assert!(input.is_ok());
    }

    #[test]
    fn event_requires_nonzero_ids() {
        let input = AuditEventInput::v1(
            MonotonicTimeNs(1),
            None,
            AuditEngine::Kernel,
            AuditEventType::Other,
            ReasonCodeId(1),
            AuditSeverity::Info,
            CorrelationId(0),
            TurnId(1),
            AuditPayloadMin::empty_v1(),
            None,
        );
        assert!(input.is_err());
    }
}
