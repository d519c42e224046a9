#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use crate::ph1dialogue::DialoguePhase;
use crate::{ContractViolation, EmotionTag, MonotonicTimeNs, SchemaVersion, Validate};

pub const PH1SESSION_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Upper bound on items in any one selection pool. Keeps per-session state
/// and rotation orders bounded no matter what a content pack ships.
pub const MAX_POOL_ITEMS: usize = 4096;

/// Upper bound on a single stored utterance.
pub const MAX_TRANSCRIPT_BYTES: usize = 65536;

fn require_nonzero(field: &'static str, value: u64) -> Result<(), ContractViolation> {
    if value == 0 {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be > 0",
        });
    }
    Ok(())
}

fn require_schema(field: &'static str, got: SchemaVersion) -> Result<(), ContractViolation> {
    if got != PH1SESSION_CONTRACT_VERSION {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must match PH1SESSION_CONTRACT_VERSION",
        });
    }
    Ok(())
}

fn check_session_key(key: &str) -> Result<(), ContractViolation> {
    if key.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field: "session_key",
            reason: "must not be empty",
        });
    }
    if key.len() > 128 {
        return Err(ContractViolation::InvalidValue {
            field: "session_key",
            reason: "must be <= 128 chars",
        });
    }
    if key.chars().any(|c| c.is_control()) {
        return Err(ContractViolation::InvalidValue {
            field: "session_key",
            reason: "must not contain control characters",
        });
    }
    Ok(())
}

fn check_transcript_len(field: &'static str, text: &str) -> Result<(), ContractViolation> {
    if text.len() > MAX_TRANSCRIPT_BYTES {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be <= 65536 bytes",
        });
    }
    Ok(())
}

/// Opaque caller-chosen session handle. The store keys state rows and the
/// transcript ledger by it; the kernel never parses it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ContractViolation> {
        let key = key.into();
        check_session_key(&key)?;
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for SessionKey {
    fn validate(&self) -> Result<(), ContractViolation> {
        check_session_key(&self.0)
    }
}

/// The five dedup pools a session tracks independently per emotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PoolKind {
    Prefix,
    Response,
    LongForm,
    Followup,
    Question,
}

impl PoolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PoolKind::Prefix => "prefix",
            PoolKind::Response => "response",
            PoolKind::LongForm => "long_form",
            PoolKind::Followup => "followup",
            PoolKind::Question => "question",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationRole {
    User,
    Companion,
}

impl ConversationRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversationRole::User => "user",
            ConversationRole::Companion => "companion",
        }
    }
}

/// Ledger position of one stored turn, assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConversationTurnId(pub u64);

impl Validate for ConversationTurnId {
    fn validate(&self) -> Result<(), ContractViolation> {
        require_nonzero("conversation_turn_id", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurnInput {
    pub schema_version: SchemaVersion,
    pub session_key: SessionKey,
    pub role: ConversationRole,
    pub text: String,
    pub emotion: EmotionTag,
    pub created_at: MonotonicTimeNs,
}

impl ConversationTurnInput {
    pub fn v1(
        session_key: SessionKey,
        role: ConversationRole,
        text: String,
        emotion: EmotionTag,
        created_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let t = Self {
            schema_version: PH1SESSION_CONTRACT_VERSION,
            session_key,
            role,
            text,
            emotion,
            created_at,
        };
        t.validate()?;
        Ok(t)
    }
}

impl Validate for ConversationTurnInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        require_schema("conversation_turn_input.schema_version", self.schema_version)?;
        self.session_key.validate()?;
        // Transcripts arrive as-is; an empty utterance is a valid turn.
        check_transcript_len("conversation_turn_input.text", &self.text)?;
        require_nonzero("conversation_turn_input.created_at", self.created_at.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurnRecord {
    pub schema_version: SchemaVersion,
    pub turn_row_id: ConversationTurnId,
    pub session_key: SessionKey,
    pub role: ConversationRole,
    pub text: String,
    pub text_hash: String,
    pub emotion: EmotionTag,
    pub created_at: MonotonicTimeNs,
}

impl ConversationTurnRecord {
    pub fn from_input_v1(
        turn_row_id: ConversationTurnId,
        text_hash: String,
        input: ConversationTurnInput,
    ) -> Result<Self, ContractViolation> {
        input.validate()?;
        let r = Self {
            schema_version: PH1SESSION_CONTRACT_VERSION,
            turn_row_id,
            session_key: input.session_key,
            role: input.role,
            text: input.text,
            text_hash,
            emotion: input.emotion,
            created_at: input.created_at,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for ConversationTurnRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        require_schema("conversation_turn_record.schema_version", self.schema_version)?;
        self.turn_row_id.validate()?;
        self.session_key.validate()?;
        check_transcript_len("conversation_turn_record.text", &self.text)?;
        if self.text_hash.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "conversation_turn_record.text_hash",
                reason: "must not be empty",
            });
        }
        if self.text_hash.len() > 64 || !self.text_hash.is_ascii() {
            return Err(ContractViolation::InvalidValue {
                field: "conversation_turn_record.text_hash",
                reason: "must be <= 64 ASCII chars",
            });
        }
        require_nonzero("conversation_turn_record.created_at", self.created_at.0)
    }
}

/// Round-robin cursor over one (emotion, phase) body pool. `order` is a
/// shuffled permutation of the pool's indices; `index` is the next slot to
/// serve. `index == order.len()` means the cycle is complete and the next
/// draw reshuffles.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RotationSlot {
    pub order: Vec<u16>,
    pub index: u16,
}

impl Validate for RotationSlot {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.order.len() > MAX_POOL_ITEMS {
            return Err(ContractViolation::InvalidValue {
                field: "rotation_slot.order",
                reason: "must be <= MAX_POOL_ITEMS entries",
            });
        }
        if self.index as usize > self.order.len() {
            return Err(ContractViolation::InvalidValue {
                field: "rotation_slot.index",
                reason: "must be <= order length",
            });
        }
        let mut seen = BTreeSet::new();
        for idx in &self.order {
            if *idx as usize >= self.order.len() {
                return Err(ContractViolation::InvalidValue {
                    field: "rotation_slot.order",
                    reason: "entries must form a permutation of 0..len",
                });
            }
            if !seen.insert(*idx) {
                return Err(ContractViolation::InvalidValue {
                    field: "rotation_slot.order",
                    reason: "entries must not repeat",
                });
            }
        }
        Ok(())
    }
}

/// Per-session selection memory: which pool items a session has already
/// heard, and where each body rotation stands. Created lazily on first
/// reference to a session key; eviction of idle sessions is the host's
/// concern, not modeled here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDialogueState {
    pub schema_version: SchemaVersion,
    pub session_key: SessionKey,
    pub seen: BTreeMap<(PoolKind, EmotionTag), BTreeSet<u16>>,
    pub rotation: BTreeMap<(EmotionTag, DialoguePhase), RotationSlot>,
}

impl SessionDialogueState {
    pub fn fresh_v1(session_key: SessionKey) -> Self {
        Self {
            schema_version: PH1SESSION_CONTRACT_VERSION,
            session_key,
            seen: BTreeMap::new(),
            rotation: BTreeMap::new(),
        }
    }
}

impl Validate for SessionDialogueState {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1SESSION_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "session_dialogue_state.schema_version",
                reason: "must match PH1SESSION_CONTRACT_VERSION",
            });
        }
        self.session_key.validate()?;
        for set in self.seen.values() {
            if set.len() > MAX_POOL_ITEMS {
                return Err(ContractViolation::InvalidValue {
                    field: "session_dialogue_state.seen",
                    reason: "seen-set must be <= MAX_POOL_ITEMS entries",
                });
            }
        }
        for slot in self.rotation.values() {
            slot.validate()?;
        }
        Ok(())
    }
}
