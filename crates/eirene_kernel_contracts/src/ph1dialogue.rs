#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use crate::ph1audit::{CorrelationId, TurnId};
use crate::ph1risk::RiskScore;
use crate::ph1session::{PoolKind, SessionKey};
use crate::{ContractViolation, EmotionTag, ReasonCodeId, SchemaVersion, Validate};

pub const PH1DIALOGUE_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Conversation phase, a pure function of how many user turns have elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DialoguePhase {
    Initial,
    Exploration,
    Solution,
    Followup,
}

impl DialoguePhase {
    pub const ALL: [DialoguePhase; 4] = [
        DialoguePhase::Initial,
        DialoguePhase::Exploration,
        DialoguePhase::Solution,
        DialoguePhase::Followup,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DialoguePhase::Initial => "initial",
            DialoguePhase::Exploration => "exploration",
            DialoguePhase::Solution => "solution",
            DialoguePhase::Followup => "followup",
        }
    }

    /// Strict label lookup for content-pack keys.
    pub fn from_label(label: &str) -> Option<DialoguePhase> {
        match label.trim().to_ascii_lowercase().as_str() {
            "initial" => Some(DialoguePhase::Initial),
            "exploration" => Some(DialoguePhase::Exploration),
            "solution" => Some(DialoguePhase::Solution),
            "followup" => Some(DialoguePhase::Followup),
            _ => None,
        }
    }
}

/// Seed for every random draw a single engine call performs. The host
/// derives it per session and turn; two calls with equal requests and equal
/// state produce identical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DrawSeed(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvisoryKind {
    Emergency,
    Urgent,
    Suggestion,
    Encouragement,
}

impl AdvisoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AdvisoryKind::Emergency => "EMERGENCY",
            AdvisoryKind::Urgent => "URGENT",
            AdvisoryKind::Suggestion => "SUGGESTION",
            AdvisoryKind::Encouragement => "ENCOURAGEMENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogueCapabilityId {
    ReplyBuild,
    QuestionsBuild,
    SummaryBuild,
}

impl DialogueCapabilityId {
    pub fn as_str(self) -> &'static str {
        match self {
            DialogueCapabilityId::ReplyBuild => "REPLY_BUILD",
            DialogueCapabilityId::QuestionsBuild => "QUESTIONS_BUILD",
            DialogueCapabilityId::SummaryBuild => "SUMMARY_BUILD",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ph1DialogueRequestEnvelope {
    pub schema_version: SchemaVersion,
    pub correlation_id: CorrelationId,
    pub turn_id: TurnId,
    pub draw_seed: DrawSeed,
}

impl Ph1DialogueRequestEnvelope {
    pub fn v1(
        correlation_id: CorrelationId,
        turn_id: TurnId,
        draw_seed: DrawSeed,
    ) -> Result<Self, ContractViolation> {
        let env = Self {
            schema_version: PH1DIALOGUE_CONTRACT_VERSION,
            correlation_id,
            turn_id,
            draw_seed,
        };
        env.validate()?;
        Ok(env)
    }
}

impl Validate for Ph1DialogueRequestEnvelope {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1DIALOGUE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "ph1dialogue_request_envelope.schema_version",
                reason: "must match PH1DIALOGUE_CONTRACT_VERSION",
            });
        }
        self.correlation_id.validate()?;
        self.turn_id.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyBuildRequest {
    pub schema_version: SchemaVersion,
    pub envelope: Ph1DialogueRequestEnvelope,
    /// `None` disables per-session dedup and rotation; selection degrades to
    /// stateless uniform draws.
    pub session_key: Option<SessionKey>,
    pub emotion: EmotionTag,
    pub transcript_text: String,
    /// Stored turn rows for this session (user and companion combined).
    pub history_len: u32,
    pub premium_tier: bool,
}

impl ReplyBuildRequest {
    pub fn v1(
        envelope: Ph1DialogueRequestEnvelope,
        session_key: Option<SessionKey>,
        emotion: EmotionTag,
        transcript_text: String,
        history_len: u32,
        premium_tier: bool,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: PH1DIALOGUE_CONTRACT_VERSION,
            envelope,
            session_key,
            emotion,
            transcript_text,
            history_len,
            premium_tier,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for ReplyBuildRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1DIALOGUE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "reply_build_request.schema_version",
                reason: "must match PH1DIALOGUE_CONTRACT_VERSION",
            });
        }
        self.envelope.validate()?;
        if let Some(k) = &self.session_key {
            k.validate()?;
        }
        if self.transcript_text.len() > 65536 {
            return Err(ContractViolation::InvalidValue {
                field: "reply_build_request.transcript_text",
                reason: "must be <= 65536 bytes",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionsBuildRequest {
    pub schema_version: SchemaVersion,
    pub envelope: Ph1DialogueRequestEnvelope,
    pub session_key: Option<SessionKey>,
    pub emotion: EmotionTag,
    pub turn_count: u32,
    pub premium_tier: bool,
}

impl QuestionsBuildRequest {
    pub fn v1(
        envelope: Ph1DialogueRequestEnvelope,
        session_key: Option<SessionKey>,
        emotion: EmotionTag,
        turn_count: u32,
        premium_tier: bool,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: PH1DIALOGUE_CONTRACT_VERSION,
            envelope,
            session_key,
            emotion,
            turn_count,
            premium_tier,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for QuestionsBuildRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1DIALOGUE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "questions_build_request.schema_version",
                reason: "must match PH1DIALOGUE_CONTRACT_VERSION",
            });
        }
        self.envelope.validate()?;
        if let Some(k) = &self.session_key {
            k.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryBuildRequest {
    pub schema_version: SchemaVersion,
    pub envelope: Ph1DialogueRequestEnvelope,
    pub emotion: EmotionTag,
    pub risk_score: RiskScore,
}

impl SummaryBuildRequest {
    pub fn v1(
        envelope: Ph1DialogueRequestEnvelope,
        emotion: EmotionTag,
        risk_score: RiskScore,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: PH1DIALOGUE_CONTRACT_VERSION,
            envelope,
            emotion,
            risk_score,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for SummaryBuildRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1DIALOGUE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "summary_build_request.schema_version",
                reason: "must match PH1DIALOGUE_CONTRACT_VERSION",
            });
        }
        self.envelope.validate()?;
        self.risk_score.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ph1DialogueRequest {
    ReplyBuild(ReplyBuildRequest),
    QuestionsBuild(QuestionsBuildRequest),
    SummaryBuild(SummaryBuildRequest),
}

impl Validate for Ph1DialogueRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            Ph1DialogueRequest::ReplyBuild(r) => r.validate(),
            Ph1DialogueRequest::QuestionsBuild(r) => r.validate(),
            Ph1DialogueRequest::SummaryBuild(r) => r.validate(),
        }
    }
}

/// One seen-set wraparound observed during selection. Exhaustion is normal
/// operation, not an error; it is surfaced so hosts can audit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolResetNote {
    pub pool: PoolKind,
    pub emotion: EmotionTag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyBuildOk {
    pub schema_version: SchemaVersion,
    pub capability_id: DialogueCapabilityId,
    pub reason_code: ReasonCodeId,
    pub reply_text: String,
    pub phase: DialoguePhase,
    /// True when a gratitude marker short-circuited assembly.
    pub courtesy: bool,
    pub pool_resets: Vec<PoolResetNote>,
}

impl ReplyBuildOk {
    pub fn v1(
        reason_code: ReasonCodeId,
        reply_text: String,
        phase: DialoguePhase,
        courtesy: bool,
        pool_resets: Vec<PoolResetNote>,
    ) -> Result<Self, ContractViolation> {
        let o = Self {
            schema_version: PH1DIALOGUE_CONTRACT_VERSION,
            capability_id: DialogueCapabilityId::ReplyBuild,
            reason_code,
            reply_text,
            phase,
            courtesy,
            pool_resets,
        };
        o.validate()?;
        Ok(o)
    }
}

impl Validate for ReplyBuildOk {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1DIALOGUE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "reply_build_ok.schema_version",
                reason: "must match PH1DIALOGUE_CONTRACT_VERSION",
            });
        }
        if self.capability_id != DialogueCapabilityId::ReplyBuild {
            return Err(ContractViolation::InvalidValue {
                field: "reply_build_ok.capability_id",
                reason: "must be REPLY_BUILD",
            });
        }
        if self.reply_text.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "reply_build_ok.reply_text",
                reason: "must not be empty",
            });
        }
        if self.reply_text.len() > 4096 {
            return Err(ContractViolation::InvalidValue {
                field: "reply_build_ok.reply_text",
                reason: "must be <= 4096 bytes",
            });
        }
        if self.pool_resets.len() > 8 {
            return Err(ContractViolation::InvalidValue {
                field: "reply_build_ok.pool_resets",
                reason: "must be <= 8 entries",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionsBuildOk {
    pub schema_version: SchemaVersion,
    pub capability_id: DialogueCapabilityId,
    pub reason_code: ReasonCodeId,
    pub phase: DialoguePhase,
    pub questions: Vec<String>,
}

impl QuestionsBuildOk {
    pub fn v1(
        reason_code: ReasonCodeId,
        phase: DialoguePhase,
        questions: Vec<String>,
    ) -> Result<Self, ContractViolation> {
        let o = Self {
            schema_version: PH1DIALOGUE_CONTRACT_VERSION,
            capability_id: DialogueCapabilityId::QuestionsBuild,
            reason_code,
            phase,
            questions,
        };
        o.validate()?;
        Ok(o)
    }
}

impl Validate for QuestionsBuildOk {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1DIALOGUE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "questions_build_ok.schema_version",
                reason: "must match PH1DIALOGUE_CONTRACT_VERSION",
            });
        }
        if self.capability_id != DialogueCapabilityId::QuestionsBuild {
            return Err(ContractViolation::InvalidValue {
                field: "questions_build_ok.capability_id",
                reason: "must be QUESTIONS_BUILD",
            });
        }
        if self.questions.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "questions_build_ok.questions",
                reason: "must not be empty",
            });
        }
        if self.questions.len() > 5 {
            return Err(ContractViolation::InvalidValue {
                field: "questions_build_ok.questions",
                reason: "must be <= 5 entries",
            });
        }
        let mut seen = BTreeSet::new();
        for q in &self.questions {
            if q.trim().is_empty() {
                return Err(ContractViolation::InvalidValue {
                    field: "questions_build_ok.questions",
                    reason: "entries must not be empty",
                });
            }
            if q.len() > 512 {
                return Err(ContractViolation::InvalidValue {
                    field: "questions_build_ok.questions",
                    reason: "entry must be <= 512 chars",
                });
            }
            if !seen.insert(q.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "questions_build_ok.questions",
                    reason: "entries must not repeat",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryBuildOk {
    pub schema_version: SchemaVersion,
    pub capability_id: DialogueCapabilityId,
    pub reason_code: ReasonCodeId,
    pub summary_text: String,
    pub advisory: AdvisoryKind,
}

impl SummaryBuildOk {
    pub fn v1(
        reason_code: ReasonCodeId,
        summary_text: String,
        advisory: AdvisoryKind,
    ) -> Result<Self, ContractViolation> {
        let o = Self {
            schema_version: PH1DIALOGUE_CONTRACT_VERSION,
            capability_id: DialogueCapabilityId::SummaryBuild,
            reason_code,
            summary_text,
            advisory,
        };
        o.validate()?;
        Ok(o)
    }
}

impl Validate for SummaryBuildOk {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1DIALOGUE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "summary_build_ok.schema_version",
                reason: "must match PH1DIALOGUE_CONTRACT_VERSION",
            });
        }
        if self.capability_id != DialogueCapabilityId::SummaryBuild {
            return Err(ContractViolation::InvalidValue {
                field: "summary_build_ok.capability_id",
                reason: "must be SUMMARY_BUILD",
            });
        }
        if self.summary_text.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "summary_build_ok.summary_text",
                reason: "must not be empty",
            });
        }
        if self.summary_text.len() > 2048 {
            return Err(ContractViolation::InvalidValue {
                field: "summary_build_ok.summary_text",
                reason: "must be <= 2048 bytes",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ph1DialogueRefuse {
    pub schema_version: SchemaVersion,
    pub capability_id: DialogueCapabilityId,
    pub reason_code: ReasonCodeId,
    pub message: String,
}

impl Ph1DialogueRefuse {
    pub fn v1(
        capability_id: DialogueCapabilityId,
        reason_code: ReasonCodeId,
        message: String,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: PH1DIALOGUE_CONTRACT_VERSION,
            capability_id,
            reason_code,
            message,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for Ph1DialogueRefuse {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1DIALOGUE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "ph1dialogue_refuse.schema_version",
                reason: "must match PH1DIALOGUE_CONTRACT_VERSION",
            });
        }
        if self.message.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "ph1dialogue_refuse.message",
                reason: "must not be empty",
            });
        }
        if self.message.len() > 256 {
            return Err(ContractViolation::InvalidValue {
                field: "ph1dialogue_refuse.message",
                reason: "must be <= 256 chars",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ph1DialogueResponse {
    ReplyBuildOk(ReplyBuildOk),
    QuestionsBuildOk(QuestionsBuildOk),
    SummaryBuildOk(SummaryBuildOk),
    Refuse(Ph1DialogueRefuse),
}

impl Validate for Ph1DialogueResponse {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            Ph1DialogueResponse::ReplyBuildOk(o) => o.validate(),
            Ph1DialogueResponse::QuestionsBuildOk(o) => o.validate(),
            Ph1DialogueResponse::SummaryBuildOk(o) => o.validate(),
            Ph1DialogueResponse::Refuse(r) => r.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> Ph1DialogueRequestEnvelope {
        Ph1DialogueRequestEnvelope::v1(CorrelationId(1), TurnId(1), DrawSeed(42)).unwrap()
    }

    #[test]
    fn phase_labels_round_trip() {
        for phase in DialoguePhase::ALL {
            assert_eq!(DialoguePhase::from_label(phase.as_str()), Some(phase));
        }
        assert_eq!(DialoguePhase::from_label("closing"), None);
    }

    #[test]
    fn reply_request_accepts_stateless_mode() {
        let r = ReplyBuildRequest::v1(
            envelope(),
            None,
            EmotionTag::Sad,
            "i feel heavy today".to_string(),
            0,
            false,
        );
        assert!(r.is_ok());
    }

    #[test]
    fn reply_ok_rejects_empty_text() {
        let o = ReplyBuildOk::v1(
            ReasonCodeId(1),
            "   ".to_string(),
            DialoguePhase::Initial,
            false,
            vec![],
        );
        assert!(o.is_err());
    }

    #[test]
    fn questions_ok_rejects_duplicates() {
        let o = QuestionsBuildOk::v1(
            ReasonCodeId(1),
            DialoguePhase::Initial,
            vec!["how long?".to_string(), "how long?".to_string()],
        );
        assert!(o.is_err());
    }

    #[test]
    fn questions_ok_caps_at_five() {
        let qs = (0..6).map(|i| format!("q{i}")).collect::<Vec<_>>();
        let o = QuestionsBuildOk::v1(ReasonCodeId(1), DialoguePhase::Solution, qs);
        assert!(o.is_err());
    }
}
