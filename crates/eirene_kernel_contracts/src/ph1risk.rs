#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use crate::ph1audit::{CorrelationId, TurnId};
use crate::{ContractViolation, EmotionTag, ReasonCodeId, SchemaVersion, Validate};

pub const PH1RISK_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Level/action cut points are part of the shared data model: every consumer
/// (triage, summaries, planning) must read the same meaning into a score.
/// Scoring weights, by contrast, are engine configuration.
pub const RISK_MODERATE_CUT: u8 = 3;
pub const RISK_HIGH_CUT: u8 = 6;
pub const RISK_CRITICAL_CUT: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RiskScore(pub u8);

impl RiskScore {
    pub const MAX: RiskScore = RiskScore(10);

    /// Total clamp applied to any accumulated raw score.
    pub fn clamped(raw: u32) -> RiskScore {
        RiskScore(raw.min(RiskScore::MAX.0 as u32) as u8)
    }
}

impl Validate for RiskScore {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 > RiskScore::MAX.0 {
            return Err(ContractViolation::InvalidValue {
                field: "risk_score",
                reason: "must be <= 10",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn for_score(score: RiskScore) -> RiskLevel {
        if score.0 >= RISK_CRITICAL_CUT {
            RiskLevel::Critical
        } else if score.0 >= RISK_HIGH_CUT {
            RiskLevel::High
        } else if score.0 >= RISK_MODERATE_CUT {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskAction {
    Normal,
    FollowUp,
    UrgentConsult,
    ImmediateEmergency,
}

impl RiskAction {
    pub fn for_score(score: RiskScore) -> RiskAction {
        if score.0 >= RISK_CRITICAL_CUT {
            RiskAction::ImmediateEmergency
        } else if score.0 >= RISK_HIGH_CUT {
            RiskAction::UrgentConsult
        } else if score.0 >= RISK_MODERATE_CUT {
            RiskAction::FollowUp
        } else {
            RiskAction::Normal
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskAction::Normal => "NORMAL",
            RiskAction::FollowUp => "FOLLOW_UP",
            RiskAction::UrgentConsult => "URGENT_CONSULT",
            RiskAction::ImmediateEmergency => "IMMEDIATE_EMERGENCY",
        }
    }
}

/// Triage verdict for one utterance. `triggers` lists the matched keyword
/// and phrase texts in first-seen order, deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAssessment {
    pub schema_version: SchemaVersion,
    pub score: RiskScore,
    pub level: RiskLevel,
    pub action: RiskAction,
    pub triggers: Vec<String>,
}

impl RiskAssessment {
    /// Level and action are derived, never supplied by the caller.
    pub fn from_score_v1(
        score: RiskScore,
        triggers: Vec<String>,
    ) -> Result<Self, ContractViolation> {
        let a = Self {
            schema_version: PH1RISK_CONTRACT_VERSION,
            score,
            level: RiskLevel::for_score(score),
            action: RiskAction::for_score(score),
            triggers,
        };
        a.validate()?;
        Ok(a)
    }

    pub fn none_v1() -> Self {
        Self {
            schema_version: PH1RISK_CONTRACT_VERSION,
            score: RiskScore(0),
            level: RiskLevel::Low,
            action: RiskAction::Normal,
            triggers: Vec::new(),
        }
    }
}

impl Validate for RiskAssessment {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1RISK_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "risk_assessment.schema_version",
                reason: "must match PH1RISK_CONTRACT_VERSION",
            });
        }
        self.score.validate()?;
        if self.level != RiskLevel::for_score(self.score) {
            return Err(ContractViolation::InvalidValue {
                field: "risk_assessment.level",
                reason: "must be derived from score",
            });
        }
        if self.action != RiskAction::for_score(self.score) {
            return Err(ContractViolation::InvalidValue {
                field: "risk_assessment.action",
                reason: "must be derived from score",
            });
        }
        if self.triggers.len() > 32 {
            return Err(ContractViolation::InvalidValue {
                field: "risk_assessment.triggers",
                reason: "must be <= 32 entries",
            });
        }
        let mut seen = BTreeSet::new();
        for t in &self.triggers {
            if t.trim().is_empty() {
                return Err(ContractViolation::InvalidValue {
                    field: "risk_assessment.triggers",
                    reason: "entries must not be empty",
                });
            }
            if t.len() > 64 {
                return Err(ContractViolation::InvalidValue {
                    field: "risk_assessment.triggers",
                    reason: "entry must be <= 64 chars",
                });
            }
            if !seen.insert(t.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "risk_assessment.triggers",
                    reason: "entries must not repeat",
                });
            }
        }
        Ok(())
    }
}

/// Region label for emergency-directory lookup. Normalized to ASCII
/// lowercase on construction so pack keys and runtime inputs agree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionTag(String);

impl RegionTag {
    pub fn new(tag: impl Into<String>) -> Result<Self, ContractViolation> {
        let tag = tag.into().trim().to_ascii_lowercase();
        if tag.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "region_tag",
                reason: "must not be empty",
            });
        }
        if tag.len() > 32 {
            return Err(ContractViolation::InvalidValue {
                field: "region_tag",
                reason: "must be <= 32 chars",
            });
        }
        if !tag
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
        {
            return Err(ContractViolation::InvalidValue {
                field: "region_tag",
                reason: "must be ascii [a-z0-9_-]",
            });
        }
        Ok(Self(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for RegionTag {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "region_tag",
                reason: "must not be empty",
            });
        }
        if self.0.len() > 32 {
            return Err(ContractViolation::InvalidValue {
                field: "region_tag",
                reason: "must be <= 32 chars",
            });
        }
        if !self
            .0
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
        {
            return Err(ContractViolation::InvalidValue {
                field: "region_tag",
                reason: "must be ascii [a-z0-9_-]",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyResource {
    pub schema_version: SchemaVersion,
    pub label: String,
    pub contact: String,
}

impl EmergencyResource {
    pub fn v1(label: String, contact: String) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: PH1RISK_CONTRACT_VERSION,
            label,
            contact,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for EmergencyResource {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1RISK_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "emergency_resource.schema_version",
                reason: "must match PH1RISK_CONTRACT_VERSION",
            });
        }
        if self.label.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "emergency_resource.label",
                reason: "must not be empty",
            });
        }
        if self.label.len() > 128 {
            return Err(ContractViolation::InvalidValue {
                field: "emergency_resource.label",
                reason: "must be <= 128 chars",
            });
        }
        if self.contact.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "emergency_resource.contact",
                reason: "must not be empty",
            });
        }
        if self.contact.len() > 128 {
            return Err(ContractViolation::InvalidValue {
                field: "emergency_resource.contact",
                reason: "must be <= 128 chars",
            });
        }
        Ok(())
    }
}

/// Escalation bundle handed to the host when triage demands contact with
/// real-world help. The resource directory may be empty for an unprovisioned
/// region; message and actions never are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyPayload {
    pub schema_version: SchemaVersion,
    pub message: String,
    pub immediate_actions: Vec<String>,
    pub resources: Vec<EmergencyResource>,
}

impl EmergencyPayload {
    pub fn v1(
        message: String,
        immediate_actions: Vec<String>,
        resources: Vec<EmergencyResource>,
    ) -> Result<Self, ContractViolation> {
        let p = Self {
            schema_version: PH1RISK_CONTRACT_VERSION,
            message,
            immediate_actions,
            resources,
        };
        p.validate()?;
        Ok(p)
    }
}

impl Validate for EmergencyPayload {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1RISK_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "emergency_payload.schema_version",
                reason: "must match PH1RISK_CONTRACT_VERSION",
            });
        }
        if self.message.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "emergency_payload.message",
                reason: "must not be empty",
            });
        }
        if self.message.len() > 1024 {
            return Err(ContractViolation::InvalidValue {
                field: "emergency_payload.message",
                reason: "must be <= 1024 chars",
            });
        }
        if self.immediate_actions.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "emergency_payload.immediate_actions",
                reason: "must not be empty",
            });
        }
        if self.immediate_actions.len() > 8 {
            return Err(ContractViolation::InvalidValue {
                field: "emergency_payload.immediate_actions",
                reason: "must be <= 8 entries",
            });
        }
        for a in &self.immediate_actions {
            if a.trim().is_empty() {
                return Err(ContractViolation::InvalidValue {
                    field: "emergency_payload.immediate_actions",
                    reason: "entries must not be empty",
                });
            }
            if a.len() > 256 {
                return Err(ContractViolation::InvalidValue {
                    field: "emergency_payload.immediate_actions",
                    reason: "entry must be <= 256 chars",
                });
            }
        }
        if self.resources.len() > 16 {
            return Err(ContractViolation::InvalidValue {
                field: "emergency_payload.resources",
                reason: "must be <= 16 entries",
            });
        }
        for r in &self.resources {
            r.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskCapabilityId {
    RiskAnalyze,
    EmergencyPayloadBuild,
}

impl RiskCapabilityId {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskCapabilityId::RiskAnalyze => "RISK_ANALYZE",
            RiskCapabilityId::EmergencyPayloadBuild => "EMERGENCY_PAYLOAD_BUILD",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ph1RiskRequestEnvelope {
    pub schema_version: SchemaVersion,
    pub correlation_id: CorrelationId,
    pub turn_id: TurnId,
}

impl Ph1RiskRequestEnvelope {
    pub fn v1(correlation_id: CorrelationId, turn_id: TurnId) -> Result<Self, ContractViolation> {
        let env = Self {
            schema_version: PH1RISK_CONTRACT_VERSION,
            correlation_id,
            turn_id,
        };
        env.validate()?;
        Ok(env)
    }
}

impl Validate for Ph1RiskRequestEnvelope {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1RISK_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "ph1risk_request_envelope.schema_version",
                reason: "must match PH1RISK_CONTRACT_VERSION",
            });
        }
        self.correlation_id.validate()?;
        self.turn_id.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAnalyzeRequest {
    pub schema_version: SchemaVersion,
    pub envelope: Ph1RiskRequestEnvelope,
    pub transcript_text: String,
    pub emotion: EmotionTag,
    /// Classifier confidence. Out-of-range and non-finite values are
    /// tolerated here; the engine clamps before use.
    pub emotion_confidence: f32,
}

impl RiskAnalyzeRequest {
    pub fn v1(
        envelope: Ph1RiskRequestEnvelope,
        transcript_text: String,
        emotion: EmotionTag,
        emotion_confidence: f32,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: PH1RISK_CONTRACT_VERSION,
            envelope,
            transcript_text,
            emotion,
            emotion_confidence,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for RiskAnalyzeRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1RISK_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "risk_analyze_request.schema_version",
                reason: "must match PH1RISK_CONTRACT_VERSION",
            });
        }
        self.envelope.validate()?;
        // Any transcript content is admissible, including the empty string.
        if self.transcript_text.len() > 65536 {
            return Err(ContractViolation::InvalidValue {
                field: "risk_analyze_request.transcript_text",
                reason: "must be <= 65536 bytes",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmergencyPayloadRequest {
    pub schema_version: SchemaVersion,
    pub envelope: Ph1RiskRequestEnvelope,
    pub assessment: RiskAssessment,
    pub region: RegionTag,
}

impl EmergencyPayloadRequest {
    pub fn v1(
        envelope: Ph1RiskRequestEnvelope,
        assessment: RiskAssessment,
        region: RegionTag,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: PH1RISK_CONTRACT_VERSION,
            envelope,
            assessment,
            region,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for EmergencyPayloadRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1RISK_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "emergency_payload_request.schema_version",
                reason: "must match PH1RISK_CONTRACT_VERSION",
            });
        }
        self.envelope.validate()?;
        self.assessment.validate()?;
        self.region.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ph1RiskRequest {
    RiskAnalyze(RiskAnalyzeRequest),
    EmergencyPayloadBuild(EmergencyPayloadRequest),
}

impl Validate for Ph1RiskRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            Ph1RiskRequest::RiskAnalyze(r) => r.validate(),
            Ph1RiskRequest::EmergencyPayloadBuild(r) => r.validate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAnalyzeOk {
    pub schema_version: SchemaVersion,
    pub capability_id: RiskCapabilityId,
    pub reason_code: ReasonCodeId,
    pub assessment: RiskAssessment,
}

impl RiskAnalyzeOk {
    pub fn v1(
        reason_code: ReasonCodeId,
        assessment: RiskAssessment,
    ) -> Result<Self, ContractViolation> {
        let o = Self {
            schema_version: PH1RISK_CONTRACT_VERSION,
            capability_id: RiskCapabilityId::RiskAnalyze,
            reason_code,
            assessment,
        };
        o.validate()?;
        Ok(o)
    }
}

impl Validate for RiskAnalyzeOk {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1RISK_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "risk_analyze_ok.schema_version",
                reason: "must match PH1RISK_CONTRACT_VERSION",
            });
        }
        if self.capability_id != RiskCapabilityId::RiskAnalyze {
            return Err(ContractViolation::InvalidValue {
                field: "risk_analyze_ok.capability_id",
                reason: "must be RISK_ANALYZE",
            });
        }
        self.assessment.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyPayloadOk {
    pub schema_version: SchemaVersion,
    pub capability_id: RiskCapabilityId,
    pub reason_code: ReasonCodeId,
    /// `None` when the assessed action does not warrant escalation.
    pub payload: Option<EmergencyPayload>,
}

impl EmergencyPayloadOk {
    pub fn v1(
        reason_code: ReasonCodeId,
        payload: Option<EmergencyPayload>,
    ) -> Result<Self, ContractViolation> {
        let o = Self {
            schema_version: PH1RISK_CONTRACT_VERSION,
            capability_id: RiskCapabilityId::EmergencyPayloadBuild,
            reason_code,
            payload,
        };
        o.validate()?;
        Ok(o)
    }
}

impl Validate for EmergencyPayloadOk {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1RISK_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "emergency_payload_ok.schema_version",
                reason: "must match PH1RISK_CONTRACT_VERSION",
            });
        }
        if self.capability_id != RiskCapabilityId::EmergencyPayloadBuild {
            return Err(ContractViolation::InvalidValue {
                field: "emergency_payload_ok.capability_id",
                reason: "must be EMERGENCY_PAYLOAD_BUILD",
            });
        }
        if let Some(p) = &self.payload {
            p.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ph1RiskRefuse {
    pub schema_version: SchemaVersion,
    pub capability_id: RiskCapabilityId,
    pub reason_code: ReasonCodeId,
    pub message: String,
}

impl Ph1RiskRefuse {
    pub fn v1(
        capability_id: RiskCapabilityId,
        reason_code: ReasonCodeId,
        message: String,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: PH1RISK_CONTRACT_VERSION,
            capability_id,
            reason_code,
            message,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for Ph1RiskRefuse {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1RISK_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "ph1risk_refuse.schema_version",
                reason: "must match PH1RISK_CONTRACT_VERSION",
            });
        }
        if self.message.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "ph1risk_refuse.message",
                reason: "must not be empty",
            });
        }
        if self.message.len() > 256 {
            return Err(ContractViolation::InvalidValue {
                field: "ph1risk_refuse.message",
                reason: "must be <= 256 chars",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ph1RiskResponse {
    RiskAnalyzeOk(RiskAnalyzeOk),
    EmergencyPayloadOk(EmergencyPayloadOk),
    Refuse(Ph1RiskRefuse),
}

impl Validate for Ph1RiskResponse {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            Ph1RiskResponse::RiskAnalyzeOk(o) => o.validate(),
            Ph1RiskResponse::EmergencyPayloadOk(o) => o.validate(),
            Ph1RiskResponse::Refuse(r) => r.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_clamp_caps_at_ten() {
        assert_eq!(RiskScore::clamped(0), RiskScore(0));
        assert_eq!(RiskScore::clamped(7), RiskScore(7));
        assert_eq!(RiskScore::clamped(11), RiskScore(10));
        assert_eq!(RiskScore::clamped(u32::MAX), RiskScore(10));
    }

    #[test]
    fn level_and_action_step_at_cut_points() {
        let table = [
            (0u8, RiskLevel::Low, RiskAction::Normal),
            (2, RiskLevel::Low, RiskAction::Normal),
            (3, RiskLevel::Moderate, RiskAction::FollowUp),
            (5, RiskLevel::Moderate, RiskAction::FollowUp),
            (6, RiskLevel::High, RiskAction::UrgentConsult),
            (7, RiskLevel::High, RiskAction::UrgentConsult),
            (8, RiskLevel::Critical, RiskAction::ImmediateEmergency),
            (10, RiskLevel::Critical, RiskAction::ImmediateEmergency),
        ];
        for (score, level, action) in table {
            assert_eq!(RiskLevel::for_score(RiskScore(score)), level);
            assert_eq!(RiskAction::for_score(RiskScore(score)), action);
        }
    }

    #[test]
    fn assessment_rejects_inconsistent_level() {
        let mut a = RiskAssessment::from_score_v1(RiskScore(9), vec!["die".to_string()]).unwrap();
        a.level = RiskLevel::Low;
        assert!(a.validate().is_err());
    }

    #[test]
    fn assessment_rejects_duplicate_triggers() {
        let a = RiskAssessment::from_score_v1(
            RiskScore(6),
            vec!["alone".to_string(), "alone".to_string()],
        );
        assert!(a.is_err());
    }

    #[test]
    fn region_tag_normalizes_to_lowercase() {
        let r = RegionTag::new(" US ").unwrap();
        assert_eq!(r.as_str(), "us");
        assert!(RegionTag::new("bad region").is_err());
        assert!(RegionTag::new("").is_err());
    }

    #[test]
    fn payload_requires_message_and_actions() {
        assert!(EmergencyPayload::v1(String::new(), vec!["call".to_string()], vec![]).is_err());
        assert!(EmergencyPayload::v1("stay with me".to_string(), vec![], vec![]).is_err());
        let p = EmergencyPayload::v1(
            "stay with me".to_string(),
            vec!["call a trusted person".to_string()],
            vec![],
        );
        assert!(p.is_ok());
    }

    #[test]
    fn analyze_request_tolerates_odd_confidence() {
        let env = Ph1RiskRequestEnvelope::v1(CorrelationId(1), TurnId(1)).unwrap();
        assert!(RiskAnalyzeRequest::v1(env.clone(), String::new(), EmotionTag::Neutral, 7.5)
            .is_ok());
        assert!(
            RiskAnalyzeRequest::v1(env, "hello".to_string(), EmotionTag::Sad, f32::NAN).is_ok()
        );
    }
}
