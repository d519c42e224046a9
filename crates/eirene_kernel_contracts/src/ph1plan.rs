#![forbid(unsafe_code)]

use crate::ph1audit::{CorrelationId, TurnId};
use crate::ph1risk::RiskScore;
use crate::{ContractViolation, EmotionTag, ReasonCodeId, SchemaVersion, Validate};

pub const PH1PLAN_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanTier {
    Free,
    Premium,
}

impl PlanTier {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanTier::Free => "FREE",
            PlanTier::Premium => "PREMIUM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanCapabilityId {
    PlanBuild,
}

impl PlanCapabilityId {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanCapabilityId::PlanBuild => "PLAN_BUILD",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ph1PlanRequestEnvelope {
    pub schema_version: SchemaVersion,
    pub correlation_id: CorrelationId,
    pub turn_id: TurnId,
}

impl Ph1PlanRequestEnvelope {
    pub fn v1(correlation_id: CorrelationId, turn_id: TurnId) -> Result<Self, ContractViolation> {
        let env = Self {
            schema_version: PH1PLAN_CONTRACT_VERSION,
            correlation_id,
            turn_id,
        };
        env.validate()?;
        Ok(env)
    }
}

impl Validate for Ph1PlanRequestEnvelope {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1PLAN_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "ph1plan_request_envelope.schema_version",
                reason: "must match PH1PLAN_CONTRACT_VERSION",
            });
        }
        self.correlation_id.validate()?;
        self.turn_id.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanBuildRequest {
    pub schema_version: SchemaVersion,
    pub envelope: Ph1PlanRequestEnvelope,
    pub emotion: EmotionTag,
    pub risk_score: RiskScore,
    pub premium_tier: bool,
}

impl PlanBuildRequest {
    pub fn v1(
        envelope: Ph1PlanRequestEnvelope,
        emotion: EmotionTag,
        risk_score: RiskScore,
        premium_tier: bool,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: PH1PLAN_CONTRACT_VERSION,
            envelope,
            emotion,
            risk_score,
            premium_tier,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for PlanBuildRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1PLAN_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "plan_build_request.schema_version",
                reason: "must match PH1PLAN_CONTRACT_VERSION",
            });
        }
        self.envelope.validate()?;
        self.risk_score.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ph1PlanRequest {
    PlanBuild(PlanBuildRequest),
}

impl Validate for Ph1PlanRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            Ph1PlanRequest::PlanBuild(r) => r.validate(),
        }
    }
}

/// Session-end care plan: exercise list for the emotion plus layered
/// recommendations. Assembled deterministically; carries no session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreatmentPlan {
    pub schema_version: SchemaVersion,
    pub emotion: EmotionTag,
    pub risk_score: RiskScore,
    pub plan_tier: PlanTier,
    pub exercises: Vec<String>,
    pub recommendations: Vec<String>,
}

impl TreatmentPlan {
    pub fn v1(
        emotion: EmotionTag,
        risk_score: RiskScore,
        plan_tier: PlanTier,
        exercises: Vec<String>,
        recommendations: Vec<String>,
    ) -> Result<Self, ContractViolation> {
        let p = Self {
            schema_version: PH1PLAN_CONTRACT_VERSION,
            emotion,
            risk_score,
            plan_tier,
            exercises,
            recommendations,
        };
        p.validate()?;
        Ok(p)
    }
}

impl Validate for TreatmentPlan {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1PLAN_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "treatment_plan.schema_version",
                reason: "must match PH1PLAN_CONTRACT_VERSION",
            });
        }
        self.risk_score.validate()?;
        if self.exercises.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "treatment_plan.exercises",
                reason: "must not be empty",
            });
        }
        if self.exercises.len() > 16 {
            return Err(ContractViolation::InvalidValue {
                field: "treatment_plan.exercises",
                reason: "must be <= 16 entries",
            });
        }
        for e in &self.exercises {
            if e.trim().is_empty() {
                return Err(ContractViolation::InvalidValue {
                    field: "treatment_plan.exercises",
                    reason: "entries must not be empty",
                });
            }
            if e.len() > 256 {
                return Err(ContractViolation::InvalidValue {
                    field: "treatment_plan.exercises",
                    reason: "entry must be <= 256 chars",
                });
            }
        }
        if self.recommendations.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "treatment_plan.recommendations",
                reason: "must not be empty",
            });
        }
        if self.recommendations.len() > 16 {
            return Err(ContractViolation::InvalidValue {
                field: "treatment_plan.recommendations",
                reason: "must be <= 16 entries",
            });
        }
        for r in &self.recommendations {
            if r.trim().is_empty() {
                return Err(ContractViolation::InvalidValue {
                    field: "treatment_plan.recommendations",
                    reason: "entries must not be empty",
                });
            }
            if r.len() > 256 {
                return Err(ContractViolation::InvalidValue {
                    field: "treatment_plan.recommendations",
                    reason: "entry must be <= 256 chars",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanBuildOk {
    pub schema_version: SchemaVersion,
    pub capability_id: PlanCapabilityId,
    pub reason_code: ReasonCodeId,
    pub plan: TreatmentPlan,
}

impl PlanBuildOk {
    pub fn v1(reason_code: ReasonCodeId, plan: TreatmentPlan) -> Result<Self, ContractViolation> {
        let o = Self {
            schema_version: PH1PLAN_CONTRACT_VERSION,
            capability_id: PlanCapabilityId::PlanBuild,
            reason_code,
            plan,
        };
        o.validate()?;
        Ok(o)
    }
}

impl Validate for PlanBuildOk {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1PLAN_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "plan_build_ok.schema_version",
                reason: "must match PH1PLAN_CONTRACT_VERSION",
            });
        }
        self.plan.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ph1PlanRefuse {
    pub schema_version: SchemaVersion,
    pub capability_id: PlanCapabilityId,
    pub reason_code: ReasonCodeId,
    pub message: String,
}

impl Ph1PlanRefuse {
    pub fn v1(
        capability_id: PlanCapabilityId,
        reason_code: ReasonCodeId,
        message: String,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: PH1PLAN_CONTRACT_VERSION,
            capability_id,
            reason_code,
            message,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for Ph1PlanRefuse {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PH1PLAN_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "ph1plan_refuse.schema_version",
                reason: "must match PH1PLAN_CONTRACT_VERSION",
            });
        }
        if self.message.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "ph1plan_refuse.message",
                reason: "must not be empty",
            });
        }
        if self.message.len() > 256 {
            return Err(ContractViolation::InvalidValue {
                field: "ph1plan_refuse.message",
                reason: "must be <= 256 chars",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ph1PlanResponse {
    PlanBuildOk(PlanBuildOk),
    Refuse(Ph1PlanRefuse),
}

impl Validate for Ph1PlanResponse {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            Ph1PlanResponse::PlanBuildOk(o) => o.validate(),
            Ph1PlanResponse::Refuse(r) => r.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_requires_exercises_and_recommendations() {
        let p = TreatmentPlan::v1(
            EmotionTag::Sad,
            RiskScore(4),
            PlanTier::Free,
            vec![],
            vec!["keep a daily rhythm".to_string()],
        );
        assert!(p.is_err());
        let p = TreatmentPlan::v1(
            EmotionTag::Sad,
            RiskScore(4),
            PlanTier::Free,
            vec!["slow breathing, 5 minutes".to_string()],
            vec![],
        );
        assert!(p.is_err());
    }

    #[test]
    fn plan_rejects_out_of_range_score() {
        let p = TreatmentPlan::v1(
            EmotionTag::Neutral,
            RiskScore(11),
            PlanTier::Free,
            vec!["slow breathing, 5 minutes".to_string()],
            vec!["keep a daily rhythm".to_string()],
        );
        assert!(p.is_err());
    }
}
