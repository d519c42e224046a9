#![forbid(unsafe_code)]

use std::sync::Arc;

use eirene_kernel_contracts::ph1plan::{
    Ph1PlanRefuse, Ph1PlanRequest, Ph1PlanResponse, PlanBuildOk, PlanBuildRequest,
    PlanCapabilityId, PlanTier, TreatmentPlan,
};
use eirene_kernel_contracts::{ReasonCodeId, Validate};

use crate::catalog::ResponseCatalog;

pub mod reason_codes {
    // PH1.PLAN reason-code namespace. Values are placeholders until global registry lock.
    pub const OK_PLAN_BUILD: u32 = 0x504C_0001;

    pub const REFUSE_INVALID_REQUEST: u32 = 0x504C_0101;
    pub const REFUSE_INTERNAL_CONSTRUCTION: u32 = 0x504C_00F1;
}

/// Plan policy. Recommendation texts are product constants, not pack
/// content; exercises come from the catalog.
#[derive(Debug, Clone)]
pub struct Ph1PlanConfig {
    pub base_recommendations: Vec<&'static str>,
    pub premium_recommendations: Vec<&'static str>,
    pub urgent_recommendation: &'static str,
    /// Risk score at which the urgent item is prepended.
    pub urgent_threshold: u8,
    /// Most premium exercises appended on top of the free list.
    pub premium_exercise_cap: usize,
    /// Hard bound on the assembled exercise list.
    pub total_exercise_cap: usize,
}

impl Ph1PlanConfig {
    pub fn mvp_v1() -> Self {
        Self {
            base_recommendations: vec![
                "Keep a steady daily routine",
                "Practice regular physical activity",
                "Stay in touch with people close to you",
                "Sleep seven to eight hours a night",
                "Limit alcohol and caffeine",
            ],
            premium_recommendations: vec![
                "Work through the premium exercises daily",
                "Review the advanced resources",
                "Track your progress in the companion log",
            ],
            urgent_recommendation: "IMPORTANT: consult a mental-health professional promptly",
            urgent_threshold: 6,
            premium_exercise_cap: 12,
            total_exercise_cap: 16,
        }
    }
}

pub struct Ph1PlanRuntime {
    config: Ph1PlanConfig,
    catalog: Arc<ResponseCatalog>,
}

impl Ph1PlanRuntime {
    pub fn new(config: Ph1PlanConfig, catalog: Arc<ResponseCatalog>) -> Self {
        Self { config, catalog }
    }

    pub fn run(&self, req: &Ph1PlanRequest) -> Ph1PlanResponse {
        if req.validate().is_err() {
            return refuse(
                reason_codes::REFUSE_INVALID_REQUEST,
                "request failed contract validation",
            );
        }
        match req {
            Ph1PlanRequest::PlanBuild(r) => self.run_plan(r),
        }
    }

    /// Pure assembly: free exercises always, premium extras bounded, urgent
    /// recommendation prepended at the threshold. No randomness, no state.
    fn run_plan(&self, req: &PlanBuildRequest) -> Ph1PlanResponse {
        let tiers = self.catalog.exercises_for(req.emotion);
        let mut exercises: Vec<String> = tiers.free.clone();
        let plan_tier = if req.premium_tier {
            exercises.extend(
                tiers
                    .premium
                    .iter()
                    .take(self.config.premium_exercise_cap)
                    .cloned(),
            );
            PlanTier::Premium
        } else {
            PlanTier::Free
        };
        exercises.truncate(self.config.total_exercise_cap);

        let mut recommendations: Vec<String> = self
            .config
            .base_recommendations
            .iter()
            .map(|r| (*r).to_string())
            .collect();
        if req.premium_tier {
            recommendations.extend(
                self.config
                    .premium_recommendations
                    .iter()
                    .map(|r| (*r).to_string()),
            );
        }
        if req.risk_score.0 >= self.config.urgent_threshold {
            recommendations.insert(0, self.config.urgent_recommendation.to_string());
        }

        let plan = match TreatmentPlan::v1(
            req.emotion,
            req.risk_score,
            plan_tier,
            exercises,
            recommendations,
        ) {
            Ok(p) => p,
            Err(_) => {
                return refuse(
                    reason_codes::REFUSE_INTERNAL_CONSTRUCTION,
                    "plan failed contract validation",
                );
            }
        };
        match PlanBuildOk::v1(ReasonCodeId(reason_codes::OK_PLAN_BUILD), plan) {
            Ok(ok) => Ph1PlanResponse::PlanBuildOk(ok),
            Err(_) => refuse(
                reason_codes::REFUSE_INTERNAL_CONSTRUCTION,
                "plan response failed contract validation",
            ),
        }
    }
}

fn refuse(reason_code: u32, message: &'static str) -> Ph1PlanResponse {
    Ph1PlanResponse::Refuse(
        Ph1PlanRefuse::v1(
            PlanCapabilityId::PlanBuild,
            ReasonCodeId(reason_code),
            message.to_string(),
        )
        .expect("refuse response must construct for static messages"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests_support::compiled_catalog;
    use eirene_kernel_contracts::ph1audit::{CorrelationId, TurnId};
    use eirene_kernel_contracts::ph1plan::Ph1PlanRequestEnvelope;
    use eirene_kernel_contracts::ph1risk::RiskScore;
    use eirene_kernel_contracts::EmotionTag;

    fn runtime() -> Ph1PlanRuntime {
        Ph1PlanRuntime::new(Ph1PlanConfig::mvp_v1(), compiled_catalog())
    }

    fn request(emotion: EmotionTag, score: u8, premium: bool) -> Ph1PlanRequest {
        let envelope =
            Ph1PlanRequestEnvelope::v1(CorrelationId(21), TurnId(3)).unwrap();
        Ph1PlanRequest::PlanBuild(
            PlanBuildRequest::v1(envelope, emotion, RiskScore(score), premium).unwrap(),
        )
    }

    fn expect_plan(resp: Ph1PlanResponse) -> TreatmentPlan {
        match resp {
            Ph1PlanResponse::PlanBuildOk(ok) => ok.plan,
            other => panic!("expected PlanBuildOk, got {other:?}"),
        }
    }

    #[test]
    fn at_plan_01_free_tier_gets_free_exercises_only() {
        let plan = expect_plan(runtime().run(&request(EmotionTag::Sad, 2, false)));
        assert_eq!(plan.plan_tier, PlanTier::Free);
        assert_eq!(
            plan.exercises,
            vec![
                "Name three small comforts nearby".to_string(),
                "Step outside for a few minutes of daylight".to_string(),
            ]
        );
        assert_eq!(plan.recommendations.len(), 5);
    }

    #[test]
    fn at_plan_02_premium_appends_bounded_extras() {
        let plan = expect_plan(runtime().run(&request(EmotionTag::Sad, 2, true)));
        assert_eq!(plan.plan_tier, PlanTier::Premium);
        // Free list first, premium extras after, in pack order.
        assert_eq!(plan.exercises[0], "Name three small comforts nearby");
        assert_eq!(plan.exercises.len(), 5);
        assert!(plan
            .exercises
            .contains(&"Behavioral activation planner".to_string()));
        assert_eq!(plan.recommendations.len(), 8);
    }

    #[test]
    fn at_plan_03_urgent_item_is_prepended_at_threshold() {
        let rt = runtime();
        let calm = expect_plan(rt.run(&request(EmotionTag::Neutral, 5, false)));
        assert!(!calm.recommendations[0].starts_with("IMPORTANT"));

        let urgent = expect_plan(rt.run(&request(EmotionTag::Neutral, 6, false)));
        assert!(urgent.recommendations[0].starts_with("IMPORTANT"));
        assert_eq!(urgent.recommendations.len(), 6);
    }

    #[test]
    fn at_plan_04_unknown_emotion_falls_back_to_neutral_exercises() {
        let plan = expect_plan(runtime().run(&request(EmotionTag::Angry, 0, false)));
        assert_eq!(
            plan.exercises,
            vec![
                "Slow breathing for five minutes".to_string(),
                "A short walk outside".to_string(),
                "Write three lines about today".to_string(),
            ]
        );
    }

    #[test]
    fn at_plan_05_plan_is_deterministic() {
        let rt = runtime();
        let a = expect_plan(rt.run(&request(EmotionTag::Sad, 7, true)));
        let b = expect_plan(rt.run(&request(EmotionTag::Sad, 7, true)));
        assert_eq!(a, b);
    }
}
