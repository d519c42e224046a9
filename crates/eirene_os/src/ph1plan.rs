#![forbid(unsafe_code)]

use eirene_engines::ph1plan::Ph1PlanRuntime;
use eirene_kernel_contracts::ph1plan::{
    Ph1PlanRefuse, Ph1PlanRequest, Ph1PlanResponse, PlanCapabilityId,
};
use eirene_kernel_contracts::{ContractViolation, Validate};

pub mod reason_codes {
    use eirene_kernel_contracts::ReasonCodeId;

    // PH1.PLAN OS wiring reason-code namespace. Values are placeholders until registry lock.
    pub const PH1_PLAN_REQUEST_INVALID: ReasonCodeId = ReasonCodeId(0x4F53_50F1);
    pub const PH1_PLAN_INTERNAL_PIPELINE_ERROR: ReasonCodeId = ReasonCodeId(0x4F53_50F2);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ph1PlanWiringConfig {
    pub ph1plan_enabled: bool,
}

impl Ph1PlanWiringConfig {
    pub fn mvp_v1(ph1plan_enabled: bool) -> Self {
        Self { ph1plan_enabled }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ph1PlanWiringOutcome {
    NotInvokedDisabled,
    Refused(Ph1PlanRefuse),
    Forwarded(Ph1PlanResponse),
}

pub trait PlanEngine {
    fn run(&self, req: &Ph1PlanRequest) -> Ph1PlanResponse;
}

impl PlanEngine for Ph1PlanRuntime {
    fn run(&self, req: &Ph1PlanRequest) -> Ph1PlanResponse {
        Ph1PlanRuntime::run(self, req)
    }
}

#[derive(Debug, Clone)]
pub struct Ph1PlanWiring<E>
where
    E: PlanEngine,
{
    config: Ph1PlanWiringConfig,
    engine: E,
}

impl<E> Ph1PlanWiring<E>
where
    E: PlanEngine,
{
    pub fn new(config: Ph1PlanWiringConfig, engine: E) -> Result<Self, ContractViolation> {
        Ok(Self { config, engine })
    }

    pub fn run_turn(
        &self,
        req: &Ph1PlanRequest,
    ) -> Result<Ph1PlanWiringOutcome, ContractViolation> {
        if req.validate().is_err() {
            return Ok(Ph1PlanWiringOutcome::Refused(fail_closed_refuse(
                reason_codes::PH1_PLAN_REQUEST_INVALID,
            )?));
        }

        if !self.config.ph1plan_enabled {
            return Ok(Ph1PlanWiringOutcome::NotInvokedDisabled);
        }

        let out = self.engine.run(req);
        if out.validate().is_err() {
            return Ok(Ph1PlanWiringOutcome::Refused(fail_closed_refuse(
                reason_codes::PH1_PLAN_INTERNAL_PIPELINE_ERROR,
            )?));
        }

        Ok(Ph1PlanWiringOutcome::Forwarded(out))
    }
}

fn fail_closed_refuse(
    reason_code: eirene_kernel_contracts::ReasonCodeId,
) -> Result<Ph1PlanRefuse, ContractViolation> {
    Ph1PlanRefuse::v1(
        PlanCapabilityId::PlanBuild,
        reason_code,
        "request or engine payload failed contract validation".to_string(),
    )
}
