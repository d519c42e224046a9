#![forbid(unsafe_code)]

use eirene_engines::ph1dialogue::Ph1DialogueRuntime;
use eirene_kernel_contracts::ph1dialogue::{
    DialogueCapabilityId, Ph1DialogueRefuse, Ph1DialogueRequest, Ph1DialogueResponse,
};
use eirene_kernel_contracts::ph1session::SessionDialogueState;
use eirene_kernel_contracts::{ContractViolation, Validate};

pub mod reason_codes {
    use eirene_kernel_contracts::ReasonCodeId;

    // PH1.DIALOGUE OS wiring reason-code namespace. Values are placeholders until registry lock.
    pub const PH1_DIALOGUE_REQUEST_INVALID: ReasonCodeId = ReasonCodeId(0x4F53_44F1);
    pub const PH1_DIALOGUE_INTERNAL_PIPELINE_ERROR: ReasonCodeId = ReasonCodeId(0x4F53_44F2);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ph1DialogueWiringConfig {
    pub ph1dialogue_enabled: bool,
}

impl Ph1DialogueWiringConfig {
    pub fn mvp_v1(ph1dialogue_enabled: bool) -> Self {
        Self {
            ph1dialogue_enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ph1DialogueWiringOutcome {
    NotInvokedDisabled,
    Refused(Ph1DialogueRefuse),
    Forwarded(Ph1DialogueResponse),
}

/// Selection state is threaded through by the host; stateless callers pass
/// `None` and get uniform draws.
pub trait DialogueEngine {
    fn run(
        &self,
        req: &Ph1DialogueRequest,
        state: Option<&mut SessionDialogueState>,
    ) -> Ph1DialogueResponse;
}

impl DialogueEngine for Ph1DialogueRuntime {
    fn run(
        &self,
        req: &Ph1DialogueRequest,
        state: Option<&mut SessionDialogueState>,
    ) -> Ph1DialogueResponse {
        Ph1DialogueRuntime::run(self, req, state)
    }
}

#[derive(Debug, Clone)]
pub struct Ph1DialogueWiring<E>
where
    E: DialogueEngine,
{
    config: Ph1DialogueWiringConfig,
    engine: E,
}

impl<E> Ph1DialogueWiring<E>
where
    E: DialogueEngine,
{
    pub fn new(config: Ph1DialogueWiringConfig, engine: E) -> Result<Self, ContractViolation> {
        Ok(Self { config, engine })
    }

    pub fn run_turn(
        &self,
        req: &Ph1DialogueRequest,
        state: Option<&mut SessionDialogueState>,
    ) -> Result<Ph1DialogueWiringOutcome, ContractViolation> {
        if req.validate().is_err() {
            return Ok(Ph1DialogueWiringOutcome::Refused(fail_closed_refuse(
                capability_of(req),
                reason_codes::PH1_DIALOGUE_REQUEST_INVALID,
            )?));
        }

        if !self.config.ph1dialogue_enabled {
            return Ok(Ph1DialogueWiringOutcome::NotInvokedDisabled);
        }

        let out = self.engine.run(req, state);
        if out.validate().is_err() {
            return Ok(Ph1DialogueWiringOutcome::Refused(fail_closed_refuse(
                capability_of(req),
                reason_codes::PH1_DIALOGUE_INTERNAL_PIPELINE_ERROR,
            )?));
        }

        Ok(Ph1DialogueWiringOutcome::Forwarded(out))
    }
}

fn capability_of(req: &Ph1DialogueRequest) -> DialogueCapabilityId {
    match req {
        Ph1DialogueRequest::ReplyBuild(_) => DialogueCapabilityId::ReplyBuild,
        Ph1DialogueRequest::QuestionsBuild(_) => DialogueCapabilityId::QuestionsBuild,
        Ph1DialogueRequest::SummaryBuild(_) => DialogueCapabilityId::SummaryBuild,
    }
}

fn fail_closed_refuse(
    capability_id: DialogueCapabilityId,
    reason_code: eirene_kernel_contracts::ReasonCodeId,
) -> Result<Ph1DialogueRefuse, ContractViolation> {
    Ph1DialogueRefuse::v1(
        capability_id,
        reason_code,
        "request or engine payload failed contract validation".to_string(),
    )
}
