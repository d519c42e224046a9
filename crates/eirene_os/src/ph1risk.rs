#![forbid(unsafe_code)]

use eirene_engines::ph1risk::Ph1RiskRuntime;
use eirene_kernel_contracts::ph1risk::{
    Ph1RiskRefuse, Ph1RiskRequest, Ph1RiskResponse, RiskCapabilityId,
};
use eirene_kernel_contracts::{ContractViolation, Validate};

pub mod reason_codes {
    use eirene_kernel_contracts::ReasonCodeId;

    // PH1.RISK OS wiring reason-code namespace. Values are placeholders until registry lock.
    pub const PH1_RISK_REQUEST_INVALID: ReasonCodeId = ReasonCodeId(0x4F53_52F1);
    pub const PH1_RISK_INTERNAL_PIPELINE_ERROR: ReasonCodeId = ReasonCodeId(0x4F53_52F2);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ph1RiskWiringConfig {
    pub ph1risk_enabled: bool,
}

impl Ph1RiskWiringConfig {
    pub fn mvp_v1(ph1risk_enabled: bool) -> Self {
        Self { ph1risk_enabled }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ph1RiskWiringOutcome {
    NotInvokedDisabled,
    Refused(Ph1RiskRefuse),
    Forwarded(Ph1RiskResponse),
}

pub trait RiskEngine {
    fn run(&self, req: &Ph1RiskRequest) -> Ph1RiskResponse;
}

impl RiskEngine for Ph1RiskRuntime {
    fn run(&self, req: &Ph1RiskRequest) -> Ph1RiskResponse {
        Ph1RiskRuntime::run(self, req)
    }
}

#[derive(Debug, Clone)]
pub struct Ph1RiskWiring<E>
where
    E: RiskEngine,
{
    config: Ph1RiskWiringConfig,
    engine: E,
}

impl<E> Ph1RiskWiring<E>
where
    E: RiskEngine,
{
    pub fn new(config: Ph1RiskWiringConfig, engine: E) -> Result<Self, ContractViolation> {
        Ok(Self { config, engine })
    }

    pub fn run_turn(
        &self,
        req: &Ph1RiskRequest,
    ) -> Result<Ph1RiskWiringOutcome, ContractViolation> {
        if req.validate().is_err() {
            return Ok(Ph1RiskWiringOutcome::Refused(fail_closed_refuse(
                capability_of(req),
                reason_codes::PH1_RISK_REQUEST_INVALID,
            )?));
        }

        if !self.config.ph1risk_enabled {
            return Ok(Ph1RiskWiringOutcome::NotInvokedDisabled);
        }

        let out = self.engine.run(req);
        if out.validate().is_err() {
            return Ok(Ph1RiskWiringOutcome::Refused(fail_closed_refuse(
                capability_of(req),
                reason_codes::PH1_RISK_INTERNAL_PIPELINE_ERROR,
            )?));
        }

        Ok(Ph1RiskWiringOutcome::Forwarded(out))
    }
}

fn capability_of(req: &Ph1RiskRequest) -> RiskCapabilityId {
    match req {
        Ph1RiskRequest::RiskAnalyze(_) => RiskCapabilityId::RiskAnalyze,
        Ph1RiskRequest::EmergencyPayloadBuild(_) => RiskCapabilityId::EmergencyPayloadBuild,
    }
}

fn fail_closed_refuse(
    capability_id: RiskCapabilityId,
    reason_code: eirene_kernel_contracts::ReasonCodeId,
) -> Result<Ph1RiskRefuse, ContractViolation> {
    Ph1RiskRefuse::v1(
        capability_id,
        reason_code,
        "request or engine payload failed contract validation".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use eirene_kernel_contracts::ph1audit::{CorrelationId, TurnId};
    use eirene_kernel_contracts::ph1risk::{
        Ph1RiskRequestEnvelope, RiskAnalyzeOk, RiskAnalyzeRequest, RiskAssessment, RiskScore,
        PH1RISK_CONTRACT_VERSION,
    };
    use eirene_kernel_contracts::{EmotionTag, ReasonCodeId};

    #[derive(Debug, Clone)]
    struct StubEngine {
        out: Ph1RiskResponse,
    }

    impl RiskEngine for StubEngine {
        fn run(&self, _req: &Ph1RiskRequest) -> Ph1RiskResponse {
            self.out.clone()
        }
    }

    fn req() -> Ph1RiskRequest {
        Ph1RiskRequest::RiskAnalyze(
            RiskAnalyzeRequest::v1(
                Ph1RiskRequestEnvelope::v1(CorrelationId(1), TurnId(1)).unwrap(),
                "i feel alone".to_string(),
                EmotionTag::Sad,
                0.7,
            )
            .unwrap(),
        )
    }

    fn ok_response() -> Ph1RiskResponse {
        Ph1RiskResponse::RiskAnalyzeOk(
            RiskAnalyzeOk::v1(
                ReasonCodeId(0x5249_0001),
                RiskAssessment::from_score_v1(RiskScore(1), vec!["alone".to_string()]).unwrap(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn at_risk_wiring_01_disabled_returns_not_invoked() {
        let w = Ph1RiskWiring::new(
            Ph1RiskWiringConfig::mvp_v1(false),
            StubEngine { out: ok_response() },
        )
        .unwrap();
        assert_eq!(
            w.run_turn(&req()).unwrap(),
            Ph1RiskWiringOutcome::NotInvokedDisabled
        );
    }

    #[test]
    fn at_risk_wiring_02_forwards_valid_response() {
        let w = Ph1RiskWiring::new(
            Ph1RiskWiringConfig::mvp_v1(true),
            StubEngine { out: ok_response() },
        )
        .unwrap();
        match w.run_turn(&req()).unwrap() {
            Ph1RiskWiringOutcome::Forwarded(Ph1RiskResponse::RiskAnalyzeOk(ok)) => {
                assert_eq!(ok.assessment.score, RiskScore(1))
            }
            other => panic!("expected forwarded analyze_ok, got: {other:?}"),
        }
    }

    #[test]
    fn at_risk_wiring_03_invalid_engine_payload_fails_closed() {
        // Wrong capability id for the variant makes the payload invalid.
        let invalid = Ph1RiskResponse::RiskAnalyzeOk(RiskAnalyzeOk {
            schema_version: PH1RISK_CONTRACT_VERSION,
            capability_id: RiskCapabilityId::EmergencyPayloadBuild,
            reason_code: ReasonCodeId(0x5249_0001),
            assessment: RiskAssessment::none_v1(),
        });
        let w =
            Ph1RiskWiring::new(Ph1RiskWiringConfig::mvp_v1(true), StubEngine { out: invalid })
                .unwrap();
        match w.run_turn(&req()).unwrap() {
            Ph1RiskWiringOutcome::Refused(r) => {
                assert_eq!(r.reason_code, reason_codes::PH1_RISK_INTERNAL_PIPELINE_ERROR);
                assert_eq!(r.capability_id, RiskCapabilityId::RiskAnalyze);
            }
            other => panic!("expected refused output, got: {other:?}"),
        }
    }

    #[test]
    fn at_risk_wiring_04_invalid_request_contract_fails_closed() {
        let mut r = req();
        if let Ph1RiskRequest::RiskAnalyze(inner) = &mut r {
            inner.envelope.correlation_id = CorrelationId(0);
        }
        let w = Ph1RiskWiring::new(
            Ph1RiskWiringConfig::mvp_v1(true),
            StubEngine { out: ok_response() },
        )
        .unwrap();
        match w.run_turn(&r).unwrap() {
            Ph1RiskWiringOutcome::Refused(refuse) => {
                assert_eq!(refuse.reason_code, reason_codes::PH1_RISK_REQUEST_INVALID);
            }
            other => panic!("expected fail-closed refusal, got: {other:?}"),
        }
    }

    #[test]
    fn at_risk_wiring_05_valid_refuse_response_is_forwarded() {
        let refuse = Ph1RiskResponse::Refuse(
            Ph1RiskRefuse::v1(
                RiskCapabilityId::RiskAnalyze,
                ReasonCodeId(0x5249_0101),
                "transcript too large".to_string(),
            )
            .unwrap(),
        );
        let w =
            Ph1RiskWiring::new(Ph1RiskWiringConfig::mvp_v1(true), StubEngine { out: refuse })
                .unwrap();
        match w.run_turn(&req()).unwrap() {
            Ph1RiskWiringOutcome::Forwarded(Ph1RiskResponse::Refuse(r)) => {
                assert_eq!(r.message, "transcript too large")
            }
            other => panic!("expected forwarded refuse, got: {other:?}"),
        }
    }
}
