#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use unicode_normalization::UnicodeNormalization;

use eirene_kernel_contracts::ph1risk::{
    EmergencyPayload, EmergencyPayloadOk, EmergencyPayloadRequest, Ph1RiskRefuse, Ph1RiskRequest,
    Ph1RiskResponse, RiskAction, RiskAnalyzeOk, RiskAnalyzeRequest, RiskAssessment,
    RiskCapabilityId, RiskScore,
};
use eirene_kernel_contracts::{EmotionTag, ReasonCodeId, Validate};

use crate::catalog::ResponseCatalog;

pub mod reason_codes {
    // PH1.RISK reason-code namespace. Values are placeholders until global registry lock.
    pub const OK_RISK_ANALYZE: u32 = 0x5249_0001;
    pub const OK_EMERGENCY_PAYLOAD: u32 = 0x5249_0002;
    pub const OK_EMERGENCY_NOT_WARRANTED: u32 = 0x5249_0003;

    pub const REFUSE_INVALID_REQUEST: u32 = 0x5249_0101;
    pub const REFUSE_INTERNAL_CONSTRUCTION: u32 = 0x5249_00F1;
}

/// Lexical triage policy. Keyword tables are matched as substrings of the
/// canonicalized transcript, in declaration order; that order fixes the
/// trigger list ordering for ties.
#[derive(Debug, Clone)]
pub struct Ph1RiskConfig {
    pub critical_keywords: Vec<&'static str>,
    pub high_risk_keywords: Vec<&'static str>,
    pub finality_phrases: Vec<&'static str>,
    pub critical_weight: u32,
    pub high_risk_weight: u32,
    pub finality_weight: u32,
    pub strong_emotions: Vec<EmotionTag>,
    pub strong_emotion_bonus: u32,
    pub strong_confidence_gate: f32,
    pub mild_confidence_bonus: u32,
    pub mild_confidence_gate: f32,
    pub max_transcript_chars: usize,
}

impl Ph1RiskConfig {
    pub fn mvp_v1() -> Self {
        Self {
            critical_keywords: vec![
                "suicide",
                "kill myself",
                "end my life",
                "die",
                "hurt myself",
                "self harm",
                "no hope",
            ],
            high_risk_keywords: vec![
                "depressed",
                "depression",
                "anxious",
                "panic",
                "alone",
                "worthless",
                "hopeless",
            ],
            finality_phrases: vec![
                "want to die",
                "wish i was dead",
                "better off dead",
                "end it all",
                "no reason to live",
            ],
            critical_weight: 3,
            high_risk_weight: 1,
            finality_weight: 3,
            strong_emotions: vec![EmotionTag::Sad, EmotionTag::Fear, EmotionTag::Anxious],
            strong_emotion_bonus: 2,
            strong_confidence_gate: 0.8,
            mild_confidence_bonus: 1,
            mild_confidence_gate: 0.6,
            max_transcript_chars: 8192,
        }
    }
}

pub struct Ph1RiskRuntime {
    config: Ph1RiskConfig,
    catalog: Arc<ResponseCatalog>,
}

impl Ph1RiskRuntime {
    pub fn new(config: Ph1RiskConfig, catalog: Arc<ResponseCatalog>) -> Self {
        Self { config, catalog }
    }

    pub fn run(&self, req: &Ph1RiskRequest) -> Ph1RiskResponse {
        if req.validate().is_err() {
            let capability_id = match req {
                Ph1RiskRequest::RiskAnalyze(_) => RiskCapabilityId::RiskAnalyze,
                Ph1RiskRequest::EmergencyPayloadBuild(_) => RiskCapabilityId::EmergencyPayloadBuild,
            };
            return refuse(
                capability_id,
                reason_codes::REFUSE_INVALID_REQUEST,
                "request failed contract validation",
            );
        }
        match req {
            Ph1RiskRequest::RiskAnalyze(r) => self.run_analyze(r),
            Ph1RiskRequest::EmergencyPayloadBuild(r) => self.run_emergency_payload(r),
        }
    }

    fn run_analyze(&self, req: &RiskAnalyzeRequest) -> Ph1RiskResponse {
        let assessment = self.assess(&req.transcript_text, req.emotion, req.emotion_confidence);
        match RiskAnalyzeOk::v1(ReasonCodeId(reason_codes::OK_RISK_ANALYZE), assessment) {
            Ok(ok) => Ph1RiskResponse::RiskAnalyzeOk(ok),
            Err(_) => refuse(
                RiskCapabilityId::RiskAnalyze,
                reason_codes::REFUSE_INTERNAL_CONSTRUCTION,
                "assessment failed response-contract validation",
            ),
        }
    }

    /// Scoring is total: any text, any emotion, any confidence yields a valid
    /// assessment. Blank transcripts score zero without consulting tables.
    pub fn assess(&self, text: &str, emotion: EmotionTag, confidence: f32) -> RiskAssessment {
        let canonical = canonical_transcript(text, self.config.max_transcript_chars);
        if canonical.is_empty() {
            return RiskAssessment::none_v1();
        }
        let mut raw: u32 = 0;
        let mut triggers: Vec<String> = Vec::new();
        let mut matched: BTreeSet<&str> = BTreeSet::new();
        for (table, weight) in [
            (&self.config.critical_keywords, self.config.critical_weight),
            (&self.config.high_risk_keywords, self.config.high_risk_weight),
            (&self.config.finality_phrases, self.config.finality_weight),
        ] {
            for term in table {
                if canonical.contains(term) {
                    raw = raw.saturating_add(weight);
                    if matched.insert(term) {
                        triggers.push((*term).to_string());
                    }
                }
            }
        }

        let confidence = clamp_confidence(confidence);
        if self.config.strong_emotions.contains(&emotion)
            && confidence > self.config.strong_confidence_gate
        {
            raw = raw.saturating_add(self.config.strong_emotion_bonus);
        } else if confidence > self.config.mild_confidence_gate {
            raw = raw.saturating_add(self.config.mild_confidence_bonus);
        }

        let score = RiskScore::clamped(raw);
        // Trigger terms come from the bounded config tables; construction
        // cannot fail for them. Fall back to a minimal assessment anyway.
        RiskAssessment::from_score_v1(score, triggers)
            .unwrap_or_else(|_| degraded_assessment(score))
    }

    fn run_emergency_payload(&self, req: &EmergencyPayloadRequest) -> Ph1RiskResponse {
        let crisis = self.catalog.crisis();
        let (message, actions) = match req.assessment.action {
            RiskAction::ImmediateEmergency => (
                crisis.emergency_message.clone(),
                crisis.emergency_actions.clone(),
            ),
            RiskAction::UrgentConsult => {
                (crisis.urgent_message.clone(), crisis.urgent_actions.clone())
            }
            RiskAction::FollowUp | RiskAction::Normal => {
                return match EmergencyPayloadOk::v1(
                    ReasonCodeId(reason_codes::OK_EMERGENCY_NOT_WARRANTED),
                    None,
                ) {
                    Ok(ok) => Ph1RiskResponse::EmergencyPayloadOk(ok),
                    Err(_) => refuse(
                        RiskCapabilityId::EmergencyPayloadBuild,
                        reason_codes::REFUSE_INTERNAL_CONSTRUCTION,
                        "empty payload failed response-contract validation",
                    ),
                };
            }
        };
        let resources = self.catalog.emergency_directory_for(&req.region).to_vec();
        let payload = match EmergencyPayload::v1(message, actions, resources) {
            Ok(p) => p,
            Err(_) => {
                return refuse(
                    RiskCapabilityId::EmergencyPayloadBuild,
                    reason_codes::REFUSE_INTERNAL_CONSTRUCTION,
                    "payload failed contract validation",
                );
            }
        };
        match EmergencyPayloadOk::v1(
            ReasonCodeId(reason_codes::OK_EMERGENCY_PAYLOAD),
            Some(payload),
        ) {
            Ok(ok) => Ph1RiskResponse::EmergencyPayloadOk(ok),
            Err(_) => refuse(
                RiskCapabilityId::EmergencyPayloadBuild,
                reason_codes::REFUSE_INTERNAL_CONSTRUCTION,
                "payload response failed contract validation",
            ),
        }
    }
}

fn refuse(
    capability_id: RiskCapabilityId,
    reason_code: u32,
    message: &'static str,
) -> Ph1RiskResponse {
    Ph1RiskResponse::Refuse(
        Ph1RiskRefuse::v1(capability_id, ReasonCodeId(reason_code), message.to_string())
            .expect("refuse response must construct for static messages"),
    )
}

fn degraded_assessment(score: RiskScore) -> RiskAssessment {
    RiskAssessment::from_score_v1(score, Vec::new())
        .unwrap_or_else(|_| RiskAssessment::none_v1())
}

fn clamp_confidence(confidence: f32) -> f32 {
    if !confidence.is_finite() {
        return 0.0;
    }
    confidence.clamp(0.0, 1.0)
}

/// Canonical transcript form shared by the scorer and the dialogue engine:
/// NFC, lowercased, punctuation folded to single spaces, apostrophes
/// (including U+2019) and hyphens preserved, length bounded in chars.
pub fn canonical_transcript(text: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(text.len().min(max_chars));
    let mut chars = 0usize;
    let mut last_space = true;
    for ch in text.nfc() {
        if chars >= max_chars {
            break;
        }
        let ch = if ch == '\u{2019}' { '\'' } else { ch };
        if ch.is_alphanumeric() || ch == '\'' || ch == '-' {
            for lc in ch.to_lowercase() {
                out.push(lc);
                chars += 1;
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            chars += 1;
            last_space = true;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}
