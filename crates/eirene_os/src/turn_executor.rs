#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use eirene_engines::catalog::{CatalogBuildError, ResponseCatalog};
use eirene_engines::ph1dialogue::{Ph1DialogueConfig, Ph1DialogueRuntime};
use eirene_engines::ph1plan::{Ph1PlanConfig, Ph1PlanRuntime};
use eirene_engines::ph1risk::{Ph1RiskConfig, Ph1RiskRuntime};
use eirene_engines::selection::entropy_draw_seed;
use eirene_kernel_contracts::pack::PackDocument;
use eirene_kernel_contracts::ph1audit::{
    AuditEngine, AuditEventInput, AuditEventType, AuditPayloadMin, AuditSeverity, CorrelationId,
    PayloadKey, PayloadValue, TurnId,
};
use eirene_kernel_contracts::ph1dialogue::{
    DrawSeed, Ph1DialogueRequest, Ph1DialogueRequestEnvelope, Ph1DialogueResponse,
    QuestionsBuildOk, QuestionsBuildRequest, ReplyBuildOk, ReplyBuildRequest, SummaryBuildOk,
    SummaryBuildRequest,
};
use eirene_kernel_contracts::ph1plan::{
    Ph1PlanRequest, Ph1PlanRequestEnvelope, Ph1PlanResponse, PlanBuildRequest, TreatmentPlan,
};
use eirene_kernel_contracts::ph1risk::{
    EmergencyPayload, EmergencyPayloadRequest, Ph1RiskRequest, Ph1RiskRequestEnvelope,
    Ph1RiskResponse, RegionTag, RiskAction, RiskAnalyzeRequest, RiskAssessment, RiskScore,
};
use eirene_kernel_contracts::ph1session::{
    ConversationRole, ConversationTurnId, ConversationTurnInput, SessionKey,
};
use eirene_kernel_contracts::{ContractViolation, EmotionTag, MonotonicTimeNs, ReasonCodeId};
use eirene_storage::pack_source::{pack_fingerprint, PackSourceError};
use eirene_storage::store::{EireneStore, StorageError};

use crate::ph1dialogue::{Ph1DialogueWiring, Ph1DialogueWiringConfig, Ph1DialogueWiringOutcome};
use crate::ph1plan::{Ph1PlanWiring, Ph1PlanWiringConfig, Ph1PlanWiringOutcome};
use crate::ph1risk::{Ph1RiskWiring, Ph1RiskWiringConfig, Ph1RiskWiringOutcome};

pub mod reason_codes {
    use eirene_kernel_contracts::ReasonCodeId;

    // Kernel reason-code namespace. Values are placeholders until registry lock.
    pub const KERNEL_TURN_SCORED: ReasonCodeId = ReasonCodeId(0x4F53_4B01);
    pub const KERNEL_EMERGENCY_ESCALATED: ReasonCodeId = ReasonCodeId(0x4F53_4B02);
    pub const KERNEL_REPLY_COMPOSED: ReasonCodeId = ReasonCodeId(0x4F53_4B03);
    pub const KERNEL_QUESTIONS_DRAWN: ReasonCodeId = ReasonCodeId(0x4F53_4B04);
    pub const KERNEL_POOL_RESET: ReasonCodeId = ReasonCodeId(0x4F53_4B05);
    pub const KERNEL_SESSION_CLOSED: ReasonCodeId = ReasonCodeId(0x4F53_4B06);
    pub const KERNEL_PACK_SWAPPED: ReasonCodeId = ReasonCodeId(0x4F53_4B07);
}

#[derive(Debug)]
pub enum KernelError {
    Catalog(CatalogBuildError),
    Pack(PackSourceError),
    Contract(ContractViolation),
    Storage(StorageError),
    EngineDisabled {
        engine: &'static str,
    },
    EngineRefused {
        engine: &'static str,
        reason_code: ReasonCodeId,
        message: String,
    },
}

impl std::fmt::Display for KernelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Catalog(e) => write!(f, "catalog build failed: {e}"),
            Self::Pack(e) => write!(f, "pack source failed: {e}"),
            Self::Contract(v) => write!(f, "contract violation: {v:?}"),
            Self::Storage(e) => write!(f, "storage failed: {e:?}"),
            Self::EngineDisabled { engine } => write!(f, "{engine} engine is disabled"),
            Self::EngineRefused {
                engine,
                reason_code,
                message,
            } => write!(f, "{engine} refused (0x{:08X}): {message}", reason_code.0),
        }
    }
}

impl std::error::Error for KernelError {}

impl From<CatalogBuildError> for KernelError {
    fn from(e: CatalogBuildError) -> Self {
        KernelError::Catalog(e)
    }
}

impl From<PackSourceError> for KernelError {
    fn from(e: PackSourceError) -> Self {
        KernelError::Pack(e)
    }
}

impl From<ContractViolation> for KernelError {
    fn from(v: ContractViolation) -> Self {
        KernelError::Contract(v)
    }
}

impl From<StorageError> for KernelError {
    fn from(e: StorageError) -> Self {
        KernelError::Storage(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionKernelConfig {
    pub region: RegionTag,
    pub risk: Ph1RiskWiringConfig,
    pub dialogue: Ph1DialogueWiringConfig,
    pub plan: Ph1PlanWiringConfig,
}

impl CompanionKernelConfig {
    pub fn mvp_v1(region: RegionTag) -> Self {
        Self {
            region,
            risk: Ph1RiskWiringConfig::mvp_v1(true),
            dialogue: Ph1DialogueWiringConfig::mvp_v1(true),
            plan: Ph1PlanWiringConfig::mvp_v1(true),
        }
    }
}

/// One scored-and-answered turn. `escalation` is populated for
/// `UrgentConsult` turns; `ImmediateEmergency` turns take the `Emergency`
/// variant instead and never reach reply assembly.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Emergency {
        assessment: RiskAssessment,
        payload: Option<EmergencyPayload>,
        companion_text: String,
    },
    Reply {
        assessment: RiskAssessment,
        reply: ReplyBuildOk,
        questions: QuestionsBuildOk,
        escalation: Option<EmergencyPayload>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosingOutcome {
    pub summary: SummaryBuildOk,
    pub plan: TreatmentPlan,
}

/// Synchronous companion kernel: owns the store, the compiled catalog, and
/// the three engine wirings, and drives the per-turn pipeline. One kernel
/// serves many sessions; callers serialize calls per session key.
pub struct CompanionKernel {
    config: CompanionKernelConfig,
    store: EireneStore,
    catalog: Arc<ResponseCatalog>,
    pack_fingerprint: String,
    risk: Ph1RiskWiring<Ph1RiskRuntime>,
    dialogue: Ph1DialogueWiring<Ph1DialogueRuntime>,
    plan: Ph1PlanWiring<Ph1PlanRuntime>,
    next_correlation: u128,
}

impl CompanionKernel {
    pub fn new(config: CompanionKernelConfig, doc: &PackDocument) -> Result<Self, KernelError> {
        let catalog = Arc::new(ResponseCatalog::compile(doc)?);
        let fingerprint = pack_fingerprint(doc)?;
        let (risk, dialogue, plan) = build_wirings(&config, &catalog)?;
        Ok(Self {
            config,
            store: EireneStore::in_memory(),
            catalog,
            pack_fingerprint: fingerprint,
            risk,
            dialogue,
            plan,
            next_correlation: 1,
        })
    }

    pub fn catalog(&self) -> &ResponseCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &EireneStore {
        &self.store
    }

    pub fn pack_fingerprint(&self) -> &str {
        &self.pack_fingerprint
    }

    /// Scores one utterance and produces the companion's side of the turn.
    /// With a session key, history and selection state persist; without one,
    /// nothing is stored and selection degrades to stateless draws.
    pub fn run_turn(
        &mut self,
        now: MonotonicTimeNs,
        session_key: Option<&SessionKey>,
        utterance: &str,
        emotion: EmotionTag,
        emotion_confidence: f32,
        premium_tier: bool,
    ) -> Result<TurnOutcome, KernelError> {
        let correlation_id = self.next_correlation_id();
        let history_before = match session_key {
            Some(key) => self.store.conversation_history_len(key),
            None => 0,
        };
        let turn_id = TurnId(history_before / 2 + 1);

        let assessment = self.analyze_risk(
            correlation_id,
            turn_id,
            utterance,
            emotion,
            emotion_confidence,
        )?;

        let user_turn_ref = match session_key {
            Some(key) => Some(self.store.record_conversation_turn(ConversationTurnInput::v1(
                key.clone(),
                ConversationRole::User,
                utterance.to_string(),
                emotion,
                now,
            )?)?),
            None => None,
        };

        self.audit_turn_scored(
            now,
            session_key,
            correlation_id,
            turn_id,
            &assessment,
            user_turn_ref,
        )?;

        if assessment.action == RiskAction::ImmediateEmergency {
            return self.escalate_emergency(
                now,
                session_key,
                correlation_id,
                turn_id,
                assessment,
            );
        }

        let escalation = if assessment.action == RiskAction::UrgentConsult {
            self.build_emergency_payload(correlation_id, turn_id, &assessment)?
        } else {
            None
        };

        let seed = derive_draw_seed(session_key, turn_id);
        let history_len = match session_key {
            Some(key) => clamp_to_u32(self.store.conversation_history_len(key)),
            None => 0,
        };
        let turn_count = history_len / 2;

        let reply = self.build_reply(
            correlation_id,
            turn_id,
            seed,
            session_key,
            emotion,
            utterance,
            history_len,
            premium_tier,
        )?;
        let questions = self.build_questions(
            correlation_id,
            turn_id,
            DrawSeed(seed.0.wrapping_add(1)),
            session_key,
            emotion,
            turn_count,
            premium_tier,
        )?;

        let companion_turn_ref = match session_key {
            Some(key) => Some(self.store.record_conversation_turn(ConversationTurnInput::v1(
                key.clone(),
                ConversationRole::Companion,
                reply.reply_text.clone(),
                EmotionTag::Neutral,
                now,
            )?)?),
            None => None,
        };

        self.audit_reply_composed(
            now,
            session_key,
            correlation_id,
            turn_id,
            emotion,
            &reply,
            companion_turn_ref,
        )?;
        self.audit_questions_drawn(now, session_key, correlation_id, turn_id, emotion, &questions)?;
        for note in &reply.pool_resets {
            self.audit_pool_reset(
                now,
                session_key,
                correlation_id,
                turn_id,
                note.pool.as_str(),
                note.emotion,
            )?;
        }

        Ok(TurnOutcome::Reply {
            assessment,
            reply,
            questions,
            escalation,
        })
    }

    /// Closes out a session: farewell summary plus a treatment plan. The
    /// caller supplies the dominant emotion and the last risk score; the
    /// session's selection state is left untouched.
    pub fn close_session(
        &mut self,
        now: MonotonicTimeNs,
        session_key: Option<&SessionKey>,
        emotion: EmotionTag,
        risk_score: RiskScore,
        premium_tier: bool,
    ) -> Result<ClosingOutcome, KernelError> {
        let correlation_id = self.next_correlation_id();
        let history = match session_key {
            Some(key) => self.store.conversation_history_len(key),
            None => 0,
        };
        let turn_id = TurnId(history / 2 + 1);
        let seed = derive_draw_seed(session_key, turn_id);

        let summary_req = Ph1DialogueRequest::SummaryBuild(SummaryBuildRequest::v1(
            Ph1DialogueRequestEnvelope::v1(correlation_id, turn_id, seed)?,
            emotion,
            risk_score,
        )?);
        let summary = match self.dialogue.run_turn(&summary_req, None)? {
            Ph1DialogueWiringOutcome::Forwarded(Ph1DialogueResponse::SummaryBuildOk(ok)) => ok,
            Ph1DialogueWiringOutcome::Forwarded(Ph1DialogueResponse::Refuse(r)) => {
                return Err(KernelError::EngineRefused {
                    engine: "ph1dialogue",
                    reason_code: r.reason_code,
                    message: r.message,
                })
            }
            Ph1DialogueWiringOutcome::NotInvokedDisabled => {
                return Err(KernelError::EngineDisabled {
                    engine: "ph1dialogue",
                })
            }
            other => return Err(unexpected_dialogue_payload(other)),
        };

        let plan_req = Ph1PlanRequest::PlanBuild(PlanBuildRequest::v1(
            Ph1PlanRequestEnvelope::v1(correlation_id, turn_id)?,
            emotion,
            risk_score,
            premium_tier,
        )?);
        let plan = match self.plan.run_turn(&plan_req)? {
            Ph1PlanWiringOutcome::Forwarded(Ph1PlanResponse::PlanBuildOk(ok)) => ok.plan,
            Ph1PlanWiringOutcome::Forwarded(Ph1PlanResponse::Refuse(r)) => {
                return Err(KernelError::EngineRefused {
                    engine: "ph1plan",
                    reason_code: r.reason_code,
                    message: r.message,
                })
            }
            Ph1PlanWiringOutcome::NotInvokedDisabled => {
                return Err(KernelError::EngineDisabled { engine: "ph1plan" })
            }
            Ph1PlanWiringOutcome::Refused(r) => {
                return Err(KernelError::EngineRefused {
                    engine: "ph1plan",
                    reason_code: r.reason_code,
                    message: r.message,
                })
            }
        };

        self.store.record_audit_event(AuditEventInput::v1(
            now,
            session_key.cloned(),
            AuditEngine::Kernel,
            AuditEventType::SessionClosed,
            reason_codes::KERNEL_SESSION_CLOSED,
            AuditSeverity::Info,
            correlation_id,
            turn_id,
            payload_min(&[
                ("emotion", emotion.as_str()),
                ("risk_score", &risk_score.0.to_string()),
                ("plan_tier", plan.plan_tier.as_str()),
            ])?,
            None,
        )?)?;

        Ok(ClosingOutcome { summary, plan })
    }

    /// Replaces the live content pack. The new catalog and runtimes are
    /// built completely before anything is swapped in, so a failing pack
    /// leaves the kernel on its current content.
    pub fn swap_content_pack(
        &mut self,
        now: MonotonicTimeNs,
        doc: &PackDocument,
    ) -> Result<(), KernelError> {
        let catalog = Arc::new(ResponseCatalog::compile(doc)?);
        let fingerprint = pack_fingerprint(doc)?;
        let (risk, dialogue, plan) = build_wirings(&self.config, &catalog)?;

        self.catalog = catalog;
        self.pack_fingerprint = fingerprint;
        self.risk = risk;
        self.dialogue = dialogue;
        self.plan = plan;

        let correlation_id = self.next_correlation_id();
        self.store.record_audit_event(AuditEventInput::v1(
            now,
            None,
            AuditEngine::Kernel,
            AuditEventType::PackSwapped,
            reason_codes::KERNEL_PACK_SWAPPED,
            AuditSeverity::Info,
            correlation_id,
            TurnId(1),
            payload_min(&[
                ("pack_id", self.catalog.pack_id()),
                ("revision", &self.catalog.revision().to_string()),
                ("fingerprint", &self.pack_fingerprint),
            ])?,
            None,
        )?)?;
        Ok(())
    }

    fn next_correlation_id(&mut self) -> CorrelationId {
        let id = CorrelationId(self.next_correlation);
        self.next_correlation = self.next_correlation.saturating_add(1);
        id
    }

    fn analyze_risk(
        &self,
        correlation_id: CorrelationId,
        turn_id: TurnId,
        utterance: &str,
        emotion: EmotionTag,
        emotion_confidence: f32,
    ) -> Result<RiskAssessment, KernelError> {
        let req = Ph1RiskRequest::RiskAnalyze(RiskAnalyzeRequest::v1(
            Ph1RiskRequestEnvelope::v1(correlation_id, turn_id)?,
            utterance.to_string(),
            emotion,
            emotion_confidence,
        )?);
        match self.risk.run_turn(&req)? {
            Ph1RiskWiringOutcome::Forwarded(Ph1RiskResponse::RiskAnalyzeOk(ok)) => {
                Ok(ok.assessment)
            }
            Ph1RiskWiringOutcome::Forwarded(Ph1RiskResponse::Refuse(r)) => {
                Err(KernelError::EngineRefused {
                    engine: "ph1risk",
                    reason_code: r.reason_code,
                    message: r.message,
                })
            }
            Ph1RiskWiringOutcome::NotInvokedDisabled => {
                Err(KernelError::EngineDisabled { engine: "ph1risk" })
            }
            other => Err(unexpected_risk_payload(other)),
        }
    }

    fn build_emergency_payload(
        &self,
        correlation_id: CorrelationId,
        turn_id: TurnId,
        assessment: &RiskAssessment,
    ) -> Result<Option<EmergencyPayload>, KernelError> {
        let req = Ph1RiskRequest::EmergencyPayloadBuild(EmergencyPayloadRequest::v1(
            Ph1RiskRequestEnvelope::v1(correlation_id, turn_id)?,
            assessment.clone(),
            self.config.region.clone(),
        )?);
        match self.risk.run_turn(&req)? {
            Ph1RiskWiringOutcome::Forwarded(Ph1RiskResponse::EmergencyPayloadOk(ok)) => {
                Ok(ok.payload)
            }
            Ph1RiskWiringOutcome::Forwarded(Ph1RiskResponse::Refuse(r)) => {
                Err(KernelError::EngineRefused {
                    engine: "ph1risk",
                    reason_code: r.reason_code,
                    message: r.message,
                })
            }
            Ph1RiskWiringOutcome::NotInvokedDisabled => {
                Err(KernelError::EngineDisabled { engine: "ph1risk" })
            }
            other => Err(unexpected_risk_payload(other)),
        }
    }

    fn escalate_emergency(
        &mut self,
        now: MonotonicTimeNs,
        session_key: Option<&SessionKey>,
        correlation_id: CorrelationId,
        turn_id: TurnId,
        assessment: RiskAssessment,
    ) -> Result<TurnOutcome, KernelError> {
        let payload = self.build_emergency_payload(correlation_id, turn_id, &assessment)?;
        let companion_text = match &payload {
            Some(p) => p.message.clone(),
            None => self.catalog.crisis().emergency_message.clone(),
        };

        let companion_turn_ref = match session_key {
            Some(key) => Some(self.store.record_conversation_turn(ConversationTurnInput::v1(
                key.clone(),
                ConversationRole::Companion,
                companion_text.clone(),
                EmotionTag::Neutral,
                now,
            )?)?),
            None => None,
        };

        let resource_count = payload.as_ref().map_or(0, |p| p.resources.len());
        self.store.record_audit_event(AuditEventInput::v1(
            now,
            session_key.cloned(),
            AuditEngine::Ph1Risk,
            AuditEventType::EmergencyEscalated,
            reason_codes::KERNEL_EMERGENCY_ESCALATED,
            AuditSeverity::Error,
            correlation_id,
            turn_id,
            payload_min(&[
                ("risk_score", &assessment.score.0.to_string()),
                ("risk_action", assessment.action.as_str()),
                ("region", self.config.region.as_str()),
                ("resource_count", &resource_count.to_string()),
            ])?,
            companion_turn_ref,
        )?)?;

        Ok(TurnOutcome::Emergency {
            assessment,
            payload,
            companion_text,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn build_reply(
        &mut self,
        correlation_id: CorrelationId,
        turn_id: TurnId,
        seed: DrawSeed,
        session_key: Option<&SessionKey>,
        emotion: EmotionTag,
        utterance: &str,
        history_len: u32,
        premium_tier: bool,
    ) -> Result<ReplyBuildOk, KernelError> {
        let req = Ph1DialogueRequest::ReplyBuild(ReplyBuildRequest::v1(
            Ph1DialogueRequestEnvelope::v1(correlation_id, turn_id, seed)?,
            session_key.cloned(),
            emotion,
            utterance.to_string(),
            history_len,
            premium_tier,
        )?);
        let state = match session_key {
            Some(key) => Some(self.store.session_state_mut(key)),
            None => None,
        };
        match self.dialogue.run_turn(&req, state)? {
            Ph1DialogueWiringOutcome::Forwarded(Ph1DialogueResponse::ReplyBuildOk(ok)) => Ok(ok),
            Ph1DialogueWiringOutcome::Forwarded(Ph1DialogueResponse::Refuse(r)) => {
                Err(KernelError::EngineRefused {
                    engine: "ph1dialogue",
                    reason_code: r.reason_code,
                    message: r.message,
                })
            }
            Ph1DialogueWiringOutcome::NotInvokedDisabled => Err(KernelError::EngineDisabled {
                engine: "ph1dialogue",
            }),
            other => Err(unexpected_dialogue_payload(other)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_questions(
        &mut self,
        correlation_id: CorrelationId,
        turn_id: TurnId,
        seed: DrawSeed,
        session_key: Option<&SessionKey>,
        emotion: EmotionTag,
        turn_count: u32,
        premium_tier: bool,
    ) -> Result<QuestionsBuildOk, KernelError> {
        let req = Ph1DialogueRequest::QuestionsBuild(QuestionsBuildRequest::v1(
            Ph1DialogueRequestEnvelope::v1(correlation_id, turn_id, seed)?,
            session_key.cloned(),
            emotion,
            turn_count,
            premium_tier,
        )?);
        let state = match session_key {
            Some(key) => Some(self.store.session_state_mut(key)),
            None => None,
        };
        match self.dialogue.run_turn(&req, state)? {
            Ph1DialogueWiringOutcome::Forwarded(Ph1DialogueResponse::QuestionsBuildOk(ok)) => {
                Ok(ok)
            }
            Ph1DialogueWiringOutcome::Forwarded(Ph1DialogueResponse::Refuse(r)) => {
                Err(KernelError::EngineRefused {
                    engine: "ph1dialogue",
                    reason_code: r.reason_code,
                    message: r.message,
                })
            }
            Ph1DialogueWiringOutcome::NotInvokedDisabled => Err(KernelError::EngineDisabled {
                engine: "ph1dialogue",
            }),
            other => Err(unexpected_dialogue_payload(other)),
        }
    }

    fn audit_turn_scored(
        &mut self,
        now: MonotonicTimeNs,
        session_key: Option<&SessionKey>,
        correlation_id: CorrelationId,
        turn_id: TurnId,
        assessment: &RiskAssessment,
        turn_ref: Option<ConversationTurnId>,
    ) -> Result<(), KernelError> {
        let severity = match assessment.action {
            RiskAction::ImmediateEmergency => AuditSeverity::Error,
            RiskAction::UrgentConsult => AuditSeverity::Warn,
            RiskAction::FollowUp | RiskAction::Normal => AuditSeverity::Info,
        };
        self.store.record_audit_event(AuditEventInput::v1(
            now,
            session_key.cloned(),
            AuditEngine::Ph1Risk,
            AuditEventType::TurnScored,
            reason_codes::KERNEL_TURN_SCORED,
            severity,
            correlation_id,
            turn_id,
            payload_min(&[
                ("risk_score", &assessment.score.0.to_string()),
                ("risk_level", assessment.level.as_str()),
                ("risk_action", assessment.action.as_str()),
                ("trigger_count", &assessment.triggers.len().to_string()),
            ])?,
            turn_ref,
        )?)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn audit_reply_composed(
        &mut self,
        now: MonotonicTimeNs,
        session_key: Option<&SessionKey>,
        correlation_id: CorrelationId,
        turn_id: TurnId,
        emotion: EmotionTag,
        reply: &ReplyBuildOk,
        turn_ref: Option<ConversationTurnId>,
    ) -> Result<(), KernelError> {
        self.store.record_audit_event(AuditEventInput::v1(
            now,
            session_key.cloned(),
            AuditEngine::Ph1Dialogue,
            AuditEventType::ReplyComposed,
            reason_codes::KERNEL_REPLY_COMPOSED,
            AuditSeverity::Info,
            correlation_id,
            turn_id,
            payload_min(&[
                ("phase", reply.phase.as_str()),
                ("emotion", emotion.as_str()),
                ("courtesy", if reply.courtesy { "true" } else { "false" }),
            ])?,
            turn_ref,
        )?)?;
        Ok(())
    }

    fn audit_questions_drawn(
        &mut self,
        now: MonotonicTimeNs,
        session_key: Option<&SessionKey>,
        correlation_id: CorrelationId,
        turn_id: TurnId,
        emotion: EmotionTag,
        questions: &QuestionsBuildOk,
    ) -> Result<(), KernelError> {
        self.store.record_audit_event(AuditEventInput::v1(
            now,
            session_key.cloned(),
            AuditEngine::Ph1Dialogue,
            AuditEventType::QuestionsDrawn,
            reason_codes::KERNEL_QUESTIONS_DRAWN,
            AuditSeverity::Info,
            correlation_id,
            turn_id,
            payload_min(&[
                ("phase", questions.phase.as_str()),
                ("emotion", emotion.as_str()),
                ("question_count", &questions.questions.len().to_string()),
            ])?,
            None,
        )?)?;
        Ok(())
    }

    fn audit_pool_reset(
        &mut self,
        now: MonotonicTimeNs,
        session_key: Option<&SessionKey>,
        correlation_id: CorrelationId,
        turn_id: TurnId,
        pool: &str,
        emotion: EmotionTag,
    ) -> Result<(), KernelError> {
        self.store.record_audit_event(AuditEventInput::v1(
            now,
            session_key.cloned(),
            AuditEngine::Ph1Dialogue,
            AuditEventType::PoolReset,
            reason_codes::KERNEL_POOL_RESET,
            AuditSeverity::Info,
            correlation_id,
            turn_id,
            payload_min(&[("pool", pool), ("emotion", emotion.as_str())])?,
            None,
        )?)?;
        Ok(())
    }
}

fn build_wirings(
    config: &CompanionKernelConfig,
    catalog: &Arc<ResponseCatalog>,
) -> Result<
    (
        Ph1RiskWiring<Ph1RiskRuntime>,
        Ph1DialogueWiring<Ph1DialogueRuntime>,
        Ph1PlanWiring<Ph1PlanRuntime>,
    ),
    KernelError,
> {
    let risk = Ph1RiskWiring::new(
        config.risk,
        Ph1RiskRuntime::new(Ph1RiskConfig::mvp_v1(), Arc::clone(catalog)),
    )?;
    let dialogue = Ph1DialogueWiring::new(
        config.dialogue,
        Ph1DialogueRuntime::new(Ph1DialogueConfig::mvp_v1(), Arc::clone(catalog)),
    )?;
    let plan = Ph1PlanWiring::new(
        config.plan,
        Ph1PlanRuntime::new(Ph1PlanConfig::mvp_v1(), Arc::clone(catalog)),
    )?;
    Ok((risk, dialogue, plan))
}

/// Seed per session and turn: stable across kernels so a replayed session
/// reproduces its draws. Stateless calls fall back to OS entropy.
fn derive_draw_seed(session_key: Option<&SessionKey>, turn_id: TurnId) -> DrawSeed {
    match session_key {
        Some(key) => {
            let mut hasher = Sha256::new();
            hasher.update(key.as_str().as_bytes());
            hasher.update(turn_id.0.to_le_bytes());
            let digest = hasher.finalize();
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&digest[..8]);
            DrawSeed(u64::from_le_bytes(bytes))
        }
        None => entropy_draw_seed(),
    }
}

fn clamp_to_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

fn payload_min(pairs: &[(&str, &str)]) -> Result<AuditPayloadMin, ContractViolation> {
    let mut entries = BTreeMap::new();
    for (k, v) in pairs {
        entries.insert(PayloadKey::new(*k)?, PayloadValue::new(*v)?);
    }
    AuditPayloadMin::v1(entries)
}

fn unexpected_risk_payload(outcome: Ph1RiskWiringOutcome) -> KernelError {
    let (reason_code, message) = match outcome {
        Ph1RiskWiringOutcome::Refused(r) => (r.reason_code, r.message),
        _ => (
            crate::ph1risk::reason_codes::PH1_RISK_INTERNAL_PIPELINE_ERROR,
            "unexpected response variant for request".to_string(),
        ),
    };
    KernelError::EngineRefused {
        engine: "ph1risk",
        reason_code,
        message,
    }
}

fn unexpected_dialogue_payload(outcome: Ph1DialogueWiringOutcome) -> KernelError {
    let (reason_code, message) = match outcome {
        Ph1DialogueWiringOutcome::Refused(r) => (r.reason_code, r.message),
        _ => (
            crate::ph1dialogue::reason_codes::PH1_DIALOGUE_INTERNAL_PIPELINE_ERROR,
            "unexpected response variant for request".to_string(),
        ),
    };
    KernelError::EngineRefused {
        engine: "ph1dialogue",
        reason_code,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eirene_kernel_contracts::ph1dialogue::AdvisoryKind;
    use eirene_kernel_contracts::ph1risk::{RiskLevel, RiskScore};
    use eirene_storage::builtin::builtin_pack_document;

    fn kernel() -> CompanionKernel {
        let config = CompanionKernelConfig::mvp_v1(RegionTag::new("us").unwrap());
        CompanionKernel::new(config, &builtin_pack_document()).unwrap()
    }

    fn key(s: &str) -> SessionKey {
        SessionKey::new(s).unwrap()
    }

    fn run_calm_turn(
        k: &mut CompanionKernel,
        session: &SessionKey,
        at: u64,
        text: &str,
    ) -> TurnOutcome {
        k.run_turn(
            MonotonicTimeNs(at),
            Some(session),
            text,
            EmotionTag::Neutral,
            0.5,
            false,
        )
        .unwrap()
    }

    #[test]
    fn at_kernel_01_calm_turn_yields_reply_questions_and_audits() {
        let mut k = kernel();
        let s = key("k-1");

        let outcome = run_calm_turn(&mut k, &s, 10, "The weather was fine today");
        let TurnOutcome::Reply {
            assessment,
            reply,
            questions,
            escalation,
        } = outcome
        else {
            panic!("expected reply outcome");
        };

        assert_eq!(assessment.score, RiskScore(0));
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(!reply.reply_text.is_empty());
        assert!(!reply.courtesy);
        assert_eq!(questions.questions.len(), 2);
        assert!(escalation.is_none());

        // One user row, one companion row.
        assert_eq!(k.store().conversation_history_len(&s), 2);
        let types: Vec<AuditEventType> =
            k.store().audit_log().iter().map(|e| e.event_type).collect();
        assert!(types.contains(&AuditEventType::TurnScored));
        assert!(types.contains(&AuditEventType::ReplyComposed));
        assert!(types.contains(&AuditEventType::QuestionsDrawn));
        assert!(!types.contains(&AuditEventType::EmergencyEscalated));
    }

    #[test]
    fn at_kernel_02_crisis_turn_short_circuits_to_emergency() {
        let mut k = kernel();
        let s = key("k-crisis");

        let outcome = k
            .run_turn(
                MonotonicTimeNs(10),
                Some(&s),
                "I want to die, I have no hope left",
                EmotionTag::Sad,
                0.9,
                false,
            )
            .unwrap();
        let TurnOutcome::Emergency {
            assessment,
            payload,
            companion_text,
        } = outcome
        else {
            panic!("expected emergency outcome");
        };

        assert!(assessment.score.0 >= 9);
        assert_eq!(assessment.level, RiskLevel::Critical);
        assert_eq!(assessment.action, RiskAction::ImmediateEmergency);
        assert!(!assessment.triggers.is_empty());
        let payload = payload.expect("critical turn must carry a payload");
        assert!(!payload.resources.is_empty());
        assert_eq!(companion_text, payload.message);

        // Companion emergency text is persisted as the second row.
        let rows = k.store().conversation_turns_for_session(&s);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].role, ConversationRole::Companion);
        assert_eq!(rows[1].text, companion_text);

        let types: Vec<AuditEventType> =
            k.store().audit_log().iter().map(|e| e.event_type).collect();
        assert!(types.contains(&AuditEventType::EmergencyEscalated));
        assert!(!types.contains(&AuditEventType::ReplyComposed));
    }

    #[test]
    fn at_kernel_03_urgent_turn_attaches_escalation_but_still_replies() {
        let mut k = kernel();
        let s = key("k-urgent");

        // Five distinct high-risk keywords + strong sad bonus = 7 -> URGENT_CONSULT.
        let outcome = k
            .run_turn(
                MonotonicTimeNs(10),
                Some(&s),
                "I feel depressed and anxious, so alone, worthless and hopeless",
                EmotionTag::Sad,
                0.9,
                false,
            )
            .unwrap();
        let TurnOutcome::Reply {
            assessment,
            escalation,
            ..
        } = outcome
        else {
            panic!("expected reply outcome");
        };

        assert_eq!(assessment.score, RiskScore(7));
        assert_eq!(assessment.action, RiskAction::UrgentConsult);
        let payload = escalation.expect("urgent turn must carry an escalation payload");
        assert!(!payload.message.is_empty());
    }

    #[test]
    fn at_kernel_04_session_draws_are_deterministic_across_kernels() {
        let mut a = kernel();
        let mut b = kernel();
        let s = key("k-replay");

        for at in [10u64, 20, 30] {
            let ra = run_calm_turn(&mut a, &s, at, "Another ordinary day at the office");
            let rb = run_calm_turn(&mut b, &s, at, "Another ordinary day at the office");
            assert_eq!(ra, rb);
        }
    }

    #[test]
    fn at_kernel_05_stateless_turn_persists_nothing() {
        let mut k = kernel();

        let outcome = k
            .run_turn(
                MonotonicTimeNs(10),
                None,
                "Just passing through",
                EmotionTag::Neutral,
                0.5,
                false,
            )
            .unwrap();
        assert!(matches!(outcome, TurnOutcome::Reply { .. }));
        assert!(k.store().conversation_ledger().is_empty());
        // Audits still record the scored turn, without a session key.
        assert!(k
            .store()
            .audit_log()
            .iter()
            .any(|e| e.event_type == AuditEventType::TurnScored && e.session_key.is_none()));
    }

    #[test]
    fn at_kernel_06_turn_ids_advance_with_history() {
        let mut k = kernel();
        let s = key("k-ids");

        for (at, expected) in [(10u64, 1u64), (20, 2), (30, 3)] {
            run_calm_turn(&mut k, &s, at, "Telling you about my day again");
            let scored: Vec<TurnId> = k
                .store()
                .audit_log()
                .iter()
                .filter(|e| e.event_type == AuditEventType::TurnScored)
                .map(|e| e.turn_id)
                .collect();
            assert_eq!(*scored.last().unwrap(), TurnId(expected));
        }
    }

    #[test]
    fn at_kernel_07_gratitude_turn_returns_pack_courtesy() {
        let mut k = kernel();
        let s = key("k-thanks");

        let outcome = run_calm_turn(&mut k, &s, 10, "thank you so much for your help");
        let TurnOutcome::Reply { reply, .. } = outcome else {
            panic!("expected reply outcome");
        };
        assert!(reply.courtesy);
        assert_eq!(reply.reply_text, k.catalog().courtesy_reply());
    }

    #[test]
    fn at_kernel_08_close_session_returns_summary_plan_and_audit() {
        let mut k = kernel();
        let s = key("k-close");
        run_calm_turn(&mut k, &s, 10, "I have been sleeping badly");

        let closing = k
            .close_session(MonotonicTimeNs(20), Some(&s), EmotionTag::Sad, RiskScore(7), false)
            .unwrap();
        assert_eq!(closing.summary.advisory, AdvisoryKind::Urgent);
        assert!(!closing.summary.summary_text.is_empty());
        assert!(closing.plan.recommendations[0].contains("IMPORTANT"));
        assert!(!closing.plan.exercises.is_empty());

        assert!(k
            .store()
            .audit_log()
            .iter()
            .any(|e| e.event_type == AuditEventType::SessionClosed));
    }

    #[test]
    fn at_kernel_09_swap_content_pack_is_atomic_and_audited() {
        let mut k = kernel();
        let before = k.pack_fingerprint().to_string();

        let mut doc = builtin_pack_document();
        doc.pack_id = "eirene_swap_test".to_string();
        doc.revision = 2;
        doc.courtesy_reply = "No trouble at all. I'm glad we talked.".to_string();
        k.swap_content_pack(MonotonicTimeNs(50), &doc).unwrap();

        assert_ne!(k.pack_fingerprint(), before);
        assert_eq!(k.catalog().pack_id(), "eirene_swap_test");
        assert!(k
            .store()
            .audit_log()
            .iter()
            .any(|e| e.event_type == AuditEventType::PackSwapped));

        // New courtesy text is live on the next turn.
        let s = key("k-swap");
        let TurnOutcome::Reply { reply, .. } =
            run_calm_turn(&mut k, &s, 60, "thank you, that helped")
        else {
            panic!("expected reply outcome");
        };
        assert_eq!(reply.reply_text, "No trouble at all. I'm glad we talked.");
    }

    #[test]
    fn at_kernel_10_swap_failure_keeps_current_pack() {
        let mut k = kernel();
        let before = k.pack_fingerprint().to_string();

        let mut doc = builtin_pack_document();
        doc.emotions.clear();
        assert!(k.swap_content_pack(MonotonicTimeNs(50), &doc).is_err());
        assert_eq!(k.pack_fingerprint(), before);
    }

    #[test]
    fn at_kernel_11_disabled_risk_engine_blocks_the_turn() {
        let mut config = CompanionKernelConfig::mvp_v1(RegionTag::new("us").unwrap());
        config.risk = Ph1RiskWiringConfig::mvp_v1(false);
        let mut k = CompanionKernel::new(config, &builtin_pack_document()).unwrap();

        let err = k
            .run_turn(
                MonotonicTimeNs(10),
                Some(&key("k-off")),
                "hello there",
                EmotionTag::Neutral,
                0.5,
                false,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            KernelError::EngineDisabled { engine: "ph1risk" }
        ));
    }

    #[test]
    fn at_kernel_12_unknown_region_payload_has_empty_directory() {
        let config = CompanionKernelConfig::mvp_v1(RegionTag::new("atlantis").unwrap());
        let mut k = CompanionKernel::new(config, &builtin_pack_document()).unwrap();

        let outcome = k
            .run_turn(
                MonotonicTimeNs(10),
                Some(&key("k-region")),
                "I want to end my life, there is no reason to live",
                EmotionTag::Sad,
                0.95,
                false,
            )
            .unwrap();
        let TurnOutcome::Emergency { payload, .. } = outcome else {
            panic!("expected emergency outcome");
        };
        let payload = payload.expect("payload still builds without a directory");
        assert!(payload.resources.is_empty());
        assert!(!payload.message.is_empty());
    }
}
