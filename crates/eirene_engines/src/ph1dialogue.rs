#![forbid(unsafe_code)]

use std::sync::Arc;

use rand::Rng;

use eirene_kernel_contracts::ph1dialogue::{
    AdvisoryKind, DialogueCapabilityId, DialoguePhase, Ph1DialogueRefuse, Ph1DialogueRequest,
    Ph1DialogueResponse, PoolResetNote, QuestionsBuildOk, QuestionsBuildRequest, ReplyBuildOk,
    ReplyBuildRequest, SummaryBuildOk, SummaryBuildRequest,
};
use eirene_kernel_contracts::ph1risk::RiskScore;
use eirene_kernel_contracts::ph1session::{PoolKind, SessionDialogueState};
use eirene_kernel_contracts::{ReasonCodeId, Validate};

use crate::catalog::ResponseCatalog;
use crate::ph1risk::canonical_transcript;
use crate::selection::{draw_from_pool, draw_rotated, sample_questions, seeded_rng};

pub mod reason_codes {
    // PH1.DIALOGUE reason-code namespace. Values are placeholders until global registry lock.
    pub const OK_REPLY_BUILD: u32 = 0x444C_0001;
    pub const OK_REPLY_COURTESY: u32 = 0x444C_0002;
    pub const OK_QUESTIONS_BUILD: u32 = 0x444C_0003;
    pub const OK_SUMMARY_BUILD: u32 = 0x444C_0004;

    pub const REFUSE_INVALID_REQUEST: u32 = 0x444C_0101;
    pub const REFUSE_EMPTY_POOL: u32 = 0x444C_0102;
    pub const REFUSE_INTERNAL_CONSTRUCTION: u32 = 0x444C_00F1;
}

#[derive(Debug, Clone)]
pub struct Ph1DialogueConfig {
    /// Substring markers that short-circuit assembly into the courtesy reply.
    pub gratitude_markers: Vec<&'static str>,
    /// A subject word must be strictly longer than this many chars.
    pub subject_min_chars: usize,
    /// Transitions join the reply from this turn count onward.
    pub transition_min_turn: u32,
    /// Follow-up closers join the reply from this turn count onward.
    pub followup_min_turn: u32,
    pub premium_question_limit: usize,
    pub early_question_limit: usize,
    pub later_question_limit: usize,
    /// Turn counts at or below this use the early question limit.
    pub early_turn_cutoff: u32,
    pub max_transcript_chars: usize,
    pub advisory_emergency_cut: u8,
    pub advisory_urgent_cut: u8,
    pub advisory_suggestion_cut: u8,
}

impl Ph1DialogueConfig {
    pub fn mvp_v1() -> Self {
        Self {
            gratitude_markers: vec!["thank", "grateful", "appreciate"],
            subject_min_chars: 3,
            transition_min_turn: 2,
            followup_min_turn: 1,
            premium_question_limit: 5,
            early_question_limit: 2,
            later_question_limit: 3,
            early_turn_cutoff: 1,
            max_transcript_chars: 8192,
            advisory_emergency_cut: 8,
            advisory_urgent_cut: 6,
            advisory_suggestion_cut: 4,
        }
    }
}

pub struct Ph1DialogueRuntime {
    config: Ph1DialogueConfig,
    catalog: Arc<ResponseCatalog>,
}

impl Ph1DialogueRuntime {
    pub fn new(config: Ph1DialogueConfig, catalog: Arc<ResponseCatalog>) -> Self {
        Self { config, catalog }
    }

    /// Session state is borrowed per call; `None` degrades every draw to
    /// stateless uniform selection. The caller serializes calls that share
    /// one session.
    pub fn run(
        &self,
        req: &Ph1DialogueRequest,
        state: Option<&mut SessionDialogueState>,
    ) -> Ph1DialogueResponse {
        if req.validate().is_err() {
            return refuse(
                capability_of(req),
                reason_codes::REFUSE_INVALID_REQUEST,
                "request failed contract validation",
            );
        }
        match req {
            Ph1DialogueRequest::ReplyBuild(r) => self.run_reply(r, state),
            Ph1DialogueRequest::QuestionsBuild(r) => self.run_questions(r, state),
            Ph1DialogueRequest::SummaryBuild(r) => self.run_summary(r),
        }
    }

    fn run_reply(
        &self,
        req: &ReplyBuildRequest,
        mut state: Option<&mut SessionDialogueState>,
    ) -> Ph1DialogueResponse {
        let turn_count = req.history_len / 2;
        let phase = derive_phase(turn_count);
        let canonical =
            canonical_transcript(&req.transcript_text, self.config.max_transcript_chars);

        if self
            .config
            .gratitude_markers
            .iter()
            .any(|m| canonical.contains(m))
        {
            return match ReplyBuildOk::v1(
                ReasonCodeId(reason_codes::OK_REPLY_COURTESY),
                self.catalog.courtesy_reply().to_string(),
                phase,
                true,
                Vec::new(),
            ) {
                Ok(ok) => Ph1DialogueResponse::ReplyBuildOk(ok),
                Err(_) => refuse(
                    DialogueCapabilityId::ReplyBuild,
                    reason_codes::REFUSE_INTERNAL_CONSTRUCTION,
                    "courtesy reply failed response-contract validation",
                ),
            };
        }

        let mut rng = seeded_rng(req.envelope.draw_seed);
        let mut parts: Vec<String> = Vec::new();
        let mut pool_resets: Vec<PoolResetNote> = Vec::new();

        let prefixes = self.catalog.prefixes_for(req.emotion);
        match draw_from_pool(
            state.as_deref_mut(),
            PoolKind::Prefix,
            req.emotion,
            prefixes.len(),
            &mut rng,
        ) {
            Ok(draw) => {
                if draw.reset {
                    pool_resets.push(PoolResetNote {
                        pool: PoolKind::Prefix,
                        emotion: req.emotion,
                    });
                }
                parts.push(prefixes[draw.index].clone());
            }
            Err(_) => {
                return refuse(
                    DialogueCapabilityId::ReplyBuild,
                    reason_codes::REFUSE_EMPTY_POOL,
                    "prefix pool is empty even after neutral fallback",
                );
            }
        }

        let bodies = self.catalog.bodies_for(req.emotion, phase);
        match draw_rotated(state.as_deref_mut(), req.emotion, phase, bodies.len(), &mut rng) {
            Ok(draw) => {
                if draw.reset {
                    pool_resets.push(PoolResetNote {
                        pool: PoolKind::Response,
                        emotion: req.emotion,
                    });
                }
                parts.push(bodies[draw.index].clone());
            }
            Err(_) => {
                return refuse(
                    DialogueCapabilityId::ReplyBuild,
                    reason_codes::REFUSE_EMPTY_POOL,
                    "body pool is empty even after neutral fallback",
                );
            }
        }

        let subject = first_subject_word(&canonical, self.config.subject_min_chars);
        if let Some(topic) = self.catalog.topic_match_for(&canonical, subject, req.emotion) {
            if !topic.templates.is_empty() {
                let template = &topic.templates[rng.gen_range(0..topic.templates.len())];
                parts.push(template.replace("{subject}", topic.word));
            }
        }

        if let Some(word) = subject {
            parts.push(self.catalog.subject_note().replace("{subject}", word));
        }

        if turn_count >= self.config.transition_min_turn {
            let transitions = self.catalog.transitions_for(req.emotion);
            if !transitions.is_empty() {
                parts.push(transitions[rng.gen_range(0..transitions.len())].clone());
            }
        }

        if let Some(enrichment) = self.catalog.enrichment_for(&canonical, req.emotion) {
            parts.push(enrichment.to_string());
        }

        let long_forms = self.catalog.long_forms_for(req.emotion);
        match draw_from_pool(
            state.as_deref_mut(),
            PoolKind::LongForm,
            req.emotion,
            long_forms.len(),
            &mut rng,
        ) {
            Ok(draw) => {
                if draw.reset {
                    pool_resets.push(PoolResetNote {
                        pool: PoolKind::LongForm,
                        emotion: req.emotion,
                    });
                }
                parts.push(long_forms[draw.index].clone());
            }
            Err(_) => {
                return refuse(
                    DialogueCapabilityId::ReplyBuild,
                    reason_codes::REFUSE_EMPTY_POOL,
                    "long-form pool is empty even after neutral fallback",
                );
            }
        }

        if turn_count >= self.config.followup_min_turn {
            let followups = self.catalog.followups_for(req.emotion);
            match draw_from_pool(
                state.as_deref_mut(),
                PoolKind::Followup,
                req.emotion,
                followups.len(),
                &mut rng,
            ) {
                Ok(draw) => {
                    if draw.reset {
                        pool_resets.push(PoolResetNote {
                            pool: PoolKind::Followup,
                            emotion: req.emotion,
                        });
                    }
                    parts.push(followups[draw.index].clone());
                }
                Err(_) => {
                    return refuse(
                        DialogueCapabilityId::ReplyBuild,
                        reason_codes::REFUSE_EMPTY_POOL,
                        "follow-up pool is empty even after neutral fallback",
                    );
                }
            }
        }

        let reply_text = collapse_spaces(&parts.join(" "));
        match ReplyBuildOk::v1(
            ReasonCodeId(reason_codes::OK_REPLY_BUILD),
            reply_text,
            phase,
            false,
            pool_resets,
        ) {
            Ok(ok) => Ph1DialogueResponse::ReplyBuildOk(ok),
            Err(_) => refuse(
                DialogueCapabilityId::ReplyBuild,
                reason_codes::REFUSE_INTERNAL_CONSTRUCTION,
                "assembled reply failed response-contract validation",
            ),
        }
    }

    fn run_questions(
        &self,
        req: &QuestionsBuildRequest,
        mut state: Option<&mut SessionDialogueState>,
    ) -> Ph1DialogueResponse {
        let phase = derive_phase(req.turn_count);
        let pool = self.catalog.questions_for(req.emotion, phase);
        if pool.is_empty() {
            return refuse(
                DialogueCapabilityId::QuestionsBuild,
                reason_codes::REFUSE_EMPTY_POOL,
                "question pool is empty even after neutral fallback",
            );
        }
        let limit = if req.premium_tier {
            self.config.premium_question_limit
        } else if req.turn_count <= self.config.early_turn_cutoff {
            self.config.early_question_limit
        } else {
            self.config.later_question_limit
        };
        let k = limit.min(pool.len());
        let mut rng = seeded_rng(req.envelope.draw_seed);
        let chosen = match sample_questions(
            state.as_deref_mut(),
            req.emotion,
            pool.len(),
            k,
            &mut rng,
        ) {
            Ok(indices) => indices,
            Err(_) => {
                return refuse(
                    DialogueCapabilityId::QuestionsBuild,
                    reason_codes::REFUSE_EMPTY_POOL,
                    "question sampling found no candidates",
                );
            }
        };
        // Indices are distinct; texts are deduplicated as well so a pack
        // with repeated entries still yields a valid response.
        let mut questions: Vec<String> = Vec::with_capacity(chosen.len());
        for index in chosen {
            let q = pool[index].clone();
            if !questions.contains(&q) {
                questions.push(q);
            }
        }
        match QuestionsBuildOk::v1(ReasonCodeId(reason_codes::OK_QUESTIONS_BUILD), phase, questions)
        {
            Ok(ok) => Ph1DialogueResponse::QuestionsBuildOk(ok),
            Err(_) => refuse(
                DialogueCapabilityId::QuestionsBuild,
                reason_codes::REFUSE_INTERNAL_CONSTRUCTION,
                "question list failed response-contract validation",
            ),
        }
    }

    fn run_summary(&self, req: &SummaryBuildRequest) -> Ph1DialogueResponse {
        let bodies = self.catalog.bodies_for(req.emotion, DialoguePhase::Followup);
        if bodies.is_empty() {
            return refuse(
                DialogueCapabilityId::SummaryBuild,
                reason_codes::REFUSE_EMPTY_POOL,
                "follow-up body pool is empty even after neutral fallback",
            );
        }
        let mut rng = seeded_rng(req.envelope.draw_seed);
        let body = &bodies[rng.gen_range(0..bodies.len())];
        let advisory = self.advisory_for(req.risk_score);
        let summary_text = collapse_spaces(&format!("{body} {}", self.catalog.advisory(advisory)));
        match SummaryBuildOk::v1(
            ReasonCodeId(reason_codes::OK_SUMMARY_BUILD),
            summary_text,
            advisory,
        ) {
            Ok(ok) => Ph1DialogueResponse::SummaryBuildOk(ok),
            Err(_) => refuse(
                DialogueCapabilityId::SummaryBuild,
                reason_codes::REFUSE_INTERNAL_CONSTRUCTION,
                "summary failed response-contract validation",
            ),
        }
    }

    fn advisory_for(&self, score: RiskScore) -> AdvisoryKind {
        if score.0 >= self.config.advisory_emergency_cut {
            AdvisoryKind::Emergency
        } else if score.0 >= self.config.advisory_urgent_cut {
            AdvisoryKind::Urgent
        } else if score.0 >= self.config.advisory_suggestion_cut {
            AdvisoryKind::Suggestion
        } else {
            AdvisoryKind::Encouragement
        }
    }
}

/// Phase is a pure step function of completed user turns.
pub fn derive_phase(turn_count: u32) -> DialoguePhase {
    match turn_count {
        0 | 1 => DialoguePhase::Initial,
        2 | 3 => DialoguePhase::Exploration,
        4 | 5 => DialoguePhase::Solution,
        _ => DialoguePhase::Followup,
    }
}

fn refuse(
    capability_id: DialogueCapabilityId,
    reason_code: u32,
    message: &'static str,
) -> Ph1DialogueResponse {
    Ph1DialogueResponse::Refuse(
        Ph1DialogueRefuse::v1(capability_id, ReasonCodeId(reason_code), message.to_string())
            .expect("refuse response must construct for static messages"),
    )
}

fn capability_of(req: &Ph1DialogueRequest) -> DialogueCapabilityId {
    match req {
        Ph1DialogueRequest::ReplyBuild(_) => DialogueCapabilityId::ReplyBuild,
        Ph1DialogueRequest::QuestionsBuild(_) => DialogueCapabilityId::QuestionsBuild,
        Ph1DialogueRequest::SummaryBuild(_) => DialogueCapabilityId::SummaryBuild,
    }
}

fn first_subject_word(canonical: &str, min_chars: usize) -> Option<&str> {
    canonical
        .split_whitespace()
        .find(|w| w.chars().count() > min_chars)
}

fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
