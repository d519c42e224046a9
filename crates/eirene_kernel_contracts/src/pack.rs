#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ph1session::MAX_POOL_ITEMS;
use crate::{ContractViolation, SchemaVersion, Validate};

pub const PACK_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// `schema_version` value a pack document must carry on disk.
pub const PACK_DOCUMENT_SCHEMA_VERSION: u32 = 1;

const MAX_TEXT_LEN: usize = 1024;

/// Versioned, hot-swappable content-pack document. All reply text, question
/// pools, keyword tables, exercises, and emergency directories ship here as
/// plain data; nothing in a pack is executable. Emotion and phase keys are
/// free-form labels resolved at catalog compile time; unknown labels are
/// skipped there, not rejected here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackDocument {
    pub schema_version: u32,
    pub pack_id: String,
    pub revision: u32,
    #[serde(default)]
    pub emotions: BTreeMap<String, EmotionContentDoc>,
    #[serde(default)]
    pub enrichments: Vec<EnrichmentDoc>,
    #[serde(default)]
    pub topics: Vec<TopicDoc>,
    #[serde(default)]
    pub exercises: BTreeMap<String, ExerciseTiersDoc>,
    #[serde(default)]
    pub emergency: BTreeMap<String, Vec<EmergencyResourceDoc>>,
    #[serde(default)]
    pub courtesy_reply: String,
    /// Template for the subject acknowledgement; must contain `{subject}`.
    #[serde(default)]
    pub subject_note: String,
    #[serde(default)]
    pub advisories: AdvisoryDoc,
    #[serde(default)]
    pub crisis: CrisisDoc,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmotionContentDoc {
    /// Phase label -> reply bodies served by rotation.
    #[serde(default)]
    pub bodies: BTreeMap<String, Vec<String>>,
    /// Phase label -> follow-up question pool.
    #[serde(default)]
    pub questions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub transitions: Vec<String>,
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub long_forms: Vec<String>,
    #[serde(default)]
    pub followups: Vec<String>,
}

/// Keyword-triggered enrichment fragment. `keywords` is pipe-delimited
/// alternatives; `responses` maps an emotion label or `"general"` to the
/// fragment text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentDoc {
    pub keywords: String,
    #[serde(default)]
    pub responses: BTreeMap<String, String>,
}

/// Keyword-triggered topic templates. Template text may reference the
/// detected subject with a `{subject}` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicDoc {
    pub keywords: String,
    #[serde(default)]
    pub templates: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExerciseTiersDoc {
    #[serde(default)]
    pub free: Vec<String>,
    #[serde(default)]
    pub premium: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyResourceDoc {
    pub label: String,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AdvisoryDoc {
    #[serde(default)]
    pub emergency: String,
    #[serde(default)]
    pub urgent: String,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default)]
    pub encouragement: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CrisisDoc {
    #[serde(default)]
    pub emergency_message: String,
    #[serde(default)]
    pub emergency_actions: Vec<String>,
    #[serde(default)]
    pub urgent_message: String,
    #[serde(default)]
    pub urgent_actions: Vec<String>,
}

fn validate_text_list(
    field: &'static str,
    list: &[String],
    max_entries: usize,
) -> Result<(), ContractViolation> {
    if list.len() > max_entries {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "too many entries",
        });
    }
    for t in list {
        if t.len() > MAX_TEXT_LEN {
            return Err(ContractViolation::InvalidValue {
                field,
                reason: "entry exceeds max length",
            });
        }
    }
    Ok(())
}

fn validate_pool_map(
    field: &'static str,
    map: &BTreeMap<String, Vec<String>>,
) -> Result<(), ContractViolation> {
    if map.len() > 16 {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "too many keys",
        });
    }
    for pool in map.values() {
        validate_text_list(field, pool, MAX_POOL_ITEMS)?;
    }
    Ok(())
}

impl Validate for PackDocument {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PACK_DOCUMENT_SCHEMA_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "pack_document.schema_version",
                reason: "must match PACK_DOCUMENT_SCHEMA_VERSION",
            });
        }
        if self.pack_id.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "pack_document.pack_id",
                reason: "must not be empty",
            });
        }
        if self.pack_id.len() > 64 || !self.pack_id.is_ascii() {
            return Err(ContractViolation::InvalidValue {
                field: "pack_document.pack_id",
                reason: "must be <= 64 ASCII chars",
            });
        }
        if self.emotions.len() > 16 {
            return Err(ContractViolation::InvalidValue {
                field: "pack_document.emotions",
                reason: "must be <= 16 entries",
            });
        }
        for bucket in self.emotions.values() {
            validate_pool_map("pack_document.emotions.bodies", &bucket.bodies)?;
            validate_pool_map("pack_document.emotions.questions", &bucket.questions)?;
            validate_text_list(
                "pack_document.emotions.transitions",
                &bucket.transitions,
                MAX_POOL_ITEMS,
            )?;
            validate_text_list(
                "pack_document.emotions.prefixes",
                &bucket.prefixes,
                MAX_POOL_ITEMS,
            )?;
            validate_text_list(
                "pack_document.emotions.long_forms",
                &bucket.long_forms,
                MAX_POOL_ITEMS,
            )?;
            validate_text_list(
                "pack_document.emotions.followups",
                &bucket.followups,
                MAX_POOL_ITEMS,
            )?;
        }
        if self.enrichments.len() > 64 {
            return Err(ContractViolation::InvalidValue {
                field: "pack_document.enrichments",
                reason: "must be <= 64 entries",
            });
        }
        for e in &self.enrichments {
            if e.keywords.trim().is_empty() {
                return Err(ContractViolation::InvalidValue {
                    field: "pack_document.enrichments.keywords",
                    reason: "must not be empty",
                });
            }
            if e.keywords.len() > 256 {
                return Err(ContractViolation::InvalidValue {
                    field: "pack_document.enrichments.keywords",
                    reason: "must be <= 256 chars",
                });
            }
            for text in e.responses.values() {
                if text.len() > MAX_TEXT_LEN {
                    return Err(ContractViolation::InvalidValue {
                        field: "pack_document.enrichments.responses",
                        reason: "entry exceeds max length",
                    });
                }
            }
        }
        if self.topics.len() > 64 {
            return Err(ContractViolation::InvalidValue {
                field: "pack_document.topics",
                reason: "must be <= 64 entries",
            });
        }
        for t in &self.topics {
            if t.keywords.trim().is_empty() {
                return Err(ContractViolation::InvalidValue {
                    field: "pack_document.topics.keywords",
                    reason: "must not be empty",
                });
            }
            if t.keywords.len() > 256 {
                return Err(ContractViolation::InvalidValue {
                    field: "pack_document.topics.keywords",
                    reason: "must be <= 256 chars",
                });
            }
            validate_pool_map("pack_document.topics.templates", &t.templates)?;
        }
        if self.exercises.len() > 16 {
            return Err(ContractViolation::InvalidValue {
                field: "pack_document.exercises",
                reason: "must be <= 16 entries",
            });
        }
        for tiers in self.exercises.values() {
            validate_text_list("pack_document.exercises.free", &tiers.free, 16)?;
            validate_text_list("pack_document.exercises.premium", &tiers.premium, 16)?;
        }
        if self.emergency.len() > 32 {
            return Err(ContractViolation::InvalidValue {
                field: "pack_document.emergency",
                reason: "must be <= 32 regions",
            });
        }
        for resources in self.emergency.values() {
            if resources.len() > 16 {
                return Err(ContractViolation::InvalidValue {
                    field: "pack_document.emergency",
                    reason: "must be <= 16 resources per region",
                });
            }
            for r in resources {
                if r.label.trim().is_empty() || r.label.len() > 128 {
                    return Err(ContractViolation::InvalidValue {
                        field: "pack_document.emergency.label",
                        reason: "must be 1..=128 chars",
                    });
                }
                if r.contact.trim().is_empty() || r.contact.len() > 128 {
                    return Err(ContractViolation::InvalidValue {
                        field: "pack_document.emergency.contact",
                        reason: "must be 1..=128 chars",
                    });
                }
            }
        }
        if self.courtesy_reply.len() > MAX_TEXT_LEN {
            return Err(ContractViolation::InvalidValue {
                field: "pack_document.courtesy_reply",
                reason: "exceeds max length",
            });
        }
        if self.subject_note.len() > MAX_TEXT_LEN {
            return Err(ContractViolation::InvalidValue {
                field: "pack_document.subject_note",
                reason: "exceeds max length",
            });
        }
        if !self.subject_note.is_empty() && !self.subject_note.contains("{subject}") {
            return Err(ContractViolation::InvalidValue {
                field: "pack_document.subject_note",
                reason: "must contain the {subject} placeholder",
            });
        }
        for text in [
            &self.advisories.emergency,
            &self.advisories.urgent,
            &self.advisories.suggestion,
            &self.advisories.encouragement,
            &self.crisis.emergency_message,
            &self.crisis.urgent_message,
        ] {
            if text.len() > MAX_TEXT_LEN {
                return Err(ContractViolation::InvalidValue {
                    field: "pack_document.advisories",
                    reason: "entry exceeds max length",
                });
            }
        }
        validate_text_list(
            "pack_document.crisis.emergency_actions",
            &self.crisis.emergency_actions,
            8,
        )?;
        validate_text_list(
            "pack_document.crisis.urgent_actions",
            &self.crisis.urgent_actions,
            8,
        )?;
        Ok(())
    }
}
