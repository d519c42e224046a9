#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use eirene_kernel_contracts::pack::{PackDocument, PACK_DOCUMENT_SCHEMA_VERSION};
use eirene_kernel_contracts::ph1dialogue::{AdvisoryKind, DialoguePhase};
use eirene_kernel_contracts::ph1risk::{EmergencyResource, RegionTag};
use eirene_kernel_contracts::{ContractViolation, EmotionTag, Validate};

const EMPTY_POOL: &[String] = &[];
const EMPTY_RESOURCES: &[EmergencyResource] = &[];

#[derive(Debug)]
pub enum CatalogBuildError {
    UnsupportedSchemaVersion { got: u32 },
    InvalidPack(ContractViolation),
    /// The neutral bucket is the last resort for every lookup; a pack that
    /// cannot serve it is unusable.
    EmptyFallbackPool { pool: &'static str },
}

impl std::fmt::Display for CatalogBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedSchemaVersion { got } => {
                write!(f, "unsupported pack schema version: {got}")
            }
            Self::InvalidPack(v) => write!(f, "pack document failed validation: {v:?}"),
            Self::EmptyFallbackPool { pool } => {
                write!(f, "neutral fallback pool is empty: {pool}")
            }
        }
    }
}

impl std::error::Error for CatalogBuildError {}

impl From<ContractViolation> for CatalogBuildError {
    fn from(value: ContractViolation) -> Self {
        Self::InvalidPack(value)
    }
}

#[derive(Debug, Clone, Default)]
struct EmotionBucket {
    bodies: BTreeMap<DialoguePhase, Vec<String>>,
    questions: BTreeMap<DialoguePhase, Vec<String>>,
    transitions: Vec<String>,
    prefixes: Vec<String>,
    long_forms: Vec<String>,
    followups: Vec<String>,
}

#[derive(Debug, Clone)]
struct EnrichmentRule {
    alternatives: Vec<String>,
    general: Option<String>,
    by_emotion: BTreeMap<EmotionTag, String>,
}

#[derive(Debug, Clone)]
struct TopicRule {
    alternatives: Vec<String>,
    by_emotion: BTreeMap<EmotionTag, Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct ExerciseTiers {
    pub free: Vec<String>,
    pub premium: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AdvisoryTexts {
    emergency: String,
    urgent: String,
    suggestion: String,
    encouragement: String,
}

#[derive(Debug, Clone)]
pub struct CrisisTexts {
    pub emergency_message: String,
    pub emergency_actions: Vec<String>,
    pub urgent_message: String,
    pub urgent_actions: Vec<String>,
}

/// Result of matching the normalized utterance against the topic table.
#[derive(Debug, Clone, Copy)]
pub struct TopicMatch<'a> {
    pub templates: &'a [String],
    /// The word that triggered the match: the subject itself when it is a
    /// group member, otherwise the keyword found in the text.
    pub word: &'a str,
}

/// Immutable, compiled form of a content pack. Built once per pack revision
/// and shared behind an `Arc`; every accessor is total and falls back to the
/// neutral bucket (and the initial phase) instead of failing.
#[derive(Debug, Clone)]
pub struct ResponseCatalog {
    pack_id: String,
    revision: u32,
    neutral: EmotionBucket,
    others: BTreeMap<EmotionTag, EmotionBucket>,
    enrichments: Vec<EnrichmentRule>,
    topics: Vec<TopicRule>,
    neutral_exercises: ExerciseTiers,
    other_exercises: BTreeMap<EmotionTag, ExerciseTiers>,
    emergency: BTreeMap<String, Vec<EmergencyResource>>,
    courtesy_reply: String,
    subject_note: String,
    advisories: AdvisoryTexts,
    crisis: CrisisTexts,
}

impl ResponseCatalog {
    pub fn compile(doc: &PackDocument) -> Result<Self, CatalogBuildError> {
        if doc.schema_version != PACK_DOCUMENT_SCHEMA_VERSION {
            return Err(CatalogBuildError::UnsupportedSchemaVersion {
                got: doc.schema_version,
            });
        }
        doc.validate()?;

        let mut buckets: BTreeMap<EmotionTag, EmotionBucket> = BTreeMap::new();
        for (label, bucket_doc) in &doc.emotions {
            // Unknown emotion labels are skipped, not rejected: a newer pack
            // may carry tags this build does not know yet.
            let Some(tag) = EmotionTag::from_label(label) else {
                continue;
            };
            buckets.insert(
                tag,
                EmotionBucket {
                    bodies: compile_phase_map(&bucket_doc.bodies),
                    questions: compile_phase_map(&bucket_doc.questions),
                    transitions: clean_list(&bucket_doc.transitions),
                    prefixes: clean_list(&bucket_doc.prefixes),
                    long_forms: clean_list(&bucket_doc.long_forms),
                    followups: clean_list(&bucket_doc.followups),
                },
            );
        }
        let neutral = buckets.remove(&EmotionTag::Neutral).unwrap_or_default();

        require_pool(
            neutral.bodies.get(&DialoguePhase::Initial),
            "neutral.bodies.initial",
        )?;
        require_pool(
            neutral.questions.get(&DialoguePhase::Initial),
            "neutral.questions.initial",
        )?;
        require_nonempty(&neutral.transitions, "neutral.transitions")?;
        require_nonempty(&neutral.prefixes, "neutral.prefixes")?;
        require_nonempty(&neutral.long_forms, "neutral.long_forms")?;
        require_nonempty(&neutral.followups, "neutral.followups")?;

        let mut enrichments = Vec::new();
        for rule in &doc.enrichments {
            let alternatives = split_alternatives(&rule.keywords);
            if alternatives.is_empty() {
                continue;
            }
            let mut general = None;
            let mut by_emotion = BTreeMap::new();
            for (label, text) in &rule.responses {
                if text.trim().is_empty() {
                    continue;
                }
                if label.trim().eq_ignore_ascii_case("general") {
                    general = Some(text.clone());
                } else if let Some(tag) = EmotionTag::from_label(label) {
                    by_emotion.insert(tag, text.clone());
                }
            }
            if general.is_none() && by_emotion.is_empty() {
                continue;
            }
            enrichments.push(EnrichmentRule {
                alternatives,
                general,
                by_emotion,
            });
        }

        let mut topics = Vec::new();
        for rule in &doc.topics {
            let alternatives = split_alternatives(&rule.keywords);
            if alternatives.is_empty() {
                continue;
            }
            let mut by_emotion = BTreeMap::new();
            for (label, templates) in &rule.templates {
                let Some(tag) = EmotionTag::from_label(label) else {
                    continue;
                };
                let templates = clean_list(templates);
                if !templates.is_empty() {
                    by_emotion.insert(tag, templates);
                }
            }
            if by_emotion.is_empty() {
                continue;
            }
            topics.push(TopicRule {
                alternatives,
                by_emotion,
            });
        }

        let mut exercise_map: BTreeMap<EmotionTag, ExerciseTiers> = BTreeMap::new();
        for (label, tiers) in &doc.exercises {
            let Some(tag) = EmotionTag::from_label(label) else {
                continue;
            };
            exercise_map.insert(
                tag,
                ExerciseTiers {
                    free: clean_list(&tiers.free),
                    premium: clean_list(&tiers.premium),
                },
            );
        }
        let neutral_exercises = exercise_map.remove(&EmotionTag::Neutral).unwrap_or_default();
        require_nonempty(&neutral_exercises.free, "neutral.exercises.free")?;

        let mut emergency: BTreeMap<String, Vec<EmergencyResource>> = BTreeMap::new();
        for (label, resources) in &doc.emergency {
            let Ok(region) = RegionTag::new(label.as_str()) else {
                continue;
            };
            let compiled: Vec<EmergencyResource> = resources
                .iter()
                .filter_map(|r| EmergencyResource::v1(r.label.clone(), r.contact.clone()).ok())
                .collect();
            emergency.insert(region.as_str().to_string(), compiled);
        }

        if doc.courtesy_reply.trim().is_empty() {
            return Err(CatalogBuildError::EmptyFallbackPool {
                pool: "courtesy_reply",
            });
        }
        if doc.subject_note.trim().is_empty() {
            return Err(CatalogBuildError::EmptyFallbackPool {
                pool: "subject_note",
            });
        }
        for (text, pool) in [
            (&doc.advisories.emergency, "advisories.emergency"),
            (&doc.advisories.urgent, "advisories.urgent"),
            (&doc.advisories.suggestion, "advisories.suggestion"),
            (&doc.advisories.encouragement, "advisories.encouragement"),
            (&doc.crisis.emergency_message, "crisis.emergency_message"),
            (&doc.crisis.urgent_message, "crisis.urgent_message"),
        ] {
            if text.trim().is_empty() {
                return Err(CatalogBuildError::EmptyFallbackPool { pool });
            }
        }
        let crisis = CrisisTexts {
            emergency_message: doc.crisis.emergency_message.clone(),
            emergency_actions: clean_list(&doc.crisis.emergency_actions),
            urgent_message: doc.crisis.urgent_message.clone(),
            urgent_actions: clean_list(&doc.crisis.urgent_actions),
        };
        require_nonempty(&crisis.emergency_actions, "crisis.emergency_actions")?;
        require_nonempty(&crisis.urgent_actions, "crisis.urgent_actions")?;

        Ok(Self {
            pack_id: doc.pack_id.clone(),
            revision: doc.revision,
            neutral,
            others: buckets,
            enrichments,
            topics,
            neutral_exercises,
            other_exercises: exercise_map,
            emergency,
            courtesy_reply: doc.courtesy_reply.clone(),
            subject_note: doc.subject_note.clone(),
            advisories: AdvisoryTexts {
                emergency: doc.advisories.emergency.clone(),
                urgent: doc.advisories.urgent.clone(),
                suggestion: doc.advisories.suggestion.clone(),
                encouragement: doc.advisories.encouragement.clone(),
            },
            crisis,
        })
    }

    pub fn pack_id(&self) -> &str {
        &self.pack_id
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    fn bucket(&self, emotion: EmotionTag) -> &EmotionBucket {
        self.others.get(&emotion).unwrap_or(&self.neutral)
    }

    pub fn bodies_for(&self, emotion: EmotionTag, phase: DialoguePhase) -> &[String] {
        self.phased_pool(emotion, phase, |b| &b.bodies)
    }

    pub fn questions_for(&self, emotion: EmotionTag, phase: DialoguePhase) -> &[String] {
        self.phased_pool(emotion, phase, |b| &b.questions)
    }

    fn phased_pool(
        &self,
        emotion: EmotionTag,
        phase: DialoguePhase,
        select: impl Fn(&EmotionBucket) -> &BTreeMap<DialoguePhase, Vec<String>>,
    ) -> &[String] {
        let own = select(self.bucket(emotion));
        let neutral = select(&self.neutral);
        phase_pool(own, phase)
            .or_else(|| phase_pool(own, DialoguePhase::Initial))
            .or_else(|| phase_pool(neutral, phase))
            .or_else(|| phase_pool(neutral, DialoguePhase::Initial))
            .unwrap_or(EMPTY_POOL)
    }

    pub fn transitions_for(&self, emotion: EmotionTag) -> &[String] {
        list_or(&self.bucket(emotion).transitions, &self.neutral.transitions)
    }

    pub fn prefixes_for(&self, emotion: EmotionTag) -> &[String] {
        list_or(&self.bucket(emotion).prefixes, &self.neutral.prefixes)
    }

    pub fn long_forms_for(&self, emotion: EmotionTag) -> &[String] {
        list_or(&self.bucket(emotion).long_forms, &self.neutral.long_forms)
    }

    pub fn followups_for(&self, emotion: EmotionTag) -> &[String] {
        list_or(&self.bucket(emotion).followups, &self.neutral.followups)
    }

    /// First keyword group with any alternative present in `text` wins; the
    /// emotion-specific entry is preferred over the general one.
    pub fn enrichment_for(&self, text: &str, emotion: EmotionTag) -> Option<&str> {
        for rule in &self.enrichments {
            if rule.alternatives.iter().any(|alt| text.contains(alt.as_str())) {
                return rule
                    .by_emotion
                    .get(&emotion)
                    .or(rule.general.as_ref())
                    .map(String::as_str);
            }
        }
        None
    }

    /// Subject-word membership in a group matches first; otherwise any group
    /// keyword found as a substring of `text` matches. First matching group
    /// wins even when it has no templates for this emotion.
    pub fn topic_match_for(
        &self,
        text: &str,
        subject: Option<&str>,
        emotion: EmotionTag,
    ) -> Option<TopicMatch<'_>> {
        for rule in &self.topics {
            let word = match subject {
                Some(s) if rule.alternatives.iter().any(|alt| alt == s) => {
                    rule.alternatives.iter().find(|alt| alt.as_str() == s)
                }
                _ => rule
                    .alternatives
                    .iter()
                    .find(|alt| text.contains(alt.as_str())),
            };
            if let Some(word) = word {
                let templates = rule
                    .by_emotion
                    .get(&emotion)
                    .or_else(|| rule.by_emotion.get(&EmotionTag::Neutral))?;
                return Some(TopicMatch {
                    templates,
                    word: word.as_str(),
                });
            }
        }
        None
    }

    pub fn exercises_for(&self, emotion: EmotionTag) -> &ExerciseTiers {
        self.other_exercises
            .get(&emotion)
            .filter(|t| !t.free.is_empty())
            .unwrap_or(&self.neutral_exercises)
    }

    pub fn emergency_directory_for(&self, region: &RegionTag) -> &[EmergencyResource] {
        self.emergency
            .get(region.as_str())
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_RESOURCES)
    }

    pub fn courtesy_reply(&self) -> &str {
        &self.courtesy_reply
    }

    pub fn subject_note(&self) -> &str {
        &self.subject_note
    }

    pub fn advisory(&self, kind: AdvisoryKind) -> &str {
        match kind {
            AdvisoryKind::Emergency => &self.advisories.emergency,
            AdvisoryKind::Urgent => &self.advisories.urgent,
            AdvisoryKind::Suggestion => &self.advisories.suggestion,
            AdvisoryKind::Encouragement => &self.advisories.encouragement,
        }
    }

    pub fn crisis(&self) -> &CrisisTexts {
        &self.crisis
    }
}

fn clean_list(list: &[String]) -> Vec<String> {
    list.iter()
        .filter(|t| !t.trim().is_empty())
        .cloned()
        .collect()
}

fn compile_phase_map(map: &BTreeMap<String, Vec<String>>) -> BTreeMap<DialoguePhase, Vec<String>> {
    let mut out = BTreeMap::new();
    for (label, pool) in map {
        let Some(phase) = DialoguePhase::from_label(label) else {
            continue;
        };
        let pool = clean_list(pool);
        if !pool.is_empty() {
            out.insert(phase, pool);
        }
    }
    out
}

fn split_alternatives(keywords: &str) -> Vec<String> {
    keywords
        .split('|')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

fn phase_pool(
    map: &BTreeMap<DialoguePhase, Vec<String>>,
    phase: DialoguePhase,
) -> Option<&[String]> {
    map.get(&phase)
        .filter(|p| !p.is_empty())
        .map(Vec::as_slice)
}

fn list_or<'a>(own: &'a [String], fallback: &'a [String]) -> &'a [String] {
    if own.is_empty() {
        fallback
    } else {
        own
    }
}

fn require_pool(
    pool: Option<&Vec<String>>,
    name: &'static str,
) -> Result<(), CatalogBuildError> {
    match pool {
        Some(p) if !p.is_empty() => Ok(()),
        _ => Err(CatalogBuildError::EmptyFallbackPool { pool: name }),
    }
}

fn require_nonempty(list: &[String], name: &'static str) -> Result<(), CatalogBuildError> {
    if list.is_empty() {
        return Err(CatalogBuildError::EmptyFallbackPool { pool: name });
    }
    Ok(())
}

/// Shared pack fixture for the engine test suites. Rich enough to exercise
/// rotation, fallback chains, exercises, and crisis texts without each test
/// module carrying its own document.
#[cfg(test)]
pub(crate) mod tests_support {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use eirene_kernel_contracts::pack::{
        AdvisoryDoc, CrisisDoc, EmergencyResourceDoc, EmotionContentDoc, EnrichmentDoc,
        ExerciseTiersDoc, PackDocument, TopicDoc, PACK_DOCUMENT_SCHEMA_VERSION,
    };

    use super::ResponseCatalog;

    pub(crate) fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn neutral_bucket() -> EmotionContentDoc {
        let mut bodies = BTreeMap::new();
        bodies.insert(
            "initial".to_string(),
            strings(&["I am here with you.", "I'm listening, take your time."]),
        );
        bodies.insert(
            "exploration".to_string(),
            strings(&[
                "Let's stay with what you said for a moment.",
                "There is more underneath that, I think.",
            ]),
        );
        bodies.insert(
            "solution".to_string(),
            strings(&[
                "One small step could make this week lighter.",
                "We could try shaping one gentle plan together.",
            ]),
        );
        bodies.insert(
            "followup".to_string(),
            strings(&[
                "We have walked through a lot together.",
                "Looking back over our conversation, a few themes stand out.",
            ]),
        );
        let mut questions = BTreeMap::new();
        questions.insert(
            "initial".to_string(),
            strings(&[
                "What is on your mind?",
                "How did today start?",
                "What would help most right now?",
                "Is there a moment from today that stands out?",
                "What are you hoping for this week?",
                "Who do you feel safest talking to?",
            ]),
        );
        questions.insert(
            "exploration".to_string(),
            strings(&[
                "When did this feeling start?",
                "What was happening around you then?",
                "How does it show up in your body?",
            ]),
        );
        questions.insert(
            "solution".to_string(),
            strings(&[
                "What has helped even a little before?",
                "Who could support you with this?",
                "What would tomorrow look like if it went well?",
            ]),
        );
        EmotionContentDoc {
            bodies,
            questions,
            transitions: strings(&[
                "Tell me more about that.",
                "I'd like to understand that better.",
            ]),
            prefixes: strings(&[
                "Thank you for sharing.",
                "I hear you.",
                "That took courage to say.",
            ]),
            long_forms: strings(&[
                "Whatever you are carrying, we can look at it slowly, piece by piece.",
                "Feelings like this often soften a little once they are spoken aloud.",
            ]),
            followups: strings(&[
                "What would feel supportive right now?",
                "Would you like to stay with this thread?",
            ]),
        }
    }

    pub(crate) fn pack_doc() -> PackDocument {
        let mut emotions = BTreeMap::new();
        emotions.insert("neutral".to_string(), neutral_bucket());
        let mut sad_bodies = BTreeMap::new();
        sad_bodies.insert(
            "exploration".to_string(),
            strings(&["That sadness sounds heavy."]),
        );
        emotions.insert(
            "sad".to_string(),
            EmotionContentDoc {
                bodies: sad_bodies,
                questions: BTreeMap::new(),
                transitions: strings(&["I hear how much this weighs on you."]),
                prefixes: Vec::new(),
                long_forms: Vec::new(),
                followups: Vec::new(),
            },
        );
        // Unknown tags must be skipped silently.
        emotions.insert("jubilant".to_string(), neutral_bucket());

        let mut exercises = BTreeMap::new();
        exercises.insert(
            "neutral".to_string(),
            ExerciseTiersDoc {
                free: strings(&[
                    "Slow breathing for five minutes",
                    "A short walk outside",
                    "Write three lines about today",
                ]),
                premium: strings(&[
                    "Guided body scan",
                    "Progressive muscle relaxation",
                    "Evening wind-down routine",
                    "Thought-record worksheet",
                ]),
            },
        );
        exercises.insert(
            "sad".to_string(),
            ExerciseTiersDoc {
                free: strings(&[
                    "Name three small comforts nearby",
                    "Step outside for a few minutes of daylight",
                ]),
                premium: strings(&[
                    "Behavioral activation planner",
                    "Gratitude letter draft",
                    "Photo review of a good memory",
                ]),
            },
        );

        let mut emergency = BTreeMap::new();
        emergency.insert(
            "us".to_string(),
            vec![
                EmergencyResourceDoc {
                    label: "Suicide & Crisis Lifeline".to_string(),
                    contact: "988".to_string(),
                },
                EmergencyResourceDoc {
                    label: "Emergency services".to_string(),
                    contact: "911".to_string(),
                },
            ],
        );
        emergency.insert(
            "gb".to_string(),
            vec![EmergencyResourceDoc {
                label: "Samaritans".to_string(),
                contact: "116 123".to_string(),
            }],
        );

        PackDocument {
            schema_version: PACK_DOCUMENT_SCHEMA_VERSION,
            pack_id: "test_pack".to_string(),
            revision: 3,
            emotions,
            enrichments: vec![
                EnrichmentDoc {
                    keywords: "work|job|boss".to_string(),
                    responses: BTreeMap::from([
                        ("general".to_string(), "Work pressure is real.".to_string()),
                        ("sad".to_string(), "Work can weigh on the heart.".to_string()),
                    ]),
                },
                EnrichmentDoc {
                    keywords: "family|mother|father".to_string(),
                    responses: BTreeMap::from([(
                        "general".to_string(),
                        "Family ties run deep.".to_string(),
                    )]),
                },
            ],
            topics: vec![
                TopicDoc {
                    keywords: "sleep|insomnia".to_string(),
                    templates: BTreeMap::from([(
                        "neutral".to_string(),
                        strings(&[
                            "Rest around '{subject}' matters.",
                            "Nights shape days; '{subject}' deserves care.",
                        ]),
                    )]),
                },
                TopicDoc {
                    keywords: "work|job".to_string(),
                    templates: BTreeMap::from([
                        (
                            "sad".to_string(),
                            strings(&["Carrying '{subject}' while feeling low is a lot."]),
                        ),
                        (
                            "neutral".to_string(),
                            strings(&["'{subject}' takes a large share of life."]),
                        ),
                    ]),
                },
            ],
            exercises,
            emergency,
            courtesy_reply: "You're very welcome. I'm glad I could be here with you.".to_string(),
            subject_note: "I notice you mention '{subject}'.".to_string(),
            advisories: AdvisoryDoc {
                emergency: "Please reach out to emergency support now.".to_string(),
                urgent: "Please consider speaking with a professional soon.".to_string(),
                suggestion: "A conversation with someone you trust could help.".to_string(),
                encouragement: "You showed real care for yourself today.".to_string(),
            },
            crisis: CrisisDoc {
                emergency_message: "You are not alone. Help is available right now.".to_string(),
                emergency_actions: strings(&[
                    "Call your local emergency number.",
                    "Reach someone you trust and stay with them.",
                ]),
                urgent_message: "What you are feeling deserves prompt attention.".to_string(),
                urgent_actions: strings(&["Book a consultation this week."]),
            },
        }
    }

    pub(crate) fn compiled_catalog() -> Arc<ResponseCatalog> {
        Arc::new(ResponseCatalog::compile(&pack_doc()).expect("fixture pack must compile"))
    }
}

#[cfg(test)]
mod tests {
    use super::tests_support::pack_doc;
    use super::*;

    #[test]
    fn at_cat_01_compile_accepts_complete_pack() {
        let catalog = ResponseCatalog::compile(&pack_doc()).unwrap();
        assert_eq!(catalog.pack_id(), "test_pack");
        assert_eq!(catalog.revision(), 3);
    }

    #[test]
    fn at_cat_02_missing_neutral_pool_fails_closed() {
        let mut doc = pack_doc();
        doc.emotions
            .get_mut("neutral")
            .unwrap()
            .prefixes
            .clear();
        match ResponseCatalog::compile(&doc) {
            Err(CatalogBuildError::EmptyFallbackPool { pool }) => {
                assert_eq!(pool, "neutral.prefixes")
            }
            other => panic!("expected EmptyFallbackPool, got {other:?}"),
        }
    }

    #[test]
    fn at_cat_03_unknown_emotion_falls_back_to_neutral() {
        let catalog = ResponseCatalog::compile(&pack_doc()).unwrap();
        let angry = catalog.bodies_for(EmotionTag::Angry, DialoguePhase::Initial);
        let neutral = catalog.bodies_for(EmotionTag::Neutral, DialoguePhase::Initial);
        assert_eq!(angry, neutral);
    }

    #[test]
    fn at_cat_04_missing_phase_falls_back_to_initial_then_neutral() {
        let catalog = ResponseCatalog::compile(&pack_doc()).unwrap();
        // Sad has an exploration pool of its own.
        let sad_exploration = catalog.bodies_for(EmotionTag::Sad, DialoguePhase::Exploration);
        assert_eq!(sad_exploration, &["That sadness sounds heavy.".to_string()][..]);
        // Sad has no solution pool and no initial pool; neutral serves it.
        let sad_solution = catalog.bodies_for(EmotionTag::Sad, DialoguePhase::Solution);
        let neutral_solution = catalog.bodies_for(EmotionTag::Neutral, DialoguePhase::Solution);
        assert_eq!(sad_solution, neutral_solution);
        assert!(!sad_solution.is_empty());
    }

    #[test]
    fn at_cat_05_enrichment_prefers_emotion_over_general() {
        let catalog = ResponseCatalog::compile(&pack_doc()).unwrap();
        assert_eq!(
            catalog.enrichment_for("my job is crushing me", EmotionTag::Sad),
            Some("Work can weigh on the heart.")
        );
        assert_eq!(
            catalog.enrichment_for("my job is crushing me", EmotionTag::Angry),
            Some("Work pressure is real.")
        );
        assert_eq!(catalog.enrichment_for("the garden is quiet", EmotionTag::Sad), None);
    }

    #[test]
    fn at_cat_06_topic_match_by_subject_then_substring() {
        let catalog = ResponseCatalog::compile(&pack_doc()).unwrap();
        let by_subject = catalog
            .topic_match_for("sleep has left me", Some("sleep"), EmotionTag::Sad)
            .unwrap();
        assert_eq!(by_subject.word, "sleep");
        let by_substring = catalog
            .topic_match_for("this insomnia is endless", Some("endless"), EmotionTag::Sad)
            .unwrap();
        assert_eq!(by_substring.word, "insomnia");
        assert!(catalog
            .topic_match_for("the garden is quiet", None, EmotionTag::Sad)
            .is_none());
    }

    #[test]
    fn at_cat_07_emergency_directory_missing_region_is_empty() {
        let catalog = ResponseCatalog::compile(&pack_doc()).unwrap();
        let us = catalog.emergency_directory_for(&RegionTag::new("us").unwrap());
        assert_eq!(us.len(), 2);
        let nowhere = catalog.emergency_directory_for(&RegionTag::new("atlantis").unwrap());
        assert!(nowhere.is_empty());
    }

    #[test]
    fn at_cat_08_wrong_schema_version_is_rejected() {
        let mut doc = pack_doc();
        doc.schema_version = 9;
        match ResponseCatalog::compile(&doc) {
            Err(CatalogBuildError::UnsupportedSchemaVersion { got }) => assert_eq!(got, 9),
            other => panic!("expected UnsupportedSchemaVersion, got {other:?}"),
        }
    }
}
