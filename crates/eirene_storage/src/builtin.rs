#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use eirene_kernel_contracts::pack::{
    AdvisoryDoc, CrisisDoc, EmergencyResourceDoc, EmotionContentDoc, EnrichmentDoc,
    ExerciseTiersDoc, PackDocument, TopicDoc, PACK_DOCUMENT_SCHEMA_VERSION,
};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn phase_map(pairs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    pairs
        .iter()
        .map(|(phase, pool)| (phase.to_string(), strings(pool)))
        .collect()
}

fn neutral_bucket() -> EmotionContentDoc {
    EmotionContentDoc {
        bodies: phase_map(&[
            (
                "initial",
                &[
                    "Thank you for telling me. I'm listening, and I'd like to understand more about what today has been like for you.",
                    "I hear you. Whatever brought you here, we can take it at your pace.",
                    "That sounds like a lot to carry. I'm glad you put it into words.",
                    "I'm here with you. There's no rush; say it however it comes.",
                    "It matters that you said that. Let's sit with it together for a moment.",
                    "I appreciate you opening up. What you're describing deserves attention.",
                ],
            ),
            (
                "exploration",
                &[
                    "The more you describe it, the clearer the picture gets. Keep going if you're willing.",
                    "It sounds like there are a few threads tangled together here.",
                    "What you're noticing about yourself is worth taking seriously.",
                    "That pattern you describe comes up for many people, and it's still uniquely yours.",
                    "I'm following you. Each detail helps me understand what this is like from the inside.",
                ],
            ),
            (
                "solution",
                &[
                    "From what you've shared, a small, concrete next step might help more than a grand plan.",
                    "You've already named the hardest part. Let's think about one thing that could ease it.",
                    "It could help to pick a single piece of this to work on this week.",
                    "There are a couple of directions we could lean. Small and doable beats big and vague.",
                    "Something gentle you could try: choose the lightest version of the change, not the full one.",
                ],
            ),
            (
                "followup",
                &[
                    "Looking back over what you've shared, you've done real work just by talking it through.",
                    "We've covered a lot. It's worth pausing to notice how you carried the conversation.",
                    "From everything you've told me, a few themes stand out that we can return to anytime.",
                    "Whatever happens next, this conversation counts as a step you took for yourself.",
                ],
            ),
        ]),
        questions: phase_map(&[
            (
                "initial",
                &[
                    "What has today been like for you so far?",
                    "When did you first start feeling this way?",
                    "Is there a moment recently that stands out?",
                    "What made you want to talk about this now?",
                    "How are you sleeping these days?",
                    "Who around you knows what you're going through?",
                ],
            ),
            (
                "exploration",
                &[
                    "When it's at its worst, what does it feel like in your body?",
                    "What tends to make it a little better, even briefly?",
                    "What tends to make it worse?",
                    "If a close friend described this to you, what would you tell them?",
                    "What would a slightly easier version of tomorrow look like?",
                ],
            ),
            (
                "solution",
                &[
                    "Which of the things we've touched on feels most within reach?",
                    "What's one small thing you could try before we talk again?",
                    "Who could you ask for a hand with this?",
                    "What has worked for you before, even partially?",
                ],
            ),
            (
                "followup",
                &[
                    "How have things shifted since we started talking?",
                    "What do you want to remember from this conversation?",
                    "What would you like to keep an eye on this week?",
                ],
            ),
        ]),
        transitions: strings(&[
            "Something else worth saying:",
            "And one more thought:",
            "While we're here,",
            "On a related note,",
            "Before I forget,",
        ]),
        prefixes: strings(&[
            "Thank you for sharing that.",
            "I hear you.",
            "That took courage to say.",
            "I'm glad you told me.",
            "It makes sense that you'd feel that way.",
            "You're not alone in this.",
        ]),
        long_forms: strings(&[
            "Talking about what's hard is itself a form of taking care of yourself, even when it doesn't feel like progress in the moment.",
            "Feelings tend to move when they're given room. Naming them out loud, like you just did, is how that room gets made.",
            "You don't have to resolve everything today. Understanding a little more than yesterday is already movement.",
            "Whatever you're carrying, it's allowed to take more than one conversation to set down.",
        ]),
        followups: strings(&[
            "I'm here whenever you want to pick this back up.",
            "Take whatever time you need.",
            "We can return to any of this later.",
            "Be kind to yourself today.",
            "I'll remember where we left off.",
        ]),
    }
}

fn sad_bucket() -> EmotionContentDoc {
    EmotionContentDoc {
        bodies: phase_map(&[
            (
                "initial",
                &[
                    "That sadness comes through in what you wrote, and I'm sorry it's sitting on you like this.",
                    "It sounds heavy. You don't have to hold it alone while we talk.",
                    "I'm sorry things feel this low. Thank you for trusting me with it.",
                    "Sadness that big deserves to be taken seriously, and I do.",
                ],
            ),
            (
                "exploration",
                &[
                    "Sadness often has layers. What you're describing sounds like more than one loss stacked together.",
                    "When the heaviness settles in, it can color everything around it. That's the sadness talking, not the truth about you.",
                    "It sounds like this has been building for a while, not just today.",
                    "Low moods can make the past look worse and the future look smaller. You're describing that narrowing really clearly.",
                ],
            ),
            (
                "solution",
                &[
                    "When everything feels heavy, the kindest plan is usually the smallest one. One gentle thing today is enough.",
                    "Sadness drains energy, so let's aim for low-effort comfort first and momentum later.",
                    "It might help to let one person in your life know a little of what you told me.",
                ],
            ),
            (
                "followup",
                &[
                    "You've put words to a heavy stretch, and that counts for something real.",
                    "Even with the sadness still there, you showed up and talked it through. Hold onto that.",
                ],
            ),
        ]),
        questions: phase_map(&[
            (
                "initial",
                &[
                    "How long has this sadness been with you?",
                    "Did something specific happen, or did it build up slowly?",
                    "What does the sadness stop you from doing lately?",
                    "Are there moments in the day when it lifts a little?",
                ],
            ),
            (
                "exploration",
                &[
                    "If the sadness could speak, what do you think it would say it's about?",
                    "What have you lost, or what feels lost, in all this?",
                    "When you've felt this way before, what eventually helped?",
                ],
            ),
            (
                "solution",
                &[
                    "What's one small comfort you could give yourself today?",
                    "Is there someone you'd feel safe telling a piece of this to?",
                ],
            ),
        ]),
        transitions: strings(&[
            "Gently, one more thing:",
            "While it's on my mind,",
            "Alongside that,",
        ]),
        prefixes: strings(&[
            "I'm sorry it hurts like this.",
            "That sounds really heavy.",
            "It's okay to feel this sad.",
            "Thank you for letting me see this.",
        ]),
        long_forms: strings(&[
            "Sadness is often love or hope with nowhere to go for a while. It doesn't mean you're broken; it means something mattered.",
            "Heavy days distort the math: effort feels enormous and rewards feel tiny. The distortion eases, usually sooner than it promises to.",
            "You're allowed to grieve things other people can't see, on a timeline nobody else gets to set.",
        ]),
        followups: strings(&[
            "Be gentle with yourself tonight.",
            "I'm here when the heaviness needs somewhere to go.",
            "You don't have to carry this alone.",
        ]),
    }
}

fn fear_bucket() -> EmotionContentDoc {
    EmotionContentDoc {
        bodies: phase_map(&[
            (
                "initial",
                &[
                    "Fear like that is exhausting to live with. I'm glad you said it out loud.",
                    "That sounds frightening. You're safe to talk it through here at your own speed.",
                    "When fear gets loud, everything else gets hard to hear. Let's slow it down together.",
                ],
            ),
            (
                "exploration",
                &[
                    "Fear usually points at something it's trying to protect. What do you think yours is guarding?",
                    "Sometimes the scariest version of events lives only in the anticipation. What's the story the fear keeps telling?",
                    "Your body may be reacting like the danger is right now, even when the threat is a maybe-someday.",
                ],
            ),
            (
                "solution",
                &[
                    "With fear, shrinking the unknown helps: one small fact-check or one small rehearsal at a time.",
                    "Grounding works best in the body first: slow breath out, feet on the floor, then the thinking.",
                ],
            ),
        ]),
        questions: phase_map(&[
            (
                "initial",
                &[
                    "What is the fear mostly about, if you can name it?",
                    "When does it get loudest?",
                    "What does your body do when the fear shows up?",
                ],
            ),
            (
                "exploration",
                &[
                    "What's the worst case your mind keeps replaying?",
                    "How likely does that worst case feel right now, honestly?",
                    "What has helped you feel even slightly safer before?",
                ],
            ),
        ]),
        transitions: strings(&["One more thing, gently:", "Also,"]),
        prefixes: strings(&[
            "That sounds genuinely scary.",
            "No wonder you're on edge.",
            "It makes sense that you're frightened.",
        ]),
        long_forms: strings(&[
            "Fear is your alarm system doing its job too well. The alarm being loud doesn't mean the fire is real; it means the system cares about you.",
            "Courage isn't the absence of fear. It's what you're doing right now: looking at it instead of away from it.",
        ]),
        followups: strings(&[
            "You're safe here whenever you need to talk.",
            "One breath at a time is a real strategy.",
        ]),
    }
}

fn anxious_bucket() -> EmotionContentDoc {
    EmotionContentDoc {
        bodies: phase_map(&[
            (
                "initial",
                &[
                    "That churning, can't-switch-off feeling is real and draining. I'm listening.",
                    "Anxiety has a way of crowding out everything else. Let's make some room here.",
                    "It sounds like your mind has been running laps. We can slow the pace together.",
                ],
            ),
            (
                "exploration",
                &[
                    "Anxiety loves unfinished questions. Which ones keep looping for you?",
                    "Often the body keeps score: tight chest, shallow breath, restless sleep. What's yours doing?",
                    "Worry tends to dress up as planning. Some of what your mind is doing might be worry wearing a disguise.",
                ],
            ),
            (
                "solution",
                &[
                    "With anxiety, the lever is usually the body: longer exhales, slower shoulders, then the thoughts follow.",
                    "It can help to give the worry an appointment: ten minutes, on paper, then close the notebook.",
                ],
            ),
        ]),
        questions: phase_map(&[
            (
                "initial",
                &[
                    "What is your mind looping on the most right now?",
                    "How is the anxiety showing up in your body?",
                    "Is it worse at a particular time of day?",
                ],
            ),
            (
                "exploration",
                &[
                    "Of the things you're worrying about, which are in your control, even partly?",
                    "What does the anxiety tell you will happen if you stop bracing?",
                    "What helps you come back to the present, even for a minute?",
                ],
            ),
        ]),
        transitions: strings(&["While we're at it,", "And alongside that,"]),
        prefixes: strings(&[
            "That sounds exhausting to carry.",
            "No wonder you feel wound up.",
            "That's a lot to hold at once.",
        ]),
        long_forms: strings(&[
            "Anxiety narrows attention to threats and to-do lists until the present moment goes missing. Coming back to right-now, even briefly, is the counter-move.",
            "A racing mind is trying to protect you by rehearsing every bad ending. You can thank it and still decline the rehearsal.",
        ]),
        followups: strings(&[
            "Unclench your jaw, drop your shoulders. I'm here.",
            "You made it through every worst day so far.",
        ]),
    }
}

fn angry_bucket() -> EmotionContentDoc {
    EmotionContentDoc {
        bodies: phase_map(&[
            (
                "initial",
                &[
                    "That anger sounds earned. Something crossed a line for you.",
                    "You're allowed to be angry. Let's give it words instead of letting it just burn.",
                    "I can hear the heat in this. I'd rather you say it here than swallow it.",
                ],
            ),
            (
                "exploration",
                &[
                    "Anger usually stands guard over something softer: hurt, unfairness, being unheard. What's behind yours?",
                    "It sounds like this isn't the first time that boundary got stepped on.",
                ],
            ),
            (
                "solution",
                &[
                    "Anger is information plus fuel. The move is deciding where the fuel goes on purpose.",
                    "It might help to name the boundary that was crossed and what you want different going forward.",
                ],
            ),
        ]),
        questions: phase_map(&[
            (
                "initial",
                &[
                    "What happened that set this off?",
                    "Who or what is the anger really aimed at?",
                    "What does the anger make you want to do?",
                ],
            ),
            (
                "exploration",
                &[
                    "Underneath the anger, is there hurt or disappointment too?",
                    "What would feeling respected in that situation have looked like?",
                ],
            ),
        ]),
        transitions: strings(&["And another thing worth naming:", "Also,"]),
        prefixes: strings(&["That would make me angry too.", "Your frustration makes sense."]),
        long_forms: strings(&[
            "Anger gets a bad reputation, but it's often the part of you that still believes you deserve better. The skill is aiming it, not erasing it.",
        ]),
        followups: strings(&[
            "Your feelings are valid, including this one.",
            "We can unpack more of this whenever you want.",
        ]),
    }
}

fn enrichments() -> Vec<EnrichmentDoc> {
    let rule = |keywords: &str, pairs: &[(&str, &str)]| EnrichmentDoc {
        keywords: keywords.to_string(),
        responses: pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    };
    vec![
        rule(
            "work|job|boss|career|colleague",
            &[
                ("general", "Work pressure has a way of following people home; it's worth taking seriously."),
                ("sad", "When work weighs on the heart and not just the calendar, that's a signal, not a weakness."),
                ("anxious", "Work worry loves the evening hours. Your off-hours are allowed to be off."),
            ],
        ),
        rule(
            "family|mother|father|parents|sister|brother",
            &[
                ("general", "Family ties run deep, which is exactly why they can pull so hard."),
                ("angry", "Family can cross lines no one else would dare to. Being angry about that is coherent, not cruel."),
            ],
        ),
        rule(
            "sleep|insomnia|tired|exhausted|sleepless",
            &[
                ("general", "Poor sleep makes every other problem louder. It deserves attention in its own right."),
                ("anxious", "A racing mind at midnight is anxiety's favorite stage. Winding down is a skill you can practice."),
            ],
        ),
        rule(
            "relationship|partner|boyfriend|girlfriend|marriage|breakup",
            &[
                ("general", "The people closest to us can reach feelings nobody else can touch."),
                ("sad", "Losing closeness with someone, or fearing you might, is one of the heaviest things there is."),
            ],
        ),
        rule(
            "school|exam|study|grades|university",
            &[
                ("general", "Study pressure is real pressure; the stakes feel total even when they aren't."),
                ("anxious", "Exams measure a slice of one day, not your worth. Your nervous system may disagree; it's wrong."),
            ],
        ),
        rule(
            "health|illness|pain|sick|diagnosis",
            &[
                ("general", "Worries about health touch the ground we stand on. It makes sense they shake other things too."),
                ("fear", "Health fear is fear with a megaphone. Getting real information, at your own pace, usually quiets it a little."),
            ],
        ),
        rule(
            "money|debt|rent|bills|broke",
            &[
                ("general", "Money strain is a background hum that wears people down. It's not just numbers."),
            ],
        ),
        rule(
            "lonely|alone|isolated|no friends",
            &[
                ("general", "Loneliness is a need signal, like hunger. It says connection matters to you, and that's health, not defect."),
                ("sad", "Feeling alone while sad doubles the weight. Reaching out here already broke the isolation a crack."),
            ],
        ),
    ]
}

fn topics() -> Vec<TopicDoc> {
    let rule = |keywords: &str, pairs: &[(&str, &[&str])]| TopicDoc {
        keywords: keywords.to_string(),
        templates: pairs
            .iter()
            .map(|(k, pool)| (k.to_string(), strings(pool)))
            .collect(),
    };
    vec![
        rule(
            "sleep|insomnia|nightmare|sleepless",
            &[
                (
                    "neutral",
                    &[
                        "Sleep trouble around '{subject}' is common, and it's fixable more often than it feels.",
                        "Nights shaped by '{subject}' tend to color the days. Let's keep an eye on that.",
                    ],
                ),
                (
                    "anxious",
                    &["When '{subject}' follows you to bed, the mind needs a landing ritual before the pillow."],
                ),
            ],
        ),
        rule(
            "work|job|boss|workload",
            &[
                (
                    "neutral",
                    &[
                        "'{subject}' takes a large share of life; friction there spills everywhere.",
                        "It sounds like '{subject}' is asking more of you than it gives back lately.",
                    ],
                ),
                (
                    "sad",
                    &["When '{subject}' drains the color out of the week, that's worth naming plainly."],
                ),
            ],
        ),
        rule(
            "family|mother|father|parents",
            &[
                (
                    "neutral",
                    &[
                        "Things with '{subject}' reach back a long way, which makes them tender to handle.",
                    ],
                ),
            ],
        ),
        rule(
            "relationship|partner|breakup|marriage",
            &[
                (
                    "neutral",
                    &[
                        "What happens with '{subject}' touches the part of life we lean on most.",
                        "It makes sense that '{subject}' is taking up this much of your thinking.",
                    ],
                ),
            ],
        ),
        rule(
            "school|exam|study|grades",
            &[
                (
                    "neutral",
                    &["Pressure around '{subject}' can make one result feel like a verdict on everything."],
                ),
                (
                    "anxious",
                    &["The spotlight your mind puts on '{subject}' is brighter than the real one will be."],
                ),
            ],
        ),
    ]
}

fn exercises() -> BTreeMap<String, ExerciseTiersDoc> {
    let tiers = |free: &[&str], premium: &[&str]| ExerciseTiersDoc {
        free: strings(free),
        premium: strings(premium),
    };
    BTreeMap::from([
        (
            "neutral".to_string(),
            tiers(
                &[
                    "Slow breathing: four counts in, six counts out, for five minutes",
                    "A short walk outside, phone in pocket",
                    "Write three honest lines about today",
                    "Drink a glass of water and stretch for two minutes",
                    "Message one person you trust, even just hello",
                ],
                &[
                    "Guided body-scan audio, ten minutes",
                    "Structured mood journal with weekly review",
                    "Values check-in worksheet",
                    "Progressive muscle relaxation sequence",
                    "Two-column thought record for one sticky thought",
                    "Gratitude log: three entries before bed",
                    "Weekly activity planner with one pleasant event per day",
                    "Sleep hygiene checklist with evening wind-down",
                ],
            ),
        ),
        (
            "sad".to_string(),
            tiers(
                &[
                    "Name three small comforts within reach right now",
                    "Step outside for a few minutes of daylight",
                    "Put on one song that matches the feeling, then one that lifts it",
                    "Text someone who cares about you, no agenda needed",
                ],
                &[
                    "Behavioral activation planner: one tiny pleasant activity per day",
                    "Self-compassion letter: write to yourself as a kind friend would",
                    "Loss inventory worksheet, done gently and in parts",
                    "Morning light routine with a ten-minute walk",
                    "Mood-and-energy tracker with weekly look-back",
                    "Pleasant memories album: collect five, revisit one nightly",
                ],
            ),
        ),
        (
            "anxious".to_string(),
            tiers(
                &[
                    "Box breathing: four in, four hold, four out, four hold",
                    "5-4-3-2-1 grounding: five things you see, four you feel, three you hear",
                    "Write the worry down, then close the notebook",
                    "Drop your shoulders and unclench your jaw, twice",
                ],
                &[
                    "Scheduled worry time: ten minutes daily, on paper",
                    "Probability check worksheet for one feared outcome",
                    "Gradual exposure ladder for one avoided situation",
                    "Evening wind-down routine with screens off",
                    "Caffeine audit for one week",
                ],
            ),
        ),
        (
            "fear".to_string(),
            tiers(
                &[
                    "Feet flat on the floor, one slow breath out, name where you are",
                    "Name the fear in one sentence, out loud or on paper",
                    "Cold water on the wrists, thirty seconds",
                ],
                &[
                    "Fact-check sheet: evidence for and against the feared outcome",
                    "Safety behaviors inventory and one to loosen",
                    "Rehearsal script for the situation you're dreading",
                    "Grounding audio for acute moments",
                ],
            ),
        ),
        (
            "angry".to_string(),
            tiers(
                &[
                    "Ninety-second pause before replying to what set you off",
                    "Physical release: brisk walk, stairs, or push-ups",
                    "Write the unsent letter, say everything, send nothing",
                ],
                &[
                    "Boundary script builder: what was crossed, what you need",
                    "Trigger log with early-warning body signals",
                    "Repair conversation planner for one relationship",
                    "Cooling routine checklist for heated moments",
                ],
            ),
        ),
    ])
}

fn emergency() -> BTreeMap<String, Vec<EmergencyResourceDoc>> {
    let entry = |label: &str, contact: &str| EmergencyResourceDoc {
        label: label.to_string(),
        contact: contact.to_string(),
    };
    BTreeMap::from([
        (
            "us".to_string(),
            vec![
                entry("988 Suicide & Crisis Lifeline (call or text)", "988"),
                entry("Crisis Text Line", "text HOME to 741741"),
                entry("Emergency services", "911"),
            ],
        ),
        (
            "gb".to_string(),
            vec![
                entry("Samaritans (24/7)", "116 123"),
                entry("Emergency services", "999"),
            ],
        ),
        (
            "ca".to_string(),
            vec![
                entry("Talk Suicide Canada", "1-833-456-4566"),
                entry("Emergency services", "911"),
            ],
        ),
    ])
}

/// Complete English content pack compiled when no on-disk pack is
/// configured. Every pool the catalog requires at minimum is populated here,
/// so compiling the builtin can never hit the empty-fallback error.
pub fn builtin_pack_document() -> PackDocument {
    let emotions = BTreeMap::from([
        ("neutral".to_string(), neutral_bucket()),
        ("sad".to_string(), sad_bucket()),
        ("fear".to_string(), fear_bucket()),
        ("anxious".to_string(), anxious_bucket()),
        ("angry".to_string(), angry_bucket()),
    ]);

    PackDocument {
        schema_version: PACK_DOCUMENT_SCHEMA_VERSION,
        pack_id: "eirene_builtin_en".to_string(),
        revision: 1,
        emotions,
        enrichments: enrichments(),
        topics: topics(),
        exercises: exercises(),
        emergency: emergency(),
        courtesy_reply:
            "You're very welcome. I'm glad I could be here with you. Is there anything else on your mind?"
                .to_string(),
        subject_note: "I notice '{subject}' keeps coming up for you.".to_string(),
        advisories: AdvisoryDoc {
            emergency:
                "Please reach out to emergency services or a crisis line right now; you deserve immediate support."
                    .to_string(),
            urgent:
                "I'd strongly encourage you to speak with a mental-health professional soon."
                    .to_string(),
            suggestion:
                "It could help to talk this over with someone you trust or a professional."
                    .to_string(),
            encouragement: "Keep taking care of yourself; you're doing better than you think."
                .to_string(),
        },
        crisis: CrisisDoc {
            emergency_message:
                "What you're describing worries me, and your safety comes first. Please contact a crisis line or emergency services right now. You don't have to face this alone."
                    .to_string(),
            emergency_actions: strings(&[
                "Call or text a crisis line now",
                "If you are in immediate danger, call emergency services",
                "Stay with someone, or tell someone nearby how you're feeling",
                "Remove anything you could use to hurt yourself",
            ]),
            urgent_message:
                "What you're sharing sounds serious, and I don't want you to carry it alone. Please consider talking to a mental-health professional soon."
                    .to_string(),
            urgent_actions: strings(&[
                "Book an appointment with a doctor or therapist this week",
                "Tell someone you trust how bad it has been",
                "Keep a crisis line number where you can find it",
            ]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eirene_kernel_contracts::{EmotionTag, Validate};

    #[test]
    fn builtin_pack_passes_contract_validation() {
        assert!(builtin_pack_document().validate().is_ok());
    }

    #[test]
    fn builtin_covers_every_emotion_tag() {
        let doc = builtin_pack_document();
        for label in doc.emotions.keys() {
            assert!(
                EmotionTag::from_label(label).is_some(),
                "unrecognized emotion label {label}"
            );
        }
        assert_eq!(doc.emotions.len(), EmotionTag::ALL.len());
    }

    #[test]
    fn builtin_neutral_pools_are_all_populated() {
        let doc = builtin_pack_document();
        let neutral = &doc.emotions["neutral"];
        for phase in ["initial", "exploration", "solution", "followup"] {
            assert!(!neutral.bodies[phase].is_empty(), "bodies.{phase}");
            assert!(!neutral.questions[phase].is_empty(), "questions.{phase}");
        }
        assert!(!neutral.transitions.is_empty());
        assert!(!neutral.prefixes.is_empty());
        assert!(!neutral.long_forms.is_empty());
        assert!(!neutral.followups.is_empty());
        assert!(!doc.exercises["neutral"].free.is_empty());
    }

    #[test]
    fn builtin_topic_templates_carry_subject_placeholder() {
        let doc = builtin_pack_document();
        for topic in &doc.topics {
            for pool in topic.templates.values() {
                for template in pool {
                    assert!(
                        template.contains("{subject}"),
                        "template without placeholder: {template}"
                    );
                }
            }
        }
    }

    #[test]
    fn builtin_emergency_regions_are_lowercase_with_contacts() {
        let doc = builtin_pack_document();
        assert!(doc.emergency.contains_key("us"));
        for (region, resources) in &doc.emergency {
            assert_eq!(region.as_str(), region.to_ascii_lowercase());
            assert!(!resources.is_empty());
        }
    }
}
