#![forbid(unsafe_code)]

use eirene_kernel_contracts::ph1dialogue::{QuestionsBuildOk, SummaryBuildOk};
use eirene_kernel_contracts::ph1plan::TreatmentPlan;
use eirene_kernel_contracts::ph1risk::{EmergencyPayload, RiskAssessment};
use eirene_kernel_contracts::EmotionTag;

/// One parsed console line. Utterances are `emotion: text`; a line whose
/// prefix is not a recognized emotion label is taken whole as neutral text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Say { emotion: EmotionTag, text: String },
    TogglePremium,
    EndSession,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_console_line(line: &str) -> ConsoleCommand {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleCommand::Empty;
    }
    if let Some(directive) = line.strip_prefix(':') {
        return match directive.trim() {
            "premium" => ConsoleCommand::TogglePremium,
            "end" => ConsoleCommand::EndSession,
            "quit" | "q" => ConsoleCommand::Quit,
            other => ConsoleCommand::Unknown(other.to_string()),
        };
    }
    if let Some((head, rest)) = line.split_once(':') {
        if let Some(emotion) = EmotionTag::from_label(head.trim()) {
            return ConsoleCommand::Say {
                emotion,
                text: rest.trim().to_string(),
            };
        }
    }
    ConsoleCommand::Say {
        emotion: EmotionTag::Neutral,
        text: line.to_string(),
    }
}

pub fn format_triage(assessment: &RiskAssessment) -> String {
    let mut out = format!(
        "[risk {}/10 {} -> {}]",
        assessment.score.0,
        assessment.level.as_str(),
        assessment.action.as_str()
    );
    if !assessment.triggers.is_empty() {
        out.push_str(&format!(" triggers: {}", assessment.triggers.join(", ")));
    }
    out
}

pub fn format_questions(questions: &QuestionsBuildOk) -> String {
    questions
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| format!("  {}. {q}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_emergency(payload: &EmergencyPayload) -> String {
    let mut lines = vec![payload.message.clone()];
    if !payload.immediate_actions.is_empty() {
        lines.push("right now:".to_string());
        for action in &payload.immediate_actions {
            lines.push(format!("  - {action}"));
        }
    }
    if !payload.resources.is_empty() {
        lines.push("reach out:".to_string());
        for r in &payload.resources {
            lines.push(format!("  - {}: {}", r.label, r.contact));
        }
    }
    lines.join("\n")
}

pub fn format_closing(summary: &SummaryBuildOk, plan: &TreatmentPlan) -> String {
    let mut lines = vec![
        summary.summary_text.clone(),
        format!("advisory: {}", summary.advisory.as_str()),
        format!("plan ({}):", plan.plan_tier.as_str()),
    ];
    if !plan.exercises.is_empty() {
        lines.push("  exercises:".to_string());
        for e in &plan.exercises {
            lines.push(format!("    - {e}"));
        }
    }
    if !plan.recommendations.is_empty() {
        lines.push("  recommendations:".to_string());
        for r in &plan.recommendations {
            lines.push(format!("    - {r}"));
        }
    }
    lines.join("\n")
}
