#![forbid(unsafe_code)]

use std::env;
use std::io::{self, BufRead};

use eirene_kernel_contracts::ph1risk::{RegionTag, RiskScore};
use eirene_kernel_contracts::ph1session::SessionKey;
use eirene_kernel_contracts::{EmotionTag, MonotonicTimeNs};
use eirene_os::turn_executor::{CompanionKernel, CompanionKernelConfig, TurnOutcome};
use eirene_storage::pack_source::load_or_builtin;
use eirene_tools::console::{
    format_closing, format_emergency, format_questions, format_triage, parse_console_line,
    ConsoleCommand,
};

const REGION_ENV: &str = "EIRENE_REGION";
// The console has no classifier; the typed emotion label is taken at face
// value, so it scores as a high-confidence signal.
const ASSERTED_EMOTION_CONFIDENCE: f32 = 0.9;

fn main() {
    if let Err(err) = run() {
        eprintln!("eirene: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let (doc, pack_warning) = load_or_builtin();
    if let Some(w) = pack_warning {
        eprintln!("warning: {w}; using builtin pack");
    }
    let config = CompanionKernelConfig::mvp_v1(region_from_env()?);
    let mut kernel = CompanionKernel::new(config, &doc).map_err(|e| e.to_string())?;

    println!(
        "eirene console (pack {} rev {}). lines are 'emotion: what happened'; \
         :premium toggles the tier, :end closes the session, :quit exits.",
        kernel.catalog().pack_id(),
        kernel.catalog().revision()
    );

    let mut tick: u64 = 0;
    let mut session_seq: u64 = 1;
    let mut session = session_key(session_seq)?;
    let mut premium = false;
    let mut last_emotion = EmotionTag::Neutral;
    let mut last_score = RiskScore(0);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| e.to_string())?;
        match parse_console_line(&line) {
            ConsoleCommand::Empty => {}
            ConsoleCommand::Quit => break,
            ConsoleCommand::Unknown(directive) => {
                println!("unknown directive ':{directive}'. known: :premium, :end, :quit");
            }
            ConsoleCommand::TogglePremium => {
                premium = !premium;
                println!("premium tier: {}", if premium { "on" } else { "off" });
            }
            ConsoleCommand::EndSession => {
                tick += 1;
                match kernel.close_session(
                    MonotonicTimeNs(tick),
                    Some(&session),
                    last_emotion,
                    last_score,
                    premium,
                ) {
                    Ok(closing) => println!("{}", format_closing(&closing.summary, &closing.plan)),
                    Err(e) => eprintln!("error: {e}"),
                }
                session_seq += 1;
                session = session_key(session_seq)?;
                last_emotion = EmotionTag::Neutral;
                last_score = RiskScore(0);
                println!("(new session)");
            }
            ConsoleCommand::Say { emotion, text } => {
                tick += 1;
                let outcome = match kernel.run_turn(
                    MonotonicTimeNs(tick),
                    Some(&session),
                    &text,
                    emotion,
                    ASSERTED_EMOTION_CONFIDENCE,
                    premium,
                ) {
                    Ok(o) => o,
                    Err(e) => {
                        eprintln!("error: {e}");
                        continue;
                    }
                };
                last_emotion = emotion;
                match outcome {
                    TurnOutcome::Emergency {
                        assessment,
                        payload,
                        companion_text,
                    } => {
                        last_score = assessment.score;
                        println!("{}", format_triage(&assessment));
                        match payload {
                            Some(p) => println!("{}", format_emergency(&p)),
                            None => println!("{companion_text}"),
                        }
                    }
                    TurnOutcome::Reply {
                        assessment,
                        reply,
                        questions,
                        escalation,
                    } => {
                        last_score = assessment.score;
                        println!("{}", format_triage(&assessment));
                        println!("{}", reply.reply_text);
                        if let Some(p) = escalation {
                            println!("{}", format_emergency(&p));
                        }
                        if !questions.questions.is_empty() {
                            println!("you could tell me:");
                            println!("{}", format_questions(&questions));
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn region_from_env() -> Result<RegionTag, String> {
    match env::var(REGION_ENV) {
        Ok(v) if !v.trim().is_empty() => {
            RegionTag::new(v).map_err(|e| format!("invalid {REGION_ENV}: {e:?}"))
        }
        _ => RegionTag::new("us").map_err(|e| format!("{e:?}")),
    }
}

fn session_key(seq: u64) -> Result<SessionKey, String> {
    SessionKey::new(format!("console-{seq}")).map_err(|e| format!("{e:?}"))
}
