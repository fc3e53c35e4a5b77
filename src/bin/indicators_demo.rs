//! Demo that runs one analysis end to end and prints the result JSON.
//! Pass a path to an `AnalysisInput` JSON file, or run without arguments to
//! analyze a built-in sample call.

use std::collections::HashMap;

use anyhow::Context;
use chrono::Utc;

use carecall_indicators::{
    AlertGate, AnalysisInput, IndicatorEngine, Phase, Provenance, SnapshotHistory,
};

fn sample_input() -> AnalysisInput {
    let acoustic = HashMap::from([
        ("speech_rate".to_string(), 2.2f32),
        ("energy_mean".to_string(), 0.04),
        ("energy_std".to_string(), 0.02),
        ("pause_ratio".to_string(), 0.35),
        ("pitch_std".to_string(), 28.0),
        ("voice_activity_ratio".to_string(), 0.6),
    ]);
    let language_model = HashMap::from([
        ("depression_risk".to_string(), 0.55f32),
        ("sleep_disorder".to_string(), 0.40),
        ("cognitive_function".to_string(), 0.70),
        ("emotional_stability".to_string(), 0.65),
        ("vitality".to_string(), 0.45),
    ]);
    let specialized = HashMap::from([
        ("depression".to_string(), 0.48f32),
        ("insomnia".to_string(), 0.35),
    ]);
    let health = HashMap::from([("vitality_score".to_string(), 0.52f32)]);

    AnalysisInput::new(Phase::Enhanced, Provenance::ExpertLabeled)
        .with_acoustic(acoustic)
        .with_language_model(language_model)
        .with_specialized_model(specialized)
        .with_health_data(health)
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let input: AnalysisInput = match std::env::args().nth(1) {
        Some(path) => {
            let raw =
                std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?
        }
        None => sample_input(),
    };

    let engine = IndicatorEngine::from_env();
    let history = SnapshotHistory::with_capacity(32);
    let mut gate = AlertGate::new(600);

    let result = engine.analyze(&input)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    history.push(&result);
    if gate.evaluate(result.overall_risk, Utc::now()) {
        println!("alert: overall risk '{}' would page a caregiver", result.overall_risk);
    }

    println!("indicators-demo done");
    Ok(())
}
