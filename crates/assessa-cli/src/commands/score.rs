//! The `assessa score` command.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use assessa_core::parser::parse_assessment;
use assessa_core::profile::MacroProfile;
use assessa_core::scoring::FineSubtotals;
use assessa_core::session::replay;
use assessa_store::config::load_config_from;

use super::{profile_table, score_table};

#[derive(Serialize)]
struct ScoreOutput<'a> {
    assessment_id: &'a str,
    complete: bool,
    /// First visible question without an answer, when incomplete.
    pending_question: Option<&'a str>,
    answered: usize,
    total_score: f64,
    fine_subtotals: &'a FineSubtotals,
    profile: MacroProfile,
}

pub fn execute(
    assessment_path: PathBuf,
    answers_path: PathBuf,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let assessment = parse_assessment(&assessment_path)?;

    let content = std::fs::read_to_string(&answers_path)
        .with_context(|| format!("failed to read answers: {}", answers_path.display()))?;
    let responses: BTreeMap<String, String> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse answers: {}", answers_path.display()))?;

    let graph = Arc::new(assessment.questions.clone());
    let session = replay(&assessment.id, &config.respondent, graph, &responses)?;
    let summary = session.score();
    let profile = config.normalizer()?.normalize(&summary.fine_subtotals);

    let output = ScoreOutput {
        assessment_id: &assessment.id,
        complete: session.is_complete(),
        pending_question: session.current_question().map(|q| q.id.as_str()),
        answered: session.answers().len(),
        total_score: summary.total_score,
        fine_subtotals: &summary.fine_subtotals,
        profile,
    };

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&output)?),
        _ => {
            println!(
                "Assessment: {} ({} answered)",
                assessment.title, output.answered
            );
            if let Some(pending) = output.pending_question {
                println!("Incomplete: no answer for question '{pending}'");
            }
            println!("Total score: {:.1}", output.total_score);
            if !summary.fine_subtotals.is_empty() {
                println!("{}", score_table(&summary));
                println!("{}", profile_table(&output.profile));
            }
        }
    }

    Ok(())
}
