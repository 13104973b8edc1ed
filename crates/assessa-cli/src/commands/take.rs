//! The `assessa take` command.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use assessa_core::model::{Question, QuestionKind};
use assessa_store::config::load_config_from;

use super::{build_engine, score_table};

fn print_question(question: &Question, position: usize, total: usize) {
    println!("\n[{position}/{total}] {}", question.content);
    match question.kind {
        QuestionKind::Choice => {
            for option in &question.options {
                println!("  {}) {}", option.label, option.text);
            }
        }
        QuestionKind::FreeText => println!("  (type your answer)"),
    }
}

fn prompt(text: &str) -> Result<()> {
    print!("{text}");
    std::io::stdout().flush().context("failed to flush stdout")
}

pub async fn execute(
    assessment_id: String,
    respondent: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let respondent = respondent.unwrap_or_else(|| config.respondent.clone());
    let engine = build_engine(&config)?;

    let (assessment, mut session) = engine.start(&assessment_id, &respondent).await?;
    println!(
        "{} ({} questions, some may be skipped)",
        assessment.title,
        assessment.questions.len()
    );
    if !assessment.description.is_empty() {
        println!("{}", assessment.description);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(question) = session.current_question().cloned() {
        let (position, total) = session.progress();
        print_question(&question, position, total);
        prompt("> ")?;

        let Some(line) = lines.next_line().await? else {
            println!();
            anyhow::bail!("input ended before the assessment was complete; nothing was saved");
        };
        if let Err(e) = session.submit_raw(&line) {
            println!("  {e}. Please try again.");
        }
    }

    let summary = session.score();
    let record = loop {
        match engine.commit(&mut session).await {
            Ok(record) => break record,
            Err(e) => {
                eprintln!("Could not save your answers: {e}");
                prompt("Try again? [Y/n] ")?;
                match lines.next_line().await? {
                    Some(answer) if !answer.trim().eq_ignore_ascii_case("n") => continue,
                    _ => anyhow::bail!("answers were not saved"),
                }
            }
        }
    };

    println!("\nAssessment complete. Total score: {:.1}", summary.total_score);
    if !summary.fine_subtotals.is_empty() {
        println!("{}", score_table(&summary));
    }
    println!("Saved record {} for {}", record.id, record.respondent_id);

    Ok(())
}
