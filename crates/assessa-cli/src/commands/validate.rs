//! The `assessa validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(assessment_path: PathBuf) -> Result<()> {
    let assessments = if assessment_path.is_dir() {
        assessa_core::parser::load_assessment_directory(&assessment_path)?
    } else {
        vec![assessa_core::parser::parse_assessment(&assessment_path)?]
    };

    let mut total_warnings = 0;

    for assessment in &assessments {
        println!(
            "Assessment: {} ({} questions)",
            assessment.title,
            assessment.questions.len()
        );

        let warnings = assessa_core::parser::validate_assessment(assessment);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All assessments valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
