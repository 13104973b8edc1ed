//! The `assessa init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("assessa.toml").exists() {
        println!("assessa.toml already exists, skipping.");
    } else {
        std::fs::write("assessa.toml", SAMPLE_CONFIG)?;
        println!("Created assessa.toml");
    }

    std::fs::create_dir_all("assessments")?;
    let sample_path = Path::new("assessments/national-survey.toml");
    if sample_path.exists() {
        println!("assessments/national-survey.toml already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_ASSESSMENT)?;
        println!("Created assessments/national-survey.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: assessa validate --assessment assessments/national-survey.toml");
    println!("  2. Run: assessa take --assessment national-survey --respondent me");
    println!("  3. Run: assessa history --respondent me");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# assessa configuration

store_dir = "./assessa-records"
questions_dir = "./assessments"
respondent = "anonymous"

# Assessment whose newest record feeds the profile radar.
primary_assessment = "national-survey"
trend_limit = 10
save_retries = 2
retry_delay_ms = 250

[profile]
max_item_score = 5.0
zero_floor = 20

# Uncomment to replace the standard dimension table.
# [dimensions]
# optimism = "social_emotional"
# sleep_quality = "health_wellbeing"

[catalog.national-survey]
title = "National Student Wellbeing Survey"
category = "survey"
"#;

const SAMPLE_ASSESSMENT: &str = include_str!("../../../../assessments/national-survey.toml");
