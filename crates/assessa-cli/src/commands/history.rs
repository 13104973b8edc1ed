//! The `assessa history` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use assessa_report::html::write_html_report;
use assessa_store::config::load_config_from;

use super::{build_engine, profile_table};

pub async fn execute(
    respondent: Option<String>,
    format: String,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let respondent = respondent.unwrap_or_else(|| config.respondent.clone());
    let engine = build_engine(&config)?;
    let view = engine.history(&respondent).await?;

    match format.as_str() {
        "json" => match output {
            Some(path) => {
                view.save_json(&path)?;
                println!("History written to {}", path.display());
            }
            None => println!("{}", serde_json::to_string_pretty(&view)?),
        },
        "html" => {
            let path = output.unwrap_or_else(|| PathBuf::from("assessa-history.html"));
            write_html_report(&view, &config.titles(), &path)?;
            println!("HTML report written to {}", path.display());
        }
        _ => {
            println!("Respondent: {}", view.respondent_id);
            println!("Assessments taken: {}", view.record_count);
            if view.record_count == 0 {
                println!("No assessments taken yet.");
                return Ok(());
            }
            if let Some(score) = view.latest_score {
                println!("Latest score: {score:.1}");
            }

            println!("\nProfile");
            println!("{}", profile_table(&view.profile));

            let trend: Vec<String> = view
                .trend
                .iter()
                .map(|p| format!("{} {:.1}", p.label, p.total_score))
                .collect();
            println!("\nTrend: {}", trend.join(" -> "));

            let mut table = Table::new();
            table.set_header(vec!["Date", "Assessment", "Score"]);
            for record in &view.records {
                table.add_row(vec![
                    Cell::new(record.created_at.format("%Y-%m-%d %H:%M")),
                    Cell::new(config.title_of(&record.assessment_id)),
                    Cell::new(format!("{:.1}", record.total_score)),
                ]);
            }
            println!("\n{table}");
        }
    }

    Ok(())
}
