//! The `assessa list` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use assessa_core::traits::QuestionSource;
use assessa_store::config::load_config_from;
use assessa_store::DirectorySource;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let source = DirectorySource::new(&config.questions_dir);
    let summaries = source.list_assessments().await?;

    if summaries.is_empty() {
        println!("No assessments found in {}", config.questions_dir.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Category", "Questions"]);

    for summary in &summaries {
        let (title, category) = match config.catalog.get(&summary.id) {
            Some(entry) if !entry.category.is_empty() => {
                (entry.title.as_str(), entry.category.as_str())
            }
            Some(entry) => (entry.title.as_str(), summary.category.as_str()),
            None => (summary.title.as_str(), summary.category.as_str()),
        };
        table.add_row(vec![
            Cell::new(&summary.id),
            Cell::new(title),
            Cell::new(category),
            Cell::new(summary.question_count),
        ]);
    }

    println!("{table}");
    Ok(())
}
