//! Subcommand implementations.

pub mod history;
pub mod init;
pub mod list;
pub mod score;
pub mod take;
pub mod validate;

use std::sync::Arc;

use anyhow::Result;
use comfy_table::{Cell, Table};

use assessa_core::engine::AssessmentEngine;
use assessa_core::profile::MacroProfile;
use assessa_core::scoring::ScoreSummary;
use assessa_store::{AssessaConfig, DirectorySource, FileRecordStore};

/// Engine over the configured questions directory and record store.
pub(crate) fn build_engine(config: &AssessaConfig) -> Result<AssessmentEngine> {
    Ok(AssessmentEngine::new(
        Arc::new(DirectorySource::new(&config.questions_dir)),
        Arc::new(FileRecordStore::new(&config.store_dir)),
        config.normalizer()?,
        config.engine_config(),
    ))
}

pub(crate) fn score_table(summary: &ScoreSummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Dimension", "Items", "Sum", "Average"]);

    for (dimension, tally) in summary.fine_subtotals.iter() {
        table.add_row(vec![
            Cell::new(dimension),
            Cell::new(tally.count),
            Cell::new(format!("{:.1}", tally.sum)),
            Cell::new(format!("{:.2}", tally.average())),
        ]);
    }

    table
}

pub(crate) fn profile_table(profile: &MacroProfile) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Category", "Score"]);

    for entry in profile.iter() {
        table.add_row(vec![Cell::new(&entry.label), Cell::new(entry.value)]);
    }

    table
}
