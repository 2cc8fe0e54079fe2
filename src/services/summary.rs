use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use crate::error::AppResult;

/// Result of migrating one content group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GroupOutcome {
    Migrated {
        content_id: String,
        project_id: i32,
        translations: usize,
        unknown_languages: usize,
    },
    Failed {
        content_id: String,
        title: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupFailure {
    pub content_id: String,
    pub title: String,
    pub reason: String,
}

/// Totals of a run, folded from the per-group outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationSummary {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub source_rows: usize,
    pub groups: usize,
    pub migrated: usize,
    pub skipped: usize,
    pub translations_inserted: usize,
    pub translations_skipped: usize,
    pub failures: Vec<GroupFailure>,
}

impl MigrationSummary {
    pub fn record(&mut self, outcome: GroupOutcome) {
        self.groups += 1;
        match outcome {
            GroupOutcome::Migrated {
                translations,
                unknown_languages,
                ..
            } => {
                self.migrated += 1;
                self.translations_inserted += translations;
                self.translations_skipped += unknown_languages;
            }
            GroupOutcome::Failed {
                content_id,
                title,
                reason,
            } => {
                self.skipped += 1;
                self.failures.push(GroupFailure {
                    content_id,
                    title,
                    reason,
                });
            }
        }
    }

    pub fn log(&self) {
        tracing::info!("Migration finished");
        tracing::info!("  Migrated: {}", self.migrated);
        tracing::info!("  Skipped: {}", self.skipped);
        tracing::info!(
            "  Translations: {} inserted, {} with unknown language",
            self.translations_inserted,
            self.translations_skipped
        );
        for failure in &self.failures {
            tracing::warn!(
                "  Skipped {} ({}): {}",
                failure.content_id,
                failure.title,
                failure.reason
            );
        }
    }

    /// Writes the summary as pretty printed JSON.
    pub fn write_report(&self, path: &Path) -> AppResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!("Report written to {}", path.display());
        Ok(())
    }
}

impl FromIterator<GroupOutcome> for MigrationSummary {
    fn from_iter<I: IntoIterator<Item = GroupOutcome>>(iter: I) -> Self {
        let mut summary = MigrationSummary::default();
        for outcome in iter {
            summary.record(outcome);
        }
        summary
    }
}
