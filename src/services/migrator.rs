use chrono::{DateTime, Utc};
use std::future::Future;

use crate::config::Config;
use crate::db::{MssqlSource, PgProjectWriter, ProjectWriter, SourceReader};
use crate::error::AppResult;
use crate::models::LanguageMap;
use crate::services::planner::{plan_all, GroupPlan, RowPlan};
use crate::services::summary::{GroupOutcome, MigrationSummary};

/// Runs the legacy project migration end to end.
pub struct Migrator {
    config: Config,
    languages: LanguageMap,
}

impl Migrator {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            languages: LanguageMap::default(),
        }
    }

    pub async fn run(&self) -> AppResult<MigrationSummary> {
        let started_at = Utc::now();
        tracing::debug!("{} site languages mapped", self.languages.len());

        let summary = run_with(
            MssqlSource::connect(&self.config.source_database_url, &self.config.source_table),
            PgProjectWriter::connect(&self.config.database_url),
            &self.languages,
        )
        .await?;

        Ok(self.finish(summary, started_at))
    }

    /// Stamps and logs the summary, then writes the optional report. The
    /// migration is already committed here, so a report failure only warns.
    fn finish(&self, mut summary: MigrationSummary, started_at: DateTime<Utc>) -> MigrationSummary {
        summary.started_at = Some(started_at);
        summary.finished_at = Some(Utc::now());
        summary.log();

        if let Some(path) = &self.config.report_path {
            if let Err(e) = summary.write_report(path) {
                tracing::warn!("Failed to write report to {}: {}", path.display(), e);
            }
        }

        summary
    }
}

/// Opens both sides, migrates, and closes whatever was opened.
///
/// Connect and fetch failures are fatal. The destination is only connected
/// once the source is open, and every opened connection is closed on every
/// path.
pub async fn run_with<S, W>(
    connect_source: impl Future<Output = AppResult<S>>,
    connect_writer: impl Future<Output = AppResult<W>>,
    languages: &LanguageMap,
) -> AppResult<MigrationSummary>
where
    S: SourceReader,
    W: ProjectWriter,
{
    tracing::info!("Connecting to source database...");
    let mut source = connect_source.await?;
    tracing::info!("Source connection established");

    tracing::info!("Connecting to destination database...");
    let mut writer = match connect_writer.await {
        Ok(writer) => writer,
        Err(e) => {
            close_source(&mut source).await;
            return Err(e);
        }
    };
    tracing::info!("Destination connection established");

    let result = migrate(&mut source, &mut writer, languages).await;

    close_source(&mut source).await;
    match writer.close().await {
        Ok(()) => tracing::info!("Destination connection closed"),
        Err(e) => tracing::warn!("Failed to close destination connection: {}", e),
    }

    result
}

async fn close_source<S: SourceReader + ?Sized>(source: &mut S) {
    match source.close().await {
        Ok(()) => tracing::info!("Source connection closed"),
        Err(e) => tracing::warn!("Failed to close source connection: {}", e),
    }
}

/// Reads every legacy row, then migrates group by group.
pub async fn migrate<S, W>(
    source: &mut S,
    writer: &mut W,
    languages: &LanguageMap,
) -> AppResult<MigrationSummary>
where
    S: SourceReader + ?Sized,
    W: ProjectWriter + ?Sized,
{
    tracing::info!("Fetching legacy projects...");
    let rows = source.fetch_rows().await?;
    let source_rows = rows.len();
    tracing::info!("{} project rows found", source_rows);

    let plans = plan_all(rows, languages);
    tracing::info!("{} unique projects found", plans.len());

    let mut summary: MigrationSummary = execute_all(writer, &plans).await.into_iter().collect();
    summary.source_rows = source_rows;
    Ok(summary)
}

/// Applies the plans in order. A failing group never stops the ones after it.
pub async fn execute_all<W>(writer: &mut W, plans: &[GroupPlan]) -> Vec<GroupOutcome>
where
    W: ProjectWriter + ?Sized,
{
    let mut outcomes = Vec::with_capacity(plans.len());
    for plan in plans {
        outcomes.push(execute_group(writer, plan).await);
    }
    outcomes
}

/// Writes one group in its own transaction, rolling back on any error.
pub async fn execute_group<W>(writer: &mut W, plan: &GroupPlan) -> GroupOutcome
where
    W: ProjectWriter + ?Sized,
{
    tracing::info!("Migrating: {} ({} languages)", plan.title, plan.rows.len());

    match write_group(writer, plan).await {
        Ok((project_id, translations)) => GroupOutcome::Migrated {
            content_id: plan.content_id.clone(),
            project_id,
            translations,
            unknown_languages: plan.unknown_languages(),
        },
        Err(e) => {
            tracing::error!("Failed to migrate {}: {}", plan.content_id, e);
            if let Err(rollback_err) = writer.rollback().await {
                tracing::error!("Rollback failed for {}: {}", plan.content_id, rollback_err);
            }
            GroupOutcome::Failed {
                content_id: plan.content_id.clone(),
                title: plan.title.clone(),
                reason: e.to_string(),
            }
        }
    }
}

async fn write_group<W>(writer: &mut W, plan: &GroupPlan) -> AppResult<(i32, usize)>
where
    W: ProjectWriter + ?Sized,
{
    writer.begin().await?;

    let project_id = writer.insert_project(&plan.project).await?;
    tracing::info!("  Project created: id={}", project_id);

    let mut inserted = 0;
    for row in &plan.rows {
        match row {
            RowPlan::Translation(translation) => {
                let translation = translation.for_project(project_id);
                writer.insert_translation(&translation).await?;
                inserted += 1;
                tracing::info!(
                    "  Translation added: {} - {}",
                    translation.language,
                    translation.title.as_deref().unwrap_or_default()
                );
            }
            RowPlan::UnknownLanguage {
                source_row_id,
                site_language_id,
            } => {
                tracing::warn!(
                    "  Unknown language {} on row {}, skipping",
                    site_language_id,
                    source_row_id
                );
            }
        }
    }

    writer.commit().await?;
    Ok((project_id, inserted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Language, NewProject, NewProjectTranslation, SourceRow};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const TR: &str = "BF2689D9-071E-4A20-9450-B1DBDD39778F";
    const EN: &str = "7C35F456-9403-4C21-80B6-941129D14086";
    const AR: &str = "8FAB2BF3-F2E1-4D54-B668-8DD588575FE4";
    const UNKNOWN: &str = "DEADBEEF-0000-0000-0000-000000000000";

    #[derive(Default)]
    struct MemorySource {
        rows: Vec<SourceRow>,
        fail_fetch: bool,
        closed: Arc<AtomicBool>,
    }

    impl MemorySource {
        fn with_rows(rows: Vec<SourceRow>) -> Self {
            Self {
                rows,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl SourceReader for MemorySource {
        async fn fetch_rows(&mut self) -> AppResult<Vec<SourceRow>> {
            if self.fail_fetch {
                return Err(AppError::Internal("invalid object name".to_string()));
            }
            Ok(std::mem::take(&mut self.rows))
        }

        async fn close(&mut self) -> AppResult<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Destination double with transactional semantics.
    #[derive(Default)]
    struct MemoryWriter {
        next_id: i32,
        open: bool,
        pending_projects: Vec<(i32, NewProject)>,
        pending_translations: Vec<NewProjectTranslation>,
        projects: Vec<(i32, NewProject)>,
        translations: Vec<NewProjectTranslation>,
        fail_on_title: Option<String>,
        events: Vec<String>,
        closed: Arc<AtomicBool>,
    }

    impl MemoryWriter {
        fn failing_on(title: &str) -> Self {
            Self {
                fail_on_title: Some(title.to_string()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ProjectWriter for MemoryWriter {
        async fn begin(&mut self) -> AppResult<()> {
            assert!(!self.open, "nested transaction");
            self.open = true;
            self.events.push("begin".to_string());
            Ok(())
        }

        async fn insert_project(&mut self, project: &NewProject) -> AppResult<i32> {
            assert!(self.open);
            // Sequences are not transactional.
            self.next_id += 1;
            self.pending_projects.push((self.next_id, project.clone()));
            self.events.push(format!("project {}", self.next_id));
            Ok(self.next_id)
        }

        async fn insert_translation(
            &mut self,
            translation: &NewProjectTranslation,
        ) -> AppResult<()> {
            assert!(self.open);
            if self.fail_on_title.is_some() && translation.title == self.fail_on_title {
                return Err(AppError::Internal("constraint violation".to_string()));
            }
            self.pending_translations.push(translation.clone());
            self.events
                .push(format!("translation {} {}", translation.project_id, translation.language));
            Ok(())
        }

        async fn commit(&mut self) -> AppResult<()> {
            assert!(self.open);
            self.open = false;
            self.projects.append(&mut self.pending_projects);
            self.translations.append(&mut self.pending_translations);
            self.events.push("commit".to_string());
            Ok(())
        }

        async fn rollback(&mut self) -> AppResult<()> {
            self.open = false;
            self.pending_projects.clear();
            self.pending_translations.clear();
            self.events.push("rollback".to_string());
            Ok(())
        }

        async fn close(&mut self) -> AppResult<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn row(id: &str, content_id: &str, language: &str) -> SourceRow {
        SourceRow {
            id: id.to_string(),
            content_id: content_id.to_string(),
            site_language_id: language.to_string(),
            title: Some(format!("Title {}", id)),
            ..Default::default()
        }
    }

    async fn run(rows: Vec<SourceRow>, writer: &mut MemoryWriter) -> MigrationSummary {
        let mut source = MemorySource::with_rows(rows);
        migrate(&mut source, writer, &LanguageMap::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_group_with_unknown_language() {
        let mut writer = MemoryWriter::default();
        let summary = run(
            vec![row("1", "C1", TR), row("2", "C1", EN), row("3", "C1", UNKNOWN)],
            &mut writer,
        )
        .await;

        assert_eq!(writer.projects.len(), 1);
        assert_eq!(writer.translations.len(), 2);
        let project_id = writer.projects[0].0;
        assert!(writer.translations.iter().all(|t| t.project_id == project_id));
        let languages: Vec<Language> = writer.translations.iter().map(|t| t.language).collect();
        assert_eq!(languages, vec![Language::Tr, Language::En]);

        assert_eq!(summary.source_rows, 3);
        assert_eq!(summary.migrated, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.translations_inserted, 2);
        assert_eq!(summary.translations_skipped, 1);
    }

    #[tokio::test]
    async fn test_failing_group_is_rolled_back_and_run_continues() {
        let mut writer = MemoryWriter::failing_on("Title 4");
        let summary = run(
            vec![
                row("1", "C1", TR),
                row("2", "C1", EN),
                row("3", "C2", TR),
                row("4", "C2", EN),
                row("5", "C3", AR),
            ],
            &mut writer,
        )
        .await;

        assert_eq!(summary.migrated, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failures[0].content_id, "c2");
        assert_eq!(summary.failures[0].title, "Title 3");

        // C2's project and its first translation were discarded.
        let committed: Vec<i32> = writer.projects.iter().map(|(id, _)| *id).collect();
        assert_eq!(committed, vec![1, 3]);
        assert!(writer.translations.iter().all(|t| t.project_id != 2));
        assert_eq!(writer.translations.len(), 3);
    }

    #[tokio::test]
    async fn test_second_group_failure_keeps_first() {
        let mut writer = MemoryWriter::failing_on("Title 2");
        let summary = run(vec![row("1", "C1", TR), row("2", "C2", TR)], &mut writer).await;

        assert_eq!(summary.migrated, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(writer.projects.len(), 1);
        assert_eq!(writer.translations.len(), 1);
        assert_eq!(writer.translations[0].title.as_deref(), Some("Title 1"));
    }

    #[tokio::test]
    async fn test_project_inserted_before_translations() {
        let mut writer = MemoryWriter::default();
        run(vec![row("1", "C1", TR), row("2", "C1", EN)], &mut writer).await;

        assert_eq!(
            writer.events,
            vec!["begin", "project 1", "translation 1 tr", "translation 1 en", "commit"]
        );
    }

    #[tokio::test]
    async fn test_fallback_slug_uses_generated_id() {
        let mut writer = MemoryWriter::default();
        let mut first = row("1", "C1", TR);
        first.slug = Some("ilk-proje".to_string());
        let second = row("2", "C2", AR);

        run(vec![first, second], &mut writer).await;

        assert_eq!(writer.translations[0].slug, "ilk-proje");
        assert_eq!(writer.translations[1].slug, "project-2-ar");
    }

    #[tokio::test]
    async fn test_group_with_only_unknown_languages_still_commits() {
        let mut writer = MemoryWriter::default();
        let summary = run(vec![row("1", "C1", UNKNOWN)], &mut writer).await;

        assert_eq!(summary.migrated, 1);
        assert_eq!(writer.projects.len(), 1);
        assert!(writer.translations.is_empty());
    }

    #[tokio::test]
    async fn test_empty_source() {
        let mut writer = MemoryWriter::default();
        let summary = run(Vec::new(), &mut writer).await;

        assert_eq!(summary.groups, 0);
        assert_eq!(summary.migrated, 0);
        assert!(writer.events.is_empty());
    }

    #[tokio::test]
    async fn test_execute_group_reports_failure_reason() {
        let mut writer = MemoryWriter::failing_on("Title 1");
        let plans = plan_all(vec![row("1", "C1", TR)], &LanguageMap::default());

        let outcome = execute_group(&mut writer, &plans[0]).await;

        assert_eq!(
            outcome,
            GroupOutcome::Failed {
                content_id: "c1".to_string(),
                title: "Title 1".to_string(),
                reason: "Internal error: constraint violation".to_string(),
            }
        );
        assert_eq!(writer.events.last().map(String::as_str), Some("rollback"));
    }

    #[tokio::test]
    async fn test_rows_without_content_id_are_still_migrated() {
        let mut writer = MemoryWriter::default();
        let summary = run(
            vec![row("1", "", TR), row("2", "", EN), row("3", "C1", TR)],
            &mut writer,
        )
        .await;

        assert_eq!(summary.groups, 2);
        assert_eq!(summary.migrated, 2);
        assert_eq!(writer.projects.len(), 2);
        assert_eq!(writer.translations.len(), 3);
    }

    #[tokio::test]
    async fn test_run_with_closes_both_connections() {
        let source = MemorySource::with_rows(vec![row("1", "C1", TR)]);
        let writer = MemoryWriter::default();
        let (source_closed, writer_closed) = (source.closed.clone(), writer.closed.clone());

        let summary = run_with(
            async move { Ok::<_, AppError>(source) },
            async move { Ok::<_, AppError>(writer) },
            &LanguageMap::default(),
        )
        .await
        .unwrap();

        assert_eq!(summary.migrated, 1);
        assert!(source_closed.load(Ordering::SeqCst));
        assert!(writer_closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_destination_connect_failure_closes_source() {
        let source = MemorySource::with_rows(vec![row("1", "C1", TR)]);
        let source_closed = source.closed.clone();

        let result = run_with(
            async move { Ok::<_, AppError>(source) },
            async { Err::<MemoryWriter, _>(AppError::Config("connection refused".to_string())) },
            &LanguageMap::default(),
        )
        .await;

        assert!(matches!(result, Err(AppError::Config(_))));
        assert!(source_closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_source_connect_failure_skips_destination() {
        let writer_attempted = Arc::new(AtomicBool::new(false));
        let attempted = writer_attempted.clone();

        let result = run_with(
            async { Err::<MemorySource, _>(AppError::Config("login failed".to_string())) },
            async move {
                attempted.store(true, Ordering::SeqCst);
                Ok::<_, AppError>(MemoryWriter::default())
            },
            &LanguageMap::default(),
        )
        .await;

        assert!(matches!(result, Err(AppError::Config(_))));
        assert!(!writer_attempted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fatal_and_closes_both() {
        let source = MemorySource {
            fail_fetch: true,
            ..Default::default()
        };
        let writer = MemoryWriter::default();
        let (source_closed, writer_closed) = (source.closed.clone(), writer.closed.clone());

        let result = run_with(
            async move { Ok::<_, AppError>(source) },
            async move { Ok::<_, AppError>(writer) },
            &LanguageMap::default(),
        )
        .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert!(source_closed.load(Ordering::SeqCst));
        assert!(writer_closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_report_failure_keeps_summary() {
        let dir = tempfile::tempdir().unwrap();
        let migrator = Migrator::new(Config {
            source_database_url: "server=tcp:localhost,1433".to_string(),
            database_url: "postgres://localhost/projects".to_string(),
            source_table: crate::config::DEFAULT_SOURCE_TABLE.to_string(),
            report_path: Some(dir.path().join("missing").join("report.json")),
        });
        let summary = MigrationSummary {
            groups: 2,
            migrated: 1,
            skipped: 1,
            ..Default::default()
        };

        let finished = migrator.finish(summary, Utc::now());

        assert_eq!(finished.migrated, 1);
        assert_eq!(finished.skipped, 1);
        assert!(finished.finished_at.is_some());
        assert!(!dir.path().join("missing").exists());
    }
}
