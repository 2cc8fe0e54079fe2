use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::db::create_pool;
use crate::error::{AppError, AppResult};
use crate::models::{NewProject, NewProjectTranslation};

const INSERT_PROJECT: &str = r#"INSERT INTO "Project" (
        "imageUrl", "coverImage", "budget", "targetAmount",
        "startDate", "endDate", "displayOrder", "isFeatured",
        "status", "isActive", "createdAt", "updatedAt"
    ) VALUES (
        $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
        COALESCE($11, LOCALTIMESTAMP), COALESCE($12, LOCALTIMESTAMP)
    ) RETURNING id"#;

const INSERT_TRANSLATION: &str = r#"INSERT INTO "ProjectTranslation" (
        "projectId", "language", "title", "slug",
        "description", "content", "createdAt", "updatedAt"
    ) VALUES (
        $1, $2, $3, $4, $5, $6,
        COALESCE($7, LOCALTIMESTAMP), COALESCE($8, LOCALTIMESTAMP)
    )"#;

/// Write side of the migration. Every content group is written between one
/// `begin` and one `commit` or `rollback`.
#[async_trait]
pub trait ProjectWriter: Send {
    async fn begin(&mut self) -> AppResult<()>;

    /// Inserts the parent row and returns its generated id.
    async fn insert_project(&mut self, project: &NewProject) -> AppResult<i32>;

    async fn insert_translation(&mut self, translation: &NewProjectTranslation) -> AppResult<()>;

    async fn commit(&mut self) -> AppResult<()>;

    /// Discards the open transaction. A no-op when none is open.
    async fn rollback(&mut self) -> AppResult<()>;

    /// Drops any unfinished transaction and closes the connection.
    async fn close(&mut self) -> AppResult<()>;
}

/// Destination PostgreSQL database.
pub struct PgProjectWriter {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgProjectWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }

    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::new(pool))
    }

    fn transaction(&mut self) -> AppResult<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| AppError::Internal("no open transaction".to_string()))
    }
}

#[async_trait]
impl ProjectWriter for PgProjectWriter {
    async fn begin(&mut self) -> AppResult<()> {
        if self.tx.is_some() {
            return Err(AppError::Internal("transaction already open".to_string()));
        }
        self.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn insert_project(&mut self, project: &NewProject) -> AppResult<i32> {
        let tx = self.transaction()?;

        let (id,): (i32,) = sqlx::query_as(INSERT_PROJECT)
            .bind(project.image_url.as_deref())
            .bind(project.cover_image.as_deref())
            .bind(project.budget)
            .bind(project.target_amount)
            .bind(project.start_date)
            .bind(project.end_date)
            .bind(project.display_order)
            .bind(project.is_featured)
            .bind(&project.status)
            .bind(project.is_active)
            .bind(project.created_at)
            .bind(project.updated_at)
            .fetch_one(&mut **tx)
            .await?;

        Ok(id)
    }

    async fn insert_translation(&mut self, translation: &NewProjectTranslation) -> AppResult<()> {
        let tx = self.transaction()?;

        sqlx::query(INSERT_TRANSLATION)
            .bind(translation.project_id)
            .bind(translation.language.as_str())
            .bind(translation.title.as_deref())
            .bind(&translation.slug)
            .bind(&translation.description)
            .bind(&translation.content)
            .bind(translation.created_at)
            .bind(translation.updated_at)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    async fn commit(&mut self) -> AppResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| AppError::Internal("no open transaction".to_string()))?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    /// An unfinished transaction is rolled back by the server when dropped.
    async fn close(&mut self) -> AppResult<()> {
        self.tx.take();
        self.pool.close().await;
        Ok(())
    }
}
