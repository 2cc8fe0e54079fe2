use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tiberius::{Client, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::error::{AppError, AppResult};
use crate::models::SourceRow;

/// Read side of the migration.
#[async_trait]
pub trait SourceReader: Send {
    /// Fetches every legacy row, ordered by content id then site language id.
    async fn fetch_rows(&mut self) -> AppResult<Vec<SourceRow>>;

    /// Closes the connection. Closing twice is a no-op.
    async fn close(&mut self) -> AppResult<()>;
}

/// Builds the extraction query for the given legacy table.
///
/// Columns are cast so the decoder sees the same SQL types regardless of how
/// the legacy schema declared them (money vs decimal, datetime vs datetime2,
/// uniqueidentifier vs varchar ids). Ordering uses the raw columns, not the
/// casted aliases.
pub fn extraction_query(table: &str) -> String {
    format!(
        "SELECT \
            CAST(p.Id AS NVARCHAR(64)) AS Id, \
            CAST(p.ContentId AS NVARCHAR(64)) AS ContentId, \
            CAST(p.SiteLanguageId AS NVARCHAR(64)) AS SiteLanguageId, \
            p.Title, \
            p.Slug, \
            p.ThumbnailImage, \
            p.Image, \
            p.Summary, \
            p.Content, \
            CAST(p.Budget AS DECIMAL(19, 4)) AS Budget, \
            CAST(p.TotalBudget AS DECIMAL(19, 4)) AS TotalBudget, \
            CAST(p.StartDate AS DATETIME2) AS StartDate, \
            CAST(p.EndDate AS DATETIME2) AS EndDate, \
            CAST(p.OrderNo AS INT) AS OrderNo, \
            CAST(p.IsShowedHomePage AS BIT) AS IsShowedHomePage, \
            CAST(p.CreateDate AS DATETIME2) AS CreateDate, \
            CAST(p.UpdateDate AS DATETIME2) AS UpdateDate \
         FROM {} AS p \
         ORDER BY p.ContentId, p.SiteLanguageId",
        table
    )
}

/// Legacy SQL Server connection.
pub struct MssqlSource {
    client: Option<Client<Compat<TcpStream>>>,
    table: String,
}

impl MssqlSource {
    /// Connects over TCP using an ADO.NET connection string.
    pub async fn connect(connection_string: &str, table: &str) -> AppResult<Self> {
        let config = tiberius::Config::from_ado_string(connection_string)?;

        let tcp = TcpStream::connect(config.get_addr()).await?;
        tcp.set_nodelay(true)?;

        let client = Client::connect(config, tcp.compat_write()).await?;

        Ok(Self {
            client: Some(client),
            table: table.to_string(),
        })
    }
}

#[async_trait]
impl SourceReader for MssqlSource {
    async fn fetch_rows(&mut self) -> AppResult<Vec<SourceRow>> {
        let query = extraction_query(&self.table);
        tracing::debug!("Extraction query: {}", query);

        let client = self
            .client
            .as_mut()
            .ok_or_else(|| AppError::Internal("source connection is closed".to_string()))?;

        let rows = client
            .simple_query(query)
            .await?
            .into_first_result()
            .await?;

        rows.iter().map(decode_row).collect()
    }

    async fn close(&mut self) -> AppResult<()> {
        if let Some(client) = self.client.take() {
            client.close().await?;
        }
        Ok(())
    }
}

/// NULL ids decode as empty strings. Rows without a content id then share one
/// group, which fails or succeeds on its own like any other.
fn decode_row(row: &Row) -> AppResult<SourceRow> {
    Ok(SourceRow {
        id: text(row, "Id")?.unwrap_or_default(),
        content_id: text(row, "ContentId")?.unwrap_or_default(),
        site_language_id: text(row, "SiteLanguageId")?.unwrap_or_default(),
        title: text(row, "Title")?,
        slug: text(row, "Slug")?,
        thumbnail_image: text(row, "ThumbnailImage")?,
        image: text(row, "Image")?,
        summary: text(row, "Summary")?,
        content: text(row, "Content")?,
        budget: row.try_get::<Decimal, _>("Budget")?,
        total_budget: row.try_get::<Decimal, _>("TotalBudget")?,
        start_date: row.try_get::<NaiveDateTime, _>("StartDate")?,
        end_date: row.try_get::<NaiveDateTime, _>("EndDate")?,
        order_no: row.try_get::<i32, _>("OrderNo")?,
        is_showed_home_page: row.try_get::<bool, _>("IsShowedHomePage")?,
        create_date: row.try_get::<NaiveDateTime, _>("CreateDate")?,
        update_date: row.try_get::<NaiveDateTime, _>("UpdateDate")?,
    })
}

fn text(row: &Row, column: &str) -> AppResult<Option<String>> {
    Ok(row.try_get::<&str, _>(column)?.map(str::to_string))
}
