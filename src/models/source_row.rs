use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of the legacy project table: a single content item in a single
/// site language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    pub id: String,
    pub content_id: String,
    pub site_language_id: String,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub thumbnail_image: Option<String>,
    pub image: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub budget: Option<Decimal>,
    pub total_budget: Option<Decimal>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub order_no: Option<i32>,
    pub is_showed_home_page: Option<bool>,
    pub create_date: Option<NaiveDateTime>,
    pub update_date: Option<NaiveDateTime>,
}

impl SourceRow {
    /// Key used to group language variants of the same content item.
    pub fn group_key(&self) -> String {
        self.content_id.trim().to_lowercase()
    }

    /// Title for progress output, falling back to the row id.
    pub fn display_title(&self) -> String {
        clean_text(self.title.as_deref()).unwrap_or_else(|| format!("#{}", self.id))
    }
}

/// Normalizes line endings and trims. Blank input counts as absent.
pub fn clean_text(value: Option<&str>) -> Option<String> {
    let cleaned = value?.replace("\r\n", "\n");
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Like [`clean_text`], but a present value never becomes NULL: blank input
/// is kept as an empty string.
pub fn clean_present_text(value: Option<&str>) -> Option<String> {
    clean_text(value).or_else(|| value.map(|_| String::new()))
}

/// Zero amounts are treated like missing ones.
pub fn non_zero(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| !v.is_zero())
}
