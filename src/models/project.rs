use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Language;

pub const PROJECT_STATUS_ACTIVE: &str = "active";

/// Language independent part of a migrated project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub image_url: Option<String>,
    pub cover_image: Option<String>,
    pub budget: Decimal,
    pub target_amount: Decimal,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub display_order: i32,
    pub is_featured: bool,
    pub status: String,
    pub is_active: bool,
    /// NULL audit timestamps are filled in by the destination.
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProjectTranslation {
    pub project_id: i32,
    pub language: Language,
    pub title: Option<String>,
    pub slug: String,
    pub description: String,
    pub content: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Slug used when the legacy row has none.
pub fn fallback_slug(project_id: i32, language: Language) -> String {
    format!("project-{}-{}", project_id, language)
}
