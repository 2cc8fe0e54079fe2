//! Pure part of the migration: grouping legacy rows by content item and
//! deriving the rows to write. Nothing here touches a database.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::models::{
    clean_present_text, clean_text, fallback_slug, non_zero, Language, LanguageMap, NewProject,
    NewProjectTranslation, SourceRow, PROJECT_STATUS_ACTIVE,
};

/// Language variants of one content item, in source order. Never empty.
#[derive(Debug, Clone)]
pub struct ContentGroup {
    content_id: String,
    rows: Vec<SourceRow>,
}

impl ContentGroup {
    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn rows(&self) -> &[SourceRow] {
        &self.rows
    }

    /// The first row carries the language independent fields.
    pub fn representative(&self) -> &SourceRow {
        &self.rows[0]
    }
}

/// Groups rows by content id. Groups keep first-appearance order and rows
/// keep their order within a group.
pub fn group_rows(rows: Vec<SourceRow>) -> Vec<ContentGroup> {
    let mut groups: Vec<ContentGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let key = row.group_key();
        match index.get(&key) {
            Some(&i) => groups[i].rows.push(row),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(ContentGroup {
                    content_id: key,
                    rows: vec![row],
                });
            }
        }
    }

    groups
}

/// A translation waiting for its parent id.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationPlan {
    pub source_row_id: String,
    pub language: Language,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: String,
    pub content: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl TranslationPlan {
    pub fn for_project(&self, project_id: i32) -> NewProjectTranslation {
        NewProjectTranslation {
            project_id,
            language: self.language,
            title: self.title.clone(),
            slug: self
                .slug
                .clone()
                .unwrap_or_else(|| fallback_slug(project_id, self.language)),
            description: self.description.clone(),
            content: self.content.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowPlan {
    Translation(TranslationPlan),
    /// Site language id not in the language map; the row is left out.
    UnknownLanguage {
        source_row_id: String,
        site_language_id: String,
    },
}

/// Everything needed to migrate one content group.
#[derive(Debug, Clone)]
pub struct GroupPlan {
    pub content_id: String,
    pub title: String,
    pub project: NewProject,
    pub rows: Vec<RowPlan>,
}

impl GroupPlan {
    pub fn translations(&self) -> impl Iterator<Item = &TranslationPlan> {
        self.rows.iter().filter_map(|row| match row {
            RowPlan::Translation(plan) => Some(plan),
            RowPlan::UnknownLanguage { .. } => None,
        })
    }

    pub fn unknown_languages(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row, RowPlan::UnknownLanguage { .. }))
            .count()
    }
}

pub fn plan_group(group: &ContentGroup, languages: &LanguageMap) -> GroupPlan {
    let main = group.representative();

    GroupPlan {
        content_id: group.content_id().to_string(),
        title: main.display_title(),
        project: project_from(main),
        rows: group
            .rows()
            .iter()
            .map(|row| plan_row(row, languages))
            .collect(),
    }
}

pub fn plan_all(rows: Vec<SourceRow>, languages: &LanguageMap) -> Vec<GroupPlan> {
    group_rows(rows)
        .iter()
        .map(|group| plan_group(group, languages))
        .collect()
}

fn project_from(main: &SourceRow) -> NewProject {
    let amount = non_zero(main.budget)
        .or_else(|| non_zero(main.total_budget))
        .unwrap_or(Decimal::ZERO);

    NewProject {
        image_url: clean_text(main.thumbnail_image.as_deref())
            .or_else(|| clean_text(main.image.as_deref())),
        cover_image: clean_text(main.image.as_deref()),
        budget: amount,
        target_amount: amount,
        start_date: main.start_date,
        end_date: main.end_date,
        display_order: main.order_no.unwrap_or(0),
        is_featured: main.is_showed_home_page.unwrap_or(false),
        status: PROJECT_STATUS_ACTIVE.to_string(),
        is_active: true,
        created_at: main.create_date,
        updated_at: main.update_date,
    }
}

fn plan_row(row: &SourceRow, languages: &LanguageMap) -> RowPlan {
    match languages.lookup(&row.site_language_id) {
        Some(language) => RowPlan::Translation(TranslationPlan {
            source_row_id: row.id.clone(),
            language,
            title: clean_present_text(row.title.as_deref()),
            slug: clean_text(row.slug.as_deref()),
            description: clean_text(row.summary.as_deref()).unwrap_or_default(),
            content: clean_text(row.content.as_deref()).unwrap_or_default(),
            created_at: row.create_date,
            updated_at: row.update_date,
        }),
        None => RowPlan::UnknownLanguage {
            source_row_id: row.id.clone(),
            site_language_id: row.site_language_id.clone(),
        },
    }
}
