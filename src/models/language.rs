use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Languages the new schema stores translations for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Tr,
    En,
    Ar,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Tr => "tr",
            Language::En => "en",
            Language::Ar => "ar",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SiteLanguageId values of the legacy CMS.
const LEGACY_SITE_LANGUAGES: [(&str, Language); 3] = [
    ("BF2689D9-071E-4A20-9450-B1DBDD39778F", Language::Tr),
    ("7C35F456-9403-4C21-80B6-941129D14086", Language::En),
    ("8FAB2BF3-F2E1-4D54-B668-8DD588575FE4", Language::Ar),
];

/// Maps legacy site language ids to translation languages.
#[derive(Debug, Clone)]
pub struct LanguageMap {
    by_id: HashMap<Uuid, Language>,
}

impl LanguageMap {
    pub fn new(entries: impl IntoIterator<Item = (Uuid, Language)>) -> Self {
        Self {
            by_id: entries.into_iter().collect(),
        }
    }

    /// Looks up a textual site language id. Case, padding and braces are
    /// ignored; anything that is not a GUID is simply unknown.
    pub fn lookup(&self, site_language_id: &str) -> Option<Language> {
        let id = Uuid::parse_str(site_language_id.trim()).ok()?;
        self.by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Default for LanguageMap {
    fn default() -> Self {
        Self::new(LEGACY_SITE_LANGUAGES.iter().filter_map(|(id, language)| {
            Uuid::parse_str(id).ok().map(|uuid| (uuid, *language))
        }))
    }
}
