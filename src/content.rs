use crate::error::ContentError;
use include_dir::{include_dir, Dir};
use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

static TEXTS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/texts");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

/// A reference text the user can practice against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeContent {
    pub id: String,
    pub title: String,
    pub text: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: Difficulty,
}

fn default_difficulty() -> Difficulty {
    Difficulty::Normal
}

impl PracticeContent {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Listing row for the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentSummary {
    pub id: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub char_count: usize,
}

impl From<&PracticeContent> for ContentSummary {
    fn from(content: &PracticeContent) -> Self {
        Self {
            id: content.id.clone(),
            title: content.title.clone(),
            difficulty: content.difficulty,
            char_count: content.char_count(),
        }
    }
}

/// Looks up practice content by id
pub trait ContentProvider {
    fn get_practice_content(&self, id: &str) -> Result<PracticeContent, ContentError>;
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, PracticeContent>,
}

impl Catalog {
    /// Catalog bundled with the binary
    pub fn embedded() -> Result<Self, ContentError> {
        let mut catalog = Self::default();
        for file in TEXTS_DIR.files() {
            if file.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let entries: Vec<PracticeContent> = serde_json::from_slice(file.contents())?;
            debug!(file = %file.path().display(), count = entries.len(), "loaded texts");
            catalog.extend(entries);
        }
        Ok(catalog)
    }

    /// Catalog read from a JSON array of practice texts on disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ContentError> {
        let bytes = fs::read(path.as_ref())?;
        let entries: Vec<PracticeContent> = serde_json::from_slice(&bytes)?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = PracticeContent>) -> Self {
        let mut catalog = Self::default();
        catalog.extend(entries);
        catalog
    }

    fn extend(&mut self, entries: impl IntoIterator<Item = PracticeContent>) {
        for entry in entries {
            if self.entries.contains_key(&entry.id) {
                warn!(id = %entry.id, "duplicate practice id, keeping the later entry");
            }
            self.entries.insert(entry.id.clone(), entry);
        }
    }

    pub fn list(&self) -> Vec<ContentSummary> {
        self.entries.values().map(ContentSummary::from).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn random(&self) -> Result<&PracticeContent, ContentError> {
        let mut rng = rand::thread_rng();
        self.entries
            .values()
            .choose(&mut rng)
            .ok_or(ContentError::Empty)
    }
}

impl ContentProvider for Catalog {
    fn get_practice_content(&self, id: &str) -> Result<PracticeContent, ContentError> {
        self.entries
            .get(id)
            .cloned()
            .ok_or_else(|| ContentError::NotFound(id.to_string()))
    }
}
