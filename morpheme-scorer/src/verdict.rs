use serde::{Deserialize, Serialize};

/// The four scored morpheme categories, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Article,
    Auxiliary,
    ActiveProgressive,
    GeneralProgressive,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Article,
        Category::Auxiliary,
        Category::ActiveProgressive,
        Category::GeneralProgressive,
    ];
}

/// Placeholder note for a category nothing was said about
pub const NOT_APPLICABLE: &str = "N/A";

/// Existence, productivity and justification for one category
///
/// Fields are private so that `productive` can never be set without
/// `exists`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryVerdict {
    exists: bool,
    productive: bool,
    note: String,
}

impl Default for CategoryVerdict {
    fn default() -> Self {
        Self::absent(NOT_APPLICABLE)
    }
}

impl CategoryVerdict {
    pub fn absent(note: impl Into<String>) -> Self {
        Self {
            exists: false,
            productive: false,
            note: note.into(),
        }
    }

    pub fn present(productive: bool, note: impl Into<String>) -> Self {
        Self {
            exists: true,
            productive,
            note: note.into(),
        }
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn productive(&self) -> bool {
        self.productive
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    /// Fold a later finding for the same utterance into this one
    ///
    /// Flags accumulate (once set they stay set); the latest note wins.
    pub fn merge(&mut self, later: CategoryVerdict) {
        self.exists |= later.exists;
        self.productive |= later.productive;
        self.note = later.note;
    }

    /// Replace only the note, keeping the flags
    pub fn annotate(&mut self, note: impl Into<String>) {
        self.note = note.into();
    }

    /// Productivity as the 0/1 score used in report totals
    pub fn score(&self) -> u32 {
        u32::from(self.productive)
    }
}

/// Verdict for one utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub utterance: String,
    pub cleaned: String,
    pub article: CategoryVerdict,
    pub auxiliary: CategoryVerdict,
    pub active_progressive: CategoryVerdict,
    pub general_progressive: CategoryVerdict,
}

impl Verdict {
    /// All categories absent, each carrying the same note
    pub fn uniform(utterance: &str, cleaned: &str, note: &str) -> Self {
        Self {
            utterance: utterance.to_string(),
            cleaned: cleaned.to_string(),
            article: CategoryVerdict::absent(note),
            auxiliary: CategoryVerdict::absent(note),
            active_progressive: CategoryVerdict::absent(note),
            general_progressive: CategoryVerdict::absent(note),
        }
    }

    pub fn category(&self, category: Category) -> &CategoryVerdict {
        match category {
            Category::Article => &self.article,
            Category::Auxiliary => &self.auxiliary,
            Category::ActiveProgressive => &self.active_progressive,
            Category::GeneralProgressive => &self.general_progressive,
        }
    }
}
