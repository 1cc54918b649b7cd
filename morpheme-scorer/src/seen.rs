use indexmap::IndexSet;

/// A (determiner, noun) or (auxiliary form, subject) pair
pub type ContextPair = (String, String);

/// Contexts observed so far in one corpus run
///
/// A context is productive exactly the first time it is recorded. Sets only
/// grow; give each corpus its own `SeenContexts` to score corpora
/// independently.
#[derive(Debug, Clone, Default)]
pub struct SeenContexts {
    articles: IndexSet<ContextPair>,
    auxiliaries: IndexSet<ContextPair>,
    progressive_lemmas: IndexSet<String>,
    active_progressive_lemmas: IndexSet<String>,
}

impl SeenContexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an article context, returning whether it was new
    pub fn first_article_use(&mut self, determiner: &str, noun: &str) -> bool {
        self.articles
            .insert((determiner.to_string(), noun.to_string()))
    }

    /// Record an auxiliary context, returning whether it was new
    pub fn first_aux_use(&mut self, aux_form: &str, subject: &str) -> bool {
        self.auxiliaries
            .insert((aux_form.to_string(), subject.to_string()))
    }

    /// Record a verb lemma seen with -ing anywhere, returning whether it was new
    pub fn first_progressive_use(&mut self, lemma: &str) -> bool {
        self.progressive_lemmas.insert(lemma.to_string())
    }

    /// Record a verb lemma seen with -ing in an active declarative, returning
    /// whether it was new
    pub fn first_active_progressive_use(&mut self, lemma: &str) -> bool {
        self.active_progressive_lemmas.insert(lemma.to_string())
    }

    pub fn articles(&self) -> impl Iterator<Item = &ContextPair> {
        self.articles.iter()
    }

    pub fn active_progressive_lemmas(&self) -> impl Iterator<Item = &str> {
        self.active_progressive_lemmas.iter().map(String::as_str)
    }

    /// Sizes of the article, auxiliary, progressive and active progressive sets
    pub fn sizes(&self) -> [usize; 4] {
        [
            self.articles.len(),
            self.auxiliaries.len(),
            self.progressive_lemmas.len(),
            self.active_progressive_lemmas.len(),
        ]
    }
}
