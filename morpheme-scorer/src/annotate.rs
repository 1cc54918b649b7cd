use std::collections::HashMap;
use std::path::Path;

use transcript_utils::conllu::{ConlluError, group_by_utterance, parse_conllu};
use transcript_utils::{ParsedSentence, ParsedToken};

#[derive(Debug, thiserror::Error)]
pub enum AnnotatorError {
    #[error("no annotation available for '{0}'")]
    Missing(String),

    #[error("annotator request failed")]
    Transport(#[source] reqwest::Error),

    #[error("annotator returned a malformed response: {0}")]
    Malformed(String),

    #[error("invalid CoNLL-U")]
    Conllu(#[from] ConlluError),

    #[error("could not read annotations from {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Tokenizes, tags, lemmatizes and dependency-parses English text
///
/// Implementations are created once per run and only read afterwards.
pub trait Annotator {
    fn annotate(&self, text: &str) -> Result<Vec<ParsedSentence>, AnnotatorError>;
}

impl<A: Annotator + ?Sized> Annotator for &A {
    fn annotate(&self, text: &str) -> Result<Vec<ParsedSentence>, AnnotatorError> {
        (**self).annotate(text)
    }
}

impl<A: Annotator + ?Sized> Annotator for Box<A> {
    fn annotate(&self, text: &str) -> Result<Vec<ParsedSentence>, AnnotatorError> {
        (**self).annotate(text)
    }
}

/// Annotations prepared ahead of time by an external parser run
///
/// Sentences are looked up by the exact cleaned utterance text: either the
/// `# utterance = ...` comment shared by all sentences of an utterance, or the
/// sentence's `# text = ...`.
#[derive(Debug, Default)]
pub struct ConlluAnnotator {
    utterances: HashMap<String, Vec<ParsedSentence>>,
}

impl ConlluAnnotator {
    pub fn from_conllu(input: &str) -> Result<Self, AnnotatorError> {
        let mut utterances: HashMap<String, Vec<ParsedSentence>> = HashMap::new();
        for (key, sentences) in group_by_utterance(parse_conllu(input)?) {
            if utterances.contains_key(&key) {
                log::debug!("Duplicate annotation for '{key}', keeping the first");
                continue;
            }
            utterances.insert(key, sentences);
        }
        Ok(Self { utterances })
    }

    pub fn from_file(path: &Path) -> Result<Self, AnnotatorError> {
        let input = std::fs::read_to_string(path).map_err(|source| AnnotatorError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let annotator = Self::from_conllu(&input)?;
        log::info!(
            "Loaded annotations for {} utterances from {}",
            annotator.len(),
            path.display()
        );
        Ok(annotator)
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }
}

impl Annotator for ConlluAnnotator {
    fn annotate(&self, text: &str) -> Result<Vec<ParsedSentence>, AnnotatorError> {
        self.utterances
            .get(text.trim())
            .cloned()
            .ok_or_else(|| AnnotatorError::Missing(text.to_string()))
    }
}

#[derive(Debug, serde::Serialize)]
struct AnnotateRequest<'a> {
    text: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct AnnotateResponse {
    sentences: Vec<Vec<ParsedToken>>,
}

/// Client for a parser service (for example a Stanza pipeline behind HTTP)
///
/// The service receives `{"text": "..."}` and answers with
/// `{"sentences": [[token, ...], ...]}`, each token carrying `id`, `text`,
/// `lemma`, `upos`, `xpos`, `feats`, `head` and `deprel`.
pub struct HttpAnnotator {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpAnnotator {
    pub fn new(url: impl Into<String>) -> Result<Self, AnnotatorError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(AnnotatorError::Transport)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Annotator for HttpAnnotator {
    fn annotate(&self, text: &str) -> Result<Vec<ParsedSentence>, AnnotatorError> {
        let response = self
            .client
            .post(&self.url)
            .json(&AnnotateRequest { text })
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(AnnotatorError::Transport)?;

        let body: AnnotateResponse = response
            .json()
            .map_err(|e| AnnotatorError::Malformed(e.to_string()))?;

        if body.sentences.iter().any(|tokens| tokens.is_empty()) {
            return Err(AnnotatorError::Malformed(format!(
                "empty sentence in annotation of '{text}'"
            )));
        }

        Ok(body
            .sentences
            .into_iter()
            .map(|tokens| ParsedSentence {
                text: tokens
                    .iter()
                    .map(|token| token.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
                tokens,
            })
            .collect())
    }
}
