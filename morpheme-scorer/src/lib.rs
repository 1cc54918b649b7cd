pub mod annotate;
pub mod classify;
pub mod compact;
pub mod report;
pub mod seen;
pub mod verdict;

use transcript_utils::text_cleanup::{
    clean_for_scoring, extract_scored_lines, normalize_child_nouns,
};

pub use annotate::{Annotator, AnnotatorError, ConlluAnnotator, HttpAnnotator};
pub use classify::{AnnotatorFailurePolicy, Scorer};
pub use seen::SeenContexts;
pub use verdict::{Category, CategoryVerdict, Verdict};

/// The texts the annotator will be asked about for a transcript: each scored
/// child utterance, cleaned and noun-normalized, skipping empty ones
pub fn annotator_inputs(transcript: &str) -> Vec<String> {
    extract_scored_lines(transcript)
        .iter()
        .map(|line| clean_for_scoring(line))
        .filter(|cleaned| !cleaned.is_empty())
        .map(|cleaned| normalize_child_nouns(&cleaned))
        .collect()
}

/// Score every scored child utterance of a transcript, in order, with fresh
/// seen-context state
pub fn score_transcript<A: Annotator>(
    scorer: &Scorer<A>,
    transcript: &str,
) -> Result<Vec<Verdict>, AnnotatorError> {
    scorer.score_all(extract_scored_lines(transcript))
}
