use std::sync::LazyLock;

use regex::Regex;
use transcript_utils::text_cleanup::{NADS_MARKER, clean_for_scoring, normalize_child_nouns};
use transcript_utils::{DependencyRelation, ParsedSentence, ParsedToken, PartOfSpeech};

use crate::annotate::{Annotator, AnnotatorError};
use crate::seen::SeenContexts;
use crate::verdict::{CategoryVerdict, NOT_APPLICABLE, Verdict};

/// Determiners scored as articles
pub const ARTICLES: &[&str] = &["a", "an", "the"];

/// Contracted forms of "be" that are not scored after a pronoun subject
pub const CONTRACTED_BE: &[&str] = &["'s", "\u{2019}s"];

/// Subjects that make auxiliary use non-diagnostic
pub const EXCLUDED_SUBJECTS: &[&str] = &["that", "it", "he", "she", "they", "this", "those"];

/// Utterance-initial words that mark a question
pub const QUESTION_WORDS: &[&str] = &[
    "when", "what", "where", "who", "whom", "whose", "why", "which", "how",
];

/// Action verbs from the picture-description tasks that parsers often tag as
/// nouns in their -ing form, with their lemmas
pub const VERB_OVERRIDES: &[(&str, &str)] = &[
    ("rolling", "roll"),
    ("spilling", "spill"),
    ("closing", "close"),
    ("stopping", "stop"),
    ("moving", "move"),
    ("breaking", "break"),
    ("cooking", "cook"),
    ("turning", "turn"),
    ("drinking", "drink"),
    ("washing", "wash"),
    ("riding", "ride"),
    ("driving", "drive"),
    ("drawing", "draw"),
    ("throwing", "throw"),
    ("holding", "hold"),
    ("climbing", "climb"),
    ("building", "build"),
    ("feeding", "feed"),
    ("pulling", "pull"),
    ("chasing", "chase"),
    ("falling", "fall"),
    ("coming", "come"),
    ("going", "go"),
    ("getting", "get"),
];

pub const NOTE_NADS: &str = "NADS: non-active declarative structure";
pub const NOTE_QUESTION: &str = "Question: non-active declarative structure";
pub const NOTE_UNINTELLIGIBLE: &str = "contains unintelligible words (xxx)";
pub const NOTE_COPULAR: &str = "Excluded: true copular clause (adj/nominal/PP predicate)";
pub const NOTE_RELATIVE_CLAUSE: &str = "Excluded: true copular/relative clause";
pub const NOTE_NO_VERB: &str = "no verb or aux";

fn override_lemma(text_lower: &str) -> Option<&'static str> {
    VERB_OVERRIDES
        .iter()
        .find(|(form, _)| *form == text_lower)
        .map(|(_, lemma)| *lemma)
}

fn context(first: &str, second: &str) -> String {
    format!("({first}, {second})")
}

/// What to do when the annotator cannot process an utterance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnnotatorFailurePolicy {
    /// Stop the run with the annotator's error
    Abort,
    /// Log a warning and score the utterance as having no verb or aux
    #[default]
    Degrade,
}

/// Result of word correction
#[derive(Debug, Clone)]
pub struct CorrectionResult {
    /// Corrected copy of the sentence
    pub sentence: ParsedSentence,
    /// Description of what was corrected (if anything)
    pub corrections: Vec<String>,
}

impl CorrectionResult {
    pub fn corrected(&self) -> bool {
        !self.corrections.is_empty()
    }
}

/// Trait for rules that repair known annotator mistakes
///
/// Correctors never touch the annotator's output; they return a corrected
/// copy.
pub trait WordCorrector {
    fn correct(&self, sentence: &ParsedSentence) -> CorrectionResult;
}

/// Retags the known action verbs that were tagged NOUN as present participles
pub struct VerbOverrideCorrector;

impl WordCorrector for VerbOverrideCorrector {
    fn correct(&self, sentence: &ParsedSentence) -> CorrectionResult {
        let mut corrected = sentence.clone();
        let mut corrections = Vec::new();

        for token in &mut corrected.tokens {
            if token.pos != PartOfSpeech::Noun {
                continue;
            }
            if let Some(lemma) = override_lemma(&token.text_lower()) {
                corrections.push(format!(
                    "Retagged '{}' from NOUN to VERB/VBG ({lemma})",
                    token.text
                ));
                token.pos = PartOfSpeech::Verb;
                token.xpos = "VBG".to_string();
                token.feats = token.feats.with_participle();
                token.lemma = lemma.to_string();
            }
        }

        CorrectionResult {
            sentence: corrected,
            corrections,
        }
    }
}

/// Why an utterance is not analysed at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    /// The cleaned text carries the non-active declarative marker
    NonActiveMarker,
    /// The utterance starts with a question word
    Question,
    /// The utterance contains an unintelligible-speech token (`xxx`)
    Unintelligible,
}

static UNINTELLIGIBLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[xX]{2,}\b").unwrap());

impl FilterReason {
    /// First matching filter, checked in order: marker, question, unintelligible
    pub fn check(cleaned: &str) -> Option<Self> {
        if cleaned.contains(NADS_MARKER) {
            return Some(FilterReason::NonActiveMarker);
        }
        let lowered = cleaned.to_lowercase();
        if let Some(first) = lowered.split_whitespace().next() {
            if QUESTION_WORDS.contains(&first) {
                return Some(FilterReason::Question);
            }
        }
        if UNINTELLIGIBLE.is_match(cleaned) {
            return Some(FilterReason::Unintelligible);
        }
        None
    }

    pub fn verdict(self, utterance: &str, cleaned: &str) -> Verdict {
        match self {
            FilterReason::NonActiveMarker => Verdict::uniform(utterance, cleaned, NOTE_NADS),
            FilterReason::Question => Verdict::uniform(utterance, cleaned, NOTE_QUESTION),
            FilterReason::Unintelligible => {
                let mut verdict = Verdict::uniform(utterance, cleaned, NOT_APPLICABLE);
                verdict.active_progressive.annotate(NOTE_UNINTELLIGIBLE);
                verdict.general_progressive.annotate(NOTE_UNINTELLIGIBLE);
                verdict
            }
        }
    }
}

/// Outcome of the copular / relative-clause scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exclusion {
    /// No sentence needs excluding
    Clear,
    /// A copula was found next to an -ing word; the sentence at this index
    /// was scored as a misparsed progressive
    Recovered(usize),
    /// The utterance is a true copular clause or contains a relative clause
    Excluded(&'static str),
}

fn looks_like_participle(token: &ParsedToken) -> bool {
    token.ends_with_ing() || token.is_present_participle()
}

/// -ing verb form other than "be", as counted for the progressive
fn progressive_verb(sentence: &ParsedSentence) -> Option<&ParsedToken> {
    sentence.tokens.iter().find(|token| {
        token.is_present_participle() && token.ends_with_ing() && token.lemma_lower() != "be"
    })
}

/// Scan sentences for copular clauses, recovering misparsed progressives
fn check_copular(
    sentences: &[ParsedSentence],
    verdict: &mut Verdict,
    seen: &mut SeenContexts,
) -> Exclusion {
    for (index, sentence) in sentences.iter().enumerate() {
        let Some(root) = sentence.root() else {
            continue;
        };

        let has_relative_clause = sentence.has_relation(DependencyRelation::AclRelcl);
        let has_copula = sentence
            .children_of(root.id)
            .any(|token| token.deprel == DependencyRelation::Cop);

        if !has_copula {
            if has_relative_clause {
                return Exclusion::Excluded(NOTE_RELATIVE_CLAUSE);
            }
            continue;
        }

        if let Some(participle) = sentence.tokens.iter().find(|t| looks_like_participle(t)) {
            recover_progressive(sentence, root, participle, verdict, seen);
            return Exclusion::Recovered(index);
        }

        if has_relative_clause {
            return Exclusion::Excluded(NOTE_RELATIVE_CLAUSE);
        }

        let prepositional_predicate = sentence
            .children_of(root.id)
            .any(|token| token.pos == PartOfSpeech::Adp);
        if matches!(root.pos, PartOfSpeech::Adj | PartOfSpeech::Noun) || prepositional_predicate {
            return Exclusion::Excluded(NOTE_COPULAR);
        }
    }
    Exclusion::Clear
}

/// A copula next to an -ing word is taken to be a parser error: score the
/// -ing word as a progressive and the first determiner as an article
fn recover_progressive(
    sentence: &ParsedSentence,
    root: &ParsedToken,
    participle: &ParsedToken,
    verdict: &mut Verdict,
    seen: &mut SeenContexts,
) {
    let lemma = participle.lemma_lower();
    let productive = seen.first_progressive_use(&lemma);
    let note = if productive {
        format!("Recovered misparsed progressive: {lemma}")
    } else {
        format!("Recovered repeated progressive: {lemma}")
    };
    verdict
        .general_progressive
        .merge(CategoryVerdict::present(productive, note.clone()));
    verdict
        .active_progressive
        .merge(CategoryVerdict::present(productive, note));

    if let Some(determiner) = sentence.first_with_relation(DependencyRelation::Det) {
        let determiner = determiner.lemma_lower();
        let subject = sentence
            .first_with_relation(DependencyRelation::Nsubj)
            .unwrap_or(root)
            .lemma_lower();
        let productive = seen.first_article_use(&determiner, &subject);
        let ctx = context(&determiner, &subject);
        let note = if productive {
            format!("Recovered: first time {ctx}")
        } else {
            format!("Recovered: duplicate {ctx}")
        };
        verdict
            .article
            .merge(CategoryVerdict::present(productive, note));
    }
}

/// Fallback for utterances with no verb or auxiliary at all: look for a known
/// action verb in -ing form right after a determiner or noun
///
/// Returns whether a progressive was found.
fn forced_verb_fallback(
    sentences: &[ParsedSentence],
    verdict: &mut Verdict,
    seen: &mut SeenContexts,
) -> bool {
    for sentence in sentences {
        let tokens = &sentence.tokens;
        for (index, pair) in tokens.windows(2).enumerate() {
            let (before, ing) = (&pair[0], &pair[1]);
            if !matches!(before.pos, PartOfSpeech::Det | PartOfSpeech::Noun) {
                continue;
            }
            let Some(lemma) = override_lemma(&ing.text_lower()) else {
                continue;
            };

            let productive = seen.first_progressive_use(lemma);
            let note = if productive {
                format!("Heuristic forced verb ({lemma})")
            } else {
                format!("Heuristic forced verb repeated ({lemma})")
            };
            verdict
                .general_progressive
                .merge(CategoryVerdict::present(productive, note.clone()));
            verdict
                .active_progressive
                .merge(CategoryVerdict::present(productive, note));

            let determiner = index
                .checked_sub(1)
                .map(|i| &tokens[i])
                .filter(|det| before.pos == PartOfSpeech::Noun && det.pos == PartOfSpeech::Det);
            if let Some(determiner) = determiner {
                let (det, noun) = (determiner.lemma_lower(), before.lemma_lower());
                let productive = seen.first_article_use(&det, &noun);
                let ctx = context(&det, &noun);
                let note = if productive {
                    format!("Heuristic: first time {ctx}")
                } else {
                    format!("Heuristic: duplicate article {ctx}")
                };
                verdict
                    .article
                    .merge(CategoryVerdict::present(productive, note));
            }
            return true;
        }
    }
    false
}

/// A sentence with its subject resolved
struct SentenceView<'s> {
    sentence: &'s ParsedSentence,
    subject: Option<&'s ParsedToken>,
    passive: bool,
    auxiliary: Option<&'s ParsedToken>,
}

impl<'s> SentenceView<'s> {
    fn new(sentence: &'s ParsedSentence) -> Self {
        Self {
            sentence,
            subject: sentence
                .tokens
                .iter()
                .find(|token| token.deprel.is_subject()),
            passive: sentence
                .tokens
                .iter()
                .any(|token| token.deprel.is_passive_marker()),
            auxiliary: sentence.first_with_relation(DependencyRelation::Aux),
        }
    }
}

/// Whether a sentence rule settled the rest of the sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleOutcome {
    /// Later rules do not apply to this sentence
    Commit,
    Proceed,
}

type SentenceRule = fn(&SentenceView, &mut Verdict, &mut SeenContexts) -> RuleOutcome;

/// Per-sentence rules, in order
const SENTENCE_RULES: &[(&str, SentenceRule)] = &[
    ("general progressive", general_progressive),
    ("subjectless or passive", subjectless_or_passive),
    ("auxiliary before subject", auxiliary_before_subject),
    ("active progressive", active_progressive),
    ("subject article", subject_article),
    ("auxiliary be", auxiliary_be),
];

fn general_progressive(
    view: &SentenceView,
    verdict: &mut Verdict,
    seen: &mut SeenContexts,
) -> RuleOutcome {
    if let Some(verb) = progressive_verb(view.sentence) {
        let lemma = verb.lemma_lower();
        let productive = seen.first_progressive_use(&lemma);
        let note = if productive {
            format!("/ing combined with new verb ({lemma})")
        } else {
            format!("Lexical verb ({lemma}) repeated")
        };
        verdict
            .general_progressive
            .merge(CategoryVerdict::present(productive, note));
    }
    RuleOutcome::Proceed
}

/// Without a usable active subject, fall back to the first
/// determiner + noun + -ing verb sequence
fn subjectless_or_passive(
    view: &SentenceView,
    verdict: &mut Verdict,
    seen: &mut SeenContexts,
) -> RuleOutcome {
    if view.subject.is_some() && !view.passive {
        return RuleOutcome::Proceed;
    }

    let trigram = view.sentence.tokens.windows(3).find(|window| {
        window[0].pos == PartOfSpeech::Det
            && window[1].pos == PartOfSpeech::Noun
            && window[2].pos == PartOfSpeech::Verb
            && window[2].is_present_participle()
            && window[2].ends_with_ing()
            && window[2].lemma_lower() != "be"
    });

    if let Some(window) = trigram {
        let (det, noun, verb) = (&window[0], &window[1], &window[2]);
        let lemma = verb.lemma_lower();

        let productive = seen.first_active_progressive_use(&lemma);
        verdict.active_progressive.merge(CategoryVerdict::present(
            productive,
            trigram_note(productive, &lemma),
        ));

        let productive = seen.first_progressive_use(&lemma);
        verdict.general_progressive.merge(CategoryVerdict::present(
            productive,
            trigram_note(productive, &lemma),
        ));

        let (det, noun) = (det.lemma_lower(), noun.lemma_lower());
        let productive = seen.first_article_use(&det, &noun);
        let ctx = context(&det, &noun);
        let note = if productive {
            format!("Heuristic: first time {ctx}")
        } else {
            format!("Heuristic: duplicate {ctx}")
        };
        verdict
            .article
            .merge(CategoryVerdict::present(productive, note));
    }

    RuleOutcome::Commit
}

fn trigram_note(productive: bool, lemma: &str) -> String {
    if productive {
        format!("Heuristic: DET+NOUN+VBG new verb ({lemma})")
    } else {
        format!("Heuristic: DET+NOUN+VBG repeated ({lemma})")
    }
}

/// Auxiliary-first word order is not a simple active declarative
fn auxiliary_before_subject(
    view: &SentenceView,
    _verdict: &mut Verdict,
    _seen: &mut SeenContexts,
) -> RuleOutcome {
    match (view.auxiliary, view.subject) {
        (Some(auxiliary), Some(subject)) if auxiliary.id < subject.id => RuleOutcome::Commit,
        _ => RuleOutcome::Proceed,
    }
}

fn active_progressive(
    view: &SentenceView,
    verdict: &mut Verdict,
    seen: &mut SeenContexts,
) -> RuleOutcome {
    if let Some(verb) = progressive_verb(view.sentence) {
        let lemma = verb.lemma_lower();
        let productive = seen.first_active_progressive_use(&lemma);
        let note = if productive {
            format!("/ing in active declarative with new verb ({lemma})")
        } else {
            format!("/ing in active declarative repeated verb ({lemma})")
        };
        verdict
            .active_progressive
            .merge(CategoryVerdict::present(productive, note));
    }
    RuleOutcome::Proceed
}

/// The determiner attached to the subject
fn subject_article(
    view: &SentenceView,
    verdict: &mut Verdict,
    seen: &mut SeenContexts,
) -> RuleOutcome {
    let Some(subject) = view.subject else {
        return RuleOutcome::Proceed;
    };
    let determiner = view
        .sentence
        .children_of(subject.id)
        .find(|token| token.deprel == DependencyRelation::Det);

    if let Some(determiner) = determiner {
        let det = determiner.lemma_lower();
        let finding = if ARTICLES.contains(&det.as_str()) {
            let noun = subject.lemma_lower();
            let productive = seen.first_article_use(&det, &noun);
            let ctx = context(&det, &noun);
            let note = if productive {
                format!("First time {ctx} used")
            } else {
                format!("Duplicate article context {ctx}")
            };
            CategoryVerdict::present(productive, note)
        } else {
            CategoryVerdict::present(false, format!("Determiner ({det}) is not an article"))
        };
        verdict.article.merge(finding);
    }
    RuleOutcome::Proceed
}

/// Forms of "be" used as auxiliary or copula, in the subject's context
fn auxiliary_be(
    view: &SentenceView,
    verdict: &mut Verdict,
    seen: &mut SeenContexts,
) -> RuleOutcome {
    let Some(subject) = view.subject else {
        return RuleOutcome::Proceed;
    };
    let subject_lemma = subject.lemma_lower();

    let candidates = view.sentence.tokens.iter().filter(|token| {
        token.lemma_lower() == "be"
            && matches!(
                token.deprel,
                DependencyRelation::Aux | DependencyRelation::Cop
            )
    });

    for be in candidates {
        let form = be.text_lower();
        if CONTRACTED_BE.contains(&form.as_str()) && subject.pos == PartOfSpeech::Pron {
            continue;
        }
        if EXCLUDED_SUBJECTS.contains(&subject_lemma.as_str()) {
            verdict
                .auxiliary
                .annotate(format!("Aux on excluded subject ({subject_lemma})"));
            break;
        }

        let productive = seen.first_aux_use(&form, &subject_lemma);
        let ctx = context(&form, &subject_lemma);
        let note = if productive {
            format!("New aux context {ctx}")
        } else {
            format!("Duplicate aux context {ctx}")
        };
        verdict
            .auxiliary
            .merge(CategoryVerdict::present(productive, note));
        break;
    }
    RuleOutcome::Proceed
}

fn classify_sentence(sentence: &ParsedSentence, verdict: &mut Verdict, seen: &mut SeenContexts) {
    let view = SentenceView::new(sentence);
    for (name, rule) in SENTENCE_RULES {
        if rule(&view, verdict, seen) == RuleOutcome::Commit {
            log::debug!("'{}': rule '{name}' settled the sentence", sentence.text);
            break;
        }
    }
}

static LEADING_AND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*and\s+").unwrap());
static LEADING_ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(a|an|the)\s+([A-Za-z]+)").unwrap());

/// Surface match of an utterance-initial article when parsing found none
fn article_fallback(cleaned: &str, verdict: &mut Verdict, seen: &mut SeenContexts) {
    if verdict.article.exists() {
        return;
    }
    let text = LEADING_AND.replace(cleaned, "");
    let Some(captures) = LEADING_ARTICLE.captures(&text) else {
        return;
    };
    let det = captures[1].to_lowercase();
    let noun = captures[2].to_lowercase();

    let productive = seen.first_article_use(&det, &noun);
    let ctx = context(&det, &noun);
    let note = if productive {
        format!("First time {ctx} used")
    } else {
        format!("Duplicate article context {ctx}")
    };
    verdict
        .article
        .merge(CategoryVerdict::present(productive, note));
}

/// Scores utterances for article, auxiliary and progressive productivity
///
/// Productivity depends on what came before, so utterances must be scored in
/// corpus order against a single [`SeenContexts`].
pub struct Scorer<A> {
    annotator: A,
    corrector: Box<dyn WordCorrector>,
    failure_policy: AnnotatorFailurePolicy,
}

impl<A: Annotator> Scorer<A> {
    pub fn new(annotator: A) -> Self {
        Self {
            annotator,
            corrector: Box::new(VerbOverrideCorrector),
            failure_policy: AnnotatorFailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: AnnotatorFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_corrector(mut self, corrector: Box<dyn WordCorrector>) -> Self {
        self.corrector = corrector;
        self
    }

    /// Clean and score one raw utterance
    ///
    /// Returns `None` for utterances that are empty after cleaning.
    pub fn score_utterance(
        &self,
        raw: &str,
        seen: &mut SeenContexts,
    ) -> Result<Option<Verdict>, AnnotatorError> {
        let utterance = raw.trim();
        let cleaned = clean_for_scoring(utterance);
        if cleaned.is_empty() {
            log::debug!("Skipping '{utterance}': empty after cleaning");
            return Ok(None);
        }
        let cleaned = normalize_child_nouns(&cleaned);
        self.classify(utterance, &cleaned, seen).map(Some)
    }

    /// Score a whole corpus in order with fresh seen-context state
    pub fn score_all<I, S>(&self, utterances: I) -> Result<Vec<Verdict>, AnnotatorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = SeenContexts::new();
        self.score_corpus(utterances, &mut seen)
    }

    /// Score utterances in order, continuing from `seen`
    pub fn score_corpus<I, S>(
        &self,
        utterances: I,
        seen: &mut SeenContexts,
    ) -> Result<Vec<Verdict>, AnnotatorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut verdicts = Vec::new();
        for utterance in utterances {
            if let Some(verdict) = self.score_utterance(utterance.as_ref(), seen)? {
                verdicts.push(verdict);
            }
        }
        Ok(verdicts)
    }

    /// Classify an already cleaned utterance
    ///
    /// Stages run in order and the first one that settles the verdict ends
    /// the analysis: filters, copular exclusion (with progressive recovery),
    /// verb presence (with the forced-verb fallback), per-sentence rules, and
    /// finally the surface article fallback.
    pub fn classify(
        &self,
        utterance: &str,
        cleaned: &str,
        seen: &mut SeenContexts,
    ) -> Result<Verdict, AnnotatorError> {
        if let Some(reason) = FilterReason::check(cleaned) {
            log::debug!("'{cleaned}': filtered ({reason:?})");
            return Ok(reason.verdict(utterance, cleaned));
        }

        let sentences = match self.annotator.annotate(cleaned) {
            Ok(sentences) => sentences,
            Err(e) => match self.failure_policy {
                AnnotatorFailurePolicy::Abort => return Err(e),
                AnnotatorFailurePolicy::Degrade => {
                    log::warn!("Annotator failed on '{cleaned}', scoring as no verb: {e}");
                    return Ok(Verdict::uniform(utterance, cleaned, NOTE_NO_VERB));
                }
            },
        };

        let mut verdict = Verdict::uniform(utterance, cleaned, NOT_APPLICABLE);

        let recovered = match check_copular(&sentences, &mut verdict, seen) {
            Exclusion::Excluded(note) => {
                log::debug!("'{cleaned}': {note}");
                return Ok(Verdict::uniform(utterance, cleaned, note));
            }
            Exclusion::Recovered(index) => Some(index),
            Exclusion::Clear => None,
        };

        let corrected: Vec<ParsedSentence> = sentences
            .iter()
            .map(|sentence| {
                let result = self.corrector.correct(sentence);
                if result.corrected() {
                    log::debug!("'{cleaned}': {}", result.corrections.join("; "));
                }
                result.sentence
            })
            .collect();

        let has_verb = corrected
            .iter()
            .flat_map(|sentence| &sentence.tokens)
            .any(ParsedToken::is_verb_or_aux);

        if recovered.is_none() && !has_verb {
            if !forced_verb_fallback(&corrected, &mut verdict, seen) {
                return Ok(Verdict::uniform(utterance, cleaned, NOTE_NO_VERB));
            }
        } else {
            for (index, sentence) in corrected.iter().enumerate() {
                if Some(index) == recovered {
                    continue;
                }
                classify_sentence(sentence, &mut verdict, seen);
            }
        }

        article_fallback(cleaned, &mut verdict, seen);
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::ConlluAnnotator;
    use crate::verdict::Category;
    use transcript_utils::Features;

    const FIXTURE: &str = "\
# text = the dog is running .
1 the the DET DT _ 2 det _ _
2 dog dog NOUN NN _ 4 nsubj _ _
3 is be AUX VBZ _ 4 aux _ _
4 running run VERB VBG VerbForm=Part 0 root _ _
5 . . PUNCT . _ 4 punct _ _

# text = a cat is running .
1 a a DET DT _ 2 det _ _
2 cat cat NOUN NN _ 4 nsubj _ _
3 is be AUX VBZ _ 4 aux _ _
4 running run VERB VBG VerbForm=Part 0 root _ _
5 . . PUNCT . _ 4 punct _ _

# text = the ball is red .
1 the the DET DT _ 2 det _ _
2 ball ball NOUN NN _ 4 nsubj _ _
3 is be AUX VBZ _ 4 cop _ _
4 red red ADJ JJ _ 0 root _ _
5 . . PUNCT . _ 4 punct _ _

# text = the dog is sleeping .
1 the the DET DT _ 2 det _ _
2 dog dog NOUN NN _ 4 nsubj _ _
3 is be AUX VBZ _ 4 cop _ _
4 sleeping sleeping ADJ JJ _ 0 root _ _
5 . . PUNCT . _ 4 punct _ _

# text = the boy rolling .
1 the the DET DT _ 3 det _ _
2 boy boy NOUN NN _ 3 compound _ _
3 rolling rolling NOUN NN _ 0 root _ _
4 . . PUNCT . _ 3 punct _ _

# text = the ball rolling
1 the the DET DT _ 2 det _ _
2 ball ball NOUN NN _ 0 root _ _
3 rolling rolling ADJ JJ _ 2 amod _ _

# text = he is eating .
1 he he PRON PRP _ 3 nsubj _ _
2 is be AUX VBZ _ 3 aux _ _
3 eating eat VERB VBG VerbForm=Part 0 root _ _
4 . . PUNCT . _ 3 punct _ _

# text = the frog .
1 the the DET DT _ 2 det _ _
2 frog frog NOUN NN _ 0 root _ _
3 . . PUNCT . _ 2 punct _ _

# text = the boy who runs is tall .
1 the the DET DT _ 2 det _ _
2 boy boy NOUN NN _ 6 nsubj _ _
3 who who PRON WP _ 4 nsubj _ _
4 runs run VERB VBZ _ 2 acl:relcl _ _
5 is be AUX VBZ _ 6 cop _ _
6 tall tall ADJ JJ _ 0 root _ _
7 . . PUNCT . _ 6 punct _ _

# text = the dog that barks is running .
1 the the DET DT _ 2 det _ _
2 dog dog NOUN NN _ 6 nsubj _ _
3 that that PRON WDT _ 4 nsubj _ _
4 barks bark VERB VBZ _ 2 acl:relcl _ _
5 is be AUX VBZ _ 6 aux _ _
6 running run VERB VBG VerbForm=Part 0 root _ _
7 . . PUNCT . _ 6 punct _ _

# text = the dog is a puppy .
1 the the DET DT _ 2 det _ _
2 dog dog NOUN NN _ 5 nsubj _ _
3 is be AUX VBZ _ 5 cop _ _
4 a a DET DT _ 5 det _ _
5 puppy puppy NOUN NN _ 0 root _ _
6 . . PUNCT . _ 5 punct _ _

# text = the ball is in the box .
1 the the DET DT _ 2 det _ _
2 ball ball NOUN NN _ 6 nsubj _ _
3 is be AUX VBZ _ 6 cop _ _
4 in in ADP IN _ 6 case _ _
5 the the DET DT _ 6 det _ _
6 box box NOUN NN _ 0 root _ _
7 . . PUNCT . _ 6 punct _ _

# text = the cat is in here .
1 the the DET DT _ 2 det _ _
2 cat cat NOUN NN _ 5 nsubj _ _
3 is be AUX VBZ _ 5 cop _ _
4 in in ADP IN _ 5 case _ _
5 here here ADV RB _ 0 root _ _
6 . . PUNCT . _ 5 punct _ _

# text = the boy was pushed by a dog running .
1 the the DET DT _ 2 det _ _
2 boy boy NOUN NN _ 4 nsubj:pass _ _
3 was be AUX VBD _ 4 aux:pass _ _
4 pushed push VERB VBN VerbForm=Part 0 root _ _
5 by by ADP IN _ 7 case _ _
6 a a DET DT _ 7 det _ _
7 dog dog NOUN NN _ 4 obl:agent _ _
8 running run VERB VBG VerbForm=Part 7 acl _ _
9 . . PUNCT . _ 4 punct _ _

# text = the dog is running and the cat was chased .
1 the the DET DT _ 2 det _ _
2 dog dog NOUN NN _ 4 nsubj _ _
3 is be AUX VBZ _ 4 aux _ _
4 running run VERB VBG VerbForm=Part 0 root _ _
5 and and CCONJ CC _ 9 cc _ _
6 the the DET DT _ 7 det _ _
7 cat cat NOUN NN _ 9 nsubj:pass _ _
8 was be AUX VBD _ 9 aux:pass _ _
9 chased chase VERB VBN VerbForm=Part 4 conj _ _
10 . . PUNCT . _ 4 punct _ _

# text = is the dog running ?
1 is be AUX VBZ _ 4 aux _ _
2 the the DET DT _ 3 det _ _
3 dog dog NOUN NN _ 4 nsubj _ _
4 running run VERB VBG VerbForm=Part 0 root _ _
5 ? ? PUNCT . _ 4 punct _ _

# text = he 's running .
1 he he PRON PRP _ 3 nsubj _ _
2 's be AUX VBZ _ 3 aux _ _
3 running run VERB VBG VerbForm=Part 0 root _ _
4 . . PUNCT . _ 3 punct _ _

# text = this dog is running .
1 this this DET DT _ 2 det _ _
2 dog dog NOUN NN _ 4 nsubj _ _
3 is be AUX VBZ _ 4 aux _ _
4 running run VERB VBG VerbForm=Part 0 root _ _
5 . . PUNCT . _ 4 punct _ _
";

    fn scorer() -> Scorer<ConlluAnnotator> {
        Scorer::new(ConlluAnnotator::from_conllu(FIXTURE).unwrap())
    }

    fn score(scorer: &Scorer<ConlluAnnotator>, seen: &mut SeenContexts, raw: &str) -> Verdict {
        scorer.score_utterance(raw, seen).unwrap().unwrap()
    }

    fn token(id: usize, text: &str, lemma: &str, pos: PartOfSpeech) -> ParsedToken {
        ParsedToken {
            id,
            text: text.to_string(),
            lemma: lemma.to_string(),
            pos,
            xpos: String::new(),
            feats: Features::default(),
            head: 0,
            deprel: DependencyRelation::Dep,
        }
    }

    #[test]
    fn test_verb_override_corrector_copies() {
        let sentence = ParsedSentence {
            text: "the ball rolling".to_string(),
            tokens: vec![
                token(1, "the", "the", PartOfSpeech::Det),
                token(2, "ball", "ball", PartOfSpeech::Noun),
                token(3, "Rolling", "rolling", PartOfSpeech::Noun),
            ],
        };

        let result = VerbOverrideCorrector.correct(&sentence);

        assert!(result.corrected());
        assert_eq!(result.corrections.len(), 1);
        let rolling = &result.sentence.tokens[2];
        assert_eq!(rolling.pos, PartOfSpeech::Verb);
        assert_eq!(rolling.xpos, "VBG");
        assert_eq!(rolling.lemma, "roll");
        assert!(rolling.feats.is_participle());
        // the annotator's sentence is left alone
        assert_eq!(sentence.tokens[2].pos, PartOfSpeech::Noun);
        assert_eq!(result.sentence.tokens[1].pos, PartOfSpeech::Noun);
    }

    #[test]
    fn test_filters_in_order() {
        assert_eq!(
            FilterReason::check("what NADS"),
            Some(FilterReason::NonActiveMarker)
        );
        assert_eq!(
            FilterReason::check("Where xxx is it ?"),
            Some(FilterReason::Question)
        );
        assert_eq!(
            FilterReason::check("the XX is running ."),
            Some(FilterReason::Unintelligible)
        );
        assert_eq!(FilterReason::check("the box is running ."), None);
        assert_eq!(FilterReason::check("whatever is running ."), None);
    }

    #[test]
    fn test_unintelligible_notes() {
        let verdict = FilterReason::Unintelligible.verdict("xxx .", "xxx .");
        assert_eq!(verdict.article.note(), NOT_APPLICABLE);
        assert_eq!(verdict.auxiliary.note(), NOT_APPLICABLE);
        assert_eq!(verdict.general_progressive.note(), NOTE_UNINTELLIGIBLE);
        assert_eq!(verdict.active_progressive.note(), NOTE_UNINTELLIGIBLE);
    }

    #[test]
    fn test_article_fallback() {
        let mut seen = SeenContexts::new();
        let mut verdict = Verdict::uniform("", "", NOT_APPLICABLE);
        article_fallback("And the Frog .", &mut verdict, &mut seen);
        assert!(verdict.article.productive());
        assert_eq!(verdict.article.note(), "First time (the, frog) used");

        let mut verdict = Verdict::uniform("", "", NOT_APPLICABLE);
        article_fallback("the frog", &mut verdict, &mut seen);
        assert!(verdict.article.exists());
        assert!(!verdict.article.productive());

        let mut verdict = Verdict::uniform("", "", NOT_APPLICABLE);
        article_fallback("then the frog", &mut verdict, &mut seen);
        assert!(!verdict.article.exists());
    }

    #[test]
    fn test_first_and_repeated_use() {
        let scorer = scorer();
        let mut seen = SeenContexts::new();

        let first = score(&scorer, &mut seen, "the dog is running . [+ rr]");
        assert_eq!(first.utterance, "the dog is running . [+ rr]");
        assert_eq!(first.cleaned, "the dog is running .");
        for category in Category::ALL {
            let category = first.category(category);
            assert!(category.exists());
            assert!(category.productive());
        }
        assert_eq!(first.article.note(), "First time (the, dog) used");
        assert_eq!(first.auxiliary.note(), "New aux context (is, dog)");
        assert_eq!(
            first.general_progressive.note(),
            "/ing combined with new verb (run)"
        );

        let second = score(&scorer, &mut seen, "a cat is running .");
        assert!(second.article.productive());
        assert!(second.auxiliary.productive());
        assert!(second.general_progressive.exists());
        assert!(!second.general_progressive.productive());
        assert_eq!(
            second.active_progressive.note(),
            "/ing in active declarative repeated verb (run)"
        );

        let repeat = score(&scorer, &mut seen, "the dog is running .");
        for category in Category::ALL {
            assert!(repeat.category(category).exists());
            assert!(!repeat.category(category).productive());
        }
        assert_eq!(repeat.auxiliary.note(), "Duplicate aux context (is, dog)");
    }

    #[test]
    fn test_filtered_utterances_skip_the_annotator() {
        let scorer = scorer().with_failure_policy(AnnotatorFailurePolicy::Abort);
        let mut seen = SeenContexts::new();

        let question = score(&scorer, &mut seen, "what is he doing ?");
        assert_eq!(
            question,
            Verdict::uniform("what is he doing ?", "what is he doing ?", NOTE_QUESTION)
        );

        let unintelligible = score(&scorer, &mut seen, "xxx is running .");
        assert_eq!(unintelligible.general_progressive.note(), NOTE_UNINTELLIGIBLE);
        assert_eq!(unintelligible.article.note(), NOT_APPLICABLE);

        let nads = score(&scorer, &mut seen, "he isp@x going .");
        assert_eq!(nads.auxiliary.note(), NOTE_NADS);
        assert_eq!(seen.sizes(), [0, 0, 0, 0]);
    }

    #[test]
    fn test_true_copular_clause_is_excluded() {
        let scorer = scorer();
        let mut seen = SeenContexts::new();
        let verdict = score(&scorer, &mut seen, "the ball is red .");
        assert_eq!(
            verdict,
            Verdict::uniform("the ball is red .", "the ball is red .", NOTE_COPULAR)
        );
        assert_eq!(seen.sizes(), [0, 0, 0, 0]);
    }

    #[test]
    fn test_relative_clause_is_excluded() {
        let scorer = scorer();
        let mut seen = SeenContexts::new();
        for raw in [
            "the boy who runs is tall .",
            "the dog that barks is running .",
        ] {
            let verdict = score(&scorer, &mut seen, raw);
            assert_eq!(verdict, Verdict::uniform(raw, raw, NOTE_RELATIVE_CLAUSE));
        }
        assert_eq!(seen.sizes(), [0, 0, 0, 0]);
    }

    #[test]
    fn test_nominal_and_prepositional_predicates_are_excluded() {
        let scorer = scorer();
        let mut seen = SeenContexts::new();
        for raw in [
            "the dog is a puppy .",
            "the ball is in the box .",
            "the cat is in here .",
        ] {
            let verdict = score(&scorer, &mut seen, raw);
            assert_eq!(verdict, Verdict::uniform(raw, raw, NOTE_COPULAR));
        }
        assert_eq!(seen.sizes(), [0, 0, 0, 0]);
    }

    #[test]
    fn test_misparsed_progressive_is_recovered() {
        let scorer = scorer();
        let mut seen = SeenContexts::new();
        let verdict = score(&scorer, &mut seen, "the dog is sleeping .");

        assert!(verdict.general_progressive.productive());
        assert!(verdict.active_progressive.productive());
        assert_eq!(
            verdict.general_progressive.note(),
            "Recovered misparsed progressive: sleeping"
        );
        assert_eq!(verdict.article.note(), "Recovered: first time (the, dog)");
        assert!(!verdict.auxiliary.exists());
        assert_eq!(seen.active_progressive_lemmas().count(), 0);
    }

    #[test]
    fn test_retagged_verb_uses_trigram_without_subject() {
        let scorer = scorer();
        let mut seen = SeenContexts::new();
        let verdict = score(&scorer, &mut seen, "the boy rolling .");

        assert!(verdict.active_progressive.productive());
        assert!(verdict.general_progressive.productive());
        assert_eq!(
            verdict.active_progressive.note(),
            "Heuristic: DET+NOUN+VBG new verb (roll)"
        );
        assert_eq!(verdict.article.note(), "Heuristic: first time (the, boy)");
        assert!(!verdict.auxiliary.exists());
    }

    #[test]
    fn test_passive_uses_trigram() {
        let scorer = scorer();
        let mut seen = SeenContexts::new();
        let verdict = score(&scorer, &mut seen, "the boy was pushed by a dog running .");

        assert!(verdict.active_progressive.productive());
        assert_eq!(
            verdict.active_progressive.note(),
            "Heuristic: DET+NOUN+VBG new verb (run)"
        );
        assert!(verdict.general_progressive.productive());
        assert_eq!(verdict.article.note(), "Heuristic: first time (a, dog)");
        assert!(!verdict.auxiliary.exists());
        assert_eq!(verdict.auxiliary.note(), NOT_APPLICABLE);
        assert_eq!(seen.sizes(), [1, 0, 1, 1]);
    }

    #[test]
    fn test_passive_sentence_skips_active_rules() {
        let scorer = scorer();
        let mut seen = SeenContexts::new();
        let verdict = score(
            &scorer,
            &mut seen,
            "the dog is running and the cat was chased .",
        );

        // an active subject alongside a passive marker still takes the
        // trigram path, which finds nothing here
        assert!(verdict.general_progressive.productive());
        assert!(!verdict.active_progressive.exists());
        assert!(!verdict.auxiliary.exists());
        assert_eq!(verdict.article.note(), "First time (the, dog) used");
        assert_eq!(seen.sizes(), [1, 0, 1, 0]);
    }

    #[test]
    fn test_auxiliary_before_subject_is_not_active() {
        let scorer = scorer();
        let mut seen = SeenContexts::new();
        let verdict = score(&scorer, &mut seen, "is the dog running ?");

        assert!(verdict.general_progressive.productive());
        assert_eq!(
            verdict.general_progressive.note(),
            "/ing combined with new verb (run)"
        );
        assert!(!verdict.active_progressive.exists());
        assert!(!verdict.auxiliary.exists());
        assert!(!verdict.article.exists());
        assert_eq!(seen.sizes(), [0, 0, 1, 0]);
    }

    #[test]
    fn test_contracted_be_after_pronoun_is_skipped() {
        let scorer = scorer();
        let mut seen = SeenContexts::new();
        let verdict = score(&scorer, &mut seen, "he 's running .");

        assert!(!verdict.auxiliary.exists());
        assert_eq!(verdict.auxiliary.note(), NOT_APPLICABLE);
        assert!(verdict.active_progressive.productive());
        assert_eq!(seen.sizes(), [0, 0, 1, 1]);
    }

    #[test]
    fn test_non_article_determiner_on_subject() {
        let scorer = scorer();
        let mut seen = SeenContexts::new();
        let verdict = score(&scorer, &mut seen, "this dog is running .");

        assert!(verdict.article.exists());
        assert!(!verdict.article.productive());
        assert_eq!(verdict.article.note(), "Determiner (this) is not an article");
        assert_eq!(verdict.auxiliary.note(), "New aux context (is, dog)");
        assert_eq!(seen.articles().count(), 0);
    }

    #[test]
    fn test_forced_verb_without_any_verb() {
        let scorer = scorer();
        let mut seen = SeenContexts::new();
        let verdict = score(&scorer, &mut seen, "the ball rolling");

        assert!(verdict.general_progressive.productive());
        assert_eq!(verdict.general_progressive.note(), "Heuristic forced verb (roll)");
        assert_eq!(verdict.article.note(), "Heuristic: first time (the, ball)");

        let repeated = score(&scorer, &mut seen, "the ball rolling");
        assert!(repeated.general_progressive.exists());
        assert!(!repeated.general_progressive.productive());
        assert!(!repeated.article.productive());
    }

    #[test]
    fn test_no_verb_falls_back_to_uniform_note() {
        let scorer = scorer();
        let mut seen = SeenContexts::new();
        let verdict = score(&scorer, &mut seen, "the frog .");
        assert_eq!(verdict, Verdict::uniform("the frog .", "the frog .", NOTE_NO_VERB));
    }

    #[test]
    fn test_auxiliary_on_excluded_subject() {
        let scorer = scorer();
        let mut seen = SeenContexts::new();
        let verdict = score(&scorer, &mut seen, "he is eating .");

        assert!(!verdict.auxiliary.exists());
        assert_eq!(verdict.auxiliary.note(), "Aux on excluded subject (he)");
        assert!(verdict.active_progressive.productive());
        assert!(!verdict.article.exists());
    }

    struct Untouched;

    impl WordCorrector for Untouched {
        fn correct(&self, sentence: &ParsedSentence) -> CorrectionResult {
            CorrectionResult {
                sentence: sentence.clone(),
                corrections: Vec::new(),
            }
        }
    }

    #[test]
    fn test_without_retagging_the_forced_verb_fallback_applies() {
        let scorer = scorer().with_corrector(Box::new(Untouched));
        let mut seen = SeenContexts::new();
        let verdict = score(&scorer, &mut seen, "the boy rolling .");

        assert!(verdict.general_progressive.productive());
        assert_eq!(verdict.general_progressive.note(), "Heuristic forced verb (roll)");
        assert_eq!(verdict.article.note(), "Heuristic: first time (the, boy)");
    }

    #[test]
    fn test_annotator_failure_policy() {
        let mut seen = SeenContexts::new();
        let degraded = score(&scorer(), &mut seen, "nobody annotated this");
        assert_eq!(degraded.article.note(), NOTE_NO_VERB);

        let aborting = scorer().with_failure_policy(AnnotatorFailurePolicy::Abort);
        assert!(matches!(
            aborting.score_utterance("nobody annotated this", &mut seen),
            Err(AnnotatorError::Missing(_))
        ));
    }

    #[test]
    fn test_empty_after_cleaning_is_skipped() {
        let mut seen = SeenContexts::new();
        assert_eq!(scorer().score_utterance("(um) [+ rr]", &mut seen).unwrap(), None);
    }

    #[test]
    fn test_corpus_scoring_is_deterministic() {
        let corpus = [
            "the dog is running .",
            "the ball is red .",
            "a cat is running .",
            "the boy rolling .",
            "the dog is running .",
            "the frog .",
        ];
        let scorer = scorer();
        let first = scorer.score_all(corpus).unwrap();
        let second = scorer.score_all(corpus).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), corpus.len());

        for verdict in &first {
            for category in Category::ALL {
                let category = verdict.category(category);
                assert!(!category.productive() || category.exists());
            }
        }
    }

    #[test]
    fn test_seen_sets_only_grow() {
        let scorer = scorer();
        let mut seen = SeenContexts::new();
        let mut previous = seen.sizes();
        for raw in [
            "the dog is running .",
            "the boy rolling .",
            "the ball is red .",
            "the dog is running .",
            "the ball rolling",
        ] {
            score(&scorer, &mut seen, raw);
            let sizes = seen.sizes();
            assert!(sizes.iter().zip(previous).all(|(now, before)| *now >= before));
            previous = sizes;
        }
    }
}
