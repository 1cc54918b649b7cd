//! CHAT transcript cleanup utilities
//!
//! This module isolates the child utterances selected for scoring and strips
//! CHAT transcription codes from them, leaving plain text a dependency parser
//! can handle.

use regex::{NoExpand, Regex};
use std::sync::LazyLock;

/// Stand-in word for the `isp@x` code, which marks a non-active declarative
/// structure; the scorer looks for it verbatim.
pub const NADS_MARKER: &str = "NADS";

static CHILD_TURN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\*CHI:\s*(.*)").unwrap());
static SCORE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\s*\+\s*rr\s*\]").unwrap());
static SCORE_CODE_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[\s*\+\s*rr\s*\]\s*$").unwrap());

/// Extract the child turns carrying the `[+ rr]` scoring code
///
/// A `*CHI:` line opens a turn; lines starting with a space or tab continue
/// it. The turn is emitted as soon as a line of it carries the code, or when
/// the code stands alone on the line right after the turn. Any other line
/// abandons the pending turn.
pub fn extract_scored_lines(transcript: &str) -> Vec<String> {
    let mut extracted = Vec::new();
    let mut turn: Vec<String> = Vec::new();
    let mut in_child_turn = false;

    for line in transcript.lines() {
        if let Some(captures) = CHILD_TURN.captures(line) {
            in_child_turn = true;
            turn = vec![captures[1].trim().to_string()];
            if SCORE_CODE.is_match(line) {
                extracted.push(turn.join(" "));
                in_child_turn = false;
            }
        } else if in_child_turn && (line.starts_with(' ') || line.starts_with('\t')) {
            turn.push(line.trim().to_string());
            if SCORE_CODE.is_match(line) {
                extracted.push(turn.join(" "));
                in_child_turn = false;
            }
        } else if SCORE_CODE_ONLY.is_match(line) {
            if in_child_turn {
                extracted.push(turn.join(" "));
                in_child_turn = false;
            }
        } else {
            in_child_turn = false;
            turn.clear();
        }
    }

    extracted
}

/// Replace typographic apostrophes (and their UTF-8-read-as-CP1252 mojibake)
/// with the ASCII apostrophe
fn normalize_apostrophes(text: &str) -> String {
    text.replace("â€™", "'")
        .chars()
        .map(|c| match c {
            // ' (U+2018), ' (U+2019), ‛ (U+201B), ′ (U+2032), ＇ (U+FF07), ʼ (U+02BC), `
            '\u{2018}' | '\u{2019}' | '\u{201B}' | '\u{2032}' | '\u{FF07}' | '\u{02BC}' | '`' => {
                '\''
            }
            _ => c,
        })
        .collect()
}

/// Codes removed outright, in order
static DROPPED_CODES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b0aux\b",
        r"(?i)&\+t",
        r"(?i)&\+s",
        r"(?i)\b0p\b",
        r"(?i)\[\+\s*rr\]",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static NADS_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bisp@x\b").unwrap());
static SPECIAL_FORM_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\w)[\$@]\w+").unwrap());
static ANGLE_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static TARGET_REPLACEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\w+)\s*\[\s*:\s*([^\]]+)\]").unwrap());
static BRACKET_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static PAREN_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());
static CONTRACTED_PROGRESSIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z]+)'s\s+([a-zA-Z]+ing)\b").unwrap());
static IT_IS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bit is\b").unwrap());
static DISALLOWED_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s\.\?!']").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Clean one extracted utterance for scoring
///
/// - `isp@x` becomes the [`NADS_MARKER`]
/// - omission and filler codes (`0aux`, `0p`, `&+t`, `&+s`) and the scoring
///   code itself are removed
/// - `@`/`$` special-form suffixes, `<...>` spans, `[...]` annotations and
///   `(...)` spans are removed
/// - `word [: target]` keeps the word, then swaps in the target at the end
/// - `X's Ving` is expanded to `X is Ving`
/// - punctuation other than `. ? ! '` is dropped and whitespace collapsed
pub fn clean_for_scoring(raw: &str) -> String {
    let mut text = NADS_CODE.replace_all(raw, NADS_MARKER).into_owned();
    for code in DROPPED_CODES.iter() {
        text = code.replace_all(&text, "").into_owned();
    }
    text = normalize_apostrophes(&text);

    text = SPECIAL_FORM_SUFFIX.replace_all(&text, "${1}").into_owned();
    text = ANGLE_SPAN.replace_all(&text, "").into_owned();

    // later targets for the same word win, but the first position is kept
    let mut replacements: Vec<(String, String)> = Vec::new();
    text = TARGET_REPLACEMENT
        .replace_all(&text, |captures: &regex::Captures| {
            let word = captures[1].to_string();
            let target = captures[2].trim().to_string();
            match replacements.iter_mut().find(|(original, _)| *original == word) {
                Some((_, existing)) => *existing = target,
                None => replacements.push((word.clone(), target)),
            }
            word
        })
        .into_owned();

    text = BRACKET_SPAN.replace_all(&text, "").into_owned();
    text = PAREN_SPAN.replace_all(&text, "").into_owned();
    text = CONTRACTED_PROGRESSIVE
        .replace_all(&text, "${1} is ${2}")
        .into_owned();
    text = IT_IS.replace_all(&text, "its").into_owned();
    text = DISALLOWED_CHARS.replace_all(&text, "").into_owned();
    text = WHITESPACE_RUN.replace_all(&text, " ").trim().to_string();

    for (original, target) in &replacements {
        let pattern = format!(r"\b{}\b", regex::escape(original));
        if let Ok(word) = Regex::new(&pattern) {
            text = word.replace_all(&text, NoExpand(target)).into_owned();
        }
    }

    text
}

/// Child-register nouns and their standard forms
const CHILD_NOUNS: &[(&str, &str)] = &[
    ("horsie", "horse"),
    ("doggie", "dog"),
    ("kitty", "cat"),
    ("bunny", "rabbit"),
    ("birdie", "bird"),
    ("piggie", "pig"),
    ("truckie", "truck"),
    ("mommy", "mom"),
    ("daddy", "dad"),
    ("grandma", "grandmother"),
    ("grandpa", "grandfather"),
];

static CHILD_NOUN_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    CHILD_NOUNS
        .iter()
        .map(|(informal, standard)| {
            let pattern = format!(r"(?i)\b{informal}\b");
            (Regex::new(&pattern).unwrap(), *standard)
        })
        .collect()
});

/// Expand child-register nouns so the parser tags and lemmatizes them like
/// their standard forms
pub fn normalize_child_nouns(cleaned: &str) -> String {
    let mut text = cleaned.to_string();
    for (pattern, standard) in CHILD_NOUN_PATTERNS.iter() {
        text = pattern.replace_all(&text, *standard).into_owned();
    }
    text
}
