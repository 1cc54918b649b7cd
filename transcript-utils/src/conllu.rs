//! Reader for CoNLL-U, the plain-text format dependency parsers such as
//! Stanza and UDPipe emit.
//!
//! Each word is one line of ten columns
//! (`ID FORM LEMMA UPOS XPOS FEATS HEAD DEPREL DEPS MISC`), sentences are
//! separated by blank lines, and `# key = value` comments carry sentence
//! metadata.

use crate::{DependencyRelation, ParsedSentence, ParsedToken};
use std::collections::BTreeMap;

const COLUMNS: usize = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConlluError {
    #[error("line {line}: expected 10 columns, found {found}")]
    ColumnCount { line: usize, found: usize },

    #[error("line {line}: invalid {column} '{value}'")]
    InvalidNumber {
        line: usize,
        column: &'static str,
        value: String,
    },

    #[error("line {line}: unknown part of speech '{value}'")]
    UnknownPartOfSpeech { line: usize, value: String },
}

/// One sentence of a CoNLL-U document together with its comment metadata
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConlluBlock {
    pub metadata: BTreeMap<String, String>,
    pub sentence: ParsedSentence,
}

impl ConlluBlock {
    /// Key identifying the utterance this sentence belongs to
    ///
    /// An explicit `# utterance = ...` comment wins; otherwise the sentence's
    /// own `# text = ...` is used.
    pub fn utterance_key(&self) -> Option<&str> {
        self.metadata
            .get("utterance")
            .or_else(|| self.metadata.get("text"))
            .map(String::as_str)
    }
}

pub fn parse_conllu(input: &str) -> Result<Vec<ConlluBlock>, ConlluError> {
    let mut blocks = Vec::new();
    let mut current = ConlluBlock::default();

    for (index, line) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = line.trim_end();

        if line.trim().is_empty() {
            finish_block(&mut blocks, &mut current);
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            if let Some((key, value)) = comment.split_once('=') {
                current
                    .metadata
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
            continue;
        }

        if let Some(token) = parse_token_line(line, line_number)? {
            current.sentence.tokens.push(token);
        }
    }
    finish_block(&mut blocks, &mut current);

    Ok(blocks)
}

fn finish_block(blocks: &mut Vec<ConlluBlock>, current: &mut ConlluBlock) {
    let mut block = std::mem::take(current);
    if block.sentence.tokens.is_empty() {
        // comments with no words attached are document-level metadata
        return;
    }
    block.sentence.text = block.metadata.get("text").cloned().unwrap_or_else(|| {
        block
            .sentence
            .tokens
            .iter()
            .map(|token| token.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    });
    blocks.push(block);
}

/// Parse one word line; multiword-token ranges and empty nodes yield `None`
fn parse_token_line(line: &str, line_number: usize) -> Result<Option<ParsedToken>, ConlluError> {
    let columns: Vec<&str> = if line.contains('\t') {
        line.split('\t').collect()
    } else {
        line.split_whitespace().collect()
    };

    if columns.len() != COLUMNS {
        return Err(ConlluError::ColumnCount {
            line: line_number,
            found: columns.len(),
        });
    }

    let id = columns[0];
    if id.contains('-') || id.contains('.') {
        return Ok(None);
    }

    let parse_number = |value: &str, column: &'static str| {
        value
            .parse::<usize>()
            .map_err(|_| ConlluError::InvalidNumber {
                line: line_number,
                column,
                value: value.to_string(),
            })
    };

    let pos = columns[3]
        .parse()
        .map_err(|_| ConlluError::UnknownPartOfSpeech {
            line: line_number,
            value: columns[3].to_string(),
        })?;

    let xpos = match columns[4] {
        "_" => String::new(),
        xpos => xpos.to_string(),
    };

    Ok(Some(ParsedToken {
        id: parse_number(id, "id")?,
        text: columns[1].to_string(),
        lemma: columns[2].to_string(),
        pos,
        xpos,
        feats: columns[5].parse().unwrap_or_default(),
        head: parse_number(columns[6], "head")?,
        deprel: DependencyRelation::parse_lenient(columns[7]),
    }))
}

/// Group consecutive sentences that share an utterance key
pub fn group_by_utterance(blocks: Vec<ConlluBlock>) -> Vec<(String, Vec<ParsedSentence>)> {
    let mut groups: Vec<(String, Vec<ParsedSentence>)> = Vec::new();
    for block in blocks {
        let key = block
            .utterance_key()
            .map(str::to_string)
            .unwrap_or_else(|| block.sentence.text.clone());
        match groups.last_mut() {
            Some((last_key, sentences)) if *last_key == key => sentences.push(block.sentence),
            _ => groups.push((key, vec![block.sentence])),
        }
    }
    groups
}
