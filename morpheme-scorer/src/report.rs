//! Result reports: the four-block CSV layout and a JSON-lines export

use std::borrow::Cow;
use std::io::{self, Write};

use crate::verdict::{Category, Verdict};

const UTTERANCE_HEADERS: [&str; 2] = ["Selected Utterances", "Cleaned Utterance"];
const ROW_WIDTH: usize = 6;

/// Column headers and total label of one report block
pub struct BlockLayout {
    pub headers: [&'static str; 4],
    pub total_label: &'static str,
}

impl BlockLayout {
    /// Header of the score column, also used by compaction to find the block
    pub fn score_header(&self) -> &'static str {
        self.headers[3]
    }
}

pub fn block_layout(category: Category) -> BlockLayout {
    match category {
        Category::Article => BlockLayout {
            headers: [
                "Is there an article with a noun subject?",
                "is it in a productive context?",
                "How do I know? (article)",
                "Article Productivity",
            ],
            total_label: "Total Article Productivity Score =",
        },
        Category::Auxiliary => BlockLayout {
            headers: [
                "Is there an auxiliary?",
                "is it in a productive context? (aux)",
                "How do I know? (aux)",
                "Auxiliary Productivity",
            ],
            total_label: "Total Auxiliary Productivity =",
        },
        Category::ActiveProgressive => BlockLayout {
            headers: [
                "is there a progressive -ing morpheme in active declarative?",
                "is it productive? (active progressive)",
                "how do I know? (active progressive)",
                "Active Progressive Productivity",
            ],
            total_label: "Total Active Progressive Productivity",
        },
        Category::GeneralProgressive => BlockLayout {
            headers: [
                "is there a progressive -ing morpheme?",
                "is it productive? (general progressive)",
                "how do I know? (general progressive)",
                "General Progressive Productivity",
            ],
            total_label: "Total General Progressive Productivity",
        },
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Quote a field when it contains a delimiter, quote or line break
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn write_row<W: Write, S: AsRef<str>>(writer: &mut W, fields: &[S]) -> io::Result<()> {
    let line = fields
        .iter()
        .map(|field| escape_field(field.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    write!(writer, "{line}\r\n")
}

/// Write the per-category report blocks, each closed by its total row
///
/// Blocks are separated by two empty rows.
pub fn write_results_csv<W: Write>(mut writer: W, verdicts: &[Verdict]) -> io::Result<()> {
    for (index, category) in Category::ALL.into_iter().enumerate() {
        if index > 0 {
            write_row(&mut writer, &[""; ROW_WIDTH])?;
            write_row(&mut writer, &[""; ROW_WIDTH])?;
        }

        let layout = block_layout(category);
        let mut header = UTTERANCE_HEADERS.to_vec();
        header.extend(layout.headers);
        write_row(&mut writer, &header)?;

        let mut total = 0;
        for verdict in verdicts {
            let finding = verdict.category(category);
            let score = finding.score().to_string();
            total += finding.score();
            write_row(
                &mut writer,
                &[
                    verdict.utterance.as_str(),
                    verdict.cleaned.as_str(),
                    yes_no(finding.exists()),
                    yes_no(finding.productive()),
                    finding.note(),
                    score.as_str(),
                ],
            )?;
        }
        let total = total.to_string();
        write_row(
            &mut writer,
            &["", "", "", "", layout.total_label, total.as_str()],
        )?;
    }
    writer.flush()
}

/// Write one JSON object per verdict
pub fn write_jsonl<W: Write>(mut writer: W, verdicts: &[Verdict]) -> io::Result<()> {
    for verdict in verdicts {
        serde_json::to_writer(&mut writer, verdict)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Split CSV text into records, honouring quoted fields
pub fn read_records(input: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}
