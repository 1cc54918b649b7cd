//! Collapse result reports into one row of category totals per transcript

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};

use crate::report::{block_layout, read_records};
use crate::verdict::Category;

pub const COMPACT_HEADER: [&str; 5] = [
    "Name",
    "Total Article Productivity",
    "Total Auxiliary Productivity",
    "Total Active Progressive Productivity",
    "Total General Progressive Productivity",
];

/// Totals for one report, in [`Category::ALL`] order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactRow {
    pub name: String,
    pub totals: [i64; 4],
}

/// Sum each block's score column
///
/// A block starts at its score header and ends at the first empty score
/// cell. The last number of a block is its printed total and is not counted.
/// Rows whose score cell is not a number are ignored.
pub fn category_totals(report: &str) -> [i64; 4] {
    let score_headers = Category::ALL.map(|category| block_layout(category).score_header());
    let mut sections: [Vec<i64>; 4] = Default::default();
    let mut current: Option<usize> = None;

    for record in read_records(report) {
        let value = record.last().map(|field| field.trim()).unwrap_or_default();

        if let Some(index) = score_headers.iter().position(|header| *header == value) {
            current = Some(index);
            continue;
        }
        let Some(index) = current else {
            continue;
        };
        if value.is_empty() {
            current = None;
            continue;
        }
        if let Ok(number) = value.parse::<i64>() {
            sections[index].push(number);
        }
    }

    sections.map(|mut values| {
        values.pop();
        values.iter().sum()
    })
}

fn name_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn compact_file(path: &Path) -> anyhow::Result<CompactRow> {
    let report = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report {}", path.display()))?;
    Ok(CompactRow {
        name: name_of(path),
        totals: category_totals(&report),
    })
}

/// Reports in a directory: `.csv` and `.txt` files, in name order
pub fn report_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory {}", dir.display()))?
    {
        let path = entry?.path();
        let is_report = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| ext == "csv" || ext == "txt");
        if path.is_file() && is_report {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Compact a single report or every report in a directory
///
/// Returns the base name for the output file along with the rows.
pub fn compact_path(path: &Path) -> anyhow::Result<(String, Vec<CompactRow>)> {
    if path.is_file() {
        return Ok((name_of(path), vec![compact_file(path)?]));
    }
    if !path.is_dir() {
        bail!("Path {} not found", path.display());
    }

    let rows = report_files(path)?
        .iter()
        .map(|file| compact_file(file))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reports".to_string());
    Ok((name, rows))
}

pub fn write_compact_csv<W: Write>(mut writer: W, rows: &[CompactRow]) -> io::Result<()> {
    writeln!(writer, "{}", COMPACT_HEADER.join(","))?;
    for row in rows {
        let name = if row.name.contains([',', '"']) {
            format!("\"{}\"", row.name.replace('"', "\"\""))
        } else {
            row.name.clone()
        };
        let [article, auxiliary, active, general] = row.totals;
        writeln!(writer, "{name},{article},{auxiliary},{active},{general}")?;
    }
    writer.flush()
}
