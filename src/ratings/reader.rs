use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use tracing::debug;

/// One line of the ratings file, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the input file.
    pub line: u64,
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn new(line: u64, fields: &[&str]) -> Self {
        Self {
            line,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// What was found at the input path.
#[derive(Debug, PartialEq, Eq)]
pub enum RatingsFile {
    Missing,
    Empty,
    Rows(Vec<RawRow>),
}

impl RatingsFile {
    /// Rows to aggregate; empty for a missing or empty file.
    pub fn rows(&self) -> &[RawRow] {
        match self {
            RatingsFile::Rows(rows) => rows,
            RatingsFile::Missing | RatingsFile::Empty => &[],
        }
    }
}

/// Reads every row of a headerless delimited file.
///
/// Rows are returned in file order with whatever number of fields they have; shape
/// checks belong to the aggregator. A blank line becomes a row with no fields.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read as UTF-8 text or contains a
/// record the CSV reader cannot decode.
pub fn load(path: &Path, delimiter: u8) -> Result<RatingsFile> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RatingsFile::Missing),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open '{}'", path.display()));
        }
    };

    let mut content = String::new();
    file.read_to_string(&mut content)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    if content.is_empty() {
        return Ok(RatingsFile::Empty);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut lines = LineCounter::default();
    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    loop {
        // The csv reader drops blank lines silently and reports the position where it
        // started looking, so the skipped terminators are recovered from the raw text.
        let from = reader.position().byte() as usize;
        let more = reader
            .read_record(&mut record)
            .with_context(|| format!("Failed to read record from '{}'", path.display()))?;

        let (blanks, record_start) = skipped_blank_lines(content.as_bytes(), from);
        for offset in blanks {
            rows.push(RawRow {
                line: lines.line_at(&content, offset),
                fields: Vec::new(),
            });
        }

        if !more {
            break;
        }
        rows.push(RawRow {
            line: lines.line_at(&content, record_start),
            fields: record.iter().map(str::to_string).collect(),
        });
    }

    debug!(path = %path.display(), rows = rows.len(), "Ratings file loaded");
    Ok(RatingsFile::Rows(rows))
}

/// Start offsets of the blank lines at `from`, and the offset just past them.
fn skipped_blank_lines(bytes: &[u8], from: usize) -> (Vec<usize>, usize) {
    let mut i = from;
    // A CRLF record terminator is consumed up to the CR; its LF is not a blank line.
    if i > 0 && bytes.get(i - 1) == Some(&b'\r') && bytes.get(i) == Some(&b'\n') {
        i += 1;
    }

    let mut blanks = Vec::new();
    while let Some(&b) = bytes.get(i) {
        if b != b'\r' && b != b'\n' {
            break;
        }
        blanks.push(i);
        i += if b == b'\r' && bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
    }
    (blanks, i)
}

/// Maps increasing byte offsets to 1-based line numbers.
#[derive(Default)]
struct LineCounter {
    offset: usize,
    newlines: u64,
}

impl LineCounter {
    fn line_at(&mut self, content: &str, offset: usize) -> u64 {
        self.newlines += content.as_bytes()[self.offset..offset]
            .iter()
            .filter(|&&b| b == b'\n')
            .count() as u64;
        self.offset = offset;
        self.newlines + 1
    }
}
