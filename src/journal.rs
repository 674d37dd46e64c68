// src/journal.rs
//! Append-only CSV journal of accepted headlines:
//! `full_timestamp,text,source_tag`, no header, fields quoted when needed.

use anyhow::Context;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::ingest::types::NormalizedEvent;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct JournalRecord {
    pub full_timestamp: String,
    pub text: String,
    pub source_tag: String,
}

impl From<&NormalizedEvent> for JournalRecord {
    fn from(ev: &NormalizedEvent) -> Self {
        Self {
            full_timestamp: ev.timestamp_str(),
            text: ev.text.clone(),
            source_tag: ev.source_tag.clone(),
        }
    }
}

/// Exclusive append handle. Flushed after every row and again on drop.
#[derive(Debug)]
pub struct Journal {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl Journal {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating journal dir {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening journal {}", path.display()))?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(file);
        Ok(Self { writer, path })
    }

    pub fn append(&mut self, ev: &NormalizedEvent) -> Result<()> {
        self.append_record(&JournalRecord::from(ev))
    }

    pub fn append_record(&mut self, rec: &JournalRecord) -> Result<()> {
        self.writer.write_record([
            rec.full_timestamp.as_str(),
            rec.text.as_str(),
            rec.source_tag.as_str(),
        ])?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse journal rows from any reader. Legacy two-column rows get an empty
/// tag; rows with fewer than two fields are skipped. Fields that are not
/// valid UTF-8 are decoded lossily so one bad row never hides its
/// neighbours.
pub fn parse_records<R: std::io::Read>(rdr: R) -> Result<Vec<JournalRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(rdr);
    let mut out = Vec::new();
    for row in reader.byte_records() {
        let row = row?;
        let (Some(ts), Some(text)) = (row.get(0), row.get(1)) else {
            continue;
        };
        let mut lossy = false;
        let rec = JournalRecord {
            full_timestamp: decode_field(ts, &mut lossy),
            text: decode_field(text, &mut lossy),
            source_tag: decode_field(row.get(2).unwrap_or_default(), &mut lossy),
        };
        if lossy {
            tracing::warn!(
                line = row.position().map(|p| p.line()),
                "journal row is not valid UTF-8; decoded lossily"
            );
        }
        out.push(rec);
    }
    Ok(out)
}

fn decode_field(bytes: &[u8], lossy: &mut bool) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            *lossy = true;
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

pub fn read_records(path: impl AsRef<Path>) -> anyhow::Result<Vec<JournalRecord>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("reading journal {}", path.display()))?;
    Ok(parse_records(file)?)
}

/// Last `n` texts of the journal, oldest first. Missing file yields none.
pub fn recent_texts(path: impl AsRef<Path>, n: usize) -> anyhow::Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let recs = read_records(path)?;
    let start = recs.len().saturating_sub(n);
    Ok(recs.into_iter().skip(start).map(|r| r.text).collect())
}
