//! Catalog loading: raw CSV / JSON rows become [`Record`]s with every missing categorical
//! field replaced by the `Unknown` sentinel. Malformed rows are skipped and counted; too
//! many of them abort the load.

use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::{Record, UNKNOWN};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

lazy_static! {
    static ref DURATION: Regex = Regex::new(r"^\d+\s*min$").expect("valid regex");
}

/// One row as it appears in the catalog export. Unknown columns are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(alias = "id")]
    pub show_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub director: Option<String>,
    pub cast: Option<String>,
    pub country: Option<String>,
    pub rating: Option<String>,
    pub duration: Option<String>,
    pub listed_in: Option<String>,
    pub description: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word { out.extend(c.to_lowercase()) } else { out.extend(c.to_uppercase()) }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Split a country cell, dropping stray commas and collapsing casing variants.
pub fn clean_countries(value: &str) -> Vec<String> {
    split_list(value.trim().trim_matches(',')).iter().map(|c| title_case(c)).collect()
}

/// Normalize one row. `row` is only used to synthesize an id when the row has none.
pub fn normalize_record(raw: RawRecord, row: usize) -> Result<Record> {
    let title = present(raw.title).ok_or_else(|| Error::MalformedRecord(format!("row {row}: empty title")))?;
    let id = present(raw.show_id).unwrap_or_else(|| format!("row-{row}"));
    let mut rating = present(raw.rating).unwrap_or_else(|| UNKNOWN.to_string());
    let mut duration = present(raw.duration).unwrap_or_else(|| UNKNOWN.to_string());
    // some exports shifted the duration into the rating column
    if DURATION.is_match(&rating) {
        std::mem::swap(&mut rating, &mut duration);
    }
    let cast = present(raw.cast).map(|c| split_list(&c)).filter(|c| !c.is_empty()).unwrap_or_else(|| vec![UNKNOWN.to_string()]);
    let country = present(raw.country)
        .map(|c| clean_countries(&c))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| vec![UNKNOWN.to_string()]);
    Ok(Record {
        id,
        title,
        genres: present(raw.listed_in).map(|g| split_list(&g)).unwrap_or_default(),
        director: present(raw.director).unwrap_or_else(|| UNKNOWN.to_string()),
        cast,
        country,
        rating,
        description: present(raw.description).unwrap_or_default(),
        duration,
    })
}

/// Accumulates records across one or more input files.
#[derive(Debug)]
pub struct Ingest {
    config: IngestConfig,
    records: Vec<Record>,
    seen_ids: HashSet<String>,
    rows: usize,
    skipped: usize,
    filtered: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub rows: usize,
    pub accepted: usize,
    pub skipped: usize,
    pub filtered: usize,
}

impl Ingest {
    pub fn new(config: IngestConfig) -> Self {
        Self { config, records: Vec::new(), seen_ids: HashSet::new(), rows: 0, skipped: 0, filtered: 0 }
    }

    pub fn push(&mut self, raw: RawRecord) {
        let row = self.rows;
        self.rows += 1;
        if self.config.movies_only && !raw.kind.as_deref().is_some_and(|k| k.trim().eq_ignore_ascii_case("movie")) {
            self.filtered += 1;
            return;
        }
        match normalize_record(raw, row) {
            Ok(record) if !self.seen_ids.insert(record.id.clone()) => {
                self.reject(format!("row {row}: duplicate id {}", record.id));
            }
            Ok(record) => self.records.push(record),
            Err(e) => self.reject(e.to_string()),
        }
    }

    /// Count a row that could not even be parsed.
    pub fn push_unparsable(&mut self, reason: impl Into<String>) {
        self.rows += 1;
        self.reject(reason.into());
    }

    fn reject(&mut self, reason: String) {
        self.skipped += 1;
        tracing::warn!(%reason, "skipping malformed record");
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats { rows: self.rows, accepted: self.records.len(), skipped: self.skipped, filtered: self.filtered }
    }

    /// Corpus in input order, or `MalformedRecord` if the skip ratio is over the limit.
    pub fn finish(self) -> Result<Vec<Record>> {
        let stats = self.stats();
        let considered = stats.accepted + stats.skipped;
        if considered > 0 {
            let ratio = stats.skipped as f64 / considered as f64;
            if ratio > self.config.max_skip_ratio {
                return Err(Error::MalformedRecord(format!(
                    "skipped {} of {considered} rows ({ratio:.3} > {})",
                    stats.skipped, self.config.max_skip_ratio
                )));
            }
        }
        tracing::info!(rows = stats.rows, accepted = stats.accepted, skipped = stats.skipped, filtered = stats.filtered, "catalog ingested");
        Ok(self.records)
    }

    pub fn read_csv<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        for row in rdr.deserialize::<RawRecord>() {
            match row {
                Ok(raw) => self.push(raw),
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => self.push_unparsable(e.to_string()),
            }
        }
        Ok(())
    }

    pub fn read_jsonl<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            match serde_json::from_str::<RawRecord>(&line) {
                Ok(raw) => self.push(raw),
                Err(e) => self.push_unparsable(e.to_string()),
            }
        }
        Ok(())
    }

    /// A JSON array of rows or a single row object.
    pub fn read_json<R: Read>(&mut self, reader: R) -> Result<()> {
        let json: serde_json::Value = serde_json::from_reader(reader)?;
        let rows = match json {
            serde_json::Value::Array(arr) => arr,
            obj @ serde_json::Value::Object(_) => vec![obj],
            _ => return Ok(()),
        };
        for v in rows {
            match serde_json::from_value::<RawRecord>(v) {
                Ok(raw) => self.push(raw),
                Err(e) => self.push_unparsable(e.to_string()),
            }
        }
        Ok(())
    }

    /// Dispatch on extension: `.csv`, `.jsonl`, anything else is read as JSON.
    pub fn read_path(&mut self, path: &Path) -> Result<()> {
        let f = File::open(path)?;
        match path.extension().and_then(|s| s.to_str()) {
            Some("csv") => self.read_csv(BufReader::new(f)),
            Some("jsonl") => self.read_jsonl(BufReader::new(f)),
            _ => self.read_json(BufReader::new(f)),
        }
    }
}
