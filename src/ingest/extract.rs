// src/ingest/extract.rs
//! Pull headlines out of a raw text dump of a feed window, where each item
//! is printed as `HH:MM:SS <text>` and entries run into each other.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::types::HeadlineEvent;

pub const MIN_WORDS: usize = 5;
pub const UPPER_WORD_RATIO: f32 = 0.75;

fn re_entry() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(\d{2}:\d{2}:\d{2})\s+").unwrap())
}

/// Split a dump into `(timestamp, text)` pairs, text running up to the
/// next timestamp.
pub fn split_entries(dump: &str) -> Vec<(String, String)> {
    let re = re_entry();
    let marks: Vec<_> = re.captures_iter(dump).collect();
    let mut out = Vec::with_capacity(marks.len());
    for (i, caps) in marks.iter().enumerate() {
        let (Some(whole), Some(ts)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = marks
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(dump.len());
        let text = dump[whole.end()..end].trim();
        if !text.is_empty() {
            out.push((ts.as_str().to_string(), text.to_string()));
        }
    }
    out
}

/// Letters only, ignoring digits and punctuation.
pub fn is_all_upper(text: &str) -> bool {
    let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(|c| !c.is_lowercase())
}

/// Share of whitespace-separated words that are uppercase.
pub fn upper_word_ratio(text: &str) -> f32 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }
    let upper = words
        .iter()
        .filter(|w| w.chars().any(|c| c.is_alphabetic()) && is_all_upper(w))
        .count();
    upper as f32 / words.len() as f32
}

pub fn looks_like_headline(text: &str) -> bool {
    if text.split_whitespace().count() < MIN_WORDS {
        return false;
    }
    is_all_upper(text) || upper_word_ratio(text) >= UPPER_WORD_RATIO
}

/// First entry in the dump that passes the headline heuristics.
pub fn extract_headline(dump: &str) -> Option<(String, String)> {
    split_entries(dump)
        .into_iter()
        .find(|(_, text)| looks_like_headline(text))
}

/// All headline-looking entries, tagged.
pub fn extract_events(dump: &str, source_tag: &str) -> Vec<HeadlineEvent> {
    split_entries(dump)
        .into_iter()
        .filter(|(_, text)| looks_like_headline(text))
        .map(|(ts, text)| HeadlineEvent::new(ts, text, source_tag))
        .collect()
}
