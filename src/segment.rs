//! Splits rendered gloss text into candidate definitions.

use crate::config::{SegmenterConfig, NOISE_CHARS};
use once_cell::sync::Lazy;
use regex::Regex;

static EMPHASIS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"''.*?''").unwrap());

static DEFAULT_CONFIG: Lazy<SegmenterConfig> = Lazy::new(SegmenterConfig::default);

pub fn segment(text: &str) -> Vec<String> {
    segment_with(text, &DEFAULT_CONFIG)
}

/// Semicolons split first; comma lists are split only when they do not
/// look like a sentence.
pub fn segment_with(text: &str, config: &SegmenterConfig) -> Vec<String> {
    let text = rm_brackets(text, &[('(', ')')]);

    if text.contains(';') {
        return text
            .split(';')
            .flat_map(|part| segment_with(part, config))
            .collect();
    }

    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if looks_like_prose(&parts, config) {
        let whole = text.trim();
        return if whole.is_empty() {
            Vec::new()
        } else {
            vec![whole.to_string()]
        };
    }

    parts
        .iter()
        .flat_map(|part| clean_part(part, config))
        .collect()
}

fn looks_like_prose(parts: &[&str], config: &SegmenterConfig) -> bool {
    parts.len() > config.max_comma_parts
        || parts.iter().any(|p| config.guard_words.iter().any(|g| g == p))
        || parts
            .iter()
            .any(|p| p.matches(' ').count() > config.max_part_spaces)
}

fn clean_part(part: &str, config: &SegmenterConfig) -> Vec<String> {
    let mut cleaned = clean_links(part);
    if !cleaned.contains("...") {
        cleaned.retain(|c| !NOISE_CHARS.contains(&c));
    }
    let cleaned = EMPHASIS_REGEX.replace_all(&cleaned, "");
    let cleaned = canonicalize_with(&cleaned, &config.stop_words);
    let cleaned = cleaned.trim();

    if cleaned.contains('/') && !cleaned.contains(' ') {
        cleaned
            .split('/')
            .map(|token| canonicalize_with(token, &config.stop_words))
            .filter(|token| !token.is_empty())
            .collect()
    } else if cleaned.is_empty() {
        Vec::new()
    } else {
        vec![cleaned.to_string()]
    }
}

pub fn canonicalize(text: &str) -> String {
    canonicalize_with(text, &DEFAULT_CONFIG.stop_words)
}

/// Strips stop words from the front, then the back, until neither end has one.
pub fn canonicalize_with(text: &str, stop_words: &[String]) -> String {
    let is_stop = |w: &str| stop_words.iter().any(|s| s.eq_ignore_ascii_case(w));
    let words: Vec<&str> = text.split_whitespace().collect();
    let (mut start, mut end) = (0, words.len());
    while start < end {
        if is_stop(words[start]) {
            start += 1;
        } else if is_stop(words[end - 1]) {
            end -= 1;
        } else {
            break;
        }
    }
    if start == 0 && end == words.len() {
        text.to_string()
    } else {
        words[start..end].join(" ")
    }
}

/// Drops every balanced bracketed span; an unmatched closer is kept.
pub fn rm_brackets(text: &str, pairs: &[(char, char)]) -> String {
    let mut depth = vec![0usize; pairs.len()];
    let mut kept = String::with_capacity(text.len());
    'chars: for c in text.chars() {
        for (kind, (open, close)) in pairs.iter().enumerate() {
            if c == *open {
                depth[kind] += 1;
                continue 'chars;
            }
            if c == *close {
                if depth[kind] > 0 {
                    depth[kind] -= 1;
                    continue 'chars;
                }
                break;
            }
        }
        if depth.iter().all(|d| *d == 0) {
            kept.push(c);
        }
    }
    kept
}

/// Replaces `[[a|b]]` by its last pipe segment.
pub fn clean_links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for outer in text.split("[[") {
        for inner in outer.split("]]") {
            out.push_str(inner.rsplit('|').next().unwrap_or(inner));
        }
    }
    out
}
