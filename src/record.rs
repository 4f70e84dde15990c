//! The `term:glossA,glossB` record line shared with downstream tools.
//!
//! `:`, `,` and `\` inside a field are prefixed with `\`. Readers must scan
//! for escapes before splitting on a delimiter.

const ESCAPE: char = '\\';
const TERM_SEP: char = ':';
const VALUE_SEP: char = ',';

pub fn escape(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 2);
    for c in field.chars() {
        if c == ESCAPE || c == TERM_SEP || c == VALUE_SEP {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Splits on unescaped `delim`, removing escapes. A trailing lone escape is kept.
pub fn split_unescape(s: &str, delim: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE {
            match chars.next() {
                Some(next) => current.push(next),
                None => current.push(ESCAPE),
            }
        } else if c == delim {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

/// Byte offset of the first `delim` not preceded by an escape.
fn find_unescaped(s: &str, delim: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == ESCAPE {
            escaped = true;
        } else if c == delim {
            return Some(i);
        }
    }
    None
}

pub fn encode_record<S: AsRef<str>>(term: &str, values: &[S]) -> String {
    let mut line = escape(term);
    line.push(TERM_SEP);
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            line.push(VALUE_SEP);
        }
        line.push_str(&escape(value.as_ref()));
    }
    line
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub term: String,
    pub values: Vec<String>,
}

/// Parses a record line; `None` when it has no unescaped `:`.
pub fn decode_record(line: &str) -> Option<Record> {
    let line = line.trim_end_matches(['\n', '\r']);
    let split = find_unescaped(line, TERM_SEP)?;
    let term = split_unescape(&line[..split], TERM_SEP).concat();
    let rest = &line[split + TERM_SEP.len_utf8()..];
    let values = if rest.is_empty() {
        Vec::new()
    } else {
        split_unescape(rest, VALUE_SEP)
    };
    Some(Record { term, values })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_examples() {
        assert_eq!(escape("test"), "test");
        assert_eq!(escape("test:test"), "test\\:test");
        assert_eq!(escape("test\\test"), "test\\\\test");
        assert_eq!(escape("a,b"), "a\\,b");
    }

    #[test]
    fn split_unescape_examples() {
        assert_eq!(split_unescape("foo,bar", ','), vec!["foo", "bar"]);
        assert_eq!(split_unescape("foo\\,bar", ','), vec!["foo,bar"]);
        assert_eq!(split_unescape("foo\\\\,bar", ','), vec!["foo\\", "bar"]);
        assert_eq!(split_unescape("foo\\", ','), vec!["foo\\"]);
    }

    #[test]
    fn encode_plain_record() {
        assert_eq!(encode_record("frei", &["free", "gratis"]), "frei:free,gratis");
    }

    #[test]
    fn decode_plain_record() {
        let record = decode_record("frei:free,gratis\n").unwrap();
        assert_eq!(record.term, "frei");
        assert_eq!(record.values, vec!["free", "gratis"]);
    }

    #[test]
    fn escaped_fields_survive() {
        let term = "a:b\\c";
        let values = vec![
            "x,y".to_string(),
            "{{es-verb form of|ir:ser}}".to_string(),
            "back\\slash,".to_string(),
            "plain".to_string(),
        ];
        let line = encode_record(term, &values);
        let record = decode_record(&line).unwrap();
        assert_eq!(record.term, term);
        assert_eq!(record.values, values);
    }

    #[test]
    fn term_ending_in_backslash() {
        let line = encode_record("x\\", &["y"]);
        assert_eq!(line, "x\\\\:y");
        let record = decode_record(&line).unwrap();
        assert_eq!(record.term, "x\\");
        assert_eq!(record.values, vec!["y"]);
    }

    #[test]
    fn record_without_separator_is_rejected() {
        assert_eq!(decode_record("no separator here"), None);
        assert_eq!(decode_record("escaped\\:only"), None);
    }

    #[test]
    fn empty_value_list() {
        let record = decode_record("word:").unwrap();
        assert!(record.values.is_empty());
    }
}
