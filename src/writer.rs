use crate::config::{MAX_OPEN_WRITERS, WRITER_BUFFER_SIZE};
use crate::diagnostics::Diagnostics;
use crate::entry::{Channel, LexiconEntry};
use crate::record::encode_record;
use anyhow::{Context, Result};
use csv::Writer;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const TEMPLATE_COUNTS_FILE: &str = "template_counts.csv";
pub const UNKNOWN_TEMPLATES_FILE: &str = "unknown_templates.csv";
pub const LOW_QUALITY_FILE: &str = "low_quality.jsonl";

/// `<root>/<language>/<channel>.<category>`
pub fn record_path(root: &Path, language: &str, category: &str, channel: &Channel) -> PathBuf {
    root.join(language.replace('/', "_"))
        .join(format!("{}.{}", channel.name(), category))
}

/// Appends record lines to per-language, per-channel files.
///
/// Files are opened in append mode and kept open up to a cap; when the cap
/// is reached every handle is flushed and dropped.
pub struct RecordWriter {
    root: PathBuf,
    handles: FxHashMap<PathBuf, BufWriter<File>>,
    max_open: usize,
    records: u64,
}

impl RecordWriter {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_max_open(root, MAX_OPEN_WRITERS)
    }

    pub fn with_max_open(root: impl AsRef<Path>, max_open: usize) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            handles: FxHashMap::default(),
            max_open: max_open.max(1),
            records: 0,
        }
    }

    /// Writes one line per bucket that has a language and a category.
    /// Returns the number of lines written.
    pub fn write_entry(&mut self, entry: &LexiconEntry) -> Result<u64> {
        let mut written = 0;
        for (key, values) in entry.buckets() {
            let (Some(language), Some(category)) = (&key.language, &key.category) else {
                continue;
            };
            if !is_safe_dir_name(language) {
                warn!(title = %entry.title, language = %language, "Skipping unusable language heading");
                continue;
            }
            if values.is_empty() {
                continue;
            }
            let values: Vec<&str> = values.keys().collect();
            let line = encode_record(&entry.title, &values);
            let path = record_path(&self.root, language, category, &key.channel);
            self.write_line(path, &line)?;
            written += 1;
        }
        self.records += written;
        Ok(written)
    }

    fn write_line(&mut self, path: PathBuf, line: &str) -> Result<()> {
        if !self.handles.contains_key(&path) {
            if self.handles.len() >= self.max_open {
                debug!(open = self.handles.len(), "Writer cache full, flushing");
                self.flush()?;
                self.handles.clear();
            }
            let file = open_append(&path)?;
            self.handles
                .insert(path.clone(), BufWriter::with_capacity(WRITER_BUFFER_SIZE, file));
        }
        if let Some(out) = self.handles.get_mut(&path) {
            writeln!(out, "{}", line)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        Ok(())
    }

    pub fn open_files(&self) -> usize {
        self.handles.len()
    }

    pub fn flush(&mut self) -> Result<()> {
        for (path, out) in self.handles.iter_mut() {
            out.flush()
                .with_context(|| format!("Failed to flush {}", path.display()))?;
        }
        Ok(())
    }

    /// Flushes and closes every file; returns the total lines written.
    pub fn finish(mut self) -> Result<u64> {
        self.flush()?;
        self.handles.clear();
        Ok(self.records)
    }
}

/// A heading that would name the output root or its parent is not a directory we write.
fn is_safe_dir_name(language: &str) -> bool {
    !matches!(language.trim(), "" | "." | "..")
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open record file: {}", path.display()))
}

fn write_counts(path: &Path, rows: &[(&str, u64)]) -> Result<()> {
    let mut writer = Writer::from_writer(BufWriter::new(
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
    ));
    writer.write_record(["name", "count"])?;
    for (name, count) in rows {
        writer.write_record([*name, count.to_string().as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `template_counts.csv` and `unknown_templates.csv` under `dir`.
pub fn write_diagnostics(dir: &Path, diagnostics: &Diagnostics) -> Result<()> {
    let templates = diagnostics.top_templates();
    let unknown = diagnostics.top_unknown();
    write_counts(&dir.join(TEMPLATE_COUNTS_FILE), &templates)?;
    write_counts(&dir.join(UNKNOWN_TEMPLATES_FILE), &unknown)?;
    info!(
        templates = templates.len(),
        unknown = unknown.len(),
        "Wrote template diagnostics"
    );
    Ok(())
}

#[derive(Serialize)]
struct LowQualityRecord<'a> {
    title: &'a str,
    page_low_quality: bool,
    languages: &'a [String],
}

/// One JSON line per page that had definition lines nothing was taken from.
pub struct LowQualityLog {
    out: BufWriter<File>,
    written: u64,
}

impl LowQualityLog {
    pub fn create(dir: &Path) -> Result<Self> {
        let path = dir.join(LOW_QUALITY_FILE);
        let file =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn record(&mut self, entry: &LexiconEntry) -> Result<bool> {
        let quality = &entry.quality;
        if !quality.is_low_quality() && quality.low_quality_languages.is_empty() {
            return Ok(false);
        }
        let record = LowQualityRecord {
            title: &entry.title,
            page_low_quality: quality.is_low_quality(),
            languages: &quality.low_quality_languages,
        };
        serde_json::to_writer(&mut self.out, &record)?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(true)
    }

    pub fn finish(mut self) -> Result<u64> {
        self.out.flush()?;
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::process_page;
    use crate::record::decode_record;
    use tempfile::TempDir;

    fn entry(title: &str, raw: &str) -> LexiconEntry {
        process_page(title, raw, &mut Diagnostics::new())
    }

    #[test]
    fn record_path_layout() {
        let path = record_path(Path::new("out"), "Serbo-Croatian/Latin", "Noun", &Channel::Definitions);
        assert_eq!(path, Path::new("out/Serbo-Croatian_Latin/definitions.Noun"));
        let path = record_path(
            Path::new("out"),
            "German",
            "Verb",
            &Channel::Relation("syn".to_string()),
        );
        assert_eq!(path, Path::new("out/German/syn.Verb"));
    }

    #[test]
    fn writes_one_line_per_bucket() {
        let dir = TempDir::new().unwrap();
        let mut writer = RecordWriter::new(dir.path());
        let raw = "==German==\n===Adjective===\n# free, gratis\n# [[free]]\n#: {{syn|de|los}}\n";
        assert_eq!(writer.write_entry(&entry("frei", raw)).unwrap(), 2);
        assert_eq!(writer.finish().unwrap(), 2);

        let defs = fs::read_to_string(dir.path().join("German/definitions.Adjective")).unwrap();
        assert_eq!(defs, "frei:free,gratis\n");
        let syn = fs::read_to_string(dir.path().join("German/syn.Adjective")).unwrap();
        assert_eq!(syn, "frei:los\n");
    }

    #[test]
    fn buckets_without_headings_are_skipped() {
        let dir = TempDir::new().unwrap();
        let mut writer = RecordWriter::new(dir.path());
        let written = writer.write_entry(&entry("x", "# orphan\n==English==\n# orphan\n")).unwrap();
        assert_eq!(written, 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn dot_and_blank_languages_stay_inside_output() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let mut writer = RecordWriter::new(&out);
        for raw in ["==..==\n===Noun===\n# free\n", "== ==\n===Noun===\n# free\n", "==.==\n===Noun===\n# free\n"] {
            assert_eq!(writer.write_entry(&entry("x", raw)).unwrap(), 0);
        }
        writer.finish().unwrap();
        assert!(!tmp.path().join("definitions.Noun").exists());
        assert!(!out.join("definitions.Noun").exists());
        assert!(!out.exists());
    }

    #[test]
    fn escaped_title_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut writer = RecordWriter::new(dir.path());
        writer
            .write_entry(&entry("a:b", "==English==\n===Noun===\n# ratio\n"))
            .unwrap();
        writer.finish().unwrap();
        let text = fs::read_to_string(dir.path().join("English/definitions.Noun")).unwrap();
        let record = decode_record(text.lines().next().unwrap()).unwrap();
        assert_eq!(record.term, "a:b");
        assert_eq!(record.values, vec!["ratio"]);
    }

    #[test]
    fn handle_cache_is_bounded() {
        let dir = TempDir::new().unwrap();
        let mut writer = RecordWriter::with_max_open(dir.path(), 2);
        for (i, language) in ["A", "B", "C", "A"].iter().enumerate() {
            let raw = format!("=={}==\n===Noun===\n# word{}\n", language, i);
            writer.write_entry(&entry("w", &raw)).unwrap();
            assert!(writer.open_files() <= 2);
        }
        writer.finish().unwrap();
        let a = fs::read_to_string(dir.path().join("A/definitions.Noun")).unwrap();
        assert_eq!(a, "w:word0\nw:word3\n");
    }

    #[test]
    fn diagnostics_reports() {
        let dir = TempDir::new().unwrap();
        let mut diag = Diagnostics::new();
        process_page("x", "==English==\n===Noun===\n# {{m|en|a}} {{m|en|b}} {{zzz}}\n", &mut diag);
        write_diagnostics(dir.path(), &diag).unwrap();

        let counts = fs::read_to_string(dir.path().join(TEMPLATE_COUNTS_FILE)).unwrap();
        assert_eq!(counts, "name,count\nm,2\nzzz,1\n");
        let unknown = fs::read_to_string(dir.path().join(UNKNOWN_TEMPLATES_FILE)).unwrap();
        assert_eq!(unknown, "name,count\nzzz,1\n");
    }

    #[test]
    fn low_quality_log_lines() {
        let dir = TempDir::new().unwrap();
        let mut log = LowQualityLog::create(dir.path()).unwrap();
        assert!(log.record(&entry("x", "==English==\n# {{zzz}}\n")).unwrap());
        assert!(!log.record(&entry("y", "==English==\n# fine\n")).unwrap());
        assert_eq!(log.finish().unwrap(), 1);

        let text = fs::read_to_string(dir.path().join(LOW_QUALITY_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["title"], "x");
        assert_eq!(value["page_low_quality"], true);
        assert_eq!(value["languages"][0], "English");
    }
}
