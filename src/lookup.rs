use crate::entry::Channel;
use crate::record::{decode_record, Record};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Every `<language>/definitions.<category>` file under `dir`, sorted.
///
/// Derived `*.conjugated` files are left out; `category` restricts the search
/// to one part of speech.
pub fn definition_files(dir: &Path, category: Option<&str>) -> Result<Vec<(String, PathBuf)>> {
    let prefix = format!("{}.", Channel::Definitions.name());
    let mut files = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let language = entry.file_name().to_string_lossy().into_owned();
        for file in fs::read_dir(entry.path())? {
            let file = file?;
            let name = file.file_name().to_string_lossy().into_owned();
            let Some(file_category) = name.strip_prefix(&prefix) else {
                continue;
            };
            if file_category.contains('.') {
                continue;
            }
            if category.is_some_and(|c| c != file_category) {
                continue;
            }
            files.push((language.clone(), file.path()));
        }
    }
    files.sort();
    Ok(files)
}

/// Gloss -> language -> words that carry that gloss.
pub type ReverseIndex = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Calls `visit(language, record)` for every well-formed record in the
/// definition files under `dir`.
fn for_each_record<F>(dir: &Path, category: Option<&str>, mut visit: F) -> Result<()>
where
    F: FnMut(&str, Record),
{
    for (language, path) in definition_files(dir, category)? {
        debug!(path = %path.display(), "Scanning definitions");
        let file =
            File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            match decode_record(&line) {
                Some(record) => visit(&language, record),
                None => warn!(line = i + 1, path = %path.display(), "Malformed record"),
            }
        }
    }
    Ok(())
}

/// Words, per language, that have `target` as one of their glosses.
pub fn reverse_lookup(
    dir: &Path,
    target: &str,
    category: Option<&str>,
) -> Result<BTreeMap<String, Vec<String>>> {
    let mut found: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for_each_record(dir, category, |language, record| {
        if record.values.iter().any(|v| v == target) {
            found.entry(language.to_string()).or_default().push(record.term);
        }
    })?;
    Ok(found)
}

/// Reverse lookup for every gloss at once.
pub fn reverse_index(dir: &Path, category: Option<&str>) -> Result<ReverseIndex> {
    let mut index = ReverseIndex::new();
    for_each_record(dir, category, |language, record| {
        for gloss in record.values {
            index
                .entry(gloss)
                .or_default()
                .entry(language.to_string())
                .or_default()
                .push(record.term.clone());
        }
    })?;
    info!(glosses = index.len(), "Reverse index built");
    Ok(index)
}

pub fn write_reverse_index(index: &ReverseIndex, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer(&mut out, index)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let german = dir.path().join("German");
        let spanish = dir.path().join("Spanish");
        fs::create_dir_all(&german).unwrap();
        fs::create_dir_all(&spanish).unwrap();
        fs::write(german.join("definitions.Adjective"), "frei:free,vacant\nledig:single,free\n").unwrap();
        fs::write(german.join("syn.Adjective"), "frei:free\n").unwrap();
        fs::write(spanish.join("definitions.Adjective"), "libre:free\nbroken line\n").unwrap();
        fs::write(spanish.join("definitions.Adverb"), "gratis:free of charge\n").unwrap();
        fs::write(spanish.join("definitions.Adjective.conjugated"), "libres:free\n").unwrap();
        dir
    }

    #[test]
    fn finds_words_by_gloss() {
        let dir = fixture();
        let found = reverse_lookup(dir.path(), "free", None).unwrap();
        assert_eq!(found["German"], vec!["frei", "ledig"]);
        assert_eq!(found["Spanish"], vec!["libre"]);
    }

    #[test]
    fn gloss_must_match_exactly() {
        let dir = fixture();
        let found = reverse_lookup(dir.path(), "free of charge", None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["Spanish"], vec!["gratis"]);
        assert!(reverse_lookup(dir.path(), "fre", None).unwrap().is_empty());
    }

    #[test]
    fn category_filter() {
        let dir = fixture();
        let files = definition_files(dir.path(), Some("Adverb")).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "Spanish");
        let found = reverse_lookup(dir.path(), "free", Some("Adverb")).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn reverse_index_covers_every_gloss() {
        let dir = fixture();
        let index = reverse_index(dir.path(), None).unwrap();
        assert_eq!(index["free"]["German"], vec!["frei", "ledig"]);
        assert_eq!(index["free"]["Spanish"], vec!["libre"]);
        assert_eq!(index["vacant"]["German"], vec!["frei"]);
        assert_eq!(index["free of charge"]["Spanish"], vec!["gratis"]);
        assert!(!index.contains_key("libres"));

        for (gloss, by_language) in &index {
            assert_eq!(&reverse_lookup(dir.path(), gloss, None).unwrap(), by_language);
        }
    }

    #[test]
    fn reverse_index_is_written_as_json() {
        let dir = fixture();
        let index = reverse_index(dir.path(), Some("Adverb")).unwrap();
        let path = dir.path().join("reverse.json");
        write_reverse_index(&index, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["free of charge"]["Spanish"][0], "gratis");
        assert_eq!(value.as_object().unwrap().len(), 1);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(reverse_lookup(&dir.path().join("nope"), "free", None).is_err());
    }
}
