//! Second pass over written records: inflected forms whose definition line
//! was only a `... form of` template inherit the glosses of their lemma.

use crate::entry::Channel;
use crate::markup::{parse, MarkupNode, Template};
use crate::record::{decode_record, encode_record};
use crate::writer::record_path;
use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Templates that reference a lemma but do not make the title an inflection of it.
const IGNORED_TEMPLATES: &[&str] = &["es-compound of"];

/// Templates whose lemma is the first argument rather than the second.
const LEMMA_FIRST_TEMPLATES: &[&str] = &["es-verb form of"];

pub const CONJUGATED_SUFFIX: &str = "conjugated";

/// Lemma named by a deferred form-of template, if any.
pub fn resolve_lemma(template: &Template) -> Option<&str> {
    let name = template.name.as_str();
    if IGNORED_TEMPLATES.contains(&name) {
        return None;
    }
    let index = if LEMMA_FIRST_TEMPLATES.contains(&name) { 1 } else { 2 };
    template
        .positional(index)
        .map(str::trim)
        .filter(|lemma| !lemma.is_empty())
}

/// Lemma -> inflected forms, in first-seen order.
#[derive(Debug, Default)]
pub struct ConjugationIndex {
    forms: IndexMap<String, IndexSet<String>>,
    unresolved: u64,
}

impl ConjugationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every lemma referenced by `templates` (raw template source)
    /// as having `form` as an inflection.
    pub fn add_record(&mut self, form: &str, templates: &[String]) {
        for source in templates {
            for node in parse(source) {
                let MarkupNode::Template(template) = node else {
                    continue;
                };
                if IGNORED_TEMPLATES.contains(&template.name.as_str()) {
                    continue;
                }
                match resolve_lemma(&template) {
                    Some(lemma) => {
                        self.forms
                            .entry(lemma.to_string())
                            .or_default()
                            .insert(form.to_string());
                    }
                    None => {
                        debug!(form, template = %template.source, "No lemma in template");
                        self.unresolved += 1;
                    }
                }
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open conjugations: {}", path.display()))?;
        let mut index = Self::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            match decode_record(&line) {
                Some(record) => index.add_record(&record.term, &record.values),
                None => warn!(line = i + 1, path = %path.display(), "Malformed record"),
            }
        }
        Ok(index)
    }

    pub fn forms_of(&self, lemma: &str) -> impl Iterator<Item = &str> {
        self.forms
            .get(lemma)
            .into_iter()
            .flat_map(|forms| forms.iter().map(String::as_str))
    }

    pub fn lemmas(&self) -> usize {
        self.forms.len()
    }

    pub fn unresolved(&self) -> u64 {
        self.unresolved
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConjugateSummary {
    pub output: PathBuf,
    pub lemmas: usize,
    pub records_copied: u64,
    pub forms_written: u64,
    pub unresolved: u64,
}

/// Writes `definitions.<category>.conjugated` next to the definitions file:
/// every lemma record followed by one record per inflected form carrying the
/// lemma's glosses.
pub fn apply_conjugations(dir: &Path, language: &str, category: &str) -> Result<ConjugateSummary> {
    let conjugations = record_path(dir, language, category, &Channel::Conjugations);
    let definitions = record_path(dir, language, category, &Channel::Definitions);
    let index = ConjugationIndex::load(&conjugations)?;
    info!(
        lemmas = index.lemmas(),
        unresolved = index.unresolved(),
        "Loaded conjugation index"
    );

    let mut output = definitions.clone().into_os_string();
    output.push(".");
    output.push(CONJUGATED_SUFFIX);
    let output = PathBuf::from(output);

    let input = File::open(&definitions)
        .with_context(|| format!("Failed to open definitions: {}", definitions.display()))?;
    let mut out = BufWriter::new(
        File::create(&output)
            .with_context(|| format!("Failed to create {}", output.display()))?,
    );

    let mut summary = ConjugateSummary {
        output: output.clone(),
        lemmas: index.lemmas(),
        unresolved: index.unresolved(),
        ..ConjugateSummary::default()
    };
    for (i, line) in BufReader::new(input).lines().enumerate() {
        let line = line?;
        writeln!(out, "{}", line)?;
        summary.records_copied += 1;
        let Some(record) = decode_record(&line) else {
            warn!(line = i + 1, path = %definitions.display(), "Malformed record");
            continue;
        };
        for form in index.forms_of(&record.term) {
            writeln!(out, "{}", encode_record(form, &record.values))?;
            summary.forms_written += 1;
        }
    }
    out.flush()?;
    info!(
        output = %output.display(),
        forms = summary.forms_written,
        "Conjugated definitions written"
    );
    Ok(summary)
}
