//! Per-page scan: headers set the (language, category) context and every
//! definition line is rendered, segmented and folded into a [`LexiconEntry`].

use crate::config::{ExtractOptions, DEFINITION_MARKER};
use crate::diagnostics::Diagnostics;
use crate::header::{HeaderEvent, HeaderTracker};
use crate::markup::{join_template_lines, strip_html};
use crate::render::{render_markup, RenderResult};
use crate::segment::segment_with;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// Key used in JSON output for a bucket recorded before any heading.
const UNSET_KEY: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// Single-word glosses
    Definitions,
    /// Glosses containing a space
    DefinitionsLong,
    Conjugations,
    /// Relation list under its short key (`syn`, `ant`, `hyp`, ...)
    Relation(String),
    ConjugationTables,
    ReverseTranslations,
    UnknownTemplates,
}

impl Channel {
    pub fn name(&self) -> &str {
        match self {
            Channel::Definitions => "definitions",
            Channel::DefinitionsLong => "definitions_long",
            Channel::Conjugations => "conjugations",
            Channel::Relation(key) => key,
            Channel::ConjugationTables => "conjugation_tables",
            Channel::ReverseTranslations => "reverse_translations",
            Channel::UnknownTemplates => "unknown_templates",
        }
    }

    /// Whether content here shows the page was understood.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Channel::UnknownTemplates)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub language: Option<String>,
    pub category: Option<String>,
    pub channel: Channel,
}

/// Counted values, iterated in first-seen order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Multiset {
    counts: IndexMap<String, u64>,
}

impl Multiset {
    pub fn add(&mut self, value: &str) {
        match self.counts.get_mut(value) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(value.to_string(), 1);
            }
        }
    }

    pub fn count(&self, value: &str) -> u64 {
        self.counts.get(value).copied().unwrap_or(0)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PageQuality {
    /// Languages with definition lines but nothing extracted from them
    pub low_quality_languages: Vec<String>,
    pub good_languages: Vec<String>,
    pub has_definition_marker: bool,
    pub has_accepted_content: bool,
}

impl PageQuality {
    pub fn is_low_quality(&self) -> bool {
        self.has_definition_marker && !self.has_accepted_content
    }
}

/// Everything extracted from one page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LexiconEntry {
    pub title: String,
    buckets: IndexMap<BucketKey, Multiset>,
    pub quality: PageQuality,
}

impl LexiconEntry {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    /// Adds one value, creating its bucket on first use. Blank values are dropped.
    pub fn record(
        &mut self,
        language: Option<&str>,
        category: Option<&str>,
        channel: Channel,
        value: &str,
    ) -> bool {
        if value.trim().is_empty() {
            return false;
        }
        let key = BucketKey {
            language: language.map(str::to_string),
            category: category.map(str::to_string),
            channel,
        };
        self.buckets.entry(key).or_default().add(value);
        true
    }

    pub fn get(&self, language: &str, category: &str, channel: &Channel) -> Option<&Multiset> {
        self.buckets.iter().find_map(|(key, values)| {
            (key.language.as_deref() == Some(language)
                && key.category.as_deref() == Some(category)
                && &key.channel == channel)
                .then_some(values)
        })
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&BucketKey, &Multiset)> {
        self.buckets.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Nested `{language: {category: {channel: {value: count}}}}` view.
    pub fn to_json(&self) -> Value {
        let mut root = Map::new();
        for (key, values) in &self.buckets {
            let language = key.language.as_deref().unwrap_or(UNSET_KEY);
            let category = key.category.as_deref().unwrap_or(UNSET_KEY);
            let counts: Map<String, Value> = values
                .iter()
                .map(|(v, n)| (v.to_string(), Value::from(n)))
                .collect();
            let by_category = root
                .entry(language)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(by_category) = by_category {
                let by_channel = by_category
                    .entry(category)
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(by_channel) = by_channel {
                    by_channel.insert(key.channel.to_string(), Value::Object(counts));
                }
            }
        }
        Value::Object(root)
    }
}

#[derive(Default)]
struct PageContext {
    header: HeaderTracker,
    has_word: bool,
    has_definition_marker: bool,
}

impl PageContext {
    fn reset(&mut self) {
        self.has_word = false;
        self.has_definition_marker = false;
    }

    fn close_language(&mut self, language: &str, quality: &mut PageQuality) {
        if !language.is_empty() {
            if self.has_definition_marker && !self.has_word {
                quality.low_quality_languages.push(language.to_string());
            } else {
                quality.good_languages.push(language.to_string());
            }
        }
        self.reset();
    }
}

pub fn process_page(title: &str, raw: &str, diagnostics: &mut Diagnostics) -> LexiconEntry {
    process_page_with(title, raw, &ExtractOptions::default(), diagnostics)
}

pub fn process_page_with(
    title: &str,
    raw: &str,
    options: &ExtractOptions,
    diagnostics: &mut Diagnostics,
) -> LexiconEntry {
    let title = title.trim();
    let mut entry = LexiconEntry::new(title);
    if !options.allow_multiword_titles && title.contains(' ') {
        return entry;
    }

    let text = join_template_lines(raw);
    let mut ctx = PageContext::default();

    for line in text.lines() {
        if let Some(HeaderEvent::Language { previous, .. }) = ctx.header.observe(line) {
            match previous {
                Some(previous) => ctx.close_language(&previous, &mut entry.quality),
                // lines above the first language heading belong to no language
                None => ctx.reset(),
            }
        }

        if !line.starts_with(DEFINITION_MARKER) {
            continue;
        }
        ctx.has_definition_marker = true;
        entry.quality.has_definition_marker = true;

        let (result, definitions) = render_definition_line(line, options, diagnostics);
        let language = ctx.header.language();
        let category = ctx.header.category();
        let accepted = fold_line(&mut entry, language, category, result, definitions);
        if accepted {
            ctx.has_word = true;
            entry.quality.has_accepted_content = true;
        }
    }

    if let Some(language) = ctx.header.language().map(str::to_string) {
        ctx.close_language(&language, &mut entry.quality);
    }

    if entry.quality.is_low_quality() {
        debug!(title = %entry.title, "Definition lines yielded nothing");
    }
    entry
}

/// A sense line is `# gloss`; `#:` examples and `#*` quotations carry no gloss text.
fn is_sense_line(line: &str) -> bool {
    line.chars()
        .nth(1)
        .is_some_and(|c| c == ' ' || c.is_alphabetic())
}

fn render_definition_line(
    line: &str,
    options: &ExtractOptions,
    diagnostics: &mut Diagnostics,
) -> (RenderResult, Vec<String>) {
    let body = line.trim_start_matches(['#', '*', ':', ';']);
    let body = strip_html(body);
    let result = render_markup(&body, diagnostics);
    let definitions = if is_sense_line(line) {
        segment_with(&result.text, &options.segmenter)
    } else {
        Vec::new()
    };
    (result, definitions)
}

fn fold_line(
    entry: &mut LexiconEntry,
    language: Option<&str>,
    category: Option<&str>,
    result: RenderResult,
    definitions: Vec<String>,
) -> bool {
    let mut accepted = false;
    let mut put = |channel: Channel, value: &str| {
        let recorded = entry.record(language, category, channel.clone(), value);
        accepted |= recorded && channel.is_accepted();
    };

    for definition in &definitions {
        let channel = if definition.contains(' ') {
            Channel::DefinitionsLong
        } else {
            Channel::Definitions
        };
        put(channel, definition);
    }
    for reference in &result.conjugation_refs {
        put(Channel::Conjugations, reference);
    }
    for (key, terms) in &result.relation_terms {
        for term in terms {
            put(Channel::Relation(key.clone()), term);
        }
    }
    for table in &result.conjugation_tables {
        put(Channel::ConjugationTables, table);
    }
    for reference in &result.reverse_translation_refs {
        put(Channel::ReverseTranslations, reference);
    }
    for template in &result.unknown_templates {
        put(Channel::UnknownTemplates, template);
    }
    accepted
}
