use crate::entry::{Channel, LexiconEntry};
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics collected during the extraction process
#[derive(Default)]
pub struct ExtractionStats {
    pub pages_processed: AtomicU64,
    pub pages_skipped: AtomicU64,
    pub definitions_found: AtomicU64,
    pub conjugation_refs_found: AtomicU64,
    pub relation_terms_found: AtomicU64,
    pub translation_refs_found: AtomicU64,
    pub unknown_templates_found: AtomicU64,
    pub low_quality_pages: AtomicU64,
    pub records_written: AtomicU64,
}

impl ExtractionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_pages(&self) {
        self.pages_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped(&self) {
        self.pages_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_low_quality(&self) {
        self.low_quality_pages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_records(&self, count: u64) {
        self.records_written.fetch_add(count, Ordering::Relaxed);
    }

    /// Counts the distinct values of every bucket in `entry`.
    pub fn add_entry(&self, entry: &LexiconEntry) {
        for (key, values) in entry.buckets() {
            let n = values.len() as u64;
            let counter = match key.channel {
                Channel::Definitions | Channel::DefinitionsLong => &self.definitions_found,
                Channel::Conjugations | Channel::ConjugationTables => {
                    &self.conjugation_refs_found
                }
                Channel::Relation(_) => &self.relation_terms_found,
                Channel::ReverseTranslations => &self.translation_refs_found,
                Channel::UnknownTemplates => &self.unknown_templates_found,
            };
            counter.fetch_add(n, Ordering::Relaxed);
        }
        if entry.quality.is_low_quality() {
            self.inc_low_quality();
        }
    }

    pub fn pages(&self) -> u64 {
        self.pages_processed.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.pages_skipped.load(Ordering::Relaxed)
    }

    pub fn definitions(&self) -> u64 {
        self.definitions_found.load(Ordering::Relaxed)
    }

    pub fn conjugation_refs(&self) -> u64 {
        self.conjugation_refs_found.load(Ordering::Relaxed)
    }

    pub fn relation_terms(&self) -> u64 {
        self.relation_terms_found.load(Ordering::Relaxed)
    }

    pub fn translation_refs(&self) -> u64 {
        self.translation_refs_found.load(Ordering::Relaxed)
    }

    pub fn unknown_templates(&self) -> u64 {
        self.unknown_templates_found.load(Ordering::Relaxed)
    }

    pub fn low_quality(&self) -> u64 {
        self.low_quality_pages.load(Ordering::Relaxed)
    }

    pub fn records(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }
}
