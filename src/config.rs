/// Progress update interval (tick every N pages)
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Pages handed to the rayon pool at once
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Record files kept open by the writer before the handle cache is flushed
pub const MAX_OPEN_WRITERS: usize = 512;

/// Highest positional index scanned by the relation-list rule
pub const RELATION_MAX_INDEX: usize = 100;

/// Definition-marker character that starts every sense line
pub const DEFINITION_MARKER: char = '#';

/// Words stripped from either end of a gloss by `segment::canonicalize`
pub const STOP_WORDS: &[&str] = &["a", "an", "the", "to", "be"];

/// A comma part equal to one of these means the text is prose, not a list
pub const SENTENCE_GUARD_WORDS: &[&str] = &["and", "of"];

/// More comma parts than this keeps the text whole
pub const MAX_COMMA_PARTS: usize = 5;

/// A comma part with more spaces than this keeps the text whole
pub const MAX_PART_SPACES: usize = 5;

/// Characters dropped from a gloss unless it contains an ellipsis
pub const NOISE_CHARS: &[char] = &['“', '”', '!', '.', ':', '?', '"'];

/// Tunable thresholds for the definition segmenter.
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    pub stop_words: Vec<String>,
    pub guard_words: Vec<String>,
    pub max_comma_parts: usize,
    pub max_part_spaces: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            guard_words: SENTENCE_GUARD_WORDS.iter().map(|w| w.to_string()).collect(),
            max_comma_parts: MAX_COMMA_PARTS,
            max_part_spaces: MAX_PART_SPACES,
        }
    }
}

/// Per-run switches for page processing.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Process titles that contain a space ("ice cream")
    pub allow_multiword_titles: bool,
    pub segmenter: SegmenterConfig,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            allow_multiword_titles: true,
            segmenter: SegmenterConfig::default(),
        }
    }
}

/// Buffer size for each open record file
pub const WRITER_BUFFER_SIZE: usize = 64 * 1024;
