//! Lexis: Wiktionary dump to bilingual definition records
//!
//! Reads a MediaWiki XML export of Wiktionary and, for every entry page,
//! pulls the gloss text out of each definition line, grouped by the
//! language and part-of-speech headings it appears under:
//!
//! 1. **Markup** -- Definition lines are split into text, links and
//!    templates, with templates that span several input lines joined first
//! 2. **Rendering** -- Each template is looked up in an ordered rule table
//!    that decides whether it renders text, is suppressed, or is routed to a
//!    side channel (conjugation refs, relation lists, translations, unknown)
//! 3. **Segmentation** -- Rendered glosses are split into short definitions
//!    unless they read like a sentence
//! 4. **Output** -- Records of the form `term:gloss,gloss` are appended to
//!    `<out>/<language>/<channel>.<category>`
//!
//! # Architecture
//!
//! - **Streaming XML parsing** -- The dump is never loaded into memory
//! - **Parallel extraction** -- rayon processes page batches; results are
//!   written in input order
//! - **Infallible core** -- Malformed markup degrades to text; unknown
//!   templates are counted, never fatal
//! - **Atomic counters** -- Lock-free statistics during extraction
//!
//! # Key Modules
//!
//! - [`parser`] -- Streaming XML parser with BZ2 decompression
//! - [`markup`] -- Template and link tree for one line of wikitext
//! - [`templates`] -- Ordered template dispatch rules
//! - [`render`] -- Recursive template rendering with side channels
//! - [`segment`] -- Gloss segmentation and canonicalization
//! - [`header`] -- Language / part-of-speech heading tracking
//! - [`entry`] -- Per-page aggregation into a [`entry::LexiconEntry`]
//! - [`record`] -- Escaped `term:values` record lines
//! - [`writer`] -- Record files and diagnostics reports
//! - [`extract`] -- Batched parallel extraction driver
//! - [`crossref`] -- Inflected forms inherit their lemma's glosses
//! - [`lookup`] -- Reverse lookup from a gloss to foreign words
//! - [`diagnostics`] -- Template usage counters
//! - [`stats`] -- Thread-safe atomic counters for extraction metrics
//! - [`config`] -- Constants and tunable thresholds
//!
//! # Example Usage
//!
//! ```bash
//! # Extract every entry of a dump
//! lexis extract -i enwiktionary-latest-pages-articles.xml.bz2 -o output/
//!
//! # Inspect one page
//! lexis page frei.wiki --title frei
//!
//! # Give Spanish verb forms the glosses of their infinitive
//! lexis conjugate -d output/ --language Spanish --category Verb
//!
//! # Which words mean "free"?
//! lexis lookup free -d output/
//! ```

pub mod config;
pub mod crossref;
pub mod diagnostics;
pub mod entry;
pub mod extract;
pub mod header;
pub mod lookup;
pub mod markup;
pub mod models;
pub mod parser;
pub mod record;
pub mod render;
pub mod segment;
pub mod stats;
pub mod templates;
pub mod writer;
