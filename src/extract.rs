use crate::config::{ExtractOptions, DEFAULT_BATCH_SIZE, PROGRESS_INTERVAL};
use crate::diagnostics::Diagnostics;
use crate::entry::{process_page_with, LexiconEntry};
use crate::models::WikiPage;
use crate::parser::WikiReader;
use crate::stats::ExtractionStats;
use crate::writer::{write_diagnostics, LowQualityLog, RecordWriter};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub input: String,
    pub output: PathBuf,
    /// Stop after this many entry pages
    pub limit: Option<u64>,
    pub batch_size: usize,
    /// Process everything but write nothing
    pub dry_run: bool,
    pub options: ExtractOptions,
}

impl ExtractConfig {
    pub fn new(input: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            limit: None,
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
            options: ExtractOptions::default(),
        }
    }
}

struct Sinks {
    records: RecordWriter,
    low_quality: LowQualityLog,
}

/// Streams the dump at `config.input` and writes every page's records under
/// `config.output`.
pub fn run_extraction(config: &ExtractConfig) -> Result<(ExtractionStats, Diagnostics)> {
    let reader = WikiReader::new(&config.input, false)
        .with_context(|| format!("Failed to open wiki dump at: {}", config.input))?;
    info!(input = %config.input, output = %config.output.display(), "Extracting definitions");
    extract_pages(reader, config)
}

/// Batches `pages`, processes each batch on the rayon pool and writes the
/// results in input order.
pub fn extract_pages<I>(pages: I, config: &ExtractConfig) -> Result<(ExtractionStats, Diagnostics)>
where
    I: IntoIterator<Item = WikiPage>,
{
    let stats = ExtractionStats::new();
    let mut diagnostics = Diagnostics::new();

    let mut sinks = if config.dry_run {
        None
    } else {
        fs::create_dir_all(&config.output).with_context(|| {
            format!("Failed to create output directory: {}", config.output.display())
        })?;
        Some(Sinks {
            records: RecordWriter::new(&config.output),
            low_quality: LowQualityLog::create(&config.output)?,
        })
    };

    let pb = make_spinner();
    let batch_size = config.batch_size.max(1);
    let mut batch = Vec::with_capacity(batch_size);
    let mut taken = 0u64;

    for page in pages {
        if config.limit.is_some_and(|limit| taken >= limit) {
            debug!(limit = taken, "Page limit reached");
            break;
        }
        if !page.is_entry() {
            stats.inc_skipped();
            continue;
        }
        taken += 1;
        batch.push(page);
        if batch.len() >= batch_size {
            process_batch(&batch, config, &stats, &mut diagnostics, sinks.as_mut(), &pb)?;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        process_batch(&batch, config, &stats, &mut diagnostics, sinks.as_mut(), &pb)?;
    }
    pb.finish_and_clear();

    if let Some(sinks) = sinks {
        let records = sinks.records.finish()?;
        let low_quality = sinks.low_quality.finish()?;
        write_diagnostics(&config.output, &diagnostics)?;
        info!(records, low_quality, "Output written");
    }

    info!(
        pages = stats.pages(),
        skipped = stats.skipped(),
        definitions = stats.definitions(),
        "Extraction finished"
    );
    Ok((stats, diagnostics))
}

fn process_batch(
    batch: &[WikiPage],
    config: &ExtractConfig,
    stats: &ExtractionStats,
    diagnostics: &mut Diagnostics,
    sinks: Option<&mut Sinks>,
    pb: &ProgressBar,
) -> Result<()> {
    let results: Vec<(LexiconEntry, Diagnostics)> = batch
        .par_iter()
        .map(|page| {
            let mut local = Diagnostics::new();
            let text = page.text.as_deref().unwrap_or_default();
            let entry = process_page_with(&page.title, text, &config.options, &mut local);
            (entry, local)
        })
        .collect();

    let mut sinks = sinks;
    for (entry, local) in results {
        diagnostics.merge(local);
        stats.inc_pages();
        stats.add_entry(&entry);
        if let Some(sinks) = sinks.as_deref_mut() {
            let written = sinks.records.write_entry(&entry)?;
            stats.add_records(written);
            sinks.low_quality.record(&entry)?;
        }
        if stats.pages() % PROGRESS_INTERVAL == 0 {
            pb.set_message(format!("{} pages", stats.pages()));
            pb.tick();
        }
    }
    Ok(())
}

fn make_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageType;
    use tempfile::TempDir;

    fn page(id: u32, title: &str, text: &str) -> WikiPage {
        WikiPage {
            id,
            title: title.to_string(),
            ns: Some(0),
            timestamp: None,
            page_type: PageType::Article,
            text: Some(text.to_string()),
        }
    }

    fn pages() -> Vec<WikiPage> {
        vec![
            page(1, "frei", "==German==\n===Adjective===\n# [[free]]\n"),
            WikiPage {
                page_type: PageType::Redirect("frei".to_string()),
                ..page(2, "Frei", "#REDIRECT [[frei]]")
            },
            page(3, "gratis", "==German==\n===Adjective===\n# free, gratis\n"),
            page(4, "Ding", "==German==\n===Noun===\n# {{zzz}}\n"),
        ]
    }

    #[test]
    fn dry_run_counts_without_writing() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let config = ExtractConfig {
            dry_run: true,
            ..ExtractConfig::new("unused", &out)
        };
        let (stats, diagnostics) = extract_pages(pages(), &config).unwrap();
        assert_eq!(stats.pages(), 3);
        assert_eq!(stats.skipped(), 1);
        assert_eq!(stats.definitions(), 3);
        assert_eq!(stats.low_quality(), 1);
        assert_eq!(diagnostics.unknown_count("zzz"), 1);
        assert!(!out.exists());
    }

    #[test]
    fn output_is_in_input_order_across_batches() {
        let dir = TempDir::new().unwrap();
        let config = ExtractConfig {
            batch_size: 1,
            ..ExtractConfig::new("unused", dir.path())
        };
        let (stats, _) = extract_pages(pages(), &config).unwrap();
        assert_eq!(stats.records(), 3);

        let defs = fs::read_to_string(dir.path().join("German/definitions.Adjective")).unwrap();
        assert_eq!(defs, "frei:free\ngratis:free,gratis\n");
        assert!(dir.path().join("template_counts.csv").exists());
        assert!(dir.path().join("low_quality.jsonl").exists());
    }

    #[test]
    fn limit_stops_early() {
        let dir = TempDir::new().unwrap();
        let config = ExtractConfig {
            limit: Some(1),
            dry_run: true,
            ..ExtractConfig::new("unused", dir.path())
        };
        let (stats, _) = extract_pages(pages(), &config).unwrap();
        assert_eq!(stats.pages(), 1);
    }
}
