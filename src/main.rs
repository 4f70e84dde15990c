use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lexis::config::{ExtractOptions, DEFAULT_BATCH_SIZE};
use lexis::diagnostics::Diagnostics;
use lexis::extract::ExtractConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "lexis")]
#[command(about = "Extract bilingual definitions from Wiktionary dumps")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract definition records from a Wiktionary dump
    Extract(ExtractArgs),
    /// Process one file of raw wikitext and print the result as JSON
    Page(PageArgs),
    /// Find foreign words that have a given gloss (or index every gloss with --all)
    Lookup(LookupArgs),
    /// Give inflected forms the definitions of their lemma
    Conjugate(ConjugateArgs),
}

#[derive(Args)]
struct ExtractArgs {
    /// Path to the Wiktionary dump file (.xml or .xml.bz2)
    #[arg(short, long)]
    input: String,

    /// Output directory for record files
    #[arg(short, long)]
    output: String,

    /// Limit number of pages to process (for testing)
    #[arg(long)]
    limit: Option<u64>,

    /// Pages processed in parallel per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Skip titles containing a space
    #[arg(long)]
    no_multiword_titles: bool,

    /// Dry run - don't write output files
    #[arg(long)]
    dry_run: bool,

    /// Clear existing outputs before starting
    #[arg(long)]
    clean: bool,
}

#[derive(Args)]
struct PageArgs {
    /// File holding the page's wikitext
    file: PathBuf,

    /// Page title (defaults to the file stem)
    #[arg(long)]
    title: Option<String>,
}

#[derive(Args)]
struct LookupArgs {
    /// Gloss to search for
    #[arg(required_unless_present = "all")]
    word: Option<String>,

    /// Build the index for every gloss instead of looking up one word
    #[arg(long, conflicts_with = "word")]
    all: bool,

    /// Write the `--all` index to this file instead of stdout
    #[arg(long, requires = "all")]
    json_out: Option<PathBuf>,

    /// Directory written by `extract`
    #[arg(short, long)]
    dir: PathBuf,

    /// Only search one part of speech
    #[arg(long)]
    category: Option<String>,
}

#[derive(Args)]
struct ConjugateArgs {
    /// Directory written by `extract`
    #[arg(short, long)]
    dir: PathBuf,

    #[arg(long)]
    language: String,

    #[arg(long)]
    category: String,
}

fn run_extract(args: ExtractArgs) -> Result<()> {
    if args.clean {
        let output_path = Path::new(&args.output);
        if output_path.exists() {
            info!("Cleaning output directory: {}", args.output);
            fs::remove_dir_all(output_path)
                .with_context(|| format!("Failed to clean output directory: {}", args.output))?;
        }
    }

    let config = ExtractConfig {
        limit: args.limit,
        batch_size: args.batch_size,
        dry_run: args.dry_run,
        options: ExtractOptions {
            allow_multiword_titles: !args.no_multiword_titles,
            ..ExtractOptions::default()
        },
        ..ExtractConfig::new(args.input, args.output)
    };

    info!("Starting extraction pass");
    let start = Instant::now();
    let (stats, diagnostics) = lexis::extract::run_extraction(&config)?;
    let duration = start.elapsed();
    info!(duration_secs = duration.as_secs_f64(), "Extraction complete");

    println!();
    println!("=== Summary ===");
    println!("Extraction time:    {:.2}s", duration.as_secs_f64());
    println!();
    println!("Pages processed:    {}", stats.pages());
    println!("Pages skipped:      {}", stats.skipped());
    println!("Definitions:        {}", stats.definitions());
    println!("Conjugation refs:   {}", stats.conjugation_refs());
    println!("Relation terms:     {}", stats.relation_terms());
    println!("Translation refs:   {}", stats.translation_refs());
    println!("Unknown templates:  {}", stats.unknown_templates());
    println!("Low quality pages:  {}", stats.low_quality());
    println!("Records written:    {}", stats.records());
    print_top_unknown(&diagnostics);

    Ok(())
}

fn print_top_unknown(diagnostics: &Diagnostics) {
    let top = diagnostics.top_unknown();
    if top.is_empty() {
        return;
    }
    println!();
    println!("Most frequent unknown templates:");
    for (name, count) in top.iter().take(10) {
        println!("  {:<30} {}", name, count);
    }
}

fn run_page(args: PageArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read page: {}", args.file.display()))?;
    let title = match args.title {
        Some(title) => title,
        None => args
            .file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    let mut diagnostics = Diagnostics::new();
    let entry = lexis::entry::process_page(&title, &raw, &mut diagnostics);
    println!("{}", serde_json::to_string_pretty(&entry.to_json())?);
    if entry.quality.is_low_quality() {
        info!(title = %entry.title, "Page is low quality");
    }
    Ok(())
}

fn run_lookup(args: LookupArgs) -> Result<()> {
    let category = args.category.as_deref();
    if let Some(word) = args.word {
        let found = lexis::lookup::reverse_lookup(&args.dir, &word, category)?;
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }

    let index = lexis::lookup::reverse_index(&args.dir, category)?;
    match args.json_out {
        Some(path) => {
            lexis::lookup::write_reverse_index(&index, &path)?;
            info!(path = %path.display(), glosses = index.len(), "Reverse index written");
        }
        None => println!("{}", serde_json::to_string(&index)?),
    }
    Ok(())
}

fn run_conjugate(args: ConjugateArgs) -> Result<()> {
    let summary = lexis::crossref::apply_conjugations(&args.dir, &args.language, &args.category)?;
    println!("Lemmas:             {}", summary.lemmas);
    println!("Records copied:     {}", summary.records_copied);
    println!("Forms written:      {}", summary.forms_written);
    println!("Unresolved refs:    {}", summary.unresolved);
    println!("Output:             {}", summary.output.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let result = match cli.command {
        Commands::Extract(args) => run_extract(args),
        Commands::Page(args) => run_page(args),
        Commands::Lookup(args) => run_lookup(args),
        Commands::Conjugate(args) => run_conjugate(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
