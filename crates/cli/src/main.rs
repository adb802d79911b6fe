mod echo;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::Context;
use blogsift_core::{
    AlignStrategy, Article, Document, Element, ExtractConfig, ExtractedContent, WeightMetric, content_tree,
    extract_from_roots, process_articles, remove_common_text, sanitize,
};
use clap::Parser;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::echo::{
    Stage, print_banner, print_extraction_details, print_page, print_stage, print_success, print_timing_summary,
    print_warning,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for extracted content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Html,
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {}. Valid options: html, text, json", s)),
        }
    }
}

/// Extract blog article bodies by diffing pages that share a template
#[derive(Parser, Debug)]
#[command(name = "blogsift")]
#[command(author = "Blogsift Contributors")]
#[command(version)]
#[command(about = "Extract blog article bodies by diffing pages of one template", long_about = None)]
struct Args {
    /// HTML pages rendered from the same template (at least two)
    #[arg(value_name = "PAGES", num_args = 2.., required = true)]
    pages: Vec<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (html, text, json)
    #[arg(short, long, default_value = "html", value_name = "FORMAT")]
    format: OutputFormat,

    /// Candidate weighting (constant, text-length, markup-length)
    #[arg(long, default_value = "constant", value_name = "METRIC")]
    metric: WeightMetric,

    /// Share of the total weight a subtree needs to be selected
    #[arg(long, default_value = "0.5", value_name = "RATIO")]
    threshold: f64,

    /// Only count differing text, not differing elements
    #[arg(long)]
    text_only: bool,

    /// Common prefix/suffix length that must be exceeded before it is stripped
    #[arg(long, default_value = "0", value_name = "NUM")]
    min_common: usize,

    /// Keep images in text output
    #[arg(long)]
    keep_images: bool,

    /// Row alignment (structural, matching)
    #[arg(long, default_value = "structural", value_name = "STRATEGY")]
    strategy: AlignStrategy,

    /// Print the content tree outline of every page to stderr
    #[arg(long)]
    outline: bool,

    /// JSON array of feed articles, one per page, to fill in from the pages
    #[arg(long, value_name = "FILE")]
    articles: Option<PathBuf>,

    /// Always diff the pages when processing articles
    #[arg(long, requires = "articles")]
    force_diff: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Extraction result of one page in JSON output
#[derive(Debug, Serialize)]
struct PageOutput {
    source: String,
    #[serde(flatten)]
    extracted: ExtractedContent,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,blogsift=debug,blogsift_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Extracts every page, each one in turn taking the baseline column.
fn extract_all(
    documents: &[Document],
    sources: &[String],
    config: &ExtractConfig,
    outline: bool,
) -> anyhow::Result<Vec<ExtractedContent>> {
    let mut results = Vec::with_capacity(documents.len());

    for baseline in 0..documents.len() {
        let roots: Vec<Element<'_>> = (0..documents.len())
            .map(|offset| documents[(baseline + offset) % documents.len()].root())
            .collect();

        let extracted = extract_from_roots(&roots, config)
            .with_context(|| format!("Failed to extract content from {}", sources[baseline]))?;

        if outline && let Some(tree) = content_tree(&roots, config)? {
            eprintln!("{}", sources[baseline].bold());
            eprintln!("{}\n", tree.debug_outline(extracted.threshold));
        }
        if extracted.content.is_empty() {
            print_warning(&format!("No content extracted from {}", sources[baseline]));
        }

        results.push(extracted);
    }

    Ok(results)
}

fn render(args: &Args, sources: &[String], results: Vec<ExtractedContent>) -> anyhow::Result<String> {
    let output = match args.format {
        OutputFormat::Html => results
            .iter()
            .map(|extracted| extracted.content.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Text => {
            let texts: Vec<String> = results
                .iter()
                .map(|extracted| sanitize(&extracted.content, args.keep_images))
                .collect();
            remove_common_text(&texts, args.min_common).join("\n")
        }
        OutputFormat::Json => {
            let pages: Vec<PageOutput> = sources
                .iter()
                .cloned()
                .zip(results)
                .map(|(source, extracted)| PageOutput { source, extracted })
                .collect();
            serde_json::to_string_pretty(&pages).context("Failed to serialize JSON")?
        }
    };

    Ok(output + "\n")
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let start = Instant::now();
    let mut timings: Vec<(String, Duration)> = Vec::new();

    if args.verbose {
        let strategy = match args.strategy {
            AlignStrategy::Structural => "structural",
            AlignStrategy::Matching(_) => "matching",
        };
        print_banner(args.pages.len(), strategy);
        print_stage(Stage::Read, &format!("Reading {} pages", args.pages.len()));
    }

    let step = Instant::now();
    let pages = args
        .pages
        .iter()
        .map(|path| read_file(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let sources: Vec<String> = args.pages.iter().map(|path| path.display().to_string()).collect();
    timings.push(("Read".to_string(), step.elapsed()));

    if args.verbose {
        for (source, page) in sources.iter().zip(&pages) {
            print_page(source, page);
        }
        eprintln!();
    }

    let config = ExtractConfig::builder()
        .include_elements(!args.text_only)
        .weight_metric(args.metric)
        .threshold_ratio(args.threshold)
        .min_common_characters(args.min_common)
        .keep_images(args.keep_images)
        .force_diff(args.force_diff)
        .strategy(args.strategy.clone())
        .build();
    tracing::debug!(?config, "extraction config");

    let output = if let Some(path) = &args.articles {
        if args.verbose {
            print_stage(Stage::Articles, "Filling in feed articles from their pages");
        }

        let json = read_file(path)?;
        let mut articles: Vec<Article> =
            serde_json::from_str(&json).with_context(|| format!("Failed to parse articles: {}", path.display()))?;
        anyhow::ensure!(
            articles.len() == pages.len(),
            "Expected one article per page, got {} articles for {} pages",
            articles.len(),
            pages.len()
        );

        let step = Instant::now();
        process_articles(&mut articles, &pages, &config).context("Failed to process articles")?;
        timings.push(("Process".to_string(), step.elapsed()));

        serde_json::to_string_pretty(&articles).context("Failed to serialize JSON")? + "\n"
    } else {
        if args.verbose {
            print_stage(Stage::Sift, "Aligning pages and extracting main content");
        }

        let step = Instant::now();
        let documents = pages
            .iter()
            .zip(&args.pages)
            .map(|(page, path)| {
                Document::parse(page).with_context(|| format!("Failed to parse HTML: {}", path.display()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        timings.push(("Parse".to_string(), step.elapsed()));

        let step = Instant::now();
        let results = extract_all(&documents, &sources, &config, args.outline)?;
        timings.push(("Extract".to_string(), step.elapsed()));

        if args.verbose {
            for (source, extracted) in sources.iter().zip(&results) {
                print_extraction_details(source, extracted);
            }
            eprintln!();
        }

        render(&args, &sources, results)?
    };

    if args.verbose {
        print_stage(Stage::Write, "Writing output");
        eprintln!(
            "  {} {}",
            "Format:".dimmed(),
            format!("{:?}", args.format).bright_white()
        );
        print_timing_summary(start.elapsed(), &timings);
    }

    match &args.output {
        Some(path) => {
            fs::write(path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => {
            print!("{}", output);
        }
    }

    Ok(())
}
