//! `prettymark` - add `prettyprint` to every `<pre><code>` block of a site.

use anyhow::{Result, bail};
use facet::Facet;
use facet_args as args;
use owo_colors::OwoColorize;
use prettymark::{ProcessOptions, Processor, ProcessorStats};
use std::path::PathBuf;
use std::time::Instant;

/// Tag code blocks for pretty-printing, then colorize the newly tagged ones.
///
/// Pages already carrying `prettyprint` on every code block are left alone, so
/// running prettymark twice over the same site is harmless.
#[derive(Debug, Facet)]
struct Args {
    /// Site root to scan for *.html pages
    #[facet(args::positional)]
    site: PathBuf,

    /// Write the tagged copy here instead of rewriting the site root
    #[facet(args::positional, default)]
    output: Option<PathBuf>,

    /// Grammar for blocks that carry no lang-* or language-* class
    #[facet(args::named, args::short = 'l', default)]
    lang: Option<String>,

    /// Log each page as it is styled
    #[facet(args::named, args::short = 'v', default)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args: Args = facet_args::from_std_args()?;

    if !args.site.is_dir() {
        bail!("Site root is not a directory: {}", args.site.display());
    }

    let target = args.output.as_ref().unwrap_or(&args.site);
    eprintln!(
        "{} {} -> {}",
        "prettymark".green().bold(),
        args.site.display(),
        target.display()
    );
    if let Some(lang) = &args.lang {
        eprintln!("  untagged blocks highlighted as {}", lang.cyan());
    }

    let mut processor = Processor::new(ProcessOptions {
        input_dir: args.site.clone(),
        output_dir: args.output.clone(),
        default_language: args.lang.clone(),
        verbose: args.verbose,
    });

    let start = Instant::now();
    let stats = processor.process()?;
    summarize(&stats, start.elapsed().as_secs_f64());

    Ok(())
}

fn summarize(stats: &ProcessorStats, elapsed: f64) {
    eprintln!();
    eprintln!(
        "  pages   {} scanned, {} rewritten",
        stats.files_processed.to_string().cyan(),
        stats.files_modified.to_string().cyan()
    );
    eprintln!(
        "  blocks  {} seen, {} tagged prettyprint",
        stats.blocks_found.to_string().cyan(),
        stats.blocks_marked.to_string().green()
    );
    eprintln!(
        "  colors  {} highlighted, {} left plain, {} failed",
        stats.blocks_highlighted.to_string().green(),
        stats.blocks_skipped.to_string().yellow(),
        stats.blocks_failed.to_string().red()
    );

    if !stats.unsupported_languages.is_empty() {
        eprintln!(
            "  {} no grammar for: {}",
            "!".yellow(),
            stats.unsupported_languages.join(", ")
        );
    }
    if stats.walk_errors > 0 {
        eprintln!(
            "  {} {} paths could not be read",
            "!".yellow(),
            stats.walk_errors
        );
    }

    eprintln!("  done in {:.2}s", elapsed);
}
