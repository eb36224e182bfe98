//! Main processor that styles every HTML page of a directory tree.

use crate::engine::ArboriumEngine;
use crate::html::{HtmlDocument, TransformError};
use crate::styler::{StyleReport, style_code};
use arborium::GrammarStore;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// Options for the processor.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Input directory containing rendered HTML.
    pub input_dir: PathBuf,
    /// Output directory (if None, modifies in place).
    pub output_dir: Option<PathBuf>,
    /// Language for code blocks that don't name one.
    pub default_language: Option<String>,
    /// Whether to show verbose output.
    pub verbose: bool,
}

/// Statistics from processing.
#[derive(Debug, Default)]
pub struct ProcessorStats {
    /// Number of HTML files processed.
    pub files_processed: usize,
    /// Number of HTML files rewritten.
    pub files_modified: usize,
    /// Paths the directory walk could not read.
    pub walk_errors: usize,
    /// Number of `<pre><code>` containers found.
    pub blocks_found: usize,
    /// Number of containers that received the `prettyprint` class.
    pub blocks_marked: usize,
    /// Number of code blocks highlighted.
    pub blocks_highlighted: usize,
    /// Number of marked code blocks left unhighlighted.
    pub blocks_skipped: usize,
    /// Number of code blocks arborium failed on despite knowing the language.
    pub blocks_failed: usize,
    /// Languages that were not supported.
    pub unsupported_languages: Vec<String>,
    /// Time spent processing HTML files (excludes clone time).
    pub process_duration: Duration,
}

/// Outcome of styling a single file.
#[derive(Debug, Default)]
struct FileOutcome {
    report: StyleReport,
    written: bool,
}

/// Processor for a directory of HTML pages.
pub struct Processor {
    options: ProcessOptions,
}

impl Processor {
    /// Create a new processor with the given options.
    pub fn new(options: ProcessOptions) -> Self {
        Self { options }
    }

    /// Style every HTML file under the output directory.
    pub fn process(&mut self) -> Result<ProcessorStats, ProcessError> {
        let output_dir = self
            .options
            .output_dir
            .as_ref()
            .unwrap_or(&self.options.input_dir);

        if let Some(ref out) = self.options.output_dir
            && out != &self.options.input_dir
        {
            // Clean slate
            if out.exists() {
                fs::remove_dir_all(out)?;
            }

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(spinner_style());
            spinner.set_message("Cloning directory tree...");
            spinner.enable_steady_tick(Duration::from_millis(80));

            clonetree::clone_tree(&self.options.input_dir, out, &clonetree::Options::new())
                .map_err(|e| ProcessError::Io(std::io::Error::other(e.to_string())))?;

            spinner.finish_with_message("Clone complete");
        }

        let mut walk_errors = 0;
        let html_files: Vec<PathBuf> = WalkDir::new(output_dir)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    eprintln!("Warning: Skipping unreadable path: {}", e);
                    walk_errors += 1;
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "html"))
            .map(|e| e.path().to_path_buf())
            .collect();

        let store = Arc::new(GrammarStore::new());

        let progress = ProgressBar::new(html_files.len() as u64);
        progress.set_style(bar_style());

        let process_start = Instant::now();

        let files_processed = AtomicUsize::new(0);
        let files_modified = AtomicUsize::new(0);
        let blocks_found = AtomicUsize::new(0);
        let blocks_marked = AtomicUsize::new(0);
        let blocks_highlighted = AtomicUsize::new(0);
        let blocks_skipped = AtomicUsize::new(0);
        let blocks_failed = AtomicUsize::new(0);
        let unsupported_languages = Mutex::new(Vec::<String>::new());

        let verbose = self.options.verbose;
        let default_language = self.options.default_language.clone();

        // One engine per worker thread, all sharing the grammar store
        html_files.par_iter().for_each_init(
            || {
                let engine = ArboriumEngine::with_store(store.clone());
                match &default_language {
                    Some(lang) => engine.default_language(lang.clone()),
                    None => engine,
                }
            },
            |engine, path| {
                if verbose {
                    progress.println(format!("Processing: {}", path.display()));
                }

                match Self::process_html_file(path, engine) {
                    Ok(outcome) => {
                        files_processed.fetch_add(1, Ordering::Relaxed);
                        if outcome.written {
                            files_modified.fetch_add(1, Ordering::Relaxed);
                        }
                        blocks_found.fetch_add(outcome.report.matched, Ordering::Relaxed);
                        blocks_marked.fetch_add(outcome.report.newly_marked, Ordering::Relaxed);
                    }
                    Err(e) => {
                        progress.println(format!(
                            "Warning: Failed to process {}: {}",
                            path.display(),
                            e
                        ));
                    }
                }

                let stats = engine.take_stats();
                blocks_highlighted.fetch_add(stats.blocks_highlighted, Ordering::Relaxed);
                blocks_skipped.fetch_add(stats.blocks_skipped, Ordering::Relaxed);
                blocks_failed.fetch_add(stats.blocks_failed, Ordering::Relaxed);
                if !stats.unsupported_languages.is_empty() {
                    let mut langs = unsupported_languages
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    for lang in stats.unsupported_languages {
                        if !langs.contains(&lang) {
                            langs.push(lang);
                        }
                    }
                }
                progress.inc(1);
            },
        );

        let process_duration = process_start.elapsed();
        progress.finish_and_clear();

        let mut unsupported_languages = unsupported_languages
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        unsupported_languages.sort();

        Ok(ProcessorStats {
            files_processed: files_processed.load(Ordering::Relaxed),
            files_modified: files_modified.load(Ordering::Relaxed),
            blocks_found: blocks_found.load(Ordering::Relaxed),
            blocks_marked: blocks_marked.load(Ordering::Relaxed),
            blocks_highlighted: blocks_highlighted.load(Ordering::Relaxed),
            blocks_skipped: blocks_skipped.load(Ordering::Relaxed),
            blocks_failed: blocks_failed.load(Ordering::Relaxed),
            walk_errors,
            unsupported_languages,
            process_duration,
        })
    }

    /// Style a single HTML file in place.
    fn process_html_file(
        path: &Path,
        engine: &mut ArboriumEngine,
    ) -> Result<FileOutcome, ProcessError> {
        let html = fs::read_to_string(path)?;

        // Quick check: skip lol_html parsing if there's no code element at all
        if !mentions_code_tag(&html) {
            return Ok(FileOutcome::default());
        }

        let mut document = HtmlDocument::parse(&html)?;
        let Ok(report) = style_code(&mut document, engine);

        // Only write if we actually changed something
        let written = report.newly_marked > 0;
        if written {
            fs::write(path, document.render()?)?;
        }

        Ok(FileOutcome { report, written })
    }
}

/// Whether `html` contains a `<code` tag opener in any letter case.
fn mentions_code_tag(html: &str) -> bool {
    html.as_bytes()
        .windows(5)
        .any(|w| w.eq_ignore_ascii_case(b"<code"))
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
        .map(|style| style.progress_chars("█▉▊▋▌▍▎▏  "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Errors that can occur during processing.
#[derive(Debug)]
pub enum ProcessError {
    /// IO error.
    Io(std::io::Error),
    /// HTML transformation error.
    Transform(TransformError),
}

impl From<std::io::Error> for ProcessError {
    fn from(e: std::io::Error) -> Self {
        ProcessError::Io(e)
    }
}

impl From<TransformError> for ProcessError {
    fn from(e: TransformError) -> Self {
        ProcessError::Transform(e)
    }
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessError::Io(e) => write!(f, "IO error: {}", e),
            ProcessError::Transform(e) => write!(f, "Transform error: {}", e),
        }
    }
}

impl std::error::Error for ProcessError {}
