//! Mark `<pre><code>` blocks in rendered HTML for pretty-printing.
//!
//! Highlighters in the google-code-prettify tradition only touch code blocks
//! that carry the `prettyprint` class. This crate finds every `<pre>` that
//! directly wraps a `<code>` element, adds that class where it is missing,
//! and runs a highlighting engine once if anything was marked.
//!
//! # Usage
//!
//! ```bash
//! prettymark ./site ./site-highlighted --lang python
//! ```
//!
//! ```rust,ignore
//! use prettymark::{ArboriumEngine, HtmlDocument, style_code};
//!
//! let mut page = HtmlDocument::parse(html)?;
//! let Ok(report) = style_code(&mut page, &mut ArboriumEngine::new());
//! if report.newly_marked > 0 {
//!     std::fs::write(path, page.render()?)?;
//! }
//! ```
//!
//! # How it works
//!
//! 1. **Marking**: [`style_code`] works against any [`CodeDocument`], adding
//!    the `prettyprint` class to unmarked containers. Running it twice is a
//!    no-op, and the engine is never invoked when nothing was marked.
//!
//! 2. **HTML**: [`HtmlDocument`] scans the page with lol_html, records every
//!    `<pre>` and writes all class and body changes back in a single rewrite.
//!
//! 3. **Highlighting**: [`ArboriumEngine`] replaces the body of each newly
//!    marked block with tree-sitter highlighted HTML and tags it
//!    `prettyprinted` so it is never highlighted twice.

pub mod dom;
mod engine;
mod html;
mod processor;
mod styler;

pub use dom::{NodeId, Tree};
pub use engine::{ArboriumEngine, EngineStats};
pub use html::{BlockId, HIGHLIGHTED_CLASS, HtmlDocument, TransformError};
pub use processor::{ProcessError, ProcessOptions, Processor, ProcessorStats};
pub use styler::{CodeDocument, HighlightEngine, MARKER_CLASS, StyleReport, style_code};
