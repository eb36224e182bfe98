//! [`CodeDocument`] over a rendered HTML page.
//!
//! The page is scanned once with lol_html when it is parsed. Every `<pre>`
//! element is recorded in document order together with what the styler and
//! the engine need to know about it: its classes, its direct `<code>` child
//! and that child's text. Class additions and highlighted bodies are kept
//! alongside and written out in a single rewrite by [`HtmlDocument::render`].

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use lol_html::errors::RewritingError;
use lol_html::html_content::{ContentType, Element, EndTag};
use lol_html::{HandlerResult, RewriteStrSettings, comments, element, rewrite_str, text};

use crate::styler::CodeDocument;

/// Class the engine adds to a container once its code has been highlighted.
pub const HIGHLIGHTED_CLASS: &str = "prettyprinted";

/// Class prefixes that name the language of a code block.
const LANGUAGE_PREFIXES: [&str; 2] = ["language-", "lang-"];

/// Handle to a `<pre>` element of an [`HtmlDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

#[derive(Debug, Default)]
struct PreElement {
    /// `class` attribute as written in the source.
    class_attr: Option<String>,
    classes: Vec<String>,
    added: Vec<String>,
    code_children: usize,
    code_has_markup: bool,
    code_classes: Vec<String>,
    /// Raw, still entity-encoded text of the `<code>` child.
    code_text: String,
    highlighted: Option<String>,
}

impl PreElement {
    fn new(class_attr: Option<String>) -> Self {
        let classes = split_classes(class_attr.as_deref());
        Self {
            class_attr,
            classes,
            ..Self::default()
        }
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().chain(&self.added).any(|c| c == class)
    }

    fn is_container(&self) -> bool {
        self.code_children > 0
    }

    fn is_modified(&self) -> bool {
        !self.added.is_empty() || self.highlighted.is_some()
    }

    /// New `class` attribute value: the original text plus added classes.
    fn class_value(&self) -> String {
        let added = self.added.join(" ");
        match self.class_attr.as_deref().map(str::trim_end) {
            Some(original) if !original.trim_start().is_empty() => {
                format!("{original} {added}")
            }
            _ => added,
        }
    }
}

fn split_classes(attr: Option<&str>) -> Vec<String> {
    attr.map(|a| a.split_ascii_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn language_of(classes: &[String]) -> Option<&str> {
    classes.iter().find_map(|class| {
        LANGUAGE_PREFIXES
            .iter()
            .find_map(|prefix| class.strip_prefix(prefix))
            .filter(|lang| !lang.is_empty())
    })
}

/// Stack of currently open `<pre>` elements, popped by end-tag handlers.
#[derive(Clone, Default)]
struct OpenPres(Rc<RefCell<Vec<usize>>>);

impl OpenPres {
    fn enter(&self, el: &mut Element<'_, '_>, index: usize) {
        // Void and self-closing elements have no end tag to pop on.
        if let Some(handlers) = el.end_tag_handlers() {
            self.0.borrow_mut().push(index);
            let open = self.0.clone();
            handlers.push(Box::new(move |_: &mut EndTag<'_>| -> HandlerResult {
                open.borrow_mut().pop();
                Ok(())
            }));
        }
    }

    fn innermost(&self) -> Option<usize> {
        self.0.borrow().last().copied()
    }
}

/// A parsed HTML page whose code blocks can be styled and highlighted.
#[derive(Debug)]
pub struct HtmlDocument {
    source: String,
    pres: Vec<PreElement>,
}

impl HtmlDocument {
    /// Scan `html` for `<pre>` elements and their `<code>` children.
    pub fn parse(html: &str) -> Result<Self, TransformError> {
        let pres = RefCell::new(Vec::<PreElement>::new());
        let open = OpenPres::default();

        rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    // Registered before the `pre` handler so a `<pre>` nested
                    // inside code counts against the outer block.
                    element!("pre > code *", |_el| {
                        if let Some(index) = open.innermost() {
                            pres.borrow_mut()[index].code_has_markup = true;
                        }
                        Ok(())
                    }),
                    element!("pre", |el| {
                        let index = {
                            let mut pres = pres.borrow_mut();
                            pres.push(PreElement::new(el.get_attribute("class")));
                            pres.len() - 1
                        };
                        open.enter(el, index);
                        Ok(())
                    }),
                    element!("pre > code", |el| {
                        if let Some(index) = open.innermost() {
                            let mut pres = pres.borrow_mut();
                            let pre = &mut pres[index];
                            if pre.code_children == 0 {
                                pre.code_classes =
                                    split_classes(el.get_attribute("class").as_deref());
                            }
                            pre.code_children += 1;
                        }
                        Ok(())
                    }),
                    // Comments would be lost when the body is replaced.
                    comments!("pre > code", |_comment| {
                        if let Some(index) = open.innermost() {
                            pres.borrow_mut()[index].code_has_markup = true;
                        }
                        Ok(())
                    }),
                    text!("pre > code", |chunk| {
                        if let Some(index) = open.innermost() {
                            pres.borrow_mut()[index].code_text.push_str(chunk.as_str());
                        }
                        Ok(())
                    }),
                ],
                strict: false,
                ..RewriteStrSettings::default()
            },
        )?;

        Ok(Self {
            source: html.to_string(),
            pres: pres.into_inner(),
        })
    }

    /// The HTML this document was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether any class or code body changed since parsing.
    pub fn is_modified(&self) -> bool {
        self.pres.iter().any(PreElement::is_modified)
    }

    /// Classes of `block`, original ones first.
    pub fn classes(&self, block: BlockId) -> impl Iterator<Item = &str> {
        let pre = &self.pres[block.0];
        pre.classes.iter().chain(&pre.added).map(String::as_str)
    }

    /// Containers carrying `marker` whose code is ready to be highlighted.
    ///
    /// A block qualifies when it has exactly one `<code>` child without nested
    /// elements or comments and hasn't been highlighted yet.
    pub fn pending_blocks(&self, marker: &str) -> Vec<BlockId> {
        self.pres
            .iter()
            .enumerate()
            .filter(|(_, pre)| {
                pre.code_children == 1
                    && !pre.code_has_markup
                    && pre.has_class(marker)
                    && !pre.has_class(HIGHLIGHTED_CLASS)
            })
            .map(|(i, _)| BlockId(i))
            .collect()
    }

    /// Decoded text of the code inside `block`.
    pub fn block_source(&self, block: BlockId) -> Cow<'_, str> {
        html_escape::decode_html_entities(&self.pres[block.0].code_text)
    }

    /// Language named by a `language-*` or `lang-*` class, checked on the
    /// `<code>` element first and then on the `<pre>`.
    pub fn block_language(&self, block: BlockId) -> Option<&str> {
        let pre = &self.pres[block.0];
        language_of(&pre.code_classes)
            .or_else(|| language_of(&pre.classes))
            .or_else(|| language_of(&pre.added))
    }

    /// Replace the code body of `block` with highlighted HTML.
    pub fn set_highlighted(&mut self, block: BlockId, html: String) {
        self.pres[block.0].highlighted = Some(html);
        self.add_class(block, HIGHLIGHTED_CLASS);
    }

    /// Write the document out with all changes applied.
    ///
    /// An unmodified document comes back exactly as it was parsed.
    pub fn render(&self) -> Result<String, TransformError> {
        if !self.is_modified() {
            return Ok(self.source.clone());
        }

        let next_pre = Cell::new(0usize);
        let open = OpenPres::default();

        let output = rewrite_str(
            &self.source,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!("pre", |el| {
                        let index = next_pre.get();
                        next_pre.set(index + 1);

                        let pre = &self.pres[index];
                        if !pre.added.is_empty() {
                            el.set_attribute("class", &pre.class_value())?;
                        }
                        open.enter(el, index);
                        Ok(())
                    }),
                    element!("pre > code", |el| {
                        if let Some(index) = open.innermost()
                            && let Some(html) = &self.pres[index].highlighted
                        {
                            el.set_inner_content(html, ContentType::Html);
                        }
                        Ok(())
                    }),
                ],
                strict: false,
                ..RewriteStrSettings::default()
            },
        )?;

        Ok(output)
    }
}

impl CodeDocument for HtmlDocument {
    type Block = BlockId;

    fn code_blocks(&self) -> Vec<BlockId> {
        self.pres
            .iter()
            .enumerate()
            .filter(|(_, pre)| pre.is_container())
            .map(|(i, _)| BlockId(i))
            .collect()
    }

    fn has_class(&self, block: BlockId, class: &str) -> bool {
        self.pres[block.0].has_class(class)
    }

    fn add_class(&mut self, block: BlockId, class: &str) {
        let pre = &mut self.pres[block.0];
        if !pre.has_class(class) {
            pre.added.push(class.to_string());
        }
    }
}

/// Errors that can occur while scanning or rewriting HTML.
#[derive(Debug)]
pub enum TransformError {
    /// lol_html failed to rewrite the document.
    Rewrite(RewritingError),
}

impl From<RewritingError> for TransformError {
    fn from(e: RewritingError) -> Self {
        TransformError::Rewrite(e)
    }
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformError::Rewrite(e) => write!(f, "HTML rewriting failed: {}", e),
        }
    }
}

impl std::error::Error for TransformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransformError::Rewrite(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styler::{HighlightEngine, MARKER_CLASS, style_code};
    use std::convert::Infallible;

    /// Wraps each pending block in `<b>` so tests can see what was replaced.
    #[derive(Default)]
    struct BoldEngine {
        calls: usize,
    }

    impl HighlightEngine<HtmlDocument> for BoldEngine {
        type Error = Infallible;

        fn pretty_print(&mut self, document: &mut HtmlDocument) -> Result<(), Infallible> {
            self.calls += 1;
            for block in document.pending_blocks(MARKER_CLASS) {
                let body = format!("<b>{}</b>", document.block_source(block));
                document.set_highlighted(block, body);
            }
            Ok(())
        }
    }

    fn classes(doc: &HtmlDocument, block: BlockId) -> Vec<&str> {
        doc.classes(block).collect()
    }

    #[test]
    fn test_finds_pre_with_direct_code_child() {
        let doc = HtmlDocument::parse(
            r#"<p>intro</p>
<pre><code>one</code></pre>
<pre>no code here</pre>
<pre><span><code>wrapped</code></span></pre>
<div><code>inline</code></div>
<pre class="x"><code>two</code></pre>"#,
        )
        .unwrap();

        assert_eq!(doc.code_blocks(), vec![BlockId(0), BlockId(3)]);
        assert_eq!(doc.block_source(BlockId(0)), "one");
        assert_eq!(doc.block_source(BlockId(3)), "two");
    }

    #[test]
    fn test_unmodified_document_renders_verbatim() {
        let html = "<PRE  class='a'><code>x &amp; y</code></PRE>\n<!-- keep -->";
        let doc = HtmlDocument::parse(html).unwrap();

        assert!(!doc.is_modified());
        assert_eq!(doc.render().unwrap(), html);
    }

    #[test]
    fn test_style_code_marks_and_highlights_html() {
        let html = r#"<pre><code>a</code></pre><pre class="linenums"><code>b</code></pre>"#;
        let mut doc = HtmlDocument::parse(html).unwrap();
        let mut engine = BoldEngine::default();

        let Ok(report) = style_code(&mut doc, &mut engine);

        assert_eq!(report.newly_marked, 2);
        assert_eq!(engine.calls, 1);
        assert_eq!(
            doc.render().unwrap(),
            concat!(
                r#"<pre class="prettyprint prettyprinted"><code><b>a</b></code></pre>"#,
                r#"<pre class="linenums prettyprint prettyprinted"><code><b>b</b></code></pre>"#,
            )
        );
    }

    #[test]
    fn test_already_marked_page_is_untouched() {
        let html = r#"<pre class="prettyprint"><code>done</code></pre>"#;
        let mut doc = HtmlDocument::parse(html).unwrap();
        let mut engine = BoldEngine::default();

        let Ok(report) = style_code(&mut doc, &mut engine);

        assert!(!report.highlighted);
        assert_eq!(engine.calls, 0);
        assert_eq!(doc.render().unwrap(), html);
    }

    #[test]
    fn test_restyling_rendered_output_changes_nothing() {
        let mut doc = HtmlDocument::parse("<pre><code>a</code></pre><pre><code>b</code></pre>").unwrap();
        let Ok(_) = style_code(&mut doc, &mut BoldEngine::default());
        let first = doc.render().unwrap();

        let mut again = HtmlDocument::parse(&first).unwrap();
        let mut engine = BoldEngine::default();
        let Ok(report) = style_code(&mut again, &mut engine);

        assert_eq!(report.matched, 2);
        assert_eq!(report.newly_marked, 0);
        assert_eq!(engine.calls, 0);
        assert_eq!(again.render().unwrap(), first);
    }

    #[test]
    fn test_original_classes_are_kept() {
        let mut doc = HtmlDocument::parse(r#"<pre class="  linenums lang-py "><code>x</code></pre>"#).unwrap();
        let block = BlockId(0);

        doc.add_class(block, MARKER_CLASS);

        assert_eq!(classes(&doc, block), ["linenums", "lang-py", MARKER_CLASS]);
        assert_eq!(
            doc.render().unwrap(),
            r#"<pre class="  linenums lang-py prettyprint"><code>x</code></pre>"#
        );
    }

    #[test]
    fn test_nested_pre_is_attributed_to_its_own_block() {
        let doc = HtmlDocument::parse("<pre><pre><code>inner</code></pre><code>outer</code></pre>").unwrap();

        assert_eq!(doc.code_blocks(), vec![BlockId(0), BlockId(1)]);
        assert_eq!(doc.block_source(BlockId(0)), "outer");
        assert_eq!(doc.block_source(BlockId(1)), "inner");
    }

    #[test]
    fn test_block_source_is_decoded() {
        let doc = HtmlDocument::parse("<pre><code>if a &lt; b &amp;&amp; c &gt; d {}</code></pre>").unwrap();

        assert_eq!(doc.block_source(BlockId(0)), "if a < b && c > d {}");
    }

    #[test]
    fn test_block_language_prefers_code_element() {
        let doc = HtmlDocument::parse(
            r#"<pre class="lang-js"><code class="language-rust">fn f() {}</code></pre>
<pre class="lang-python"><code>pass</code></pre>
<pre class="lang-"><code>?</code></pre>"#,
        )
        .unwrap();

        assert_eq!(doc.block_language(BlockId(0)), Some("rust"));
        assert_eq!(doc.block_language(BlockId(1)), Some("python"));
        assert_eq!(doc.block_language(BlockId(2)), None);
    }

    #[test]
    fn test_pending_blocks_skip_markup_and_highlighted() {
        let mut doc = HtmlDocument::parse(
            r#"<pre class="prettyprint"><code>plain</code></pre>
<pre class="prettyprint"><code>a <span>b</span></code></pre>
<pre class="prettyprint"><code>a</code><code>b</code></pre>
<pre class="prettyprint prettyprinted"><code>done</code></pre>
<pre><code>unmarked</code></pre>"#,
        )
        .unwrap();

        assert_eq!(doc.pending_blocks(MARKER_CLASS), vec![BlockId(0)]);

        doc.set_highlighted(BlockId(0), "<i>plain</i>".to_string());
        assert!(doc.pending_blocks(MARKER_CLASS).is_empty());
    }

    #[test]
    fn test_comment_inside_code_survives_styling() {
        let html = "<pre><code>a <!-- keep --> b</code></pre>";
        let mut doc = HtmlDocument::parse(html).unwrap();
        let mut engine = BoldEngine::default();

        let Ok(report) = style_code(&mut doc, &mut engine);

        assert!(doc.pending_blocks(MARKER_CLASS).is_empty());
        assert_eq!(report.newly_marked, 1);
        assert_eq!(engine.calls, 1);
        assert_eq!(
            doc.render().unwrap(),
            r#"<pre class="prettyprint"><code>a <!-- keep --> b</code></pre>"#
        );
    }
}
