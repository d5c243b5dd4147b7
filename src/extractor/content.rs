//! Main-content and comments selection.

use dom_query::{Document, Selection};

use super::metadata::normalize_space;
use crate::options::ExtractionOptions;
use crate::settings::MIN_EXTRACTED_SIZE;

/// Elements never part of the extracted text.
static DISCARD_SELECTOR: &str = "script, style, noscript, template, nav, aside, footer, header, form, iframe, svg, button, [role=\"navigation\"], [aria-hidden=\"true\"], div[class*=\"cookie\"], div[class*=\"share\"], div[class*=\"newsletter\"]";

/// Comment sections, matched outermost first.
static COMMENTS_SELECTOR: &str = "#comments, .comments, .comments-area, #respond, .comment-list, .commentlist";

/// Candidate main-content containers, in order of preference.
static CONTAINER_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=\"main\"]",
    "[itemprop=\"articleBody\"]",
    ".entry-content",
    ".post-content",
    ".article-body",
    "#content",
    "#main",
];

static BLOCK_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, li, blockquote, pre, tr";
static NESTED_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, li, blockquote, pre, tr, table";

/// The fallback scan also accepts text-only `div`s.
static FALLBACK_BLOCK_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, li, blockquote, pre, tr, div";
static FALLBACK_NESTED_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, li, blockquote, pre, tr, table, div";

/// Bold and italic spans are delimited by Unicode noncharacters, which page
/// text never legitimately contains. Serializers turn them into markup.
pub const BOLD_START: char = '\u{FDD0}';
pub const BOLD_END: char = '\u{FDD1}';
pub const ITALIC_START: char = '\u{FDD2}';
pub const ITALIC_END: char = '\u{FDD3}';

/// A unit of extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    Paragraph(String),
    Item(String),
    Quote(String),
    Code(String),
    /// Table row, one entry per cell.
    Row(Vec<String>),
}

impl Block {
    #[must_use]
    pub fn text_len(&self) -> usize {
        match self {
            Self::Heading(t) | Self::Paragraph(t) | Self::Item(t) | Self::Quote(t) | Self::Code(t) => {
                t.chars().count()
            }
            Self::Row(cells) => cells.iter().map(|c| c.chars().count()).sum(),
        }
    }
}

/// Total text length of a block list.
#[must_use]
pub fn text_len(blocks: &[Block]) -> usize {
    blocks.iter().map(Block::text_len).sum()
}

/// Body and comments of a page.
#[derive(Debug, Default)]
pub struct Content {
    pub body: Vec<Block>,
    pub comments: Vec<Block>,
}

/// Select main content and comments from a parsed page.
///
/// Pruning (boilerplate, tables, comments) happens on `doc` before any pass,
/// the fallbacks included.
pub fn extract_content(doc: &Document, options: &ExtractionOptions) -> Content {
    remove_all(doc, DISCARD_SELECTOR);
    if !options.include_tables {
        remove_all(doc, "table");
    }
    if options.include_formatting {
        mark_formatting(doc);
    }

    let comments = if options.include_comments {
        doc.select(COMMENTS_SELECTOR)
            .nodes()
            .first()
            .map(|node| collect_blocks(&Selection::from(*node), BLOCK_SELECTOR, NESTED_SELECTOR))
            .unwrap_or_default()
    } else {
        Vec::new()
    };
    remove_all(doc, COMMENTS_SELECTOR);

    let mut body = collect_blocks(&main_container(doc), BLOCK_SELECTOR, NESTED_SELECTOR);

    if options.fallback && text_len(&body) < MIN_EXTRACTED_SIZE {
        let whole_page = collect_blocks(&doc.select("body"), FALLBACK_BLOCK_SELECTOR, FALLBACK_NESTED_SELECTOR);
        let candidates = [Some(whole_page), readability_blocks(doc)];
        for candidate in candidates.into_iter().flatten() {
            if text_len(&candidate) > text_len(&body) {
                tracing::debug!(chars = text_len(&candidate), "fallback extraction preferred");
                body = candidate;
            }
        }
    }

    Content { body, comments }
}

fn main_container<'a>(doc: &'a Document) -> Selection<'a> {
    for selector in CONTAINER_SELECTORS {
        let found = doc.select(selector);
        if let Some(node) = found.nodes().first() {
            let candidate = Selection::from(*node);
            if !candidate.text().trim().is_empty() {
                return candidate;
            }
        }
    }
    doc.select("body")
}

/// Innermost blocks of `container`, in document order.
fn collect_blocks(container: &Selection, block_selector: &str, nested_selector: &str) -> Vec<Block> {
    let mut blocks = Vec::new();

    for node in container.select(block_selector).nodes() {
        let sel = Selection::from(*node);
        if sel.select(nested_selector).exists() {
            continue;
        }

        let tag = node.node_name().map(|t| t.to_ascii_lowercase()).unwrap_or_default();
        let block = match tag.as_str() {
            "tr" => {
                let cells: Vec<String> = sel
                    .select("td, th")
                    .nodes()
                    .iter()
                    .map(|cell| normalize_space(&Selection::from(*cell).text()))
                    .filter(|cell| !cell.is_empty())
                    .collect();
                if cells.is_empty() {
                    continue;
                }
                Block::Row(cells)
            }
            "pre" => {
                let code = sel.text().trim_matches('\n').to_string();
                if code.trim().is_empty() {
                    continue;
                }
                Block::Code(code)
            }
            _ => {
                let text = normalize_space(&sel.text());
                if text.is_empty() {
                    continue;
                }
                match tag.as_str() {
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Block::Heading(text),
                    "li" => Block::Item(text),
                    "blockquote" => Block::Quote(text),
                    _ => Block::Paragraph(text),
                }
            }
        };
        blocks.push(block);
    }

    blocks
}

#[cfg(feature = "readability")]
fn readability_blocks(doc: &Document) -> Option<Vec<Block>> {
    use dom_smoothie::Readability;

    let pruned = Document::from(doc.html().to_string());
    let mut reader = Readability::with_document(pruned, None, None).ok()?;
    let article = reader.parse().ok()?;
    let content_doc = Document::from(article.content.to_string());
    let blocks = collect_blocks(&content_doc.select("body"), FALLBACK_BLOCK_SELECTOR, FALLBACK_NESTED_SELECTOR);
    (!blocks.is_empty()).then_some(blocks)
}

#[cfg(not(feature = "readability"))]
fn readability_blocks(_doc: &Document) -> Option<Vec<Block>> {
    None
}

/// Wrap the text of bold and italic elements in formatting markers.
fn mark_formatting(doc: &Document) {
    for (selector, start, end) in [("b, strong", BOLD_START, BOLD_END), ("i, em", ITALIC_START, ITALIC_END)] {
        let nodes = doc.select(selector).nodes().to_vec();
        for node in nodes.into_iter().rev() {
            let sel = Selection::from(node);
            let text = normalize_space(&sel.text());
            if text.is_empty() {
                continue;
            }
            sel.set_text(&format!("{start}{text}{end}"));
        }
    }
}

fn remove_all(doc: &Document, selector: &str) {
    let nodes = doc.select(selector).nodes().to_vec();
    for node in nodes.into_iter().rev() {
        Selection::from(node).remove();
    }
}
