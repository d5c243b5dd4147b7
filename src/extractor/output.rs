//! Serialization of extracted documents: txt, csv, xml and TEI.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use super::content::{Block, BOLD_END, BOLD_START, ITALIC_END, ITALIC_START};
use super::metadata::Metadata;
use crate::error::{ExtractionError, ExtractionErrorKind};
use crate::options::{ExtractionOptions, OutputFormat};

/// Elements allowed inside a TEI `<body>`.
pub const TEI_VALID_TAGS: &[&str] = &[
    "body", "cell", "code", "del", "div", "fw", "head", "hi", "item", "lb", "list", "p", "quote", "row",
];

/// Attributes allowed on TEI body elements.
pub const TEI_VALID_ATTRS: &[&str] = &["rend", "rendition", "type"];

#[allow(clippy::expect_used)]
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)([A-Za-z][\w:.-]*)((?:\s+[^\s=/>]+=\x22[^\x22]*\x22)*)\s*(/?)>").expect("valid regex"));
#[allow(clippy::expect_used)]
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"([^\s=/>]+)="#).expect("valid regex"));

/// An extracted page ready for serialization.
#[derive(Debug, Default)]
pub struct Extracted {
    pub metadata: Metadata,
    pub body: Vec<Block>,
    pub comments: Vec<Block>,
}

/// Serialize according to `options.output_format`.
pub fn serialize(doc: &Extracted, options: &ExtractionOptions) -> Result<String, ExtractionError> {
    match options.output_format {
        OutputFormat::Txt => Ok(to_txt(doc)),
        OutputFormat::Csv => Ok(to_csv(doc)),
        OutputFormat::Xml => Ok(to_xml(doc, options.include_formatting)),
        OutputFormat::Xmltei => {
            let tei = to_tei(doc, options.include_formatting);
            if options.tei_validation {
                let verdict = validate_tei(&tei);
                tracing::info!(
                    valid = verdict.is_ok(),
                    url = doc.metadata.url.as_deref().unwrap_or(""),
                    "TEI validation result"
                );
                verdict.map_err(|reason| {
                    ExtractionError::new(ExtractionErrorKind::Serialize, format!("invalid TEI: {reason}"))
                })?;
            }
            Ok(tei)
        }
    }
}

fn blocks_to_txt(blocks: &[Block]) -> String {
    let lines: Vec<String> = blocks
        .iter()
        .map(|block| match block {
            Block::Heading(t) | Block::Paragraph(t) | Block::Quote(t) | Block::Code(t) => t.clone(),
            Block::Item(t) => format!("- {t}"),
            Block::Row(cells) => cells.iter().map(|c| format!("|{c}|")).collect(),
        })
        .collect();
    replace_marks(&lines.join("\n"), ["**", "**", "*", "*"])
}

/// Swap formatting markers for `[bold start, bold end, italic start, italic end]`.
fn replace_marks(text: &str, replacements: [&str; 4]) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            BOLD_START => out.push_str(replacements[0]),
            BOLD_END => out.push_str(replacements[1]),
            ITALIC_START => out.push_str(replacements[2]),
            ITALIC_END => out.push_str(replacements[3]),
            _ => out.push(c),
        }
    }
    out
}

fn to_txt(doc: &Extracted) -> String {
    let mut out = blocks_to_txt(&doc.body);
    if !doc.comments.is_empty() {
        out.push_str("\n\n");
        out.push_str(&blocks_to_txt(&doc.comments));
    }
    out.trim().to_string()
}

/// One tab-separated line: url, title, date, text, comments.
fn to_csv(doc: &Extracted) -> String {
    let meta = &doc.metadata;
    let fields = [
        meta.url.clone().unwrap_or_default(),
        meta.title.clone().unwrap_or_default(),
        meta.date.clone().unwrap_or_default(),
        blocks_to_txt(&doc.body),
        blocks_to_txt(&doc.comments),
    ];
    fields
        .iter()
        .map(|f| f.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\t")
}

fn to_xml(doc: &Extracted, formatting: bool) -> String {
    let meta = &doc.metadata;
    let mut out = String::from("<doc");
    let attrs = [
        ("sitename", meta.sitename.clone()),
        ("title", meta.title.clone()),
        ("author", meta.author.clone()),
        ("date", meta.date.clone()),
        ("source", meta.url.clone()),
        ("hostname", meta.hostname.clone()),
        ("excerpt", meta.description.clone()),
        ("categories", join_list(&meta.categories)),
        ("tags", join_list(&meta.tags)),
    ];
    for (name, value) in attrs {
        if let Some(value) = value {
            let _ = write!(out, " {name}=\"{}\"", escape(&value));
        }
    }
    out.push('>');

    out.push_str("<main>");
    write_blocks(&mut out, &doc.body, formatting, false);
    out.push_str("</main>");
    if !doc.comments.is_empty() {
        out.push_str("<comments>");
        write_blocks(&mut out, &doc.comments, formatting, false);
        out.push_str("</comments>");
    }
    out.push_str("</doc>");
    out
}

fn to_tei(doc: &Extracted, formatting: bool) -> String {
    let meta = &doc.metadata;
    let mut out = String::from(r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><teiHeader><fileDesc><titleStmt>"#);
    let _ = write!(
        out,
        r#"<title type="main">{}</title><title type="excerpt">{}</title><author>{}</author>"#,
        escape_opt(meta.title.as_deref()),
        escape_opt(meta.description.as_deref()),
        escape_opt(meta.author.as_deref()),
    );
    out.push_str("</titleStmt><publicationStmt>");
    let _ = write!(
        out,
        r#"<publisher>{}</publisher><idno type="URL">{}</idno><date type="publication">{}</date>"#,
        escape_opt(meta.sitename.as_deref()),
        escape_opt(meta.url.as_deref()),
        escape_opt(meta.date.as_deref()),
    );
    out.push_str("</publicationStmt><sourceDesc><p>");
    for (kind, values) in [("categories", &meta.categories), ("tags", &meta.tags)] {
        if values.is_empty() {
            continue;
        }
        let _ = write!(out, r#"<list type="{kind}">"#);
        for value in values {
            let _ = write!(out, "<item>{}</item>", escape(value));
        }
        out.push_str("</list>");
    }
    out.push_str("</p></sourceDesc></fileDesc></teiHeader><text><body>");

    out.push_str(r#"<div type="entry">"#);
    write_blocks(&mut out, &doc.body, formatting, true);
    out.push_str("</div>");
    if !doc.comments.is_empty() {
        out.push_str(r#"<div type="comments">"#);
        write_blocks(&mut out, &doc.comments, formatting, true);
        out.push_str("</div>");
    }
    out.push_str("</body></text></TEI>");
    out
}

/// Append blocks as XML. Consecutive items and rows are grouped.
fn write_blocks(out: &mut String, blocks: &[Block], formatting: bool, tei: bool) {
    let inline = |text: &str| {
        let marks = if formatting {
            [r##"<hi rend="#b">"##, "</hi>", r##"<hi rend="#i">"##, "</hi>"]
        } else {
            [""; 4]
        };
        replace_marks(&escape(text), marks)
    };

    let mut open: Option<&'static str> = None;
    for block in blocks {
        let group = match block {
            Block::Item(_) => Some("list"),
            Block::Row(_) if !tei => Some("table"),
            _ => None,
        };
        if open != group {
            if let Some(tag) = open {
                let _ = write!(out, "</{tag}>");
            }
            if let Some(tag) = group {
                let _ = write!(out, "<{tag}>");
            }
            open = group;
        }

        match block {
            Block::Heading(t) if tei => {
                let _ = write!(out, r#"<fw type="header">{}</fw>"#, inline(t));
            }
            Block::Heading(t) => {
                let _ = write!(out, "<head>{}</head>", inline(t));
            }
            Block::Paragraph(t) => {
                let _ = write!(out, "<p>{}</p>", inline(t));
            }
            Block::Item(t) => {
                let _ = write!(out, "<item>{}</item>", inline(t));
            }
            Block::Quote(t) => {
                let _ = write!(out, "<quote>{}</quote>", inline(t));
            }
            Block::Code(t) => {
                let _ = write!(out, "<code>{}</code>", replace_marks(&escape(t), [""; 4]));
            }
            Block::Row(cells) => {
                out.push_str("<row>");
                for cell in cells {
                    let _ = write!(out, "<cell>{}</cell>", inline(cell));
                }
                out.push_str("</row>");
            }
        }
    }
    if let Some(tag) = open {
        let _ = write!(out, "</{tag}>");
    }
}

/// Check a TEI document: balanced tags, and only permitted elements and
/// attributes inside `<text><body>`.
pub fn validate_tei(tei: &str) -> Result<(), String> {
    let mut stack: Vec<&str> = Vec::new();
    let mut in_body = false;

    for caps in TAG_RE.captures_iter(tei) {
        let closing = !caps[1].is_empty();
        let self_closing = !caps[4].is_empty();
        let name = caps.get(2).map_or("", |m| m.as_str());

        if closing {
            match stack.pop() {
                Some(open) if open == name => {}
                Some(open) => return Err(format!("</{name}> closes <{open}>")),
                None => return Err(format!("unexpected </{name}>")),
            }
            if name == "body" {
                in_body = false;
            }
            continue;
        }

        if in_body {
            if !TEI_VALID_TAGS.contains(&name) {
                return Err(format!("not a TEI element: {name}"));
            }
            for attr in ATTR_RE.captures_iter(&caps[3]) {
                let attr = attr.get(1).map_or("", |m| m.as_str());
                if !TEI_VALID_ATTRS.contains(&attr) {
                    return Err(format!("not a valid TEI attribute: {attr} in {name}"));
                }
            }
        }
        if name == "body" && stack.last() == Some(&"text") {
            in_body = true;
        }
        if !self_closing {
            stack.push(name);
        }
    }

    match stack.last() {
        Some(open) => Err(format!("unclosed <{open}>")),
        None => Ok(()),
    }
}

fn join_list(values: &[String]) -> Option<String> {
    (!values.is_empty()).then(|| values.join(";"))
}

fn escape_opt(value: Option<&str>) -> String {
    value.map(escape).unwrap_or_default()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
