//! Document metadata read from `<title>`, meta tags and canonical links.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use dom_query::{Document, Selection};
use regex::Regex;
use url::Url;

/// Separators between an article title and the site name.
#[allow(clippy::expect_used)]
static TITLE_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s[|\-–—]\s").expect("valid regex"));

/// Metadata attached to an extracted document.
///
/// Every field is optional: pages rarely declare all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    /// Source URL: the caller's URL, else the canonical / `og:url` link.
    pub url: Option<String>,
    pub hostname: Option<String>,
    pub description: Option<String>,
    pub sitename: Option<String>,
    /// Publication date as `YYYY-MM-DD`.
    pub date: Option<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

/// Collect metadata from `doc`.
#[must_use]
pub fn extract_metadata(doc: &Document, source_url: Option<&str>) -> Metadata {
    let mut meta = examine_meta(doc);

    if meta.title.is_none() {
        meta.title = title_element(doc).or_else(|| first_text(doc, "h1"));
    }

    if let Some(url) = source_url.filter(|u| !u.trim().is_empty()) {
        meta.url = Some(url.trim().to_string());
    } else if meta.url.is_none() {
        meta.url = first_attr(doc, "link[rel='canonical']", "href");
    }

    meta.hostname = meta
        .url
        .as_deref()
        .and_then(|u| Url::parse(u).ok())
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()));

    meta
}

/// Walk `<meta>` elements, first value wins per field.
fn examine_meta(doc: &Document) -> Metadata {
    let mut result = Metadata::default();

    for node in doc.select("meta").nodes() {
        let meta = Selection::from(*node);

        let name = meta
            .attr("name")
            .or_else(|| meta.attr("property"))
            .or_else(|| meta.attr("itemprop"))
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        let content = meta
            .attr("content")
            .map(|s| normalize_space(&s))
            .unwrap_or_default();

        if name.is_empty() || content.is_empty() {
            continue;
        }

        match name.as_str() {
            "author" | "article:author" | "dc.creator" | "byl" | "parsely-author" => {
                if result.author.is_none() && is_plausible_name(&content) {
                    result.author = Some(content);
                }
            }
            "og:title" | "twitter:title" | "dc.title" | "parsely-title" => {
                result.title.get_or_insert(content);
            }
            "description" | "og:description" | "twitter:description" | "dc.description" => {
                result.description.get_or_insert(content);
            }
            "og:site_name" | "application-name" | "publisher" | "dc.publisher" => {
                result.sitename.get_or_insert(content);
            }
            "og:url" | "twitter:url" => {
                result.url.get_or_insert(content);
            }
            "article:published_time" | "og:published_time" | "article:modified_time"
            | "og:updated_time" | "date" | "dc.date" | "dcterms.date" | "datepublished"
            | "pubdate" | "publish_date" | "parsely-pub-date" => {
                if result.date.is_none() {
                    result.date = parse_date(&content);
                }
            }
            "article:tag" | "keywords" | "parsely-tags" => {
                if result.tags.is_empty() {
                    result.tags = split_list(&content);
                }
            }
            "article:section" | "category" | "parsely-section" => {
                if result.categories.is_empty() {
                    result.categories = split_list(&content);
                }
            }
            _ => {}
        }
    }

    result
}

fn title_element(doc: &Document) -> Option<String> {
    let title = first_text(doc, "head title")?;
    // "Article - Site" / "Article | Site": keep the longest part
    let best = TITLE_SEPARATOR_RE
        .split(&title)
        .map(str::trim)
        .max_by_key(|part| part.chars().count())
        .unwrap_or(title.as_str())
        .to_string();
    Some(best)
}

fn first_text(doc: &Document, selector: &str) -> Option<String> {
    let node = *doc.select(selector).nodes().first()?;
    let text = normalize_space(&Selection::from(node).text());
    (!text.is_empty()).then_some(text)
}

fn first_attr(doc: &Document, selector: &str, attr: &str) -> Option<String> {
    let node = *doc.select(selector).nodes().first()?;
    let value = Selection::from(node).attr(attr)?.trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Reject values that look like URLs, ids or JSON rather than a person.
fn is_plausible_name(name: &str) -> bool {
    let len = name.chars().count();
    if !(2..=120).contains(&len) {
        return false;
    }
    if name.starts_with("http") || name.starts_with("www.") || name.starts_with(['{', '[']) {
        return false;
    }
    name.chars().filter(char::is_ascii_digit).count() <= 3
}

/// Normalize a date to `YYYY-MM-DD`.
fn parse_date(value: &str) -> Option<String> {
    let value = value.trim();
    let date = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date()))
        .ok()
        .or_else(|| {
            ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"]
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        })
        // Keep a leading date from longer timestamps, e.g. "2017-09-01 10:00"
        .or_else(|| value.get(..10).and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()))?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn split_list(content: &str) -> Vec<String> {
    content
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
