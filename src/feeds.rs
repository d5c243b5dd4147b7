//! Feed discovery: turn a feed (or a page advertising one) into article URLs.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use dom_query::{Document, Selection};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::fetch::Fetcher;

/// Hrefs that look like feeds.
#[allow(clippy::expect_used)]
static FEED_HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\.(?:atom|rdf|rss|xml)$|\b(?:atom|rss)\b|/feed/?$)").expect("valid regex")
});

/// `<link ...>` elements (Atom style).
#[allow(clippy::expect_used)]
static LINK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<link\b([^>]*)>").expect("valid regex"));

/// `<link>url</link>` elements (RSS style), CDATA optional.
#[allow(clippy::expect_used)]
static LINK_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<link>\s*(?:<!\[CDATA\[)?\s*(.*?)\s*(?:\]\]>)?\s*</link>").expect("valid regex")
});

#[allow(clippy::expect_used)]
static ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\w:-]+)\s*=\s*"([^"]*)""#).expect("valid regex"));

/// Resolves a feed URL into the article URLs it lists.
pub trait FeedFinder: Send + Sync {
    fn find_feed_urls(&self, url: &str) -> Vec<String>;
}

/// Context for filtering links found in a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedParameters {
    /// `scheme://host` of the feed, used for relative links.
    pub base: String,
    /// Host without `www.`; links must stay on it.
    pub domain: String,
    /// The URL the user asked for; never returned as a result.
    pub reference: String,
}

impl FeedParameters {
    pub fn new(base: impl Into<String>, domain: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            domain: domain.into(),
            reference: reference.into(),
        }
    }

    /// Derive parameters from a feed or page URL. `None` for unusable URLs.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let parsed = Url::parse(url.trim()).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        let host = parsed.host_str().filter(|h| !h.is_empty())?;
        Some(Self::new(
            format!("{}://{host}", parsed.scheme()),
            strip_www(host),
            url.trim(),
        ))
    }
}

/// Default [`FeedFinder`]: downloads the feed with a [`Fetcher`].
pub struct FeedDiscovery {
    fetcher: Arc<dyn Fetcher>,
}

impl FeedDiscovery {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

impl FeedFinder for FeedDiscovery {
    fn find_feed_urls(&self, url: &str) -> Vec<String> {
        let Some(params) = FeedParameters::from_url(url) else {
            tracing::warn!(%url, "not a usable feed URL");
            return Vec::new();
        };
        let Some(content) = self.fetcher.fetch_url(url) else {
            tracing::warn!(%url, "could not download feed");
            return Vec::new();
        };

        let links = extract_links(&content, &params);
        if !links.is_empty() {
            tracing::debug!(%url, count = links.len(), "links found in feed");
            return links;
        }

        // An HTML page: follow the feeds it advertises.
        for feed in determine_feed(&content, &params) {
            tracing::debug!(%feed, "following advertised feed");
            if let Some(feed_content) = self.fetcher.fetch_url(&feed) {
                let links = extract_links(&feed_content, &params);
                if !links.is_empty() {
                    return links;
                }
            }
        }

        tracing::warn!(%url, "no links found");
        Vec::new()
    }
}

/// Extract article links from RSS, Atom or JSON feed content.
#[must_use]
pub fn extract_links(content: &str, params: &FeedParameters) -> Vec<String> {
    let trimmed = content.trim_start();
    let candidates = if trimmed.starts_with('{') {
        json_links(trimmed)
    } else if looks_like_xml_feed(trimmed) {
        xml_links(trimmed)
    } else {
        return Vec::new();
    };
    handle_link_list(candidates, params)
}

fn looks_like_xml_feed(content: &str) -> bool {
    content.starts_with("<?xml") || content.contains("<rss") || content.contains("<feed") || content.contains("<rdf:RDF")
}

/// The parts of a JSON Feed (jsonfeed.org) needed to list its items.
#[derive(Debug, Deserialize)]
struct JsonFeed {
    #[serde(default)]
    items: Vec<JsonFeedItem>,
}

#[derive(Debug, Deserialize)]
struct JsonFeedItem {
    url: Option<String>,
    /// Often the permalink when `url` is missing.
    id: Option<Value>,
}

fn json_links(content: &str) -> Vec<String> {
    let Ok(feed) = serde_json::from_str::<JsonFeed>(content) else {
        return Vec::new();
    };
    feed.items
        .into_iter()
        .filter_map(|item| {
            item.url
                .or_else(|| item.id.and_then(|id| id.as_str().map(str::to_string)))
        })
        .collect()
}

fn xml_links(content: &str) -> Vec<String> {
    if let Ok(channel) = content.parse::<rss::Channel>() {
        let links: Vec<String> = channel
            .items()
            .iter()
            .filter_map(|item| {
                item.link()
                    .map(str::to_string)
                    .or_else(|| item.guid().filter(|g| g.is_permalink()).map(|g| g.value().to_string()))
            })
            .collect();
        if !links.is_empty() {
            return links;
        }
    }

    if let Ok(feed) = atom_syndication::Feed::read_from(content.as_bytes()) {
        let links: Vec<String> = feed
            .entries()
            .iter()
            .filter_map(|entry| {
                entry
                    .links()
                    .iter()
                    .find(|link| link.rel() == "alternate")
                    .or_else(|| entry.links().first())
                    .map(|link| link.href().to_string())
            })
            .collect();
        if !links.is_empty() {
            return links;
        }
    }

    // Fragments and malformed feeds.
    let mut links = Vec::new();
    for caps in LINK_TAG_RE.captures_iter(content) {
        let attrs = parse_attrs(caps.get(1).map_or("", |m| m.as_str()));
        let rel = attr(&attrs, "rel").unwrap_or("alternate");
        let kind = attr(&attrs, "type").unwrap_or("");
        if rel != "alternate" || kind.contains("atom+xml") || kind.contains("rss+xml") {
            continue;
        }
        if let Some(href) = attr(&attrs, "href") {
            links.push(href.to_string());
        }
    }
    for caps in LINK_TEXT_RE.captures_iter(content) {
        if let Some(m) = caps.get(1) {
            links.push(m.as_str().to_string());
        }
    }
    links
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .map(|c| (c[1].to_ascii_lowercase(), c[2].to_string()))
        .collect()
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}

/// Find feed URLs advertised by an HTML page.
#[must_use]
pub fn determine_feed(html: &str, params: &FeedParameters) -> Vec<String> {
    if html.trim().is_empty() {
        return Vec::new();
    }
    let doc = Document::from(html);
    let mut found = Vec::new();

    for node in doc.select("link[href]").nodes() {
        let link = Selection::from(*node);
        let rel = link.attr("rel").map(|r| r.to_lowercase()).unwrap_or_default();
        if !rel.contains("alternate") {
            continue;
        }
        let href = link.attr("href").map(|h| h.trim().to_string()).unwrap_or_default();
        let kind = link.attr("type").map(|t| t.to_lowercase()).unwrap_or_default();
        let is_feed = if kind.is_empty() {
            FEED_HREF_RE.is_match(&href)
        } else {
            kind.contains("rss") || kind.contains("atom") || kind.contains("json")
        };
        if is_feed && !href.contains("comments") {
            found.push(href);
        }
    }

    if found.is_empty() {
        for node in doc.select("a[href]").nodes() {
            let href = Selection::from(*node).attr("href").map(|h| h.trim().to_string()).unwrap_or_default();
            if FEED_HREF_RE.is_match(&href) && !href.contains("comments") {
                found.push(href);
            }
        }
    }

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter_map(|href| absolutize(&href, params))
        .map(|url| url.to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Normalize, filter and deduplicate candidate links.
///
/// Links must be http(s), stay on the feed's domain (feedburner and
/// feedproxy are exempt) and differ from the reference URL and the
/// site's homepage.
#[must_use]
pub fn handle_link_list(links: Vec<String>, params: &FeedParameters) -> Vec<String> {
    let reference = params.reference.trim_end_matches('/');
    let mut seen = HashSet::new();
    let mut output = Vec::new();

    for link in links {
        let Some(url) = absolutize(link.trim(), params) else {
            continue;
        };
        let Some(host) = url.host_str() else {
            continue;
        };
        let host = strip_www(host);
        let same_domain = params.domain.is_empty()
            || host == params.domain
            || host.ends_with(&format!(".{}", params.domain));
        if !same_domain && !host.contains("feedburner") && !host.contains("feedproxy") {
            tracing::debug!(%url, "discarding link to another domain");
            continue;
        }
        if url.path() == "/" && url.query().is_none() {
            continue;
        }
        let url = url.to_string();
        if !reference.is_empty() && url.trim_end_matches('/') == reference {
            continue;
        }
        if seen.insert(url.clone()) {
            output.push(url);
        }
    }

    output
}

/// Parse an absolute http(s) link, or join a root-relative one to the base.
fn absolutize(link: &str, params: &FeedParameters) -> Option<Url> {
    let url = if link.starts_with('/') && !link.starts_with("//") {
        Url::parse(&params.base).ok()?.join(link).ok()?
    } else {
        Url::parse(link).ok()?
    };
    (matches!(url.scheme(), "http" | "https") && url.host_str().is_some()).then_some(url)
}

fn strip_www(host: &str) -> String {
    host.trim_end_matches('.')
        .to_ascii_lowercase()
        .trim_start_matches("www.")
        .to_string()
}
