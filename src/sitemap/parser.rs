//! Sitemap XML parsing
//!
//! Supports:
//! - Standard `<urlset>` sitemaps
//! - Sitemap index files (`<sitemapindex>`)
//!
//! Parsing is done with plain string scanning; sitemaps are flat enough that
//! a full XML parser buys nothing here.

use url::Url;

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// Page URLs, in document order
    UrlSet(Vec<String>),
    /// Locations of child sitemaps, in document order
    Index(Vec<String>),
}

/// Parses sitemap XML
///
/// Returns `None` if the content is neither a `<urlset>` nor a
/// `<sitemapindex>`. Locations that are not absolute URLs are skipped.
pub fn parse_sitemap(content: &str) -> Option<SitemapDocument> {
    if content.contains("<sitemapindex") {
        Some(SitemapDocument::Index(collect_locs(content, "sitemap")))
    } else if content.contains("<urlset") {
        Some(SitemapDocument::UrlSet(collect_locs(content, "url")))
    } else {
        None
    }
}

/// Collects the `<loc>` of every `<block>` element
fn collect_locs(content: &str, block: &str) -> Vec<String> {
    let open = format!("<{}", block);
    let close = format!("</{}>", block);
    let mut locs = Vec::new();

    let mut rest = content;
    while let Some(start) = find_element(rest, &open) {
        let body = &rest[start..];
        let Some(end) = body.find(&close) else {
            break;
        };

        if let Some(loc) = extract_tag(&body[..end], "loc") {
            let loc = decode_entities(&loc);
            if Url::parse(&loc).is_ok() {
                locs.push(loc);
            } else {
                tracing::debug!("Skipping invalid sitemap location: {}", loc);
            }
        }
        rest = &body[end + close.len()..];
    }

    locs
}

/// Finds the start of an element, skipping longer tag names sharing the prefix
/// (`<url` must not match `<urlset`)
fn find_element(content: &str, open: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(pos) = content[offset..].find(open) {
        let start = offset + pos;
        let after = content[start + open.len()..].chars().next();
        if matches!(after, Some('>') | Some(' ') | Some('\t') | Some('\n') | Some('\r')) {
            return Some(start);
        }
        offset = start + open.len();
    }
    None
}

/// Extracts the text content of an XML tag
fn extract_tag(content: &str, tag: &str) -> Option<String> {
    let start_tag = format!("<{}>", tag);
    let end_tag = format!("</{}>", tag);

    let value_start = content.find(&start_tag)? + start_tag.len();
    let len = content[value_start..].find(&end_tag)?;
    let value = content[value_start..value_start + len].trim();

    let value = value
        .strip_prefix("<![CDATA[")
        .and_then(|v| v.strip_suffix("]]>"))
        .unwrap_or(value);

    Some(value.trim().to_string())
}

/// Decodes the predefined XML entities and numeric character references
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        let decoded = tail.find(';').and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
