use crate::parsers::ParserType;
use quick_xml::Reader;
use quick_xml::events::Event;

/// URLs recovered from one sitemap document
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SitemapEntries {
    /// Page URLs
    pub urls: Vec<String>,
    /// Nested sitemaps listed by a sitemap index
    pub sitemaps: Vec<String>,
}

/// Parses a sitemap body of the given type
pub fn parse(body: &str, parser_type: ParserType) -> SitemapEntries {
    match parser_type {
        ParserType::SitemapXml => parse_xml(body),
        ParserType::SitemapText => parse_text(body),
        _ => SitemapEntries::default(),
    }
}

/// Parses `urlset` and `sitemapindex` documents.
///
/// Elements are matched on their local name, so namespace prefixes are
/// accepted. A malformed document yields whatever was read before the error.
pub fn parse_xml(xml: &str) -> SitemapEntries {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = SitemapEntries::default();
    let mut buf = Vec::new();
    let mut in_sitemap = false;
    let mut in_loc = false;
    let mut loc = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sitemap" => in_sitemap = true,
                b"loc" => {
                    in_loc = true;
                    loc.clear();
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"sitemap" => in_sitemap = false,
                b"loc" if in_loc => {
                    in_loc = false;
                    let url = loc.trim();
                    if is_http(url) {
                        let target = if in_sitemap {
                            &mut entries.sitemaps
                        } else {
                            &mut entries.urls
                        };
                        target.push(url.to_string());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_loc => match e.unescape() {
                Ok(text) => loc.push_str(&text),
                Err(err) => {
                    ::log::debug!("Keeping undecoded sitemap text: {}", err);
                    loc.push_str(&String::from_utf8_lossy(&e));
                }
            },
            Ok(Event::CData(e)) if in_loc => loc.push_str(&String::from_utf8_lossy(&e)),
            Ok(Event::Eof) => break,
            Err(e) => {
                ::log::warn!(
                    "Sitemap XML error at byte {}: {}",
                    reader.error_position(),
                    e
                );
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    ::log::debug!(
        "Sitemap parser found {} urls and {} nested sitemaps",
        entries.urls.len(),
        entries.sitemaps.len()
    );
    entries
}

/// Parses a text sitemap: one absolute URL per line
pub fn parse_text(text: &str) -> SitemapEntries {
    SitemapEntries {
        urls: text
            .lines()
            .map(str::trim)
            .filter(|l| is_http(l))
            .map(str::to_string)
            .collect(),
        sitemaps: Vec::new(),
    }
}

/// Extracts `Sitemap:` directives from a robots.txt body
pub fn parse_robots(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case("sitemap")
                .then(|| value.trim().to_string())
        })
        .filter(|u| is_http(u))
        .collect()
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
