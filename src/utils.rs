use std::net::IpAddr;
use std::time::Duration;
use url::Url;

/// Second-level labels that sit under a country-code TLD (`example.co.uk`).
const COUNTRY_SECOND_LEVELS: &[&str] = &["co", "com", "org", "net", "ac", "gov", "edu", "ne", "or"];

/// Utility function to create a reasonable timeout for web requests
pub fn calculate_timeout(base_secs: u64, url_length: usize) -> Duration {
    // Longer URLs tend to be deeper, heavier pages
    let additional_ms = (url_length / 20) as u64 * 100;
    Duration::from_millis(base_secs * 1000 + additional_ms)
}

/// Convert a string to a sanitized filename
pub fn sanitize_filename(url: &str) -> String {
    let mut name = url.replace("http://", "").replace("https://", "");
    name = name.replace(['/', ':', '?', '&', '=', '#', '%'], "_");

    // Limit filename length
    if name.len() > 100 {
        name.chars().take(100).collect()
    } else {
        name
    }
}

/// Best-effort registrable domain of a host.
///
/// Without a public suffix list this keeps the last two labels, or three when
/// the host looks like `name.co.uk`. IP addresses are returned unchanged.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.parse::<IpAddr>().is_ok() || host.starts_with('[') {
        return host;
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }

    let tld = labels[labels.len() - 1];
    let second = labels[labels.len() - 2];
    let keep = if tld.len() == 2 && COUNTRY_SECOND_LEVELS.contains(&second) {
        3
    } else {
        2
    };
    labels[labels.len() - keep..].join(".")
}

/// Number of non-empty path segments (`/` is 0, `/a/b` is 2)
pub fn path_segment_count(url: &Url) -> usize {
    url.path().split('/').filter(|s| !s.is_empty()).count()
}
