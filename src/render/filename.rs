use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

const MAX_PATH_CHARS: usize = 50;

/// Milliseconds since the Unix epoch, used as a uniqueness suffix.
pub fn timestamp_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Derive the PDF filename for `url` with the given timestamp suffix.
///
/// `https://www.example.com/a/b/` becomes `example.com-a-b-<timestamp>.pdf`;
/// input that does not parse as a URL with a host becomes `page-<timestamp>.pdf`.
pub fn pdf_filename(url: &str, timestamp: u128) -> String {
    let Some((hostname, path)) = Url::parse(url).ok().and_then(|parsed| {
        let host = parsed.host_str()?.to_string();
        Some((host, parsed.path().to_string()))
    }) else {
        return format!("page-{timestamp}.pdf");
    };
    let domain = hostname.strip_prefix("www.").unwrap_or(&hostname);
    format!("{domain}-{}-{timestamp}.pdf", sanitize_path(&path))
}

fn sanitize_path(path: &str) -> String {
    let cleaned: String = path
        .trim_matches('/')
        .replace('/', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(MAX_PATH_CHARS)
        .collect();
    if cleaned.is_empty() {
        "index".to_string()
    } else {
        cleaned
    }
}
