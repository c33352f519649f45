use std::io::Cursor;

use chrono::Local;

use crate::common::Header;
use crate::response::Response;

/// Format of the timestamp embedded in the page, `YYYY-MM-DD HH:MM:SS`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Document skeleton; `{title}`, `{port}` and `{timestamp}` are filled in
/// when a page is rendered.
const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>{title}</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; line-height: 1.6; }
        h1 { color: #333; }
        .success { color: green; font-weight: bold; }
        .container { border: 1px solid #ddd; padding: 20px; margin-top: 20px; }
    </style>
</head>
<body>
    <h1>{title}</h1>
    <p class="success">&#9989; Connection successful!</p>

    <div class="container">
        <h2>Server Information</h2>
        <p>This is a simple HTTP server running on port {port}.</p>
        <p>Current time: {timestamp}</p>
    </div>

    <div class="container">
        <h2>Next Steps</h2>
        <p>Since this server is working, the issue might be specific to Node.js or your application configuration.</p>
    </div>
</body>
</html>
"#;

/// Immutable settings for the served page, injected at startup.
#[derive(Debug, Clone)]
pub struct PageConfig {
    /// Document title and top-level heading.
    pub title: String,

    /// Port advertised in the informational section.
    pub port: u16,
}

impl Default for PageConfig {
    fn default() -> PageConfig {
        PageConfig {
            title: "Python HTTP Server".to_string(),
            port: 8000,
        }
    }
}

/// The HTML payload generated for one request.
///
/// A `ResponsePage` is built fresh for every request and discarded once the
/// response has been written; two pages rendered from the same config differ
/// only in the embedded timestamp.
pub struct ResponsePage {
    html: String,
}

impl ResponsePage {
    /// Renders the page with the current wall-clock time.
    pub fn generate(config: &PageConfig) -> ResponsePage {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        ResponsePage::with_timestamp(config, &timestamp)
    }

    fn with_timestamp(config: &PageConfig, timestamp: &str) -> ResponsePage {
        let html = PAGE_TEMPLATE
            .replace("{title}", &config.title)
            .replace("{port}", &config.port.to_string())
            .replace("{timestamp}", timestamp);

        ResponsePage { html }
    }

    /// The rendered HTML document.
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Consumes the page into a 200 `text/html` response.
    pub fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        Response::from_data(self.html.into_bytes()).with_header(
            Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..]).unwrap(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{PageConfig, ResponsePage, TIMESTAMP_FORMAT};
    use chrono::NaiveDateTime;

    #[test]
    fn page_contains_title_and_success_line() {
        let page = ResponsePage::generate(&PageConfig::default());

        assert!(page.html().contains("<title>Python HTTP Server</title>"));
        assert!(page.html().contains("<h1>Python HTTP Server</h1>"));
        assert!(page.html().contains("Connection successful!"));
        assert!(page.html().contains("running on port 8000."));
    }

    #[test]
    fn timestamp_is_well_formed() {
        let page = ResponsePage::generate(&PageConfig::default());

        let needle = "Current time: ";
        let start = page.html().find(needle).unwrap() + needle.len();
        let timestamp = &page.html()[start..start + 19];

        NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).unwrap();
    }

    #[test]
    fn same_timestamp_renders_identical_pages() {
        let config = PageConfig::default();
        let a = ResponsePage::with_timestamp(&config, "2026-08-07 12:00:00");
        let b = ResponsePage::with_timestamp(&config, "2026-08-07 12:00:00");

        assert_eq!(a.html(), b.html());
    }
}
