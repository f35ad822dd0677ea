//! Embedded single-page viewer served at `/`.

use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// GET / - Table viewer page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_calls_both_endpoints() {
        assert!(INDEX_HTML.contains("/api/tables"));
        assert!(INDEX_HTML.contains("/api/table/"));
        assert!(INDEX_HTML.contains("encodeURIComponent"));
    }
}
