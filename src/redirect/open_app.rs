//! Intermediate "open app, else fall back" page
//!
//! The page tries the native scheme immediately and navigates to the fallback
//! URL after a short delay if the app did not take over.

use axum::{
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use reqwest::Url;
use serde::Deserialize;

const FALLBACK_DELAY_MS: u64 = 1500;

#[derive(Debug, Deserialize)]
pub struct OpenAppParams {
    pub scheme: String,
    pub fallback: String,
    #[serde(default)]
    pub title: Option<String>,
}

pub async fn open_app_page(Query(params): Query<OpenAppParams>) -> Response {
    match render(&params) {
        Some(page) => Html(page).into_response(),
        None => (StatusCode::BAD_REQUEST, "Invalid app link").into_response(),
    }
}

fn render(params: &OpenAppParams) -> Option<String> {
    let fallback = Url::parse(&params.fallback).ok()?;
    if !matches!(fallback.scheme(), "http" | "https") {
        return None;
    }

    let scheme = Url::parse(&params.scheme).ok()?;
    if matches!(scheme.scheme(), "javascript" | "data" | "vbscript" | "file") {
        return None;
    }

    let title = params.title.as_deref().unwrap_or("Opening app");

    Some(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body>
<p>Opening the app&hellip; <a href="{fallback_attr}">Continue in the browser</a></p>
<script>
var fallback = {fallback_js};
window.location.href = {scheme_js};
setTimeout(function () {{ window.location.replace(fallback); }}, {delay});
</script>
</body>
</html>"#,
        title = escape_html(title),
        fallback_attr = escape_html(fallback.as_str()),
        fallback_js = js_string(fallback.as_str()),
        scheme_js = js_string(scheme.as_str()),
        delay = FALLBACK_DELAY_MS,
    ))
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// A JavaScript string literal that is also safe inside a `<script>` element.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(scheme: &str, fallback: &str, title: Option<&str>) -> OpenAppParams {
        OpenAppParams {
            scheme: scheme.to_string(),
            fallback: fallback.to_string(),
            title: title.map(str::to_string),
        }
    }

    #[test]
    fn test_render_page() {
        let page = render(&params("acme://promo", "https://dest.example/", Some("acme"))).unwrap();
        assert!(page.contains("<title>acme</title>"));
        assert!(page.contains(r#"window.location.href = "acme://promo";"#));
        assert!(page.contains(r#"var fallback = "https://dest.example/";"#));
    }

    #[test]
    fn test_rejects_script_schemes_and_bad_fallbacks() {
        assert!(render(&params("javascript:alert(1)", "https://dest.example", None)).is_none());
        assert!(render(&params("acme://promo", "ftp://dest.example", None)).is_none());
        assert!(render(&params("acme://promo", "not a url", None)).is_none());
    }

    #[test]
    fn test_title_is_escaped() {
        let page = render(&params(
            "acme://promo",
            "https://dest.example",
            Some("<script>x</script>"),
        ))
        .unwrap();
        assert!(page.contains("&lt;script&gt;x&lt;/script&gt;"));
    }
}
