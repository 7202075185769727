//! Page document wrapping the widget.

use serde::Deserialize;

use super::escape_html;

/// Script and stylesheet locations referenced by the page.
///
/// All local by default so the page works without a CDN.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PageAssets {
    pub title: String,
    pub htmx_src: String,
    pub stylesheet: Option<String>,
}

impl Default for PageAssets {
    fn default() -> Self {
        Self {
            title: "PAMS Assistant".to_string(),
            htmx_src: "/static/vendor/htmx-2.0.8.min.js".to_string(),
            stylesheet: None,
        }
    }
}

/// Render the full HTML page around an already-rendered widget fragment.
#[must_use]
pub fn render_page(assets: &PageAssets, widget_html: &str) -> String {
    let title = escape_html(&assets.title);
    let htmx_src = escape_html(&assets.htmx_src);
    let stylesheet = assets
        .stylesheet
        .as_deref()
        .map(|href| format!(r#"<link rel="stylesheet" href="{}">"#, escape_html(href)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <script src="{htmx_src}"></script>
    {stylesheet}
</head>
<body class="min-h-screen bg-background text-textPrimary antialiased">
    <main id="app" class="container mx-auto h-screen px-4 md:px-6 py-4 md:py-8 max-w-3xl">
        <h1 class="font-semibold text-base md:text-lg mb-3">{title}</h1>
        {widget_html}
    </main>
</body>
</html>"#
    )
}
