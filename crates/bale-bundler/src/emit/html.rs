//! HTML page generation.

use std::fmt::Write as _;

const DEFAULT_PAGE: &str = "<!DOCTYPE html>
<html lang=\"en\">
<head>
<meta charset=\"utf-8\">
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">
<title>bale</title>
</head>
<body>
</body>
</html>
";

/// Render a page with stylesheet links before `</head>` and script tags
/// before `</body>`.
///
/// Tags are appended to the document when the closing element is absent.
pub fn render_page(template: Option<&str>, styles: &[String], scripts: &[String]) -> String {
    let mut page = template.unwrap_or(DEFAULT_PAGE).to_string();

    let mut links = String::new();
    for href in styles {
        let _ = writeln!(links, "<link rel=\"stylesheet\" href=\"{}\">", escape_attr(href));
    }
    insert_before(&mut page, "</head>", &links);

    let mut tags = String::new();
    for src in scripts {
        let _ = writeln!(tags, "<script defer src=\"{}\"></script>", escape_attr(src));
    }
    insert_before(&mut page, "</body>", &tags);
    page
}

fn insert_before(page: &mut String, closing: &str, text: &str) {
    if text.is_empty() {
        return;
    }
    match page.to_ascii_lowercase().rfind(closing) {
        Some(at) => page.insert_str(at, text),
        None => page.push_str(text),
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
