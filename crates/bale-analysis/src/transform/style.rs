//! Stylesheet-to-script wrapping for injected styles.

use std::fmt::Write as _;

use super::scan::{ReferenceForm, style_references};

/// Wrap `css` in a script that appends a `<style>` element when evaluated.
///
/// `@import` rules become `require()` calls ahead of the element so imported
/// sheets are injected first, and every `url()` target is spliced in as a
/// `require()` expression that evaluates to the asset's final URL. The
/// module accepts its own replacement and removes its element on dispose.
pub fn inject(css: &str, label: &str) -> String {
    let mut preamble = String::new();
    let mut parts: Vec<String> = Vec::new();
    let mut cursor = 0;

    for reference in style_references(css) {
        let spec = json_string(&reference.specifier);
        match reference.form {
            ReferenceForm::StyleImport => {
                let _ = writeln!(preamble, "require({spec});");
                parts.push(json_string(&css[cursor..reference.statement.start]));
                cursor = reference.statement.end;
            }
            _ => {
                parts.push(json_string(&css[cursor..reference.span.start]));
                parts.push(format!("require({spec})"));
                cursor = reference.span.end;
            }
        }
    }
    parts.push(json_string(&css[cursor..]));

    let mut js = preamble;
    let _ = writeln!(js, "var css = {};", parts.join(" + "));
    js.push_str("var style = document.createElement(\"style\");\n");
    let _ = writeln!(
        js,
        "style.setAttribute(\"data-bale-module\", {});",
        json_string(label)
    );
    js.push_str("style.appendChild(document.createTextNode(css));\n");
    js.push_str("document.head.appendChild(style);\n");
    js.push_str("if (module.hot) {\n");
    js.push_str("  module.hot.accept();\n");
    js.push_str(
        "  module.hot.dispose(function () { if (style.parentNode) style.parentNode.removeChild(style); });\n",
    );
    js.push_str("}\n");
    js
}

fn json_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}
