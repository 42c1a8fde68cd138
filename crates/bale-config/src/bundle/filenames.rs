//! Output filename templates.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Per-role output filename templates.
///
/// Placeholders: `{name}`, `{ext}` (with the leading dot), `{query}` (with the
/// leading `?`, empty when absent), `{hash}` / `{hash:N}` and, for source
/// maps only, `{file}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilenameTemplates {
    #[serde(default = "default_script")]
    pub script: String,

    #[serde(default = "default_style")]
    pub style: String,

    /// Used for image assets (png, jpg, gif, webp, svg)
    #[serde(default = "default_image")]
    pub image: String,

    /// Used for every other emitted asset
    #[serde(default = "default_asset")]
    pub asset: String,

    #[serde(default = "default_source_map")]
    pub source_map: String,
}

impl Default for FilenameTemplates {
    fn default() -> Self {
        Self {
            script: default_script(),
            style: default_style(),
            image: default_image(),
            asset: default_asset(),
            source_map: default_source_map(),
        }
    }
}

impl FilenameTemplates {
    /// (role, template) pairs in a stable order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("script", self.script.as_str()),
            ("style", self.style.as_str()),
            ("image", self.image.as_str()),
            ("asset", self.asset.as_str()),
            ("source_map", self.source_map.as_str()),
        ]
        .into_iter()
    }
}

fn default_script() -> String {
    "static/js/{name}.js".into()
}

fn default_style() -> String {
    "static/css/{name}.css".into()
}

fn default_image() -> String {
    "static/images/{hash:10}{ext}{query}".into()
}

fn default_asset() -> String {
    "static/media/{hash:10}{ext}{query}".into()
}

fn default_source_map() -> String {
    "{file}.map".into()
}

/// A parsed piece of a filename template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Name,
    Ext,
    Query,
    /// Full digest when `None`, otherwise the first N hex characters
    Hash(Option<usize>),
    File,
}

/// Parse a template into parts, rejecting unknown or malformed placeholders.
pub fn parse_template(role: &str, template: &str) -> Result<Vec<TemplatePart>> {
    let invalid = |message: String| ConfigError::InvalidTemplate {
        role: role.to_string(),
        template: template.to_string(),
        message,
    };

    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        literal.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| invalid("unterminated placeholder".to_string()))?;
        let token = &after[..close];

        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
        }

        let part = match token {
            "name" => TemplatePart::Name,
            "ext" => TemplatePart::Ext,
            "query" => TemplatePart::Query,
            "hash" => TemplatePart::Hash(None),
            "file" if role == "source_map" => TemplatePart::File,
            other => match other.strip_prefix("hash:") {
                Some(len) => {
                    let len: usize = len
                        .parse()
                        .map_err(|_| invalid(format!("`{{{other}}}` needs a numeric length")))?;
                    if len == 0 || len > 64 {
                        return Err(invalid(format!(
                            "hash length must be between 1 and 64, got {len}"
                        )));
                    }
                    TemplatePart::Hash(Some(len))
                }
                None => return Err(invalid(format!("unknown placeholder `{{{other}}}`"))),
            },
        };
        parts.push(part);
        rest = &after[close + 1..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }

    if parts.is_empty() {
        return Err(invalid("template is empty".to_string()));
    }

    Ok(parts)
}
