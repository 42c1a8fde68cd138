//! Compiled filename templates.

use bale_config::{ConfigError, FilenameTemplates, TemplatePart, parse_template};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "avif", "ico", "bmp"];

/// Values substituted into a template.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateInput<'a> {
    pub name: &'a str,
    /// With the leading dot
    pub ext: &'a str,
    /// With the leading `?`, or empty
    pub query: &'a str,
    /// Full hex digest
    pub hash: &'a str,
    pub file: &'a str,
}

#[derive(Debug, Clone)]
pub struct Templates {
    script: Vec<TemplatePart>,
    style: Vec<TemplatePart>,
    image: Vec<TemplatePart>,
    asset: Vec<TemplatePart>,
    source_map: Vec<TemplatePart>,
}

impl Templates {
    pub fn compile(templates: &FilenameTemplates) -> Result<Self, ConfigError> {
        Ok(Self {
            script: parse_template("script", &templates.script)?,
            style: parse_template("style", &templates.style)?,
            image: parse_template("image", &templates.image)?,
            asset: parse_template("asset", &templates.asset)?,
            source_map: parse_template("source_map", &templates.source_map)?,
        })
    }

    pub fn script(&self, input: &TemplateInput<'_>) -> String {
        render(&self.script, input)
    }

    pub fn style(&self, input: &TemplateInput<'_>) -> String {
        render(&self.style, input)
    }

    /// Image template for image extensions, asset template otherwise.
    pub fn asset(&self, input: &TemplateInput<'_>) -> String {
        let ext = input.ext.trim_start_matches('.').to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            render(&self.image, input)
        } else {
            render(&self.asset, input)
        }
    }

    pub fn source_map(&self, file: &str) -> String {
        render(
            &self.source_map,
            &TemplateInput {
                file,
                ..TemplateInput::default()
            },
        )
    }
}

pub fn render(parts: &[TemplatePart], input: &TemplateInput<'_>) -> String {
    let mut out = String::new();
    for part in parts {
        match part {
            TemplatePart::Literal(text) => out.push_str(text),
            TemplatePart::Name => out.push_str(input.name),
            TemplatePart::Ext => out.push_str(input.ext),
            TemplatePart::Query => out.push_str(input.query),
            TemplatePart::Hash(None) => out.push_str(input.hash),
            TemplatePart::Hash(Some(len)) => {
                out.push_str(&input.hash[..(*len).min(input.hash.len())]);
            }
            TemplatePart::File => out.push_str(input.file),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates() -> Templates {
        Templates::compile(&FilenameTemplates::default()).unwrap()
    }

    #[test]
    fn default_asset_names() {
        let t = templates();
        let hash = "0123456789abcdef";
        let input = TemplateInput {
            name: "1",
            ext: ".jpeg",
            query: "",
            hash,
            file: "",
        };
        assert_eq!(t.asset(&input), "static/images/0123456789.jpeg");

        let font = TemplateInput {
            name: "iconfont",
            ext: ".woff2",
            query: "?v=3",
            hash,
            file: "",
        };
        assert_eq!(t.asset(&font), "static/media/0123456789.woff2?v=3");
    }

    #[test]
    fn script_and_map_names() {
        let t = templates();
        let input = TemplateInput {
            name: "main",
            ext: ".js",
            ..TemplateInput::default()
        };
        let script = t.script(&input);
        assert_eq!(script, "static/js/main.js");
        assert_eq!(t.source_map(&script), "static/js/main.js.map");
    }

    #[test]
    fn hash_length_is_capped_by_digest() {
        let parts = parse_template("asset", "{hash:64}").unwrap();
        let out = render(
            &parts,
            &TemplateInput {
                hash: "abc",
                ..TemplateInput::default()
            },
        );
        assert_eq!(out, "abc");
    }
}
