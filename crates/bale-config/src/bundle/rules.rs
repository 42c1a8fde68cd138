//! Transform rule declarations.
//!
//! Rules are declared in groups. An exclusive group contributes at most the
//! first rule whose `test` matches a path; a non-exclusive group contributes
//! every matching rule. Steps from all contributing rules run in declared
//! order.

use serde::{Deserialize, Serialize};

/// Module type selecting how the emitter treats a module's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RuleType {
    #[default]
    #[serde(rename = "script")]
    Script,
    #[serde(rename = "style")]
    Style,
    /// Inlined when smaller than `inline_limit`, emitted as a file otherwise
    #[serde(rename = "asset")]
    Asset,
    /// Always emitted as a file
    #[serde(rename = "asset/resource")]
    AssetResource,
    /// Always inlined as a data URL
    #[serde(rename = "asset/inline")]
    AssetInline,
}

impl RuleType {
    pub fn is_asset(self) -> bool {
        matches!(
            self,
            RuleType::Asset | RuleType::AssetResource | RuleType::AssetInline
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroupOptions {
    #[serde(default)]
    pub name: Option<String>,

    /// First match wins inside the group
    #[serde(default)]
    pub exclusive: bool,

    #[serde(default)]
    pub rules: Vec<RuleOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOptions {
    /// Regular expression matched against the module path
    pub test: String,

    /// Paths matching this expression are skipped by the rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,

    #[serde(default, rename = "type")]
    pub rule_type: RuleType,

    #[serde(default)]
    pub steps: Vec<StepOptions>,
}

/// One step of a transform chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepOptions {
    /// Discover `import`, `export ... from`, `require()` and `import()` specifiers
    ScanImports,
    /// Discover `@import` and `url()` references in stylesheets
    ScanStyleImports,
    /// Turn a stylesheet into a script that injects a `<style>` element
    StyleInject,
    /// Literal text replacement
    Replace { from: String, to: String },
    /// Strip comments and collapse whitespace
    Minify,
    /// Report findings without touching the bytes
    Lint {
        #[serde(default)]
        deny: Vec<String>,
        #[serde(default)]
        max_line_length: Option<usize>,
    },
    /// Pipe the bytes through an external program
    Exec {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl StepOptions {
    pub fn name(&self) -> &'static str {
        match self {
            StepOptions::ScanImports => "scan_imports",
            StepOptions::ScanStyleImports => "scan_style_imports",
            StepOptions::StyleInject => "style_inject",
            StepOptions::Replace { .. } => "replace",
            StepOptions::Minify => "minify",
            StepOptions::Lint { .. } => "lint",
            StepOptions::Exec { .. } => "exec",
        }
    }
}

fn rule(test: &str, rule_type: RuleType, steps: Vec<StepOptions>) -> RuleOptions {
    RuleOptions {
        test: test.to_string(),
        exclude: None,
        rule_type,
        steps,
    }
}

fn style_rule(test: &str) -> RuleOptions {
    rule(
        test,
        RuleType::Style,
        vec![StepOptions::ScanStyleImports, StepOptions::StyleInject],
    )
}

/// Built-in rule set.
///
/// A non-exclusive lint pass over project scripts followed by one exclusive
/// group covering stylesheets, images, fonts and media, JSON and scripts.
/// Preprocessor languages are treated as plain CSS unless an `exec` step is
/// configured for them.
pub fn default_rules() -> Vec<RuleGroupOptions> {
    let mut lint = rule(
        r"\.m?js$",
        RuleType::Script,
        vec![StepOptions::Lint {
            deny: vec!["debugger".into()],
            max_line_length: None,
        }],
    );
    lint.exclude = Some("node_modules".into());

    let mut scripts = rule(r"\.m?js$", RuleType::Script, vec![StepOptions::ScanImports]);
    scripts.exclude = Some("node_modules".into());

    vec![
        RuleGroupOptions {
            name: Some("lint".into()),
            exclusive: false,
            rules: vec![lint],
        },
        RuleGroupOptions {
            name: Some("modules".into()),
            exclusive: true,
            rules: vec![
                style_rule(r"\.css$"),
                style_rule(r"\.less$"),
                style_rule(r"\.s[ac]ss$"),
                style_rule(r"\.styl$"),
                rule(r"\.(png|jpe?g|gif|webp|svg)$", RuleType::Asset, vec![]),
                rule(r"\.(ttf|woff2?|mp3|mp4|avi)$", RuleType::AssetResource, vec![]),
                rule(r"\.json$", RuleType::Script, vec![]),
                scripts,
                // dependency scripts: discovery only, no project-level steps
                rule(r"\.m?js$", RuleType::Script, vec![StepOptions::ScanImports]),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rule_type_uses_slash_names() {
        let value = serde_json::to_value(RuleType::AssetResource).unwrap();
        assert_eq!(value, json!("asset/resource"));
        let parsed: RuleType = serde_json::from_value(json!("asset/inline")).unwrap();
        assert_eq!(parsed, RuleType::AssetInline);
    }

    #[test]
    fn steps_are_tagged() {
        let step: StepOptions =
            serde_json::from_value(json!({"step": "exec", "program": "lessc", "args": ["-"]}))
                .unwrap();
        assert_eq!(
            step,
            StepOptions::Exec {
                program: "lessc".into(),
                args: vec!["-".into()]
            }
        );
        assert_eq!(step.name(), "exec");
    }

    #[test]
    fn default_rules_cover_styles_and_assets() {
        let groups = default_rules();
        assert_eq!(groups.len(), 2);
        assert!(!groups[0].exclusive);
        assert!(groups[1].exclusive);
        let types: Vec<_> = groups[1].rules.iter().map(|r| r.rule_type).collect();
        assert!(types.contains(&RuleType::Asset));
        assert!(types.contains(&RuleType::AssetResource));
        assert!(types.contains(&RuleType::Style));
    }
}
