use std::path::Path;

use bale_config::{BundleOptions, ConfigError, RuleType};
use bale_graph::{AssetMode, OutputKind};
use regex::Regex;

use super::step::TransformStep;

/// Ordered steps selected for one module, plus the rules that contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformChain {
    /// BLAKE3 hex over the contributing rules and their steps
    pub id: String,
    pub rules: Vec<String>,
    pub steps: Vec<TransformStep>,
    pub output_kind: OutputKind,
}

impl TransformChain {
    /// Chain with no steps, used for modules no rule matched.
    pub fn passthrough(output_kind: OutputKind) -> Self {
        let id = match output_kind {
            OutputKind::Script => "passthrough:script",
            OutputKind::Style => "passthrough:style",
            OutputKind::Asset(_) => "passthrough:asset",
        };
        Self {
            id: id.to_string(),
            rules: Vec::new(),
            steps: Vec::new(),
            output_kind,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug)]
struct CompiledRule {
    id: String,
    test: Regex,
    exclude: Option<Regex>,
    output_kind: OutputKind,
    steps: Vec<TransformStep>,
}

impl CompiledRule {
    fn matches(&self, path: &str) -> bool {
        self.test.is_match(path) && !self.exclude.as_ref().is_some_and(|ex| ex.is_match(path))
    }
}

#[derive(Debug)]
struct CompiledGroup {
    exclusive: bool,
    rules: Vec<CompiledRule>,
}

/// Compiled rule groups.
#[derive(Debug)]
pub struct RuleSet {
    groups: Vec<CompiledGroup>,
    extract_styles: bool,
    minify: bool,
}

impl RuleSet {
    /// Compile the configured groups. Patterns are matched against the
    /// module path with forward slashes.
    pub fn compile(options: &BundleOptions) -> Result<Self, ConfigError> {
        let mut groups = Vec::with_capacity(options.rules.len());

        for (group_idx, group) in options.rules.iter().enumerate() {
            let group_name = group
                .name
                .clone()
                .unwrap_or_else(|| format!("group{group_idx}"));
            let mut rules = Vec::with_capacity(group.rules.len());

            for (rule_idx, rule) in group.rules.iter().enumerate() {
                let field = format!("rules.{group_name}[{rule_idx}]");
                let test = compile_pattern(&field, "test", &rule.test)?;
                let exclude = rule
                    .exclude
                    .as_deref()
                    .map(|pattern| compile_pattern(&field, "exclude", pattern))
                    .transpose()?;
                rules.push(CompiledRule {
                    id: format!("{group_name}[{rule_idx}]"),
                    test,
                    exclude,
                    output_kind: output_kind_for(rule.rule_type),
                    steps: rule.steps.iter().map(TransformStep::from).collect(),
                });
            }

            groups.push(CompiledGroup {
                exclusive: group.exclusive,
                rules,
            });
        }

        Ok(Self {
            groups,
            extract_styles: options.extract_styles,
            minify: options.minify,
        })
    }

    /// Chain for `path`, or `None` when no rule matches.
    pub fn select(&self, path: &Path) -> Option<TransformChain> {
        let path = path.to_string_lossy().replace('\\', "/");

        let mut contributing: Vec<&CompiledRule> = Vec::new();
        for group in &self.groups {
            if group.exclusive {
                if let Some(rule) = group.rules.iter().find(|r| r.matches(&path)) {
                    contributing.push(rule);
                }
            } else {
                contributing.extend(group.rules.iter().filter(|r| r.matches(&path)));
            }
        }

        let output_kind = contributing.last()?.output_kind;

        let mut steps: Vec<TransformStep> = contributing
            .iter()
            .flat_map(|rule| rule.steps.iter().cloned())
            .filter(|step| !(self.extract_styles && *step == TransformStep::StyleInject))
            .collect();

        if self.minify
            && matches!(output_kind, OutputKind::Script | OutputKind::Style)
            && !steps.contains(&TransformStep::Minify)
        {
            steps.push(TransformStep::Minify);
        }

        let mut hasher = blake3::Hasher::new();
        for rule in &contributing {
            hasher.update(rule.id.as_bytes());
            hasher.update(&[0]);
        }
        for step in &steps {
            step.fingerprint_into(&mut hasher);
        }
        hasher.update(format!("{output_kind:?}").as_bytes());

        Some(TransformChain {
            id: hasher.finalize().to_hex().to_string(),
            rules: contributing.iter().map(|r| r.id.clone()).collect(),
            steps,
            output_kind,
        })
    }
}

fn compile_pattern(field: &str, key: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        field: format!("{field}.{key}"),
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn output_kind_for(rule_type: RuleType) -> OutputKind {
    match rule_type {
        RuleType::Script => OutputKind::Script,
        RuleType::Style => OutputKind::Style,
        RuleType::Asset => OutputKind::Asset(AssetMode::Auto),
        RuleType::AssetResource => OutputKind::Asset(AssetMode::Resource),
        RuleType::AssetInline => OutputKind::Asset(AssetMode::Inline),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bale_config::{RuleGroupOptions, RuleOptions, StepOptions};

    fn defaults() -> RuleSet {
        RuleSet::compile(&BundleOptions::default()).unwrap()
    }

    #[test]
    fn project_script_gets_lint_then_scan() {
        let chain = defaults().select(Path::new("/app/src/main.js")).unwrap();
        assert_eq!(chain.output_kind, OutputKind::Script);
        let names: Vec<_> = chain.steps.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["lint", "scan_imports"]);
        assert_eq!(chain.rules.len(), 2);
    }

    #[test]
    fn dependency_script_skips_lint() {
        let chain = defaults()
            .select(Path::new("/app/node_modules/lodash/lodash.js"))
            .unwrap();
        let names: Vec<_> = chain.steps.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["scan_imports"]);
    }

    #[test]
    fn images_and_fonts() {
        let rules = defaults();
        let image = rules.select(Path::new("/app/src/images/1.jpeg")).unwrap();
        assert_eq!(image.output_kind, OutputKind::Asset(AssetMode::Auto));
        assert!(image.steps.is_empty());
        let font = rules.select(Path::new("/app/src/fonts/iconfont.woff2")).unwrap();
        assert_eq!(font.output_kind, OutputKind::Asset(AssetMode::Resource));
    }

    #[test]
    fn unknown_extension_is_no_match() {
        assert!(defaults().select(Path::new("/app/README.md")).is_none());
    }

    #[test]
    fn extraction_drops_inject_and_minify_appends() {
        let options = BundleOptions {
            extract_styles: true,
            minify: true,
            ..BundleOptions::default()
        };
        let rules = RuleSet::compile(&options).unwrap();
        let chain = rules.select(Path::new("/app/src/css/index.css")).unwrap();
        let names: Vec<_> = chain.steps.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["scan_style_imports", "minify"]);

        let injected = defaults().select(Path::new("/app/src/css/index.css")).unwrap();
        assert_ne!(chain.id, injected.id);
    }

    #[test]
    fn exclusive_group_takes_first_match_only() {
        let options = BundleOptions {
            rules: vec![RuleGroupOptions {
                name: Some("only".into()),
                exclusive: true,
                rules: vec![
                    RuleOptions {
                        test: r"\.svg$".into(),
                        exclude: None,
                        rule_type: RuleType::AssetInline,
                        steps: vec![],
                    },
                    RuleOptions {
                        test: r".*".into(),
                        exclude: None,
                        rule_type: RuleType::Script,
                        steps: vec![StepOptions::ScanImports],
                    },
                ],
            }],
            ..BundleOptions::default()
        };
        let chain = RuleSet::compile(&options)
            .unwrap()
            .select(Path::new("/app/logo.svg"))
            .unwrap();
        assert_eq!(chain.output_kind, OutputKind::Asset(AssetMode::Inline));
        assert_eq!(chain.rules, vec!["only[0]".to_string()]);
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let options = BundleOptions {
            rules: vec![RuleGroupOptions {
                name: None,
                exclusive: false,
                rules: vec![RuleOptions {
                    test: "(".into(),
                    exclude: None,
                    rule_type: RuleType::Script,
                    steps: vec![],
                }],
            }],
            ..BundleOptions::default()
        };
        let err = RuleSet::compile(&options).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }
}
