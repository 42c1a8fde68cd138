use bale_config::StepOptions;
use bale_graph::{DeclaredDependency, OutputKind};

use super::lexer::Lang;
use super::{ModuleMeta, TransformError, TransformErrorKind, exec, scan, style, text};
use crate::diagnostics::Diagnostic;

/// The closed set of transform steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformStep {
    ScanImports,
    ScanStyleImports,
    StyleInject,
    Replace { from: String, to: String },
    Minify,
    Lint {
        deny: Vec<String>,
        max_line_length: Option<usize>,
    },
    Exec { program: String, args: Vec<String> },
}

/// What one step produced.
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    pub code: Vec<u8>,
    pub dependencies: Vec<DeclaredDependency>,
    pub accepts: Vec<String>,
    pub self_accepting: bool,
    /// Replaces the module's output kind when set
    pub output_kind: Option<OutputKind>,
    pub diagnostics: Vec<Diagnostic>,
}

impl StepOutput {
    pub fn passthrough(code: Vec<u8>) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }
}

impl From<&StepOptions> for TransformStep {
    fn from(options: &StepOptions) -> Self {
        match options {
            StepOptions::ScanImports => TransformStep::ScanImports,
            StepOptions::ScanStyleImports => TransformStep::ScanStyleImports,
            StepOptions::StyleInject => TransformStep::StyleInject,
            StepOptions::Replace { from, to } => TransformStep::Replace {
                from: from.clone(),
                to: to.clone(),
            },
            StepOptions::Minify => TransformStep::Minify,
            StepOptions::Lint {
                deny,
                max_line_length,
            } => TransformStep::Lint {
                deny: deny.clone(),
                max_line_length: *max_line_length,
            },
            StepOptions::Exec { program, args } => TransformStep::Exec {
                program: program.clone(),
                args: args.clone(),
            },
        }
    }
}

impl TransformStep {
    pub fn name(&self) -> &'static str {
        match self {
            TransformStep::ScanImports => "scan_imports",
            TransformStep::ScanStyleImports => "scan_style_imports",
            TransformStep::StyleInject => "style_inject",
            TransformStep::Replace { .. } => "replace",
            TransformStep::Minify => "minify",
            TransformStep::Lint { .. } => "lint",
            TransformStep::Exec { .. } => "exec",
        }
    }

    /// Steps that interpret the bytes as text; skipped for assets.
    pub fn is_textual(&self) -> bool {
        !matches!(self, TransformStep::Exec { .. })
    }

    /// Feed the step's identity into a chain fingerprint.
    pub fn fingerprint_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(self.name().as_bytes());
        let fields: Vec<&str> = match self {
            TransformStep::Replace { from, to } => vec![from.as_str(), to.as_str()],
            TransformStep::Lint {
                deny,
                max_line_length,
            } => {
                hasher.update(&max_line_length.unwrap_or(0).to_le_bytes());
                deny.iter().map(String::as_str).collect()
            }
            TransformStep::Exec { program, args } => std::iter::once(program.as_str())
                .chain(args.iter().map(String::as_str))
                .collect(),
            _ => Vec::new(),
        };
        for field in fields {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
    }

    /// Apply the step to `code`.
    pub async fn apply(&self, code: Vec<u8>, meta: &ModuleMeta) -> Result<StepOutput, TransformError> {
        let fail = |kind| TransformError::new(&meta.id, self.name(), kind);
        let lang = match meta.output_kind {
            OutputKind::Style => Lang::Style,
            _ => Lang::Script,
        };

        match self {
            TransformStep::ScanImports => {
                let src = as_text(&code).map_err(fail)?;
                let dependencies = scan::script_references(src)
                    .into_iter()
                    .map(|r| DeclaredDependency::new(r.specifier, r.kind))
                    .collect();
                let (accepts, self_accepting) = scan::hot_accepts(src);
                Ok(StepOutput {
                    dependencies,
                    accepts,
                    self_accepting,
                    ..StepOutput::passthrough(code)
                })
            }
            TransformStep::ScanStyleImports => {
                let src = as_text(&code).map_err(fail)?;
                let dependencies = scan::style_references(src)
                    .into_iter()
                    .map(|r| DeclaredDependency::new(r.specifier, r.kind))
                    .collect();
                Ok(StepOutput {
                    dependencies,
                    ..StepOutput::passthrough(code)
                })
            }
            TransformStep::StyleInject => {
                let src = as_text(&code).map_err(fail)?;
                let label = meta
                    .id
                    .path()
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Ok(StepOutput {
                    code: style::inject(src, &label).into_bytes(),
                    self_accepting: true,
                    output_kind: Some(OutputKind::Script),
                    ..StepOutput::default()
                })
            }
            TransformStep::Replace { from, to } => {
                let src = as_text(&code).map_err(fail)?;
                Ok(StepOutput::passthrough(
                    text::replace(src, from, to).into_bytes(),
                ))
            }
            TransformStep::Minify => {
                let src = as_text(&code).map_err(fail)?;
                Ok(StepOutput::passthrough(text::minify(src, lang).into_bytes()))
            }
            TransformStep::Lint {
                deny,
                max_line_length,
            } => {
                let src = as_text(&code).map_err(fail)?;
                let diagnostics = text::lint(src, lang, deny, *max_line_length)
                    .into_iter()
                    .map(|d| d.with_module(meta.id.clone()))
                    .collect();
                Ok(StepOutput {
                    diagnostics,
                    ..StepOutput::passthrough(code)
                })
            }
            TransformStep::Exec { program, args } => {
                let out = exec::run(program, args, &code, meta.id.path())
                    .await
                    .map_err(fail)?;
                Ok(StepOutput::passthrough(out))
            }
        }
    }
}

fn as_text(code: &[u8]) -> Result<&str, TransformErrorKind> {
    std::str::from_utf8(code).map_err(|_| TransformErrorKind::NotText)
}
