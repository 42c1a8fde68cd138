//! Rule-selected transform chains.
//!
//! A [`RuleSet`] picks the [`TransformChain`] for a module path. The chain's
//! steps run in order over the module bytes; each step may rewrite the bytes,
//! discover dependencies and report diagnostics. [`run_chain`] applies the
//! per-step timeout and the large-asset bypass.

pub mod exec;
pub mod lexer;
pub mod rules;
pub mod runner;
pub mod scan;
pub mod step;
pub mod style;
pub mod text;

pub use rules::{RuleSet, TransformChain};
pub use runner::{RunOptions, run_chain};
pub use step::{StepOutput, TransformStep};

use std::time::Duration;

use bale_graph::{DeclaredDependency, ModuleId, OutputKind};
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;

/// What a step knows about the module it is transforming.
#[derive(Debug, Clone)]
pub struct ModuleMeta {
    pub id: ModuleId,
    /// Output kind as decided so far (rule type, then earlier steps)
    pub output_kind: OutputKind,
    /// Source size in bytes
    pub size: usize,
}

/// Result of running a whole chain over one module.
///
/// This is also the cached payload, so it carries everything needed to
/// rebuild the `Module` without re-running the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOutput {
    pub code: Vec<u8>,
    pub output_kind: OutputKind,
    pub chain_id: String,
    pub dependencies: Vec<DeclaredDependency>,
    pub accepts: Vec<String>,
    pub self_accepting: bool,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{step} failed for {module}: {kind}")]
pub struct TransformError {
    pub module: ModuleId,
    pub step: &'static str,
    pub kind: TransformErrorKind,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransformErrorKind {
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("input is not valid UTF-8")]
    NotText,

    #[error("could not start `{program}`: {message}")]
    Spawn { program: String, message: String },

    #[error("`{program}` exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{0}")]
    Failed(String),
}

impl TransformError {
    pub fn new(module: &ModuleId, step: &'static str, kind: TransformErrorKind) -> Self {
        Self {
            module: module.clone(),
            step,
            kind,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, TransformErrorKind::Timeout(_))
    }
}
