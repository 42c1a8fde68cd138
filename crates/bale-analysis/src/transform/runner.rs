use std::time::Duration;

use super::{ModuleMeta, TransformChain, TransformError, TransformErrorKind, TransformOutput};

/// Knobs shared by every chain run of a build.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub step_timeout: Option<Duration>,
    /// Modules at or above this size skip textual steps
    pub large_asset_bytes: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            step_timeout: Some(Duration::from_secs(30)),
            large_asset_bytes: 512 * 1024,
        }
    }
}

/// Run every step of `chain` over `source`.
///
/// Asset chains and modules of at least `large_asset_bytes` skip textual
/// steps. Dependencies keep their first declaration order with duplicates
/// removed.
pub async fn run_chain(
    chain: &TransformChain,
    source: Vec<u8>,
    meta: &ModuleMeta,
    options: RunOptions,
) -> Result<TransformOutput, TransformError> {
    let bypass_text =
        chain.output_kind.is_asset() || source.len() as u64 >= options.large_asset_bytes;

    let mut meta = meta.clone();
    meta.output_kind = chain.output_kind;

    let mut output = TransformOutput {
        code: source,
        output_kind: chain.output_kind,
        chain_id: chain.id.clone(),
        dependencies: Vec::new(),
        accepts: Vec::new(),
        self_accepting: false,
        diagnostics: Vec::new(),
    };

    for step in &chain.steps {
        if bypass_text && step.is_textual() {
            tracing::trace!(module = %meta.id, step = step.name(), "skipping text step");
            continue;
        }

        let code = std::mem::take(&mut output.code);
        let applied = match options.step_timeout {
            Some(limit) => tokio::time::timeout(limit, step.apply(code, &meta))
                .await
                .map_err(|_| {
                    TransformError::new(&meta.id, step.name(), TransformErrorKind::Timeout(limit))
                })??,
            None => step.apply(code, &meta).await?,
        };

        output.code = applied.code;
        for dep in applied.dependencies {
            if !output.dependencies.contains(&dep) {
                output.dependencies.push(dep);
            }
        }
        for spec in applied.accepts {
            if !output.accepts.contains(&spec) {
                output.accepts.push(spec);
            }
        }
        output.self_accepting |= applied.self_accepting;
        output.diagnostics.extend(applied.diagnostics);
        if let Some(kind) = applied.output_kind {
            output.output_kind = kind;
            meta.output_kind = kind;
        }
    }

    Ok(output)
}
