//! Per-module work: read, transform (or reuse), resolve.

use std::sync::Arc;

use bale_graph::{
    AssetMode, ContentHash, DeclaredDependency, Module, ModuleId, OutputKind, Runtime,
};

use super::cache::{CachedTransform, Fingerprint, TransformCache};
use super::BuildFailure;
use crate::diagnostics::Diagnostic;
use crate::resolver::{ResolveError, ResolveResult, Resolver};
use crate::transform::{ModuleMeta, RuleSet, RunOptions, TransformChain, TransformOutput, run_chain};

/// Shared, read-only state handed to every worker task.
#[derive(Debug)]
pub(crate) struct WorkerContext {
    pub resolver: Resolver,
    pub rules: RuleSet,
    pub runtime: Arc<dyn Runtime>,
    pub cache: Option<Arc<dyn TransformCache>>,
    pub run: RunOptions,
    pub source_maps: bool,
}

/// A module ready to be merged by the coordinator.
#[derive(Debug)]
pub(crate) struct Processed {
    pub module: Module,
    pub resolved: Vec<(DeclaredDependency, Result<ResolveResult, ResolveError>)>,
    pub fresh: Option<CachedTransform>,
    pub diagnostics: Vec<Diagnostic>,
}

pub(crate) async fn process_module(
    ctx: &WorkerContext,
    id: ModuleId,
    is_entry: bool,
) -> Result<Processed, BuildFailure> {
    let runtime = ctx.runtime.as_ref();
    let source = runtime
        .read_file(id.path())
        .await
        .map_err(|error| BuildFailure::Read {
            module: id.clone(),
            error,
        })?;

    let size = source.len();
    let content_hash = ContentHash::of(&source);
    let chain = ctx
        .rules
        .select(id.path())
        .unwrap_or_else(|| TransformChain::passthrough(fallback_kind(&source)));
    let fingerprint = Fingerprint::compute(&content_hash, &chain.id);

    let original_text = if ctx.source_maps {
        String::from_utf8(source.clone()).ok()
    } else {
        None
    };

    let cached = ctx.cache.as_ref().and_then(|cache| cache.get(&id, &fingerprint));
    let (output, fresh) = match cached {
        Some(hit) => {
            tracing::trace!(module = %id, "transform cache hit");
            (hit, None)
        }
        None => {
            let meta = ModuleMeta {
                id: id.clone(),
                output_kind: chain.output_kind,
                size,
            };
            let output = run_chain(&chain, source, &meta, ctx.run)
                .await
                .map_err(BuildFailure::Transform)?;
            let entry = CachedTransform {
                module: id.clone(),
                fingerprint,
                output: output.clone(),
            };
            (output, Some(entry))
        }
    };

    let TransformOutput {
        code,
        output_kind,
        chain_id,
        dependencies,
        accepts,
        self_accepting,
        diagnostics,
    } = output;

    let mut resolved = Vec::with_capacity(dependencies.len());
    for dep in &dependencies {
        let result = ctx.resolver.resolve(&dep.specifier, id.path(), runtime).await;
        resolved.push((dep.clone(), result));
    }

    let source_map = original_text.filter(|_| !output_kind.is_asset());
    let module = Module::builder(id, output_kind)
        .content_hash(content_hash)
        .size(size)
        .code(code)
        .chain_id(chain_id)
        .dependencies(dependencies)
        .accepts(accepts)
        .self_accepting(self_accepting)
        .source_map(source_map)
        .entry(is_entry)
        .build();

    Ok(Processed {
        module,
        resolved,
        fresh,
        diagnostics,
    })
}

/// Output kind for modules no rule matched.
pub(crate) fn fallback_kind(source: &[u8]) -> OutputKind {
    if memchr::memchr(0, source).is_some() || std::str::from_utf8(source).is_err() {
        OutputKind::Asset(AssetMode::Resource)
    } else {
        OutputKind::Script
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_like_detection() {
        assert_eq!(fallback_kind(b"export default 1"), OutputKind::Script);
        assert_eq!(
            fallback_kind(&[0x00, 0x61, 0x73, 0x6d]),
            OutputKind::Asset(AssetMode::Resource)
        );
        assert_eq!(fallback_kind(&[0xff, 0xd8]), OutputKind::Asset(AssetMode::Resource));
    }
}
