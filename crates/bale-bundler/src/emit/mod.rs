//! Chunk rendering and asset emission.
//!
//! Emission runs in four passes over a split graph:
//!
//! 1. asset modules are inlined as data URLs or emitted as files,
//! 2. style modules are concatenated per chunk when styles are extracted,
//! 3. every non-empty chunk is rendered as a script of module factories,
//!    entry chunks carrying the registry runtime,
//! 4. an HTML page links the entry chunks when configured.
//!
//! Scripts are rendered with placeholder URLs for the chunks they load, then
//! named dependencies first: a script's `{hash}` is the digest of its final
//! text (without the source map trailer), so it changes exactly when the bytes
//! do. Chunks that load each other in a cycle share one digest over the whole
//! cycle, mixed with each chunk's id.

pub mod html;
pub mod inline;
pub mod lower;
pub mod runtime;
pub mod sourcemap;
pub mod style;
pub mod template;

use std::path::{Path, PathBuf};

use bale_analysis::transform::scan::{Reference, ReferenceForm};
use bale_config::{BundleOptions, ConfigError, FilenameTemplates, HtmlOptions};
use bale_graph::{ContentHash, DependencyEdge, Module, ModuleGraph, ModuleId, OutputKind, RuntimeError};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::chunks::{Chunk, ChunkKind, ChunkSet};
use inline::{data_url, should_inline};
use lower::{Target, lower, quote};
use sourcemap::ChunkWriter;
use template::{TemplateInput, Templates};

/// What an emitted file is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetRole {
    Script,
    Style,
    SourceMap,
    Asset,
    Html,
}

/// One output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedAsset {
    pub role: AssetRole,
    /// Rendered filename, relative to the output directory; may carry the
    /// module's `?query`
    pub filename: String,
    pub content: Vec<u8>,
    /// Digest of `content`
    pub hash: ContentHash,
    /// Chunk the file belongs to
    pub chunk: Option<String>,
    /// Module an asset file was emitted for
    pub module: Option<ModuleId>,
}

impl EmittedAsset {
    /// On-disk path: the filename without its query.
    pub fn path(&self) -> &str {
        self.filename
            .split_once('?')
            .map_or(self.filename.as_str(), |(path, _)| path)
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("output file {filename} is produced by both {first} and {second} with different content")]
    Collision {
        filename: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Template(#[from] ConfigError),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },
}

/// Emitter settings, all paths absolute.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Project root; registry keys are relative to it
    pub root: PathBuf,
    pub filenames: FilenameTemplates,
    pub public_path: String,
    pub inline_limit: u64,
    pub extract_styles: bool,
    pub source_maps: bool,
    /// Give modules a `module.hot` handle
    pub hot: bool,
    pub html: Option<HtmlOptions>,
}

impl EmitOptions {
    pub fn from_bundle(options: &BundleOptions, root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            filenames: options.filenames.clone(),
            public_path: options.public_path.clone(),
            inline_limit: options.inline_limit,
            extract_styles: options.extract_styles,
            source_maps: options.source_maps,
            hot: false,
            html: options.html.clone(),
        }
    }

    pub fn with_hot(mut self, hot: bool) -> Self {
        self.hot = hot;
        self
    }
}

/// Registry key of a module: root-relative, forward slashes, plus `?query`.
pub fn module_key(root: &Path, id: &ModuleId) -> String {
    let path = id.path().strip_prefix(root).unwrap_or(id.path());
    let mut key = path.to_string_lossy().replace('\\', "/");
    if let Some(query) = id.query() {
        key.push('?');
        key.push_str(query);
    }
    key
}

/// Public URLs of one chunk's files.
#[derive(Debug, Clone, Default)]
struct ChunkUrls {
    script: Option<String>,
    style: Option<String>,
}

/// A script chunk rendered before its filename is known.
struct RenderedScript<'c> {
    chunk: &'c Chunk,
    /// Position in the chunk set
    index: usize,
    writer: ChunkWriter,
    /// Chunks whose script URL the text embeds, by position
    refs: Vec<usize>,
}

const PLACEHOLDER_PREFIX: &str = "__bale_chunk_url_";

/// Stand-in for the script URL of the chunk at `index`.
fn url_placeholder(index: usize) -> String {
    format!("{PLACEHOLDER_PREFIX}{index}__")
}

fn placeholder_index(url: &str) -> Option<usize> {
    url.strip_prefix(PLACEHOLDER_PREFIX)?
        .strip_suffix("__")?
        .parse()
        .ok()
}

/// Assets accepted so far, keyed by on-disk path.
#[derive(Default)]
struct Outputs {
    assets: Vec<EmittedAsset>,
    owners: FxHashMap<String, (ContentHash, String)>,
}

impl Outputs {
    fn push(&mut self, asset: EmittedAsset, owner: String) -> Result<(), EmitError> {
        match self.owners.get(asset.path()) {
            Some((hash, _)) if *hash == asset.hash => {
                tracing::trace!(file = asset.path(), "identical output deduplicated");
                Ok(())
            }
            Some((_, first)) => Err(EmitError::Collision {
                filename: asset.path().to_string(),
                first: first.clone(),
                second: owner,
            }),
            None => {
                self.owners
                    .insert(asset.path().to_string(), (asset.hash, owner));
                self.assets.push(asset);
                Ok(())
            }
        }
    }
}

pub struct Emitter {
    options: EmitOptions,
    templates: Templates,
    html_template: Option<String>,
}

impl Emitter {
    pub fn new(options: EmitOptions) -> Result<Self, EmitError> {
        let templates = Templates::compile(&options.filenames)?;
        Ok(Self {
            options,
            templates,
            html_template: None,
        })
    }

    /// Page text to inject tags into instead of the built-in page.
    pub fn with_html_template(mut self, template: String) -> Self {
        self.html_template = Some(template);
        self
    }

    pub fn options(&self) -> &EmitOptions {
        &self.options
    }

    pub fn emit(&self, chunks: &ChunkSet, graph: &ModuleGraph) -> Result<Vec<EmittedAsset>, EmitError> {
        let mut out = Outputs::default();

        let asset_urls = self.emit_assets(chunks, graph, &mut out)?;

        let mut styles: FxHashMap<String, (String, ChunkWriter)> = FxHashMap::default();
        let mut urls: FxHashMap<String, ChunkUrls> = FxHashMap::default();
        for (index, chunk) in chunks.iter().enumerate() {
            let mut entry = ChunkUrls::default();
            if !chunk.is_empty() {
                entry.script = Some(url_placeholder(index));
            }
            if self.options.extract_styles {
                if let Some((filename, writer)) = self.extract_styles(chunk, graph, &asset_urls) {
                    entry.style = Some(self.public_url(&filename));
                    styles.insert(chunk.id.clone(), (filename, writer));
                }
            }
            urls.insert(chunk.id.clone(), entry);
        }

        let externals = externals_by_importer(graph);
        let mut rendered: Vec<RenderedScript<'_>> = chunks
            .iter()
            .enumerate()
            .filter(|(_, chunk)| !chunk.is_empty())
            .map(|(index, chunk)| {
                self.render_script(chunk, index, chunks, graph, &asset_urls, &urls, &externals)
            })
            .collect();
        let names = self.name_scripts(&mut rendered, chunks.len());

        for (index, chunk) in chunks.iter().enumerate() {
            if let (Some(entry), Some(name)) = (urls.get_mut(&chunk.id), &names[index]) {
                entry.script = Some(self.public_url(name));
            }
        }

        let mut rendered = rendered.into_iter().peekable();
        for (index, chunk) in chunks.iter().enumerate() {
            if let Some(script) = rendered.next_if(|script| script.index == index) {
                if let Some(filename) = names[index].clone() {
                    self.emit_script(script, filename, &mut out)?;
                }
            }
            if let Some((filename, writer)) = styles.remove(&chunk.id) {
                self.emit_style(chunk, filename, writer, &mut out)?;
            }
        }

        if let Some(html) = &self.options.html {
            self.emit_page(html, chunks, &urls, &mut out)?;
        }

        tracing::debug!(files = out.assets.len(), "emitted chunk set");
        Ok(out.assets)
    }

    fn emit_assets(
        &self,
        chunks: &ChunkSet,
        graph: &ModuleGraph,
        out: &mut Outputs,
    ) -> Result<FxHashMap<ModuleId, String>, EmitError> {
        let mut urls = FxHashMap::default();
        let covered = graph.sort_by_discovery(chunks.covered().into_iter().collect());
        for id in covered {
            let Some(module) = graph.module(&id) else {
                continue;
            };
            let OutputKind::Asset(mode) = module.output_kind else {
                continue;
            };

            let url = if should_inline(mode, module.code.len() as u64, self.options.inline_limit) {
                tracing::trace!(module = %id, "inlining asset");
                data_url(module.path(), &module.code)
            } else {
                let hash = ContentHash::of(&module.code);
                let hex = hash.to_hex();
                let name = id.name();
                let ext = id.extension().map(|e| format!(".{e}")).unwrap_or_default();
                let query = id.query().map(|q| format!("?{q}")).unwrap_or_default();
                let filename = self.templates.asset(&TemplateInput {
                    name: &name,
                    ext: &ext,
                    query: &query,
                    hash: &hex,
                    file: "",
                });
                let url = self.public_url(&filename);
                out.push(
                    EmittedAsset {
                        role: AssetRole::Asset,
                        filename,
                        content: module.code.to_vec(),
                        hash,
                        chunk: None,
                        module: Some(id.clone()),
                    },
                    id.to_string(),
                )?;
                url
            };
            urls.insert(id, url);
        }
        Ok(urls)
    }

    /// Final filename of every rendered script, indexed like the chunk set.
    ///
    /// Placeholders are swapped for real URLs as names become known, so when
    /// a script is hashed every chunk it loads outside its own cycle is
    /// already spelled out in its text.
    fn name_scripts(&self, rendered: &mut [RenderedScript<'_>], chunk_count: usize) -> Vec<Option<String>> {
        let mut names: Vec<Option<String>> = vec![None; chunk_count];
        let position: FxHashMap<usize, usize> = rendered
            .iter()
            .enumerate()
            .map(|(pos, script)| (script.index, pos))
            .collect();

        let mut loads: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..rendered.len()).map(|pos| loads.add_node(pos)).collect();
        for (pos, script) in rendered.iter().enumerate() {
            for target in script.refs.iter().filter_map(|index| position.get(index)) {
                loads.add_edge(nodes[pos], nodes[*target], ());
            }
        }

        // Components come out loaded-first.
        for component in tarjan_scc(&loads) {
            let mut members: Vec<usize> = component.iter().map(|node| loads[*node]).collect();
            members.sort_unstable();
            let cyclic = members.len() > 1 || loads.contains_edge(component[0], component[0]);

            for &pos in &members {
                self.fill_urls(&mut rendered[pos], &names);
            }

            let shared = cyclic.then(|| {
                let mut hasher = blake3::Hasher::new();
                hasher.update(self.options.public_path.as_bytes());
                for &pos in &members {
                    hasher.update(&[0]);
                    hasher.update(rendered[pos].writer.as_str().as_bytes());
                }
                hasher.finalize()
            });

            for &pos in &members {
                let script = &rendered[pos];
                let hex = match &shared {
                    Some(shared) => {
                        let mut hasher = blake3::Hasher::new();
                        hasher.update(shared.as_bytes());
                        hasher.update(script.chunk.id.as_bytes());
                        hasher.finalize().to_hex().to_string()
                    }
                    None => ContentHash::of(script.writer.as_str().as_bytes()).to_hex(),
                };
                names[script.index] = Some(self.templates.script(&TemplateInput {
                    name: &script.chunk.id,
                    ext: ".js",
                    hash: &hex,
                    ..TemplateInput::default()
                }));
            }
        }

        for script in rendered.iter_mut() {
            self.fill_urls(script, &names);
        }
        names
    }

    /// Swap the placeholders of already named chunks for their URLs.
    fn fill_urls(&self, script: &mut RenderedScript<'_>, names: &[Option<String>]) {
        for &index in &script.refs {
            if let Some(name) = &names[index] {
                let url = quote(&self.public_url(name));
                script
                    .writer
                    .replace(&url_placeholder(index), &url[1..url.len() - 1]);
            }
        }
    }

    fn extract_styles(
        &self,
        chunk: &Chunk,
        graph: &ModuleGraph,
        asset_urls: &FxHashMap<ModuleId, String>,
    ) -> Option<(String, ChunkWriter)> {
        let ordered = style::ordered_styles(graph, chunk);
        if ordered.is_empty() {
            return None;
        }

        let mut writer = ChunkWriter::new(self.options.source_maps);
        for id in &ordered {
            let Some(module) = graph.module(id) else {
                continue;
            };
            let edges = graph.outgoing(id);
            let code = module.code_str();
            let mut css = style::rewrite(&code, |reference| {
                edge_for(&edges, reference).and_then(|edge| asset_urls.get(&edge.target).cloned())
            });
            if !css.ends_with('\n') {
                css.push('\n');
            }
            let key = module_key(&self.options.root, id);
            writer.push(&format!("/* {key} */\n"));
            writer.push_mapped(&css, &key, Some(code.as_ref()));
        }

        let hex = ContentHash::of(writer.as_str().as_bytes()).to_hex();
        let filename = self.templates.style(&TemplateInput {
            name: &chunk.id,
            ext: ".css",
            hash: &hex,
            ..TemplateInput::default()
        });
        Some((filename, writer))
    }

    fn emit_style(
        &self,
        chunk: &Chunk,
        filename: String,
        mut writer: ChunkWriter,
        out: &mut Outputs,
    ) -> Result<(), EmitError> {
        let map_filename = self.options.source_maps.then(|| self.templates.source_map(&filename));
        if let Some(map_filename) = &map_filename {
            writer.push(&format!("/*# sourceMappingURL={} */\n", self.public_url(map_filename)));
        }
        let (css, map) = writer.finish(&filename);
        self.push_text(out, AssetRole::Style, filename, css, chunk)?;
        if let (Some(map_filename), Some(map)) = (map_filename, map) {
            self.push_text(out, AssetRole::SourceMap, map_filename, map, chunk)?;
        }
        Ok(())
    }

    /// Render `chunk` with placeholder URLs for every chunk script it loads.
    #[allow(clippy::too_many_arguments)]
    fn render_script<'c>(
        &self,
        chunk: &'c Chunk,
        index: usize,
        chunks: &ChunkSet,
        graph: &ModuleGraph,
        asset_urls: &FxHashMap<ModuleId, String>,
        urls: &FxHashMap<String, ChunkUrls>,
        externals: &FxHashMap<ModuleId, FxHashSet<String>>,
    ) -> RenderedScript<'c> {
        let mut writer = ChunkWriter::new(self.options.source_maps);
        let mut refs: Vec<usize> = Vec::new();
        let mut note = |files: &[String]| {
            for file in files {
                if let Some(loaded) = placeholder_index(file) {
                    if !refs.contains(&loaded) {
                        refs.push(loaded);
                    }
                }
            }
        };

        if chunk.kind == ChunkKind::Entry {
            writer.push(&runtime::runtime(self.options.hot));
        }
        writer.push(runtime::DEFINE_OPEN);

        let no_externals = FxHashSet::default();
        for id in &chunk.modules {
            let Some(module) = graph.module(id) else {
                continue;
            };
            let edges = graph.outgoing(id);
            let module_externals = externals.get(id).unwrap_or(&no_externals);
            let resolve = |reference: &Reference| match edge_for(&edges, reference) {
                Some(edge) => {
                    let key = module_key(&self.options.root, &edge.target);
                    match chunks.by_root(&edge.target) {
                        Some(target) if reference.form == ReferenceForm::DynamicImport => {
                            let files = load_list(target, urls, true);
                            note(&files);
                            Target::Chunk { key, files }
                        }
                        _ => Target::Module(key),
                    }
                }
                None if module_externals.contains(&reference.specifier) => {
                    Target::External(reference.specifier.clone())
                }
                None => Target::Missing(reference.specifier.clone()),
            };

            let key = module_key(&self.options.root, id);
            let (prelude, mut body, original) = self.factory_body(&module, asset_urls, resolve);
            if !body.ends_with('\n') {
                body.push('\n');
            }
            let prelude = if prelude.is_empty() {
                String::new()
            } else {
                format!(" {prelude}")
            };
            writer.push(&format!(
                "{}: function (module, exports, require) {{{prelude}\n",
                quote(&key)
            ));
            writer.push_mapped(&body, &key, original.as_deref());
            writer.push("},\n");
        }
        writer.push(runtime::DEFINE_CLOSE);

        if chunk.kind == ChunkKind::Entry {
            if let Some(root) = &chunk.root {
                let files = load_list(chunk, urls, false);
                note(&files);
                let files: Vec<String> = files.iter().map(|f| quote(f)).collect();
                writer.push(&format!(
                    "__bale__.run([{}], {});\n",
                    files.join(", "),
                    quote(&module_key(&self.options.root, root))
                ));
            }
        }

        RenderedScript {
            chunk,
            index,
            writer,
            refs,
        }
    }

    fn emit_script(
        &self,
        script: RenderedScript<'_>,
        filename: String,
        out: &mut Outputs,
    ) -> Result<(), EmitError> {
        let RenderedScript { chunk, mut writer, .. } = script;
        let map_filename = self.options.source_maps.then(|| self.templates.source_map(&filename));
        if let Some(map_filename) = &map_filename {
            writer.push(&format!("//# sourceMappingURL={}\n", self.public_url(map_filename)));
        }

        let (code, map) = writer.finish(&filename);
        tracing::debug!(chunk = %chunk.id, file = %filename, modules = chunk.modules.len(), "rendered chunk");
        self.push_text(out, AssetRole::Script, filename, code, chunk)?;
        if let (Some(map_filename), Some(map)) = (map_filename, map) {
            self.push_text(out, AssetRole::SourceMap, map_filename, map, chunk)?;
        }
        Ok(())
    }

    /// `(prelude, body, original text)` of one module factory.
    fn factory_body(
        &self,
        module: &Module,
        asset_urls: &FxHashMap<ModuleId, String>,
        resolve: impl FnMut(&Reference) -> Target,
    ) -> (String, String, Option<String>) {
        match module.output_kind {
            OutputKind::Asset(_) => {
                let url = asset_urls.get(&module.id).map(String::as_str).unwrap_or("");
                (String::new(), format!("module.exports = {};", quote(url)), None)
            }
            OutputKind::Style if self.options.extract_styles => (String::new(), String::new(), None),
            OutputKind::Style => {
                let label = module_key(&self.options.root, &module.id);
                let code = module.code_str();
                let wrapped = bale_analysis::transform::style::inject(&code, &label);
                let lowered = lower(&wrapped, resolve);
                (lowered.prelude, lowered.body, None)
            }
            OutputKind::Script if module.id.extension() == Some("json") => {
                let code = module.code_str();
                let body = format!("module.exports = {};", code.trim_end());
                (String::new(), body, Some(code.into_owned()))
            }
            OutputKind::Script => {
                let code = module.code_str();
                let lowered = lower(&code, resolve);
                (lowered.prelude, lowered.body, Some(code.into_owned()))
            }
        }
    }

    fn emit_page(
        &self,
        html: &HtmlOptions,
        chunks: &ChunkSet,
        urls: &FxHashMap<String, ChunkUrls>,
        out: &mut Outputs,
    ) -> Result<(), EmitError> {
        let mut styles: Vec<String> = Vec::new();
        let mut scripts: Vec<String> = Vec::new();
        for chunk in chunks.iter().filter(|c| c.kind == ChunkKind::Entry) {
            let ids = chunk.requires.iter().map(String::as_str).chain([chunk.id.as_str()]);
            for id in ids {
                let Some(entry) = urls.get(id) else { continue };
                if let Some(style) = &entry.style {
                    if !styles.contains(style) {
                        styles.push(style.clone());
                    }
                }
                if let Some(script) = &entry.script {
                    if !scripts.contains(script) {
                        scripts.push(script.clone());
                    }
                }
            }
        }

        let page = html::render_page(self.html_template.as_deref(), &styles, &scripts);
        let content = page.into_bytes();
        out.push(
            EmittedAsset {
                role: AssetRole::Html,
                filename: html.filename.clone(),
                hash: ContentHash::of(&content),
                content,
                chunk: None,
                module: None,
            },
            "the html page".to_string(),
        )
    }

    fn push_text(
        &self,
        out: &mut Outputs,
        role: AssetRole,
        filename: String,
        text: String,
        chunk: &Chunk,
    ) -> Result<(), EmitError> {
        let content = text.into_bytes();
        out.push(
            EmittedAsset {
                role,
                filename,
                hash: ContentHash::of(&content),
                content,
                chunk: Some(chunk.id.clone()),
                module: None,
            },
            format!("chunk {}", chunk.id),
        )
    }

    fn public_url(&self, filename: &str) -> String {
        let base = &self.options.public_path;
        if base.is_empty() || base.ends_with('/') {
            format!("{base}{filename}")
        } else {
            format!("{base}/{filename}")
        }
    }
}

/// Files to load before a chunk's modules can run: required chunks first,
/// then the chunk's own stylesheet and, optionally, its script.
fn load_list(chunk: &Chunk, urls: &FxHashMap<String, ChunkUrls>, with_script: bool) -> Vec<String> {
    let mut files = Vec::new();
    for required in &chunk.requires {
        if let Some(entry) = urls.get(required) {
            files.extend(entry.style.iter().cloned());
            files.extend(entry.script.iter().cloned());
        }
    }
    if let Some(own) = urls.get(&chunk.id) {
        files.extend(own.style.iter().cloned());
        if with_script {
            files.extend(own.script.iter().cloned());
        }
    }
    files
}

fn edge_for<'a>(edges: &'a [DependencyEdge], reference: &Reference) -> Option<&'a DependencyEdge> {
    edges.iter().find(|edge| edge.specifier == reference.specifier)
}

fn externals_by_importer(graph: &ModuleGraph) -> FxHashMap<ModuleId, FxHashSet<String>> {
    let mut map: FxHashMap<ModuleId, FxHashSet<String>> = FxHashMap::default();
    for (specifier, importers) in graph.externals() {
        for importer in importers {
            map.entry(importer).or_default().insert(specifier.clone());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::split;
    use bale_config::SplitStrategy;
    use bale_graph::{AssetMode, EdgeKind};

    const ROOT: &str = "/app";

    fn add(graph: &ModuleGraph, path: &str, kind: OutputKind, code: &[u8], entry: bool) -> ModuleId {
        let id = ModuleId::new(format!("{ROOT}/{path}"));
        graph
            .add_module(
                Module::builder(id.clone(), kind)
                    .source(code)
                    .code(code.to_vec())
                    .entry(entry)
                    .build(),
            )
            .unwrap();
        id
    }

    fn link(graph: &ModuleGraph, from: &ModuleId, spec: &str, to: &ModuleId, kind: EdgeKind) {
        graph
            .add_edge(DependencyEdge::new(from.clone(), spec, to.clone(), kind))
            .unwrap();
    }

    fn options() -> EmitOptions {
        EmitOptions::from_bundle(&BundleOptions::default(), Path::new(ROOT))
    }

    fn emit(options: EmitOptions, graph: &ModuleGraph, entries: &[ModuleId]) -> Result<Vec<EmittedAsset>, EmitError> {
        let chunks = split(graph, entries, SplitStrategy::Duplicate);
        Emitter::new(options).unwrap().emit(&chunks, graph)
    }

    fn text<'a>(assets: &'a [EmittedAsset], filename: &str) -> &'a str {
        let asset = assets
            .iter()
            .find(|a| a.filename == filename)
            .unwrap_or_else(|| panic!("{filename} not emitted"));
        std::str::from_utf8(&asset.content).unwrap()
    }

    #[test]
    fn keys_are_root_relative() {
        let id = ModuleId::with_query("/app/src/font.woff", "v=3");
        assert_eq!(module_key(Path::new("/app"), &id), "src/font.woff?v=3");
        let outside = ModuleId::new("/lib/x.js");
        assert_eq!(module_key(Path::new("/app"), &outside), "/lib/x.js");
    }

    #[test]
    fn entry_and_dynamic_chunks() {
        let graph = ModuleGraph::new();
        let main = add(&graph, "src/main.js", OutputKind::Script, b"import('./math').then(m => m.default(2));\n", true);
        let math = add(&graph, "src/math.js", OutputKind::Script, b"export default function (x) { return x * x; }\n", false);
        link(&graph, &main, "./math", &math, EdgeKind::Dynamic);

        let assets = emit(options(), &graph, &[main]).unwrap();
        let main_js = text(&assets, "static/js/main.js");
        assert!(main_js.contains("if (global.__bale__) return;"));
        assert!(main_js.contains("__bale__.load([\"/static/js/math.js\"], \"src/math.js\")"));
        assert!(main_js.contains("__bale__.run([], \"src/main.js\");"));

        let math_js = text(&assets, "static/js/math.js");
        assert!(!math_js.contains("global.__bale__"));
        assert!(math_js.contains("\"src/math.js\": function (module, exports, require) { __bale__.esm(exports, {});\nexports.default = function (x)"));
    }

    fn hashed_scripts(math_source: &[u8]) -> (Vec<EmittedAsset>, Vec<String>) {
        let graph = ModuleGraph::new();
        let main = add(&graph, "src/main.js", OutputKind::Script, b"import('./math').then(m => m.x);\n", true);
        let math = add(&graph, "src/math.js", OutputKind::Script, math_source, false);
        link(&graph, &main, "./math", &math, EdgeKind::Dynamic);

        let mut options = options();
        options.filenames.script = "static/js/{name}.{hash:8}.js".into();
        let assets = emit(options, &graph, &[main]).unwrap();
        let names = assets
            .iter()
            .filter(|a| a.role == AssetRole::Script)
            .map(|a| a.filename.clone())
            .collect();
        (assets, names)
    }

    #[test]
    fn script_hash_is_the_rendered_text() {
        let (assets, names) = hashed_scripts(b"export const x = 1;\n");
        assert_eq!(names.len(), 2);
        for name in &names {
            let content = text(&assets, name);
            let hex = ContentHash::of(content.as_bytes()).to_hex();
            assert!(name.ends_with(&format!(".{}.js", &hex[..8])), "{name}");
        }
        assert!(text(&assets, &names[0]).contains(&format!("\"/{}\"", names[1])));
        assert!(assets.iter().all(|a| !String::from_utf8_lossy(&a.content).contains(PLACEHOLDER_PREFIX)));
    }

    #[test]
    fn loader_renamed_when_loaded_chunk_changes() {
        let (_, first) = hashed_scripts(b"export const x = 1;\n");
        let (_, again) = hashed_scripts(b"export const x = 1;\n");
        assert_eq!(first, again);

        let (_, changed) = hashed_scripts(b"export const x = 2;\n");
        assert_ne!(first[1], changed[1]);
        assert_ne!(first[0], changed[0]);
    }

    #[test]
    fn chunks_loading_each_other_are_named() {
        let graph = ModuleGraph::new();
        let main = add(&graph, "src/main.js", OutputKind::Script, b"import('./a');\n", true);
        let a = add(&graph, "src/a.js", OutputKind::Script, b"import('./b');\n", false);
        let b = add(&graph, "src/b.js", OutputKind::Script, b"import('./a');\n", false);
        link(&graph, &main, "./a", &a, EdgeKind::Dynamic);
        link(&graph, &a, "./b", &b, EdgeKind::Dynamic);
        link(&graph, &b, "./a", &a, EdgeKind::Dynamic);

        let mut options = options();
        options.filenames.script = "static/js/{name}.{hash:8}.js".into();
        let assets = emit(options, &graph, &[main]).unwrap();
        let scripts: Vec<&EmittedAsset> = assets.iter().filter(|x| x.role == AssetRole::Script).collect();
        assert_eq!(scripts.len(), 3);

        let a_js = std::str::from_utf8(&scripts[1].content).unwrap();
        let b_js = std::str::from_utf8(&scripts[2].content).unwrap();
        assert!(a_js.contains(&format!("\"/{}\"", scripts[2].filename)));
        assert!(b_js.contains(&format!("\"/{}\"", scripts[1].filename)));
        assert_ne!(scripts[1].filename, scripts[2].filename);
        assert!(scripts.iter().all(|x| !String::from_utf8_lossy(&x.content).contains(PLACEHOLDER_PREFIX)));
    }

    #[test]
    fn small_assets_inline_and_large_ones_are_files() {
        let graph = ModuleGraph::new();
        let main = add(&graph, "src/main.js", OutputKind::Script, b"require('./a.png'); require('./b.png');\n", true);
        let small = add(&graph, "src/a.png", OutputKind::Asset(AssetMode::Auto), &[1; 9], false);
        let large = add(&graph, "src/b.png", OutputKind::Asset(AssetMode::Auto), &[2; 10], false);
        link(&graph, &main, "./a.png", &small, EdgeKind::Static);
        link(&graph, &main, "./b.png", &large, EdgeKind::Static);

        let mut options = options();
        options.inline_limit = 10;
        let assets = emit(options, &graph, &[main]).unwrap();

        let files: Vec<&EmittedAsset> = assets.iter().filter(|a| a.role == AssetRole::Asset).collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].module.as_ref(), Some(&large));
        assert!(files[0].filename.starts_with("static/images/"));
        assert!(files[0].filename.ends_with(".png"));

        let main_js = text(&assets, "static/js/main.js");
        assert!(main_js.contains("module.exports = \"data:image/png;base64,"));
        assert!(main_js.contains(&format!("module.exports = \"/{}\";", files[0].filename)));
    }

    #[test]
    fn distinct_contents_under_one_name_collide() {
        let graph = ModuleGraph::new();
        let main = add(&graph, "src/main.js", OutputKind::Script, b"require('./a/x.woff'); require('./b/x.woff');\n", true);
        let a = add(&graph, "src/a/x.woff", OutputKind::Asset(AssetMode::Resource), b"one", false);
        let b = add(&graph, "src/b/x.woff", OutputKind::Asset(AssetMode::Resource), b"two", false);
        link(&graph, &main, "./a/x.woff", &a, EdgeKind::Static);
        link(&graph, &main, "./b/x.woff", &b, EdgeKind::Static);

        let mut options = options();
        options.filenames.asset = "static/media/{name}{ext}".into();
        let err = emit(options, &graph, &[main]).unwrap_err();
        match err {
            EmitError::Collision { filename, .. } => assert_eq!(filename, "static/media/x.woff"),
            other => panic!("expected collision, got {other:?}"),
        }
    }

    #[test]
    fn identical_contents_are_deduplicated() {
        let graph = ModuleGraph::new();
        let main = add(&graph, "src/main.js", OutputKind::Script, b"require('./a/x.woff'); require('./b/x.woff');\n", true);
        let a = add(&graph, "src/a/x.woff", OutputKind::Asset(AssetMode::Resource), b"same", false);
        let b = add(&graph, "src/b/x.woff", OutputKind::Asset(AssetMode::Resource), b"same", false);
        link(&graph, &main, "./a/x.woff", &a, EdgeKind::Static);
        link(&graph, &main, "./b/x.woff", &b, EdgeKind::Static);

        let assets = emit(options(), &graph, &[main]).unwrap();
        assert_eq!(assets.iter().filter(|a| a.role == AssetRole::Asset).count(), 1);
    }

    #[test]
    fn extracted_styles_and_page() {
        let graph = ModuleGraph::new();
        let main = add(&graph, "src/main.js", OutputKind::Script, b"import './app.css';\n", true);
        let css = add(&graph, "src/app.css", OutputKind::Style, b"@import './base.css';\nbody { color: red; }\n", false);
        let base = add(&graph, "src/base.css", OutputKind::Style, b"html { margin: 0; }\n", false);
        link(&graph, &main, "./app.css", &css, EdgeKind::Static);
        link(&graph, &css, "./base.css", &base, EdgeKind::Static);

        let mut options = options();
        options.extract_styles = true;
        options.html = Some(HtmlOptions::default());
        let assets = emit(options, &graph, &[main]).unwrap();

        let sheet = text(&assets, "static/css/main.css");
        assert_eq!(
            sheet,
            "/* src/base.css */\nhtml { margin: 0; }\n/* src/app.css */\n\nbody { color: red; }\n"
        );

        let page = text(&assets, "index.html");
        assert!(page.contains("<link rel=\"stylesheet\" href=\"/static/css/main.css\">"));
        assert!(page.contains("<script defer src=\"/static/js/main.js\"></script>"));

        let main_js = text(&assets, "static/js/main.js");
        assert!(main_js.contains("__bale__.run([\"/static/css/main.css\"], \"src/main.js\");"));
    }

    #[test]
    fn source_maps_are_linked() {
        let graph = ModuleGraph::new();
        let main = add(&graph, "src/main.js", OutputKind::Script, b"console.log(1);\n", true);
        let mut options = options();
        options.source_maps = true;
        let assets = emit(options, &graph, &[main]).unwrap();

        let main_js = text(&assets, "static/js/main.js");
        assert!(main_js.ends_with("//# sourceMappingURL=/static/js/main.js.map\n"));
        let map: serde_json::Value = serde_json::from_str(text(&assets, "static/js/main.js.map")).unwrap();
        assert_eq!(map["sources"][0], "src/main.js");
        assert_eq!(map["file"], "static/js/main.js");
    }

    #[test]
    fn externals_and_missing_imports() {
        let graph = ModuleGraph::new();
        let main = add(&graph, "src/main.js", OutputKind::Script, b"const $ = require('jquery');\nrequire('./gone');\n", true);
        graph.add_external("jquery", main.clone());

        let assets = emit(options(), &graph, &[main]).unwrap();
        let main_js = text(&assets, "static/js/main.js");
        assert!(main_js.contains("const $ = __bale__.external(\"jquery\");"));
        assert!(main_js.contains("__bale__.missing(\"./gone\");"));
    }

    #[test]
    fn query_is_kept_in_filename_but_not_path() {
        let asset = EmittedAsset {
            role: AssetRole::Asset,
            filename: "static/media/abc.woff?v=3".into(),
            content: Vec::new(),
            hash: ContentHash::of(b""),
            chunk: None,
            module: None,
        };
        assert_eq!(asset.path(), "static/media/abc.woff");
    }
}
