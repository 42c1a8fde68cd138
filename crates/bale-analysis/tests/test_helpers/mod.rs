//! Shared fixtures for analysis integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bale_analysis::{CachedTransform, Fingerprint, GraphBuilder, TransformCache, TransformOutput};
use bale_config::BundleOptions;
use bale_graph::{ModuleId, Runtime};
use tempfile::TempDir;

/// Write `(path, content)` pairs under the temp dir and return its root.
pub fn create_test_project(temp: &TempDir, files: &[(&str, &str)]) -> PathBuf {
    let root = temp.path().to_path_buf();

    for (path, content) in files {
        let file_path = root.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("Failed to create parent directory for {path}: {e}"));
        }
        fs::write(&file_path, content).unwrap_or_else(|e| panic!("Failed to write {path}: {e}"));
    }

    root
}

/// The demo application: two entries' worth of scripts, a stylesheet with
/// images and a font, a lazily loaded module and an external.
pub const DEMO_PROJECT: &[(&str, &str)] = &[
    (
        "src/main.js",
        r#"import count from "./js/count";
import { sum } from "./js/sum";
import "./css/index.css";
import $ from "jquery";

console.log(count(3, 2));
console.log(sum(1, 2, 3));

document.getElementById("btn").onclick = function () {
  import(/* webpackChunkName: "math" */ "./js/math").then(({ mul }) => {
    console.log(mul(3, 3));
  });
};

if (module.hot) {
  module.hot.accept("./js/count");
  module.hot.accept("./js/sum");
}
"#,
    ),
    ("src/js/count.js", "export default function count(x, y) {\n  return x - y;\n}\n"),
    (
        "src/js/sum.js",
        "export function sum(...args) {\n  return args.reduce((p, c) => p + c, 0);\n}\n",
    ),
    ("src/js/math.js", "export function mul(x, y) {\n  return x * y;\n}\n"),
    (
        "src/css/index.css",
        "@import \"./iconfont.css\";\n.box { background: url(../images/1.jpeg) no-repeat; }\n",
    ),
    (
        "src/css/iconfont.css",
        "@font-face { font-family: iconfont; src: url(../fonts/iconfont.woff2?v=3) format('woff2'); }\n",
    ),
    ("src/images/1.jpeg", "\u{1}jpeg-bytes"),
    ("src/fonts/iconfont.woff2", "wOF2"),
];

pub fn demo_options() -> BundleOptions {
    let mut options = BundleOptions::default().with_entry("src/main.js");
    options.external.push("jquery".to_string());
    options
}

pub fn builder(options: &BundleOptions, root: &Path, runtime: Arc<dyn Runtime>) -> GraphBuilder {
    GraphBuilder::new(options, root, runtime).expect("rules compile")
}

/// Path relative to `root` with forward slashes, query appended.
pub fn rel(root: &Path, id: &ModuleId) -> String {
    let path = id
        .path()
        .strip_prefix(root)
        .unwrap_or(id.path())
        .to_string_lossy()
        .replace('\\', "/");
    match id.query() {
        Some(query) => format!("{path}?{query}"),
        None => path,
    }
}

/// Plain map-backed cache.
#[derive(Debug, Default)]
pub struct MapCache {
    entries: Mutex<HashMap<ModuleId, (Fingerprint, TransformOutput)>>,
}

impl MapCache {
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl TransformCache for MapCache {
    fn get(&self, id: &ModuleId, fingerprint: &Fingerprint) -> Option<TransformOutput> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(id)
            .filter(|(fp, _)| fp == fingerprint)
            .map(|(_, output)| output.clone())
    }

    fn put(&self, entry: CachedTransform) {
        self.entries
            .lock()
            .unwrap()
            .insert(entry.module, (entry.fingerprint, entry.output));
    }
}
