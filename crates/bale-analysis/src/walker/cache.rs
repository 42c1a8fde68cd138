//! Cache seam between the graph builder and whatever stores transforms.

use std::fmt;

use bale_graph::{ContentHash, ModuleId};
use serde::{Deserialize, Serialize};

use crate::transform::TransformOutput;

/// Bumped whenever `TransformOutput` or fingerprint inputs change shape.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// BLAKE3(format version ‖ content hash ‖ chain id).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn compute(content_hash: &ContentHash, chain_id: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&CACHE_FORMAT_VERSION.to_le_bytes());
        hasher.update(content_hash.as_bytes());
        hasher.update(chain_id.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

/// A transform result ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTransform {
    pub module: ModuleId,
    pub fingerprint: Fingerprint,
    pub output: TransformOutput,
}

/// Read side used during a walk, write side used by the caller afterwards.
///
/// The builder only ever calls `get`; fresh results come back in
/// `BuildGraph::fresh_entries` and are committed with `put` once the build
/// is known to have completed.
pub trait TransformCache: Send + Sync + fmt::Debug {
    /// Cached output for `id`, only if it was produced under `fingerprint`.
    fn get(&self, id: &ModuleId, fingerprint: &Fingerprint) -> Option<TransformOutput>;

    fn put(&self, entry: CachedTransform);
}
