//! Inline-or-file decision for asset modules.

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bale_graph::AssetMode;

/// `true` when the asset becomes a data URL.
///
/// `Auto` inlines strictly below `limit`; an asset of exactly `limit` bytes
/// is written as a file.
pub fn should_inline(mode: AssetMode, size: u64, limit: u64) -> bool {
    match mode {
        AssetMode::Inline => true,
        AssetMode::Resource => false,
        AssetMode::Auto => size < limit,
    }
}

/// `data:<mime>;base64,<payload>` with the MIME type guessed from `path`.
pub fn data_url(path: &Path, bytes: &[u8]) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    format!("data:{};base64,{}", mime.essence_str(), STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_boundary_is_exclusive() {
        let limit = 20 * 1024;
        assert!(should_inline(AssetMode::Auto, limit - 1, limit));
        assert!(!should_inline(AssetMode::Auto, limit, limit));
        assert!(!should_inline(AssetMode::Auto, limit + 1, limit));
    }

    #[test]
    fn forced_modes_ignore_size() {
        assert!(should_inline(AssetMode::Inline, u64::MAX, 1));
        assert!(!should_inline(AssetMode::Resource, 0, u64::MAX));
    }

    #[test]
    fn data_url_uses_guessed_mime() {
        assert_eq!(data_url(Path::new("a.png"), b"hi"), "data:image/png;base64,aGk=");
        assert_eq!(
            data_url(Path::new("blob.unknownext"), b""),
            "data:application/octet-stream;base64,"
        );
    }
}
